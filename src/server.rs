//! HTTP front end: the form page, a JSON endpoint and a health probe.
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | GET | `/` | Empty form |
//! | POST | `/` | Form submission, page with map/table or inline error |
//! | POST | `/api/map` | JSON [`MapReport`] or `{error, kind}` |
//! | GET | `/healthz` | `ok` |
//!
//! Each submission runs the pipeline to completion before responding.

use axum::{
    Form, Json, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::AskAsync;
use crate::error::NewsMapError;
use crate::geocode::Geocode;
use crate::models::{ArticleInput, MapReport};
use crate::outputs::page::{FormValues, Outcome, render_page};
use crate::pipeline::Pipeline;

/// Fields of the HTML form; either may be left blank.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitForm {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub text: String,
}

/// Body of `POST /api/map`.
#[derive(Debug, Default, Deserialize)]
pub struct MapRequest {
    pub url: Option<String>,
    pub text: Option<String>,
}

pub fn router<L, G>(pipeline: Arc<Pipeline<L, G>>) -> Router
where
    L: AskAsync<Response = String> + Send + Sync + 'static,
    G: Geocode + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(index::<L, G>).post(submit::<L, G>))
        .route("/api/map", post(api_map::<L, G>))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(pipeline)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn index<L, G>(State(pipeline): State<Arc<Pipeline<L, G>>>) -> Html<String> {
    Html(render_page(
        &FormValues::default(),
        &Outcome::Blank,
        &pipeline.settings.map,
    ))
}

async fn submit<L, G>(
    State(pipeline): State<Arc<Pipeline<L, G>>>,
    Form(form): Form<SubmitForm>,
) -> Html<String>
where
    L: AskAsync<Response = String> + Send + Sync + 'static,
    G: Geocode + Send + Sync + 'static,
{
    let result = match ArticleInput::from_fields(Some(&form.url), Some(&form.text)) {
        Ok(input) => pipeline.run(&input).await,
        Err(e) => Err(e),
    };

    let outcome = match &result {
        Ok(report) => {
            info!(placed = report.map.locations.len(), "Rendered map");
            Outcome::Report(report)
        }
        Err(e) => {
            warn!(error = %e, kind = e.kind(), "Submission failed");
            Outcome::Error(e)
        }
    };

    let values = FormValues {
        url: &form.url,
        text: &form.text,
    };
    Html(render_page(&values, &outcome, &pipeline.settings.map))
}

/// Pipeline error rendered as a JSON body.
pub struct ApiError(NewsMapError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            e if e.is_upstream() => StatusCode::BAD_GATEWAY,
            NewsMapError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        };
        let body = json!({
            "error": self.0.to_string(),
            "kind": self.0.kind(),
        });
        (status, Json(body)).into_response()
    }
}

async fn api_map<L, G>(
    State(pipeline): State<Arc<Pipeline<L, G>>>,
    Json(request): Json<MapRequest>,
) -> Result<Json<MapReport>, ApiError>
where
    L: AskAsync<Response = String> + Send + Sync + 'static,
    G: Geocode + Send + Sync + 'static,
{
    let input = ArticleInput::from_fields(request.url.as_deref(), request.text.as_deref())
        .map_err(ApiError)?;
    match pipeline.run(&input).await {
        Ok(report) => Ok(Json(report)),
        Err(e) => {
            warn!(error = %e, kind = e.kind(), "API request failed");
            Err(ApiError(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StubGeocoder, StubLlm, pipeline};
    use axum::{
        body::{Body, to_bytes},
        http::{Request, header},
    };
    use serde_json::Value;
    use tower::ServiceExt;
    use url::form_urlencoded;

    const ARTICLE: &str = "World leaders met in Paris on Monday while delegates in Tokyo followed the talks remotely.";
    const ANSWER: &str = r#"[{"name": "Paris", "type": "city", "confidence": 0.95, "summary": "Leaders met."},
                             {"name": "Tokyo", "type": "city", "confidence": 0.80, "summary": "Delegates followed."}]"#;

    fn app(llm: StubLlm) -> Router {
        let geocoder = StubGeocoder::with(&[("Paris", 48.8566, 2.3522), ("Tokyo", 35.6762, 139.6503)]);
        router(Arc::new(pipeline(llm, geocoder)))
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn form_request(url: &str, text: &str) -> Request<Body> {
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("url", url)
            .append_pair("text", text)
            .finish();
        Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/map")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_index_serves_form() {
        let response = app(StubLlm::answering("[]"))
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        assert!(html.contains("Paste a news article URL"));
    }

    #[tokio::test]
    async fn test_healthz() {
        let response = app(StubLlm::answering("[]"))
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_string(response).await, "ok");
    }

    #[tokio::test]
    async fn test_form_submission_renders_map() {
        let response = app(StubLlm::answering(ANSWER))
            .oneshot(form_request("", ARTICLE))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let html = body_string(response).await;
        assert!(html.contains("<td>Paris</td>"));
        assert!(!html.contains("<td>Tokyo</td>"));
        assert!(html.contains("id=\"newsmap\""));
    }

    #[tokio::test]
    async fn test_form_parse_error_shown_without_map() {
        let response = app(StubLlm::answering("I found Paris and Tokyo."))
            .oneshot(form_request("", ARTICLE))
            .await
            .unwrap();

        let html = body_string(response).await;
        assert!(html.contains("notice error"));
        assert!(html.contains("Could not parse the model response"));
        assert!(!html.contains("id=\"newsmap\""));
    }

    #[tokio::test]
    async fn test_form_blank_submission() {
        let response = app(StubLlm::answering("[]"))
            .oneshot(form_request("  ", ""))
            .await
            .unwrap();
        let html = body_string(response).await;
        assert!(html.contains("No valid article text found"));
    }

    #[tokio::test]
    async fn test_api_returns_report() {
        let response = app(StubLlm::answering(ANSWER))
            .oneshot(json_request(json!({ "text": ARTICLE })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let report: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(report["extracted"], 2);
        assert_eq!(report["retained"], 1);
        assert_eq!(report["map"]["locations"][0]["name"], "Paris");
        assert_eq!(report["map"]["zoom"], 7);
    }

    #[tokio::test]
    async fn test_api_error_statuses() {
        let response = app(StubLlm::answering("[]"))
            .oneshot(json_request(json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["kind"], "empty_article");

        let response = app(StubLlm::answering("\"Paris\""))
            .oneshot(json_request(json!({ "text": ARTICLE })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = app(StubLlm::failing())
            .oneshot(json_request(json!({ "text": ARTICLE })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["kind"], "llm");
    }
}
