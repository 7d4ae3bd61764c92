//! Stubs and a local HTTP server for tests.

use axum::Router;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::api::AskAsync;
use crate::config::Settings;
use crate::error::{NewsMapError, Result};
use crate::geocode::{Geocode, Place};
use crate::models::Coordinate;
use crate::pipeline::Pipeline;

/// Serve `router` on an ephemeral localhost port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// LLM that returns a canned answer and records the prompt it was given.
#[derive(Debug)]
pub struct StubLlm {
    answer: Option<String>,
    last_prompt: Mutex<Option<String>>,
}

impl StubLlm {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            last_prompt: Mutex::new(None),
        }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

impl AskAsync for StubLlm {
    type Response = String;

    async fn ask(&self, text: &str) -> Result<String> {
        *self.last_prompt.lock().unwrap() = Some(text.to_string());
        self.answer
            .clone()
            .ok_or_else(|| NewsMapError::Llm("stub LLM is offline".to_string()))
    }
}

/// Geocoder backed by a fixed table; records every name it is asked about.
#[derive(Debug)]
pub struct StubGeocoder {
    places: HashMap<String, Coordinate>,
    lookups: Mutex<Vec<String>>,
}

impl StubGeocoder {
    pub fn with(places: &[(&str, f64, f64)]) -> Self {
        Self {
            places: places
                .iter()
                .map(|&(name, latitude, longitude)| {
                    (name.to_string(), Coordinate { latitude, longitude })
                })
                .collect(),
            lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

impl Geocode for StubGeocoder {
    async fn geocode(&self, name: &str) -> Result<Option<Place>> {
        self.lookups.lock().unwrap().push(name.to_string());
        Ok(self.places.get(name).map(|&coordinate| Place {
            coordinate,
            display_name: format!("{name} (stub)"),
        }))
    }
}

pub fn pipeline(llm: StubLlm, geocoder: StubGeocoder) -> Pipeline<StubLlm, StubGeocoder> {
    Pipeline::new(Client::new(), llm, geocoder, Settings::default())
}
