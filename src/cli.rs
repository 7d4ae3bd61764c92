//! Command-line interface definitions for NewsMap.
//!
//! This module defines the start-up options using the `clap` crate.
//! All arguments can be provided via command-line flags or environment
//! variables (including a `.env` file in the working directory).

use clap::Parser;

/// Command-line arguments for the NewsMap web server.
///
/// # Examples
///
/// ```sh
/// # Serve on the default address with the key from the environment
/// GEMINI_API_KEY=... newsmap
///
/// # Custom address, model and settings file
/// newsmap --bind 0.0.0.0:8080 --model gemini-1.5-pro -c newsmap.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Address the web server listens on
    #[arg(short, long, env = "NEWSMAP_BIND", default_value = "127.0.0.1:8501")]
    pub bind: String,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: String,

    /// Gemini model name, overrides the settings file
    #[arg(short, long, env = "GEMINI_MODEL")]
    pub model: Option<String>,

    /// Optional path to a YAML settings file
    #[arg(short, long, env = "NEWSMAP_CONFIG")]
    pub config: Option<String>,
}
