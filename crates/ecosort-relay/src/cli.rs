//! Command-line interface

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug, Clone)]
#[command(name = "ecosort-relay")]
#[command(about = "EcoSort image classification relay", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "ecosort.yaml")]
    pub config: String,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Gemini model identifier
    #[arg(short, long, env = "GEMINI_MODEL")]
    pub model: Option<String>,

    /// Listen address
    #[arg(short = 'l', long, default_value = "0.0.0.0")]
    pub listen: String,

    /// Listen port
    #[arg(short = 'P', long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Allow http:// and local model endpoints (development only)
    #[arg(long)]
    pub allow_insecure_endpoint: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, env = "ECOSORT_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// How log lines are rendered
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line, for log shippers
    Json,
}
