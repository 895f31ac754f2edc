use std::env;
use std::str::FromStr;

/// How rendered snippets are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format {:?}", other)),
        }
    }
}

/// Config holds all application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub templates_dir: String,
    pub topology_file: String,
    pub render_concurrency: usize,
    pub output_format: OutputFormat,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        Self {
            templates_dir: get("TEMPLATES_DIR", "templates"),
            topology_file: get("TOPOLOGY_FILE", "topology.yml"),
            render_concurrency: get("RENDER_CONCURRENCY", "4")
                .parse()
                .ok()
                .filter(|n| *n > 0)
                .unwrap_or(4),
            output_format: get("OUTPUT_FORMAT", "text").parse().unwrap_or_else(|e| {
                tracing::warn!("{}, using text", e);
                OutputFormat::Text
            }),
        }
    }
}
