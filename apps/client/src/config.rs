use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Client configuration. Timeouts bound every request; a refresh exchange that
/// outlives `refresh_timeout` ends the session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub refresh_timeout: Duration,
    /// Cover-letter generation waits on an LLM.
    pub generation_timeout: Duration,
    /// Where credentials persist between runs. `None` keeps them in memory.
    pub credentials_path: Option<PathBuf>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(30),
            refresh_timeout: Duration::from_secs(15),
            generation_timeout: Duration::from_secs(90),
            credentials_path: None,
        }
    }

    /// Reads `EASEAPPLY_API_URL`, `EASEAPPLY_CREDENTIALS_PATH` and
    /// `EASEAPPLY_REFRESH_TIMEOUT_SECS`, loading `.env` first if present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::new(
            std::env::var("EASEAPPLY_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        );
        config.credentials_path = std::env::var("EASEAPPLY_CREDENTIALS_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        if let Ok(raw) = std::env::var("EASEAPPLY_REFRESH_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.refresh_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %raw, "ignoring invalid EASEAPPLY_REFRESH_TIMEOUT_SECS"),
            }
        }
        config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
