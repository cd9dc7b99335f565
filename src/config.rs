use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.replicate.com/v1";
pub const DEFAULT_MODEL_NAME: &str = "lucataco/ip-adapter-faceid";
pub const DEFAULT_MODEL_VERSION: &str = "75d76a4e40e0c5b2c0e0e0e0e0e0e0e0";
pub const DEFAULT_MAX_DIMENSION: u32 = 1024;
pub const DEFAULT_PORT: u16 = 8001;
pub const DEFAULT_TEMPLATE_NAME: &str = "template.png";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Cadence and ceiling of the prediction poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        PollSettings {
            interval: Duration::from_secs(2),
            max_attempts: 60,
        }
    }
}

impl PollSettings {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Worst-case time spent waiting between polls.
    pub fn ceiling(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

#[derive(Debug, Clone)]
pub struct ReplicateConfig {
    pub api_token: Option<String>,
    pub api_base: String,
    pub model_name: String,
    pub model_version: String,
    pub poll: PollSettings,
    /// Bound on each single HTTP call to the prediction API.
    pub request_timeout: Duration,
}

impl Default for ReplicateConfig {
    fn default() -> Self {
        ReplicateConfig {
            api_token: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            model_version: DEFAULT_MODEL_VERSION.to_string(),
            poll: PollSettings::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ReplicateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_token = non_empty_env("REPLICATE_API_TOKEN");
        let api_base = non_empty_env("REPLICATE_API_BASE")
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base);
        let model_name = non_empty_env("REPLICATE_MODEL").unwrap_or(defaults.model_name);
        let model_version =
            non_empty_env("REPLICATE_MODEL_VERSION").unwrap_or(defaults.model_version);
        let interval = non_empty_env("REPLICATE_POLL_INTERVAL_SECS")
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(Duration::from_secs_f64)
            .unwrap_or(defaults.poll.interval);
        let max_attempts = non_empty_env("REPLICATE_POLL_MAX_ATTEMPTS")
            .and_then(|s| s.parse().ok())
            .filter(|attempts| *attempts > 0)
            .unwrap_or(defaults.poll.max_attempts);
        let request_timeout = non_empty_env("REPLICATE_REQUEST_TIMEOUT_SECS")
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(Duration::from_secs_f64)
            .unwrap_or(defaults.request_timeout);

        ReplicateConfig {
            api_token,
            api_base,
            model_name,
            model_version,
            poll: PollSettings::new(interval, max_attempts),
            request_timeout,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    pub fn with_model(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.model_name = name.into();
        self.model_version = version.into();
        self
    }

    pub fn with_poll(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn has_token(&self) -> bool {
        self.api_token.is_some()
    }

    pub fn predictions_endpoint(&self) -> String {
        format!("{}/models/{}/predictions", self.api_base, self.model_name)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub template_dir: PathBuf,
    pub default_template: String,
    pub max_dimension: u32,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: usize,
    pub allowed_origins: Vec<String>,
    pub replicate: ReplicateConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            template_dir: PathBuf::from("templates"),
            default_template: DEFAULT_TEMPLATE_NAME.to_string(),
            max_dimension: DEFAULT_MAX_DIMENSION,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            replicate: ReplicateConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let host = non_empty_env("HOST").unwrap_or(defaults.host);
        let port = env::var("PORT")
            .ok()
            .and_then(|port| port.parse().ok())
            .unwrap_or(defaults.port);
        let template_dir = non_empty_env("TEMPLATE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.template_dir);
        let default_template = non_empty_env("DEFAULT_TEMPLATE").unwrap_or(defaults.default_template);
        let max_dimension = env::var("MAX_IMAGE_DIMENSION")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|dim| *dim > 0)
            .unwrap_or(defaults.max_dimension);
        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|bytes| *bytes > 0)
            .unwrap_or(defaults.max_upload_bytes);
        let allowed_origins = non_empty_env("ALLOWED_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .unwrap_or(defaults.allowed_origins);

        Config {
            host,
            port,
            template_dir,
            default_template,
            max_dimension,
            max_upload_bytes,
            allowed_origins,
            replicate: ReplicateConfig::from_env(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dir = dir.into();
        self
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn with_replicate(mut self, config: ReplicateConfig) -> Self {
        self.replicate = config;
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}
