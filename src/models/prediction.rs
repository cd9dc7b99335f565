use serde::{Deserialize, Serialize};

pub const ILLUSTRATION_PROMPT: &str = "a beautiful illustrated portrait, children's book illustration style, colorful, friendly, cartoon style, high quality";
pub const ILLUSTRATION_NEGATIVE_PROMPT: &str = "realistic, photo, photograph, low quality, blurry";

/// Body of a prediction creation call.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerationRequest {
    pub version: String,
    pub input: GenerationInput,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerationInput {
    pub image: String,
    pub prompt: String,
    pub negative_prompt: String,
    pub num_outputs: u32,
    pub guidance_scale: f32,
    pub num_inference_steps: u32,
}

impl GenerationRequest {
    /// Illustration-style request for one output image.
    pub fn illustration(version: impl Into<String>, image_data_url: String) -> Self {
        Self {
            version: version.into(),
            input: GenerationInput {
                image: image_data_url,
                prompt: ILLUSTRATION_PROMPT.to_string(),
                negative_prompt: ILLUSTRATION_NEGATIVE_PROMPT.to_string(),
                num_outputs: 1,
                guidance_scale: 7.5,
                num_inference_steps: 30,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Starting,
    Queued,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    /// Any status this client does not know. Treated as still running.
    #[serde(other)]
    Unknown,
}

impl PredictionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PredictionStatus::Succeeded | PredictionStatus::Failed | PredictionStatus::Canceled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionStatus::Starting => "starting",
            PredictionStatus::Queued => "queued",
            PredictionStatus::Processing => "processing",
            PredictionStatus::Succeeded => "succeeded",
            PredictionStatus::Failed => "failed",
            PredictionStatus::Canceled => "canceled",
            PredictionStatus::Unknown => "unknown",
        }
    }
}

/// The `output` field of a finished prediction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PredictionOutput {
    Single(String),
    Many(Vec<String>),
    Other(serde_json::Value),
}

impl PredictionOutput {
    /// The first output reference, if it is a fetchable http(s) URL.
    pub fn first_reference(&self) -> Option<&str> {
        let first = match self {
            PredictionOutput::Single(url) => Some(url.as_str()),
            PredictionOutput::Many(urls) => urls.first().map(String::as_str),
            PredictionOutput::Other(_) => None,
        };
        first
            .map(str::trim)
            .filter(|url| url.starts_with("http"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PredictionUrls {
    pub get: Option<String>,
}

/// Prediction as returned by both the creation and the polling endpoints.
/// Every field is optional on the wire; callers validate what they need.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PredictionResponse {
    pub id: Option<String>,
    pub status: Option<PredictionStatus>,
    pub urls: Option<PredictionUrls>,
    pub output: Option<PredictionOutput>,
    pub error: Option<String>,
}

impl PredictionResponse {
    pub fn poll_url(&self) -> Option<&str> {
        self.urls
            .as_ref()
            .and_then(|urls| urls.get.as_deref())
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// A submitted job: its id and where to poll it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionJob {
    pub id: String,
    pub poll_url: String,
    pub status: PredictionStatus,
}

impl PredictionJob {
    /// Records a newly observed status. Terminal statuses never change.
    pub fn observe(&mut self, status: PredictionStatus) {
        if !self.status.is_terminal() {
            self.status = status;
        }
    }
}
