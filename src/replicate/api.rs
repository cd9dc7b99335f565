use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::{
    config::ReplicateConfig,
    error::{GenerationError, GenerationResult},
    models::{GenerationRequest, PredictionResponse},
};

/// Wire operations of the prediction job API.
#[async_trait]
pub trait PredictionApi: Send + Sync {
    /// Creates a prediction. Any non-201 reply is a `SubmissionError`.
    async fn create_prediction(
        &self,
        request: &GenerationRequest,
    ) -> GenerationResult<PredictionResponse>;

    async fn get_prediction(&self, poll_url: &str) -> GenerationResult<PredictionResponse>;

    /// Raw bytes behind an output URL.
    async fn fetch_output(&self, url: &str) -> GenerationResult<Vec<u8>>;
}

/// `PredictionApi` over the Replicate REST API.
#[derive(Clone)]
pub struct ReplicateApi {
    client: Client,
    endpoint: String,
    token: String,
    timeout: Duration,
}

impl ReplicateApi {
    pub fn new(config: &ReplicateConfig, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.predictions_endpoint(),
            token: token.into(),
            timeout: config.request_timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PredictionApi for ReplicateApi {
    async fn create_prediction(
        &self,
        request: &GenerationRequest,
    ) -> GenerationResult<PredictionResponse> {
        log::info!("Creating prediction at {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            log::error!("Prediction API error: {} - {}", status.as_u16(), body);
            return Err(GenerationError::SubmissionError(format!(
                "{} - {}",
                status.as_u16(),
                truncate_text(&body, 512)
            )));
        }

        response.json::<PredictionResponse>().await.map_err(|e| {
            GenerationError::SubmissionError(format!("invalid prediction payload: {}", e))
        })
    }

    async fn get_prediction(&self, poll_url: &str) -> GenerationResult<PredictionResponse> {
        let response = self
            .client
            .get(poll_url)
            .bearer_auth(&self.token)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;

        response.json::<PredictionResponse>().await.map_err(|e| {
            GenerationError::TransportError(format!("invalid poll payload: {}", e))
        })
    }

    async fn fetch_output(&self, url: &str) -> GenerationResult<Vec<u8>> {
        log::debug!("Downloading prediction output {}", url);
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_comes_from_config() {
        let config = ReplicateConfig::new()
            .with_api_base("http://127.0.0.1:1/v1")
            .with_model("owner/model", "abc");
        let api = ReplicateApi::new(&config, "token");
        assert_eq!(api.endpoint(), "http://127.0.0.1:1/v1/models/owner/model/predictions");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("abcdef", 3), "abc…");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_transport_error() {
        let config = ReplicateConfig::new().with_api_base("http://127.0.0.1:1/v1");
        let api = ReplicateApi::new(&config, "token");
        let err = api.get_prediction("http://127.0.0.1:1/v1/predictions/x").await.unwrap_err();
        assert!(matches!(err, GenerationError::TransportError(_)));
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = ReplicateConfig::new()
            .with_api_base(format!("http://{}/v1", addr))
            .with_request_timeout(Duration::from_millis(200));
        let api = ReplicateApi::new(&config, "token");
        let poll_url = format!("http://{}/v1/predictions/x", addr);

        let result = tokio::time::timeout(Duration::from_secs(5), api.get_prediction(&poll_url))
            .await
            .expect("request should give up on its own");
        assert!(matches!(result, Err(GenerationError::TransportError(_))));

        let fetched = tokio::time::timeout(Duration::from_secs(5), api.fetch_output(&poll_url))
            .await
            .expect("download should give up on its own");
        assert!(matches!(fetched, Err(GenerationError::TransportError(_))));
    }
}
