use std::future::Future;
use std::sync::Arc;

use image::DynamicImage;

use super::PredictionApi;
use crate::{
    config::PollSettings,
    error::{GenerationError, GenerationResult},
    models::{GenerationRequest, PredictionJob, PredictionOutput, PredictionStatus, SourceImage},
};

/// Drives one prediction from submission to a fetched image.
#[derive(Clone)]
pub struct PredictionClient {
    api: Arc<dyn PredictionApi>,
    model_version: String,
    poll: PollSettings,
}

impl PredictionClient {
    pub fn new(api: Arc<dyn PredictionApi>, model_version: impl Into<String>, poll: PollSettings) -> Self {
        Self {
            api,
            model_version: model_version.into(),
            poll,
        }
    }

    /// Submits, polls and fetches. The image is the first output of the
    /// prediction, or `source` itself when the prediction succeeded without
    /// a usable output.
    pub async fn generate(&self, source: &SourceImage) -> GenerationResult<DynamicImage> {
        let mut job = self.submit(source).await?;
        let output = self.wait(&mut job).await?;
        self.fetch_output(output.as_ref(), source).await
    }

    /// Like `generate`, but gives up with `Cancelled` as soon as `cancel`
    /// resolves. The in-flight HTTP call is dropped with the job future.
    ///
    /// For callers holding an explicit stop signal. Request handlers need no
    /// signal: dropping the `generate` future (client disconnect) abandons
    /// the job the same way.
    pub async fn generate_until<F>(&self, source: &SourceImage, cancel: F) -> GenerationResult<DynamicImage>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = self.generate(source) => result,
            _ = cancel => {
                log::warn!("Prediction cancelled by caller");
                Err(GenerationError::Cancelled)
            }
        }
    }

    pub async fn submit(&self, source: &SourceImage) -> GenerationResult<PredictionJob> {
        let data_url = source.to_data_url().map_err(|e| {
            GenerationError::SubmissionError(format!("cannot encode source image: {}", e))
        })?;
        let request = GenerationRequest::illustration(&self.model_version, data_url);

        let created = self.api.create_prediction(&request).await?;

        let id = created
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());
        let (Some(id), Some(poll_url)) = (id, created.poll_url()) else {
            log::error!("Failed to create prediction. Response: {:?}", created);
            return Err(GenerationError::SubmissionError(
                "missing prediction id or poll url".into(),
            ));
        };

        log::info!("Prediction {} created", id);
        Ok(PredictionJob {
            id: id.to_string(),
            poll_url: poll_url.to_string(),
            status: created.status.unwrap_or(PredictionStatus::Starting),
        })
    }

    /// Polls until the job reaches a terminal status or the attempt ceiling.
    /// Returns the output of a succeeded job.
    pub async fn wait(&self, job: &mut PredictionJob) -> GenerationResult<Option<PredictionOutput>> {
        for attempt in 1..=self.poll.max_attempts {
            tokio::time::sleep(self.poll.interval).await;

            let response = self.api.get_prediction(&job.poll_url).await?;
            let Some(status) = response.status else {
                log::debug!("Prediction {} poll {} returned no status", job.id, attempt);
                continue;
            };
            job.observe(status);
            log::debug!("Prediction {} poll {}: {}", job.id, attempt, status.as_str());

            match status {
                PredictionStatus::Succeeded => return Ok(response.output),
                PredictionStatus::Failed | PredictionStatus::Canceled => {
                    let message = response.error.unwrap_or_else(|| "Unknown error".to_string());
                    return Err(GenerationError::JobFailedError(message));
                }
                PredictionStatus::Starting
                | PredictionStatus::Queued
                | PredictionStatus::Processing
                | PredictionStatus::Unknown => {}
            }
        }

        Err(GenerationError::JobTimeoutError {
            attempts: self.poll.max_attempts,
        })
    }

    pub async fn fetch_output(
        &self,
        output: Option<&PredictionOutput>,
        source: &SourceImage,
    ) -> GenerationResult<DynamicImage> {
        let Some(url) = output.and_then(PredictionOutput::first_reference) else {
            // A succeeded job with nothing usable yields the input image.
            log::warn!("Prediction succeeded without a usable output; returning the input image");
            return Ok(source.to_dynamic());
        };

        let bytes = self.api.fetch_output(url).await?;
        image::load_from_memory(&bytes)
            .map_err(|e| GenerationError::InvalidOutputError(e.to_string()))
    }
}
