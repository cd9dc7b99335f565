use std::sync::Arc;

use image::DynamicImage;

use crate::{
    config::Config,
    error::Result,
    imaging::{composite, normalize, stylize},
    logger,
    models::{encode_png, SourceImage},
    replicate::{self, PredictionApi, PredictionClient},
    templates::TemplateStore,
};

/// One upload to personalize. `request_id` tags every log line of the run.
#[derive(Debug, Clone)]
pub struct PersonalizeRequest {
    pub request_id: String,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub template: Option<String>,
}

impl PersonalizeRequest {
    pub fn new(request_id: impl Into<String>, bytes: Vec<u8>, content_type: Option<String>) -> Self {
        Self {
            request_id: request_id.into(),
            bytes,
            content_type,
            template: None,
        }
    }

    pub fn with_template(mut self, template: Option<String>) -> Self {
        self.template = template;
        self
    }
}

/// Which branch produced the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPath {
    Generated,
    Fallback,
}

impl RenderPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderPath::Generated => "generated",
            RenderPath::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PersonalizeOutput {
    pub png: Vec<u8>,
    pub path: RenderPath,
    pub templated: bool,
}

/// Per-request pipeline: normalize, generate or stylize, composite, encode.
/// Holds no per-request state, so one instance serves concurrent requests.
#[derive(Clone)]
pub struct Personalizer {
    templates: TemplateStore,
    max_dimension: u32,
    predictions: Option<PredictionClient>,
}

impl Personalizer {
    pub fn new(templates: TemplateStore, max_dimension: u32, predictions: Option<PredictionClient>) -> Self {
        Self {
            templates,
            max_dimension,
            predictions,
        }
    }

    /// Talks to Replicate when the config carries an API token, otherwise
    /// runs fallback-only.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            TemplateStore::new(&config.template_dir, &config.default_template),
            config.max_dimension,
            replicate::client_from_config(&config.replicate),
        )
    }

    /// Same as `from_config` but over a caller-supplied API. The API is only
    /// used when the config carries a token.
    pub fn with_api(config: &Config, api: Arc<dyn PredictionApi>) -> Self {
        let predictions = config.replicate.has_token().then(|| {
            PredictionClient::new(api, config.replicate.model_version.clone(), config.replicate.poll)
        });
        Self::new(
            TemplateStore::new(&config.template_dir, &config.default_template),
            config.max_dimension,
            predictions,
        )
    }

    pub fn uses_predictions(&self) -> bool {
        self.predictions.is_some()
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    /// Runs the whole pipeline for one upload. Dropping the returned future
    /// abandons any prediction still in flight.
    pub async fn personalize(&self, request: PersonalizeRequest) -> Result<PersonalizeOutput> {
        let _timer = logger::timer(&format!("personalize [req:{}]", request.request_id));
        let PersonalizeRequest {
            request_id,
            bytes,
            content_type,
            template,
        } = request;

        let max_dimension = self.max_dimension;
        let source = run_blocking(move || normalize(&bytes, content_type.as_deref(), max_dimension)).await?;
        log::info!(
            "[req:{}] Normalized upload to {}x{}",
            request_id,
            source.width(),
            source.height()
        );

        let store = self.templates.clone();
        let template = run_blocking(move || store.resolve(template.as_deref())).await?;
        let templated = template.is_some();

        let (image, path) = match &self.predictions {
            None => {
                log::info!("[req:{}] No prediction credential, using fallback", request_id);
                (fallback(source, template).await?, RenderPath::Fallback)
            }
            Some(client) => match client.generate(&source).await {
                Ok(generated) => {
                    let image = match template {
                        Some(template) => {
                            run_blocking(move || Ok(composite(&generated, &template))).await?
                        }
                        None => generated,
                    };
                    (image, RenderPath::Generated)
                }
                Err(e) => {
                    log::warn!("[req:{}] Prediction failed, using fallback: {}", request_id, e);
                    (fallback(source, template).await?, RenderPath::Fallback)
                }
            },
        };

        let png = run_blocking(move || encode_png(&image)).await?;
        log::info!(
            "[req:{}] Rendered {} bytes via {} path",
            request_id,
            png.len(),
            path.as_str()
        );
        Ok(PersonalizeOutput {
            png,
            path,
            templated,
        })
    }
}

async fn fallback(source: SourceImage, template: Option<DynamicImage>) -> Result<DynamicImage> {
    run_blocking(move || {
        let stylized = DynamicImage::ImageRgb8(stylize(source.pixels()));
        Ok(match template {
            Some(template) => composite(&stylized, &template),
            None => stylized,
        })
    })
    .await
}

async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}
