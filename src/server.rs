use actix_cors::Cors;
use actix_multipart::{Field, Multipart};
use actix_web::{
    get,
    http::StatusCode,
    middleware, post, web, App, HttpResponse, HttpServer, ResponseError,
};
use futures::TryStreamExt;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    config::Config,
    error::PersonalizeError,
    personalizer::{PersonalizeRequest, Personalizer},
};

/// Cap on every multipart field other than the upload itself.
const MAX_TEXT_FIELD_BYTES: usize = 1024;

pub struct AppState {
    personalizer: Personalizer,
    max_upload_bytes: usize,
}

impl AppState {
    pub fn new(personalizer: Personalizer, max_upload_bytes: usize) -> Self {
        Self {
            personalizer,
            max_upload_bytes,
        }
    }
}

/// Error bodies are `{"detail": ...}`. Internal failures never expose their
/// cause to the client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Error processing image")]
    Internal,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "detail": self.to_string() }))
    }
}

#[derive(Debug, Deserialize)]
pub struct TemplateQuery {
    template: Option<String>,
}

struct Upload {
    bytes: Vec<u8>,
    content_type: Option<String>,
    template: Option<String>,
}

#[get("/")]
async fn root() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "Illustration Personalizer API",
        "status": "running"
    }))
}

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "healthy" }))
}

#[post("/api/personalize")]
async fn personalize(
    state: web::Data<AppState>,
    query: web::Query<TemplateQuery>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let request_id = Uuid::new_v4().to_string();
    let upload = read_upload(payload, state.max_upload_bytes).await?;
    let template = upload.template.or_else(|| query.into_inner().template);

    log::info!(
        "[req:{}] Personalize request ({} bytes, {}, template {:?})",
        request_id,
        upload.bytes.len(),
        upload.content_type.as_deref().unwrap_or("no content type"),
        template
    );

    let request = PersonalizeRequest::new(request_id.clone(), upload.bytes, upload.content_type)
        .with_template(template);

    match state.personalizer.personalize(request).await {
        Ok(output) => Ok(HttpResponse::Ok().content_type("image/png").body(output.png)),
        Err(PersonalizeError::InvalidInput(detail)) => {
            log::warn!("[req:{}] Rejected upload: {}", request_id, detail);
            Err(ApiError::BadRequest(detail))
        }
        Err(e) => {
            log::error!("[req:{}] Error processing image: {}", request_id, e);
            Err(ApiError::Internal)
        }
    }
}

async fn read_upload(mut payload: Multipart, max_file_bytes: usize) -> Result<Upload, ApiError> {
    let mut file: Option<(Vec<u8>, Option<String>)> = None;
    let mut template = None;

    while let Some(field) = payload.try_next().await.map_err(malformed)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let content_type = field.content_type().map(|mime| mime.to_string());
                let bytes = read_field(field, max_file_bytes).await?;
                file = Some((bytes, content_type));
            }
            Some("template") => {
                let raw = read_field(field, MAX_TEXT_FIELD_BYTES).await?;
                let name = String::from_utf8_lossy(&raw).trim().to_string();
                template = (!name.is_empty()).then_some(name);
            }
            _ => {
                read_field(field, MAX_TEXT_FIELD_BYTES).await?;
            }
        }
    }

    let (bytes, content_type) =
        file.ok_or_else(|| ApiError::BadRequest("Missing file field".to_string()))?;
    Ok(Upload {
        bytes,
        content_type,
        template,
    })
}

/// Collects one field, rejecting it as soon as it grows past `limit` bytes.
async fn read_field(mut field: Field, limit: usize) -> Result<Vec<u8>, ApiError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(malformed)? {
        if bytes.len() + chunk.len() > limit {
            let name = field.name().unwrap_or("unnamed").to_string();
            return Err(ApiError::BadRequest(format!(
                "Field '{}' is too large (limit {} bytes)",
                name, limit
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

fn malformed(err: actix_multipart::MultipartError) -> ApiError {
    ApiError::BadRequest(format!("Malformed multipart body: {}", err))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(root).service(health).service(personalize);
}

pub fn cors(allowed_origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allow_any_method()
        .allow_any_header()
        .supports_credentials();
    if allowed_origins.iter().any(|origin| origin == "*") {
        return cors.allow_any_origin();
    }
    allowed_origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}

/// Binds the configured address and serves until shutdown. Every worker
/// runs its own event loop, and a request waiting on a prediction only
/// suspends its own task.
pub async fn run(config: Config) -> std::io::Result<()> {
    let personalizer = Personalizer::from_config(&config);
    personalizer
        .templates()
        .ensure_dir()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    let state = web::Data::new(AppState::new(personalizer, config.max_upload_bytes));
    let allowed_origins = config.allowed_origins.clone();

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(cors(&allowed_origins))
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind(config.bind_address())?
    .run()
    .await
}
