pub mod config;
pub mod error;
pub mod imaging;
pub mod logger;
pub mod models;
pub mod personalizer;
pub mod replicate;
#[cfg(feature = "server")]
pub mod server;
pub mod templates;

pub use config::{Config, PollSettings, ReplicateConfig};
pub use error::{GenerationError, GenerationResult, PersonalizeError, Result};
pub use personalizer::{PersonalizeOutput, PersonalizeRequest, Personalizer, RenderPath};
pub use replicate::{PredictionApi, PredictionClient, ReplicateApi};
pub use templates::TemplateStore;
