pub mod api;
#[cfg(test)]
pub(crate) mod mock;
pub mod prediction_client;

use std::sync::Arc;

use crate::config::ReplicateConfig;

pub use api::{PredictionApi, ReplicateApi};
pub use prediction_client::PredictionClient;

/// A prediction client for `config`, or `None` when no API token is set.
pub fn client_from_config(config: &ReplicateConfig) -> Option<PredictionClient> {
    let token = config.api_token.as_ref()?;
    let api: Arc<dyn PredictionApi> = Arc::new(ReplicateApi::new(config, token.clone()));
    Some(PredictionClient::new(api, config.model_version.clone(), config.poll))
}
