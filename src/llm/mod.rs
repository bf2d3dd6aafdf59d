pub mod provider;
pub mod openai;
pub mod claude;
pub mod cached;
pub mod prompts;
pub mod parser;
pub mod resolver;

pub use provider::ClassificationClient;
pub use openai::OpenAIClassifier;
pub use claude::ClaudeClassifier;
pub use cached::CachedClient;
pub use prompts::{ClassificationRequest, ReferenceList};

use std::sync::Arc;

use crate::config::{ClassifierConfig, Provider};
use crate::error::Result;
use crate::storage::ResponseCache;

/// Builds the client for the configured provider, wrapped in the response
/// cache when one is given.
pub fn build_client(
    config: ClassifierConfig,
    cache: Option<Arc<ResponseCache>>,
) -> Result<Arc<dyn ClassificationClient>> {
    let client: Arc<dyn ClassificationClient> = match (config.provider, cache) {
        (Provider::OpenAI, None) => Arc::new(OpenAIClassifier::new(config)?),
        (Provider::OpenAI, Some(cache)) => {
            Arc::new(CachedClient::new(OpenAIClassifier::new(config)?, cache))
        }
        (Provider::Anthropic, None) => Arc::new(ClaudeClassifier::new(config)?),
        (Provider::Anthropic, Some(cache)) => {
            Arc::new(CachedClient::new(ClaudeClassifier::new(config)?, cache))
        }
    };
    Ok(client)
}
