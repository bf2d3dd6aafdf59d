use async_trait::async_trait;
use crate::error::Result;
use crate::llm::prompts::ClassificationRequest;

/// The external classification capability. Implementations return the raw
/// reply text; interpreting it is the resolver's job. No retries happen here.
#[async_trait]
pub trait ClassificationClient: Send + Sync {
    async fn classify(&self, request: &ClassificationRequest) -> Result<String>;
    fn model(&self) -> &str;
    fn name(&self) -> &str;
}
