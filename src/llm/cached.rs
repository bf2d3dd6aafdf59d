use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::llm::prompts::ClassificationRequest;
use crate::llm::provider::ClassificationClient;
use crate::storage::ResponseCache;

/// Serves repeated requests from the response cache and records fresh
/// successful replies. Cache trouble is logged and bypassed.
pub struct CachedClient<C> {
    inner: C,
    cache: Arc<ResponseCache>,
}

impl<C: ClassificationClient> CachedClient<C> {
    pub fn new(inner: C, cache: Arc<ResponseCache>) -> Self {
        Self { inner, cache }
    }

    // SQLite calls block, so they run on tokio's blocking pool
    async fn lookup(&self, key: &str) -> Option<String> {
        let cache = self.cache.clone();
        let client = self.inner.name().to_string();
        let model = self.inner.model().to_string();
        let key = key.to_string();

        match tokio::task::spawn_blocking(move || cache.get(&client, &model, &key)).await {
            Ok(Ok(hit)) => hit,
            Ok(Err(e)) => {
                tracing::warn!("Response cache lookup failed: {}", e);
                None
            }
            Err(e) => {
                tracing::warn!("Response cache lookup task failed: {}", e);
                None
            }
        }
    }

    async fn store(&self, key: String, response: String) {
        let cache = self.cache.clone();
        let client = self.inner.name().to_string();
        let model = self.inner.model().to_string();

        match tokio::task::spawn_blocking(move || cache.put(&client, &model, &key, &response))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Failed to store response in cache: {}", e),
            Err(e) => tracing::warn!("Response cache store task failed: {}", e),
        }
    }
}

#[async_trait]
impl<C: ClassificationClient> ClassificationClient for CachedClient<C> {
    async fn classify(&self, request: &ClassificationRequest) -> Result<String> {
        let key = request.cache_key();

        if let Some(response) = self.lookup(&key).await {
            tracing::debug!(module = %request.module_name, "Cache hit");
            return Ok(response);
        }

        let response = self.inner.classify(request).await?;
        self.store(key, response.clone()).await;

        Ok(response)
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
