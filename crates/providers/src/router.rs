//! Provider router: maps a [`ProviderKind`] to a live transport.
//!
//! Built once from configuration and shared read-only by the worker.

use agentflow_core::agent::ProviderKind;
use agentflow_core::error::ProviderError;
use agentflow_core::provider::Provider;
use std::collections::HashMap;
use std::sync::Arc;

use crate::openai_compat::{DEFAULT_OPENAI_URL, OpenAiCompatProvider};

/// Routes model calls to the correct provider.
#[derive(Default, Clone)]
pub struct ProviderRouter {
    providers: HashMap<ProviderKind, Arc<dyn Provider>>,
}

impl ProviderRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider. Replaces any existing one for the same kind.
    pub fn register(&mut self, kind: ProviderKind, provider: Arc<dyn Provider>) {
        self.providers.insert(kind, provider);
    }

    /// Builder-style registration.
    pub fn with(mut self, kind: ProviderKind, provider: Arc<dyn Provider>) -> Self {
        self.register(kind, provider);
        self
    }

    /// Get the transport for a provider kind.
    pub fn get(&self, kind: ProviderKind) -> Result<Arc<dyn Provider>, ProviderError> {
        self.providers.get(&kind).cloned().ok_or_else(|| {
            ProviderError::NotConfigured(format!("no transport registered for {kind}"))
        })
    }

    /// Registered provider kinds, in a stable order.
    pub fn list(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|k| self.providers.contains_key(k))
            .collect()
    }
}

/// Build providers from configuration.
///
/// Only OpenAI has a transport. It is registered even without an API key so
/// that calls fail with a fatal `NotConfigured` instead of a missing route.
pub fn build_from_config(
    config: &agentflow_config::AppConfig,
) -> Result<ProviderRouter, ProviderError> {
    let api_key = config.api_key_for("openai").unwrap_or_default();
    let base_url = config.api_url_for("openai").unwrap_or(DEFAULT_OPENAI_URL);

    let openai = OpenAiCompatProvider::new("openai", base_url, api_key)?;
    Ok(ProviderRouter::new().with(ProviderKind::OpenAi, Arc::new(openai)))
}
