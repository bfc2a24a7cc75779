//! Backend router — resolves the active model backend per turn.

use crate::openai_compat::OpenAiCompatBackend;
use sidekick_config::AppConfig;
use sidekick_core::backend::ModelBackend;
use sidekick_core::error::BackendError;
use std::collections::HashMap;
use std::sync::Arc;

/// Routes model requests to the correct backend.
pub struct BackendRouter {
    backends: HashMap<String, Arc<dyn ModelBackend>>,
    active: Option<String>,
}

impl BackendRouter {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            active: None,
        }
    }

    /// Register a backend. The first registered backend becomes active.
    pub fn register(&mut self, backend: Arc<dyn ModelBackend>) {
        let name = backend.name().to_string();
        if self.active.is_none() {
            self.active = Some(name.clone());
        }
        self.backends.insert(name, backend);
    }

    /// Mark a registered backend as the active one.
    pub fn set_active(&mut self, name: &str) -> Result<(), BackendError> {
        if !self.backends.contains_key(name) {
            return Err(BackendError::NoActiveModel);
        }
        self.active = Some(name.to_string());
        Ok(())
    }

    /// The backend the engine should use this turn.
    pub fn active(&self) -> Result<Arc<dyn ModelBackend>, BackendError> {
        self.active
            .as_ref()
            .and_then(|name| self.backends.get(name))
            .cloned()
            .ok_or(BackendError::NoActiveModel)
    }

    /// Get a specific backend by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ModelBackend>> {
        self.backends.get(name).cloned()
    }

    /// List all registered backend names.
    pub fn list(&self) -> Vec<&str> {
        self.backends.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for BackendRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the router from configuration.
///
/// One OpenAI-compatible backend pointed at the configured endpoint is
/// enough for every server we support; the endpoint decides whether
/// that's LM Studio, Ollama, or something remote.
pub fn build_from_config(config: &AppConfig) -> BackendRouter {
    let mut router = BackendRouter::new();
    router.register(Arc::new(OpenAiCompatBackend::new(
        "openai_compat",
        &config.backend.base_url,
        config.backend.api_key.clone(),
    )));
    router
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sidekick_core::backend::{ModelReply, ModelRequest};

    struct NamedBackend(&'static str);

    #[async_trait]
    impl ModelBackend for NamedBackend {
        fn name(&self) -> &str {
            self.0
        }
        async fn complete(&self, request: ModelRequest) -> Result<ModelReply, BackendError> {
            Ok(ModelReply::text(request.model, "ok"))
        }
    }

    #[test]
    fn empty_router_has_no_active_model() {
        let router = BackendRouter::new();
        assert!(matches!(
            router.active(),
            Err(BackendError::NoActiveModel)
        ));
    }

    #[test]
    fn first_registered_becomes_active() {
        let mut router = BackendRouter::new();
        router.register(Arc::new(NamedBackend("a")));
        router.register(Arc::new(NamedBackend("b")));
        assert_eq!(router.active().unwrap().name(), "a");
    }

    #[test]
    fn set_active_switches() {
        let mut router = BackendRouter::new();
        router.register(Arc::new(NamedBackend("a")));
        router.register(Arc::new(NamedBackend("b")));
        router.set_active("b").unwrap();
        assert_eq!(router.active().unwrap().name(), "b");
    }

    #[test]
    fn set_active_unknown_fails() {
        let mut router = BackendRouter::new();
        router.register(Arc::new(NamedBackend("a")));
        assert!(router.set_active("missing").is_err());
    }

    #[test]
    fn build_from_config_registers_endpoint() {
        let config = AppConfig::default();
        let router = build_from_config(&config);
        assert_eq!(router.list(), vec!["openai_compat"]);
        assert!(router.active().is_ok());
    }
}
