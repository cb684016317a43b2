//! Credential lookup. The core only ever reads keys; it never stores or logs them.

use std::collections::HashMap;
use std::env;
use std::sync::RwLock;

/// Source of API keys, keyed by provider id.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_key(&self, provider_id: &str) -> Option<String>;
}

/// Reads keys from environment variables.
///
/// Built-in providers use their vendor's conventional variable name; any other id
/// maps to `<ID>_API_KEY` with `-` replaced by `_` (`custom-local` -> `CUSTOM_LOCAL_API_KEY`).
#[derive(Debug, Default, Clone)]
pub struct EnvCredentials;

impl EnvCredentials {
    pub fn variable_for(provider_id: &str) -> String {
        match provider_id {
            "openai" => "OPENAI_API_KEY".to_string(),
            "deepseek" => "DEEPSEEK_API_KEY".to_string(),
            "moonshot" => "MOONSHOT_API_KEY".to_string(),
            "openrouter" => "OPENROUTER_API_KEY".to_string(),
            "anthropic" => "ANTHROPIC_API_KEY".to_string(),
            "gemini" => "GEMINI_API_KEY".to_string(),
            "qwen" => "DASHSCOPE_API_KEY".to_string(),
            other => format!("{}_API_KEY", other.to_uppercase().replace('-', "_")),
        }
    }
}

#[async_trait::async_trait]
impl CredentialStore for EnvCredentials {
    async fn get_key(&self, provider_id: &str) -> Option<String> {
        env::var(Self::variable_for(provider_id))
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// In-memory keys, typically filled from the host application's settings.
#[derive(Default)]
pub struct StaticCredentials {
    keys: RwLock<HashMap<String, String>>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(self, provider_id: impl Into<String>, key: impl Into<String>) -> Self {
        self.set_key(provider_id, key);
        self
    }

    pub fn set_key(&self, provider_id: impl Into<String>, key: impl Into<String>) {
        let mut keys = self.keys.write().unwrap_or_else(|e| e.into_inner());
        keys.insert(provider_id.into(), key.into());
    }

    pub fn remove_key(&self, provider_id: &str) {
        let mut keys = self.keys.write().unwrap_or_else(|e| e.into_inner());
        keys.remove(provider_id);
    }
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys = self.keys.read().unwrap_or_else(|e| e.into_inner());
        let mut providers: Vec<&String> = keys.keys().collect();
        providers.sort();
        f.debug_struct("StaticCredentials")
            .field("providers", &providers)
            .field("keys", &"[REDACTED]")
            .finish()
    }
}

#[async_trait::async_trait]
impl CredentialStore for StaticCredentials {
    async fn get_key(&self, provider_id: &str) -> Option<String> {
        let keys = self.keys.read().unwrap_or_else(|e| e.into_inner());
        keys.get(provider_id)
            .filter(|key| !key.trim().is_empty())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_variable_names() {
        assert_eq!(EnvCredentials::variable_for("qwen"), "DASHSCOPE_API_KEY");
        assert_eq!(EnvCredentials::variable_for("anthropic"), "ANTHROPIC_API_KEY");
        assert_eq!(
            EnvCredentials::variable_for("custom-local-llm"),
            "CUSTOM_LOCAL_LLM_API_KEY"
        );
    }

    #[tokio::test]
    async fn test_static_credentials() {
        let store = StaticCredentials::new().with_key("openai", "sk-test");
        assert_eq!(store.get_key("openai").await.as_deref(), Some("sk-test"));
        assert_eq!(store.get_key("gemini").await, None);

        store.set_key("gemini", "   ");
        assert_eq!(store.get_key("gemini").await, None);

        store.remove_key("openai");
        assert_eq!(store.get_key("openai").await, None);
    }

    #[test]
    fn test_debug_redacts_keys() {
        let store = StaticCredentials::new().with_key("openai", "sk-super-secret");
        let rendered = format!("{store:?}");
        assert!(rendered.contains("openai"));
        assert!(!rendered.contains("sk-super-secret"));
    }
}
