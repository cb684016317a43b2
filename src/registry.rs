//! Catalog of provider backends and the memoized cache of their clients.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use regex::Regex;
use tokio::sync::OnceCell;

use crate::client::ProviderClient;
use crate::config::ClientConfig;
use crate::credentials::{CredentialStore, EnvCredentials};
use crate::providers::backend_for;
use crate::types::{CustomProviderConfig, ProviderMetadata, WireFormat};
use crate::Error;

/// Ids of user-registered providers must start with this prefix.
pub const CUSTOM_PROVIDER_PREFIX: &str = "custom-";

type ClientCell = Arc<OnceCell<Arc<ProviderClient>>>;

/// Built-in backend descriptions.
pub fn builtin_providers() -> Vec<ProviderMetadata> {
    vec![
        builtin(
            "openai",
            "OpenAI",
            "https://api.openai.com/v1/chat/completions",
            &["gpt-4o", "gpt-4o-mini", "gpt-4.1", "gpt-4.1-mini", "o3-mini"],
            r"^sk-[A-Za-z0-9_-]{20,}$",
            WireFormat::OpenAiCompatible,
            false,
        ),
        builtin(
            "deepseek",
            "DeepSeek",
            "https://api.deepseek.com/chat/completions",
            &["deepseek-chat", "deepseek-reasoner"],
            r"^sk-[A-Za-z0-9]{32,}$",
            WireFormat::OpenAiCompatible,
            true,
        ),
        builtin(
            "moonshot",
            "Moonshot",
            "https://api.moonshot.cn/v1/chat/completions",
            &[
                "moonshot-v1-8k",
                "moonshot-v1-32k",
                "moonshot-v1-128k",
                "kimi-k2-0711-preview",
            ],
            r"^sk-[A-Za-z0-9]{32,}$",
            WireFormat::OpenAiCompatible,
            false,
        ),
        builtin(
            "openrouter",
            "OpenRouter",
            "https://openrouter.ai/api/v1/chat/completions",
            &[
                "openai/gpt-4o",
                "anthropic/claude-3.5-sonnet",
                "deepseek/deepseek-r1",
            ],
            r"^sk-or-[A-Za-z0-9-]{20,}$",
            WireFormat::OpenAiCompatible,
            true,
        ),
        builtin(
            "anthropic",
            "Anthropic",
            "https://api.anthropic.com/v1/messages",
            &[
                "claude-3-5-sonnet-20241022",
                "claude-3-7-sonnet-20250219",
                "claude-sonnet-4-20250514",
                "claude-3-5-haiku-20241022",
            ],
            r"^sk-ant-[A-Za-z0-9_-]{20,}$",
            WireFormat::Anthropic,
            true,
        ),
        builtin(
            "gemini",
            "Google Gemini",
            "https://generativelanguage.googleapis.com/v1beta/models",
            &["gemini-2.5-pro", "gemini-2.5-flash", "gemini-2.0-flash"],
            r"^AIza[0-9A-Za-z_-]{35}$",
            WireFormat::Gemini,
            true,
        ),
        builtin(
            "qwen",
            "Qwen (DashScope)",
            "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation",
            &["qwen-max", "qwen-plus", "qwen-turbo", "qwq-plus"],
            r"^sk-[A-Za-z0-9]{20,}$",
            WireFormat::DashScope,
            false,
        ),
    ]
}

fn builtin(
    id: &str,
    display_name: &str,
    endpoint: &str,
    models: &[&str],
    key_pattern: &str,
    wire_format: WireFormat,
    supports_thinking: bool,
) -> ProviderMetadata {
    ProviderMetadata {
        id: id.to_string(),
        display_name: display_name.to_string(),
        endpoint: endpoint.to_string(),
        default_model: models[0].to_string(),
        models: models.iter().map(|m| m.to_string()).collect(),
        supports_streaming: true,
        supports_thinking,
        key_pattern: Some(Regex::new(key_pattern).expect("valid built-in key pattern")),
        wire_format,
        thinking_idle_threshold: None,
        request_timeout: None,
        is_custom: false,
    }
}

/// Provider catalog plus lazily created, shared clients.
///
/// Concurrent first loads of the same id construct exactly one client.
pub struct Registry {
    builtins: HashMap<String, Arc<ProviderMetadata>>,
    custom: RwLock<HashMap<String, Arc<ProviderMetadata>>>,
    instances: Mutex<HashMap<String, ClientCell>>,
    http: reqwest::Client,
    credentials: Arc<dyn CredentialStore>,
    config: ClientConfig,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("providers", &self.provider_ids())
            .field("config", &self.config)
            .finish()
    }
}

impl Registry {
    pub fn new(credentials: Arc<dyn CredentialStore>, config: ClientConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        let builtins = builtin_providers()
            .into_iter()
            .map(|m| (m.id.clone(), Arc::new(m)))
            .collect();

        Ok(Self {
            builtins,
            custom: RwLock::new(HashMap::new()),
            instances: Mutex::new(HashMap::new()),
            http,
            credentials,
            config,
        })
    }

    /// Registry reading keys and settings from the environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::new(Arc::new(EnvCredentials), ClientConfig::from_env()?)
    }

    /// Send a built-in provider's requests to another base endpoint, such as a proxy or
    /// a local mock server.
    pub fn with_endpoint(mut self, id: &str, endpoint: impl Into<String>) -> Result<Self, Error> {
        let metadata = self
            .builtins
            .get_mut(id)
            .ok_or_else(|| Error::UnknownProvider(id.to_string()))?;
        let mut updated = ProviderMetadata::clone(metadata);
        updated.endpoint = endpoint.into();
        *metadata = Arc::new(updated);
        self.evict(id);
        Ok(self)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn get_metadata(&self, id: &str) -> Result<Arc<ProviderMetadata>, Error> {
        if let Some(metadata) = self.builtins.get(id) {
            return Ok(Arc::clone(metadata));
        }
        let custom = self.custom.read().unwrap_or_else(|e| e.into_inner());
        custom
            .get(id)
            .cloned()
            .ok_or_else(|| Error::UnknownProvider(id.to_string()))
    }

    /// Shared client for `id`, created on first use.
    pub async fn load_provider(&self, id: &str) -> Result<Arc<ProviderClient>, Error> {
        let cell = {
            let mut instances = self.instances.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(instances.entry(id.to_string()).or_default())
        };

        let client = cell
            .get_or_try_init(|| async {
                let metadata = self.get_metadata(id)?;
                tracing::debug!(provider = %id, "instantiating provider client");
                Ok::<_, Error>(Arc::new(ProviderClient::new(
                    Arc::clone(&metadata),
                    backend_for(metadata.wire_format),
                    self.http.clone(),
                    Arc::clone(&self.credentials),
                    self.config.clone(),
                )))
            })
            .await;

        match client {
            Ok(client) => Ok(Arc::clone(client)),
            Err(e) => {
                self.evict_if_empty(id, &cell);
                Err(e)
            }
        }
    }

    /// Add or replace an OpenAI-compatible backend. A cached client for the id is dropped.
    pub fn register_custom_provider(
        &self,
        config: CustomProviderConfig,
    ) -> Result<Arc<ProviderMetadata>, Error> {
        let metadata = Arc::new(custom_metadata(config)?);
        let id = metadata.id.clone();

        {
            let mut custom = self.custom.write().unwrap_or_else(|e| e.into_inner());
            custom.insert(id.clone(), Arc::clone(&metadata));
        }
        self.evict(&id);

        tracing::info!(provider = %id, endpoint = %metadata.endpoint, "registered custom provider");
        Ok(metadata)
    }

    /// Remove a custom backend and its cached client. Returns whether it existed.
    pub fn unregister_custom_provider(&self, id: &str) -> bool {
        let removed = {
            let mut custom = self.custom.write().unwrap_or_else(|e| e.into_inner());
            custom.remove(id).is_some()
        };
        if removed {
            self.evict(id);
            tracing::info!(provider = %id, "unregistered custom provider");
        }
        removed
    }

    /// Check a key against the provider's documented format. Custom providers accept any key.
    pub fn validate_api_key(&self, id: &str, key: &str) -> Result<bool, Error> {
        Ok(self.get_metadata(id)?.validate_api_key(key))
    }

    /// Fails with [`Error::UnsupportedModel`] when a built-in provider does not list `model`.
    pub fn validate_model(&self, id: &str, model: &str) -> Result<(), Error> {
        let metadata = self.get_metadata(id)?;
        if model.is_empty() || metadata.supports_model(model) {
            Ok(())
        } else {
            Err(Error::UnsupportedModel {
                provider: id.to_string(),
                model: model.to_string(),
            })
        }
    }

    /// All providers: built-ins first, then custom ones, each group sorted by id.
    pub fn list_providers(&self) -> Vec<Arc<ProviderMetadata>> {
        let mut builtins: Vec<_> = self.builtins.values().cloned().collect();
        builtins.sort_by(|a, b| a.id.cmp(&b.id));

        let mut custom: Vec<_> = {
            let custom = self.custom.read().unwrap_or_else(|e| e.into_inner());
            custom.values().cloned().collect()
        };
        custom.sort_by(|a, b| a.id.cmp(&b.id));

        builtins.extend(custom);
        builtins
    }

    fn provider_ids(&self) -> Vec<String> {
        self.list_providers().iter().map(|m| m.id.clone()).collect()
    }

    fn evict(&self, id: &str) {
        let mut instances = self.instances.lock().unwrap_or_else(|e| e.into_inner());
        instances.remove(id);
    }

    /// Drop a cell whose initialization failed, unless another caller replaced it.
    fn evict_if_empty(&self, id: &str, cell: &ClientCell) {
        let mut instances = self.instances.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(current) = instances.get(id) {
            if Arc::ptr_eq(current, cell) && !current.initialized() {
                instances.remove(id);
            }
        }
    }
}

fn custom_metadata(config: CustomProviderConfig) -> Result<ProviderMetadata, Error> {
    let invalid = |msg: String| Error::InvalidCustomProvider(msg);

    let suffix = config
        .id
        .strip_prefix(CUSTOM_PROVIDER_PREFIX)
        .ok_or_else(|| {
            invalid(format!(
                "id '{}' must start with '{CUSTOM_PROVIDER_PREFIX}'",
                config.id
            ))
        })?;
    if suffix.is_empty() {
        return Err(invalid("id has no name after the prefix".to_string()));
    }

    let url = reqwest::Url::parse(config.base_url.trim())
        .map_err(|e| invalid(format!("base URL '{}': {e}", config.base_url)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!(
            "base URL '{}' must use http or https",
            config.base_url
        )));
    }

    let models: Vec<String> = config
        .models
        .into_iter()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();
    if models.is_empty() {
        return Err(invalid("model list is empty".to_string()));
    }

    let default_model = config
        .default_model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| models[0].clone());

    let base = url.as_str().trim_end_matches('/');
    let endpoint = if base.ends_with("/chat/completions") {
        base.to_string()
    } else {
        format!("{base}/chat/completions")
    };

    Ok(ProviderMetadata {
        id: config.id,
        display_name: config.display_name,
        endpoint,
        default_model,
        models,
        supports_streaming: true,
        supports_thinking: config.supports_thinking,
        key_pattern: None,
        wire_format: WireFormat::OpenAiCompatible,
        thinking_idle_threshold: config.thinking_idle_threshold_ms.map(Duration::from_millis),
        request_timeout: config.request_timeout_secs.map(Duration::from_secs),
        is_custom: true,
    })
}
