//! Relay configuration.
//!
//! Built once at start-up and handed to the dispatcher. Sources, lowest to
//! highest precedence for credentials: YAML file, then environment for
//! anything the file left unset.
//!
//! Environment variables:
//! - `OPENAI_API_KEY`, `ELEVENLABS_API_KEY`
//! - `OPENAI_BASE_URL`, `ELEVENLABS_BASE_URL`
//! - `AI_RELAY_ALLOWED_ACTIONS` (comma separated, e.g. `chat,embed`)
//! - `AI_RELAY_MALFORMED_FRAMES` (`abort` or `skip`)
//! - `AI_RELAY_BIND`, `AI_RELAY_PATH`
//! - `AI_HTTP_TIMEOUT_SECS`, `AI_PROXY_URL` (see [`HttpTransportConfig`])

use crate::pipeline::FramePolicy;
use crate::template::{ChatDefaults, Template};
use crate::transport::HttpTransportConfig;
use crate::types::Action;
use crate::{Error, ErrorContext, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";

/// Where the standalone server listens.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            path: "/api/ai".to_string(),
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    #[serde(deserialize_with = "secret_from_str")]
    pub openai_api_key: Option<SecretString>,
    #[serde(deserialize_with = "secret_from_str")]
    pub elevenlabs_api_key: Option<SecretString>,
    /// `None` allows every action; `Some(list)` allows only the listed ones.
    pub allowed_actions: Option<Vec<Action>>,
    pub openai_base_url: String,
    pub elevenlabs_base_url: String,
    pub chat_defaults: ChatDefaults,
    pub malformed_frames: FramePolicy,
    pub timeout_secs: Option<u64>,
    pub proxy_url: Option<String>,
    pub templates: Vec<Template>,
    pub server: ServerConfig,
}

fn secret_from_str<'de, D>(deserializer: D) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_empty()).map(SecretString::from))
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            elevenlabs_api_key: None,
            allowed_actions: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            elevenlabs_base_url: DEFAULT_ELEVENLABS_BASE_URL.to_string(),
            chat_defaults: ChatDefaults::default(),
            malformed_frames: FramePolicy::default(),
            timeout_secs: None,
            proxy_url: None,
            templates: Vec::new(),
            server: ServerConfig::default(),
        }
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |k: &Option<SecretString>| if k.is_some() { "[set]" } else { "[unset]" };
        f.debug_struct("RelayConfig")
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("elevenlabs_api_key", &redact(&self.elevenlabs_api_key))
            .field("allowed_actions", &self.allowed_actions)
            .field("openai_base_url", &self.openai_base_url)
            .field("elevenlabs_base_url", &self.elevenlabs_base_url)
            .field("chat_defaults", &self.chat_defaults)
            .field("malformed_frames", &self.malformed_frames)
            .field("timeout_secs", &self.timeout_secs)
            .field("proxy_url", &self.proxy_url)
            .field("templates", &self.templates.len())
            .field("server", &self.server)
            .finish()
    }
}

impl RelayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.openai_api_key = Some(SecretString::from(key.into()));
        self
    }

    pub fn with_elevenlabs_api_key(mut self, key: impl Into<String>) -> Self {
        self.elevenlabs_api_key = Some(SecretString::from(key.into()));
        self
    }

    pub fn with_allowed_actions(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.allowed_actions = Some(actions.into_iter().collect());
        self
    }

    pub fn with_openai_base_url(mut self, url: impl Into<String>) -> Self {
        self.openai_base_url = url.into();
        self
    }

    pub fn with_elevenlabs_base_url(mut self, url: impl Into<String>) -> Self {
        self.elevenlabs_base_url = url.into();
        self
    }

    pub fn with_malformed_frames(mut self, policy: FramePolicy) -> Self {
        self.malformed_frames = policy;
        self
    }

    pub fn with_chat_defaults(mut self, defaults: ChatDefaults) -> Self {
        self.chat_defaults = defaults;
        self
    }

    /// Defaults plus environment.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_env(|k| std::env::var(k).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            Error::configuration_with_context(
                "Invalid relay configuration",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("config"),
            )
        })
    }

    /// Read a YAML file, then fill anything it left unset from the environment.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut cfg = Self::from_yaml_str(&text)?;
        cfg.apply_env(|k| std::env::var(k).ok())?;
        cfg.validate()?;
        tracing::info!(path = %path.display(), templates = cfg.templates.len(), "loaded relay configuration");
        Ok(cfg)
    }

    /// Fill unset fields from `lookup` (normally `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());

        if self.openai_api_key.is_none() {
            self.openai_api_key = get("OPENAI_API_KEY").map(SecretString::from);
        }
        if self.elevenlabs_api_key.is_none() {
            self.elevenlabs_api_key = get("ELEVENLABS_API_KEY").map(SecretString::from);
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            if self.openai_base_url == DEFAULT_OPENAI_BASE_URL {
                self.openai_base_url = url;
            }
        }
        if let Some(url) = get("ELEVENLABS_BASE_URL") {
            if self.elevenlabs_base_url == DEFAULT_ELEVENLABS_BASE_URL {
                self.elevenlabs_base_url = url;
            }
        }
        if self.allowed_actions.is_none() {
            if let Some(list) = get("AI_RELAY_ALLOWED_ACTIONS") {
                let actions = list
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| {
                        s.parse::<Action>().map_err(|_| {
                            Error::configuration_with_context(
                                format!("Unknown action in allow-list: {}", s),
                                ErrorContext::new().with_field_path("AI_RELAY_ALLOWED_ACTIONS"),
                            )
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                self.allowed_actions = Some(actions);
            }
        }
        if let Some(policy) = get("AI_RELAY_MALFORMED_FRAMES") {
            self.malformed_frames = policy.parse().map_err(|e: crate::pipeline::PipelineError| {
                Error::configuration_with_context(
                    e.to_string(),
                    ErrorContext::new().with_field_path("AI_RELAY_MALFORMED_FRAMES"),
                )
            })?;
        }
        if let Some(bind) = get("AI_RELAY_BIND") {
            self.server.bind = bind;
        }
        if let Some(path) = get("AI_RELAY_PATH") {
            self.server.path = path;
        }
        Ok(())
    }

    /// Check that base URLs are absolute http(s) URLs and template ids are non-empty.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("openai_base_url", &self.openai_base_url),
            ("elevenlabs_base_url", &self.elevenlabs_base_url),
        ] {
            let parsed = url::Url::parse(value).map_err(|e| {
                Error::configuration_with_context(
                    format!("Invalid URL: {}", value),
                    ErrorContext::new()
                        .with_field_path(field)
                        .with_details(e.to_string()),
                )
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(Error::configuration_with_context(
                    format!("Unsupported URL scheme: {}", parsed.scheme()),
                    ErrorContext::new().with_field_path(field),
                ));
            }
        }
        if let Some(t) = self.templates.iter().find(|t| t.id.trim().is_empty()) {
            return Err(Error::configuration_with_context(
                "Template id must not be empty",
                ErrorContext::new()
                    .with_field_path("templates")
                    .with_details(format!("{:?}", t.system_prompt)),
            ));
        }
        Ok(())
    }

    /// An absent or empty allow-list places no restriction.
    pub fn is_allowed(&self, action: Action) -> bool {
        match &self.allowed_actions {
            Some(list) if !list.is_empty() => list.contains(&action),
            _ => true,
        }
    }

    /// The credential an action needs, if configured.
    pub fn credential_for(&self, action: Action) -> Option<&SecretString> {
        match action {
            Action::Chat | Action::Embed | Action::Transcribe => self.openai_api_key.as_ref(),
            Action::Speak => self.elevenlabs_api_key.as_ref(),
        }
    }

    /// Transport settings: environment defaults, overridden by this config.
    pub fn transport_config(&self) -> HttpTransportConfig {
        let mut cfg = HttpTransportConfig::from_env();
        if let Some(secs) = self.timeout_secs {
            cfg.timeout = Duration::from_secs(secs);
        }
        if let Some(proxy) = &self.proxy_url {
            cfg.proxy_url = Some(proxy.clone());
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn yaml_round_trip_of_main_fields() {
        let cfg = RelayConfig::from_yaml_str(
            r#"
openai_api_key: sk-file
allowed_actions: [chat, embed]
malformed_frames: skip
chat_defaults:
  model: gpt-4
  max_tokens: 256
  temperature: 0.5
templates:
  - id: greeter
    systemPrompt: "You are {{name}}"
    temperature: 0.1
server:
  path: /v1/relay
"#,
        )
        .unwrap();
        assert_eq!(cfg.openai_api_key.as_ref().unwrap().expose_secret(), "sk-file");
        assert_eq!(cfg.allowed_actions, Some(vec![Action::Chat, Action::Embed]));
        assert_eq!(cfg.malformed_frames, FramePolicy::Skip);
        assert_eq!(cfg.chat_defaults.model, "gpt-4");
        assert_eq!(cfg.templates[0].params.temperature, Some(0.1));
        assert_eq!(cfg.server.path, "/v1/relay");
        assert_eq!(cfg.server.bind, "127.0.0.1:3000");
        assert_eq!(cfg.openai_base_url, DEFAULT_OPENAI_BASE_URL);
        cfg.validate().unwrap();
    }

    #[test]
    fn env_fills_only_unset_credentials() {
        let mut cfg = RelayConfig::new().with_openai_api_key("sk-explicit");
        cfg.apply_env(env(&[
            ("OPENAI_API_KEY", "sk-env"),
            ("ELEVENLABS_API_KEY", "el-env"),
            ("AI_RELAY_ALLOWED_ACTIONS", "chat, speak"),
            ("AI_RELAY_MALFORMED_FRAMES", "skip"),
        ]))
        .unwrap();
        assert_eq!(cfg.openai_api_key.unwrap().expose_secret(), "sk-explicit");
        assert_eq!(cfg.elevenlabs_api_key.unwrap().expose_secret(), "el-env");
        assert_eq!(cfg.allowed_actions, Some(vec![Action::Chat, Action::Speak]));
        assert_eq!(cfg.malformed_frames, FramePolicy::Skip);
    }

    #[test]
    fn unknown_action_in_env_is_rejected() {
        let mut cfg = RelayConfig::new();
        let err = cfg
            .apply_env(env(&[("AI_RELAY_ALLOWED_ACTIONS", "chat,paint")]))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn allow_list_semantics() {
        let open = RelayConfig::new();
        assert!(Action::ALL.iter().all(|a| open.is_allowed(*a)));

        let chat_only = RelayConfig::new().with_allowed_actions([Action::Chat]);
        assert!(chat_only.is_allowed(Action::Chat));
        assert!(!chat_only.is_allowed(Action::Embed));

        let empty = RelayConfig::new().with_allowed_actions(Vec::<Action>::new());
        assert!(Action::ALL.iter().all(|a| empty.is_allowed(*a)));

        let from_yaml = RelayConfig::from_yaml_str("allowed_actions: []").unwrap();
        assert_eq!(from_yaml.allowed_actions, Some(vec![]));
        assert!(from_yaml.is_allowed(Action::Speak));
    }

    #[test]
    fn credentials_per_action() {
        let cfg = RelayConfig::new().with_elevenlabs_api_key("el");
        assert!(cfg.credential_for(Action::Speak).is_some());
        assert!(cfg.credential_for(Action::Chat).is_none());
    }

    #[test]
    fn debug_hides_keys() {
        let cfg = RelayConfig::new()
            .with_openai_api_key("sk-top-secret")
            .with_elevenlabs_api_key("el-top-secret");
        let dbg = format!("{:?}", cfg);
        assert!(!dbg.contains("top-secret"));
        assert!(dbg.contains("[set]"));
    }

    #[test]
    fn invalid_base_url_fails_validation() {
        let cfg = RelayConfig::new().with_openai_base_url("ftp://example.com");
        assert!(cfg.validate().is_err());
        let cfg = RelayConfig::new().with_openai_base_url("not a url");
        assert!(cfg.validate().is_err());
    }
}
