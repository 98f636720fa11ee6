use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub elevenlabs: ElevenLabsConfig,
    pub llm: LlmConfig,
    pub backend: BackendConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ElevenLabsConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub first_call_agent_id: String,
    pub negotiating_agent_id: String,
    pub phone_number_pool_id: String,
    pub webhook_secret: SecretString,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_base_url: Option<String>,
    pub first_call_agent_id: Option<String>,
    pub negotiating_agent_id: Option<String>,
    pub phone_number_pool_id: Option<String>,
    pub webhook_secret: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub backend_base_url: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            elevenlabs: ElevenLabsConfig {
                api_key: String::new().into(),
                base_url: "https://api.elevenlabs.io".to_string(),
                first_call_agent_id: String::new(),
                negotiating_agent_id: String::new(),
                phone_number_pool_id: String::new(),
                webhook_secret: String::new().into(),
            },
            llm: LlmConfig {
                api_key: String::new().into(),
                base_url: "https://integrate.api.nvidia.com/v1".to_string(),
                model: "nvidia/nvidia-nemotron-nano-9b-v2".to_string(),
                timeout_secs: 60,
            },
            backend: BackendConfig {
                base_url: "http://localhost:8080".to_string(),
                timeout_secs: 10,
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8000 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("haggler.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(elevenlabs) = patch.elevenlabs {
            if let Some(api_key_value) = elevenlabs.api_key {
                self.elevenlabs.api_key = secret_value(api_key_value);
            }
            if let Some(base_url) = elevenlabs.base_url {
                self.elevenlabs.base_url = base_url;
            }
            if let Some(first_call_agent_id) = elevenlabs.first_call_agent_id {
                self.elevenlabs.first_call_agent_id = first_call_agent_id;
            }
            if let Some(negotiating_agent_id) = elevenlabs.negotiating_agent_id {
                self.elevenlabs.negotiating_agent_id = negotiating_agent_id;
            }
            if let Some(phone_number_pool_id) = elevenlabs.phone_number_pool_id {
                self.elevenlabs.phone_number_pool_id = phone_number_pool_id;
            }
            if let Some(webhook_secret_value) = elevenlabs.webhook_secret {
                self.elevenlabs.webhook_secret = secret_value(webhook_secret_value);
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(api_key_value) = llm.api_key {
                self.llm.api_key = secret_value(api_key_value);
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(backend) = patch.backend {
            if let Some(base_url) = backend.base_url {
                self.backend.base_url = base_url;
            }
            if let Some(timeout_secs) = backend.timeout_secs {
                self.backend.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("HAGGLER_ELEVENLABS_API_KEY") {
            self.elevenlabs.api_key = secret_value(value);
        }
        if let Some(value) = read_env("HAGGLER_ELEVENLABS_BASE_URL") {
            self.elevenlabs.base_url = value;
        }
        if let Some(value) = read_env("HAGGLER_ELEVENLABS_FIRST_CALL_AGENT_ID") {
            self.elevenlabs.first_call_agent_id = value;
        }
        if let Some(value) = read_env("HAGGLER_ELEVENLABS_NEGOTIATING_AGENT_ID") {
            self.elevenlabs.negotiating_agent_id = value;
        }
        if let Some(value) = read_env("HAGGLER_ELEVENLABS_PHONE_NUMBER_POOL_ID") {
            self.elevenlabs.phone_number_pool_id = value;
        }
        if let Some(value) = read_env("HAGGLER_ELEVENLABS_WEBHOOK_SECRET") {
            self.elevenlabs.webhook_secret = secret_value(value);
        }

        if let Some(value) = read_env("HAGGLER_LLM_API_KEY") {
            self.llm.api_key = secret_value(value);
        }
        if let Some(value) = read_env("HAGGLER_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("HAGGLER_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("HAGGLER_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("HAGGLER_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("HAGGLER_BACKEND_BASE_URL") {
            self.backend.base_url = value;
        }
        if let Some(value) = read_env("HAGGLER_BACKEND_TIMEOUT_SECS") {
            self.backend.timeout_secs = parse_u64("HAGGLER_BACKEND_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("HAGGLER_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("HAGGLER_SERVER_PORT") {
            self.server.port = parse_u16("HAGGLER_SERVER_PORT", &value)?;
        }

        let log_level = read_env("HAGGLER_LOGGING_LEVEL").or_else(|| read_env("HAGGLER_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("HAGGLER_LOGGING_FORMAT").or_else(|| read_env("HAGGLER_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(elevenlabs_api_key) = overrides.elevenlabs_api_key {
            self.elevenlabs.api_key = secret_value(elevenlabs_api_key);
        }
        if let Some(elevenlabs_base_url) = overrides.elevenlabs_base_url {
            self.elevenlabs.base_url = elevenlabs_base_url;
        }
        if let Some(first_call_agent_id) = overrides.first_call_agent_id {
            self.elevenlabs.first_call_agent_id = first_call_agent_id;
        }
        if let Some(negotiating_agent_id) = overrides.negotiating_agent_id {
            self.elevenlabs.negotiating_agent_id = negotiating_agent_id;
        }
        if let Some(phone_number_pool_id) = overrides.phone_number_pool_id {
            self.elevenlabs.phone_number_pool_id = phone_number_pool_id;
        }
        if let Some(webhook_secret) = overrides.webhook_secret {
            self.elevenlabs.webhook_secret = secret_value(webhook_secret);
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = secret_value(llm_api_key);
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = llm_base_url;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(backend_base_url) = overrides.backend_base_url {
            self.backend.base_url = backend_base_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_elevenlabs(&self.elevenlabs)?;
        validate_llm(&self.llm)?;
        validate_backend(&self.backend)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("haggler.toml"), PathBuf::from("config/haggler.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_elevenlabs(elevenlabs: &ElevenLabsConfig) -> Result<(), ConfigError> {
    if elevenlabs.api_key.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "elevenlabs.api_key is required. Get it from the ElevenLabs dashboard".to_string(),
        ));
    }
    if elevenlabs.webhook_secret.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "elevenlabs.webhook_secret is required to verify inbound webhook deliveries"
                .to_string(),
        ));
    }
    if elevenlabs.first_call_agent_id.trim().is_empty()
        || elevenlabs.negotiating_agent_id.trim().is_empty()
    {
        return Err(ConfigError::Validation(
            "elevenlabs.first_call_agent_id and elevenlabs.negotiating_agent_id are both required"
                .to_string(),
        ));
    }
    if elevenlabs.phone_number_pool_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "elevenlabs.phone_number_pool_id is required to place outbound calls".to_string(),
        ));
    }
    validate_http_url("elevenlabs.base_url", &elevenlabs.base_url)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.api_key.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation("llm.api_key is required".to_string()));
    }
    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    validate_http_url("llm.base_url", &llm.base_url)
}

fn validate_backend(backend: &BackendConfig) -> Result<(), ConfigError> {
    if backend.timeout_secs == 0 || backend.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "backend.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    validate_http_url("backend.base_url", &backend.base_url)
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!("{key} must start with http:// or https://")))
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    elevenlabs: Option<ElevenLabsPatch>,
    llm: Option<LlmPatch>,
    backend: Option<BackendPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ElevenLabsPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    first_call_agent_id: Option<String>,
    negotiating_agent_id: Option<String>,
    phone_number_pool_id: Option<String>,
    webhook_secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct BackendPatch {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
