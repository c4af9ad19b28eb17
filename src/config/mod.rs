//! Configuration module for the relay server
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use waav_relay::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

mod env;
mod merge;
mod validation;
mod yaml;

use crate::core::realtime::RealtimeConfig;
use crate::core::relay::{MarkOverflowPolicy, RelayConfig};

/// Default spoken prompt played while the media stream is being connected.
pub const DEFAULT_CONNECT_PROMPT: &str = "Please wait while we connect your call to the A.I. \
voice assistant, powered by the Open-A.I. Realtime API";

/// Default spoken prompt played once the caller may start talking.
pub const DEFAULT_READY_PROMPT: &str = "O.K. you can start talking!";

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone, PartialEq)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains all configuration needed to run the relay server:
/// - Server settings (host, port, TLS, public host)
/// - OpenAI Realtime session settings
/// - Relay playback tracking settings
/// - Call setup prompts
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    /// Host name advertised in the media stream URL; falls back to the
    /// request's `Host` header
    pub public_host: Option<String>,

    // OpenAI Realtime settings
    pub openai_api_key: Option<String>,
    /// Endpoint override, mainly for testing against a local server
    pub openai_realtime_url: Option<String>,
    pub realtime_model: String,
    pub realtime_voice: String,
    pub system_instructions: String,
    /// Optional text file appended to the system instructions
    pub system_knowledge_path: Option<PathBuf>,
    pub temperature: f32,
    pub greet_first: bool,
    pub greeting_prompt: String,
    pub connect_timeout_seconds: u64,

    // Relay settings
    /// Bound on unacknowledged marks per call; 0 means unbounded
    pub max_pending_marks: usize,
    pub mark_overflow_policy: MarkOverflowPolicy,

    // Call setup prompts
    pub connect_prompt: String,
    pub ready_prompt: String,
}

/// Implement Drop to zeroize secret fields when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.openai_api_key {
            key.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// The .env file is loaded in main.rs at application startup, so its
    /// values are visible here as environment variables.
    ///
    /// # Errors
    /// Returns an error if a variable has an invalid format or the resulting
    /// configuration fails validation.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// After loading and merging, performs validation on the final configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validate(&config)?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Per-call settings for the AI endpoint connection.
    ///
    /// Reads the knowledge file, if configured, on every call so edits are
    /// picked up without a restart.
    pub async fn realtime_config(&self) -> Result<RealtimeConfig, String> {
        let mut instructions = self.system_instructions.clone();
        if let Some(path) = &self.system_knowledge_path {
            let knowledge = tokio::fs::read_to_string(path).await.map_err(|e| {
                format!("Failed to read knowledge file {}: {e}", path.display())
            })?;
            if !instructions.is_empty() && !knowledge.is_empty() {
                instructions.push('\n');
            }
            instructions.push_str(&knowledge);
        }

        Ok(RealtimeConfig {
            api_key: self.openai_api_key.clone().unwrap_or_default(),
            model: self.realtime_model.clone(),
            voice: self.realtime_voice.clone(),
            instructions,
            temperature: self.temperature,
            audio_format: "g711_ulaw".to_string(),
            greet_first: self.greet_first,
            greeting_prompt: self.greeting_prompt.clone(),
            connect_timeout_seconds: self.connect_timeout_seconds,
            endpoint_url: self.openai_realtime_url.clone(),
        })
    }

    /// Per-call relay settings.
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            max_pending_marks: (self.max_pending_marks > 0).then_some(self.max_pending_marks),
            mark_overflow_policy: self.mark_overflow_policy,
        }
    }
}

fn validate(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    validation::validate_openai_api_key(&config.openai_api_key)?;
    validation::validate_temperature(config.temperature)?;
    validation::validate_connect_timeout(config.connect_timeout_seconds)?;
    validation::validate_tls_files(&config.tls)?;
    validation::validate_knowledge_path(&config.system_knowledge_path)?;
    Ok(())
}
