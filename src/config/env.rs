use std::env;
use std::error::Error;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use super::{DEFAULT_CONNECT_PROMPT, DEFAULT_READY_PROMPT, ServerConfig, TlsConfig};
use crate::core::realtime::{
    DEFAULT_CONNECT_TIMEOUT_SECONDS, DEFAULT_GREETING_PROMPT, DEFAULT_INSTRUCTIONS,
    DEFAULT_TEMPERATURE,
};
use crate::core::relay::{DEFAULT_MAX_PENDING_MARKS, MarkOverflowPolicy};

/// Every environment variable read by [`load_from_env`].
pub(super) const ENV_VARS: &[&str] = &[
    "HOST",
    "PORT",
    "TLS_CERT_PATH",
    "TLS_KEY_PATH",
    "PUBLIC_HOST",
    "OPENAI_API_KEY",
    "OPENAI_REALTIME_URL",
    "OPENAI_REALTIME_MODEL",
    "OPENAI_REALTIME_VOICE",
    "SYSTEM_INSTRUCTIONS",
    "SYSTEM_KNOWLEDGE_PATH",
    "OPENAI_TEMPERATURE",
    "GREET_FIRST",
    "GREETING_PROMPT",
    "OPENAI_CONNECT_TIMEOUT_SECONDS",
    "MAX_PENDING_MARKS",
    "MARK_OVERFLOW_POLICY",
    "CONNECT_PROMPT",
    "READY_PROMPT",
];

/// Non-empty value of an environment variable.
fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(name: &str, default: T) -> Result<T, Box<dyn Error>>
where
    T: FromStr,
    T::Err: Display,
{
    match var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| format!("Invalid {name} value '{raw}': {e}").into()),
        None => Ok(default),
    }
}

pub(super) fn parse_bool(name: &str, raw: &str) -> Result<bool, Box<dyn Error>> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(format!("Invalid {name} value '{raw}': expected true or false").into()),
    }
}

/// Load configuration from environment variables, filling in defaults.
///
/// Validation happens after merging, not here.
pub(super) fn load_from_env() -> Result<ServerConfig, Box<dyn Error>> {
    let tls = match (var("TLS_CERT_PATH"), var("TLS_KEY_PATH")) {
        (Some(cert), Some(key)) => Some(TlsConfig {
            cert_path: PathBuf::from(cert),
            key_path: PathBuf::from(key),
        }),
        (None, None) => None,
        _ => {
            return Err("TLS_CERT_PATH and TLS_KEY_PATH must be set together".into());
        }
    };

    let greet_first = match var("GREET_FIRST") {
        Some(raw) => parse_bool("GREET_FIRST", &raw)?,
        None => false,
    };

    let mark_overflow_policy = match var("MARK_OVERFLOW_POLICY") {
        Some(raw) => raw.parse::<MarkOverflowPolicy>()?,
        None => MarkOverflowPolicy::default(),
    };

    Ok(ServerConfig {
        host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
        port: parse_var("PORT", 5050)?,
        tls,
        public_host: var("PUBLIC_HOST"),
        openai_api_key: var("OPENAI_API_KEY"),
        openai_realtime_url: var("OPENAI_REALTIME_URL"),
        realtime_model: var("OPENAI_REALTIME_MODEL")
            .unwrap_or_else(|| "gpt-4o-realtime-preview-2024-10-01".to_string()),
        realtime_voice: var("OPENAI_REALTIME_VOICE").unwrap_or_else(|| "alloy".to_string()),
        system_instructions: var("SYSTEM_INSTRUCTIONS")
            .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string()),
        system_knowledge_path: var("SYSTEM_KNOWLEDGE_PATH").map(PathBuf::from),
        temperature: parse_var("OPENAI_TEMPERATURE", DEFAULT_TEMPERATURE)?,
        greet_first,
        greeting_prompt: var("GREETING_PROMPT")
            .unwrap_or_else(|| DEFAULT_GREETING_PROMPT.to_string()),
        connect_timeout_seconds: parse_var(
            "OPENAI_CONNECT_TIMEOUT_SECONDS",
            DEFAULT_CONNECT_TIMEOUT_SECONDS,
        )?,
        max_pending_marks: parse_var("MAX_PENDING_MARKS", DEFAULT_MAX_PENDING_MARKS)?,
        mark_overflow_policy,
        connect_prompt: var("CONNECT_PROMPT").unwrap_or_else(|| DEFAULT_CONNECT_PROMPT.to_string()),
        ready_prompt: var("READY_PROMPT").unwrap_or_else(|| DEFAULT_READY_PROMPT.to_string()),
    })
}
