use std::error::Error;
use std::path::PathBuf;

use super::TlsConfig;

/// Accepted sampling temperature range for the realtime model.
pub(super) const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.6..=1.2;

/// The AI endpoint cannot be reached without a key, so startup fails early.
pub(super) fn validate_openai_api_key(api_key: &Option<String>) -> Result<(), Box<dyn Error>> {
    match api_key {
        Some(key) if !key.trim().is_empty() => Ok(()),
        _ => Err("Missing OpenAI API key: set OPENAI_API_KEY or openai.api_key".into()),
    }
}

pub(super) fn validate_temperature(temperature: f32) -> Result<(), Box<dyn Error>> {
    if !TEMPERATURE_RANGE.contains(&temperature) {
        return Err(format!(
            "Invalid temperature {temperature}: must be between {} and {}",
            TEMPERATURE_RANGE.start(),
            TEMPERATURE_RANGE.end()
        )
        .into());
    }
    Ok(())
}

pub(super) fn validate_connect_timeout(seconds: u64) -> Result<(), Box<dyn Error>> {
    if seconds == 0 {
        return Err("Invalid connect timeout: must be greater than 0 seconds".into());
    }
    Ok(())
}

/// Validate that TLS certificate and key files exist
pub(super) fn validate_tls_files(tls: &Option<TlsConfig>) -> Result<(), Box<dyn Error>> {
    if let Some(tls) = tls {
        if !tls.cert_path.exists() {
            return Err(format!(
                "TLS certificate file not found: {}",
                tls.cert_path.display()
            )
            .into());
        }
        if !tls.key_path.exists() {
            return Err(format!("TLS key file not found: {}", tls.key_path.display()).into());
        }
    }
    Ok(())
}

pub(super) fn validate_knowledge_path(path: &Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    if let Some(path) = path
        && !path.is_file()
    {
        return Err(format!("System knowledge file not found: {}", path.display()).into());
    }
    Ok(())
}
