use serde::Deserialize;
use std::path::PathBuf;

use crate::core::relay::MarkOverflowPolicy;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present here
/// override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 5050
///   public_host: "relay.example.com"
///   tls:
///     cert_path: "/etc/relay/cert.pem"
///     key_path: "/etc/relay/key.pem"
///
/// openai:
///   api_key: "sk-..."
///   model: "gpt-4o-realtime-preview-2024-10-01"
///   voice: "alloy"
///   instructions: "You are a helpful assistant."
///   knowledge_path: "/etc/relay/knowledge.txt"
///   temperature: 0.8
///   greet_first: true
///   greeting_prompt: "Greet the caller."
///   connect_timeout_seconds: 10
///
/// relay:
///   max_pending_marks: 1024
///   mark_overflow_policy: drop_oldest
///
/// call:
///   connect_prompt: "Please wait while we connect your call."
///   ready_prompt: "You can start talking!"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub openai: Option<OpenAIYaml>,
    pub relay: Option<RelayYaml>,
    pub call: Option<CallYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub public_host: Option<String>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// OpenAI Realtime settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OpenAIYaml {
    pub api_key: Option<String>,
    pub realtime_url: Option<String>,
    pub model: Option<String>,
    pub voice: Option<String>,
    pub instructions: Option<String>,
    pub knowledge_path: Option<String>,
    pub temperature: Option<f32>,
    pub greet_first: Option<bool>,
    pub greeting_prompt: Option<String>,
    pub connect_timeout_seconds: Option<u64>,
}

/// Relay settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RelayYaml {
    pub max_pending_marks: Option<usize>,
    pub mark_overflow_policy: Option<MarkOverflowPolicy>,
}

/// Call setup prompts from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CallYaml {
    pub connect_prompt: Option<String>,
    pub ready_prompt: Option<String>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Required fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 8443
  public_host: "relay.example.com"
  tls:
    cert_path: "/etc/cert.pem"
    key_path: "/etc/key.pem"
openai:
  api_key: "sk-yaml"
  model: "gpt-4o-mini-realtime-preview"
  voice: "verse"
  temperature: 0.6
  greet_first: true
relay:
  max_pending_marks: 32
  mark_overflow_policy: skip_mark
call:
  ready_prompt: "Go ahead."
"#;
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let server = config.server.unwrap();
        assert_eq!(server.port, Some(8443));
        assert_eq!(server.tls.unwrap().key_path.as_deref(), Some("/etc/key.pem"));

        let openai = config.openai.unwrap();
        assert_eq!(openai.voice.as_deref(), Some("verse"));
        assert_eq!(openai.greet_first, Some(true));

        let relay = config.relay.unwrap();
        assert_eq!(relay.max_pending_marks, Some(32));
        assert_eq!(relay.mark_overflow_policy, Some(MarkOverflowPolicy::SkipMark));

        assert_eq!(config.call.unwrap().ready_prompt.as_deref(), Some("Go ahead."));
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.server.is_none());
        assert!(config.openai.is_none());
        assert!(config.relay.is_none());
        assert!(config.call.is_none());
    }

    #[test]
    fn test_yaml_config_rejects_unknown_policy() {
        let result: Result<YamlConfig, _> =
            serde_yaml::from_str("relay:\n  mark_overflow_policy: block\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file_not_found() {
        let path = PathBuf::from("/nonexistent/config.yaml");
        let result = YamlConfig::from_file(&path);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    fn test_from_file_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.yaml");

        fs::write(&config_path, "invalid: yaml: content:").unwrap();

        let result = YamlConfig::from_file(&config_path);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse YAML")
        );
    }
}
