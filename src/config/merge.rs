use std::error::Error;
use std::path::PathBuf;

use super::env::load_from_env;
use super::yaml::YamlConfig;
use super::{ServerConfig, TlsConfig};

/// Merge YAML configuration over environment variables.
///
/// The environment (with defaults) forms the base; every value present in the
/// YAML file replaces the corresponding field.
pub(super) fn merge_config(yaml: Option<YamlConfig>) -> Result<ServerConfig, Box<dyn Error>> {
    let mut config = load_from_env()?;

    let Some(yaml) = yaml else {
        return Ok(config);
    };

    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if let Some(public_host) = server.public_host {
            config.public_host = Some(public_host);
        }
        if let Some(tls) = server.tls {
            if tls.enabled == Some(false) {
                config.tls = None;
            } else {
                match (tls.cert_path, tls.key_path) {
                    (Some(cert), Some(key)) => {
                        config.tls = Some(TlsConfig {
                            cert_path: PathBuf::from(cert),
                            key_path: PathBuf::from(key),
                        });
                    }
                    (None, None) if tls.enabled != Some(true) => {}
                    _ => {
                        return Err(
                            "server.tls requires both cert_path and key_path".into(),
                        );
                    }
                }
            }
        }
    }

    if let Some(openai) = yaml.openai {
        if let Some(api_key) = openai.api_key {
            config.openai_api_key = Some(api_key);
        }
        if let Some(url) = openai.realtime_url {
            config.openai_realtime_url = Some(url);
        }
        if let Some(model) = openai.model {
            config.realtime_model = model;
        }
        if let Some(voice) = openai.voice {
            config.realtime_voice = voice;
        }
        if let Some(instructions) = openai.instructions {
            config.system_instructions = instructions;
        }
        if let Some(path) = openai.knowledge_path {
            config.system_knowledge_path = Some(PathBuf::from(path));
        }
        if let Some(temperature) = openai.temperature {
            config.temperature = temperature;
        }
        if let Some(greet_first) = openai.greet_first {
            config.greet_first = greet_first;
        }
        if let Some(prompt) = openai.greeting_prompt {
            config.greeting_prompt = prompt;
        }
        if let Some(timeout) = openai.connect_timeout_seconds {
            config.connect_timeout_seconds = timeout;
        }
    }

    if let Some(relay) = yaml.relay {
        if let Some(max) = relay.max_pending_marks {
            config.max_pending_marks = max;
        }
        if let Some(policy) = relay.mark_overflow_policy {
            config.mark_overflow_policy = policy;
        }
    }

    if let Some(call) = yaml.call {
        if let Some(prompt) = call.connect_prompt {
            config.connect_prompt = prompt;
        }
        if let Some(prompt) = call.ready_prompt {
            config.ready_prompt = prompt;
        }
    }

    Ok(config)
}
