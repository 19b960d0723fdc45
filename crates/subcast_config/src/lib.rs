//! subcast_config
//!
//! Layered configuration: an optional `config/default.toml` file, then
//! built-in defaults for anything it leaves out, then environment overrides
//! for the deploy-facing knobs (`ADDR`, `API_KEY`, `SUBSCRIBER_QUEUE_SIZE`,
//! `RING_BUFFER_SIZE`, `SHUTDOWN_TIMEOUT_SECS`). Size overrides must parse
//! as positive integers or they are ignored.

pub mod settings;

use std::env;

use config::{Config, ConfigError, File};

pub use settings::{
    BrokerSettings, PartialBrokerSettings, PartialServerSettings, PartialSettings,
    ServerSettings, Settings,
};

pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder().add_source(File::with_name("config/default").required(false));
    let partial: PartialSettings = builder.build()?.try_deserialize()?;
    let mut settings = merge(partial, Settings::default());
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Fill every hole in `partial` from `default`.
pub fn merge(partial: PartialSettings, default: Settings) -> Settings {
    let server = partial.server.unwrap_or_default();
    let broker = partial.broker.unwrap_or_default();
    Settings {
        server: ServerSettings {
            addr: server.addr.unwrap_or(default.server.addr),
            api_key: server.api_key.unwrap_or(default.server.api_key),
        },
        broker: BrokerSettings {
            subscriber_queue_size: broker
                .subscriber_queue_size
                .filter(|n| *n > 0)
                .unwrap_or(default.broker.subscriber_queue_size),
            ring_buffer_size: broker
                .ring_buffer_size
                .filter(|n| *n > 0)
                .unwrap_or(default.broker.ring_buffer_size),
            shutdown_timeout_secs: broker
                .shutdown_timeout_secs
                .unwrap_or(default.broker.shutdown_timeout_secs),
        },
    }
}

fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(v) = env::var("ADDR") {
        if !v.is_empty() {
            settings.server.addr = v;
        }
    }
    if let Ok(v) = env::var("API_KEY") {
        settings.server.api_key = v;
    }
    if let Some(n) = positive_usize(env::var("SUBSCRIBER_QUEUE_SIZE")) {
        settings.broker.subscriber_queue_size = n;
    }
    if let Some(n) = positive_usize(env::var("RING_BUFFER_SIZE")) {
        settings.broker.ring_buffer_size = n;
    }
    if let Some(n) = positive_usize(env::var("SHUTDOWN_TIMEOUT_SECS")) {
        settings.broker.shutdown_timeout_secs = n as u64;
    }
}

fn positive_usize(var: Result<String, env::VarError>) -> Option<usize> {
    var.ok()?.parse::<usize>().ok().filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let settings = Settings::default();
        assert_eq!(settings.server.addr, ":8080");
        assert_eq!(settings.server.bind_addr(), "0.0.0.0:8080");
        assert!(!settings.server.auth_enabled());
        assert_eq!(settings.broker.subscriber_queue_size, 100);
        assert_eq!(settings.broker.ring_buffer_size, 100);
        assert_eq!(settings.broker.shutdown_timeout_secs, 10);
    }

    #[test]
    fn merge_prefers_partial_values() {
        let partial = PartialSettings {
            server: Some(PartialServerSettings {
                addr: Some("127.0.0.1:9000".to_string()),
                api_key: Some("secret".to_string()),
            }),
            broker: Some(PartialBrokerSettings {
                subscriber_queue_size: Some(5),
                ring_buffer_size: None,
                shutdown_timeout_secs: Some(3),
            }),
        };
        let settings = merge(partial, Settings::default());
        assert_eq!(settings.server.addr, "127.0.0.1:9000");
        assert_eq!(settings.server.bind_addr(), "127.0.0.1:9000");
        assert!(settings.server.auth_enabled());
        assert_eq!(settings.broker.subscriber_queue_size, 5);
        assert_eq!(settings.broker.ring_buffer_size, 100);
        assert_eq!(settings.broker.shutdown_timeout_secs, 3);
    }

    #[test]
    fn merge_ignores_non_positive_sizes() {
        let partial = PartialSettings {
            server: None,
            broker: Some(PartialBrokerSettings {
                subscriber_queue_size: Some(0),
                ring_buffer_size: Some(0),
                shutdown_timeout_secs: None,
            }),
        };
        let settings = merge(partial, Settings::default());
        assert_eq!(settings.broker.subscriber_queue_size, 100);
        assert_eq!(settings.broker.ring_buffer_size, 100);
    }

    // One test owns all process-global environment mutation so the cases
    // cannot race each other under the parallel test runner.
    #[test]
    fn env_overrides_beat_defaults() {
        let vars = [
            ("ADDR", "127.0.0.1:7777"),
            ("API_KEY", "hunter2"),
            ("SUBSCRIBER_QUEUE_SIZE", "7"),
            ("RING_BUFFER_SIZE", "9"),
            ("SHUTDOWN_TIMEOUT_SECS", "2"),
        ];
        for (k, v) in vars {
            env::set_var(k, v);
        }

        let settings = load_config().expect("load_config");
        assert_eq!(settings.server.addr, "127.0.0.1:7777");
        assert_eq!(settings.server.api_key, "hunter2");
        assert_eq!(settings.broker.subscriber_queue_size, 7);
        assert_eq!(settings.broker.ring_buffer_size, 9);
        assert_eq!(settings.broker.shutdown_timeout_secs, 2);

        // Garbage and non-positive sizes are ignored.
        env::set_var("SUBSCRIBER_QUEUE_SIZE", "not-a-number");
        env::set_var("RING_BUFFER_SIZE", "0");
        let settings = load_config().expect("load_config");
        assert_eq!(settings.broker.subscriber_queue_size, 100);
        assert_eq!(settings.broker.ring_buffer_size, 100);

        for (k, _) in vars {
            env::remove_var(k);
        }
    }
}
