use serde::Deserialize;

/// Top-level configuration for the subcast server.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Network parameters: bind address and the optional API key.
    pub server: ServerSettings,
    /// Operational parameters for the broker fabric.
    pub broker: BrokerSettings,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Listen address. A bare `:port` form binds all interfaces.
    pub addr: String,
    /// When non-empty, every request except `/health` and `/` must carry a
    /// matching `X-API-Key` header.
    pub api_key: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct BrokerSettings {
    /// Capacity of each subscriber's bounded message queue.
    pub subscriber_queue_size: usize,
    /// Capacity of each topic's replay ring buffer.
    pub ring_buffer_size: usize,
    /// Drain window for graceful shutdown, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl ServerSettings {
    /// The address in the form `TcpListener::bind` accepts; `:8080` becomes
    /// `0.0.0.0:8080`.
    pub fn bind_addr(&self) -> String {
        if self.addr.starts_with(':') {
            format!("0.0.0.0{}", self.addr)
        } else {
            self.addr.clone()
        }
    }

    pub fn auth_enabled(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// Partial configuration as read from the optional config file. Missing
/// values fall back to defaults before environment overrides apply.
#[derive(Debug, Default, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialServerSettings {
    pub addr: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialBrokerSettings {
    pub subscriber_queue_size: Option<usize>,
    pub ring_buffer_size: Option<usize>,
    pub shutdown_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                addr: ":8080".to_string(),
                api_key: String::new(),
            },
            broker: BrokerSettings {
                subscriber_queue_size: 100,
                ring_buffer_size: 100,
                shutdown_timeout_secs: 10,
            },
        }
    }
}
