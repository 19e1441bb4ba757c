use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes settings for the server, the message broker and logging.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
    pub logging: LoggingSettings,
}

/// Configuration settings for the server.
///
/// Defines the address the server binds to and how many connections it serves at once.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub max_connections: usize,
}

impl ServerSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration settings for the broker.
///
/// Controls how updates are pushed to subscriber connections.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct BrokerSettings {
    /// Capacity of each connection's outbound queue. Updates that find it
    /// full are dropped for that connection.
    pub outbound_buffer: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_connections: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub outbound_buffer: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl PartialSettings {
    /// Fill every missing value from `defaults`.
    pub fn merge_over(self, defaults: Settings) -> Settings {
        let server = self.server;
        let broker = self.broker;
        let logging = self.logging;

        Settings {
            server: ServerSettings {
                host: server
                    .as_ref()
                    .and_then(|s| s.host.clone())
                    .unwrap_or(defaults.server.host),
                port: server
                    .as_ref()
                    .and_then(|s| s.port)
                    .unwrap_or(defaults.server.port),
                max_connections: server
                    .as_ref()
                    .and_then(|s| s.max_connections)
                    .unwrap_or(defaults.server.max_connections),
            },
            broker: BrokerSettings {
                outbound_buffer: broker
                    .and_then(|b| b.outbound_buffer)
                    .unwrap_or(defaults.broker.outbound_buffer),
            },
            logging: LoggingSettings {
                level: logging
                    .and_then(|l| l.level)
                    .unwrap_or(defaults.logging.level),
            },
        }
    }
}

/// Provides default values for `Settings`.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
                max_connections: 1000,
            },
            broker: BrokerSettings {
                outbound_buffer: 256,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}
