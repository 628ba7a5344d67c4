//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks)
//!     → FailoverConfig (validated, immutable)
//!     → read once to build the controller and its collaborators
//! ```
//!
//! # Design Decisions
//! - Config is loaded once at startup; there is no hot reload
//! - Fields the watcher cannot work without have no defaults
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AlertingConfig, ControllerConfig, FailoverConfig, HysteresisConfig, LogFormat,
    NetworkHealthCheckConfig, ObservabilityConfig, ServerConfig, SshOptions,
};

/// Configuration mirroring the production deployment, used across tests.
#[cfg(test)]
pub(crate) const SAMPLE_CONFIG: &str = r#"
failover_ip = "192.168.181.87"
alert_email = "ops@example.com"
check_timeout = 10

[network_health_check]
check_ip = "192.168.177.11"
warn_at_time = 8
warn_at_loss = 10
switch_with_timediff = 20
switch_with_lossdiff = 15

[ssh_opts]
port = 2288
user = "root"
keyfile = "/root/.ssh/id_sysops"

[server_a]
ip = "192.168.180.76"
failover_eth = "eth0:2"
check_url = "http://192.168.180.76:9200/"

[server_b]
ip = "192.168.179.69"
failover_eth = "eth0:2"
check_url = "http://192.168.179.69:9200/"
"#;
