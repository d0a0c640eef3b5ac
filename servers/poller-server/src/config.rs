//! Config loading (spec §6's settings are DB-backed; this is the handful of
//! settings the process needs before it can even reach the database).
//!
//! Layers `config/default.toml` under environment-variable override, same
//! shape as the teacher's workspace dependency on the `config` crate implies
//! even though `servers/api-server/src/main.rs` itself reads env vars ad hoc.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub workers: usize,
    pub drain_deadline_secs: u64,
    pub bind_addr: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("POLLER").separator("__"))
            .build()?;
        settings.try_deserialize()
    }
}
