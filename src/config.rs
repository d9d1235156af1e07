use std::{path::Path, time::Duration};

use anyhow::Error;
use serde::{Deserialize, Serialize};

use crate::tasklet::{BOOTSTRAP_RETRY_DELAY, INTERFACE_NAME};

pub const CONFIG_PATH: &str = "meshlink.ron";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Name handed to the stack when the Ethernet interface is created
    pub interface_name: String,
    /// MAC driver instance backing the interface
    pub device_id: i8,
    /// Delay before a failed bootstrap is retried
    pub bootstrap_retry_ms: u64,
    /// Number of handlers the event loop accepts
    pub max_handlers: usize,
    pub log_filter: String,
    pub sim: SimConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    /// /64 prefix advertised by the simulated router
    pub prefix: String,
    /// Bring-up attempts that fail address allocation before one succeeds
    pub failed_attempts: u32,
    /// Chance that any later bring-up fails anyway
    pub failure_rate: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interface_name: INTERFACE_NAME.to_string(),
            device_id: 0,
            bootstrap_retry_ms: BOOTSTRAP_RETRY_DELAY.as_millis() as u64,
            max_handlers: 8,
            log_filter: "meshlink=info".to_string(),
            sim: SimConfig::default(),
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            prefix: "2001:db8::".to_string(),
            failed_attempts: 0,
            failure_rate: 0.0,
        }
    }
}

impl Config {
    /// Load `meshlink.ron` from the working directory, or the defaults when
    /// there is no such file.
    pub fn load() -> Result<Config, Error> {
        if !Path::new(CONFIG_PATH).exists() {
            return Ok(Config::default());
        }
        Self::load_from(CONFIG_PATH)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Config, Error> {
        let config = std::fs::read_to_string(path)?;
        let config: Config = ron::from_str(&config)?;
        Ok(config)
    }

    pub fn bootstrap_retry(&self) -> Duration {
        Duration::from_millis(self.bootstrap_retry_ms)
    }
}
