//! Node configuration
//!
//! Every knob is read from the environment with a default that matches a
//! stock deployment: worker duties on 8081, coordinator duties on 8082,
//! 1s polling, 10s liveness sweeps with a 20s expiry.

use envconfig::Envconfig;
use std::time::Duration;

use crate::workload::allocator::byte_size;

#[derive(Envconfig, Debug, Clone)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "WORKER_PORT", default = "8081")]
    pub worker_port: u16,

    #[envconfig(from = "COORDINATOR_PORT", default = "8082")]
    pub coordinator_port: u16,

    // Any instance's worker port will do: /register is proxied to the coordinator.
    #[envconfig(from = "BOOTSTRAP_ADDRESS", default = "localhost:8081")]
    pub bootstrap_address: String,

    #[envconfig(from = "INITIAL_TOTAL_MIB", default = "100")]
    pub initial_total_mib: u64,

    #[envconfig(from = "POLL_INTERVAL_MS", default = "1000")]
    pub poll_interval_ms: u64,

    #[envconfig(from = "MONITOR_INTERVAL_MS", default = "10000")]
    pub monitor_interval_ms: u64,

    #[envconfig(from = "EXPIRY_MS", default = "20000")]
    pub expiry_ms: u64,

    #[envconfig(from = "SETTLE_INTERVAL_MS", default = "5000")]
    pub settle_interval_ms: u64,

    #[envconfig(from = "REQUEST_TIMEOUT_MS", default = "2000")]
    pub request_timeout_ms: u64,

    #[envconfig(from = "CONNECT_TIMEOUT_MS", default = "1000")]
    pub connect_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            worker_port: 8081,
            coordinator_port: 8082,
            bootstrap_address: "localhost:8081".to_string(),
            initial_total_mib: 100,
            poll_interval_ms: 1000,
            monitor_interval_ms: 10_000,
            expiry_ms: 20_000,
            settle_interval_ms: 5000,
            request_timeout_ms: 2000,
            connect_timeout_ms: 1000,
        }
    }
}

impl Config {
    /// Rejects settings under which the liveness monitor would expire
    /// healthy instances because of ordinary scheduling jitter.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.expiry_ms < 2 * self.monitor_interval_ms {
            anyhow::bail!(
                "EXPIRY_MS ({}) must be at least twice MONITOR_INTERVAL_MS ({})",
                self.expiry_ms,
                self.monitor_interval_ms
            );
        }
        if self.poll_interval_ms == 0 || self.monitor_interval_ms == 0 {
            anyhow::bail!("poll and monitor intervals must be non-zero");
        }
        if byte_size(self.initial_total_mib).is_none() {
            anyhow::bail!(
                "INITIAL_TOTAL_MIB ({}) is larger than any addressable buffer",
                self.initial_total_mib
            );
        }
        if self.worker_port == self.coordinator_port && self.worker_port != 0 {
            anyhow::bail!("WORKER_PORT and COORDINATOR_PORT must differ");
        }
        Ok(())
    }

    pub fn worker_bind(&self) -> String {
        format!("{}:{}", self.host, self.worker_port)
    }

    pub fn coordinator_bind(&self) -> String {
        format!("{}:{}", self.host, self.coordinator_port)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    pub fn expiry(&self) -> Duration {
        Duration::from_millis(self.expiry_ms)
    }

    pub fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.settle_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
