//! Daemon configuration.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use mirror_common::RetryPolicy;

/// Command-line configuration for mirrormgrd.
#[derive(Debug, Clone, Parser)]
#[command(name = "mirrormgrd", about = "Traffic mirror manager daemon")]
pub struct Config {
    /// Address the REST API listens on.
    #[arg(long, env = "MIRRORMGRD_LISTEN", default_value = "0.0.0.0:8282")]
    pub listen: SocketAddr,

    /// Base URL of the SDN controller API.
    #[arg(
        long,
        env = "MIRRORMGRD_CONTROLLER_URL",
        default_value = "http://127.0.0.1:8181/api/kytos"
    )]
    pub controller_url: String,

    /// Connection URL of the durable mirror store.
    #[arg(
        long,
        env = "MIRRORMGRD_STORE_URL",
        default_value = "redis://127.0.0.1:6379"
    )]
    pub store_url: String,

    /// Per-request timeout for controller API calls, in seconds.
    #[arg(long, default_value_t = 10)]
    pub gateway_timeout_secs: u64,

    /// Attempts per store operation before a transient failure surfaces.
    #[arg(long, default_value_t = 3)]
    pub store_retry_attempts: u32,

    /// Lower bound of the randomized wait between store retries, in ms.
    #[arg(long, default_value_t = 1000)]
    pub store_retry_wait_min_ms: u64,

    /// Upper bound of the randomized wait between store retries, in ms.
    #[arg(long, default_value_t = 1000)]
    pub store_retry_wait_max_ms: u64,
}

impl Config {
    /// Timeout applied to every controller API request.
    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    /// Retry policy for the durable store.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.store_retry_attempts,
            Duration::from_millis(self.store_retry_wait_min_ms),
            Duration::from_millis(self.store_retry_wait_max_ms),
        )
    }
}
