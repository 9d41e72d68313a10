use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

fn default_server_port() -> u16 {
    8765
}
fn default_server_log_port() -> u16 {
    7777
}
fn default_packet_drop_rate() -> f32 {
    0.10
}
fn default_packet_timeout_receive() -> u64 {
    200
}
fn default_packet_ttl() -> u64 {
    2000
}
fn default_message_assembler_interval() -> u64 {
    500
}
fn default_response_ttl() -> u64 {
    5000
}
fn default_response_interval() -> u64 {
    1000
}
fn default_enable_duplicate_filtering() -> bool {
    true
}

/// EnvSettings is the startup shape of the tunables, loaded from process
/// environment variables (each field name uppercased, e.g. `SERVER_PORT`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnvSettings {
    /// Port exposed for the booking application itself.
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    /// Port exposed for the admin command shell.
    #[serde(default = "default_server_log_port")]
    pub server_log_port: u16,
    /// Rate at which packets are dropped, in and out.
    #[serde(default = "default_packet_drop_rate")]
    pub packet_drop_rate: f32,
    /// How long an unacknowledged packet waits before retransmission (ms).
    #[serde(default = "default_packet_timeout_receive")]
    pub packet_timeout_receive: u64,
    /// Maximum time to keep packets in the send history (ms).
    #[serde(default = "default_packet_ttl")]
    pub packet_ttl: u64,
    /// Time between runs requesting missing packets (ms).
    #[serde(default = "default_message_assembler_interval")]
    pub message_assembler_interval: u64,
    /// Maximum time to keep responses in the cache (ms).
    #[serde(default = "default_response_ttl")]
    pub response_ttl: u64,
    /// Time between runs checking for expired responses (ms).
    #[serde(default = "default_response_interval")]
    pub response_interval: u64,
    /// Whether completed requests short-circuit to the cached response.
    #[serde(default = "default_enable_duplicate_filtering")]
    pub enable_duplicate_filtering: bool,
}

impl Default for EnvSettings {
    fn default() -> Self {
        EnvSettings {
            server_port: default_server_port(),
            server_log_port: default_server_log_port(),
            packet_drop_rate: default_packet_drop_rate(),
            packet_timeout_receive: default_packet_timeout_receive(),
            packet_ttl: default_packet_ttl(),
            message_assembler_interval: default_message_assembler_interval(),
            response_ttl: default_response_ttl(),
            response_interval: default_response_interval(),
            enable_duplicate_filtering: default_enable_duplicate_filtering(),
        }
    }
}

impl EnvSettings {
    pub fn from_env() -> Result<Self> {
        let settings: EnvSettings =
            envy::from_env().map_err(|e| Error::Other(format!("env parse failed: {e}")))?;
        if !(0.0..1.0).contains(&settings.packet_drop_rate) {
            return Err(Error::ErrDropRateOutOfRange);
        }
        Ok(settings)
    }
}

/// Config is the process-wide mutable record of tunables. Every subsystem
/// reads it on each tick or packet, so admin-shell writes take effect
/// without restarts. Readers are lock-free; the ports are fixed at startup.
#[derive(Debug)]
pub struct Config {
    server_port: u16,
    server_log_port: u16,
    duplicate_filtering: AtomicBool,
    drop_rate_bits: AtomicU32,
    packet_receive_timeout_ms: AtomicU64,
    packet_ttl_ms: AtomicU64,
    assembler_interval_ms: AtomicU64,
    response_ttl_ms: AtomicU64,
    response_interval_ms: AtomicU64,
}

impl Config {
    pub fn new(settings: EnvSettings) -> Self {
        Config {
            server_port: settings.server_port,
            server_log_port: settings.server_log_port,
            duplicate_filtering: AtomicBool::new(settings.enable_duplicate_filtering),
            drop_rate_bits: AtomicU32::new(settings.packet_drop_rate.to_bits()),
            packet_receive_timeout_ms: AtomicU64::new(settings.packet_timeout_receive),
            packet_ttl_ms: AtomicU64::new(settings.packet_ttl),
            assembler_interval_ms: AtomicU64::new(settings.message_assembler_interval),
            response_ttl_ms: AtomicU64::new(settings.response_ttl),
            response_interval_ms: AtomicU64::new(settings.response_interval),
        }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Config::new(EnvSettings::from_env()?))
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    pub fn server_log_port(&self) -> u16 {
        self.server_log_port
    }

    pub fn duplicate_filtering(&self) -> bool {
        self.duplicate_filtering.load(Ordering::SeqCst)
    }

    pub fn set_duplicate_filtering(&self, enabled: bool) {
        self.duplicate_filtering.store(enabled, Ordering::SeqCst);
    }

    pub fn drop_rate(&self) -> f32 {
        f32::from_bits(self.drop_rate_bits.load(Ordering::SeqCst))
    }

    pub fn set_drop_rate(&self, rate: f32) -> Result<()> {
        if !(0.0..1.0).contains(&rate) {
            return Err(Error::ErrDropRateOutOfRange);
        }
        self.drop_rate_bits.store(rate.to_bits(), Ordering::SeqCst);
        Ok(())
    }

    pub fn packet_receive_timeout(&self) -> Duration {
        Duration::from_millis(self.packet_receive_timeout_ms.load(Ordering::SeqCst))
    }

    pub fn set_packet_receive_timeout(&self, ms: u64) {
        self.packet_receive_timeout_ms.store(ms, Ordering::SeqCst);
    }

    pub fn packet_ttl(&self) -> Duration {
        Duration::from_millis(self.packet_ttl_ms.load(Ordering::SeqCst))
    }

    pub fn set_packet_ttl(&self, ms: u64) {
        self.packet_ttl_ms.store(ms, Ordering::SeqCst);
    }

    pub fn assembler_interval(&self) -> Duration {
        Duration::from_millis(self.assembler_interval_ms.load(Ordering::SeqCst))
    }

    pub fn set_assembler_interval(&self, ms: u64) {
        self.assembler_interval_ms.store(ms, Ordering::SeqCst);
    }

    pub fn response_ttl(&self) -> Duration {
        Duration::from_millis(self.response_ttl_ms.load(Ordering::SeqCst))
    }

    pub fn set_response_ttl(&self, ms: u64) {
        self.response_ttl_ms.store(ms, Ordering::SeqCst);
    }

    pub fn response_interval(&self) -> Duration {
        Duration::from_millis(self.response_interval_ms.load(Ordering::SeqCst))
    }

    pub fn set_response_interval(&self, ms: u64) {
        self.response_interval_ms.store(ms, Ordering::SeqCst);
    }

    /// The current values in their startup shape, for display.
    pub fn snapshot(&self) -> EnvSettings {
        EnvSettings {
            server_port: self.server_port,
            server_log_port: self.server_log_port,
            packet_drop_rate: self.drop_rate(),
            packet_timeout_receive: self.packet_receive_timeout_ms.load(Ordering::SeqCst),
            packet_ttl: self.packet_ttl_ms.load(Ordering::SeqCst),
            message_assembler_interval: self.assembler_interval_ms.load(Ordering::SeqCst),
            response_ttl: self.response_ttl_ms.load(Ordering::SeqCst),
            response_interval: self.response_interval_ms.load(Ordering::SeqCst),
            enable_duplicate_filtering: self.duplicate_filtering(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new(EnvSettings::default())
    }
}
