//! Device transport abstraction
//!
//! The orchestrator talks to hardware through these traits only. A live
//! serial transport and the file-backed emulator implement the same surface
//! and are injected at startup, never special-cased downstream.

use crate::config::DeviceInfo;
use crate::haybox::wire::WireConfig;
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

/// Why a connection attempt did not produce a device handle
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The host environment lacks the required transport capability.
    /// Reported once, never retried automatically.
    #[error("device transport not supported on this host")]
    Unsupported,
    /// The user dismissed the device picker. Recoverable, not an error
    /// worth surfacing.
    #[error("connection cancelled")]
    Cancelled,
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

/// Produces device handles on demand
#[async_trait]
pub trait Connector: Send + Sync {
    fn name(&self) -> &str;

    async fn connect(&self) -> Result<Box<dyn Device>, ConnectError>;
}

/// One live (or emulated) device connection
#[async_trait]
pub trait Device: Send + Sync {
    async fn device_info(&self) -> Result<DeviceInfo>;

    async fn get_config(&self) -> Result<WireConfig>;

    /// Returns true if the device accepted the write.
    async fn set_config(&self, config: &WireConfig) -> Result<bool>;

    async fn reboot_firmware(&self) -> Result<()>;

    async fn reboot_bootloader(&self) -> Result<()>;

    /// Close the underlying transport. Failures are the caller's to log;
    /// state reset must not depend on this succeeding.
    async fn close(&self) -> Result<()>;
}
