//! File-backed device emulator
//!
//! Persists the wire config as pretty-printed JSON in a local file, seeded
//! from the factory default on first use. Lets the whole stack run without
//! hardware attached.

use super::defaults::default_wire_config;
use super::wire::WireConfig;
use crate::config::DeviceInfo;
use crate::device::{ConnectError, Connector, Device};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Connector yielding [`EmulatedDevice`] handles over a fixed storage path
pub struct EmulatedConnector {
    path: PathBuf,
}

impl EmulatedConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default storage location under the platform data dir
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("padlab")
            .join("emulated_config.json")
    }
}

#[async_trait]
impl Connector for EmulatedConnector {
    fn name(&self) -> &str {
        "emulated"
    }

    async fn connect(&self) -> Result<Box<dyn Device>, ConnectError> {
        let device = EmulatedDevice::open(&self.path).await?;
        Ok(Box::new(device))
    }
}

/// Emulated device handle
pub struct EmulatedDevice {
    path: PathBuf,
    config: Mutex<WireConfig>,
}

impl EmulatedDevice {
    /// Open the backing file, seeding it with the factory default if absent
    pub async fn open(path: &Path) -> Result<Self> {
        let config = match tokio::fs::read_to_string(path).await {
            Ok(text) => serde_json::from_str(&text)
                .with_context(|| format!("parsing emulated config {}", path.display()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!("seeding emulated config at {}", path.display());
                let config = default_wire_config();
                persist(path, &config).await?;
                config
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading {}", path.display()));
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            config: Mutex::new(config),
        })
    }
}

async fn persist(path: &Path, config: &WireConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(config)?;
    tokio::fs::write(path, text)
        .await
        .with_context(|| format!("writing {}", path.display()))
}

#[async_trait]
impl Device for EmulatedDevice {
    async fn device_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo {
            device_name: "GRAM Slim Smash (Emulated)".into(),
            firmware_name: "ChurrOS".into(),
            firmware_version: "1.2.3".into(),
        })
    }

    async fn get_config(&self) -> Result<WireConfig> {
        Ok(self.config.lock().await.clone())
    }

    async fn set_config(&self, config: &WireConfig) -> Result<bool> {
        persist(&self.path, config).await?;
        *self.config.lock().await = config.clone();
        debug!("emulated config persisted to {}", self.path.display());
        Ok(true)
    }

    async fn reboot_firmware(&self) -> Result<()> {
        debug!("emulated reboot (no-op)");
        Ok(())
    }

    async fn reboot_bootloader(&self) -> Result<()> {
        debug!("emulated bootloader reboot (no-op)");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeds_default_config_on_first_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emu.json");

        let device = EmulatedDevice::open(&path).await.unwrap();
        assert!(path.exists());
        let config = device.get_config().await.unwrap();
        assert_eq!(config, default_wire_config());
    }

    #[tokio::test]
    async fn set_config_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emu.json");

        let device = EmulatedDevice::open(&path).await.unwrap();
        let mut config = device.get_config().await.unwrap();
        config.rgb_brightness = 42;
        assert!(device.set_config(&config).await.unwrap());
        drop(device);

        let reopened = EmulatedDevice::open(&path).await.unwrap();
        assert_eq!(reopened.get_config().await.unwrap().rgb_brightness, 42);
    }

    #[tokio::test]
    async fn corrupt_backing_file_is_an_error_not_a_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emu.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        assert!(EmulatedDevice::open(&path).await.is_err());
    }
}
