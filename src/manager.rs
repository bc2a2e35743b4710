//! Connection orchestrator
//!
//! Owns the live device handle, the matched layout, and the decoded config.
//! Everything downstream (profile state, the REPL) observes it through
//! ordered callback lists and asks it to persist deltas; nothing else
//! touches the transport.
//!
//! State machine: disconnected → connecting → connected. Every failure path
//! lands back on disconnected with in-memory state cleared, so a stale
//! "connected" view cannot survive an error.

use crate::config::{ButtonBinding, Config, DeviceInfo};
use crate::device::{ConnectError, Connector, Device};
use crate::haybox::transcoder::Transcoder;
use crate::layout::{Layout, LayoutCatalog};
use crate::modes::GameMode;
use crate::socd::SocdPair;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Bound on device-info and config reads
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Pending per-mode changes collected from profile state at save time
#[derive(Debug, Clone, PartialEq)]
pub struct ModeDelta {
    pub mode: GameMode,
    pub remaps: Vec<ButtonBinding>,
    pub socd_pairs: Vec<SocdPair>,
}

type ConnectedFn = Arc<dyn Fn(&DeviceInfo) + Send + Sync>;
type DisconnectedFn = Arc<dyn Fn() + Send + Sync>;
type ConfigLoadedFn = Arc<dyn Fn(&Layout, &Config) + Send + Sync>;
type ConfigSavedFn = Arc<dyn Fn(&Config) + Send + Sync>;
type NoLayoutFn = Arc<dyn Fn(&DeviceInfo) + Send + Sync>;
type RemapProviderFn = Arc<dyn Fn() -> Vec<ModeDelta> + Send + Sync>;
type OptionsProviderFn = Arc<dyn Fn(&mut Config) + Send + Sync>;
type ErrorFn = Arc<dyn Fn(&str) + Send + Sync>;

pub struct ConnectionManager {
    connector: Box<dyn Connector>,
    catalog: LayoutCatalog,
    read_timeout: Duration,

    state: ConnectionState,
    device: Option<Box<dyn Device>>,
    info: Option<DeviceInfo>,
    layout: Option<Layout>,
    config: Option<Config>,
    transcoder: Transcoder,
    active_mode: GameMode,

    on_connected: Vec<ConnectedFn>,
    on_disconnected: Vec<DisconnectedFn>,
    on_config_loaded: Vec<ConfigLoadedFn>,
    on_config_saved: Vec<ConfigSavedFn>,
    on_no_layout_found: Vec<NoLayoutFn>,
    on_request_remapped: Vec<RemapProviderFn>,
    on_request_options: Vec<OptionsProviderFn>,
    on_error: Vec<ErrorFn>,
}

impl ConnectionManager {
    pub fn new(connector: Box<dyn Connector>, catalog: LayoutCatalog) -> Self {
        Self {
            connector,
            catalog,
            read_timeout: DEFAULT_READ_TIMEOUT,
            state: ConnectionState::Disconnected,
            device: None,
            info: None,
            layout: None,
            config: None,
            transcoder: Transcoder::new(),
            active_mode: GameMode::Melee,
            on_connected: Vec::new(),
            on_disconnected: Vec::new(),
            on_config_loaded: Vec::new(),
            on_config_saved: Vec::new(),
            on_no_layout_found: Vec::new(),
            on_request_remapped: Vec::new(),
            on_request_options: Vec::new(),
            on_error: Vec::new(),
        }
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn device_info(&self) -> Option<&DeviceInfo> {
        self.info.as_ref()
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    pub fn config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    pub fn catalog(&self) -> &LayoutCatalog {
        &self.catalog
    }

    pub fn replace_catalog(&mut self, catalog: LayoutCatalog) {
        self.catalog = catalog;
    }

    pub fn active_mode(&self) -> GameMode {
        self.active_mode
    }

    /// Mode the next save will record as the device's default
    pub fn set_active_mode(&mut self, mode: GameMode) {
        self.active_mode = mode;
    }

    // Subscriptions. Callbacks run synchronously in registration order;
    // subscribers are internal, trusted collaborators, so a panicking
    // callback aborts the remaining notifications.

    pub fn on_connected(&mut self, f: impl Fn(&DeviceInfo) + Send + Sync + 'static) {
        self.on_connected.push(Arc::new(f));
    }

    pub fn on_disconnected(&mut self, f: impl Fn() + Send + Sync + 'static) {
        self.on_disconnected.push(Arc::new(f));
    }

    pub fn on_config_loaded(&mut self, f: impl Fn(&Layout, &Config) + Send + Sync + 'static) {
        self.on_config_loaded.push(Arc::new(f));
    }

    pub fn on_config_saved(&mut self, f: impl Fn(&Config) + Send + Sync + 'static) {
        self.on_config_saved.push(Arc::new(f));
    }

    pub fn on_no_layout_found(&mut self, f: impl Fn(&DeviceInfo) + Send + Sync + 'static) {
        self.on_no_layout_found.push(Arc::new(f));
    }

    pub fn on_request_remapped(&mut self, f: impl Fn() -> Vec<ModeDelta> + Send + Sync + 'static) {
        self.on_request_remapped.push(Arc::new(f));
    }

    pub fn on_request_options(&mut self, f: impl Fn(&mut Config) + Send + Sync + 'static) {
        self.on_request_options.push(Arc::new(f));
    }

    pub fn on_error(&mut self, f: impl Fn(&str) + Send + Sync + 'static) {
        self.on_error.push(Arc::new(f));
    }

    fn notify_error(&self, message: &str) {
        error!("{message}");
        for f in &self.on_error {
            f(message);
        }
    }

    /// Attempt a connection. Returns true when the post-connect sequence
    /// completed far enough to leave the manager connected.
    pub async fn connect(&mut self) -> Result<bool> {
        if self.state != ConnectionState::Disconnected {
            warn!("connect ignored while {:?}", self.state);
            return Ok(false);
        }
        self.state = ConnectionState::Connecting;
        info!("connecting via {}", self.connector.name());

        let device = match self.connector.connect().await {
            Ok(device) => device,
            Err(ConnectError::Cancelled) => {
                debug!("connection cancelled by user");
                self.state = ConnectionState::Disconnected;
                return Ok(false);
            }
            Err(err) => {
                self.state = ConnectionState::Disconnected;
                self.notify_error(&format!("connection failed: {err}"));
                return Ok(false);
            }
        };

        self.device = Some(device);
        self.state = ConnectionState::Connected;
        self.post_connect().await
    }

    /// Sequential: info → layout match → config read → notify.
    async fn post_connect(&mut self) -> Result<bool> {
        let info = match self.read_with_timeout("device info").await {
            ReadOutcome::Ok(info) => info,
            ReadOutcome::Failed => return Ok(false),
        };
        info!(
            "connected to {} ({} {})",
            info.device_name, info.firmware_name, info.firmware_version
        );
        for f in &self.on_connected {
            f(&info);
        }
        self.info = Some(info.clone());

        let Some(layout) = self.catalog.match_device(&info.device_name).cloned() else {
            warn!("no layout matches device {:?}", info.device_name);
            for f in &self.on_no_layout_found {
                f(&info);
            }
            return Ok(true);
        };
        info!("matched layout {:?}", layout.name);

        let outcome = match self.device.as_ref() {
            Some(device) => timeout(self.read_timeout, device.get_config()).await,
            None => return Ok(false),
        };
        let wire = match outcome {
            Ok(Ok(wire)) => wire,
            Ok(Err(err)) => {
                self.notify_error(&format!("config read failed: {err:#}"));
                self.disconnect().await;
                return Ok(false);
            }
            Err(_) => {
                self.notify_error(&format!(
                    "config read timed out after {}ms",
                    self.read_timeout.as_millis()
                ));
                self.disconnect().await;
                return Ok(false);
            }
        };

        let config = match self.transcoder.decode(&layout, wire) {
            Ok(config) => config,
            Err(err) => {
                self.notify_error(&format!("config decode failed: {err:#}"));
                self.disconnect().await;
                return Ok(false);
            }
        };

        self.active_mode = config.default_mode;
        for f in &self.on_config_loaded {
            f(&layout, &config);
        }
        self.layout = Some(layout);
        self.config = Some(config);
        Ok(true)
    }

    async fn read_with_timeout(&mut self, what: &str) -> ReadOutcome<DeviceInfo> {
        let outcome = match self.device.as_ref() {
            Some(device) => timeout(self.read_timeout, device.device_info()).await,
            None => return ReadOutcome::Failed,
        };
        match outcome {
            Ok(Ok(info)) => ReadOutcome::Ok(info),
            Ok(Err(err)) => {
                self.notify_error(&format!("{what} read failed: {err:#}"));
                self.disconnect().await;
                ReadOutcome::Failed
            }
            Err(_) => {
                self.notify_error(&format!(
                    "{what} read timed out after {}ms",
                    self.read_timeout.as_millis()
                ));
                self.disconnect().await;
                ReadOutcome::Failed
            }
        }
    }

    /// Reset to disconnected unconditionally. Transport close failures are
    /// logged, never propagated; the state reset must not be blockable.
    pub async fn disconnect(&mut self) {
        if let Some(device) = self.device.take() {
            if let Err(err) = device.close().await {
                warn!("transport close failed: {err:#}");
            }
        }
        self.transcoder.reset();
        self.info = None;
        self.layout = None;
        self.config = None;
        self.state = ConnectionState::Disconnected;
        for f in &self.on_disconnected {
            f();
        }
    }

    pub async fn reboot_firmware(&mut self) -> Result<()> {
        self.reboot(false).await
    }

    pub async fn reboot_bootloader(&mut self) -> Result<()> {
        self.reboot(true).await
    }

    // A reboot always drops the serial link, so force a disconnect after.
    async fn reboot(&mut self, bootloader: bool) -> Result<()> {
        let Some(device) = self.device.as_ref() else {
            anyhow::bail!("not connected");
        };
        let result = if bootloader {
            device.reboot_bootloader().await
        } else {
            device.reboot_firmware().await
        };
        if let Err(err) = &result {
            warn!("reboot command failed: {err:#}");
        }
        self.disconnect().await;
        result
    }

    /// Empty one mode's remap list in the held config
    pub fn clear_mappings(&mut self, mode: GameMode) {
        if let Some(config) = self.config.as_mut() {
            if let Some(mode_config) = config.mode_mut(mode) {
                mode_config.button_remapping.clear();
            }
        }
    }

    /// Collect pending deltas, merge, and write. Returns true when the
    /// device accepted the write; on failure the retained baseline stays
    /// unmodified.
    pub async fn save_config(&mut self) -> Result<bool> {
        let (Some(layout), Some(config)) = (self.layout.as_ref(), self.config.as_ref()) else {
            anyhow::bail!("no config loaded");
        };
        let mut config = config.clone();

        config.default_mode = self.active_mode;

        for provider in &self.on_request_remapped {
            for delta in provider() {
                match config.mode_mut(delta.mode) {
                    Some(mode) => {
                        mode.button_remapping = delta.remaps;
                        mode.socd_pairs = delta.socd_pairs;
                    }
                    None => {
                        error!(
                            "remap delta for {} has no game mode config; skipped",
                            delta.mode.string_id()
                        );
                    }
                }
            }
        }
        for provider in &self.on_request_options {
            provider(&mut config);
        }

        let wire = match self.transcoder.encode(layout, &config) {
            Ok(wire) => wire,
            Err(err) => {
                self.notify_error(&format!("config encode failed: {err:#}"));
                return Ok(false);
            }
        };

        let Some(device) = self.device.as_ref() else {
            anyhow::bail!("not connected");
        };
        match device.set_config(&wire).await {
            Ok(true) => {
                self.transcoder.commit(wire);
                for f in &self.on_config_saved {
                    f(&config);
                }
                self.config = Some(config);
                info!("config saved");
                Ok(true)
            }
            Ok(false) => {
                self.notify_error("device rejected the config write");
                Ok(false)
            }
            Err(err) => {
                self.notify_error(&format!("config write failed: {err:#}"));
                Ok(false)
            }
        }
    }
}

enum ReadOutcome<T> {
    Ok(T),
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::{Binding, PhysicalButton};
    use crate::haybox::emulated::EmulatedConnector;
    use crate::haybox::wire::WireConfig;
    use crate::layout::{test_layout, LayoutCatalog};
    use crate::socd::SocdType;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    fn test_catalog() -> LayoutCatalog {
        LayoutCatalog::from_layouts(vec![test_layout()])
    }

    fn emulated_manager(dir: &tempfile::TempDir) -> ConnectionManager {
        let connector = EmulatedConnector::new(dir.path().join("emu.json"));
        ConnectionManager::new(Box::new(connector), test_catalog())
    }

    /// Device whose reads never resolve
    struct StalledDevice;

    #[async_trait::async_trait]
    impl Device for StalledDevice {
        async fn device_info(&self) -> Result<DeviceInfo> {
            std::future::pending().await
        }
        async fn get_config(&self) -> Result<WireConfig> {
            std::future::pending().await
        }
        async fn set_config(&self, _: &WireConfig) -> Result<bool> {
            Ok(false)
        }
        async fn reboot_firmware(&self) -> Result<()> {
            Ok(())
        }
        async fn reboot_bootloader(&self) -> Result<()> {
            Ok(())
        }
        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    struct StalledConnector;

    #[async_trait::async_trait]
    impl Connector for StalledConnector {
        fn name(&self) -> &str {
            "stalled"
        }
        async fn connect(&self) -> Result<Box<dyn Device>, ConnectError> {
            Ok(Box::new(StalledDevice))
        }
    }

    struct CancelledConnector;

    #[async_trait::async_trait]
    impl Connector for CancelledConnector {
        fn name(&self) -> &str {
            "cancelled"
        }
        async fn connect(&self) -> Result<Box<dyn Device>, ConnectError> {
            Err(ConnectError::Cancelled)
        }
    }

    #[tokio::test]
    async fn cancellation_returns_to_disconnected_without_error() {
        let mut manager = ConnectionManager::new(Box::new(CancelledConnector), test_catalog());
        let errors = Arc::new(AtomicUsize::new(0));
        let counter = errors.clone();
        manager.on_error(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!manager.connect().await.unwrap());
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert_eq!(errors.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn read_timeout_disconnects_and_names_the_bound() {
        let mut manager = ConnectionManager::new(Box::new(StalledConnector), test_catalog())
            .with_read_timeout(Duration::from_millis(20));
        let messages = Arc::new(StdMutex::new(Vec::new()));
        let sink = messages.clone();
        manager.on_error(move |m| sink.lock().unwrap().push(m.to_string()));

        assert!(!manager.connect().await.unwrap());
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        let messages = messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("timed out after 20ms"), "{messages:?}");
    }

    #[tokio::test]
    async fn unmatched_device_notifies_no_layout_and_skips_config_read() {
        let dir = tempfile::tempdir().unwrap();
        let connector = EmulatedConnector::new(dir.path().join("emu.json"));
        let unmatched = LayoutCatalog::from_layouts(Vec::new());
        let mut manager = ConnectionManager::new(Box::new(connector), unmatched);
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = notified.clone();
        manager.on_no_layout_found(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(manager.connect().await.unwrap());
        assert_eq!(manager.state(), ConnectionState::Connected);
        assert_eq!(notified.load(Ordering::SeqCst), 1);
        assert!(manager.config().is_none());
    }

    #[tokio::test]
    async fn callbacks_fire_in_registration_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = emulated_manager(&dir);
        let order = Arc::new(StdMutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = order.clone();
            manager.on_connected(move |_| order.lock().unwrap().push(tag));
        }

        assert!(manager.connect().await.unwrap());
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn reboot_forces_disconnect() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = emulated_manager(&dir);
        assert!(manager.connect().await.unwrap());
        assert_eq!(manager.state(), ConnectionState::Connected);

        manager.reboot_firmware().await.unwrap();
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(manager.device_info().is_none());
    }

    #[tokio::test]
    async fn save_merges_deltas_and_persists_through_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = emulated_manager(&dir);
        assert!(manager.connect().await.unwrap());

        // Default Melee layout: slot 19 is "a"; remap it to "x".
        manager.on_request_remapped(|| {
            vec![ModeDelta {
                mode: GameMode::Melee,
                remaps: vec![ButtonBinding {
                    physical: PhysicalButton::Slot(19),
                    binding: Binding::X,
                }],
                socd_pairs: vec![SocdPair {
                    a: Binding::LeftStickLeft,
                    b: Binding::LeftStickRight,
                    kind: SocdType::SecondInput,
                }],
            }]
        });
        manager.set_active_mode(GameMode::Ultimate);
        assert!(manager.save_config().await.unwrap());
        manager.disconnect().await;

        assert!(manager.connect().await.unwrap());
        let config = manager.config().unwrap();
        assert_eq!(config.default_mode, GameMode::Ultimate);
        let melee = config.mode(GameMode::Melee).unwrap();
        assert_eq!(melee.button_remapping.len(), 1);
        assert_eq!(melee.button_remapping[0].binding, Binding::X);
        assert_eq!(melee.socd_pairs[0].kind, SocdType::SecondInput);
    }

    #[tokio::test]
    async fn end_to_end_emulated_editing_session() {
        use crate::profile::ProfileState;
        use std::collections::HashMap;

        let dir = tempfile::tempdir().unwrap();
        let mut manager = emulated_manager(&dir);
        let profiles: Arc<StdMutex<HashMap<GameMode, ProfileState>>> =
            Arc::new(StdMutex::new(HashMap::new()));

        let loaded = profiles.clone();
        manager.on_config_loaded(move |layout, config| {
            let mut profiles = loaded.lock().unwrap();
            profiles.clear();
            for &mode in layout.modes.keys() {
                let mut profile = ProfileState::new(mode);
                profile.load_from_config(layout, config);
                profiles.insert(mode, profile);
            }
        });
        let saved = profiles.clone();
        manager.on_config_saved(move |_| {
            for profile in saved.lock().unwrap().values_mut() {
                profile.mark_saved();
            }
        });
        let providers = profiles.clone();
        manager.on_request_remapped(move || {
            providers
                .lock()
                .unwrap()
                .values()
                .map(|p| p.delta())
                .collect()
        });

        assert!(manager.connect().await.unwrap());

        // Factory Melee config resolves the horizontal stick SOCD pair.
        {
            let profiles = profiles.lock().unwrap();
            let melee = &profiles[&GameMode::Melee];
            let pair = melee.socd_pairs()[0];
            assert!(pair.references(Binding::LeftStickLeft));
            assert!(pair.references(Binding::LeftStickRight));
            assert_eq!(pair.kind, SocdType::SecondInputNoReactivation);
        }

        // One rebind produces exactly one delta entry.
        {
            let mut profiles = profiles.lock().unwrap();
            let melee = profiles.get_mut(&GameMode::Melee).unwrap();
            assert!(melee.select(PhysicalButton::Slot(19)));
            assert!(melee.set_binding(Binding::X));
            assert_eq!(melee.get_remapped_buttons().len(), 1);
            assert!(melee.is_dirty());
        }

        assert!(manager.save_config().await.unwrap());
        assert!(!profiles.lock().unwrap()[&GameMode::Melee].is_dirty());

        // Reload from the emulated store: the change persisted and is the
        // new baseline.
        manager.disconnect().await;
        assert!(manager.connect().await.unwrap());
        let profiles = profiles.lock().unwrap();
        let melee = &profiles[&GameMode::Melee];
        let button = melee
            .buttons()
            .iter()
            .find(|b| b.physical == PhysicalButton::Slot(19))
            .unwrap();
        assert_eq!(button.current_binding, Binding::X);
        assert!(!button.is_dirty);
        assert!(button.is_modified);
    }

    #[tokio::test]
    async fn delta_for_unknown_mode_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = emulated_manager(&dir);
        assert!(manager.connect().await.unwrap());

        manager.on_request_remapped(|| {
            vec![ModeDelta {
                mode: GameMode::Custom,
                remaps: Vec::new(),
                socd_pairs: Vec::new(),
            }]
        });
        assert!(manager.save_config().await.unwrap());
    }
}
