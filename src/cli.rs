//! Command-line interface and REPL

use crate::bindings::{Binding, PhysicalButton};
use crate::config::{Coords, MeleeOptions, ProjectMOptions};
use crate::editor::EditorState;
use crate::layout::LayoutWatcher;
use crate::manager::{ConnectionManager, ConnectionState};
use crate::modes::GameMode;
use crate::profile::{ProfileState, SocdSide};
use crate::socd::SocdType;
use anyhow::Result;
use colored::*;
use rustyline::DefaultEditor;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

type Profiles = Arc<Mutex<HashMap<GameMode, ProfileState>>>;

/// Working copy of the per-game option blocks, edited via `options` commands
/// and handed to the manager at save time
#[derive(Debug, Clone, Default)]
struct OptionsDraft {
    melee: MeleeOptions,
    project_m: ProjectMOptions,
}

pub struct Repl {
    manager: ConnectionManager,
    profiles: Profiles,
    options: Arc<Mutex<OptionsDraft>>,
    editor: EditorState,
    layout_watcher: Option<LayoutWatcher>,
}

impl Repl {
    /// Wire profile state into the manager's event stream and build the REPL
    pub fn new(mut manager: ConnectionManager) -> Self {
        let profiles: Profiles = Arc::new(Mutex::new(HashMap::new()));
        let options: Arc<Mutex<OptionsDraft>> = Arc::new(Mutex::new(OptionsDraft::default()));

        let loaded = profiles.clone();
        let loaded_options = options.clone();
        manager.on_config_loaded(move |layout, config| {
            let mut profiles = loaded.lock().unwrap();
            profiles.clear();
            for &mode in layout.modes.keys() {
                let mut profile = ProfileState::new(mode);
                profile.load_from_config(layout, config);
                profiles.insert(mode, profile);
            }
            *loaded_options.lock().unwrap() = OptionsDraft {
                melee: config.melee_options.clone(),
                project_m: config.project_m_options.clone(),
            };
            debug!("rebuilt {} profile views", profiles.len());
        });

        let drafted = options.clone();
        manager.on_request_options(move |config| {
            let draft = drafted.lock().unwrap();
            config.melee_options = draft.melee.clone();
            config.project_m_options = draft.project_m.clone();
        });

        let saved = profiles.clone();
        manager.on_config_saved(move |_| {
            for profile in saved.lock().unwrap().values_mut() {
                profile.mark_saved();
            }
        });

        let dropped = profiles.clone();
        manager.on_disconnected(move || {
            dropped.lock().unwrap().clear();
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

        manager.on_error(|message| {
            println!("{}", message.red());
        });
        manager.on_no_layout_found(|info| {
            println!(
                "{} {:?}",
                "no known layout matches".yellow(),
                info.device_name
            );
        });

        Self {
            manager,
            profiles,
            options,
            editor: EditorState::new(),
            layout_watcher: None,
        }
    }

    /// Pick up catalog reloads between commands; a mid-session change only
    /// affects future connects.
    pub fn set_layout_watcher(&mut self, watcher: LayoutWatcher) {
        self.layout_watcher = Some(watcher);
    }

    fn drain_catalog_updates(&mut self) {
        let Some(watcher) = self.layout_watcher.as_mut() else {
            return;
        };
        let mut latest = None;
        while let Some(catalog) = watcher.try_next_catalog() {
            latest = Some(catalog);
        }
        if let Some(catalog) = latest {
            self.manager.replace_catalog(catalog);
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut rl = DefaultEditor::new()?;
        println!("{}", "padlab - type 'help' for commands".bold());

        loop {
            let readline = rl.readline("padlab> ");
            match readline {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(line);
                    if line == "exit" || line == "quit" {
                        break;
                    }
                    self.drain_catalog_updates();
                    if let Err(e) = self.dispatch(line).await {
                        println!("{} {e:#}", "error:".red());
                    }
                }
                Err(_) => break,
            }
        }

        if self.manager.state() != ConnectionState::Disconnected {
            self.manager.disconnect().await;
        }
        Ok(())
    }

    async fn dispatch(&mut self, line: &str) -> Result<()> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["help"] => print_help(),
            ["connect"] => {
                self.manager.connect().await?;
            }
            ["disconnect"] => self.manager.disconnect().await,
            ["status"] => self.print_status(),
            ["layouts"] => {
                for layout in self.manager.catalog().layouts() {
                    println!("  {} ({})", layout.name.bold(), layout.id);
                }
            }
            ["modes"] => {
                let active = self.manager.active_mode();
                for (mode, profile) in self.profiles.lock().unwrap().iter() {
                    let marker = if *mode == active { "*" } else { " " };
                    let dirty = if profile.is_dirty() {
                        " (unsaved)".yellow().to_string()
                    } else {
                        String::new()
                    };
                    println!("  {marker} {}{dirty}", mode.string_id());
                }
            }
            ["mode", id] => {
                let mode: GameMode = id.parse()?;
                if !self.profiles.lock().unwrap().contains_key(&mode) {
                    anyhow::bail!("no profile loaded for {}", mode.string_id());
                }
                self.manager.set_active_mode(mode);
            }
            ["buttons"] => self.print_buttons(),
            ["select", slot] => {
                let physical: PhysicalButton = slot.parse()?;
                let selected = self
                    .with_profile(|p| p.select(physical))
                    .unwrap_or(false);
                if !selected {
                    anyhow::bail!("no button {physical} in this mode");
                }
            }
            ["bind", name] => {
                let binding: Binding = name.parse()?;
                if !self.with_profile(|p| p.set_binding(binding)).unwrap_or(false) {
                    anyhow::bail!("select a button first");
                }
            }
            ["socd"] => self.print_socd(),
            ["socd", "add"] => {
                if !self.with_profile(|p| p.add_socd()).unwrap_or(false) {
                    anyhow::bail!("SOCD pair limit reached");
                }
            }
            ["socd", "rm", index] => {
                let index: usize = index.parse()?;
                if !self.with_profile(|p| p.remove_socd(index)).unwrap_or(false) {
                    anyhow::bail!("no SOCD pair {index}");
                }
            }
            ["socd", "set", index, side] => {
                let index: usize = index.parse()?;
                let side = match *side {
                    "a" => SocdSide::A,
                    "b" => SocdSide::B,
                    other => anyhow::bail!("side must be 'a' or 'b', got {other:?}"),
                };
                if !self
                    .with_profile(|p| p.set_socd_binding(index, side))
                    .unwrap_or(false)
                {
                    anyhow::bail!("select a button and a valid pair first");
                }
            }
            ["socd", "type", index, kind] => {
                let index: usize = index.parse()?;
                let kind: SocdType = kind.parse()?;
                if !self
                    .with_profile(|p| p.set_socd_type(index, kind))
                    .unwrap_or(false)
                {
                    anyhow::bail!("no SOCD pair {index}");
                }
            }
            ["options"] => self.print_options(),
            ["options", game, rest @ ..] => {
                let mut draft = self.options.lock().unwrap();
                match *game {
                    "melee" => edit_melee_options(&mut draft.melee, rest)?,
                    "project_m" => edit_project_m_options(&mut draft.project_m, rest)?,
                    other => anyhow::bail!("options are 'melee' or 'project_m', got {other:?}"),
                }
            }
            ["save"] => {
                if self.manager.save_config().await? {
                    println!("{}", "saved".green());
                }
            }
            ["clear"] => {
                let mode = self.manager.active_mode();
                let layout = self
                    .manager
                    .layout()
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("no layout loaded"))?;
                let _ = self.with_profile(|p| p.clear_mappings(&layout));
                self.manager.clear_mappings(mode);
                if self.manager.save_config().await? {
                    println!("{}", "mappings cleared".green());
                }
            }
            ["reboot"] => self.manager.reboot_firmware().await?,
            ["bootloader"] => self.manager.reboot_bootloader().await?,
            ["export", path] => {
                self.editor.save(Path::new(path)).await?;
            }
            ["import", path] => {
                let text = tokio::fs::read_to_string(path).await?;
                self.editor.import(&text)?;
                println!("imported layout {}", self.editor.layout().name.bold());
            }
            ["edit", "current"] => {
                let layout = self
                    .manager
                    .layout()
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("no layout loaded"))?;
                self.editor = EditorState::from_layout(layout);
                println!("editing {}", self.editor.layout().name.bold());
            }
            _ => println!("unknown command, try 'help'"),
        }
        Ok(())
    }

    /// Run an operation against the active mode's profile
    fn with_profile<T>(&self, f: impl FnOnce(&mut ProfileState) -> T) -> Option<T> {
        let mode = self.manager.active_mode();
        self.profiles.lock().unwrap().get_mut(&mode).map(f)
    }

    fn print_status(&self) {
        let state = match self.manager.state() {
            ConnectionState::Disconnected => "disconnected".red().to_string(),
            ConnectionState::Connecting => "connecting".yellow().to_string(),
            ConnectionState::Connected => "connected".green().to_string(),
        };
        println!("  state: {state}");
        if let Some(info) = self.manager.device_info() {
            println!(
                "  device: {} ({} {})",
                info.device_name.bold(),
                info.firmware_name,
                info.firmware_version
            );
        }
        if let Some(layout) = self.manager.layout() {
            println!("  layout: {}", layout.name.bold());
        }
        println!("  mode: {}", self.manager.active_mode().string_id());
    }

    fn print_buttons(&self) {
        let mode = self.manager.active_mode();
        let profiles = self.profiles.lock().unwrap();
        let Some(profile) = profiles.get(&mode) else {
            println!("no profile loaded");
            return;
        };
        for button in profile.buttons() {
            let binding = if button.is_modified {
                button.current_binding.as_str().yellow().to_string()
            } else {
                button.current_binding.as_str().to_string()
            };
            let dirty = if button.is_dirty { " *" } else { "" };
            let socd = button
                .socd_index
                .map(|i| format!(" [socd {i}]"))
                .unwrap_or_default();
            println!("  {:>3}  {binding}{dirty}{socd}", button.physical.to_string());
        }
        for virt in profile.virtual_buttons() {
            let socd = virt
                .socd_index
                .map(|i| format!(" [socd {i}]"))
                .unwrap_or_default();
            println!("  {:>3}  {}{socd}", "~".dimmed(), virt.binding.as_str().dimmed());
        }
    }

    fn print_options(&self) {
        let draft = self.options.lock().unwrap();
        let melee = &draft.melee;
        println!("{}", "melee".bold());
        println!("  enabled: {}", on_off(melee.enabled));
        println!("  crouch_walk_os: {}", on_off(melee.crouch_walk_os));
        println!(
            "  ledgedash_socd_override: {}",
            on_off(!melee.disable_ledgedash_socd_override)
        );
        println!("  custom_airdodge: {}", coords_str(melee.custom_airdodge));
        let pm = &draft.project_m;
        println!("{}", "project_m".bold());
        println!("  enabled: {}", on_off(pm.enabled));
        println!("  true_z_press: {}", on_off(pm.true_z_press));
        println!(
            "  ledgedash_socd_override: {}",
            on_off(!pm.disable_ledgedash_socd_override)
        );
        println!("  custom_airdodge: {}", coords_str(pm.custom_airdodge));
    }

    fn print_socd(&self) {
        let mode = self.manager.active_mode();
        let profiles = self.profiles.lock().unwrap();
        let Some(profile) = profiles.get(&mode) else {
            println!("no profile loaded");
            return;
        };
        for (i, pair) in profile.socd_pairs().iter().enumerate() {
            println!(
                "  {i}: {} / {} ({})",
                pair.a.as_str(),
                pair.b.as_str(),
                pair.kind
            );
        }
    }
}

fn parse_on_off(s: &str) -> Result<bool> {
    match s {
        "on" => Ok(true),
        "off" => Ok(false),
        other => anyhow::bail!("expected 'on' or 'off', got {other:?}"),
    }
}

fn on_off(v: bool) -> ColoredString {
    if v {
        "on".green()
    } else {
        "off".dimmed()
    }
}

fn coords_str(coords: Option<Coords>) -> String {
    match coords {
        Some(c) => format!("({}, {})", c.x, c.y),
        None => "unset".to_string(),
    }
}

fn parse_airdodge(args: &[&str]) -> Result<Option<Coords>> {
    match args {
        ["off"] => Ok(None),
        [x, y] => Ok(Some(Coords {
            x: x.parse()?,
            y: y.parse()?,
        })),
        _ => anyhow::bail!("usage: airdodge <x> <y> | airdodge off"),
    }
}

fn edit_melee_options(options: &mut MeleeOptions, args: &[&str]) -> Result<()> {
    match args {
        ["enabled", v] => options.enabled = parse_on_off(v)?,
        ["crouch_walk_os", v] => options.crouch_walk_os = parse_on_off(v)?,
        ["ledgedash_socd_override", v] => {
            options.disable_ledgedash_socd_override = !parse_on_off(v)?
        }
        ["airdodge", rest @ ..] => options.custom_airdodge = parse_airdodge(rest)?,
        _ => anyhow::bail!(
            "usage: options melee enabled|crouch_walk_os|ledgedash_socd_override on|off, \
             or options melee airdodge <x> <y>|off"
        ),
    }
    Ok(())
}

fn edit_project_m_options(options: &mut ProjectMOptions, args: &[&str]) -> Result<()> {
    match args {
        ["enabled", v] => options.enabled = parse_on_off(v)?,
        ["true_z_press", v] => options.true_z_press = parse_on_off(v)?,
        ["ledgedash_socd_override", v] => {
            options.disable_ledgedash_socd_override = !parse_on_off(v)?
        }
        ["airdodge", rest @ ..] => options.custom_airdodge = parse_airdodge(rest)?,
        _ => anyhow::bail!(
            "usage: options project_m enabled|true_z_press|ledgedash_socd_override on|off, \
             or options project_m airdodge <x> <y>|off"
        ),
    }
    Ok(())
}

fn print_help() {
    println!("{}", "device".bold());
    println!("  connect | disconnect | status | reboot | bootloader");
    println!("{}", "editing".bold());
    println!("  layouts | modes | mode <id> | buttons | select <slot> | bind <binding>");
    println!("  socd | socd add | socd rm <i> | socd set <i> a|b | socd type <i> <type>");
    println!("  options | options melee ... | options project_m ...");
    println!("  save | clear");
    println!("{}", "layout authoring".bold());
    println!("  edit current | import <path> | export <path>");
    println!("{}", "exit".bold());
    println!("  quit | exit");
}
