//! Per-layout, per-mode editing state
//!
//! Rebuilt from scratch every time a config is loaded. Tracks, for every
//! visible button in the layout, the layout default, the binding the device
//! reported at load time, and the user's current choice, plus which SOCD
//! pair (if any) the current binding participates in.

use crate::bindings::{Binding, PhysicalButton};
use crate::config::{ButtonBinding, Config, SOCDS_MAX_LEN};
use crate::layout::Layout;
use crate::manager::ModeDelta;
use crate::modes::GameMode;
use crate::socd::{SocdPair, SocdType};
use tracing::warn;

/// Which slot of a SOCD pair to assign
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocdSide {
    A,
    B,
}

/// Editing state of one visible button
#[derive(Debug, Clone, PartialEq)]
pub struct ButtonState {
    pub physical: PhysicalButton,
    /// Layout-declared default for this mode
    pub default_binding: Binding,
    /// Binding the device reported when the config was loaded
    pub initial_binding: Binding,
    pub current_binding: Binding,
    /// Differs from what the device currently holds
    pub is_dirty: bool,
    /// Differs from the layout default
    pub is_modified: bool,
    /// Index into the SOCD pair list the current binding participates in
    pub socd_index: Option<usize>,
}

/// A hidden layout slot, selectable for SOCD assignment but not remappable
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualButton {
    pub binding: Binding,
    pub socd_index: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ProfileState {
    pub mode: GameMode,
    buttons: Vec<ButtonState>,
    virtuals: Vec<VirtualButton>,
    socd_pairs: Vec<SocdPair>,
    selected: Option<usize>,
}

impl ProfileState {
    pub fn new(mode: GameMode) -> Self {
        Self {
            mode,
            buttons: Vec::new(),
            virtuals: Vec::new(),
            socd_pairs: Vec::new(),
            selected: None,
        }
    }

    /// Rebuild from a freshly loaded config
    pub fn load_from_config(&mut self, layout: &Layout, config: &Config) {
        self.buttons.clear();
        self.virtuals.clear();
        self.socd_pairs.clear();
        self.selected = None;

        let Some(layout_mode) = layout.modes.get(&self.mode) else {
            warn!(
                "layout {:?} has no {} mode table",
                layout.name,
                self.mode.string_id()
            );
            return;
        };
        let remaps: Vec<ButtonBinding> = config
            .mode(self.mode)
            .map(|m| m.button_remapping.clone())
            .unwrap_or_default();
        self.socd_pairs = config
            .mode(self.mode)
            .map(|m| m.socd_pairs.clone())
            .unwrap_or_default();

        // Every placed button gets a row; one the mode table does not bind
        // shows up as unspecified rather than disappearing.
        for &(physical, _, _) in &layout.buttons {
            let default_binding = layout_mode
                .bindings
                .iter()
                .find(|slot| slot.physical == physical && !slot.hidden)
                .map(|slot| slot.binding)
                .unwrap_or(Binding::Unspecified);
            let remapped = remaps
                .iter()
                .find(|r| r.physical == physical)
                .map(|r| r.binding);
            let current = remapped.unwrap_or(default_binding);
            let socd_index = self.socd_membership(current);
            self.buttons.push(ButtonState {
                physical,
                default_binding,
                initial_binding: current,
                current_binding: current,
                is_dirty: false,
                is_modified: current != default_binding,
                socd_index,
            });
        }
        for slot in &layout_mode.bindings {
            if slot.hidden {
                let socd_index = self.socd_membership(slot.binding);
                self.virtuals.push(VirtualButton {
                    binding: slot.binding,
                    socd_index,
                });
            }
        }
    }

    /// First pair the binding participates in
    fn socd_membership(&self, binding: Binding) -> Option<usize> {
        self.socd_pairs.iter().position(|p| p.references(binding))
    }

    pub fn buttons(&self) -> &[ButtonState] {
        &self.buttons
    }

    pub fn virtual_buttons(&self) -> &[VirtualButton] {
        &self.virtuals
    }

    pub fn socd_pairs(&self) -> &[SocdPair] {
        &self.socd_pairs
    }

    /// Select the button to edit. Returns false for unknown slots.
    pub fn select(&mut self, physical: PhysicalButton) -> bool {
        match self.buttons.iter().position(|b| b.physical == physical) {
            Some(i) => {
                self.selected = Some(i);
                true
            }
            None => false,
        }
    }

    pub fn selected_button(&self) -> Option<&ButtonState> {
        self.selected.and_then(|i| self.buttons.get(i))
    }

    /// Assign a binding to the selected button
    pub fn set_binding(&mut self, binding: Binding) -> bool {
        let socd_index = self.socd_membership(binding);
        let Some(button) = self.selected.and_then(|i| self.buttons.get_mut(i)) else {
            return false;
        };
        button.current_binding = binding;
        button.is_dirty = binding != button.initial_binding;
        button.is_modified = binding != button.default_binding;
        button.socd_index = socd_index;
        true
    }

    /// Put the selected button's binding into one side of a SOCD pair
    pub fn set_socd_binding(&mut self, pair_index: usize, side: SocdSide) -> bool {
        let Some(binding) = self.selected_button().map(|b| b.current_binding) else {
            return false;
        };
        let Some(pair) = self.socd_pairs.get(pair_index) else {
            return false;
        };
        let displaced = match side {
            SocdSide::A => pair.a,
            SocdSide::B => pair.b,
        };
        if displaced == binding {
            return true;
        }

        // Whoever held this slot's binding no longer points at the pair.
        for button in &mut self.buttons {
            if button.socd_index == Some(pair_index) && button.current_binding == displaced {
                button.socd_index = None;
            }
        }
        for virt in &mut self.virtuals {
            if virt.socd_index == Some(pair_index) && virt.binding == displaced {
                virt.socd_index = None;
            }
        }

        let pair = &mut self.socd_pairs[pair_index];
        match side {
            SocdSide::A => pair.a = binding,
            SocdSide::B => pair.b = binding,
        }
        if let Some(button) = self.selected.and_then(|i| self.buttons.get_mut(i)) {
            button.socd_index = Some(pair_index);
        }
        true
    }

    pub fn set_socd_type(&mut self, pair_index: usize, kind: SocdType) -> bool {
        match self.socd_pairs.get_mut(pair_index) {
            Some(pair) => {
                pair.kind = kind;
                true
            }
            None => false,
        }
    }

    /// Append an empty pair, bounded by the wire limit
    pub fn add_socd(&mut self) -> bool {
        if self.socd_pairs.len() >= SOCDS_MAX_LEN {
            warn!("SOCD pair limit of {SOCDS_MAX_LEN} reached");
            return false;
        }
        self.socd_pairs.push(SocdPair {
            a: Binding::Unspecified,
            b: Binding::Unspecified,
            kind: SocdType::SecondInput,
        });
        true
    }

    /// Remove a pair. Buttons pointing at it are cleared; pointers past it
    /// shift down to keep tracking the pair they referred to.
    pub fn remove_socd(&mut self, pair_index: usize) -> bool {
        if pair_index >= self.socd_pairs.len() {
            return false;
        }
        self.socd_pairs.remove(pair_index);
        for socd_index in self
            .buttons
            .iter_mut()
            .map(|b| &mut b.socd_index)
            .chain(self.virtuals.iter_mut().map(|v| &mut v.socd_index))
        {
            match *socd_index {
                Some(i) if i == pair_index => *socd_index = None,
                Some(i) if i > pair_index => *socd_index = Some(i - 1),
                _ => {}
            }
        }
        true
    }

    /// Reset every button to its layout default and restore the layout's
    /// default SOCD table. The caller is expected to persist immediately.
    pub fn clear_mappings(&mut self, layout: &Layout) {
        if let Some(layout_mode) = layout.modes.get(&self.mode) {
            self.socd_pairs = layout_mode
                .socd
                .iter()
                .map(|&(a, b, kind)| SocdPair { a, b, kind })
                .collect();
        }
        for i in 0..self.buttons.len() {
            let default = self.buttons[i].default_binding;
            let socd_index = self.socd_membership(default);
            let button = &mut self.buttons[i];
            button.current_binding = default;
            button.is_dirty = button.current_binding != button.initial_binding;
            button.is_modified = false;
            button.socd_index = socd_index;
        }
        for i in 0..self.virtuals.len() {
            self.virtuals[i].socd_index = self.socd_membership(self.virtuals[i].binding);
        }
    }

    /// Minimal delta: only buttons whose current binding differs from the
    /// layout default. This is what gets transmitted, never the full table.
    pub fn get_remapped_buttons(&self) -> Vec<ButtonBinding> {
        self.buttons
            .iter()
            .filter(|b| b.is_modified)
            .map(|b| ButtonBinding {
                physical: b.physical,
                binding: b.current_binding,
            })
            .collect()
    }

    pub fn delta(&self) -> ModeDelta {
        ModeDelta {
            mode: self.mode,
            remaps: self.get_remapped_buttons(),
            socd_pairs: self.socd_pairs.clone(),
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.buttons.iter().any(|b| b.is_dirty)
    }

    /// The device now holds what we show; current becomes the new baseline.
    pub fn mark_saved(&mut self) {
        for button in &mut self.buttons {
            button.initial_binding = button.current_binding;
            button.is_dirty = false;
        }
    }

    pub fn clear(&mut self) {
        self.buttons.clear();
        self.virtuals.clear();
        self.socd_pairs.clear();
        self.selected = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::haybox::defaults::default_wire_config;
    use crate::haybox::transcoder::decode_config;
    use crate::layout::test_layout;

    fn melee_profile() -> (Layout, Config, ProfileState) {
        let layout = test_layout();
        let config = decode_config(&layout, &default_wire_config()).unwrap();
        let mut profile = ProfileState::new(GameMode::Melee);
        profile.load_from_config(&layout, &config);
        (layout, config, profile)
    }

    #[test]
    fn placed_button_missing_from_mode_table_lists_as_unspecified() {
        let mut layout = test_layout();
        let config = decode_config(&layout, &default_wire_config()).unwrap();
        layout
            .modes
            .get_mut(&GameMode::Melee)
            .unwrap()
            .bindings
            .retain(|slot| slot.physical != PhysicalButton::Slot(19));

        let mut profile = ProfileState::new(GameMode::Melee);
        profile.load_from_config(&layout, &config);
        let button = profile
            .buttons()
            .iter()
            .find(|b| b.physical == PhysicalButton::Slot(19))
            .expect("placed buttons always get a row");
        assert_eq!(button.default_binding, Binding::Unspecified);
        assert_eq!(button.current_binding, Binding::Unspecified);
        assert!(!button.is_modified);
    }

    #[test]
    fn load_initializes_buttons_to_layout_defaults() {
        let (layout, _, profile) = melee_profile();
        assert_eq!(profile.buttons().len(), layout.buttons.len());
        assert!(profile.buttons().iter().all(|b| !b.is_dirty && !b.is_modified));
        assert!(profile.get_remapped_buttons().is_empty());
        assert_eq!(profile.virtual_buttons().len(), 4);
    }

    #[test]
    fn load_applies_remap_overrides() {
        let (layout, mut config, _) = melee_profile();
        config
            .mode_mut(GameMode::Melee)
            .unwrap()
            .button_remapping
            .push(ButtonBinding {
                physical: PhysicalButton::Slot(19),
                binding: Binding::X,
            });
        let mut profile = ProfileState::new(GameMode::Melee);
        profile.load_from_config(&layout, &config);

        let button = profile
            .buttons()
            .iter()
            .find(|b| b.physical == PhysicalButton::Slot(19))
            .unwrap();
        assert_eq!(button.current_binding, Binding::X);
        assert_eq!(button.initial_binding, Binding::X);
        assert!(button.is_modified);
        assert!(!button.is_dirty);
    }

    #[test]
    fn set_binding_recomputes_flags_and_socd_membership() {
        let (_, _, mut profile) = melee_profile();
        assert!(profile.select(PhysicalButton::Slot(19)));
        assert!(profile.set_binding(Binding::LeftStickLeft));

        let button = profile.selected_button().unwrap();
        assert!(button.is_dirty);
        assert!(button.is_modified);
        // left_stick_left sits in the first default SOCD pair.
        assert_eq!(button.socd_index, Some(0));

        assert!(profile.set_binding(Binding::A));
        let button = profile.selected_button().unwrap();
        assert!(!button.is_dirty);
        assert!(!button.is_modified);
        assert_eq!(button.socd_index, None);
    }

    #[test]
    fn remapped_buttons_is_the_minimal_delta() {
        let (_, _, mut profile) = melee_profile();
        profile.select(PhysicalButton::Slot(19));
        profile.set_binding(Binding::X);

        let delta = profile.get_remapped_buttons();
        assert_eq!(delta.len(), 1);
        assert_eq!(delta[0].physical, PhysicalButton::Slot(19));
        assert_eq!(delta[0].binding, Binding::X);
    }

    #[test]
    fn socd_slot_reassignment_clears_the_displaced_button() {
        let (_, _, mut profile) = melee_profile();
        // Slot 3 holds left_stick_left, side A of pair 0.
        assert!(profile.select(PhysicalButton::Slot(3)));
        assert_eq!(profile.selected_button().unwrap().socd_index, Some(0));

        // Bind slot 19 to "z" and put it into pair 0 side A.
        profile.select(PhysicalButton::Slot(19));
        profile.set_binding(Binding::Z);
        assert!(profile.set_socd_binding(0, SocdSide::A));

        assert_eq!(profile.socd_pairs()[0].a, Binding::Z);
        assert_eq!(profile.selected_button().unwrap().socd_index, Some(0));
        let displaced = profile
            .buttons()
            .iter()
            .find(|b| b.physical == PhysicalButton::Slot(3))
            .unwrap();
        assert_eq!(displaced.socd_index, None);
    }

    #[test]
    fn socd_assignment_of_same_binding_is_a_no_op() {
        let (_, _, mut profile) = melee_profile();
        profile.select(PhysicalButton::Slot(3));
        let before = profile.socd_pairs().to_vec();
        assert!(profile.set_socd_binding(0, SocdSide::A));
        assert_eq!(profile.socd_pairs(), &before[..]);
    }

    #[test]
    fn socd_removal_clears_members_and_reindexes_later_pointers() {
        let (_, _, mut profile) = melee_profile();
        // Pair 0: left stick horizontals; pair 1: left stick verticals.
        profile.select(PhysicalButton::Slot(3));
        assert_eq!(profile.selected_button().unwrap().socd_index, Some(0));
        profile.select(PhysicalButton::Slot(2));
        assert_eq!(profile.selected_button().unwrap().socd_index, Some(1));

        assert!(profile.remove_socd(0));

        let horizontal = profile
            .buttons()
            .iter()
            .find(|b| b.physical == PhysicalButton::Slot(3))
            .unwrap();
        assert_eq!(horizontal.socd_index, None);
        // The vertical pair shifted to index 0; its members follow it.
        let vertical = profile
            .buttons()
            .iter()
            .find(|b| b.physical == PhysicalButton::Slot(2))
            .unwrap();
        assert_eq!(vertical.socd_index, Some(0));
        assert!(profile.socd_pairs()[0].references(Binding::LeftStickDown));
    }

    #[test]
    fn add_socd_is_bounded() {
        let (_, _, mut profile) = melee_profile();
        while profile.socd_pairs().len() < SOCDS_MAX_LEN {
            assert!(profile.add_socd());
        }
        assert!(!profile.add_socd());
    }

    #[test]
    fn clear_mappings_restores_layout_defaults() {
        let (layout, _, mut profile) = melee_profile();
        profile.select(PhysicalButton::Slot(19));
        profile.set_binding(Binding::X);
        profile.remove_socd(0);

        profile.clear_mappings(&layout);

        assert!(profile.get_remapped_buttons().is_empty());
        assert_eq!(profile.socd_pairs().len(), 4);
        // Reset differs from what the device holds until saved.
        let button = profile
            .buttons()
            .iter()
            .find(|b| b.physical == PhysicalButton::Slot(19))
            .unwrap();
        assert!(!button.is_modified);
    }

    #[test]
    fn mark_saved_rebaselines_dirty_state() {
        let (_, _, mut profile) = melee_profile();
        profile.select(PhysicalButton::Slot(19));
        profile.set_binding(Binding::X);
        assert!(profile.is_dirty());

        profile.mark_saved();
        assert!(!profile.is_dirty());
        let button = profile.selected_button().unwrap();
        assert_eq!(button.initial_binding, Binding::X);
        assert!(button.is_modified);
    }
}
