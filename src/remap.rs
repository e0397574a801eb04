//! The remapping state machine
//!
//! Remapping a key is more than sending a different key code.  Most of the JIS symbols are on a
//! key with a different shift state than the US one, so a remap will often have to press shift
//! when the user isn't holding it, or lift shift while the user is holding it.
//!
//! The press and the release of the user's key are separate events, and other keys (including
//! shift itself) can come and go in between.  So the shift change is not undone right away.
//! Instead, each remapped key that is down gets a [`PendingKey`], recording what has to be put
//! back, and that is done when the key itself is released.
//!
//! Shift keys are owned by at most one pending key at a time:
//!
//! - A shift pressed by the remapper (`release_shift`) belongs to the key that pressed it.  If the
//!   user then presses that same shift, or another remapped key needs it lifted, it stops being
//!   ours, and the release will leave it alone.
//! - A shift the remapper lifted while the user was holding it (`repress_shift`) is pressed again
//!   on release.  If the user lets go of it first, or another remapped key needs it down again, it
//!   is no longer owed.
//!
//! Because of this, the remapper also needs to see the shift key events, which it always passes
//! through to the firmware.
//!
//! Held output keys (in [`OutputMode::Hold`]) follow the same rule.  Several source keys share an
//! output (shift-';' and shift-'8' both send '\''), and the output belongs to whichever of them
//! pressed it last.
//!
//! A synthetic shift stays down for as long as the key that needed it is held, in both modes.  Any
//! unmapped key rolled over in that window is typed shifted: '=' then 'a' gives 'A' if '=' is
//! still down.  With [`OutputMode::Tap`] the output itself is already released by then, so a
//! firmware that sees a lot of rollover may prefer [`OutputMode::Hold`], where the shift is at
//! least matched by a held output the host can auto-repeat.

use arrayvec::ArrayVec;
use usbd_human_interface_device::page::Keyboard;

use crate::log::{debug, warn};
use crate::{KeyEvent, KeyHost, Keymap, Mods};

/// The number of remapped keys that can be held down at once.
pub const DEFAULT_PENDING: usize = 6;

/// How the output key is sent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputMode {
    /// Press and release the output immediately when the key goes down.
    #[default]
    Tap,
    /// Hold the output down until the key is released, so the host will auto-repeat it.
    Hold,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RemapConfig {
    pub output: OutputMode,
}

/// What needs to be undone when a remapped key is released.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingKey {
    /// The key the user pressed.
    pub source: Keyboard,
    /// An output key still held down.
    pub release_output: Option<Keyboard>,
    /// A shift we pressed that the user isn't holding.
    pub release_shift: Option<Keyboard>,
    /// Shifts the user is holding that we lifted.
    pub repress_shift: Mods,
}

impl PendingKey {
    fn new(source: Keyboard) -> PendingKey {
        PendingKey {
            source,
            release_output: None,
            release_shift: None,
            repress_shift: Mods::empty(),
        }
    }

    /// Will releasing this key do anything other than swallow the release.
    pub fn is_noop(&self) -> bool {
        self.release_output.is_none() && self.release_shift.is_none() && self.repress_shift.is_empty()
    }

    /// Put back what the press changed.
    fn undo<H: KeyHost + ?Sized>(&self, host: &mut H) {
        if let Some(key) = self.release_output {
            host.unregister_key(key);
        }
        if let Some(shift) = self.release_shift {
            host.unregister_key(shift);
        }
        for shift in self.repress_shift.shift_keys() {
            host.register_key(shift);
        }
    }
}

/// The remapper.  One of these lives in the firmware, and sees every key event.
pub struct Remapper<const N: usize = DEFAULT_PENDING> {
    keymap: Keymap,
    config: RemapConfig,
    pending: ArrayVec<PendingKey, N>,
}

impl Remapper {
    /// A remapper using the built in US to JIS table.
    pub fn new() -> Self {
        Remapper::with_config(Keymap::us_to_jp(), RemapConfig::default())
    }
}

impl Default for Remapper {
    fn default() -> Self {
        Remapper::new()
    }
}

impl<const N: usize> Remapper<N> {
    pub fn with_config(keymap: Keymap, config: RemapConfig) -> Self {
        Remapper {
            keymap,
            config,
            pending: ArrayVec::new(),
        }
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    pub fn config(&self) -> &RemapConfig {
        &self.config
    }

    /// The remapped keys currently down, oldest first.
    pub fn pending(&self) -> &[PendingKey] {
        &self.pending
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, source: Keyboard) -> bool {
        self.position(source).is_some()
    }

    pub fn handle_event<H: KeyHost + ?Sized>(&mut self, event: KeyEvent, host: &mut H) -> bool {
        self.handle_key_event(event.key(), event.is_press(), host)
    }

    /// Handle a single raw key event.  Returns `true` if the firmware should continue with its
    /// own handling of the key, and `false` if the event has been dealt with.
    pub fn handle_key_event<H: KeyHost + ?Sized>(
        &mut self,
        key: Keyboard,
        pressed: bool,
        host: &mut H,
    ) -> bool {
        if Mods::is_modifier(key) {
            self.track_modifier(key, pressed);
            return true;
        }

        if pressed {
            self.press(key, host)
        } else {
            self.release(key, host)
        }
    }

    /// Undo everything that is pending, as if all of the remapped keys had been released.
    pub fn reset_pending_keys<H: KeyHost + ?Sized>(&mut self, host: &mut H) {
        while let Some(record) = self.pending.pop() {
            record.undo(host);
        }
    }

    fn press<H: KeyHost + ?Sized>(&mut self, key: Keyboard, host: &mut H) -> bool {
        let Some(entry) = self.keymap.lookup(key).and_then(|i| self.keymap.entry(i)) else {
            return true;
        };

        // A second press without a release means we missed the release.
        if let Some(pos) = self.position(key) {
            warn!("Press of {:?} while already down", key);
            let stale = self.pending.remove(pos);
            stale.undo(host);
        }

        let rule = *entry.rule(self.physical_shift(host).is_some());
        if rule.is_none() {
            return true;
        }
        debug!("Remap {:?} to {:?}, shift {}", key, rule.key, rule.shift);

        let mut record = PendingKey::new(key);
        let held = host.mods() & Mods::SHIFT;

        if rule.shift {
            if held.is_empty() {
                if let Some(shift) = self.suppressed().shift_key() {
                    // The user is holding this one, so put it back down for good.
                    self.give_back(shift);
                    host.register_key(shift);
                } else {
                    host.register_key(Keyboard::LeftShift);
                    record.release_shift = Some(Keyboard::LeftShift);
                }
            }
        } else {
            for shift in held.shift_keys() {
                host.unregister_key(shift);
                if !self.take_over(shift) {
                    record.repress_shift |= Mods::from_key(shift);
                }
            }
        }

        // Another held key may already have this output down.  It's this key's now, so the other
        // release doesn't lift it out from under us.
        if self.take_output(rule.key) {
            debug!("{:?} handed over to {:?}", rule.key, key);
        }
        host.register_key(rule.key);
        if self.pending.is_full() {
            warn!("Too many remapped keys down, not deferring {:?}", key);
            host.unregister_key(rule.key);
            record.undo(host);
            return false;
        }

        match self.config.output {
            OutputMode::Tap => host.unregister_key(rule.key),
            OutputMode::Hold => record.release_output = Some(rule.key),
        }
        self.pending.push(record);
        false
    }

    fn release<H: KeyHost + ?Sized>(&mut self, key: Keyboard, host: &mut H) -> bool {
        match self.position(key) {
            Some(pos) => {
                let record = self.pending.remove(pos);
                record.undo(host);
                false
            }
            None => true,
        }
    }

    /// Keep the shift ownership in line with what the user is physically doing.
    fn track_modifier(&mut self, key: Keyboard, pressed: bool) {
        let bit = Mods::from_key(key) & Mods::SHIFT;
        if bit.is_empty() {
            return;
        }
        if pressed {
            if self.take_over(key) {
                debug!("{:?} is now held by the user", key);
            }
        } else {
            self.give_back(key);
        }
    }

    /// The shift the user is holding, which isn't the same as what the host reports while we have
    /// keys pending.
    fn physical_shift<H: KeyHost + ?Sized>(&self, host: &H) -> Option<Keyboard> {
        let held = host.mods() & Mods::SHIFT;
        ((held - self.synthetic()) | self.suppressed()).shift_key()
    }

    /// Shifts that are down only because we pressed them.
    fn synthetic(&self) -> Mods {
        self.pending
            .iter()
            .filter_map(|p| p.release_shift)
            .fold(Mods::empty(), |mods, key| mods | Mods::from_key(key))
    }

    /// Shifts the user holds that we have lifted.
    fn suppressed(&self) -> Mods {
        self.pending
            .iter()
            .fold(Mods::empty(), |mods, p| mods | p.repress_shift)
    }

    /// Stop owning a shift that we pressed.  Returns whether any pending key did.
    fn take_over(&mut self, shift: Keyboard) -> bool {
        match self
            .pending
            .iter_mut()
            .find(|p| p.release_shift == Some(shift))
        {
            Some(record) => {
                record.release_shift = None;
                true
            }
            None => false,
        }
    }

    /// Stop owning a held output key.  Returns whether any pending key held it.
    fn take_output(&mut self, output: Keyboard) -> bool {
        match self
            .pending
            .iter_mut()
            .find(|p| p.release_output == Some(output))
        {
            Some(record) => {
                record.release_output = None;
                true
            }
            None => false,
        }
    }

    /// Forget that a shift needs to be pressed again.
    fn give_back(&mut self, shift: Keyboard) {
        let bit = Mods::from_key(shift);
        for record in self.pending.iter_mut() {
            record.repress_shift.remove(bit);
        }
    }

    fn position(&self, source: Keyboard) -> Option<usize> {
        self.pending.iter().position(|p| p.source == source)
    }
}
