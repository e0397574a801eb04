//! The host firmware side
//!
//! The remapper doesn't send anything to USB itself.  It reads the current modifiers, and asks the
//! firmware to register and unregister keys, the same primitives a QMK keymap would use.  The
//! firmware is responsible for turning those into HID reports.
//!
//! [`HidReport`] is a simple host for firmware that builds its own reports: it keeps the set of
//! keys that are down, which can be handed to a `usbd-human-interface-device` keyboard with
//! something like `keyboard.write_report(report.keys())`.

use arrayvec::ArrayVec;
use usbd_human_interface_device::page::Keyboard;

use crate::log::warn;
use crate::Mods;

/// What the remapper needs from the firmware.
pub trait KeyHost {
    /// The modifiers currently held, as they will be reported to the host computer.
    fn mods(&self) -> Mods;

    /// Press a key.
    fn register_key(&mut self, key: Keyboard);

    /// Release a key.
    fn unregister_key(&mut self, key: Keyboard);
}

impl<H: KeyHost + ?Sized> KeyHost for &mut H {
    fn mods(&self) -> Mods {
        (**self).mods()
    }

    fn register_key(&mut self, key: Keyboard) {
        (**self).register_key(key)
    }

    fn unregister_key(&mut self, key: Keyboard) {
        (**self).unregister_key(key)
    }
}

/// The set of keys currently down, modifiers included.
///
/// The default size fits a boot keyboard report: six keys, and all eight modifiers.
#[derive(Clone, Debug, Default)]
pub struct HidReport<const N: usize = 14> {
    keys: ArrayVec<Keyboard, N>,
}

impl<const N: usize> HidReport<N> {
    pub fn new() -> Self {
        HidReport {
            keys: ArrayVec::new(),
        }
    }

    /// The keys that are down, in the order they were pressed.
    pub fn keys(&self) -> impl Iterator<Item = Keyboard> + '_ {
        self.keys.iter().copied()
    }

    pub fn is_pressed(&self, key: Keyboard) -> bool {
        self.keys.contains(&key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Release everything.
    pub fn clear(&mut self) {
        self.keys.clear();
    }
}

impl<const N: usize> KeyHost for HidReport<N> {
    fn mods(&self) -> Mods {
        self.keys
            .iter()
            .fold(Mods::empty(), |mods, key| mods | Mods::from_key(*key))
    }

    fn register_key(&mut self, key: Keyboard) {
        if self.keys.contains(&key) {
            return;
        }
        if self.keys.try_push(key).is_err() {
            warn!("Report full, dropping {:?}", key);
        }
    }

    fn unregister_key(&mut self, key: Keyboard) {
        self.keys.retain(|k| *k != key);
    }
}
