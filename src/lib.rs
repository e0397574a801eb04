//! US to JIS keymap remapping
//!
//! A keyboard wired (and keycapped) as a US layout, plugged into a host that is configured for a
//! Japanese (JIS) keyboard, will type the wrong symbols for most of the punctuation keys.  This
//! crate sits in the firmware's key event path, and substitutes the keys the JIS host expects so
//! that what is printed on the keycap is what gets typed.
//!
//! The firmware calls [`Remapper::handle_key_event`] for every raw key event, before its own
//! processing.  A return of `true` means the event was not ours, and the firmware should handle
//! it normally.

#![cfg_attr(not(any(feature = "std", test)), no_std)]
// #![deny(missing_docs)]

#[cfg(not(any(feature = "std", test)))]
extern crate core as std;

use bitflags::bitflags;

pub use usbd_human_interface_device::page::Keyboard;

pub use error::{Error, Result};
pub use host::{HidReport, KeyHost};
pub use keymap::{Keymap, MappingEntry, MappingRule, NONE, US_TO_JP};
pub use remap::{OutputMode, PendingKey, RemapConfig, Remapper};

pub mod error;
pub mod host;
pub mod keymap;
pub mod remap;

#[cfg(test)]
mod testlog;

cfg_if::cfg_if! {
    if #[cfg(test)] {
        mod log {
            pub use log::{debug, warn};
        }
    } else if #[cfg(feature = "defmt")] {
        mod log {
            pub use defmt::{debug, warn};
        }
    } else if #[cfg(feature = "log")] {
        mod log {
            pub use log::{debug, warn};
        }
    } else {
        mod log {
            pub(crate) use crate::nolog::{debug, warn};
        }
    }
}

/// Logging macros for when there is no logger, the arguments still get type checked.
///
/// `warn` on its own clashes with the builtin attribute, so the macros get other names and are
/// renamed on the way out.
#[allow(unused_macros, unused_imports)]
mod nolog {
    macro_rules! nolog_debug {
        ($($arg:tt)*) => {{
            if false {
                let _ = core::format_args!($($arg)*);
            }
        }};
    }
    macro_rules! nolog_warn {
        ($($arg:tt)*) => {{
            if false {
                let _ = core::format_args!($($arg)*);
            }
        }};
    }
    pub(crate) use nolog_debug as debug;
    pub(crate) use nolog_warn as warn;
}

/// Key events indicate keys going up or down.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyEvent {
    Press(Keyboard),
    Release(Keyboard),
}

impl KeyEvent {
    pub fn key(&self) -> Keyboard {
        match self {
            KeyEvent::Press(k) => *k,
            KeyEvent::Release(k) => *k,
        }
    }

    pub fn is_press(&self) -> bool {
        match self {
            KeyEvent::Press(_) => true,
            KeyEvent::Release(_) => false,
        }
    }

    pub fn is_release(&self) -> bool {
        !self.is_press()
    }
}

bitflags! {
    /// A modifier map, laid out the same as the modifier byte of a HID boot keyboard report.
    #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
    pub struct Mods: u8 {
        const LEFT_CONTROL = 0b0000_0001;
        const LEFT_SHIFT = 0b0000_0010;
        const LEFT_ALT = 0b0000_0100;
        const LEFT_GUI = 0b0000_1000;
        const RIGHT_CONTROL = 0b0001_0000;
        const RIGHT_SHIFT = 0b0010_0000;
        const RIGHT_ALT = 0b0100_0000;
        const RIGHT_GUI = 0b1000_0000;

        /// Either shift.
        const SHIFT = Self::LEFT_SHIFT.bits() | Self::RIGHT_SHIFT.bits();
    }
}

impl Mods {
    /// The modifier bit for a given key, or empty if the key is not a modifier.
    pub fn from_key(key: Keyboard) -> Mods {
        let code = key as u8;
        if (Keyboard::LeftControl as u8..=Keyboard::RightGUI as u8).contains(&code) {
            Mods::from_bits_retain(1 << (code - Keyboard::LeftControl as u8))
        } else {
            Mods::empty()
        }
    }

    /// Is this key one of the eight modifier keys.
    pub fn is_modifier(key: Keyboard) -> bool {
        !Mods::from_key(key).is_empty()
    }

    /// The shift key that is held, preferring the left one when both are.
    pub fn shift_key(self) -> Option<Keyboard> {
        if self.contains(Mods::LEFT_SHIFT) {
            Some(Keyboard::LeftShift)
        } else if self.contains(Mods::RIGHT_SHIFT) {
            Some(Keyboard::RightShift)
        } else {
            None
        }
    }

    /// Each held shift key, left first.
    pub fn shift_keys(self) -> impl Iterator<Item = Keyboard> {
        [
            (Mods::LEFT_SHIFT, Keyboard::LeftShift),
            (Mods::RIGHT_SHIFT, Keyboard::RightShift),
        ]
        .into_iter()
        .filter(move |(bit, _)| self.contains(*bit))
        .map(|(_, key)| key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mod_bits() {
        assert_eq!(Mods::from_key(Keyboard::LeftControl), Mods::LEFT_CONTROL);
        assert_eq!(Mods::from_key(Keyboard::LeftShift), Mods::LEFT_SHIFT);
        assert_eq!(Mods::from_key(Keyboard::RightShift), Mods::RIGHT_SHIFT);
        assert_eq!(Mods::from_key(Keyboard::RightGUI), Mods::RIGHT_GUI);
        assert_eq!(Mods::from_key(Keyboard::A), Mods::empty());
        assert!(!Mods::is_modifier(Keyboard::Minus));
    }

    #[test]
    fn shift_preference() {
        assert_eq!(Mods::SHIFT.shift_key(), Some(Keyboard::LeftShift));
        assert_eq!(Mods::RIGHT_SHIFT.shift_key(), Some(Keyboard::RightShift));
        assert_eq!(Mods::LEFT_CONTROL.shift_key(), None);

        let both: Vec<_> = Mods::SHIFT.shift_keys().collect();
        assert_eq!(both, [Keyboard::LeftShift, Keyboard::RightShift]);
        assert_eq!(Mods::LEFT_ALT.shift_keys().count(), 0);
    }

    #[test]
    fn silent_logging() {
        use crate::nolog::{debug, warn};

        let key = Keyboard::Kanji3;
        debug!("remap {:?}", key);
        warn!("dropping {:?}, shift {}", key, true);
    }

    #[test]
    fn key_event() {
        let ev = KeyEvent::Press(Keyboard::Keyboard6);
        assert_eq!(ev.key(), Keyboard::Keyboard6);
        assert!(ev.is_press());
        assert!(KeyEvent::Release(Keyboard::Keyboard6).is_release());
    }
}
