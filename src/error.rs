//! Errors
//!
//! The event path itself never fails, a key we don't know about just goes to the firmware.  The
//! only errors come from building a keymap out of a bad table.

use core::fmt;

use usbd_human_interface_device::page::Keyboard;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The same source key appears in more than one entry.  The lookup would only ever find the
    /// first.
    DuplicateSource(Keyboard),
    /// An entry uses the empty key as its source.
    NoneSource,
    /// A modifier key was used as a source or output.  The remapper manages shift itself, and
    /// can't remap the keys it is watching.
    ModifierKey(Keyboard),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DuplicateSource(key) => write!(f, "duplicate source key {:?} in keymap", key),
            Error::NoneSource => write!(f, "keymap entry has no source key"),
            Error::ModifierKey(key) => write!(f, "modifier key {:?} can't be remapped", key),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
