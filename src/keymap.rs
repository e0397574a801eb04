//! The US to JIS translation table
//!
//! Each entry is a key on the US keyboard whose symbols land somewhere else on a JIS keyboard.
//! There are two rules per key: one for when it is pressed by itself, and one for when it is
//! pressed with shift held.  A rule gives the JIS key that produces the symbol printed on the US
//! keycap, and whether that key needs shift.
//!
//! As an example, shift-2 on a US board is '@'.  On JIS, '@' is the unshifted key to the right of
//! 'P', which is where US has '['.  So the shifted rule for '2' is an unshifted '['.
//!
//! Keys absent from the table, and rules with a key of [`NONE`], are the same on both layouts and
//! are left to the firmware.

use usbd_human_interface_device::page::Keyboard;

use crate::{Error, Mods, Result};

/// The empty key.  A rule with this key doesn't remap anything.
pub const NONE: Keyboard = Keyboard::NoEventIndicated;

/// A single output: the key to send, and whether shift should be down when it is sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MappingRule {
    pub shift: bool,
    pub key: Keyboard,
}

impl MappingRule {
    /// Does this rule leave the key alone.
    pub fn is_none(&self) -> bool {
        self.key == NONE
    }
}

/// The two rules for a source key.  `rules[0]` is used without shift, `rules[1]` with it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MappingEntry {
    pub source: Keyboard,
    pub rules: [MappingRule; 2],
}

impl MappingEntry {
    pub fn rule(&self, shifted: bool) -> &MappingRule {
        &self.rules[shifted as usize]
    }
}

/// Send the key as is.
const fn n(key: Keyboard) -> MappingRule {
    MappingRule { shift: false, key }
}

/// Send the key with shift.
const fn s(key: Keyboard) -> MappingRule {
    MappingRule { shift: true, key }
}

const fn entry(source: Keyboard, plain: MappingRule, shifted: MappingRule) -> MappingEntry {
    MappingEntry {
        source,
        rules: [plain, shifted],
    }
}

const PASS: MappingRule = n(NONE);

pub const US_TO_JP: &[MappingEntry] = &[
    entry(Keyboard::Keyboard2, PASS, n(Keyboard::LeftBrace)),     // @
    entry(Keyboard::Keyboard6, PASS, n(Keyboard::Equal)),         // ^
    entry(Keyboard::Keyboard7, PASS, s(Keyboard::Keyboard6)),     // &
    entry(Keyboard::Keyboard8, PASS, s(Keyboard::Apostrophe)),    // *
    entry(Keyboard::Keyboard9, PASS, s(Keyboard::Keyboard8)),     // (
    entry(Keyboard::Keyboard0, PASS, s(Keyboard::Keyboard9)),     // )
    entry(Keyboard::Minus, PASS, s(Keyboard::Kanji1)),    // _
    entry(Keyboard::Semicolon, PASS, n(Keyboard::Apostrophe)),    // :
    entry(Keyboard::Equal, s(Keyboard::Minus), s(Keyboard::Semicolon)), // = +
    entry(Keyboard::LeftBrace, n(Keyboard::RightBrace), s(Keyboard::RightBrace)), // [ {
    entry(Keyboard::RightBrace, n(Keyboard::Backslash), s(Keyboard::Backslash)), // ] }
    entry(Keyboard::Backslash, n(Keyboard::Kanji3), s(Keyboard::Kanji3)), // \ |
    entry(Keyboard::Apostrophe, n(Keyboard::Comma), s(Keyboard::Keyboard2)), // ' "
    entry(Keyboard::Grave, s(Keyboard::LeftBrace), s(Keyboard::Equal)), // ` ~
];

/// Are all of the source keys in the table different.
pub const fn is_unique(entries: &[MappingEntry]) -> bool {
    let mut i = 0;
    while i < entries.len() {
        let mut j = i + 1;
        while j < entries.len() {
            if entries[i].source as u8 == entries[j].source as u8 {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

const _: () = assert!(is_unique(US_TO_JP), "US_TO_JP has a duplicate source key");

/// A validated translation table.
#[derive(Clone, Copy, Debug)]
pub struct Keymap {
    entries: &'static [MappingEntry],
}

impl Keymap {
    /// Build a keymap from a table, checking that it makes sense.
    pub fn new(entries: &'static [MappingEntry]) -> Result<Keymap> {
        for (i, ent) in entries.iter().enumerate() {
            if ent.source == NONE {
                return Err(Error::NoneSource);
            }
            if Mods::is_modifier(ent.source) {
                return Err(Error::ModifierKey(ent.source));
            }
            if let Some(rule) = ent.rules.iter().find(|r| Mods::is_modifier(r.key)) {
                return Err(Error::ModifierKey(rule.key));
            }
            if entries[..i].iter().any(|other| other.source == ent.source) {
                return Err(Error::DuplicateSource(ent.source));
            }
        }
        Ok(Keymap { entries })
    }

    /// The built in US to JIS table.  This was checked when it was compiled.
    pub const fn us_to_jp() -> Keymap {
        Keymap { entries: US_TO_JP }
    }

    /// Find the index of the entry for this source key.
    pub fn lookup(&self, source: Keyboard) -> Option<usize> {
        self.entries.iter().position(|ent| ent.source == source)
    }

    pub fn entry(&self, index: usize) -> Option<&'static MappingEntry> {
        self.entries.get(index)
    }

    /// The rule to use for a source key, given the shift state.
    pub fn rule(&self, source: Keyboard, shifted: bool) -> Option<&'static MappingRule> {
        self.lookup(source)
            .and_then(|index| self.entry(index))
            .map(|ent| ent.rule(shifted))
    }

    pub fn entries(&self) -> &'static [MappingEntry] {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Keymap::us_to_jp()
    }
}
