//! Passive key grabs on the root window.

use std::collections::HashMap;

use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt as _, GrabMode, Keycode, Keysym, ModMask, Window};

use super::{KeyError, MediaKey};

// ---------------------------------------------------------------------------
// KeyboardMapping
// ---------------------------------------------------------------------------

/// The server's keycode → keysyms table.
#[derive(Debug, Clone)]
pub struct KeyboardMapping {
    min_keycode: Keycode,
    keysyms_per_keycode: u8,
    keysyms: Vec<Keysym>,
}

impl KeyboardMapping {
    pub fn new(min_keycode: Keycode, keysyms_per_keycode: u8, keysyms: Vec<Keysym>) -> Self {
        Self {
            min_keycode,
            keysyms_per_keycode,
            keysyms,
        }
    }

    /// Fetch the full mapping from the server.
    pub fn query<C: Connection>(conn: &C) -> Result<Self, KeyError> {
        let setup = conn.setup();
        let (min, max) = (setup.min_keycode, setup.max_keycode);
        let reply = conn
            .get_keyboard_mapping(min, max - min + 1)?
            .reply()
            .map_err(KeyError::Mapping)?;

        Ok(Self::new(min, reply.keysyms_per_keycode, reply.keysyms))
    }

    /// Every keycode that produces `keysym` at any shift level.
    ///
    /// A keysym can sit on several keycodes (e.g. a laptop's Fn row and an
    /// external keyboard's dedicated key).
    pub fn keycodes_for(&self, keysym: Keysym) -> Vec<Keycode> {
        if self.keysyms_per_keycode == 0 {
            return Vec::new();
        }
        self.keysyms
            .chunks(usize::from(self.keysyms_per_keycode))
            .enumerate()
            .filter(|(_, syms)| syms.contains(&keysym))
            .filter_map(|(i, _)| {
                u8::try_from(i)
                    .ok()
                    .and_then(|i| self.min_keycode.checked_add(i))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// KeyMap
// ---------------------------------------------------------------------------

/// Grabbed keycodes and the media key each one triggers.
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    codes: HashMap<Keycode, MediaKey>,
}

impl KeyMap {
    /// Resolve `bindings` against `mapping`.  Keysyms missing from the
    /// keyboard are logged and skipped.
    pub fn resolve(mapping: &KeyboardMapping, bindings: &[(MediaKey, Keysym)]) -> Self {
        let mut codes = HashMap::new();
        for &(key, keysym) in bindings {
            let keycodes = mapping.keycodes_for(keysym);
            if keycodes.is_empty() {
                log::warn!("no keycode produces keysym {keysym:#x} for {key}; not grabbing it");
                continue;
            }
            for code in keycodes {
                if let Some(previous) = codes.insert(code, key) {
                    log::warn!("keycode {code} bound to both {previous} and {key}; using {key}");
                }
            }
        }
        Self { codes }
    }

    pub fn get(&self, keycode: Keycode) -> Option<MediaKey> {
        self.codes.get(&keycode).copied()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Keycode, MediaKey)> + '_ {
        self.codes.iter().map(|(&code, &key)| (code, key))
    }
}

// ---------------------------------------------------------------------------
// KeyGrabber
// ---------------------------------------------------------------------------

/// Modifier combinations grabbed for each key, so presses still arrive with
/// CapsLock or NumLock engaged.
pub fn lock_modifier_combinations() -> [ModMask; 4] {
    [
        ModMask::from(0u16),
        ModMask::LOCK,
        ModMask::M2,
        ModMask::LOCK | ModMask::M2,
    ]
}

pub struct KeyGrabber<'c, C: Connection> {
    conn: &'c C,
    root: Window,
}

impl<'c, C: Connection> KeyGrabber<'c, C> {
    pub fn new(conn: &'c C, screen_num: usize) -> Self {
        let root = conn.setup().roots[screen_num].root;
        Self { conn, root }
    }

    /// Grab every binding on the root window and return the resulting map.
    ///
    /// Fails if any grab is refused, typically because a desktop
    /// environment's own media-key handler is already running.
    pub fn grab(&self, bindings: &[(MediaKey, Keysym)]) -> Result<KeyMap, KeyError> {
        let mapping = KeyboardMapping::query(self.conn)?;
        let keymap = KeyMap::resolve(&mapping, bindings);

        for (keycode, key) in keymap.iter() {
            for modifiers in lock_modifier_combinations() {
                self.conn
                    .grab_key(
                        true,
                        self.root,
                        modifiers,
                        keycode,
                        GrabMode::ASYNC,
                        GrabMode::ASYNC,
                    )?
                    .check()
                    .map_err(|source| KeyError::Grab {
                        key,
                        keycode,
                        source,
                    })?;
            }
            log::debug!("grabbed {key} on keycode {keycode}");
        }

        Ok(keymap)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
