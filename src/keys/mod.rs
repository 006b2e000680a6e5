//! Media keys: names, X11 grabs and the listener thread.
//!
//! # Design
//!
//! The X server delivers grabbed key presses on the connection's event
//! queue.  `wait_for_event` blocks, so [`KeyListener::start`] drains that
//! queue on a **dedicated OS thread** and forwards each recognised press as
//! a [`MediaKey`] over a `tokio::sync::mpsc` channel.  The daemon consumes
//! the channel on the runtime thread, which serialises all adjustments.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use media_keysd::config::KeysConfig;
//! use media_keysd::keys::{KeyGrabber, KeyListener};
//!
//! let (conn, screen) = x11rb::connect(None).unwrap();
//! let conn = Arc::new(conn);
//! let bindings = KeysConfig::default().bindings().unwrap();
//! let keymap = KeyGrabber::new(&*conn, screen).grab(&bindings).unwrap();
//!
//! let (tx, mut rx) = mpsc::channel(16);
//! let _listener = KeyListener::start(conn, keymap, tx);
//! // while let Some(key) = rx.recv().await { ... }
//! ```

pub mod grab;
pub mod listener;

pub use grab::{KeyGrabber, KeyMap, KeyboardMapping};
pub use listener::KeyListener;

use std::fmt;

use thiserror::Error;
use x11rb::errors::{ConnectionError, ReplyError};
use x11rb::protocol::xproto::Keysym;

// ---------------------------------------------------------------------------
// MediaKey
// ---------------------------------------------------------------------------

/// The keys the daemon reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKey {
    RaiseVolume,
    LowerVolume,
    Mute,
    BrightnessUp,
    BrightnessDown,
}

impl MediaKey {
    pub const ALL: [MediaKey; 5] = [
        MediaKey::RaiseVolume,
        MediaKey::LowerVolume,
        MediaKey::Mute,
        MediaKey::BrightnessUp,
        MediaKey::BrightnessDown,
    ];

    /// The keysym name bound to this key by default.
    pub fn default_keysym_name(self) -> &'static str {
        match self {
            MediaKey::RaiseVolume => "XF86AudioRaiseVolume",
            MediaKey::LowerVolume => "XF86AudioLowerVolume",
            MediaKey::Mute => "XF86AudioMute",
            MediaKey::BrightnessUp => "XF86MonBrightnessUp",
            MediaKey::BrightnessDown => "XF86MonBrightnessDown",
        }
    }

    pub fn is_audio(self) -> bool {
        matches!(
            self,
            MediaKey::RaiseVolume | MediaKey::LowerVolume | MediaKey::Mute
        )
    }
}

impl fmt::Display for MediaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_keysym_name())
    }
}

// ---------------------------------------------------------------------------
// KeyError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("unknown keysym name {0:?}")]
    UnknownKeysym(String),

    #[error("x11: {0}")]
    Connection(#[from] ConnectionError),

    #[error("x11: reading keyboard mapping: {0}")]
    Mapping(#[source] ReplyError),

    /// Usually `BadAccess`: another client already grabbed the key.
    #[error("x11: cannot grab {key} (keycode {keycode}): {source}")]
    Grab {
        key: MediaKey,
        keycode: u8,
        #[source]
        source: ReplyError,
    },
}

// ---------------------------------------------------------------------------
// parse_keysym
// ---------------------------------------------------------------------------

/// Parse an X11 keysym name into its numeric value.
///
/// Supports the XF86 multimedia keysyms this daemon can act on, a few
/// related ones users commonly rebind to, and raw hex values (`"0x1008FF13"`).
///
/// # Examples
///
/// ```
/// use media_keysd::keys::parse_keysym;
///
/// assert_eq!(parse_keysym("XF86AudioRaiseVolume"), Some(0x1008_FF13));
/// assert_eq!(parse_keysym("0x1008ff12"),           Some(0x1008_FF12));
/// assert_eq!(parse_keysym("xyz"),                  None);
/// ```
pub fn parse_keysym(name: &str) -> Option<Keysym> {
    match name {
        // Audio
        "XF86AudioLowerVolume" => Some(0x1008_FF11),
        "XF86AudioMute" => Some(0x1008_FF12),
        "XF86AudioRaiseVolume" => Some(0x1008_FF13),
        "XF86AudioPlay" => Some(0x1008_FF14),
        "XF86AudioStop" => Some(0x1008_FF15),
        "XF86AudioPrev" => Some(0x1008_FF16),
        "XF86AudioNext" => Some(0x1008_FF17),
        "XF86AudioMicMute" => Some(0x1008_FFB2),

        // Display
        "XF86MonBrightnessUp" => Some(0x1008_FF02),
        "XF86MonBrightnessDown" => Some(0x1008_FF03),
        "XF86KbdBrightnessUp" => Some(0x1008_FF05),
        "XF86KbdBrightnessDown" => Some(0x1008_FF06),

        // Function keys, for keyboards without media keys
        "F1" => Some(0xFFBE),
        "F2" => Some(0xFFBF),
        "F3" => Some(0xFFC0),
        "F4" => Some(0xFFC1),
        "F5" => Some(0xFFC2),
        "F6" => Some(0xFFC3),
        "F7" => Some(0xFFC4),
        "F8" => Some(0xFFC5),
        "F9" => Some(0xFFC6),
        "F10" => Some(0xFFC7),
        "F11" => Some(0xFFC8),
        "F12" => Some(0xFFC9),

        _ => parse_hex(name),
    }
}

fn parse_hex(name: &str) -> Option<Keysym> {
    let digits = name
        .strip_prefix("0x")
        .or_else(|| name.strip_prefix("0X"))?;
    Keysym::from_str_radix(digits, 16).ok().filter(|&k| k != 0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
