//! Master volume and mute through the ALSA simple mixer interface.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use media_keysd::adjust::{nudge, Direction, StepPolicy, Toggle};
//! use media_keysd::audio::Volume;
//!
//! let mut volume = Volume::open("default", "Master").unwrap();
//! let change = nudge(&mut volume, &StepPolicy::default(), Direction::Increase).unwrap();
//! println!("volume {} -> {}", change.from, change.to);
//!
//! let muted = volume.toggle().unwrap();
//! println!("muted: {muted}");
//! ```

pub mod mixer;

pub use mixer::Volume;

use thiserror::Error;

// ---------------------------------------------------------------------------
// AudioError
// ---------------------------------------------------------------------------

/// Errors raised while talking to the ALSA mixer.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Opening, attaching or loading the mixer failed.
    #[error("alsa: opening mixer on card {card:?}: {source}")]
    Open {
        card: String,
        #[source]
        source: alsa::Error,
    },

    /// The named simple element does not exist on the card.
    #[error("alsa: cannot find mixer element {0:?}")]
    ElementNotFound(String),

    /// The element exists but has no playback volume control.
    #[error("alsa: mixer element {0:?} has no playback volume")]
    NoPlaybackVolume(String),

    /// The element exists but has no playback switch (mute).
    #[error("alsa: mixer element {0:?} has no mute")]
    NoPlaybackSwitch(String),

    /// A volume value or range does not fit in 32 bits.
    #[error("alsa: volume value {0} is out of range")]
    OutOfRange(i64),

    /// A mixer read or write failed after opening.
    #[error("alsa: cannot {action}: {source}")]
    Io {
        action: &'static str,
        #[source]
        source: alsa::Error,
    },
}

impl AudioError {
    pub(crate) fn io(action: &'static str) -> impl FnOnce(alsa::Error) -> Self {
        move |source| Self::Io { action, source }
    }
}

/// Narrow an ALSA `long` to the adjuster's 32-bit domain.
pub(crate) fn to_i32(value: i64) -> Result<i32, AudioError> {
    i32::try_from(value).map_err(|_| AudioError::OutOfRange(value))
}
