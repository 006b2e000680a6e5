//! media-keysd: reacts to X11 media keys by adjusting the ALSA master
//! volume and the RandR display backlight.
//!
//! # Modules
//!
//! | Module      | Role                                                  |
//! |-------------|-------------------------------------------------------|
//! | `adjust`    | bounded step arithmetic and the `Quantity` capability |
//! | `audio`     | ALSA master volume + mute                             |
//! | `backlight` | RandR `Backlight` output property                     |
//! | `keys`      | keysym parsing, root-window grabs, listener thread    |
//! | `daemon`    | dispatches key presses to the devices                 |
//! | `config`    | `settings.toml` loading and validation                |

pub mod adjust;
pub mod audio;
pub mod backlight;
pub mod config;
pub mod daemon;
pub mod keys;
