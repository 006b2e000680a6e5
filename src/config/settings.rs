//! Daemon settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`.
//! Every field has a default, so a settings file only needs the keys it
//! changes:
//!
//! ```toml
//! [audio]
//! element = "PCM"
//!
//! [step]
//! coarse_divisor = 10
//! ```

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use x11rb::protocol::xproto::Keysym;

use super::AppPaths;
use crate::adjust::StepPolicy;
use crate::keys::{parse_keysym, KeyError, MediaKey};

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// ALSA mixer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Grab the volume keys and control the mixer.
    pub enabled: bool,
    /// ALSA card name passed to `snd_mixer_attach`.
    pub card: String,
    /// Simple mixer element to control.
    pub element: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            card: "default".into(),
            element: "Master".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// BacklightConfig
// ---------------------------------------------------------------------------

/// RandR backlight settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacklightConfig {
    /// Grab the brightness keys and control the backlight.
    pub enabled: bool,
    /// Output property name.  Older intel drivers used `"BACKLIGHT"`.
    pub property: String,
}

impl Default for BacklightConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            property: "Backlight".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// KeysConfig
// ---------------------------------------------------------------------------

/// Keysym name bound to each media key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    pub raise_volume: String,
    pub lower_volume: String,
    pub mute: String,
    pub brightness_up: String,
    pub brightness_down: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            raise_volume: MediaKey::RaiseVolume.default_keysym_name().into(),
            lower_volume: MediaKey::LowerVolume.default_keysym_name().into(),
            mute: MediaKey::Mute.default_keysym_name().into(),
            brightness_up: MediaKey::BrightnessUp.default_keysym_name().into(),
            brightness_down: MediaKey::BrightnessDown.default_keysym_name().into(),
        }
    }
}

impl KeysConfig {
    pub fn name(&self, key: MediaKey) -> &str {
        match key {
            MediaKey::RaiseVolume => &self.raise_volume,
            MediaKey::LowerVolume => &self.lower_volume,
            MediaKey::Mute => &self.mute,
            MediaKey::BrightnessUp => &self.brightness_up,
            MediaKey::BrightnessDown => &self.brightness_down,
        }
    }

    /// Resolve every binding to a keysym.
    pub fn bindings(&self) -> Result<Vec<(MediaKey, Keysym)>, KeyError> {
        MediaKey::ALL
            .into_iter()
            .map(|key| {
                let name = self.name(key);
                parse_keysym(name)
                    .map(|sym| (key, sym))
                    .ok_or_else(|| KeyError::UnknownKeysym(name.to_string()))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level daemon configuration, serialised as `settings.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub backlight: BacklightConfig,
    pub keys: KeysConfig,
    /// Step ratios shared by volume and brightness.
    pub step: StepPolicy,
}

impl AppConfig {
    /// Load configuration from `~/.config/media-keysd/settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path and validate.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("no settings at {}; using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid settings in {}", path.display()))?;
        Ok(config)
    }

    /// Load a file the user named explicitly.  Unlike [`Self::load_from`],
    /// a missing file is an error rather than a silent fallback to defaults.
    pub fn load_required(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("settings file {} does not exist", path.display());
        }
        Self::load_from(path)
    }

    /// Save to an explicit path, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject settings the daemon cannot act on.
    pub fn validate(&self) -> Result<()> {
        if self.step.coarse_divisor == 0 {
            bail!("step.coarse_divisor must be greater than 0");
        }
        if self.step.fine_divisor == 0 {
            bail!("step.fine_divisor must be greater than 0");
        }
        if self.audio.enabled && self.audio.element.is_empty() {
            bail!("audio.element must not be empty");
        }
        if self.backlight.enabled && self.backlight.property.is_empty() {
            bail!("backlight.property must not be empty");
        }
        self.keys.bindings()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
