//! ALSA master volume handle.
//!
//! [`Volume`] owns the mixer for the lifetime of the daemon.  The simple
//! element is looked up again for every operation because `Selem` borrows
//! the mixer; the lookup is a list walk over a handful of elements.
//!
//! `alsa::mixer::Mixer` is not `Send`, so a `Volume` stays on the thread
//! that opened it.  The daemon's current-thread runtime guarantees that.

use alsa::mixer::{Mixer, Selem, SelemChannelId, SelemId};
use alsa::poll::{Descriptors, Flags};

use super::{to_i32, AudioError};
use crate::adjust::{Quantity, Reading, Toggle};

/// Channel used for reading volume and mute state.
const CHANNEL: SelemChannelId = SelemChannelId::FrontLeft;

pub struct Volume {
    mixer: Mixer,
    id: SelemId,
    element: String,
    min: i32,
    max: i32,
}

impl Volume {
    /// Open `card` and locate the simple element `element`.
    ///
    /// Fails unless the element has both a playback volume and a playback
    /// switch.  The volume range is read once here.
    pub fn open(card: &str, element: &str) -> Result<Self, AudioError> {
        let mixer = Mixer::new(card, false).map_err(|source| AudioError::Open {
            card: card.to_string(),
            source,
        })?;
        let id = SelemId::new(element, 0);

        let (min, max) = {
            let selem = mixer
                .find_selem(&id)
                .ok_or_else(|| AudioError::ElementNotFound(element.to_string()))?;

            if !selem.has_playback_volume() {
                return Err(AudioError::NoPlaybackVolume(element.to_string()));
            }
            let (min, max) = selem.get_playback_volume_range();

            if !selem.has_playback_switch() {
                return Err(AudioError::NoPlaybackSwitch(element.to_string()));
            }
            (to_i32(min)?, to_i32(max)?)
        };

        log::debug!("alsa: {card}/{element} volume range {min}..={max}");

        Ok(Self {
            mixer,
            id,
            element: element.to_string(),
            min,
            max,
        })
    }

    pub fn element(&self) -> &str {
        &self.element
    }

    fn selem(&self) -> Result<Selem<'_>, AudioError> {
        self.mixer
            .find_selem(&self.id)
            .ok_or_else(|| AudioError::ElementNotFound(self.element.clone()))
    }

    /// Pull in changes made by other clients (alsamixer, pavucontrol, ...)
    /// so reads see the live value rather than the one cached at load.
    ///
    /// The control device is opened blocking, so `handle_events` is only
    /// called once a zero-timeout poll says events are queued.
    fn refresh(&self) -> Result<(), AudioError> {
        let pending =
            events_pending(&self.mixer).map_err(AudioError::io("poll mixer events"))?;
        if pending {
            self.mixer
                .handle_events()
                .map_err(AudioError::io("refresh mixer state"))?;
        }
        Ok(())
    }
}

impl Quantity for Volume {
    type Error = AudioError;

    fn read(&mut self) -> Result<Reading, AudioError> {
        self.refresh()?;
        let current = self
            .selem()?
            .get_playback_volume(CHANNEL)
            .map_err(AudioError::io("get volume"))?;

        // Clamp in case the hardware reports a value outside its own range.
        let current = to_i32(current)?.clamp(self.min, self.max);
        Ok(Reading::new(current, self.min, self.max))
    }

    fn write(&mut self, value: i32) -> Result<(), AudioError> {
        self.selem()?
            .set_playback_volume(CHANNEL, i64::from(value))
            .map_err(AudioError::io("set volume"))
    }
}

impl Toggle for Volume {
    type Error = AudioError;

    /// Flip mute based on the first channel and apply it to every channel.
    ///
    /// PulseAudio mutes sibling elements (Speaker, Headphone) when Master is
    /// muted and does not unmute them again; setting all channels of Master
    /// at once keeps the channels consistent.  Returns `true` when muted.
    fn toggle(&mut self) -> Result<bool, AudioError> {
        self.refresh()?;
        let selem = self.selem()?;

        // The switch is "on" (1) when audio plays, i.e. 0 means muted.
        let playing = selem
            .get_playback_switch(CHANNEL)
            .map_err(AudioError::io("get mute status"))?;
        let next = flip_switch(playing);

        selem
            .set_playback_switch_all(next)
            .map_err(AudioError::io("set mute"))?;

        Ok(next == 0)
    }
}

/// Non-blocking check for readable events on `source`'s descriptors.
fn events_pending<D: Descriptors>(source: &D) -> alsa::Result<bool> {
    let mut fds = source.get()?;
    if fds.is_empty() || alsa::poll::poll(&mut fds, 0)? == 0 {
        return Ok(false);
    }
    Ok(source.revents(&fds)?.contains(Flags::IN))
}

/// Next playback switch value: 0 (muted) becomes 1, anything else 0.
fn flip_switch(playing: i32) -> i32 {
    if playing == 0 {
        1
    } else {
        0
    }
}
