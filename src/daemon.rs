//! The dispatch loop: one read-compute-write per media key press.
//!
//! # Architecture
//!
//! ```text
//! KeyListener thread ──MediaKey (mpsc)──▶ Daemon::run()   ← runtime thread
//!                                            │
//!                                            ├─ Raise/LowerVolume → nudge(volume)
//!                                            ├─ Mute              → volume.toggle()
//!                                            └─ Brightness Up/Down→ nudge(each output)
//! ```
//!
//! Presses are handled strictly in arrival order.  A failing device is
//! logged and the daemon keeps running; the next press tries again.

use std::fmt::Display;
use std::future::Future;

use tokio::sync::mpsc;

use crate::adjust::{nudge, Direction, Nudge, Quantity, QuantitySet, StepPolicy, Toggle};
use crate::keys::MediaKey;

/// Owns the controlled devices.  Either may be absent when disabled in the
/// config or unavailable on this machine.
pub struct Daemon<V, B> {
    volume: Option<V>,
    backlight: Option<B>,
    policy: StepPolicy,
}

impl<V, B> Daemon<V, B>
where
    V: Quantity + Toggle,
    <V as Quantity>::Error: Display,
    <V as Toggle>::Error: Display,
    B: QuantitySet,
    B::Error: Display,
{
    pub fn new(volume: Option<V>, backlight: Option<B>, policy: StepPolicy) -> Self {
        Self {
            volume,
            backlight,
            policy,
        }
    }

    /// Consume key presses until `shutdown` completes or the listener hangs
    /// up.
    pub async fn run<F>(&mut self, mut keys: mpsc::Receiver<MediaKey>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("shutting down");
                    break;
                }
                key = keys.recv() => match key {
                    Some(key) => self.handle(key),
                    None => {
                        log::warn!("key listener stopped; exiting");
                        break;
                    }
                },
            }
        }
    }

    /// Apply one key press.
    pub fn handle(&mut self, key: MediaKey) {
        match key {
            MediaKey::RaiseVolume => self.adjust_volume(Direction::Increase),
            MediaKey::LowerVolume => self.adjust_volume(Direction::Decrease),
            MediaKey::Mute => self.toggle_mute(),
            MediaKey::BrightnessUp => self.adjust_brightness(Direction::Increase),
            MediaKey::BrightnessDown => self.adjust_brightness(Direction::Decrease),
        }
    }

    fn adjust_volume(&mut self, direction: Direction) {
        let Some(volume) = self.volume.as_mut() else {
            return;
        };
        match nudge(volume, &self.policy, direction) {
            Ok(change) => log_change("volume", change),
            Err(e) => log::error!("error adjusting volume: {e}"),
        }
    }

    fn toggle_mute(&mut self) {
        let Some(volume) = self.volume.as_mut() else {
            return;
        };
        match volume.toggle() {
            Ok(muted) => log::debug!("{}", if muted { "muted" } else { "unmuted" }),
            Err(e) => log::error!("error toggling mute: {e}"),
        }
    }

    fn adjust_brightness(&mut self, direction: Direction) {
        let Some(backlight) = self.backlight.as_mut() else {
            return;
        };
        let outputs = match backlight.quantities() {
            Ok(outputs) => outputs,
            Err(e) => {
                log::error!("error adjusting brightness: {e}");
                return;
            }
        };
        for mut output in outputs {
            match nudge(&mut output, &self.policy, direction) {
                Ok(change) => log_change("brightness", change),
                Err(e) => log::error!("error adjusting brightness: {e}"),
            }
        }
    }
}

fn log_change(what: &str, change: Nudge) {
    if change.changed() {
        log::debug!("{what} {} -> {}", change.from, change.to);
    } else {
        log::trace!("{what} already at limit ({})", change.from);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjust::quantity::fake::{FakeQuantity, FakeSet};

    type TestDaemon = Daemon<FakeQuantity, FakeSet>;

    fn daemon(volume: &FakeQuantity, outputs: &[FakeQuantity]) -> TestDaemon {
        Daemon::new(
            Some(volume.clone()),
            Some(FakeSet {
                outputs: outputs.to_vec(),
            }),
            StepPolicy::default(),
        )
    }

    #[test]
    fn volume_keys_adjust_volume() {
        let volume = FakeQuantity::new(50, 0, 100);
        let mut d = daemon(&volume, &[]);

        d.handle(MediaKey::RaiseVolume);
        assert_eq!(volume.current(), 55);
        d.handle(MediaKey::LowerVolume);
        d.handle(MediaKey::LowerVolume);
        assert_eq!(volume.current(), 45);
    }

    #[test]
    fn mute_toggles() {
        let volume = FakeQuantity::new(50, 0, 100);
        let mut d = daemon(&volume, &[]);

        d.handle(MediaKey::Mute);
        assert!(volume.inner.borrow().muted);
        d.handle(MediaKey::Mute);
        assert!(!volume.inner.borrow().muted);
        assert_eq!(volume.current(), 50);
    }

    #[test]
    fn brightness_keys_adjust_every_output() {
        let volume = FakeQuantity::new(50, 0, 100);
        let laptop = FakeQuantity::new(2000, 0, 4882);
        let zero_range = FakeQuantity::new(0, 0, 0);
        let mut d = daemon(&volume, &[laptop.clone(), zero_range.clone()]);

        d.handle(MediaKey::BrightnessUp);
        assert_eq!(laptop.current(), 2244);
        assert_eq!(zero_range.writes(), 0);

        d.handle(MediaKey::BrightnessDown);
        assert_eq!(laptop.current(), 2000);
        assert_eq!(volume.writes(), 0);
    }

    #[test]
    fn failing_device_does_not_stop_others() {
        let volume = FakeQuantity::new(50, 0, 100);
        let broken = FakeQuantity::new(10, 0, 100);
        broken.set_failing(true);
        let working = FakeQuantity::new(50, 0, 100);
        let mut d = daemon(&volume, &[broken.clone(), working.clone()]);

        d.handle(MediaKey::BrightnessUp);
        assert_eq!(broken.writes(), 0);
        assert_eq!(working.current(), 55);

        volume.set_failing(true);
        d.handle(MediaKey::RaiseVolume);
        d.handle(MediaKey::Mute);
        assert_eq!(volume.current(), 50);
    }

    #[test]
    fn missing_devices_are_ignored() {
        let mut d: TestDaemon = Daemon::new(None, None, StepPolicy::default());
        for key in MediaKey::ALL {
            d.handle(key);
        }
    }

    #[tokio::test]
    async fn run_processes_keys_until_channel_closes() {
        let volume = FakeQuantity::new(0, 0, 100);
        let mut d = daemon(&volume, &[]);
        let (tx, rx) = mpsc::channel(8);

        for _ in 0..3 {
            tx.send(MediaKey::RaiseVolume).await.unwrap();
        }
        drop(tx);

        d.run(rx, std::future::pending()).await;
        assert_eq!(volume.current(), 3);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let volume = FakeQuantity::new(50, 0, 100);
        let mut d = daemon(&volume, &[]);
        let (_tx, rx) = mpsc::channel::<MediaKey>(8);

        d.run(rx, async {}).await;
        assert_eq!(volume.writes(), 0);
    }
}
