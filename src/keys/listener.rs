//! Dedicated OS-thread listener draining the X11 event queue.
//!
//! `RustConnection::wait_for_event` is a blocking call, so it lives on its
//! own OS thread.  [`KeyListener`] owns that thread and a stop flag;
//! dropping it sets the flag so further presses are discarded.
//!
//! # Shutdown caveat
//!
//! `wait_for_event` cannot be interrupted.  After the stop flag is set the
//! thread stays blocked until the next X event arrives or the connection
//! closes at process exit.  It holds nothing that needs explicit cleanup;
//! the server drops the grabs together with the connection.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::mpsc;
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use super::{KeyMap, MediaKey};

/// Handle to a running listener thread.
///
/// Construct one with [`KeyListener::start`].  Drop it to stop forwarding
/// events.
pub struct KeyListener {
    stop: Arc<AtomicBool>,
    /// Kept so the thread is not detached prematurely; never joined because
    /// `wait_for_event` may block indefinitely.
    _thread: std::thread::JoinHandle<()>,
}

impl KeyListener {
    /// Spawn the `media-key-listener` thread.
    ///
    /// Each `KeyPress` whose keycode is in `keymap` is sent on `tx` with
    /// `blocking_send`, which is safe from a non-async thread.  The thread
    /// ends when the connection fails or the receiver is dropped; the
    /// daemon notices the closed channel and shuts down.
    pub fn start(
        conn: Arc<RustConnection>,
        keymap: KeyMap,
        tx: mpsc::Sender<MediaKey>,
    ) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("media-key-listener".into())
            .spawn(move || listen(&conn, &keymap, &tx, &stop_clone))?;

        Ok(Self {
            stop,
            _thread: thread,
        })
    }
}

fn listen(
    conn: &RustConnection,
    keymap: &KeyMap,
    tx: &mpsc::Sender<MediaKey>,
    stop: &AtomicBool,
) {
    loop {
        let event = match conn.wait_for_event() {
            Ok(event) => event,
            Err(e) => {
                log::error!("media-key-listener: X connection failed: {e}");
                return;
            }
        };

        if stop.load(Ordering::Relaxed) {
            return;
        }

        if let Some(key) = translate(keymap, &event) {
            log::trace!("media-key-listener: {key} pressed");
            if tx.blocking_send(key).is_err() {
                // Receiver gone: the daemon is shutting down.
                return;
            }
        }
    }
}

/// Map an X event to a media key.  Only presses count; auto-repeat delivers
/// one press per repeat, so holding a key keeps adjusting.
fn translate(keymap: &KeyMap, event: &Event) -> Option<MediaKey> {
    match event {
        Event::KeyPress(ev) => keymap.get(ev.detail),
        _ => None,
    }
}

impl Drop for KeyListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}
