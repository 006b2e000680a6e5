//! Display backlight through the RandR `Backlight` output property.
//!
//! # Protocol
//!
//! ```text
//! InternAtom("Backlight", only_if_exists)  ── once, at startup
//!
//! per key press:
//!   GetScreenResources(root) ──▶ outputs
//!   for each output:
//!     QueryOutputProperty  ──▶ range [min, max]   (BadName → no backlight, skip)
//!     GetOutputProperty    ──▶ INTEGER/32, 1 item (current)
//!     ChangeOutputProperty ◀── next
//! ```
//!
//! Outputs are re-enumerated on every press so hot-plugged displays are
//! picked up without restarting the daemon.

use std::sync::Arc;

use thiserror::Error;
use x11rb::connection::Connection;
use x11rb::errors::{ConnectionError, ReplyError};
use x11rb::protocol::randr::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{Atom, AtomEnum, ConnectionExt as _, PropMode, Window};
use x11rb::protocol::ErrorKind;
use x11rb::rust_connection::RustConnection;

use crate::adjust::{Quantity, QuantitySet, Reading};

// ---------------------------------------------------------------------------
// BacklightError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum BacklightError {
    #[error("x11: {0}")]
    Connection(#[from] ConnectionError),

    #[error("randr: {action}: {source}")]
    Request {
        action: &'static str,
        #[source]
        source: ReplyError,
    },

    #[error("backlight brightness range not specified")]
    NotARange,

    #[error("expected backlight min and max, got: {0:?}")]
    BadRange(Vec<i32>),

    #[error("output {0} no longer has a backlight property")]
    Vanished(randr::Output),

    #[error("backlight property value looks wrong (type {type_}, format {format}, {num_items} items)")]
    BadValue { type_: Atom, format: u8, num_items: u32 },
}

impl BacklightError {
    fn request(action: &'static str) -> impl FnOnce(ReplyError) -> Self {
        move |source| Self::Request { action, source }
    }
}

// ---------------------------------------------------------------------------
// Backlight
// ---------------------------------------------------------------------------

/// Backlight control for every output of the default screen.
pub struct Backlight {
    conn: Arc<RustConnection>,
    root: Window,
    property: Atom,
}

impl Backlight {
    /// Look up the backlight property atom.
    ///
    /// Returns `Ok(None)` when the X server has never heard of `property`,
    /// which means no output driver exposes a backlight at all.
    pub fn new(
        conn: Arc<RustConnection>,
        screen_num: usize,
        property: &str,
    ) -> Result<Option<Self>, BacklightError> {
        let root = conn.setup().roots[screen_num].root;

        conn.randr_query_version(1, 2)?
            .reply()
            .map_err(BacklightError::request("query version"))?;

        let atom = conn
            .intern_atom(true, property.as_bytes())?
            .reply()
            .map_err(BacklightError::request("intern backlight atom"))?
            .atom;

        if atom == u32::from(AtomEnum::NONE) {
            return Ok(None);
        }

        Ok(Some(Self {
            conn,
            root,
            property: atom,
        }))
    }
}

impl QuantitySet for Backlight {
    type Item = OutputBacklight;
    type Error = BacklightError;

    /// Outputs that currently expose the backlight property, each already
    /// read once.  Outputs without one (external monitors) are left out.
    fn quantities(&mut self) -> Result<Vec<OutputBacklight>, BacklightError> {
        let resources = self
            .conn
            .randr_get_screen_resources(self.root)?
            .reply()
            .map_err(BacklightError::request("getting screen"))?;

        let queried = resources
            .outputs
            .into_iter()
            .map(|output| (output, query_reading(&self.conn, output, self.property)));

        Ok(with_backlight(queried)
            .into_iter()
            .map(|(output, reading)| OutputBacklight {
                conn: Arc::clone(&self.conn),
                output,
                property: self.property,
                pending: Some(reading),
            })
            .collect())
    }
}

/// Keep the outputs whose query found a backlight.  A failing output is
/// logged and dropped so the remaining ones are still adjusted.
fn with_backlight<I>(queried: I) -> Vec<(randr::Output, Reading)>
where
    I: IntoIterator<Item = (randr::Output, Result<Option<Reading>, BacklightError>)>,
{
    queried
        .into_iter()
        .filter_map(|(output, result)| match result {
            Ok(Some(reading)) => Some((output, reading)),
            Ok(None) => None,
            Err(e) => {
                log::error!("error reading backlight of output {output}: {e}");
                None
            }
        })
        .collect()
}

/// Read the backlight of `output`, or `Ok(None)` if it has none.
fn query_reading(
    conn: &RustConnection,
    output: randr::Output,
    property: Atom,
) -> Result<Option<Reading>, BacklightError> {
    let query = match conn.randr_query_output_property(output, property)?.reply() {
        Ok(query) => query,
        Err(e) if is_bad_name(&e) => return Ok(None),
        Err(e) => return Err(BacklightError::request("query backlight")(e)),
    };
    let (min, max) = parse_range(query.range, &query.valid_values)?;

    let value = conn
        .randr_get_output_property(output, property, AtomEnum::ANY, 0, 4, false, false)?
        .reply()
        .map_err(BacklightError::request("get backlight property"))?;
    let current = parse_value(value.type_, value.format, value.num_items, &value.data)?;

    // Some drivers report a stale value past the advertised range.
    Ok(Some(Reading::new(current.clamp(min, max), min, max)))
}

// ---------------------------------------------------------------------------
// OutputBacklight
// ---------------------------------------------------------------------------

/// The backlight property of one RandR output.
pub struct OutputBacklight {
    conn: Arc<RustConnection>,
    output: randr::Output,
    property: Atom,
    /// Reading taken while enumerating, consumed by the first `read`.
    pending: Option<Reading>,
}

impl Quantity for OutputBacklight {
    type Error = BacklightError;

    fn read(&mut self) -> Result<Reading, BacklightError> {
        if let Some(reading) = self.pending.take() {
            return Ok(reading);
        }
        query_reading(&self.conn, self.output, self.property)?
            .ok_or(BacklightError::Vanished(self.output))
    }

    fn write(&mut self, value: i32) -> Result<(), BacklightError> {
        let data = value.to_ne_bytes();
        self.conn
            .randr_change_output_property(
                self.output,
                self.property,
                AtomEnum::INTEGER.into(),
                32,
                PropMode::REPLACE,
                1,
                &data,
            )?
            .check()
            .map_err(BacklightError::request("set backlight property"))
    }
}

fn is_bad_name(err: &ReplyError) -> bool {
    matches!(err, ReplyError::X11Error(e) if e.error_kind == ErrorKind::Name)
}

/// Validate a QueryOutputProperty reply as a `[min, max]` range.
fn parse_range(is_range: bool, valid_values: &[i32]) -> Result<(i32, i32), BacklightError> {
    if !is_range {
        return Err(BacklightError::NotARange);
    }
    match *valid_values {
        [min, max] if min <= max => Ok((min, max)),
        _ => Err(BacklightError::BadRange(valid_values.to_vec())),
    }
}

/// Decode a GetOutputProperty reply holding one 32-bit INTEGER.
///
/// The server sends property data in the client's byte order.
fn parse_value(type_: Atom, format: u8, num_items: u32, data: &[u8]) -> Result<i32, BacklightError> {
    let bad = || BacklightError::BadValue {
        type_,
        format,
        num_items,
    };
    if type_ != u32::from(AtomEnum::INTEGER) || format != 32 || num_items != 1 {
        return Err(bad());
    }
    let bytes: [u8; 4] = data.get(..4).and_then(|b| b.try_into().ok()).ok_or_else(bad)?;
    Ok(i32::from_ne_bytes(bytes))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
