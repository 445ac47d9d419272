//! Device matcher
//!
//! Resolves an attach selector against a registry snapshot. Matching is a
//! pure function of `(snapshot, selector)`: identical inputs always produce
//! identical outcomes, including the first-candidate tie-break order.

use protocol::{AttachArgs, BusId, BusIdParseError, DeviceDescriptor};
use thiserror::Error;

/// Result of resolving a selector against a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// No device satisfies the selector
    NoMatch,
    /// Exactly one device matched (or the first of several, when requested)
    One(DeviceDescriptor),
    /// Several devices matched and no tie-break was requested
    Ambiguous(Vec<DeviceDescriptor>),
}

/// Selector validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    /// No selector field was supplied; an empty selector never matches
    /// the whole registry
    #[error("invalid selector: no selector fields supplied")]
    Empty,

    /// `id` was not a `vvvv:pppp` hex pair
    #[error("invalid selector: bad id {0:?} (expected vendor:product hex)")]
    BadId(String),

    /// `bus` was not a parseable bus id
    #[error("invalid selector: bad bus id {0:?}: {1}")]
    BadBusId(String, BusIdParseError),
}

/// Validated attach selector
///
/// A candidate must satisfy every supplied field (conjunction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// Exact vendor/product pair
    pub id: Option<(u16, u16)>,
    /// Exact bus id
    pub bus: Option<BusId>,
    /// Exact serial number
    pub serial: Option<String>,
    /// Case-insensitive description substring, stored lowercased
    pub description: Option<String>,
}

impl Selector {
    /// Validate and normalize the wire-level selector fields
    pub fn parse(args: &AttachArgs) -> Result<Self, SelectorError> {
        if args.is_empty() {
            return Err(SelectorError::Empty);
        }

        let id = args
            .id
            .as_deref()
            .map(parse_usb_id)
            .transpose()?;

        let bus = args
            .bus
            .as_deref()
            .map(|s| {
                s.parse::<BusId>()
                    .map_err(|e| SelectorError::BadBusId(s.to_string(), e))
            })
            .transpose()?;

        Ok(Self {
            id,
            bus,
            serial: args.serial.clone(),
            description: args.description.as_deref().map(str::to_lowercase),
        })
    }

    /// True when the device satisfies every supplied field
    fn matches(&self, device: &DeviceDescriptor) -> bool {
        if let Some((vendor, product)) = self.id
            && (device.vendor_id != vendor || device.product_id != product)
        {
            return false;
        }
        if let Some(ref bus) = self.bus
            && device.bus_id != *bus
        {
            return false;
        }
        if let Some(ref serial) = self.serial
            && device.serial != *serial
        {
            return false;
        }
        if let Some(ref needle) = self.description
            && !device.description.to_lowercase().contains(needle)
        {
            return false;
        }
        true
    }
}

/// Parse a `vendor:product` hex pair, case-insensitive
fn parse_usb_id(id: &str) -> Result<(u16, u16), SelectorError> {
    let bad = || SelectorError::BadId(id.to_string());
    let (vendor_str, product_str) = id.split_once(':').ok_or_else(bad)?;
    let vendor = u16::from_str_radix(vendor_str, 16).map_err(|_| bad())?;
    let product = u16::from_str_radix(product_str, 16).map_err(|_| bad())?;
    Ok((vendor, product))
}

/// Resolve a selector against a snapshot
///
/// With more than one surviving candidate the outcome is `Ambiguous`,
/// unless `prefer_first` is set, in which case the first candidate in the
/// snapshot's enumeration order wins deterministically.
pub fn match_devices(
    snapshot: &[DeviceDescriptor],
    selector: &Selector,
    prefer_first: bool,
) -> MatchOutcome {
    let mut candidates: Vec<DeviceDescriptor> = snapshot
        .iter()
        .filter(|device| selector.matches(device))
        .cloned()
        .collect();

    match candidates.len() {
        0 => MatchOutcome::NoMatch,
        1 => MatchOutcome::One(candidates.remove(0)),
        _ if prefer_first => MatchOutcome::One(candidates.remove(0)),
        _ => MatchOutcome::Ambiguous(candidates),
    }
}
