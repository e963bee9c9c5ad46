//! # Slot Model
//!
//! A [`Slot`] is a half-open interval `[start, end)` inside one calendar day,
//! held as minutes since midnight. On the wire a slot is the string
//! `"HH:MM-HH:MM"`, the same form the booking form and the stored
//! bookings use.
//!
//! Two slots conflict only when they share time: `09:00-10:00` and
//! `10:00-11:00` touch at a boundary and do not conflict.
//!
//! A [`SlotSet`] is the normalized slot list of one booking: non-empty,
//! sorted by start and pairwise disjoint.

use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{BookingError, BookingResult};

/// Minutes in a calendar day; also the only valid value for a `24:00` end bound.
pub const MINUTES_PER_DAY: u16 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot {
    start: u16,
    end: u16,
}

impl Slot {
    /// Builds a slot from minute offsets, rejecting empty or inverted intervals.
    pub fn new(start: u16, end: u16) -> BookingResult<Self> {
        if end > MINUTES_PER_DAY {
            return Err(BookingError::MalformedSlot(format!(
                "{} ends after midnight",
                Slot { start, end }
            )));
        }
        if start >= end {
            return Err(BookingError::MalformedSlot(format!(
                "{} must start before it ends",
                Slot { start, end }
            )));
        }
        Ok(Self { start, end })
    }

    /// Parses `"HH:MM-HH:MM"`, optionally enforcing operating hours.
    pub fn parse(raw: &str, hours: Option<&OperatingHours>) -> BookingResult<Self> {
        let slot: Slot = raw.parse()?;
        if let Some(hours) = hours {
            if !hours.contains(&slot) {
                return Err(BookingError::MalformedSlot(format!(
                    "{} is outside operating hours {}",
                    slot, hours
                )));
            }
        }
        Ok(slot)
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn end(&self) -> u16 {
        self.end
    }

    pub fn duration_minutes(&self) -> u16 {
        self.end - self.start
    }

    /// Nonzero-measure intersection. Touching endpoints do not overlap.
    pub fn overlaps(&self, other: &Slot) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}-{:02}:{:02}",
            self.start / 60,
            self.start % 60,
            self.end / 60,
            self.end % 60
        )
    }
}

impl FromStr for Slot {
    type Err = BookingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let malformed = || BookingError::MalformedSlot(format!("'{}' is not an HH:MM-HH:MM interval", raw));

        let (start, end) = raw.trim().split_once('-').ok_or_else(malformed)?;
        let start = parse_clock(start, false).ok_or_else(malformed)?;
        let end = parse_clock(end, true).ok_or_else(malformed)?;

        Slot::new(start, end)
    }
}

/// Parses `H:MM` or `HH:MM`. `24:00` is only accepted as an end bound.
fn parse_clock(raw: &str, end_bound: bool) -> Option<u16> {
    let (hours, minutes) = raw.trim().split_once(':')?;
    if hours.is_empty() || hours.len() > 2 || minutes.len() != 2 {
        return None;
    }
    if !hours.bytes().chain(minutes.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let hours: u16 = hours.parse().ok()?;
    let minutes: u16 = minutes.parse().ok()?;

    match (hours, minutes) {
        (24, 0) if end_bound => Some(MINUTES_PER_DAY),
        (h, m) if h < 24 && m < 60 => Some(h * 60 + m),
        _ => None,
    }
}

impl Serialize for Slot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Slot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The window of the day during which slots may be booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingHours(Slot);

impl OperatingHours {
    pub fn new(open: Slot) -> Self {
        Self(open)
    }

    pub fn contains(&self, slot: &Slot) -> bool {
        self.0.start <= slot.start && slot.end <= self.0.end
    }
}

impl fmt::Display for OperatingHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for OperatingHours {
    type Err = BookingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        raw.parse().map(OperatingHours)
    }
}

/// Normalized slots of a single booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Slot>", into = "Vec<Slot>")]
pub struct SlotSet(Vec<Slot>);

impl SlotSet {
    /// Sorts the slots and rejects empty or self-overlapping requests.
    pub fn normalize(mut slots: Vec<Slot>) -> BookingResult<Self> {
        if slots.is_empty() {
            return Err(BookingError::Validation(
                "At least one time slot is required".to_string(),
            ));
        }

        slots.sort();
        if let Some(pair) = slots.windows(2).find(|pair| pair[0].overlaps(&pair[1])) {
            return Err(BookingError::OverlappingSlotsInRequest {
                first: pair[0],
                second: pair[1],
            });
        }

        Ok(Self(slots))
    }

    /// Parses every raw slot, then normalizes the result.
    pub fn parse_all<I, S>(raw: I, hours: Option<&OperatingHours>) -> BookingResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let slots = raw
            .into_iter()
            .map(|slot| Slot::parse(slot.as_ref(), hours))
            .collect::<BookingResult<Vec<_>>>()?;

        Self::normalize(slots)
    }

    pub fn as_slice(&self) -> &[Slot] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Slot> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total_minutes(&self) -> u32 {
        self.0.iter().map(|slot| u32::from(slot.duration_minutes())).sum()
    }

    /// Covered time in hours. Minutes are integral, so the only rounding is
    /// the final division, carried at full decimal precision.
    pub fn total_hours(&self) -> Decimal {
        Decimal::from(self.total_minutes()) / Decimal::from(60)
    }
}

impl TryFrom<Vec<Slot>> for SlotSet {
    type Error = BookingError;

    fn try_from(slots: Vec<Slot>) -> Result<Self, Self::Error> {
        Self::normalize(slots)
    }
}

impl From<SlotSet> for Vec<Slot> {
    fn from(set: SlotSet) -> Self {
        set.0
    }
}

impl<'a> IntoIterator for &'a SlotSet {
    type Item = &'a Slot;
    type IntoIter = std::slice::Iter<'a, Slot>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
