//! Scale conversions between raw bitfield storage and display values.
//!
//! Attributes map onto the familiar 25-99 scale. Observation of the game
//! puts the internal ceiling at 110 even though the UI caps at 99, so the
//! proportional mapping runs 25..110 and display values are clamped after
//! the fact. These constants were derived empirically against one game
//! build and may need recalibration for another; keep the asymmetry as-is.
//!
//! Tendencies are a plain proportional 0-100 scale with no floor.

/// Lowest rating the game displays.
pub const RATING_FLOOR: u32 = 25;
/// Highest rating the UI shows.
pub const RATING_DISPLAY_CAP: u32 = 99;
/// Internal ceiling the raw range maps onto.
pub const RATING_TRUE_CAP: u32 = 110;

/// Largest raw value a field of `length` bits can hold.
pub fn max_raw(length: u32) -> u64 {
    if length >= 64 {
        u64::MAX
    } else {
        (1u64 << length) - 1
    }
}

/// Map a raw bitfield value onto the 25-99 display scale.
pub fn raw_to_rating(raw: u64, length: u32) -> u32 {
    let max_raw = max_raw(length);
    if max_raw == 0 {
        return RATING_FLOOR;
    }
    let span = (RATING_TRUE_CAP - RATING_FLOOR) as f64;
    let rating = RATING_FLOOR as f64 + (raw as f64 / max_raw as f64) * span;
    (rating.round() as u32).clamp(RATING_FLOOR, RATING_DISPLAY_CAP)
}

/// Map a 25-99 rating back into the raw range of a `length`-bit field.
pub fn rating_to_raw(rating: f64, length: u32) -> u64 {
    let max_raw = max_raw(length);
    if max_raw == 0 {
        return 0;
    }
    let rating = rating.clamp(RATING_FLOOR as f64, RATING_DISPLAY_CAP as f64);
    let span = (RATING_TRUE_CAP - RATING_FLOOR) as f64;
    let fraction = ((rating - RATING_FLOOR as f64) / span).clamp(0.0, 1.0);
    ((fraction * max_raw as f64).round() as u64).min(max_raw)
}

/// Map a raw bitfield value onto the 0-100 tendency scale.
pub fn raw_to_tendency(raw: u64, length: u32) -> u32 {
    let max_raw = max_raw(length);
    if max_raw == 0 {
        return 0;
    }
    let rating = (raw as f64 / max_raw as f64) * 100.0;
    (rating.round() as u32).min(100)
}

/// Map a 0-100 tendency back into the raw range of a `length`-bit field.
pub fn tendency_to_raw(rating: f64, length: u32) -> u64 {
    let max_raw = max_raw(length);
    if max_raw == 0 {
        return 0;
    }
    let fraction = (rating.clamp(0.0, 100.0)) / 100.0;
    ((fraction * max_raw as f64).round() as u64).min(max_raw)
}
