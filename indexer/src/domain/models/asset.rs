//! Asset constants
//!
//! Assets are persisted rows keyed by unit, created lazily on first
//! sighting; see the asset entity and repository. Only the native coin has
//! a precision known ahead of time.

/// Decimal places of the native coin
pub const LOVELACE_DECIMALS: u32 = 6;
