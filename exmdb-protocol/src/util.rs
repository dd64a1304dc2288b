//! Store id and timestamp arithmetic.

use chrono::{DateTime, Utc};

/// Seconds between 1601-01-01 (FILETIME epoch) and 1970-01-01.
const EPOCH_OFFSET: i64 = 11_644_473_600;
/// FILETIME ticks (100 ns) per second.
const TICKS_PER_SECOND: u64 = 10_000_000;

/// Converts a 48-bit global counter value to its on-store byte order.
pub fn value_to_gc(value: u64) -> u64 {
    (value & 0x0000_ffff_ffff_ffff).to_be() << if cfg!(target_endian = "big") { 16 } else { 0 }
}

/// Combines a replica id with a global counter into an entry id.
pub fn make_eid(replid: u16, gc: u64) -> u64 {
    u64::from(replid) | gc
}

/// `make_eid(replid, value_to_gc(value))`.
pub fn make_eid_ex(replid: u16, value: u64) -> u64 {
    make_eid(replid, value_to_gc(value))
}

/// Extracts the counter value from an entry id built with [`make_eid_ex`].
pub fn eid_value(eid: u64) -> u64 {
    let gc = eid & !0xffff;
    if cfg!(target_endian = "big") {
        gc >> 16
    } else {
        u64::from_be(gc)
    }
}

/// FILETIME (100 ns ticks since 1601) to UNIX seconds.
pub fn nx_time(filetime: u64) -> i64 {
    (filetime / TICKS_PER_SECOND) as i64 - EPOCH_OFFSET
}

/// UNIX seconds to FILETIME. Times before 1601 saturate to zero, times past
/// the FILETIME range to `u64::MAX`.
pub fn nt_time(unix: i64) -> u64 {
    match unix.checked_add(EPOCH_OFFSET) {
        Some(seconds) if seconds < 0 => 0,
        Some(seconds) => (seconds as u64)
            .checked_mul(TICKS_PER_SECOND)
            .unwrap_or(u64::MAX),
        None => u64::MAX,
    }
}

/// FILETIME as a UTC timestamp, if representable.
pub fn filetime_to_datetime(filetime: u64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(nx_time(filetime), 0)
}

/// Current time as FILETIME.
pub fn nt_now() -> u64 {
    nt_time(Utc::now().timestamp())
}
