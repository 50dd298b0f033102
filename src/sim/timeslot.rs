//! POSIX timeslot arithmetic for the 5-minute simulation grid and the
//! 15-minute market grid.

use chrono::{DateTime, Days, FixedOffset, NaiveTime, Timelike};

/// A point in simulated time, in POSIX seconds.
pub type Timeslot = i64;

/// Width of one simulation slot.
pub const SLOT_SECS: i64 = 5 * 60;

/// Width of one market contract (quarter hour).
pub const BLOCK_SECS: i64 = 15 * 60;

/// Quarter-hour contracts in one calendar day.
pub const BLOCKS_PER_DAY: usize = 96;

/// Returns the three 5-minute sub-slots composing the quarter hour that
/// starts at `block`.
///
/// # Examples
///
/// ```
/// use fleet_vpp_sim::sim::timeslot::sub_slots;
///
/// assert_eq!(sub_slots(900), [900, 1200, 1500]);
/// ```
pub fn sub_slots(block: Timeslot) -> [Timeslot; 3] {
    [block, block + SLOT_SECS, block + 2 * SLOT_SECS]
}

/// Returns `true` when `t` lies on a quarter-hour boundary.
pub fn is_block_start(t: Timeslot) -> bool {
    t.rem_euclid(BLOCK_SECS) == 0
}

/// Start of the quarter hour containing `t`.
pub fn block_start(t: Timeslot) -> Timeslot {
    t - t.rem_euclid(BLOCK_SECS)
}

/// Converts `t` into wall-clock time in the market time zone.
pub fn local_time(t: Timeslot, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    DateTime::from_timestamp(t, 0).map(|utc| utc.with_timezone(&offset))
}

/// Returns `true` when the wall-clock time of `t` is exactly `hour:minute:00`.
pub fn is_time_of_day(t: Timeslot, offset: FixedOffset, hour: u32, minute: u32) -> bool {
    local_time(t, offset)
        .is_some_and(|dt| dt.hour() == hour && dt.minute() == minute && dt.second() == 0)
}

/// Enumerates every quarter-hour contract of the calendar day after `t`.
///
/// Returns an empty vector if `t` is outside the representable range.
pub fn next_day_blocks(t: Timeslot, offset: FixedOffset) -> Vec<Timeslot> {
    let Some(tomorrow) =
        local_time(t, offset).and_then(|dt| dt.date_naive().checked_add_days(Days::new(1)))
    else {
        return Vec::new();
    };

    let midnight = tomorrow.and_time(NaiveTime::MIN).and_utc().timestamp()
        - i64::from(offset.local_minus_utc());

    (0..BLOCKS_PER_DAY as i64)
        .map(|i| midnight + i * BLOCK_SECS)
        .collect()
}

/// Renders `t` for log output, falling back to the raw POSIX value.
pub fn format_local(t: Timeslot, offset: FixedOffset) -> String {
    local_time(t, offset)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| t.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2017-01-02T00:00:00Z
    const MONDAY: Timeslot = 1_483_315_200;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn block_boundaries() {
        assert!(is_block_start(MONDAY));
        assert!(!is_block_start(MONDAY + SLOT_SECS));
        assert_eq!(block_start(MONDAY + 2 * SLOT_SECS), MONDAY);
        assert_eq!(block_start(MONDAY + BLOCK_SECS), MONDAY + BLOCK_SECS);
    }

    #[test]
    fn time_of_day_requires_exact_minute() {
        let four_pm = MONDAY + 16 * 3600;
        assert!(is_time_of_day(four_pm, utc(), 16, 0));
        assert!(!is_time_of_day(four_pm + SLOT_SECS, utc(), 16, 0));
    }

    #[test]
    fn time_of_day_respects_offset() {
        let cet = FixedOffset::east_opt(3600).unwrap();
        // 15:00 UTC is 16:00 CET.
        assert!(is_time_of_day(MONDAY + 15 * 3600, cet, 16, 0));
    }

    #[test]
    fn next_day_has_96_contiguous_blocks() {
        let blocks = next_day_blocks(MONDAY + 16 * 3600, utc());
        assert_eq!(blocks.len(), BLOCKS_PER_DAY);
        assert_eq!(blocks[0], MONDAY + 86_400);
        assert!(blocks.windows(2).all(|w| w[1] - w[0] == BLOCK_SECS));
    }

    #[test]
    fn next_day_starts_at_local_midnight() {
        let cet = FixedOffset::east_opt(3600).unwrap();
        let blocks = next_day_blocks(MONDAY + 15 * 3600, cet);
        // Local midnight on Tuesday is 23:00 UTC on Monday.
        assert_eq!(blocks[0], MONDAY + 23 * 3600);
    }

    #[test]
    fn format_local_renders_market_time() {
        let cet = FixedOffset::east_opt(3600).unwrap();
        assert_eq!(format_local(MONDAY + 15 * 3600, cet), "2017-01-02 16:00");
        assert_eq!(format_local(MONDAY, utc()), "2017-01-02 00:00");
    }
}
