//! Calendar-month arithmetic for goal horizons.
//!
//! The simulation steps in whole months, so horizons are counted in complete
//! calendar months rather than through jiff `Span` rounding.

use jiff::civil::Date;

/// Fast leap year check.
#[inline]
pub fn is_leap_year(year: i16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

/// Days in a month without constructing a `jiff::civil::Date`.
#[inline]
pub fn days_in_month(year: i16, month: i8) -> i8 {
    const DAYS: [i8; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    if month == 2 && is_leap_year(year) {
        29
    } else {
        DAYS[(month - 1) as usize]
    }
}

/// Number of complete calendar months from `from` to `to`.
///
/// A month counts once the day-of-month of `from` is reached again (or the
/// end of a shorter month is). Returns 0 when `to` is not after `from`.
pub fn months_between(from: Date, to: Date) -> u32 {
    if to <= from {
        return 0;
    }

    let mut months = (i32::from(to.year()) - i32::from(from.year())) * 12
        + (i32::from(to.month()) - i32::from(from.month()));

    let anchor_day = from.day().min(days_in_month(to.year(), to.month()));
    if to.day() < anchor_day {
        months -= 1;
    }

    months.max(0) as u32
}
