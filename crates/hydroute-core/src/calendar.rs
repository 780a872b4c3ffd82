//! The model calendar: a fixed 365-day year without leap days.

use std::fmt;

/// Months per year.
pub const NMONTH: usize = 12;

/// Days per model year.
pub const DAYS_PER_YEAR: u32 = 365;

const DAYS_IN_MONTH: [u32; NMONTH] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

const NAMES: [&str; NMONTH] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// A calendar month, `0` = January.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Month(u8);

impl Month {
    /// January.
    pub const JANUARY: Month = Month(0);

    /// Create a month from its zero-based index. Returns `None` past December.
    pub fn new(index: usize) -> Option<Self> {
        if index < NMONTH {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    /// Create a month from any integer by wrapping modulo 12.
    pub fn wrapping(index: usize) -> Self {
        Self((index % NMONTH) as u8)
    }

    /// Zero-based index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Number of days in this month.
    pub const fn days(self) -> u32 {
        DAYS_IN_MONTH[self.0 as usize]
    }

    /// The following month, wrapping December to January.
    pub fn next(self) -> Self {
        Self::wrapping(self.index() + 1)
    }

    /// All twelve months in order.
    pub fn all() -> impl Iterator<Item = Month> {
        (0..NMONTH as u8).map(Month)
    }

    /// The month containing zero-based day-of-year `day` (0..365).
    pub fn of_day(day: u32) -> Self {
        let mut remaining = day % DAYS_PER_YEAR;
        for m in Self::all() {
            if remaining < m.days() {
                return m;
            }
            remaining -= m.days();
        }
        Self(11)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(NAMES[self.index()])
    }
}
