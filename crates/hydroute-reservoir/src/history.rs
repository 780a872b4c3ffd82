//! Multi-year monthly history of inflow, demand and storage.

use hydroute_core::{Month, NMONTH};

/// Row tag of a history row that has never been written.
pub const UNUSED_ROW: i32 = i32::MIN;

/// Ring of `years` rows of monthly values, one row per model year.
///
/// Row `year mod years` holds `year`. Writing a month into a row tagged
/// with another year clears the row first, so a row never mixes years.
#[derive(Clone, Debug, PartialEq)]
pub struct History {
    /// Year stored in each row, or [`UNUSED_ROW`].
    pub year: Vec<i32>,
    /// Monthly inflow volume (litres per month).
    pub inflow: Vec<[f64; NMONTH]>,
    /// Monthly irrigation demand (litres per month).
    pub demand: Vec<[f64; NMONTH]>,
    /// Storage at the end of the month (litres).
    pub level: Vec<[f64; NMONTH]>,
    /// Which months of each row have been written.
    pub recorded: Vec<[bool; NMONTH]>,
}

impl History {
    /// An empty history of `years` rows.
    pub fn new(years: usize) -> Self {
        Self {
            year: vec![UNUSED_ROW; years],
            inflow: vec![[0.0; NMONTH]; years],
            demand: vec![[0.0; NMONTH]; years],
            level: vec![[0.0; NMONTH]; years],
            recorded: vec![[false; NMONTH]; years],
        }
    }

    /// Number of rows.
    pub fn years(&self) -> usize {
        self.year.len()
    }

    /// Store one month.
    pub fn record(&mut self, year: i32, month: Month, inflow: f64, demand: f64, level: f64) {
        let row = year.rem_euclid(self.years() as i32) as usize;
        if self.year[row] != year {
            self.year[row] = year;
            self.inflow[row] = [0.0; NMONTH];
            self.demand[row] = [0.0; NMONTH];
            self.level[row] = [0.0; NMONTH];
            self.recorded[row] = [false; NMONTH];
        }
        let m = month.index();
        self.inflow[row][m] = inflow;
        self.demand[row][m] = demand;
        self.level[row][m] = level;
        self.recorded[row][m] = true;
    }

    /// `true` if every month of `row` has been written.
    pub fn is_complete(&self, row: usize) -> bool {
        self.recorded[row].iter().all(|&r| r)
    }

    /// Number of fully recorded years.
    pub fn complete_years(&self) -> usize {
        (0..self.years()).filter(|&r| self.is_complete(r)).count()
    }

    /// `true` if no month has been written.
    pub fn is_empty(&self) -> bool {
        self.recorded.iter().all(|row| row.iter().all(|&r| !r))
    }
}
