//! Calendar and time-of-day math for the host's simulation clock
//!
//! The host runs four 28-day seasons per year and reports the time of day
//! as an HHMM-coded integer between 0600 and 2600 (hours past midnight of
//! the following day are 2400+). Birthdays are derived by walking the date
//! backwards by an age in days.

use serde::{Deserialize, Serialize};

/// Days in each season of the host calendar
pub const DAYS_PER_SEASON: u32 = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
            Season::Winter => "winter",
        }
    }

    fn index(&self) -> u32 {
        match self {
            Season::Spring => 0,
            Season::Summer => 1,
            Season::Fall => 2,
            Season::Winter => 3,
        }
    }

    fn from_index(index: u32) -> Self {
        match index % 4 {
            0 => Season::Spring,
            1 => Season::Summer,
            2 => Season::Fall,
            _ => Season::Winter,
        }
    }
}

/// A calendar date: year starts at 1, day runs 1..=28
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimDate {
    pub year: u32,
    pub season: Season,
    pub day: u32,
}

impl SimDate {
    pub fn new(year: u32, season: Season, day: u32) -> Self {
        Self { year, season, day }
    }

    /// Days elapsed since year 1, spring 1
    fn to_absolute(self) -> u32 {
        (self.year.saturating_sub(1) * 4 + self.season.index()) * DAYS_PER_SEASON + self.day - 1
    }

    fn from_absolute(days: u32) -> Self {
        let season_count = days / DAYS_PER_SEASON;
        Self {
            year: season_count / 4 + 1,
            season: Season::from_index(season_count % 4),
            day: days % DAYS_PER_SEASON + 1,
        }
    }

    /// Walk the date backwards by `days`, clamping to year 1 spring 1 when
    /// the subtraction would run off the start of the calendar.
    pub fn minus_days(self, days: u32) -> SimDate {
        SimDate::from_absolute(self.to_absolute().saturating_sub(days))
    }

    /// Walk the date forwards by `days`
    pub fn plus_days(self, days: u32) -> SimDate {
        SimDate::from_absolute(self.to_absolute() + days)
    }

    /// Human-readable label like "spring 4"
    pub fn label(&self) -> String {
        format!("{} {}", self.season.as_str(), self.day)
    }
}

/// Time of day, HHMM-coded the way the host reports it (e.g. 2100 = 9 pm)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeOfDay(pub u16);

impl TimeOfDay {
    pub fn hour(&self) -> u16 {
        self.0 / 100
    }

    /// True on the hour, when the host fires its coarse periodic updates
    pub fn is_on_hour(&self) -> bool {
        self.0 % 100 == 0
    }
}

/// A full simulation timestamp: calendar date plus time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimTime {
    pub date: SimDate,
    pub time: TimeOfDay,
}
