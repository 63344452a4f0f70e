//! Calendar of the simulation: year, day and season.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const DAYS_PER_SEASON: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    pub fn next(self) -> Self {
        match self {
            Season::Winter => Season::Spring,
            Season::Spring => Season::Summer,
            Season::Summer => Season::Autumn,
            Season::Autumn => Season::Winter,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SimDate {
    pub year: u32,
    pub day: u32,
    pub season: Season,
}

impl fmt::Display for SimDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Year: {} | Day: {} | Season: {}",
            self.year, self.day, self.season
        )
    }
}

/// Result of a day rollover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayAdvance {
    pub date: SimDate,
    pub new_year: bool,
}

/// The day timer itself lives in the world's timer queue; the clock only
/// holds the calendar and performs the rollover arithmetic.
#[derive(Debug, Clone)]
pub struct Clock {
    date: SimDate,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            date: SimDate {
                year: 1,
                day: 1,
                season: Season::Summer,
            },
        }
    }

    pub fn starting_at(date: SimDate) -> Self {
        Self { date }
    }

    pub fn date(&self) -> SimDate {
        self.date
    }

    pub fn season(&self) -> Season {
        self.date.season
    }

    pub fn advance_day(&mut self) -> DayAdvance {
        let mut new_year = false;
        self.date.day += 1;
        if self.date.day > DAYS_PER_SEASON {
            self.date.day = 1;
            self.date.season = self.date.season.next();
            if self.date.season == Season::Winter {
                self.date.year += 1;
                new_year = true;
            }
        }
        DayAdvance {
            date: self.date,
            new_year,
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
