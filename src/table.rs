use std::fmt;
use std::io::{self, Write};

use chrono::{NaiveDate, Timelike};

use crate::recurrence::{Occurrence, Span};

const SECONDS_PER_DAY: i64 = 86_400;

/// Bucket key: a date and a start time truncated to the minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot {
    pub date: NaiveDate,
    pub hour: u32,
    pub minute: u32,
}

impl Slot {
    pub fn all_day(date: NaiveDate) -> Self {
        Slot {
            date,
            hour: 0,
            minute: 0,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{:02}:{:02}",
            self.date.format("%Y-%m-%d"),
            self.hour,
            self.minute
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub slot: Slot,
    /// Zero for all-day entries.
    pub duration: i64,
    pub title: String,
}

/// Renders `YYYY-MM-DD,HH:MM,<seconds>,<title>`. Titles are written as is.
impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.slot, self.duration, self.title)
    }
}

/// Entries in insertion order; sorting happens on the way out.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EntryTable {
    entries: Vec<Entry>,
}

impl EntryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the entries for one occurrence.
    ///
    /// An all-day occurrence yields one entry per day in `[start, end)`, so
    /// none at all when `start >= end`. A timed occurrence yields a single
    /// entry at its start minute whose duration is `end - start` in seconds
    /// with whole days dropped: 25 hours are recorded as 3600.
    pub fn classify(&mut self, occurrence: &Occurrence) {
        match occurrence.span {
            Span::AllDay { start, end } => {
                for day in start.iter_days().take_while(|day| *day < end) {
                    self.entries.push(Entry {
                        slot: Slot::all_day(day),
                        duration: 0,
                        title: occurrence.title.clone(),
                    });
                }
            }
            Span::Timed { start, end } => {
                let seconds = (end - start).num_seconds().rem_euclid(SECONDS_PER_DAY);
                self.entries.push(Entry {
                    slot: Slot {
                        date: start.date(),
                        hour: start.hour(),
                        minute: start.minute(),
                    },
                    duration: seconds,
                    title: occurrence.title.clone(),
                });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by slot; entries sharing a slot keep insertion order.
    pub fn sorted(&self) -> Vec<&Entry> {
        let mut sorted: Vec<&Entry> = self.entries.iter().collect();
        sorted.sort_by_key(|entry| entry.slot);
        sorted
    }

    pub fn write_report<W: Write>(&self, mut out: W) -> io::Result<()> {
        for entry in self.sorted() {
            writeln!(out, "{}", entry)?;
        }
        out.flush()
    }
}

impl<'a> Extend<&'a Occurrence> for EntryTable {
    fn extend<I: IntoIterator<Item = &'a Occurrence>>(&mut self, occurrences: I) {
        for occurrence in occurrences {
            self.classify(occurrence);
        }
    }
}
