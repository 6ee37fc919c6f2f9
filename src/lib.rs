pub mod cli;
pub mod error;
pub mod event;
pub mod recurrence;
pub mod table;
pub mod value;

use std::io::{BufRead, Write};

pub use crate::error::{Error, Result};
pub use crate::event::{Event, EventEnd};
pub use crate::recurrence::{occurrences, Occurrence, Span, Window};
pub use crate::table::{Entry, EntryTable, Slot};

/// Year reported on when none is given.
pub const DEFAULT_YEAR: i32 = 2025;

/// Reads every VEVENT of every VCALENDAR in the input, in file order.
pub fn events_from_reader<R: BufRead>(reader: R) -> Result<Vec<Event>> {
    let mut events = Vec::new();
    let mut calendars = 0;
    for calendar in ical::IcalParser::new(reader) {
        let calendar = calendar?;
        calendars += 1;
        events.extend(parse_events(calendar.events)?);
    }
    if calendars == 0 {
        return Err(Error::NoCalendar);
    }

    tracing::debug!(calendars, events = events.len(), "parsed calendar input");
    Ok(events)
}

fn parse_events(events: Vec<ical::parser::ical::component::IcalEvent>) -> Result<Vec<Event>> {
    let mut parsed = Vec::with_capacity(events.len());
    for event in &events {
        parsed.extend(Event::from_ical(event)?);
    }
    Ok(parsed)
}

/// Expands `events` over `year` and buckets the occurrences.
pub fn entries_for_year(events: &[Event], year: i32) -> Result<EntryTable> {
    let mut table = EntryTable::new();
    table.extend(&occurrences(events, year)?);
    tracing::debug!(year, entries = table.len(), "bucketed entries");
    Ok(table)
}

/// Whole pipeline: calendar text in, sorted report out.
pub fn report<R: BufRead, W: Write>(reader: R, year: i32, out: W) -> Result<()> {
    let events = events_from_reader(reader)?;
    entries_for_year(&events, year)?.write_report(out)?;
    Ok(())
}
