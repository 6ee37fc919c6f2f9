use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;

use crate::error::{Error, Result};
use crate::event::Event;
use crate::value::{midnight, resolve, DateValue};

const DATE_TIME_FORMAT: &str = "%Y%m%dT%H%M%S";

#[derive(Debug, Clone, PartialEq)]
pub enum Span {
    /// `end` is exclusive.
    AllDay { start: NaiveDate, end: NaiveDate },
    Timed {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

/// A concrete instance of an event, recurrence already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    pub span: Span,
    pub title: String,
}

/// Half-open wall-clock range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Window {
    pub fn year(year: i32) -> Result<Self> {
        let new_year = |y: i32| NaiveDate::from_ymd_opt(y, 1, 1).map(midnight);
        match (new_year(year), year.checked_add(1).and_then(new_year)) {
            (Some(start), Some(end)) => Ok(Window { start, end }),
            _ => Err(Error::YearOutOfRange(year)),
        }
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at < self.end
    }
}

/// Every occurrence starting within `year`.
///
/// Master events come in calendar order, each with its instances in
/// chronological order. A modified instance (RECURRENCE-ID) takes the place
/// of the instance it replaces; those that replace nothing inside the year
/// follow at the end.
pub fn occurrences(events: &[Event], year: i32) -> Result<Vec<Occurrence>> {
    let window = Window::year(year)?;
    let (masters, overrides): (Vec<&Event>, Vec<&Event>) =
        events.iter().partition(|e| e.recurrence_id.is_none());
    let mut replaced = vec![false; overrides.len()];
    let mut out = Vec::new();

    for master in &masters {
        let zone = master.start.zone();
        let moved: HashMap<DateTime<Utc>, usize> = overrides
            .iter()
            .enumerate()
            .filter(|(_, o)| o.uid.is_some() && o.uid == master.uid)
            .filter_map(|(i, o)| o.recurrence_id.map(|id| (id.instant_in(zone), i)))
            .collect();

        for (instant, wall_clock) in instances(master, &window)? {
            match moved.get(&instant) {
                Some(&i) => {
                    replaced[i] = true;
                    let modified = overrides[i];
                    let start = modified.start.wall_clock();
                    if window.contains(start) {
                        out.push(modified.occurrence_at(start));
                    }
                }
                None => out.push(master.occurrence_at(wall_clock)),
            }
        }
    }

    for (modified, done) in overrides.iter().zip(&replaced) {
        let start = modified.start.wall_clock();
        if !done && window.contains(start) {
            out.push(modified.occurrence_at(start));
        }
    }

    tracing::debug!(
        year,
        events = events.len(),
        occurrences = out.len(),
        "expanded occurrences"
    );
    Ok(out)
}

/// Instances of a master event inside the window as `(instant, wall clock)`:
/// DTSTART, RRULE and RDATE instances minus EXDATEs, chronological.
fn instances(event: &Event, window: &Window) -> Result<Vec<(DateTime<Utc>, NaiveDateTime)>> {
    let zone = event.start.zone();
    let mut found = BTreeMap::new();
    let mut add = |wall_clock: NaiveDateTime| {
        found.insert(resolve(wall_clock, zone), wall_clock);
    };

    add(event.start.wall_clock());
    for rdate in &event.rdates {
        add(rdate.wall_clock_in(zone));
    }
    for wall_clock in rule_instances(event, window)? {
        add(wall_clock);
    }

    for exdate in &event.exdates {
        found.remove(&exdate.instant_in(zone));
    }

    Ok(found
        .into_iter()
        .filter(|(_, wall_clock)| window.contains(*wall_clock))
        .collect())
}

/// Wall-clock instances of the event's RRULEs around the window.
///
/// Rules are expanded over wall-clock time in a UTC frame, so a DTSTART
/// that falls into a DST gap stays valid and every instance keeps the time
/// of day it was written with. Callers resolve the results in the event's
/// zone.
fn rule_instances(event: &Event, window: &Window) -> Result<Vec<NaiveDateTime>> {
    let set = match recurrence_set(event)? {
        Some(set) => set,
        None => return Ok(Vec::new()),
    };

    let frame = |naive: NaiveDateTime| rrule::Tz::UTC.from_utc_datetime(&naive);
    let result = set
        .after(frame(window.start - Duration::days(1)))
        .before(frame(window.end + Duration::days(1)))
        .all(u16::MAX);
    if result.limited {
        tracing::warn!(
            summary = %event.summary,
            count = result.dates.len(),
            "recurrence truncated, too many instances in one year"
        );
    }

    Ok(result.dates.iter().map(|dt| dt.naive_utc()).collect())
}

fn recurrence_set(event: &Event) -> Result<Option<RRuleSet>> {
    if event.rrules.is_empty() {
        return Ok(None);
    }

    let zone = event.start.zone();
    let start = event.start.wall_clock();
    let mut lines = vec![format!("DTSTART:{}Z", start.format(DATE_TIME_FORMAT))];
    for rule in &event.rrules {
        let (rule, until) = normalize_until(rule, zone)?;
        match until {
            Some(until) if until < start => {
                tracing::debug!(%rule, "rule ends before DTSTART, ignoring it");
            }
            _ => lines.push(format!("RRULE:{}", rule)),
        }
    }
    if lines.len() == 1 {
        return Ok(None);
    }

    Ok(Some(lines.join("\n").parse::<RRuleSet>()?))
}

/// Rewrites UNTIL as a wall-clock time of the event's zone, written in the
/// UTC frame the rule is expanded in. A DATE until covers its whole day.
fn normalize_until(rule: &str, zone: Option<Tz>) -> Result<(String, Option<NaiveDateTime>)> {
    let mut until = None;
    let mut parts = Vec::new();
    for part in rule.trim().split(';').filter(|p| !p.is_empty()) {
        match part.split_once('=') {
            Some((key, value)) if key.eq_ignore_ascii_case("UNTIL") => {
                let wall_clock = match DateValue::parse(value, None)? {
                    DateValue::Date(day) => midnight(day) + Duration::seconds(86_399),
                    other => other.wall_clock_in(zone),
                };
                parts.push(format!("UNTIL={}Z", wall_clock.format(DATE_TIME_FORMAT)));
                until = Some(wall_clock);
            }
            _ => parts.push(part.to_string()),
        }
    }
    Ok((parts.join(";"), until))
}
