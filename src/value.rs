use chrono::prelude::*;
use chrono::Duration;
use chrono_tz::Tz;
use ical::property::Property;

use crate::error::{Error, Result};

/// A DATE or DATE-TIME property value as written in the calendar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DateValue {
    Date(NaiveDate),
    Floating(NaiveDateTime),
    Utc(NaiveDateTime),
    Zoned(NaiveDateTime, Tz),
}

impl DateValue {
    /// Parses a single `YYYYMMDD` or `YYYYMMDDTHHMMSS[Z]` value.
    ///
    /// `tz` comes from the property's TZID parameter and is ignored for
    /// dates and UTC values.
    pub fn parse(value: &str, tz: Option<Tz>) -> Result<Self> {
        let value = value.trim();
        let invalid = || Error::InvalidDate(value.to_string());

        if value.len() == 8 {
            return NaiveDate::parse_from_str(value, "%Y%m%d")
                .map(DateValue::Date)
                .map_err(|_| invalid());
        }

        if let Some(utc) = value.strip_suffix('Z') {
            return NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
                .map(DateValue::Utc)
                .map_err(|_| invalid());
        }

        let naive = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").map_err(|_| invalid())?;
        Ok(match tz {
            Some(tz) => DateValue::Zoned(naive, tz),
            None => DateValue::Floating(naive),
        })
    }

    /// Reads every value of a (possibly comma separated) date property.
    /// PERIOD values contribute their start.
    pub fn from_property(property: &Property) -> Result<Vec<Self>> {
        let tz = param(property, "TZID").and_then(time_zone);
        property
            .value
            .as_deref()
            .unwrap_or("")
            .split(',')
            .filter(|v| !v.trim().is_empty())
            .map(|v| Self::parse(v.split('/').next().unwrap_or(v), tz))
            .collect()
    }

    pub fn is_date(&self) -> bool {
        matches!(self, DateValue::Date(_))
    }

    pub fn zone(&self) -> Option<Tz> {
        match *self {
            DateValue::Zoned(_, tz) => Some(tz),
            _ => None,
        }
    }

    /// The value as written, without any time zone conversion.
    pub fn wall_clock(&self) -> NaiveDateTime {
        match *self {
            DateValue::Date(d) => midnight(d),
            DateValue::Floating(n) | DateValue::Utc(n) | DateValue::Zoned(n, _) => n,
        }
    }

    /// The absolute instant of this value. Floating values and dates
    /// (at midnight) are read in `fallback`, or as UTC when there is none.
    pub fn instant(&self, fallback: Option<Tz>) -> DateTime<Utc> {
        match *self {
            DateValue::Date(d) => resolve(midnight(d), fallback),
            DateValue::Floating(n) => resolve(n, fallback),
            DateValue::Utc(n) => resolve(n, None),
            DateValue::Zoned(n, tz) => resolve(n, Some(tz)),
        }
    }

    /// The value as a wall-clock time of `zone` (UTC when `None`). Dates,
    /// floating values and values already in `zone` are taken as written.
    pub fn wall_clock_in(&self, zone: Option<Tz>) -> NaiveDateTime {
        match *self {
            DateValue::Date(_) | DateValue::Floating(_) => self.wall_clock(),
            DateValue::Zoned(n, tz) if Some(tz) == zone => n,
            _ => wall_clock_at(self.instant(None), zone),
        }
    }

    /// Instant of [`DateValue::wall_clock_in`] read back in `zone`.
    pub fn instant_in(&self, zone: Option<Tz>) -> DateTime<Utc> {
        resolve(self.wall_clock_in(zone), zone)
    }
}

pub fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Turns a wall-clock time in `zone` (UTC when `None`) into an instant.
///
/// Ambiguous times take the earlier instant. Times skipped by a DST gap
/// take the offset in force before the gap (RFC 5545 section 3.3.5), so
/// 02:30 on a spring-forward night in Berlin is 01:30 UTC.
pub fn resolve(naive: NaiveDateTime, zone: Option<Tz>) -> DateTime<Utc> {
    match zone {
        None => Utc.from_utc_datetime(&naive),
        Some(tz) => match tz.from_local_datetime(&naive).earliest() {
            Some(dt) => dt.with_timezone(&Utc),
            None => {
                let before = tz.offset_from_utc_datetime(&(naive - Duration::days(1)));
                let offset = i64::from(before.fix().local_minus_utc());
                tracing::debug!(%naive, tz = tz.name(), "local time falls into a DST gap");
                Utc.from_utc_datetime(&(naive - Duration::seconds(offset)))
            }
        },
    }
}

/// Inverse of [`resolve`].
pub fn wall_clock_at(instant: DateTime<Utc>, zone: Option<Tz>) -> NaiveDateTime {
    match zone {
        None => instant.naive_utc(),
        Some(tz) => instant.with_timezone(&tz).naive_local(),
    }
}

pub fn param<'a>(property: &'a Property, name: &str) -> Option<&'a str> {
    property
        .params
        .as_ref()?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, values)| values.first())
        .map(String::as_str)
}

/// Looks up a TZID, also trying the trailing `Area/City` part of
/// vendor-prefixed identifiers such as `/mozilla.org/20050126_1/Europe/Berlin`.
pub fn time_zone(tzid: &str) -> Option<Tz> {
    let tzid = tzid.trim_matches('"');
    let segments: Vec<&str> = tzid.split('/').collect();
    let found = (0..segments.len()).find_map(|i| segments[i..].join("/").parse::<Tz>().ok());
    if found.is_none() {
        tracing::warn!(tzid, "unknown time zone, treating as floating time");
    }
    found
}

/// Parses an RFC 5545 DURATION such as `PT1H30M`, `P1D` or `-P2W`.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let invalid = || Error::InvalidDuration(value.to_string());
    let text = value.trim();
    let (negative, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let text = text.strip_prefix('P').ok_or_else(invalid)?;

    let mut seconds: i64 = 0;
    let mut number = String::new();
    let mut in_time = false;
    let mut seen_unit = false;
    for c in text.chars() {
        match c {
            '0'..='9' => number.push(c),
            'T' if !in_time && number.is_empty() => in_time = true,
            _ => {
                let unit = match (c, in_time) {
                    ('W', false) => 604_800,
                    ('D', false) => 86_400,
                    ('H', true) => 3_600,
                    ('M', true) => 60,
                    ('S', true) => 1,
                    _ => return Err(invalid()),
                };
                let n: i64 = number.parse().map_err(|_| invalid())?;
                seconds = n
                    .checked_mul(unit)
                    .and_then(|s| seconds.checked_add(s))
                    .ok_or_else(invalid)?;
                number.clear();
                seen_unit = true;
            }
        }
    }
    if !seen_unit || !number.is_empty() {
        return Err(invalid());
    }

    Duration::try_seconds(if negative { -seconds } else { seconds }).ok_or_else(invalid)
}

/// Undoes TEXT escaping (`\,` `\;` `\\` `\n`).
pub fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
