use chrono::{Duration, NaiveDateTime};
use ical::parser::ical::component::IcalEvent;
use ical::property::Property;

use crate::error::Result;
use crate::recurrence::{Occurrence, Span};
use crate::value::{parse_duration, unescape_text, DateValue};

/// How the end of an event was given.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventEnd {
    At(DateValue),
    After(Duration),
    Unset,
}

/// One VEVENT definition, possibly recurring.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub uid: Option<String>,
    pub summary: String,
    pub start: DateValue,
    pub end: EventEnd,
    pub rrules: Vec<String>,
    pub rdates: Vec<DateValue>,
    pub exdates: Vec<DateValue>,
    /// Set on modified instances of a recurring event.
    pub recurrence_id: Option<DateValue>,
}

fn property<'a>(event: &'a IcalEvent, name: &str) -> Option<&'a Property> {
    event
        .properties
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
}

fn first_date(event: &IcalEvent, name: &str) -> Result<Option<DateValue>> {
    match property(event, name) {
        Some(p) => Ok(DateValue::from_property(p)?.into_iter().next()),
        None => Ok(None),
    }
}

impl Event {
    /// Reads an event from its parsed properties. Events without a DTSTART
    /// are skipped and yield `None`.
    pub fn from_ical(event: &IcalEvent) -> Result<Option<Self>> {
        let uid = property(event, "UID").and_then(|p| p.value.clone());

        let start = match first_date(event, "DTSTART")? {
            Some(start) => start,
            None => {
                tracing::warn!(?uid, "skipping event without DTSTART");
                return Ok(None);
            }
        };

        let end = if let Some(end) = first_date(event, "DTEND")? {
            EventEnd::At(end)
        } else if let Some(duration) = property(event, "DURATION").and_then(|p| p.value.as_deref()) {
            EventEnd::After(parse_duration(duration)?)
        } else {
            EventEnd::Unset
        };

        let summary = property(event, "SUMMARY")
            .and_then(|p| p.value.as_deref())
            .map(unescape_text)
            .unwrap_or_default();

        let mut rrules = Vec::new();
        let mut rdates = Vec::new();
        let mut exdates = Vec::new();
        for p in &event.properties {
            match p.name.to_ascii_uppercase().as_str() {
                "RRULE" => rrules.extend(p.value.clone()),
                "RDATE" => rdates.extend(DateValue::from_property(p)?),
                "EXDATE" => exdates.extend(DateValue::from_property(p)?),
                _ => {}
            }
        }

        Ok(Some(Event {
            uid,
            summary,
            start,
            end,
            rrules,
            rdates,
            exdates,
            recurrence_id: first_date(event, "RECURRENCE-ID")?,
        }))
    }

    pub fn is_all_day(&self) -> bool {
        self.start.is_date()
    }

    /// Time from start to end, measured on the wall clock of the start's
    /// zone. Without DTEND or DURATION an all-day event lasts one day and a
    /// timed one is instantaneous.
    pub fn length(&self) -> Duration {
        match (self.start, self.end) {
            (_, EventEnd::After(duration)) => duration,
            (DateValue::Date(start), EventEnd::At(end)) => end.wall_clock().date() - start,
            (DateValue::Date(_), EventEnd::Unset) => Duration::days(1),
            (start, EventEnd::At(end)) => end.wall_clock_in(start.zone()) - start.wall_clock(),
            (_, EventEnd::Unset) => Duration::zero(),
        }
    }

    /// The occurrence of this event beginning at wall-clock `start`.
    pub fn occurrence_at(&self, start: NaiveDateTime) -> Occurrence {
        let length = self.length();
        let span = if self.is_all_day() {
            let day = start.date();
            let end = day
                .checked_add_signed(Duration::days(length.num_days()))
                .unwrap_or(day);
            Span::AllDay { start: day, end }
        } else {
            Span::Timed {
                start,
                end: start.checked_add_signed(length).unwrap_or(start),
            }
        };

        Occurrence {
            span,
            title: self.summary.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn prop(name: &str, value: &str) -> Property {
        Property {
            name: String::from(name),
            params: None,
            value: Some(String::from(value)),
        }
    }

    fn berlin(name: &str, value: &str) -> Property {
        Property {
            name: String::from(name),
            params: Some(vec![(
                String::from("TZID"),
                vec![String::from("Europe/Berlin")],
            )]),
            value: Some(String::from(value)),
        }
    }

    fn ical_event(properties: Vec<Property>) -> IcalEvent {
        IcalEvent {
            alarms: vec![],
            properties,
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn reads_timed_event() {
        let event = Event::from_ical(&ical_event(vec![
            prop("UID", "standup@example.com"),
            prop("DTSTART", "20250303T090000"),
            prop("DTEND", "20250303T091500"),
            prop("SUMMARY", "Standup"),
        ]))
        .unwrap()
        .unwrap();

        assert_eq!(event.uid.as_deref(), Some("standup@example.com"));
        assert_eq!(event.summary, "Standup");
        assert!(!event.is_all_day());
        assert_eq!(event.length(), Duration::minutes(15));
        assert!(event.rrules.is_empty());
        assert_eq!(event.recurrence_id, None);
    }

    #[test]
    fn skips_event_without_start() {
        let event = Event::from_ical(&ical_event(vec![prop("SUMMARY", "foo")])).unwrap();
        assert_eq!(event, None);
    }

    #[test]
    fn missing_summary_is_empty_title() {
        let event = Event::from_ical(&ical_event(vec![prop("DTSTART", "20250101")]))
            .unwrap()
            .unwrap();
        assert_eq!(event.summary, "");
    }

    #[test]
    fn end_defaults() {
        let all_day = Event::from_ical(&ical_event(vec![prop("DTSTART", "20250101")]))
            .unwrap()
            .unwrap();
        assert_eq!(all_day.length(), Duration::days(1));

        let timed = Event::from_ical(&ical_event(vec![prop("DTSTART", "20250101T080000Z")]))
            .unwrap()
            .unwrap();
        assert_eq!(timed.length(), Duration::zero());

        let with_duration = Event::from_ical(&ical_event(vec![
            prop("DTSTART", "20250101T080000Z"),
            prop("DURATION", "PT45M"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(with_duration.length(), Duration::minutes(45));
    }

    #[test]
    fn length_across_a_dst_gap() {
        let event = Event::from_ical(&ical_event(vec![
            berlin("DTSTART", "20250330T023000"),
            berlin("DTEND", "20250330T033000"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(event.length(), Duration::hours(1));

        let event = Event::from_ical(&ical_event(vec![
            prop("DTSTART", "20250701T100000Z"),
            berlin("DTEND", "20250701T130000"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(event.length(), Duration::hours(1));
    }

    #[test]
    fn collects_recurrence_properties() {
        let event = Event::from_ical(&ical_event(vec![
            prop("DTSTART", "20250106T100000"),
            prop("rrule", "FREQ=WEEKLY;BYDAY=MO"),
            prop("EXDATE", "20250113T100000,20250120T100000"),
            prop("RDATE", "20250108T100000"),
        ]))
        .unwrap()
        .unwrap();

        assert_eq!(event.rrules, vec![String::from("FREQ=WEEKLY;BYDAY=MO")]);
        assert_eq!(event.exdates.len(), 2);
        assert_eq!(event.rdates, vec![DateValue::Floating(at(2025, 1, 8, 10, 0))]);
    }

    #[test]
    fn occurrence_keeps_length() {
        let event = Event::from_ical(&ical_event(vec![
            prop("DTSTART", "20250610"),
            prop("DTEND", "20250612"),
            prop("SUMMARY", "Conference"),
        ]))
        .unwrap()
        .unwrap();

        let occurrence = event.occurrence_at(at(2026, 6, 10, 0, 0));
        assert_eq!(
            occurrence.span,
            Span::AllDay {
                start: NaiveDate::from_ymd_opt(2026, 6, 10).unwrap(),
                end: NaiveDate::from_ymd_opt(2026, 6, 12).unwrap(),
            }
        );
        assert_eq!(occurrence.title, "Conference");
    }
}
