use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read calendar: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse calendar: {0}")]
    Parse(#[from] ical::parser::ParserError),

    #[error("no VCALENDAR found in input")]
    NoCalendar,

    #[error("invalid date or date-time value `{0}`")]
    InvalidDate(String),

    #[error("invalid duration `{0}`")]
    InvalidDuration(String),

    #[error("invalid recurrence rule: {0}")]
    Recurrence(#[from] rrule::RRuleError),

    #[error("year {0} is out of range")]
    YearOutOfRange(i32),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
