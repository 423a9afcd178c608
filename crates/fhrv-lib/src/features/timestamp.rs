use chrono::{DateTime, NaiveDateTime, NaiveTime};

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S%.f",
];

/// Time of day of a sample; unparsable input is kept verbatim instead of dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timestamp {
    Valid(NaiveTime),
    Invalid(String),
}

impl Timestamp {
    /// Accepts a bare time of day (`HH:MM:SS[.fff]`, `HH:MM`), a date-time in
    /// ISO, `Y/m/d` or `d/m/Y` order, or RFC 3339. Only the time of day is kept.
    /// Numeric epoch values are not recognised and come back as `Invalid`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        for fmt in TIME_FORMATS {
            if let Ok(time) = NaiveTime::parse_from_str(trimmed, fmt) {
                return Timestamp::Valid(time);
            }
        }
        for fmt in DATETIME_FORMATS {
            if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, fmt) {
                return Timestamp::Valid(datetime.time());
            }
        }
        if let Ok(datetime) = DateTime::parse_from_rfc3339(trimmed) {
            return Timestamp::Valid(datetime.naive_local().time());
        }
        Timestamp::Invalid(raw.to_string())
    }

    pub fn time(&self) -> Option<NaiveTime> {
        match self {
            Timestamp::Valid(time) => Some(*time),
            Timestamp::Invalid(_) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Timestamp::Valid(_))
    }
}
