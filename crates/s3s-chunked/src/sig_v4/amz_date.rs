//! x-amz-date

use crate::error::ConfigError;

use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// A UTC timestamp in the `YYYYMMDD'T'HHMMSS'Z'` form used by SigV4
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AmzDate(PrimitiveDateTime);

impl AmzDate {
    /// Parses `AmzDate` from a string like `20130524T000000Z`
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidAmzDate`] if the input is not in the SigV4 form
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let format = time::macros::format_description!("[year][month][day]T[hour][minute][second]Z");
        PrimitiveDateTime::parse(input, &format)
            .map(Self)
            .map_err(|_| ConfigError::InvalidAmzDate(input.to_owned()))
    }

    #[must_use]
    pub fn now() -> Self {
        Self::from(OffsetDateTime::now_utc())
    }

    /// `YYYYMMDD'T'HHMMSS'Z'`
    #[must_use]
    pub fn fmt_iso8601(&self) -> String {
        let t = &self.0;
        format!("{}T{:02}{:02}{:02}Z", self.fmt_date(), t.hour(), t.minute(), t.second())
    }

    /// `YYYYMMDD`
    #[must_use]
    pub fn fmt_date(&self) -> String {
        let t = &self.0;
        format!("{:04}{:02}{:02}", t.year(), u8::from(t.month()), t.day())
    }
}

impl From<OffsetDateTime> for AmzDate {
    fn from(value: OffsetDateTime) -> Self {
        let utc = value.to_offset(UtcOffset::UTC);
        Self(PrimitiveDateTime::new(utc.date(), utc.time()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_format() {
        let date = AmzDate::parse("20130524T000000Z").unwrap();
        assert_eq!(date.fmt_iso8601(), "20130524T000000Z");
        assert_eq!(date.fmt_date(), "20130524");

        let date = AmzDate::parse("20991231T235958Z").unwrap();
        assert_eq!(date.fmt_iso8601(), "20991231T235958Z");
    }

    #[test]
    fn parse_rejects_other_forms() {
        for input in ["2013-05-24T00:00:00Z", "20130524T000000", "20131324T000000Z", ""] {
            assert!(
                matches!(AmzDate::parse(input), Err(ConfigError::InvalidAmzDate(_))),
                "{input:?}"
            );
        }
    }

    #[test]
    fn from_offset_date_time_normalizes_to_utc() {
        let t = time::macros::datetime!(2013-05-24 02:00:00 +02:00);
        assert_eq!(AmzDate::from(t).fmt_iso8601(), "20130524T000000Z");
    }
}
