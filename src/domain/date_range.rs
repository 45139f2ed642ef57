use chrono::DateTime;
use chrono::NaiveDate;
use chrono::NaiveTime;
use chrono::Utc;

/// Date format accepted from the admin filter form
const DATE_FORMAT: &str = "%d/%m/%Y";

/// An inclusive range of whole UTC calendar days, expanded to timestamps: the
/// start is midnight of the first day, the end is the last microsecond of the
/// final day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateRange {
    /// Parse an optional pair of `DD/MM/YYYY` strings. Blank values count as
    /// absent.
    ///
    /// - neither present: `Ok(None)`, i.e. no filter
    /// - exactly one present: error
    /// - both present: each must be a real calendar date, and `end` must not
    ///   precede `start`
    pub fn parse(
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Option<Self>, String> {
        let start = start.map(str::trim).filter(|s| !s.is_empty());
        let end = end.map(str::trim).filter(|s| !s.is_empty());

        match (start, end) {
            (None, None) => Ok(None),
            (Some(_), None) | (None, Some(_)) => {
                Err("Please provide both a start and an end date".to_string())
            }
            (Some(start), Some(end)) => {
                let start = parse_day(start, "start")?;
                let end = parse_day(end, "end")?;
                Self::from_days(start, end).map(Some)
            }
        }
    }

    pub fn from_days(
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<Self, String> {
        let start = first.and_time(NaiveTime::MIN).and_utc();
        let end = last
            .and_hms_micro_opt(23, 59, 59, 999_999)
            .ok_or_else(|| "Invalid end date".to_string())?
            .and_utc();
        if end < start {
            return Err("End date must not be before start date".to_string());
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> { self.start }

    pub fn end(&self) -> DateTime<Utc> { self.end }

    /// e.g. `2025-12-12_00-00-00_to_2025-12-20_23-59-59_UTC`
    pub fn file_label(&self) -> String {
        const STAMP: &str = "%Y-%m-%d_%H-%M-%S";
        format!(
            "{}_to_{}_UTC",
            self.start.format(STAMP),
            self.end.format(STAMP)
        )
    }

    /// e.g. `2025-12-12 00:00:00 to 2025-12-20 23:59:59 UTC`
    pub fn describe(&self) -> String {
        const STAMP: &str = "%Y-%m-%d %H:%M:%S";
        format!(
            "{} to {} UTC",
            self.start.format(STAMP),
            self.end.format(STAMP)
        )
    }
}

/// `%Y` alone also takes signed and short years, so the exact `DD/MM/YYYY`
/// shape is checked first.
fn parse_day(
    value: &str,
    field: &str,
) -> Result<NaiveDate, String> {
    let invalid = || format!("Invalid {field} date: expected a real date as DD/MM/YYYY");

    let shaped = value.len() == 10
        && value.bytes().enumerate().all(|(i, b)| match i {
            2 | 5 => b == b'/',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| invalid())
}
