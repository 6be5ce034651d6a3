//! Local wall-clock primitives shared by the recurrence engine and the due
//! predicates. Every "local midnight" normalization and every calendar-day
//! difference goes through this module.

use crate::error::AppError;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const TIME_OF_DAY_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]");
const DUE_DATETIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

const SECONDS_PER_DAY: i64 = 86_400;

pub fn parse_date(value: &str) -> Result<Date, AppError> {
    Date::parse(value.trim(), DATE_FORMAT)
        .map_err(|_| AppError::invalid_data(format!("date must be YYYY-MM-DD: {value}")))
}

pub fn format_date(date: Date) -> Result<String, AppError> {
    date.format(DATE_FORMAT)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

pub fn parse_time_of_day(value: &str) -> Result<Time, AppError> {
    Time::parse(value.trim(), TIME_OF_DAY_FORMAT)
        .map_err(|_| AppError::invalid_data(format!("time of day must be HH:MM: {value}")))
}

pub fn parse_due_datetime(value: &str) -> Result<PrimitiveDateTime, AppError> {
    PrimitiveDateTime::parse(value.trim(), DUE_DATETIME_FORMAT).map_err(|_| {
        AppError::invalid_data(format!("due datetime must be YYYY-MM-DDTHH:MM:SS: {value}"))
    })
}

/// Combines a due date with a `HH:MM` time of day into the stored
/// `YYYY-MM-DDTHH:MM:00` form.
pub fn due_datetime_for(date: Date, time_of_day: &str) -> Result<String, AppError> {
    let time = parse_time_of_day(time_of_day)?;
    PrimitiveDateTime::new(date, time)
        .format(DUE_DATETIME_FORMAT)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

pub fn local_midnight(date: Date) -> PrimitiveDateTime {
    date.midnight()
}

/// Whole days in `duration`, rounded toward negative infinity.
pub fn floor_days(duration: Duration) -> i64 {
    duration.whole_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Signed number of calendar days from `from` to `to`.
pub fn calendar_days_between(from: Date, to: Date) -> i64 {
    floor_days(local_midnight(to) - local_midnight(from))
}

/// Day of week with Sunday = 0.
pub fn weekday_number(date: Date) -> u8 {
    date.weekday().number_days_from_sunday()
}

pub fn add_days(date: Date, days: i64) -> Result<Date, AppError> {
    days.checked_mul(SECONDS_PER_DAY)
        .map(Duration::seconds)
        .and_then(|offset| date.checked_add(offset))
        .ok_or_else(|| AppError::recurrence(format!("date out of range: {date} + {days} days")))
}

pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

pub fn local_now() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc().to_offset(local_offset());
    PrimitiveDateTime::new(now.date(), now.time())
}

pub fn today() -> Date {
    local_now().date()
}

#[cfg(test)]
mod tests {
    use super::{
        add_days, calendar_days_between, due_datetime_for, floor_days, format_date,
        local_midnight, parse_date, parse_due_datetime, parse_time_of_day, weekday_number,
    };
    use time::macros::{date, datetime, time};
    use time::Duration;

    #[test]
    fn parse_and_format_date() {
        let parsed = parse_date("2024-01-05").unwrap();
        assert_eq!(parsed, date!(2024 - 01 - 05));
        assert_eq!(format_date(parsed).unwrap(), "2024-01-05");
    }

    #[test]
    fn parse_date_rejects_other_shapes() {
        assert_eq!(parse_date("05/01/2024").unwrap_err().code(), "invalid_data");
        assert_eq!(parse_date("2024-02-30").unwrap_err().code(), "invalid_data");
    }

    #[test]
    fn parse_time_of_day_reads_hours_and_minutes() {
        assert_eq!(parse_time_of_day("09:30").unwrap(), time!(9:30));
        assert!(parse_time_of_day("25:00").is_err());
    }

    #[test]
    fn due_datetime_appends_zero_seconds() {
        let value = due_datetime_for(date!(2024 - 01 - 01), "10:00").unwrap();
        assert_eq!(value, "2024-01-01T10:00:00");
        assert_eq!(
            parse_due_datetime(&value).unwrap(),
            datetime!(2024-01-01 10:00)
        );
    }

    #[test]
    fn floor_days_rounds_toward_negative_infinity() {
        assert_eq!(floor_days(Duration::hours(36)), 1);
        assert_eq!(floor_days(Duration::hours(23)), 0);
        assert_eq!(floor_days(Duration::hours(-1)), -1);
        assert_eq!(floor_days(Duration::days(-2)), -2);
    }

    #[test]
    fn calendar_days_between_ignores_time_of_day() {
        let today = date!(2024 - 01 - 10);
        assert_eq!(calendar_days_between(today, today), 0);
        assert_eq!(calendar_days_between(today, date!(2024 - 01 - 09)), -1);
        assert_eq!(calendar_days_between(today, date!(2024 - 02 - 10)), 31);
    }

    #[test]
    fn local_midnight_drops_the_clock() {
        assert_eq!(
            local_midnight(date!(2024 - 01 - 01)),
            datetime!(2024-01-01 0:00)
        );
    }

    #[test]
    fn weekday_number_starts_on_sunday() {
        assert_eq!(weekday_number(date!(2024 - 01 - 07)), 0);
        assert_eq!(weekday_number(date!(2024 - 01 - 05)), 5);
        assert_eq!(weekday_number(date!(2024 - 01 - 06)), 6);
    }

    #[test]
    fn add_days_crosses_month_and_year() {
        assert_eq!(
            add_days(date!(2024 - 12 - 30), 3).unwrap(),
            date!(2025 - 01 - 02)
        );
        assert_eq!(
            add_days(date!(2024 - 02 - 28), 1).unwrap(),
            date!(2024 - 02 - 29)
        );
    }

    #[test]
    fn add_days_reports_overflow() {
        let err = add_days(time::Date::MAX, 1).unwrap_err();
        assert_eq!(err.code(), "recurrence_error");
    }

    #[test]
    fn add_days_reports_day_counts_too_large_for_a_duration() {
        for days in [i64::MAX, i64::MIN, i64::MAX / 86_400 + 1] {
            let err = add_days(date!(2024 - 01 - 10), days).unwrap_err();
            assert_eq!(err.code(), "recurrence_error");
        }
    }
}
