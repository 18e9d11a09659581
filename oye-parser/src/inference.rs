//! Turns human friendly utterances like "in 5 mins do X" or "at 9pm do Y"
//! into a description plus the instant the reminder must fire at.
//!
//! The parser is a pure function of `(utterance, now, tz)`: the current
//! instant and the caller's timezone are explicit inputs, there is no hidden
//! clock in here.

use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref STARTS_WITH_IN: Regex = Regex::new(
        r"^in (?P<amount>[0-9]+)\s*(?P<unit>[a-zA-Z]+) (?P<message>.*)$"
    )
    .unwrap();
    static ref ENDS_WITH_IN: Regex = Regex::new(
        r"^(?P<message>.*) in (?P<amount>[0-9]+)\s*(?P<unit>[a-zA-Z]+)$"
    )
    .unwrap();
    static ref STARTS_WITH_AT: Regex =
        Regex::new(r"^at (?P<when>[0-9.:\sampAMP]+) (?P<message>.*)$")
            .unwrap();
    static ref ENDS_WITH_AT: Regex =
        Regex::new(r"^(?P<message>.*) at (?P<when>[0-9.:\sampAMP]+)$")
            .unwrap();
    // Time literals: `hour[<sep>minutes][am|pm]` with `<sep>` one of
    // space, '.', ':'. The hour is deliberately not validated against the
    // 24h clock; an overshoot spills into the next day.
    static ref PARSE_TIME: Regex = Regex::new(
        r"^(?P<hour>[0-2]?[0-9])(\s|:|\.)?(?P<min>[0-5][0-9])?\s?(?P<am_pm>([ap]m|[AP]M))?"
    )
    .unwrap();
    static ref TIMEZONE: Regex =
        Regex::new(r"^(?P<sign>[+-])(?P<hours>[0-9]{2}):(?P<minutes>[0-9]{2})$")
            .unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceError {
    InferenceFailed(String),
    UnsupportedTimeUnit(String),
    AmountMustBeNumeric(String),
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::InferenceFailed(ref raw) => {
                write!(f, "could not infer a schedule from {raw:?}")
            }
            Self::UnsupportedTimeUnit(ref raw) => {
                write!(f, "{raw:?} is not a supported time unit")
            }
            Self::AmountMustBeNumeric(ref raw) => {
                write!(f, "expected a numeric amount, but got {raw:?}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Days,
    Hour,
    Minute,
    Second,
}

/// Map a unit spelling to its canonical unit. The accepted spellings are a
/// closed, case-sensitive set; anything else is rejected.
pub fn infer_time_unit(raw: &str) -> Result<TimeUnit, InferenceError> {
    match raw {
        "day" | "days" => Ok(TimeUnit::Days),
        "h" | "hour" | "hours" => Ok(TimeUnit::Hour),
        "m" | "min" | "mins" | "minute" | "minutes" => Ok(TimeUnit::Minute),
        "s" | "sec" | "secs" | "second" | "seconds" => Ok(TimeUnit::Second),
        _ => Err(InferenceError::UnsupportedTimeUnit(raw.to_string())),
    }
}

/// Build the duration for an `<amount><unit>` pair. Amounts that do not fit
/// an integer duration are rejected as non-numeric.
pub fn infer_delta(
    raw_amount: &str,
    raw_unit: &str,
) -> Result<Duration, InferenceError> {
    let amount: i64 = raw_amount.parse().map_err(|_| {
        InferenceError::AmountMustBeNumeric(raw_amount.to_string())
    })?;
    let unit = infer_time_unit(raw_unit)?;
    let delta = match unit {
        TimeUnit::Days => Duration::try_days(amount),
        TimeUnit::Hour => Duration::try_hours(amount),
        TimeUnit::Minute => Duration::try_minutes(amount),
        TimeUnit::Second => Duration::try_seconds(amount),
    };
    delta.ok_or_else(|| {
        InferenceError::AmountMustBeNumeric(raw_amount.to_string())
    })
}

/// Parse a UTC offset string: either `"Z"` or `sign hh:mm`, e.g. `"+02:00"`.
pub fn infer_timezone(raw: &str) -> Result<FixedOffset, InferenceError> {
    let seconds = if raw == "Z" {
        0
    } else {
        let caps = TIMEZONE.captures(raw).ok_or_else(|| {
            InferenceError::InferenceFailed(raw.to_string())
        })?;
        let hours: i32 = caps["hours"].parse().map_err(|_| {
            InferenceError::InferenceFailed(raw.to_string())
        })?;
        let minutes: i32 = caps["minutes"].parse().map_err(|_| {
            InferenceError::InferenceFailed(raw.to_string())
        })?;
        let magnitude = hours * 3600 + minutes * 60;
        if &caps["sign"] == "-" {
            -magnitude
        } else {
            magnitude
        }
    };
    FixedOffset::east_opt(seconds)
        .ok_or_else(|| InferenceError::InferenceFailed(raw.to_string()))
}

/// The description and instant inferred from one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inference {
    pub description: String,
    pub at: DateTime<Utc>,
}

type Matcher = fn(
    &str,
    DateTime<Utc>,
    FixedOffset,
) -> Result<Option<Inference>, InferenceError>;

/// Infer `(description, at)` from one free-text utterance.
///
/// The four patterns are tried in strict precedence order, returning on the
/// first match:
///
/// 1. `in <amount><unit> <description>`
/// 2. `<description> in <amount><unit>`
/// 3. `at <time> <description>`
/// 4. `<description> at <time>`
pub fn infer_schedule(
    utterance: &str,
    now: DateTime<Utc>,
    tz: FixedOffset,
) -> Result<Inference, InferenceError> {
    const MATCHERS: [Matcher; 4] = [
        starts_with_relative,
        ends_with_relative,
        starts_with_absolute,
        ends_with_absolute,
    ];

    for matcher in MATCHERS {
        if let Some(inference) = matcher(utterance, now, tz)? {
            log::debug!("inferred {inference:?} from {utterance:?}");
            return Ok(inference);
        }
    }
    Err(InferenceError::InferenceFailed(utterance.to_string()))
}

/// `in 3 mins ...`
fn starts_with_relative(
    raw: &str,
    now: DateTime<Utc>,
    _tz: FixedOffset,
) -> Result<Option<Inference>, InferenceError> {
    let Some(caps) = STARTS_WITH_IN.captures(raw) else {
        return Ok(None);
    };
    let delta = infer_delta(&caps["amount"], &caps["unit"])?;
    Ok(Some(Inference {
        description: caps["message"].to_string(),
        at: now + delta,
    }))
}

/// `... in 3 mins`
fn ends_with_relative(
    raw: &str,
    now: DateTime<Utc>,
    _tz: FixedOffset,
) -> Result<Option<Inference>, InferenceError> {
    let Some(caps) = ENDS_WITH_IN.captures(raw) else {
        return Ok(None);
    };
    let delta = infer_delta(&caps["amount"], &caps["unit"])?;
    Ok(Some(Inference {
        description: caps["message"].to_string(),
        at: now + delta,
    }))
}

/// `at 8.32am ...`
fn starts_with_absolute(
    raw: &str,
    now: DateTime<Utc>,
    tz: FixedOffset,
) -> Result<Option<Inference>, InferenceError> {
    let Some(caps) = STARTS_WITH_AT.captures(raw) else {
        return Ok(None);
    };
    match infer_at_time(&caps["when"], now, tz) {
        Ok(at) => Ok(Some(Inference {
            description: caps["message"].to_string(),
            at,
        })),
        // An unparseable time literal means this pattern does not apply;
        // the next matcher gets its turn.
        Err(InferenceError::InferenceFailed(_)) => Ok(None),
        Err(err) => Err(err),
    }
}

/// `... at 8.32am`
fn ends_with_absolute(
    raw: &str,
    now: DateTime<Utc>,
    tz: FixedOffset,
) -> Result<Option<Inference>, InferenceError> {
    let Some(caps) = ENDS_WITH_AT.captures(raw) else {
        return Ok(None);
    };
    match infer_at_time(&caps["when"], now, tz) {
        Ok(at) => Ok(Some(Inference {
            description: caps["message"].to_string(),
            at,
        })),
        Err(InferenceError::InferenceFailed(_)) => Ok(None),
        Err(err) => Err(err),
    }
}

fn infer_at_time(
    raw: &str,
    now: DateTime<Utc>,
    tz: FixedOffset,
) -> Result<DateTime<Utc>, InferenceError> {
    let caps = PARSE_TIME
        .captures(raw)
        .ok_or_else(|| InferenceError::InferenceFailed(raw.to_string()))?;

    let mut hours: i64 = caps["hour"]
        .parse()
        .map_err(|_| InferenceError::InferenceFailed(raw.to_string()))?;
    let minutes: i64 = match caps.name("min") {
        Some(min) => min
            .as_str()
            .parse()
            .map_err(|_| InferenceError::InferenceFailed(raw.to_string()))?,
        None => 0,
    };
    if let Some(am_pm) = caps.name("am_pm") {
        if am_pm.as_str().eq_ignore_ascii_case("pm") {
            hours += 12;
        }
    }

    // There is no rollover to tomorrow when the computed time already
    // passed today.
    start_of_day(now, tz)
        .map(|midnight| {
            midnight + Duration::hours(hours) + Duration::minutes(minutes)
        })
        .ok_or_else(|| InferenceError::InferenceFailed(raw.to_string()))
}

fn start_of_day(
    now: DateTime<Utc>,
    tz: FixedOffset,
) -> Option<DateTime<Utc>> {
    let midnight =
        now.with_timezone(&tz).date_naive().and_hms_opt(0, 0, 0)?;
    Some(midnight.and_local_timezone(tz).single()?.with_timezone(&Utc))
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;
    use test_case::test_case;

    fn utc(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    fn frozen_now() -> DateTime<Utc> {
        utc("2020-02-03T04:05:06Z")
    }

    fn utc_tz() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test_case("day" => TimeUnit::Days)]
    #[test_case("days" => TimeUnit::Days)]
    #[test_case("h" => TimeUnit::Hour)]
    #[test_case("hour" => TimeUnit::Hour)]
    #[test_case("hours" => TimeUnit::Hour)]
    #[test_case("m" => TimeUnit::Minute)]
    #[test_case("min" => TimeUnit::Minute)]
    #[test_case("mins" => TimeUnit::Minute)]
    #[test_case("minute" => TimeUnit::Minute)]
    #[test_case("minutes" => TimeUnit::Minute)]
    #[test_case("s" => TimeUnit::Second)]
    #[test_case("sec" => TimeUnit::Second)]
    #[test_case("secs" => TimeUnit::Second)]
    #[test_case("second" => TimeUnit::Second)]
    #[test_case("seconds" => TimeUnit::Second)]
    fn test_infer_time_unit(raw: &str) -> TimeUnit {
        infer_time_unit(raw).unwrap()
    }

    #[test_case("M" ; "uppercase spelling")]
    #[test_case("MIN" ; "uppercase word")]
    #[test_case("moment" ; "unknown word")]
    #[test_case("" ; "empty")]
    fn test_infer_time_unit_rejects_unknown_spellings(raw: &str) {
        assert_eq!(
            infer_time_unit(raw),
            Err(InferenceError::UnsupportedTimeUnit(raw.to_string()))
        );
    }

    #[test_case("5", "m" => Duration::minutes(5))]
    #[test_case("0", "s" => Duration::seconds(0))]
    #[test_case("2", "days" => Duration::days(2))]
    #[test_case("3", "hours" => Duration::hours(3))]
    fn test_infer_delta(raw_amount: &str, raw_unit: &str) -> Duration {
        infer_delta(raw_amount, raw_unit).unwrap()
    }

    #[test_case("abc" ; "not a number")]
    #[test_case("5.5" ; "not an integer")]
    #[test_case("99999999999999999999" ; "does not fit an integer")]
    fn test_infer_delta_rejects_non_numeric_amounts(raw_amount: &str) {
        assert_eq!(
            infer_delta(raw_amount, "m"),
            Err(InferenceError::AmountMustBeNumeric(raw_amount.to_string()))
        );
    }

    #[test]
    fn test_infer_delta_rejects_overflowing_durations() {
        let raw = i64::MAX.to_string();
        assert_eq!(
            infer_delta(&raw, "days"),
            Err(InferenceError::AmountMustBeNumeric(raw))
        );
    }

    #[test_case("Z" => 0)]
    #[test_case("+00:00" => 0)]
    #[test_case("+02:00" => 2 * 3600)]
    #[test_case("-01:30" => -(3600 + 30 * 60))]
    #[test_case("+05:45" => 5 * 3600 + 45 * 60)]
    fn test_infer_timezone(raw: &str) -> i32 {
        infer_timezone(raw).unwrap().local_minus_utc()
    }

    #[test_case("UTC")]
    #[test_case("z")]
    #[test_case("+2:00")]
    #[test_case("02:00")]
    #[test_case("+02:00:00")]
    #[test_case("")]
    fn test_infer_timezone_rejects_other_forms(raw: &str) {
        assert_eq!(
            infer_timezone(raw),
            Err(InferenceError::InferenceFailed(raw.to_string()))
        );
    }

    // Symmetry: prefix and suffix relative forms infer the same instant
    // and the same description.
    #[test_case("in 1 m do stuff", "2020-02-03T04:06:06Z")]
    #[test_case("do stuff in 1 m", "2020-02-03T04:06:06Z")]
    #[test_case("in 1m do stuff", "2020-02-03T04:06:06Z")]
    #[test_case("do stuff in 1m", "2020-02-03T04:06:06Z")]
    #[test_case("in 1 min do stuff", "2020-02-03T04:06:06Z")]
    #[test_case("do stuff in 1 min", "2020-02-03T04:06:06Z")]
    #[test_case("in 2 mins do stuff", "2020-02-03T04:07:06Z")]
    #[test_case("do stuff in 2mins", "2020-02-03T04:07:06Z")]
    #[test_case("in 3 hours do stuff", "2020-02-03T07:05:06Z")]
    #[test_case("do stuff in 2 days", "2020-02-05T04:05:06Z")]
    #[test_case("in 30s do stuff", "2020-02-03T04:05:36Z")]
    #[test_case("do stuff in 0s", "2020-02-03T04:05:06Z")]
    fn test_infer_relative(raw: &str, expected: &str) {
        let inference =
            infer_schedule(raw, frozen_now(), utc_tz()).unwrap();
        assert_eq!(inference.description, "do stuff");
        assert_eq!(inference.at, utc(expected));
    }

    #[test]
    fn test_infer_five_minute_reminder_end_to_end() {
        let inference =
            infer_schedule("say hi in 5 mins", frozen_now(), utc_tz())
                .unwrap();
        assert_eq!(inference.description, "say hi");
        assert_eq!(inference.at, utc("2020-02-03T04:10:06Z"));
    }

    // Absolute forms, covering the separator grid the time literal
    // grammar accepts. `now` is frozen early in the day so every literal
    // lands on the same calendar day.
    #[test_case("at 9" => "2020-02-03T09:00:00Z" ; "only hours")]
    #[test_case("at 17" => "2020-02-03T17:00:00Z" ; "only hours 24h clock")]
    #[test_case("at 5am" => "2020-02-03T05:00:00Z" ; "am")]
    #[test_case("at 5pm" => "2020-02-03T17:00:00Z" ; "pm")]
    #[test_case("at 5AM" => "2020-02-03T05:00:00Z" ; "am uppercase")]
    #[test_case("at 5PM" => "2020-02-03T17:00:00Z" ; "pm uppercase")]
    #[test_case("at 9:01" => "2020-02-03T09:01:00Z" ; "colon separator")]
    #[test_case("at 17:23" => "2020-02-03T17:23:00Z" ; "colon 24h clock")]
    #[test_case("at 5:42pm" => "2020-02-03T17:42:00Z" ; "colon pm")]
    #[test_case("at 5:11AM" => "2020-02-03T05:11:00Z" ; "colon am uppercase")]
    #[test_case("at 9.15" => "2020-02-03T09:15:00Z" ; "dot separator")]
    #[test_case("at 5.42PM" => "2020-02-03T17:42:00Z" ; "dot pm uppercase")]
    #[test_case("at 9 01" => "2020-02-03T09:01:00Z" ; "space separator")]
    #[test_case("at 5 42pm" => "2020-02-03T17:42:00Z" ; "space pm")]
    #[test_case("at 5 11AM" => "2020-02-03T05:11:00Z" ; "space am uppercase")]
    fn test_infer_absolute(raw: &str) -> String {
        let now = utc("2020-02-03T01:01:06Z");

        let prefixed =
            infer_schedule(&format!("{raw} do foo"), now, utc_tz()).unwrap();
        assert_eq!(prefixed.description, "do foo");

        let suffixed =
            infer_schedule(&format!("do foo {raw}"), now, utc_tz()).unwrap();
        assert_eq!(suffixed.description, "do foo");
        assert_eq!(suffixed.at, prefixed.at);

        prefixed.at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    }

    // 5pm, 17:00, 5.00pm and "5 00 pm" are the same instant.
    #[test]
    fn test_equivalent_time_literals_infer_the_same_instant() {
        let now = utc("2020-02-03T01:01:06Z");
        let expected = utc("2020-02-03T17:00:00Z");
        for raw in ["5pm", "17:00", "5.00pm", "5 00 pm"] {
            let inference =
                infer_schedule(&format!("do foo at {raw}"), now, utc_tz())
                    .unwrap();
            assert_eq!(inference.at, expected, "literal {raw:?}");
        }
    }

    #[test]
    fn test_absolute_time_is_anchored_to_the_callers_timezone() {
        let now = utc("2020-02-03T01:01:06Z");
        let tz = infer_timezone("+02:00").unwrap();
        // Start of day in +02:00 is 2020-02-02T22:00:00Z.
        let inference =
            infer_schedule("at 9 do foo", now, tz).unwrap();
        assert_eq!(inference.at, utc("2020-02-03T07:00:00Z"));
    }

    #[test]
    fn test_absolute_hour_is_not_range_checked() {
        // Hour 29 spills into the next day instead of being rejected.
        let now = utc("2020-02-03T01:01:06Z");
        let inference =
            infer_schedule("at 29 do foo", now, utc_tz()).unwrap();
        assert_eq!(inference.at, utc("2020-02-04T05:00:00Z"));
    }

    #[test]
    fn test_absolute_time_in_the_past_does_not_roll_over() {
        let now = utc("2020-02-03T22:00:00Z");
        let inference =
            infer_schedule("at 5am do foo", now, utc_tz()).unwrap();
        assert_eq!(inference.at, utc("2020-02-03T05:00:00Z"));
    }

    #[test]
    fn test_relative_precedence_beats_absolute() {
        // "in" is tried before "at": a prefix relative match wins even if
        // the utterance also ends with an absolute pattern.
        let now = frozen_now();
        let inference =
            infer_schedule("in 5 mins meet at 9", now, utc_tz()).unwrap();
        assert_eq!(inference.description, "meet at 9");
        assert_eq!(inference.at, now + Duration::minutes(5));
    }

    #[test]
    fn test_unsupported_unit_propagates_from_a_matched_pattern() {
        assert_eq!(
            infer_schedule("in 5 moments do foo", frozen_now(), utc_tz()),
            Err(InferenceError::UnsupportedTimeUnit("moments".to_string()))
        );
    }

    #[test_case("" ; "empty")]
    #[test_case("do foo" ; "no pattern at all")]
    #[test_case("at some point do foo" ; "at with no time literal")]
    #[test_case("in five mins do foo" ; "spelled out amount")]
    fn test_infer_schedule_fails_when_nothing_matches(raw: &str) {
        assert_eq!(
            infer_schedule(raw, frozen_now(), utc_tz()),
            Err(InferenceError::InferenceFailed(raw.to_string()))
        );
    }

    #[test]
    fn test_inference_is_pure() {
        let now = Utc.with_ymd_and_hms(2020, 2, 3, 4, 5, 6).unwrap();
        let first =
            infer_schedule("say hi in 5 mins", now, utc_tz()).unwrap();
        let second =
            infer_schedule("say hi in 5 mins", now, utc_tz()).unwrap();
        assert_eq!(first, second);
    }
}
