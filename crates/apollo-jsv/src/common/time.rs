use std::time::Duration;

use anyhow::anyhow;
use nom::character::complete::char;
use nom::combinator::{map_res, opt};
use nom::sequence::{preceded, tuple};
use serde::{Deserialize, Deserializer, Serializer};

use crate::common::parser::{NomResult, consume_all, p_u32};

/// Parses either humantime format (2h, 30m) or the scheduler format [[HH:]MM:]SS.
pub fn parse_hms_or_human_time(text: &str) -> anyhow::Result<Duration> {
    parse_hms_time(text)
        .or_else(|_| humantime::parse_duration(text))
        .map_err(|e| {
            anyhow!("Could not parse time limit. Use either `HH:MM:SS` or humantime format (2hours): {e:?}")
        })
}

fn p_hms_time(input: &str) -> NomResult<Duration> {
    map_res(
        tuple((
            p_u32,
            opt(preceded(char(':'), p_u32)),
            opt(preceded(char(':'), p_u32)),
        )),
        |parsed| match parsed {
            (seconds, None, None) => Ok(Duration::from_secs(seconds as u64)),
            (minutes, Some(seconds), None) => {
                Ok(Duration::from_secs(minutes as u64 * 60 + seconds as u64))
            }
            (hours, Some(minutes), Some(seconds)) => Ok(Duration::from_secs(
                hours as u64 * 3600 + minutes as u64 * 60 + seconds as u64,
            )),
            _ => Err(anyhow!("Invalid time specification")),
        },
    )(input)
}

/// Parses time strings in the format [[hh:]mm:]ss.
/// Individual time values may be zero padded.
pub fn parse_hms_time(input: &str) -> anyhow::Result<Duration> {
    consume_all(p_hms_time, input)
}

pub fn deserialize_human_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let buf = String::deserialize(deserializer)?;
    parse_hms_or_human_time(&buf).map_err(serde::de::Error::custom)
}

pub fn serialize_human_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*duration).to_string())
}

#[cfg(test)]
mod tests {
    use super::{parse_hms_or_human_time, parse_hms_time};

    #[test]
    fn parse_hms_seconds() {
        let duration = parse_hms_time("01").unwrap();
        assert_eq!(duration.as_secs(), 1);

        let duration = parse_hms_time("3600").unwrap();
        assert_eq!(duration.as_secs(), 3600);
    }

    #[test]
    fn parse_hms_minutes() {
        let duration = parse_hms_time("80:02").unwrap();
        assert_eq!(duration.as_secs(), 80 * 60 + 2);
    }

    #[test]
    fn parse_hms_hours() {
        let duration = parse_hms_time("02:03:04").unwrap();
        assert_eq!(duration.as_secs(), 2 * 3600 + 3 * 60 + 4);
    }

    #[test]
    fn parse_hms_error() {
        assert!(parse_hms_time("x").is_err());
        assert!(parse_hms_time("1:2:3:4").is_err());
    }

    #[test]
    fn parse_human_time() {
        assert_eq!(parse_hms_or_human_time("1h").unwrap().as_secs(), 3600);
        assert_eq!(parse_hms_or_human_time("01:00:00").unwrap().as_secs(), 3600);
        assert_eq!(parse_hms_or_human_time("90m").unwrap().as_secs(), 5400);
        assert!(parse_hms_or_human_time("soon").is_err());
    }
}
