use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use envconfig::Envconfig;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "INPUT_PATH")]
    pub input_path: PathBuf,

    #[envconfig(from = "REFERENCE_PATH")]
    pub reference_path: PathBuf,

    #[envconfig(from = "UPLOAD_URL")]
    pub upload_url: NonEmptyString,

    #[envconfig(from = "API_KEY")]
    pub api_key: NonEmptyString,

    #[envconfig(from = "BATCH_SIZE", default = "500")]
    pub batch_size: NonZeroUsize,

    #[envconfig(from = "REQUEST_TIMEOUT_MS", default = "30000")]
    pub request_timeout: EnvMsDuration,

    // "local" or an IANA zone name, e.g. Asia/Shanghai
    #[envconfig(from = "SOURCE_TIMEZONE", default = "local")]
    pub source_timezone: SourceTimezone,
}

#[derive(Debug, Clone, Copy)]
pub struct EnvMsDuration(pub time::Duration);

#[derive(Debug, PartialEq, Eq)]
pub struct ParseEnvMsDurationError;

impl FromStr for EnvMsDuration {
    type Err = ParseEnvMsDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ms = s.parse::<u64>().map_err(|_| ParseEnvMsDurationError)?;

        Ok(EnvMsDuration(time::Duration::from_millis(ms)))
    }
}

#[derive(Debug, Clone)]
pub struct NonEmptyString(pub String);

impl NonEmptyString {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct StringIsEmptyError;

impl FromStr for NonEmptyString {
    type Err = StringIsEmptyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            Err(StringIsEmptyError)
        } else {
            Ok(NonEmptyString(s.to_owned()))
        }
    }
}

/// The zone the reader wrote its (naive) timestamps in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTimezone {
    Local,
    Named(chrono_tz::Tz),
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseSourceTimezoneError(pub String);

impl FromStr for SourceTimezone {
    type Err = ParseSourceTimezoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("local") {
            return Ok(SourceTimezone::Local);
        }
        s.parse::<chrono_tz::Tz>()
            .map(SourceTimezone::Named)
            .map_err(|_| ParseSourceTimezoneError(s.to_owned()))
    }
}

impl SourceTimezone {
    /// Interpret `naive` as wall-clock time in this zone and convert it to UTC.
    ///
    /// An ambiguous local time resolves to the earlier instant. A local time skipped by a
    /// DST transition has no instant at all and is taken as UTC unchanged.
    pub fn to_utc(&self, naive: &NaiveDateTime) -> DateTime<Utc> {
        let localized = match self {
            SourceTimezone::Local => Local
                .from_local_datetime(naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
            SourceTimezone::Named(tz) => tz
                .from_local_datetime(naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
        };
        localized.unwrap_or_else(|| naive.and_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn required() -> HashMap<String, String> {
        HashMap::from([
            ("INPUT_PATH".to_string(), "/data/events.csv".to_string()),
            ("REFERENCE_PATH".to_string(), "/data/reference.xlsx".to_string()),
            ("UPLOAD_URL".to_string(), "http://localhost:8080/tags".to_string()),
            ("API_KEY".to_string(), "secret".to_string()),
        ])
    }

    #[test]
    fn test_defaults() {
        let config = Config::init_from_hashmap(&required()).unwrap();

        assert_eq!(config.input_path, PathBuf::from("/data/events.csv"));
        assert_eq!(config.batch_size.get(), 500);
        assert_eq!(config.request_timeout.0, time::Duration::from_secs(30));
        assert_eq!(config.source_timezone, SourceTimezone::Local);
        assert_eq!(config.api_key.as_str(), "secret");
    }

    #[test]
    fn test_missing_api_key_is_rejected() {
        let mut env = required();
        env.remove("API_KEY");
        assert!(Config::init_from_hashmap(&env).is_err());

        env.insert("API_KEY".to_string(), "  ".to_string());
        assert!(Config::init_from_hashmap(&env).is_err());
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let mut env = required();
        env.insert("BATCH_SIZE".to_string(), "0".to_string());
        assert!(Config::init_from_hashmap(&env).is_err());
    }

    #[test]
    fn test_parse_source_timezone() {
        assert_eq!("LOCAL".parse(), Ok(SourceTimezone::Local));
        assert_eq!(
            "Asia/Shanghai".parse(),
            Ok(SourceTimezone::Named(chrono_tz::Asia::Shanghai))
        );
        assert!("Mars/Olympus".parse::<SourceTimezone>().is_err());
    }

    #[test]
    fn test_to_utc_named_zone() {
        let naive = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(9, 7, 1)
            .unwrap();
        let utc = SourceTimezone::Named(chrono_tz::Asia::Shanghai).to_utc(&naive);

        assert_eq!(utc.naive_utc(), naive - chrono::Duration::hours(8));
    }

    #[test]
    fn test_to_utc_skipped_local_time_is_kept() {
        // 02:30 does not exist in New York on the spring-forward date.
        let naive = NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        let utc = SourceTimezone::Named(chrono_tz::America::New_York).to_utc(&naive);

        assert_eq!(utc.naive_utc(), naive);
    }
}
