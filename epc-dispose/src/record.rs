use chrono::NaiveDateTime;

/// Number of columns in a processed-events row.
pub const FIELD_COUNT: usize = 12;

/// Header written at the top of every dispose file.
pub const HEADER: [&str; FIELD_COUNT] = [
    "序号",
    "条码",
    "EPC",
    "TID",
    "用户区",
    "密匙",
    "写码成功",
    "读码成功",
    "EPC锁定",
    "强度/读距",
    "时间",
    "计数",
];

/// Accepted timestamp layouts, tried in order.
///
/// chrono accepts one or two digits for month, day and hour when parsing, so a single
/// layout covers both the padded and unpadded variants exported by the readers.
const TIMESTAMP_FORMATS: [&str; 5] = [
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
];

/// Layout used when writing timestamps back out. Parses with the first accepted layout.
pub const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y/%-m/%-d %-H:%M:%S";

/// A single row of the processed-events export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub sequence: String,
    pub barcode: String,
    pub epc: String,
    pub tid: String,
    pub user_memory: String,
    pub access_password: String,
    pub write_success: String,
    pub read_success: String,
    pub lock_status: String,
    pub strength: String,
    pub timestamp: NaiveDateTime,
    pub count: String,
}

impl EventRecord {
    /// The record as output columns, in header order.
    pub fn to_fields(&self) -> [String; FIELD_COUNT] {
        [
            self.sequence.clone(),
            self.barcode.clone(),
            self.epc.clone(),
            self.tid.clone(),
            self.user_memory.clone(),
            self.access_password.clone(),
            self.write_success.clone(),
            self.read_success.clone(),
            self.lock_status.clone(),
            self.strength.clone(),
            format_timestamp(&self.timestamp),
            self.count.clone(),
        ]
    }
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(OUTPUT_TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_parse_timestamp_accepted_layouts() {
        let cases = vec![
            ("2024/3/5 9:07:01", at(2024, 3, 5, 9, 7, 1)),
            ("2024/03/05 09:07:01", at(2024, 3, 5, 9, 7, 1)),
            ("5/3/2024 09:07:01", at(2024, 3, 5, 9, 7, 1)),
            ("2024-03-05 09:07", at(2024, 3, 5, 9, 7, 0)),
            ("2024/3/5 9:07", at(2024, 3, 5, 9, 7, 0)),
            ("2024/3/5 19:07", at(2024, 3, 5, 19, 7, 0)),
        ];

        for (raw, expected) in cases {
            assert_eq!(parse_timestamp(raw), Some(expected), "{raw}");
        }
    }

    #[test]
    fn test_parse_timestamp_with_fraction() {
        let parsed = parse_timestamp("2024-03-05 09:07:01.12345").unwrap();
        assert_eq!(
            parsed,
            at(2024, 3, 5, 9, 7, 1) + chrono::Duration::microseconds(123_450)
        );
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2024-03-05T09:07:01Z"), None);
        assert_eq!(parse_timestamp("2024/13/05 09:07:01"), None);
    }

    #[test]
    fn test_format_timestamp_is_unpadded() {
        assert_eq!(format_timestamp(&at(2024, 3, 5, 9, 7, 1)), "2024/3/5 9:07:01");
        assert_eq!(
            format_timestamp(&at(2024, 12, 25, 23, 59, 59)),
            "2024/12/25 23:59:59"
        );
    }

    #[test]
    fn test_formatted_timestamp_parses_back() {
        let ts = at(2023, 1, 9, 0, 0, 5);
        assert_eq!(parse_timestamp(&format_timestamp(&ts)), Some(ts));
    }
}
