use std::collections::HashMap;

use crate::record::EventRecord;

/// Keep only the latest record for every EPC.
///
/// Output preserves the order in which each EPC was first seen. A later record replaces
/// the kept one only when its timestamp is strictly greater, so on a tie the first
/// occurrence survives.
pub fn latest_per_epc(records: Vec<EventRecord>) -> Vec<EventRecord> {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut latest: Vec<EventRecord> = Vec::new();

    for record in records {
        match positions.get(&record.epc) {
            Some(&i) => {
                if record.timestamp > latest[i].timestamp {
                    latest[i] = record;
                }
            }
            None => {
                positions.insert(record.epc.clone(), latest.len());
                latest.push(record);
            }
        }
    }

    latest
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn record(sequence: &str, epc: &str, hour: u32) -> EventRecord {
        EventRecord {
            sequence: sequence.to_string(),
            barcode: String::new(),
            epc: epc.to_string(),
            tid: format!("T-{epc}"),
            user_memory: String::new(),
            access_password: "00000000".to_string(),
            write_success: "1".to_string(),
            read_success: "1".to_string(),
            lock_status: "0".to_string(),
            strength: "-50".to_string(),
            timestamp: ts(hour),
            count: "1".to_string(),
        }
    }

    #[test]
    fn test_keeps_latest_per_epc() {
        let out = latest_per_epc(vec![
            record("1", "E1", 8),
            record("2", "E2", 9),
            record("3", "E1", 10),
            record("4", "E1", 7),
        ]);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].epc, "E1");
        assert_eq!(out[0].sequence, "3");
        assert_eq!(out[1].epc, "E2");
    }

    #[test]
    fn test_first_seen_wins_ties() {
        let out = latest_per_epc(vec![record("1", "E1", 8), record("2", "E1", 8)]);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].sequence, "1");
    }

    #[test]
    fn test_order_follows_first_occurrence() {
        let out = latest_per_epc(vec![
            record("1", "E3", 1),
            record("2", "E1", 1),
            record("3", "E2", 1),
            record("4", "E3", 5),
        ]);

        let epcs: Vec<&str> = out.iter().map(|r| r.epc.as_str()).collect();
        assert_eq!(epcs, vec!["E3", "E1", "E2"]);
    }

    #[test]
    fn test_retained_record_is_maximal_in_group() {
        let hours = [3, 11, 7, 11, 2, 9, 0, 4];
        let input: Vec<EventRecord> = hours
            .iter()
            .enumerate()
            .map(|(i, h)| record(&i.to_string(), if i % 2 == 0 { "A" } else { "B" }, *h))
            .collect();

        let out = latest_per_epc(input.clone());

        assert_eq!(out.len(), 2);
        for kept in &out {
            assert!(input
                .iter()
                .filter(|r| r.epc == kept.epc)
                .all(|r| r.timestamp <= kept.timestamp));
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(latest_per_epc(vec![]).is_empty());
    }
}
