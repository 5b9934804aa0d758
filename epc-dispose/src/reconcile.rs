use std::collections::HashSet;

use crate::record::EventRecord;

/// EPCs in `reference` that are absent from `records`, sorted.
pub fn missing_epcs(reference: &HashSet<String>, records: &[EventRecord]) -> Vec<String> {
    let produced: HashSet<&str> = records.iter().map(|r| r.epc.as_str()).collect();

    let mut missing: Vec<String> = reference
        .iter()
        .filter(|epc| !produced.contains(epc.as_str()))
        .cloned()
        .collect();
    missing.sort();
    missing
}
