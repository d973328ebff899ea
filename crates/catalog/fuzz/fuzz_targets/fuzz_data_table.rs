//! Fuzz target for delimited data table import.
//!
//! This fuzzer tests that the table reader:
//! 1. Never panics on malformed CSV
//! 2. Only returns tables that pass their own validation

#![no_main]

use libfuzzer_sys::fuzz_target;
use catalog::model::DataTable;

fuzz_target!(|data: &[u8]| {
    if let Ok(table) = DataTable::from_delimited(data) {
        assert!(table.validate().is_ok());
        assert_eq!(table.labels.len(), table.column_count());
        for row in &table.values {
            assert_eq!(row.len(), table.column_count());
        }
    }
});
