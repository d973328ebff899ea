//! Fuzz target for collection input decoding and validation.
//!
//! This fuzzer tests that:
//! 1. Decoding arbitrary JSON into a CollectionInput never panics
//! 2. Validation of any decoded input never panics
//! 3. Inputs that pass validation can be created in an empty catalog

#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use catalog::model::CollectionInput;
use catalog::validation::validate_collection_input;
use catalog::{Catalog, MemoryStore, Status};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = serde_json::from_slice::<CollectionInput>(data) else {
        return;
    };

    if validate_collection_input(&input).is_err() {
        return;
    }

    let catalog = Catalog::new(Arc::new(MemoryStore::new()));
    let Ok(org) = catalog.upsert_organization("Fuzz Lab") else {
        return;
    };
    // Errors are fine (e.g. unresolvable state ids); panics are not.
    let _ = catalog.create_collection(&input, &org, Status::Draft, "fuzz");
});
