//! Content checks run before anything is written.
//!
//! Every problem found in a submission is collected and reported together in
//! a single [`CatalogError::Validation`].

use std::collections::HashSet;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CatalogError, Result};
use crate::model::{CollectionInput, RecordContent, RecordInput, Reference, State};

static DOI_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^10\.\d{4,9}/\S+$").unwrap());

/// Check whether a string looks like a DOI, e.g. `10.1103/PhysRevA.1.1`.
pub fn is_valid_doi(doi: &str) -> bool {
    DOI_PATTERN.is_match(doi.trim())
}

/// Validate a standalone Record submission.
pub fn validate_record_input(input: &RecordInput) -> Result<()> {
    let mut issues = Vec::new();
    check_states(&input.states, &mut issues);
    check_references(&input.references, &mut issues);
    check_content(&input.content, &input.states, &input.references, "record", &mut issues);
    into_result(issues)
}

/// Validate a Collection submission, including every member.
pub fn validate_collection_input(input: &CollectionInput) -> Result<()> {
    let mut issues = Vec::new();

    if input.name.trim().is_empty() {
        issues.push("collection name must not be empty".to_string());
    }

    check_states(&input.states, &mut issues);
    check_references(&input.references, &mut issues);

    if let Some(local) = &input.published_in {
        if !input.references.contains_key(local) {
            issues.push(format!("collection: unknown reference '{}'", local));
        }
    }

    let mut seen = HashSet::new();
    for (i, member) in input.processes.iter().enumerate() {
        if let Some(id) = &member.id {
            if !seen.insert(id.as_str()) {
                issues.push(format!("duplicate member id '{}'", id));
            }
        }
        let label = format!("process {}", i);
        check_content(&member.content, &input.states, &input.references, &label, &mut issues);
    }

    into_result(issues)
}

fn check_states(states: &IndexMap<String, State>, issues: &mut Vec<String>) {
    for (local, state) in states {
        if state.particle.trim().is_empty() {
            issues.push(format!("state '{}' has an empty particle", local));
        }
        for level in &state.electronic {
            if level.label.trim().is_empty() {
                issues.push(format!("state '{}' has an unlabelled electronic level", local));
            }
        }
    }
}

fn check_references(references: &IndexMap<String, Reference>, issues: &mut Vec<String>) {
    for (local, reference) in references {
        if let Some(doi) = &reference.doi {
            if !is_valid_doi(doi) {
                issues.push(format!("reference '{}' has malformed DOI '{}'", local, doi));
            }
        }
    }
}

fn check_content(
    content: &RecordContent,
    states: &IndexMap<String, State>,
    references: &IndexMap<String, Reference>,
    label: &str,
    issues: &mut Vec<String>,
) {
    let reaction = &content.reaction;
    if reaction.lhs.is_empty() {
        issues.push(format!("{}: reaction has no reactants", label));
    }
    for entry in reaction.lhs.iter().chain(reaction.rhs.iter()) {
        if entry.count == 0 {
            issues.push(format!("{}: state '{}' has count 0", label, entry.state));
        }
    }
    for state in reaction.state_ids() {
        if !states.contains_key(state) {
            issues.push(format!("{}: unknown state '{}'", label, state));
        }
    }
    for reference in &content.references {
        if !references.contains_key(reference) {
            issues.push(format!("{}: unknown reference '{}'", label, reference));
        }
    }
    if let Err(e) = content.data.validate() {
        issues.push(format!("{}: {}", label, e));
    }
}

fn into_result(issues: Vec<String>) -> Result<()> {
    if issues.is_empty() {
        Ok(())
    } else {
        Err(CatalogError::Validation(issues.join("; ")))
    }
}
