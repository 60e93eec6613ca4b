//! Selection stage: discovered candidates to a de-duplicated work set.

use std::collections::BTreeMap;

use arcgis_export_arcgis_models::{LayerDescriptor, LayerKey};

/// Layers to process, keyed by identity. Inserting a duplicate key
/// replaces the earlier descriptor.
pub type WorkSet = BTreeMap<LayerKey, LayerDescriptor>;

/// Token that selects every candidate.
pub const ALL_TOKEN: &str = "all";

/// Prompt shown before reading a selection.
pub const SELECTION_PROMPT: &str = "Enter comma-separated numbers (e.g., 1,3,4) or 'all'";

fn insert(work: &mut WorkSet, descriptor: &LayerDescriptor) {
    work.insert(descriptor.key(), descriptor.clone());
}

/// Adds every candidate, silently dropping repeated identities.
#[must_use]
pub fn select_all(candidates: &[LayerDescriptor]) -> WorkSet {
    let mut work = WorkSet::new();
    for descriptor in candidates {
        insert(&mut work, descriptor);
    }
    work
}

/// Parses an operator's selection against the numbered candidate list.
///
/// Accepts `all` (any case) or comma-separated 1-based indices. Entries
/// that are not numbers or fall outside the list are warned about and
/// ignored; an input with no valid entry yields an empty work set.
#[must_use]
pub fn parse_selection(input: &str, candidates: &[LayerDescriptor]) -> WorkSet {
    let input = input.trim();
    if input.eq_ignore_ascii_case(ALL_TOKEN) {
        return select_all(candidates);
    }

    let mut work = WorkSet::new();
    for entry in input.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        match entry.parse::<usize>() {
            Ok(index) if (1..=candidates.len()).contains(&index) => {
                insert(&mut work, &candidates[index - 1]);
            }
            Ok(index) => log::warn!("Invalid selection number {index}, skipping"),
            Err(_) => log::warn!("Invalid input '{entry}', skipping"),
        }
    }
    work
}

/// One line of the numbered candidate listing.
#[must_use]
pub fn listing_line(index: usize, descriptor: &LayerDescriptor) -> String {
    let mut line = format!(
        "{index}: {} (ID: {}, Type: {}, Geometry: {})",
        descriptor.name, descriptor.layer_id, descriptor.esri_type, descriptor.geometry_type
    );
    if let Some(path) = descriptor.breadcrumb() {
        line.push_str(" (Path: ");
        line.push_str(&path);
        line.push(')');
    }
    line
}
