//! @ai:module:intent Merge per-file occurrences from all extractors and number grouped units
//! @ai:module:layer application
//! @ai:module:public_api SearchResults, line_units, LineUnits, KeyedEntry, group_by_key
//! @ai:module:depends_on annotation, schema
//! @ai:module:stateless false

use crate::annotation::{AnnotationData, Occurrence};
use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// @ai:intent Every occurrence found in a run, keyed by filename
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchResults {
    files: BTreeMap<String, Vec<Occurrence>>,
}

impl SearchResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// @ai:intent Merge the lists produced by each extractor for one file
    /// @ai:pre every occurrence in `per_extractor` belongs to `filename`
    /// @ai:post the file's list is ordered by line, ties kept in discovery order
    /// @ai:effects pure
    pub fn add_file_results(&mut self, filename: &str, per_extractor: Vec<Vec<Occurrence>>) {
        let found: Vec<Occurrence> = per_extractor.into_iter().flatten().collect();
        if found.is_empty() {
            return;
        }

        // No de-duplication: two extractors claiming the same file both report.
        let entry = self.files.entry(filename.to_string()).or_default();
        entry.extend(found);
        entry.sort_by_key(|occurrence| occurrence.line_number);
    }

    /// @ai:intent Iterate files and their occurrences in filename order
    pub fn files(&self) -> impl Iterator<Item = (&str, &[Occurrence])> {
        self.files
            .iter()
            .map(|(name, occurrences)| (name.as_str(), occurrences.as_slice()))
    }

    pub fn get(&self, filename: &str) -> Option<&[Occurrence]> {
        self.files.get(filename).map(Vec::as_slice)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn annotation_count(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// @ai:intent Number every unit that contains a grouped token, across all files
    /// @ai:post ids start at 1 and increase in filename then line order
    /// @ai:post ungrouped units carry no id
    /// @ai:effects pure
    pub fn assign_report_group_ids(&mut self, schema: &Schema) -> usize {
        let mut next_id = 0;

        for occurrences in self.files.values_mut() {
            let mut start = 0;
            while start < occurrences.len() {
                let line = occurrences[start].line_number;
                let end = occurrences[start..]
                    .iter()
                    .position(|occurrence| occurrence.line_number != line)
                    .map_or(occurrences.len(), |offset| start + offset);

                let unit = &mut occurrences[start..end];
                let grouped = unit
                    .iter()
                    .any(|occurrence| schema.group_for_token(&occurrence.annotation_token).is_some());
                let id = grouped.then(|| {
                    next_id += 1;
                    next_id
                });
                for occurrence in unit.iter_mut() {
                    occurrence.report_group_id = id;
                }

                start = end;
            }
        }

        next_id
    }
}

/// @ai:intent Split a file's occurrences into units sharing a starting line
/// @ai:example (lines [1, 1, 4, 10, 10]) -> [[1, 1], [4], [10, 10]]
pub fn line_units(occurrences: &[Occurrence]) -> LineUnits<'_> {
    LineUnits { rest: occurrences }
}

/// Iterator returned by [`line_units`].
pub struct LineUnits<'a> {
    rest: &'a [Occurrence],
}

impl<'a> Iterator for LineUnits<'a> {
    type Item = &'a [Occurrence];

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.rest.first()?;
        let len = self
            .rest
            .iter()
            .position(|occurrence| occurrence.line_number != first.line_number)
            .unwrap_or(self.rest.len());
        let (unit, rest) = self.rest.split_at(len);
        self.rest = rest;
        Some(unit)
    }
}

/// @ai:intent One unit of annotations indexed under the payload of its key token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyedEntry {
    pub filename: String,
    pub line_number: usize,
    pub fields: BTreeMap<String, AnnotationData>,
}

/// @ai:intent Index every unit holding `key_token` by that token's payload
///
/// Used by documentation consumers that describe one named thing per unit,
/// for example a feature toggle whose name is the payload of the key token.
/// A later unit with the same key payload replaces an earlier one.
pub fn group_by_key(results: &SearchResults, key_token: &str) -> BTreeMap<String, KeyedEntry> {
    let mut entries = BTreeMap::new();

    for (filename, occurrences) in results.files() {
        for unit in line_units(occurrences) {
            let Some(key) = unit
                .iter()
                .find(|occurrence| occurrence.annotation_token == key_token)
            else {
                continue;
            };

            let fields = unit
                .iter()
                .filter(|occurrence| occurrence.annotation_token != key_token)
                .map(|occurrence| {
                    (
                        occurrence.annotation_token.clone(),
                        occurrence.annotation_data.clone(),
                    )
                })
                .collect();

            entries.insert(
                key.annotation_data.to_string(),
                KeyedEntry {
                    filename: filename.to_string(),
                    line_number: key.line_number,
                    fields,
                },
            );
        }
    }

    entries
}
