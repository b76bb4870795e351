//! @ai:module:intent Search docstrings supplied by an introspection tool and measure annotation coverage
//! @ai:module:layer application
//! @ai:module:public_api DocstringRecord, DocstringSource, ManifestSource, DocstringSearch, DocstringSearchOutcome, CoverageReport, check_coverage, require_coverage_target
//! @ai:module:depends_on annotation, aggregator, matcher, schema, error
//! @ai:module:stateless true

use crate::aggregator::SearchResults;
use crate::annotation::Comment;
use crate::error::{Error, Result};
use crate::matcher::scan_comments;
use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// @ai:intent One inspectable object and its docstring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocstringRecord {
    pub object_id: String,
    #[serde(default)]
    pub docstring: String,
    pub source_path: String,
    pub line_number: usize,
}

/// @ai:intent Capability to enumerate docstrings of objects outside plain source text
pub trait DocstringSource {
    /// @ai:intent Identifier recorded as `found_by` on every occurrence
    fn name(&self) -> &str;

    /// @ai:intent List every inspectable object with its docstring and location
    fn records(&self) -> Result<Vec<DocstringRecord>>;
}

/// @ai:intent Docstring records read from a YAML or JSON manifest file
#[derive(Debug, Clone)]
pub struct ManifestSource {
    path: PathBuf,
}

impl ManifestSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocstringSource for ManifestSource {
    fn name(&self) -> &str {
        "docstring"
    }

    /// @ai:effects fs:read
    fn records(&self) -> Result<Vec<DocstringRecord>> {
        let content = fs::read_to_string(&self.path).map_err(|e| Error::FileRead {
            path: self.path.clone(),
            source: e,
        })?;

        let is_json = self
            .path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(serde_yaml::from_str(&content)?)
        }
    }
}

/// @ai:intent Occurrences found in docstrings plus which objects carried any
#[derive(Debug, Clone, Default)]
pub struct DocstringSearchOutcome {
    pub results: SearchResults,
    pub annotated: Vec<String>,
    pub unannotated: Vec<String>,
}

impl DocstringSearchOutcome {
    pub fn total(&self) -> usize {
        self.annotated.len() + self.unannotated.len()
    }
}

/// @ai:intent Match configured tokens in docstrings, one docstring per comment
pub struct DocstringSearch<'a> {
    schema: &'a Schema,
}

impl<'a> DocstringSearch<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// @ai:intent Search every record of a source
    /// @ai:post every occurrence carries the object id and the verbatim docstring
    pub fn search(&self, source: &dyn DocstringSource) -> Result<DocstringSearchOutcome> {
        let mut outcome = DocstringSearchOutcome::default();

        for record in source.records()? {
            let docstring = record.docstring.trim();
            let comment = Comment::new(docstring, record.line_number);
            let occurrences: Vec<_> =
                scan_comments(&[comment], self.schema, &record.source_path, source.name())?
                    .into_iter()
                    .map(|occurrence| occurrence.with_object(&record.object_id, docstring))
                    .collect();

            if occurrences.is_empty() {
                tracing::debug!(object_id = %record.object_id, "No annotations found");
                outcome.unannotated.push(record.object_id);
            } else {
                tracing::debug!(
                    object_id = %record.object_id,
                    count = occurrences.len(),
                    "Annotations found"
                );
                outcome
                    .results
                    .add_file_results(&record.source_path, vec![occurrences]);
                outcome.annotated.push(record.object_id);
            }
        }

        Ok(outcome)
    }
}

/// @ai:intent Annotation coverage of a docstring search against its target
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    pub total: usize,
    pub annotated: usize,
    pub percent: f64,
    pub target: f64,
    pub unannotated: Vec<String>,
}

impl CoverageReport {
    pub fn passed(&self) -> bool {
        self.percent >= self.target
    }
}

/// @ai:intent Fail fast when coverage is requested without a configured target
/// @ai:effects pure
pub fn require_coverage_target(target: Option<f64>) -> Result<f64> {
    target.ok_or(Error::CoverageTargetMissing)
}

/// @ai:intent Compare the share of annotated objects with the configured target
/// @ai:post an empty search counts as fully covered
/// @ai:effects pure
pub fn check_coverage(outcome: &DocstringSearchOutcome, target: f64) -> CoverageReport {
    let total = outcome.total();
    let annotated = outcome.annotated.len();
    let percent = if total == 0 {
        100.0
    } else {
        annotated as f64 / total as f64 * 100.0
    };

    CoverageReport {
        total,
        annotated,
        percent,
        target,
        unannotated: outcome.unannotated.clone(),
    }
}
