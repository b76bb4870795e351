//! @ai:module:intent Library for finding and linting annotations embedded in code comments
//! @ai:module:layer infrastructure
//! @ai:module:public_api schema, extractor, matcher, validator, aggregator, search, docstring, config, report, output, error
//! @ai:module:stateless true
//!
//! # Code Annotations
//!
//! Finds structured markers such as `.. pii::` or `.. no_pii::` inside source
//! comments, captures their payloads, and checks them against a configurable
//! schema of tokens, choice sets and groups.
//!
//! ## Example
//!
//! ```rust,no_run
//! use code_annotations::{AnnotationConfig, ConfigOverrides, StaticSearch, Validator, ValidatorTrait};
//! use code_annotations::output::{format_lint_result, OutputFormat};
//! use std::path::Path;
//!
//! let config = AnnotationConfig::load(Path::new(".annotations"), ConfigOverrides::default()).unwrap();
//! let results = StaticSearch::new(&config).unwrap().search().unwrap();
//!
//! let lint = Validator::new(&config.schema).check_results(&results);
//! println!("{}", format_lint_result(&lint, OutputFormat::Text));
//! ```

pub mod aggregator;
pub mod annotation;
pub mod config;
pub mod docstring;
pub mod error;
pub mod extractor;
pub mod language;
pub mod matcher;
pub mod output;
pub mod report;
pub mod schema;
pub mod search;
pub mod validator;

pub use aggregator::{group_by_key, line_units, KeyedEntry, SearchResults};
pub use annotation::{AnnotationData, Comment, Occurrence};
pub use config::{AnnotationConfig, ConfigOverrides, DEFAULT_CONFIG_FILE};
pub use docstring::{
    check_coverage, require_coverage_target, CoverageReport, DocstringRecord, DocstringSearch, DocstringSource,
    ManifestSource,
};
pub use error::{Error, Result};
pub use extractor::{build_extractor, extractor_names, CommentExtractor, Extractor, PlaintextExtractor};
pub use language::Language;
pub use matcher::{find_annotations, scan_comments, split_choices, TokenMatch};
pub use output::{format_coverage, format_lint_result, format_search_results, to_json, OutputFormat};
pub use report::{YamlReporter, YamlReporterTrait};
pub use schema::{AnnotationTokenSpec, Group, Schema, SchemaEntry, TokenDecl, TokenKind, TokenShape};
pub use search::StaticSearch;
pub use validator::{LintResult, ValidationError, ValidationErrorKind, Validator, ValidatorTrait};
