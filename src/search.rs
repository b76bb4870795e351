//! @ai:module:intent Walk a source tree and collect annotation occurrences from every claimed file
//! @ai:module:layer application
//! @ai:module:public_api StaticSearch
//! @ai:module:depends_on config, extractor, matcher, aggregator, error
//! @ai:module:stateless true

use crate::aggregator::SearchResults;
use crate::annotation::Occurrence;
use crate::config::AnnotationConfig;
use crate::error::{Error, Result};
use crate::extractor::{build_extractor, Extractor};
use crate::matcher::scan_comments;
use crate::schema::Schema;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

struct ConfiguredExtractor {
    extractor: Box<dyn Extractor>,
    extensions: Vec<String>,
}

impl ConfiguredExtractor {
    fn claims(&self, extension: &str) -> bool {
        self.extensions.iter().any(|claimed| claimed == extension)
    }
}

/// @ai:intent Search for annotations in the comments of source files
pub struct StaticSearch<'a> {
    schema: &'a Schema,
    source_path: &'a Path,
    /// Ordered by extractor name.
    extractors: Vec<ConfiguredExtractor>,
}

impl<'a> StaticSearch<'a> {
    /// @ai:intent Build the extractors named in configuration
    /// @ai:post extractors run in name order on every file they claim
    pub fn new(config: &'a AnnotationConfig) -> Result<Self> {
        let mut extractors = Vec::with_capacity(config.extensions.len());
        let mut unknown = Vec::new();

        for (name, extensions) in &config.extensions {
            let Some(extractor) = build_extractor(name)? else {
                unknown.push(name.clone());
                continue;
            };
            let extensions = match extensions {
                Some(extensions) => extensions.clone(),
                None => extractor
                    .default_extensions()
                    .iter()
                    .map(|ext| ext.to_string())
                    .collect(),
            };
            tracing::info!(extractor = name.as_str(), ?extensions, "Extractor loaded");
            extractors.push(ConfiguredExtractor {
                extractor,
                extensions,
            });
        }

        if !unknown.is_empty() {
            return Err(Error::UnknownExtractor(unknown));
        }

        Ok(Self {
            schema: &config.schema,
            source_path: &config.source_path,
            extractors,
        })
    }

    /// @ai:intent Search every claimed file under the source path
    /// @ai:post files are visited in sorted order; results are keyed by relative path
    /// @ai:effects fs:read
    pub fn search(&self) -> Result<SearchResults> {
        let mut results = SearchResults::new();

        for entry in WalkDir::new(self.source_path).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable path: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            self.search_file(entry.path(), &mut results)?;
        }

        Ok(results)
    }

    /// @ai:intent Search one file and merge its occurrences into `results`
    /// @ai:effects fs:read
    pub fn search_file(&self, path: &Path, results: &mut SearchResults) -> Result<()> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        if !self.extractors.iter().any(|configured| configured.claims(extension)) {
            tracing::trace!("{} is not a known extension, skipping ({}).", extension, path.display());
            return Ok(());
        }

        let text = fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let filename = self.relative_name(path);
        let per_extractor = self.search_text(&filename, extension, &text)?;
        results.add_file_results(&filename, per_extractor);
        Ok(())
    }

    /// @ai:intent Run every extractor claiming `extension` over already-read text
    /// @ai:post one occurrence list per claiming extractor, in extractor name order
    /// @ai:effects pure
    pub fn search_text(&self, filename: &str, extension: &str, text: &str) -> Result<Vec<Vec<Occurrence>>> {
        if !self.schema.contains_any_token(text) {
            return Ok(Vec::new());
        }

        self.extractors
            .iter()
            .filter(|configured| configured.claims(extension))
            .map(|configured| {
                let extractor = &configured.extractor;
                let comments = extractor.extract(text);
                scan_comments(&comments, self.schema, filename, extractor.name())
            })
            .collect()
    }

    /// Path relative to the source path, or the bare name for a single-file source.
    fn relative_name(&self, path: &Path) -> String {
        match path.strip_prefix(self.source_path) {
            Ok(relative) if !relative.as_os_str().is_empty() => relative.display().to_string(),
            _ => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        }
    }
}
