//! @ai:module:intent Write search results to a timestamped YAML report
//! @ai:module:layer infrastructure
//! @ai:module:public_api YamlReporter, YamlReporterTrait, report_file_name
//! @ai:module:stateless true

use crate::aggregator::SearchResults;
use crate::error::Result;
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

/// @ai:intent Trait for YAML report generation
pub trait YamlReporterTrait: Send + Sync {
    /// @ai:intent Write results into `report_dir`, returning the report path
    fn generate(&self, results: &SearchResults, report_dir: &Path) -> Result<PathBuf>;
}

/// @ai:intent Report file name for a run started at `now`
/// @ai:example (2024-03-07 14:05:09) -> "2024-07-03-14-05-09.yaml"
pub fn report_file_name(now: DateTime<Local>) -> String {
    format!("{}.yaml", now.format("%Y-%d-%m-%H-%M-%S"))
}

/// @ai:intent Generates YAML reports keyed by filename
#[derive(Debug, Clone, Copy)]
pub struct YamlReporter {
    now: DateTime<Local>,
}

impl YamlReporter {
    /// @ai:intent Create a reporter stamping reports with the current time
    pub fn new() -> Self {
        Self::at(Local::now())
    }

    /// @ai:intent Create a reporter stamping reports with a fixed time
    pub fn at(now: DateTime<Local>) -> Self {
        Self { now }
    }
}

impl Default for YamlReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl YamlReporterTrait for YamlReporter {
    /// @ai:effects fs:write
    fn generate(&self, results: &SearchResults, report_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(report_dir)?;

        let path = report_dir.join(report_file_name(self.now));
        let yaml = serde_yaml::to_string(results)?;
        fs::write(&path, yaml)?;

        tracing::info!("Report written to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotationData, Occurrence};
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_report_file_name_puts_day_before_month() {
        let now = Local.with_ymd_and_hms(2024, 3, 7, 14, 5, 9).unwrap();
        assert_eq!(report_file_name(now), "2024-07-03-14-05-09.yaml");
    }

    #[test]
    fn test_generate_yaml_report() {
        let temp = TempDir::new().unwrap();
        let report_dir = temp.path().join("reports");

        let mut results = SearchResults::new();
        results.add_file_results(
            "foo/bar.py",
            vec![vec![Occurrence::new(
                "foo/bar.py",
                3,
                ".. pii_types::",
                AnnotationData::Choices(vec!["id".into(), "name".into()]),
                "python",
            )]],
        );

        let now = Local.with_ymd_and_hms(2024, 3, 7, 14, 5, 9).unwrap();
        let path = YamlReporter::at(now).generate(&results, &report_dir).unwrap();
        assert_eq!(path, report_dir.join("2024-07-03-14-05-09.yaml"));

        let written: SearchResults =
            serde_yaml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, results);
    }
}
