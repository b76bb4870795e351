//! @ai:module:intent Load the YAML configuration file that drives a search
//! @ai:module:layer infrastructure
//! @ai:module:public_api AnnotationConfig, ConfigOverrides, DEFAULT_CONFIG_FILE
//! @ai:module:depends_on schema, extractor, error
//! @ai:module:stateless true

use crate::error::{Error, Result};
use crate::extractor::extractor_names;
use crate::schema::Schema;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration file read when none is given on the command line.
pub const DEFAULT_CONFIG_FILE: &str = ".annotations";

const REQUIRED_KEYS: [&str; 4] = ["report_path", "source_path", "annotations", "extensions"];

/// @ai:intent Values given on the command line that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub source_path: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
    pub verbosity: u8,
}

/// @ai:intent Fully validated configuration for one run
#[derive(Debug, Clone)]
pub struct AnnotationConfig {
    pub source_path: PathBuf,
    pub report_path: PathBuf,
    pub coverage_target: Option<f64>,
    /// Extractor name to claimed extensions; `None` means the extractor defaults.
    pub extensions: BTreeMap<String, Option<Vec<String>>>,
    pub schema: Schema,
    /// Number of `-v` flags given: 0 warn, 1 info, 2 debug, 3 trace.
    pub verbosity: u8,
}

impl AnnotationConfig {
    /// @ai:intent Read and validate a configuration file
    /// @ai:effects fs:read
    pub fn load(path: &Path, overrides: ConfigOverrides) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_yaml_str(&content, overrides)
    }

    /// @ai:intent Validate configuration held in a YAML string
    /// @ai:post all missing required keys are reported in one error
    /// @ai:effects pure
    pub fn from_yaml_str(yaml: &str, overrides: ConfigOverrides) -> Result<Self> {
        let raw: Value = serde_yaml::from_str(yaml)?;
        let empty = Mapping::new();
        let mapping = match &raw {
            Value::Mapping(mapping) => mapping,
            Value::Null => &empty,
            _ => {
                return Err(Error::InvalidConfig(
                    "the configuration file must contain a mapping".into(),
                ))
            }
        };

        let missing: Vec<String> = REQUIRED_KEYS
            .iter()
            .filter(|key| {
                let overridden = match **key {
                    "source_path" => overrides.source_path.is_some(),
                    "report_path" => overrides.report_path.is_some(),
                    _ => false,
                };
                !overridden && lookup(mapping, key).is_none()
            })
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingConfigKeys(missing));
        }

        let source_path = match overrides.source_path {
            Some(path) => path,
            None => path_value(mapping, "source_path")?,
        };
        let report_path = match overrides.report_path {
            Some(path) => path,
            None => path_value(mapping, "report_path")?,
        };
        let coverage_target = lookup(mapping, "coverage_target")
            .map(parse_coverage_target)
            .transpose()?;

        let extensions = parse_extensions(lookup(mapping, "extensions").unwrap_or(&Value::Null))?;

        let schema = Schema::from_yaml_value(lookup(mapping, "annotations").unwrap_or(&Value::Null))?;

        Ok(Self {
            source_path,
            report_path,
            coverage_target,
            extensions,
            schema,
            verbosity: overrides.verbosity,
        })
    }

    /// @ai:intent Log filter directive for the configured verbosity
    /// @ai:example (verbosity 0) -> "warn,code_annotations=warn"
    /// @ai:example (verbosity 2) -> "warn,code_annotations=debug"
    pub fn log_filter(&self) -> String {
        let level = match self.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        format!("warn,code_annotations={}", level)
    }

    /// @ai:intent Log the configured paths and schema
    /// @ai:effects log
    pub fn log_summary(&self) {
        tracing::info!(
            source_path = %self.source_path.display(),
            report_path = %self.report_path.display(),
            coverage_target = ?self.coverage_target,
            "Configured paths"
        );
        self.schema.log_summary();
    }
}

/// Non-null value stored under `key`.
fn lookup<'a>(mapping: &'a Mapping, key: &str) -> Option<&'a Value> {
    mapping.get(key).filter(|value| !value.is_null())
}

fn path_value(mapping: &Mapping, key: &str) -> Result<PathBuf> {
    match lookup(mapping, key) {
        Some(Value::String(path)) => Ok(PathBuf::from(path)),
        _ => Err(Error::InvalidConfig(format!("'{}' must be a path", key))),
    }
}

/// @ai:intent Accept a number or numeric string within [0, 100]
/// @ai:example (85) -> 85.0
/// @ai:example ("50.5") -> 50.5
/// @ai:example ("all") -> CoverageNotANumber
fn parse_coverage_target(value: &Value) -> Result<f64> {
    let target = match value {
        Value::Number(number) => number
            .as_f64()
            .ok_or_else(|| Error::CoverageNotANumber(number.to_string()))?,
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::CoverageNotANumber(text.clone()))?,
        other => {
            let shown = serde_yaml::to_string(other).unwrap_or_default();
            return Err(Error::CoverageNotANumber(shown.trim().to_string()));
        }
    };

    if !(0.0..=100.0).contains(&target) {
        return Err(Error::CoverageOutOfRange(target));
    }
    Ok(target)
}

fn parse_extensions(value: &Value) -> Result<BTreeMap<String, Option<Vec<String>>>> {
    let extensions: BTreeMap<String, Option<Vec<String>>> = serde_yaml::from_value(value.clone())?;

    let known = extractor_names();
    let unknown: Vec<String> = extensions
        .keys()
        .filter(|name| !known.contains(&name.as_str()))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(Error::UnknownExtractor(unknown));
    }

    Ok(extensions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CONFIG: &str = r#"
source_path: src
report_path: reports
safelist_path: .annotation_safe_list.yml
coverage_target: 50
annotations:
    ".. no_pii::":
extensions:
    python:
        - py
    javascript:
"#;

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let config = AnnotationConfig::load(file.path(), ConfigOverrides::default()).unwrap();
        assert_eq!(config.source_path, PathBuf::from("src"));
        assert_eq!(config.report_path, PathBuf::from("reports"));
        assert_eq!(config.coverage_target, Some(50.0));
        assert_eq!(config.schema.tokens().collect::<Vec<_>>(), vec![".. no_pii::"]);
        assert_eq!(config.extensions["python"], Some(vec!["py".to_string()]));
        assert_eq!(config.extensions["javascript"], None);
    }

    #[test]
    fn test_missing_file() {
        let err = AnnotationConfig::load(Path::new("/nonexistent/.annotations"), ConfigOverrides::default())
            .unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }

    #[test]
    fn test_all_missing_keys_reported_together() {
        let err = AnnotationConfig::from_yaml_str("coverage_target: 10\n", ConfigOverrides::default())
            .unwrap_err();
        match err {
            Error::MissingConfigKeys(keys) => assert_eq!(
                keys,
                vec!["report_path", "source_path", "annotations", "extensions"]
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_overrides_satisfy_required_paths() {
        let yaml = "annotations:\n    \".. no_pii::\":\nextensions:\n    python:\n";
        let overrides = ConfigOverrides {
            source_path: Some(PathBuf::from("other_src")),
            report_path: Some(PathBuf::from("other_reports")),
            verbosity: 2,
        };
        let config = AnnotationConfig::from_yaml_str(yaml, overrides).unwrap();
        assert_eq!(config.source_path, PathBuf::from("other_src"));
        assert_eq!(config.report_path, PathBuf::from("other_reports"));
        assert_eq!(config.verbosity, 2);
        assert_eq!(config.log_filter(), "warn,code_annotations=debug");
        assert_eq!(config.coverage_target, None);
    }

    #[test]
    fn test_log_filter_follows_verbosity() {
        let mut config = AnnotationConfig::from_yaml_str(CONFIG, ConfigOverrides::default()).unwrap();
        let filters: Vec<String> = [0, 1, 2, 3, 7]
            .into_iter()
            .map(|verbosity| {
                config.verbosity = verbosity;
                config.log_filter()
            })
            .collect();
        assert_eq!(
            filters,
            vec![
                "warn,code_annotations=warn",
                "warn,code_annotations=info",
                "warn,code_annotations=debug",
                "warn,code_annotations=trace",
                "warn,code_annotations=trace",
            ]
        );
    }

    #[test]
    fn test_coverage_target_forms() {
        assert_eq!(parse_coverage_target(&Value::from(85)).unwrap(), 85.0);
        assert_eq!(parse_coverage_target(&Value::from("50.5")).unwrap(), 50.5);
        assert!(matches!(
            parse_coverage_target(&Value::from("all")),
            Err(Error::CoverageNotANumber(_))
        ));
        assert!(matches!(
            parse_coverage_target(&Value::from(101)),
            Err(Error::CoverageOutOfRange(_))
        ));
        assert!(matches!(
            parse_coverage_target(&Value::from(-1)),
            Err(Error::CoverageOutOfRange(_))
        ));
    }

    #[test]
    fn test_unknown_extractor() {
        let yaml = CONFIG.replace("javascript:", "cobol:");
        let err = AnnotationConfig::from_yaml_str(&yaml, ConfigOverrides::default()).unwrap_err();
        match err {
            Error::UnknownExtractor(names) => assert_eq!(names, vec!["cobol"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_schema_errors_propagate() {
        let yaml = CONFIG.replace("\".. no_pii::\":", "group:\n        - \".. a::\":");
        let err = AnnotationConfig::from_yaml_str(&yaml, ConfigOverrides::default()).unwrap_err();
        assert!(matches!(err, Error::GroupTooSmall(_)));
        assert!(err.is_configuration());
    }
}
