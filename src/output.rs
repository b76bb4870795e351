//! @ai:module:intent Format output for different formats (JSON, text)
//! @ai:module:layer infrastructure
//! @ai:module:public_api OutputFormat, format_lint_result, format_search_results, format_coverage, to_json
//! @ai:module:depends_on validator, aggregator, docstring
//! @ai:module:stateless true

use crate::aggregator::SearchResults;
use crate::docstring::CoverageReport;
use crate::validator::LintResult;
use colored::Colorize;
use serde::Serialize;

/// @ai:intent Output format options
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonPretty,
}

impl OutputFormat {
    /// @ai:intent Check if stdout must hold nothing but the serialized payload
    pub fn is_json(&self) -> bool {
        !matches!(self, OutputFormat::Text)
    }
}

/// @ai:intent Format lint results as a string
/// @ai:effects pure
pub fn format_lint_result(result: &LintResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(result, false),
        OutputFormat::JsonPretty => to_json(result, true),
        OutputFormat::Text => format_lint_result_text(result),
    }
}

/// @ai:intent Format lint results as human-readable text
/// @ai:effects pure
fn format_lint_result_text(result: &LintResult) -> String {
    let mut output = String::new();

    if result.passed() {
        output.push_str(&format!(
            "{} Checked {} annotations in {} files, no linting errors\n",
            "OK".green().bold(),
            result.annotations_checked,
            result.files_checked
        ));
        return output;
    }

    output.push_str(&format!(
        "{}\n",
        "Search failed due to linting errors!".red().bold()
    ));
    output.push_str(&format!(
        "{} errors:\n",
        result.errors.len().to_string().red().bold()
    ));
    output.push_str("---------------------------------\n");
    for error in result.sorted_errors() {
        output.push_str(&format!("{}\n", error.message));
    }
    output.push_str("---------------------------------\n");

    output
}

/// @ai:intent Format search results as a string
/// @ai:effects pure
pub fn format_search_results(results: &SearchResults, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(results, false),
        OutputFormat::JsonPretty => to_json(results, true),
        OutputFormat::Text => format_search_results_text(results),
    }
}

/// @ai:intent Format search results as human-readable text
/// @ai:effects pure
fn format_search_results_text(results: &SearchResults) -> String {
    let mut output = String::new();

    for (filename, occurrences) in results.files() {
        output.push_str(&format!("{}\n", filename.bold()));

        for occurrence in occurrences {
            let data = occurrence.annotation_data.to_string();
            let first_line = data.lines().next().unwrap_or_default();
            output.push_str(&format!(
                "  {} {} {}\n",
                format!("{:>5}", occurrence.line_number).dimmed(),
                occurrence.annotation_token.cyan(),
                first_line
            ));
        }
    }

    output
}

/// @ai:intent Format a coverage report as a string
/// @ai:effects pure
pub fn format_coverage(report: &CoverageReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(report, false),
        OutputFormat::JsonPretty => to_json(report, true),
        OutputFormat::Text => format_coverage_text(report),
    }
}

fn format_coverage_text(report: &CoverageReport) -> String {
    let mut output = format!(
        "Found {} objects, {} annotated ({:.1}%), target {:.1}%\n",
        report.total, report.annotated, report.percent, report.target
    );

    if report.passed() {
        output.push_str(&format!("{} Coverage target met\n", "OK".green().bold()));
    } else {
        output.push_str(&format!(
            "{} Coverage is below the target of {:.1}%\n",
            "FAILED".red().bold(),
            report.target
        ));
        output.push_str("Objects without annotations:\n");
        for object_id in &report.unannotated {
            output.push_str(&format!("  {}\n", object_id));
        }
    }

    output
}

/// @ai:intent Format any serializable value as JSON
/// @ai:effects pure
pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> String {
    if pretty {
        serde_json::to_string_pretty(value).unwrap_or_default()
    } else {
        serde_json::to_string(value).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotationData, Occurrence};
    use crate::schema::Schema;
    use crate::validator::{Validator, ValidatorTrait};

    fn failing_result() -> LintResult {
        let schema = Schema::from_yaml_str("\".. ignored::\":\n    choices: [a, b]\n").unwrap();
        let mut results = SearchResults::new();
        results.add_file_results(
            "x.py",
            vec![vec![Occurrence::new(
                "x.py",
                2,
                ".. ignored::",
                AnnotationData::Choices(vec!["c".into()]),
                "python",
            )]],
        );
        Validator::new(&schema).check_results(&results)
    }

    #[test]
    fn test_failed_lint_lists_every_error() {
        colored::control::set_override(false);
        let text = format_lint_result(&failing_result(), OutputFormat::Text);
        assert!(text.contains("Search failed due to linting errors!"));
        assert!(text.contains("1 errors:"));
        assert!(text.contains(r#"x.py::2: "c" is not a valid choice for ".. ignored::""#));
    }

    #[test]
    fn test_lint_json_has_kind_names() {
        let json = format_lint_result(&failing_result(), OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["errors"][0]["kind"], "InvalidChoice");
        assert_eq!(value["files_checked"], 1);
    }

    #[test]
    fn test_only_text_allows_status_lines_on_stdout() {
        assert!(!OutputFormat::Text.is_json());
        assert!(OutputFormat::Json.is_json());
        assert!(OutputFormat::JsonPretty.is_json());
    }

    #[test]
    fn test_search_results_listing() {
        colored::control::set_override(false);
        let mut results = SearchResults::new();
        results.add_file_results(
            "a.py",
            vec![vec![
                Occurrence::new(
                    "a.py",
                    3,
                    ".. pii::",
                    AnnotationData::Text("first line\n  second line".into()),
                    "python",
                ),
                Occurrence::new(
                    "a.py",
                    3,
                    ".. pii_types::",
                    AnnotationData::Choices(vec!["id".into(), "name".into()]),
                    "python",
                ),
            ]],
        );

        let text = format_search_results(&results, OutputFormat::Text);
        assert_eq!(
            text,
            "a.py\n      3 .. pii:: first line\n      3 .. pii_types:: id, name\n"
        );

        let json: serde_json::Value =
            serde_json::from_str(&format_search_results(&results, OutputFormat::Json)).unwrap();
        assert_eq!(json["a.py"][1]["annotation_data"][0], "id");
        assert_eq!(json["a.py"][0]["line_number"], 3);
    }

    #[test]
    fn test_coverage_text_lists_unannotated() {
        colored::control::set_override(false);
        let report = CoverageReport {
            total: 2,
            annotated: 1,
            percent: 50.0,
            target: 80.0,
            unannotated: vec!["app.Log".into()],
        };
        let text = format_coverage(&report, OutputFormat::Text);
        assert!(text.contains("Coverage is below the target of 80.0%"));
        assert!(text.contains("  app.Log\n"));
    }
}
