//! @ai:module:intent Check grouped occurrences against the schema and collect annotation errors
//! @ai:module:layer application
//! @ai:module:public_api ValidationErrorKind, ValidationError, LintResult, ValidatorTrait, Validator
//! @ai:module:depends_on schema, annotation, aggregator, matcher
//! @ai:module:stateless true

use crate::aggregator::{line_units, SearchResults};
use crate::annotation::{AnnotationData, Occurrence};
use crate::matcher::split_choices;
use crate::schema::{Group, Schema, TokenKind};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// @ai:intent Every kind of annotation error, in ordinal order
///
/// Consumers match on the ordinal as well as the name, so variants are only
/// ever appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValidationErrorKind {
    InvalidChoice,
    DuplicateChoice,
    MissingChoiceValue,
    TokenNotInGroup,
    DuplicateTokenInGroup,
    MissingNonOptionalToken,
}

impl ValidationErrorKind {
    pub const ALL: [ValidationErrorKind; 6] = [
        ValidationErrorKind::InvalidChoice,
        ValidationErrorKind::DuplicateChoice,
        ValidationErrorKind::MissingChoiceValue,
        ValidationErrorKind::TokenNotInGroup,
        ValidationErrorKind::DuplicateTokenInGroup,
        ValidationErrorKind::MissingNonOptionalToken,
    ];

    pub fn ordinal(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            ValidationErrorKind::InvalidChoice => "InvalidChoice",
            ValidationErrorKind::DuplicateChoice => "DuplicateChoice",
            ValidationErrorKind::MissingChoiceValue => "MissingChoiceValue",
            ValidationErrorKind::TokenNotInGroup => "TokenNotInGroup",
            ValidationErrorKind::DuplicateTokenInGroup => "DuplicateTokenInGroup",
            ValidationErrorKind::MissingNonOptionalToken => "MissingNonOptionalToken",
        }
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// @ai:intent One annotation error, tied to the occurrence that caused it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub occurrence: Occurrence,
    /// Offending value, token and expected set or group name, kind dependent.
    pub args: Vec<String>,
    pub message: String,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, occurrence: &Occurrence, args: Vec<String>, text: String) -> Self {
        Self {
            kind,
            message: format!("{}: {}", occurrence.location(), text),
            occurrence: occurrence.clone(),
            args,
        }
    }

    /// @ai:intent Key used to print errors in a stable order
    pub fn sort_key(&self) -> (&str, usize, usize, &str) {
        (
            &self.occurrence.filename,
            self.occurrence.line_number,
            self.kind.ordinal(),
            &self.occurrence.annotation_token,
        )
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// @ai:intent Result of validating a search
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct LintResult {
    pub files_checked: usize,
    pub annotations_checked: usize,
    pub errors: Vec<ValidationError>,
}

impl LintResult {
    /// @ai:intent Check if linting passed (no errors)
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }

    /// @ai:intent Merge another lint result into this one
    pub fn merge(&mut self, other: LintResult) {
        self.files_checked += other.files_checked;
        self.annotations_checked += other.annotations_checked;
        self.errors.extend(other.errors);
    }

    /// @ai:intent Errors ordered by filename, line, kind and token
    pub fn sorted_errors(&self) -> Vec<&ValidationError> {
        let mut errors: Vec<&ValidationError> = self.errors.iter().collect();
        errors.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        errors
    }
}

/// @ai:intent Capability to validate search results
pub trait ValidatorTrait: Send + Sync {
    /// @ai:intent Validate one file's line-ordered occurrences
    fn check_file(&self, occurrences: &[Occurrence]) -> Vec<ValidationError>;

    /// @ai:intent Validate every file of a search
    fn check_results(&self, results: &SearchResults) -> LintResult {
        let mut result = LintResult::default();
        for (_, occurrences) in results.files() {
            result.merge(LintResult {
                files_checked: 1,
                annotations_checked: occurrences.len(),
                errors: self.check_file(occurrences),
            });
        }
        result
    }
}

/// @ai:intent Validator grouping occurrences that share a starting line
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    schema: &'a Schema,
}

impl<'a> Validator<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// @ai:intent Check one unit: choices first, then group membership and completeness
    /// @ai:pre every occurrence in `unit` shares a line number
    fn check_unit(&self, unit: &[Occurrence], errors: &mut Vec<ValidationError>) {
        let group = unit
            .iter()
            .find_map(|occurrence| self.schema.group_for_token(&occurrence.annotation_token));
        let mut seen: Vec<&str> = Vec::new();

        for occurrence in unit {
            self.check_choices(occurrence, errors);

            let Some(group) = group else { continue };
            let token = occurrence.annotation_token.as_str();

            if !group.contains(token) {
                errors.push(token_not_in_group(occurrence, group));
            } else if seen.contains(&token) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::DuplicateTokenInGroup,
                    occurrence,
                    vec![token.to_string(), group.name.clone()],
                    format!("\"{}\" is already in the group that starts with \"{}\"", token, group.name),
                ));
            } else {
                tracing::debug!(token, group = %group.name, "Adding token to group");
                seen.push(token);
            }
        }

        let (Some(group), Some(first)) = (group, unit.first()) else {
            return;
        };
        for member in group.required_members() {
            if !seen.contains(&member) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::MissingNonOptionalToken,
                    first,
                    vec![member.to_string(), group.name.clone()],
                    format!("missing non-optional annotation: '{}'", member),
                ));
            }
        }
    }

    /// @ai:intent Check the candidates of a choice token against its configured set
    fn check_choices(&self, occurrence: &Occurrence, errors: &mut Vec<ValidationError>) {
        let token = occurrence.annotation_token.as_str();
        let Some(spec) = self.schema.spec(token) else {
            return;
        };
        if !spec.kind.is_choice() {
            return;
        }

        let candidates: Cow<'_, [String]> = match &occurrence.annotation_data {
            AnnotationData::Choices(choices) => Cow::Borrowed(choices),
            AnnotationData::Text(text) => Cow::Owned(split_choices(text)),
        };
        let expected = format!("{:?}", spec.choices);

        if candidates.first().map_or(true, String::is_empty) {
            errors.push(ValidationError::new(
                ValidationErrorKind::MissingChoiceValue,
                occurrence,
                vec![token.to_string(), expected.clone()],
                format!("No choices found for \"{}\". Expected one of {}.", token, expected),
            ));
            return;
        }

        let mut found: Vec<&str> = Vec::new();
        for candidate in candidates.iter() {
            let candidate = candidate.as_str();
            if !spec.choices.iter().any(|choice| choice == candidate) {
                errors.push(invalid_choice(occurrence, candidate, &expected));
            } else if found.contains(&candidate) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::DuplicateChoice,
                    occurrence,
                    vec![candidate.to_string(), token.to_string()],
                    format!("\"{}\" is already present in this annotation.", candidate),
                ));
            } else if spec.kind == TokenKind::SingleChoice && !found.is_empty() {
                errors.push(invalid_choice(occurrence, candidate, &expected));
            } else {
                found.push(candidate);
            }
        }
    }
}

impl ValidatorTrait for Validator<'_> {
    /// @ai:effects pure
    fn check_file(&self, occurrences: &[Occurrence]) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for unit in line_units(occurrences) {
            self.check_unit(unit, &mut errors);
        }
        errors
    }
}

fn invalid_choice(occurrence: &Occurrence, candidate: &str, expected: &str) -> ValidationError {
    let token = &occurrence.annotation_token;
    ValidationError::new(
        ValidationErrorKind::InvalidChoice,
        occurrence,
        vec![candidate.to_string(), token.clone(), expected.to_string()],
        format!(
            "\"{}\" is not a valid choice for \"{}\". Expected one of {}.",
            candidate, token, expected
        ),
    )
}

fn token_not_in_group(occurrence: &Occurrence, group: &Group) -> ValidationError {
    let token = &occurrence.annotation_token;
    let members = format!("{:?}", group.members);
    ValidationError::new(
        ValidationErrorKind::TokenNotInGroup,
        occurrence,
        vec![token.clone(), group.name.clone(), members.clone()],
        format!(
            "\"{}\" is not in the group that starts with \"{}\". Expecting one of: {}",
            token, group.name, members
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SchemaEntry, TokenDecl};
    use pretty_assertions::assert_eq;

    const SCHEMA: &str = r#"
".. no_pii::":
".. ignored::":
    choices: [irrelevant, terrible, silly-silly]
"pii_group":
    - ".. pii::":
    - ".. pii_types::":
        choices: [id, name, other]
    - ".. pii_retirement::":
        choices: [retained, local_api, consumer_api, third_party]
        optional: true
"#;

    fn schema() -> Schema {
        Schema::from_yaml_str(SCHEMA).unwrap()
    }

    fn text(line: usize, token: &str, data: &str) -> Occurrence {
        Occurrence::new("a.py", line, token, AnnotationData::Text(data.into()), "python")
    }

    fn choices(line: usize, token: &str, values: &[&str]) -> Occurrence {
        Occurrence::new(
            "a.py",
            line,
            token,
            AnnotationData::Choices(values.iter().map(|v| v.to_string()).collect()),
            "python",
        )
    }

    fn kinds(occurrences: &[Occurrence]) -> Vec<ValidationErrorKind> {
        let schema = schema();
        Validator::new(&schema)
            .check_file(occurrences)
            .into_iter()
            .map(|e| e.kind)
            .collect()
    }

    #[test]
    fn test_kind_ordinals_are_stable() {
        assert_eq!(ValidationErrorKind::ALL.len(), 6);
        for (ordinal, kind) in ValidationErrorKind::ALL.into_iter().enumerate() {
            assert_eq!(kind.ordinal(), ordinal);
        }
        assert_eq!(ValidationErrorKind::TokenNotInGroup.name(), "TokenNotInGroup");
    }

    #[test]
    fn test_complete_group_passes() {
        let occurrences = vec![
            text(1, ".. pii::", "A name"),
            choices(1, ".. pii_types::", &["name"]),
            choices(1, ".. pii_retirement::", &["retained"]),
        ];
        assert!(kinds(&occurrences).is_empty());
    }

    #[test]
    fn test_optional_member_may_be_absent() {
        let occurrences = vec![text(1, ".. pii::", "A name"), choices(1, ".. pii_types::", &["name"])];
        assert!(kinds(&occurrences).is_empty());
    }

    #[test]
    fn test_ungrouped_tokens_produce_no_group_errors() {
        let occurrences = vec![text(1, ".. no_pii::", ""), text(3, ".. no_pii::", "")];
        assert!(kinds(&occurrences).is_empty());
    }

    #[test]
    fn test_invalid_choice_message() {
        let schema = schema();
        let errors = Validator::new(&schema).check_file(&[choices(4, ".. ignored::", &["doesnotexist"])]);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::InvalidChoice);
        assert_eq!(
            errors[0].message,
            r#"a.py::4: "doesnotexist" is not a valid choice for ".. ignored::". Expected one of ["irrelevant", "terrible", "silly-silly"]."#
        );
    }

    #[test]
    fn test_duplicate_and_missing_choices() {
        assert_eq!(
            kinds(&[choices(1, ".. ignored::", &["terrible", "terrible"])]),
            vec![ValidationErrorKind::DuplicateChoice]
        );
        assert_eq!(
            kinds(&[choices(1, ".. ignored::", &[""])]),
            vec![ValidationErrorKind::MissingChoiceValue]
        );
    }

    #[test]
    fn test_raw_text_payload_of_choice_token_is_split() {
        assert_eq!(
            kinds(&[text(1, ".. ignored::", "terrible, nope")]),
            vec![ValidationErrorKind::InvalidChoice]
        );
    }

    #[test]
    fn test_single_choice_rejects_extra_values() {
        let schema = Schema::compile(vec![SchemaEntry::Token(TokenDecl::single_choice(
            ".. level::",
            ["low", "high"],
        ))])
        .unwrap();
        let errors = Validator::new(&schema).check_file(&[choices(1, ".. level::", &["low", "high"])]);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::InvalidChoice);
        assert_eq!(errors[0].args[0], "high");
    }

    #[test]
    fn test_missing_member_attached_to_first_occurrence() {
        let schema = schema();
        let errors = Validator::new(&schema).check_file(&[text(9, ".. pii::", "A name")]);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::MissingNonOptionalToken);
        assert_eq!(errors[0].occurrence.line_number, 9);
        assert_eq!(
            errors[0].message,
            "a.py::9: missing non-optional annotation: '.. pii_types::'"
        );
    }

    #[test]
    fn test_token_outside_group_in_same_unit() {
        assert_eq!(
            kinds(&[
                text(1, ".. pii::", "A name"),
                choices(1, ".. pii_types::", &["id"]),
                text(1, ".. no_pii::", ""),
            ]),
            vec![ValidationErrorKind::TokenNotInGroup]
        );
    }

    #[test]
    fn test_duplicate_token_in_group() {
        assert_eq!(
            kinds(&[
                text(2, ".. pii::", "A name"),
                choices(2, ".. pii_types::", &["id"]),
                choices(2, ".. pii_types::", &["id"]),
            ]),
            vec![ValidationErrorKind::DuplicateTokenInGroup]
        );
    }

    #[test]
    fn test_units_are_split_by_line() {
        // Members on different lines are separate units, each incomplete.
        assert_eq!(
            kinds(&[text(1, ".. pii::", "A name"), choices(2, ".. pii_types::", &["id"])]),
            vec![
                ValidationErrorKind::MissingNonOptionalToken,
                ValidationErrorKind::MissingNonOptionalToken
            ]
        );
    }

    #[test]
    fn test_docstring_errors_use_object_id() {
        let schema = schema();
        let occurrence = choices(12, ".. ignored::", &["nope"]).with_object("app.Model", "doc");
        let errors = Validator::new(&schema).check_file(&[occurrence]);
        assert!(errors[0].message.starts_with("a.py::app.Model: "));
    }

    #[test]
    fn test_validation_is_idempotent() {
        let schema = schema();
        let validator = Validator::new(&schema);
        let occurrences = vec![
            text(1, ".. pii::", "A name"),
            choices(1, ".. pii_types::", &["id", "bogus", "id"]),
            text(5, ".. pii::", "other"),
        ];

        let first = validator.check_file(&occurrences);
        let second = validator.check_file(&occurrences);
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_check_results_counts_and_sorts() {
        let schema = schema();
        let mut results = SearchResults::new();
        results.add_file_results(
            "b.py",
            vec![vec![Occurrence {
                filename: "b.py".into(),
                ..choices(3, ".. ignored::", &["nope"])
            }]],
        );
        results.add_file_results("a.py", vec![vec![text(7, ".. pii::", "x")]]);

        let result = Validator::new(&schema).check_results(&results);
        assert!(!result.passed());
        assert_eq!(result.files_checked, 2);
        assert_eq!(result.annotations_checked, 2);

        let files: Vec<&str> = result
            .sorted_errors()
            .iter()
            .map(|e| e.occurrence.filename.as_str())
            .collect();
        assert_eq!(files, vec!["a.py", "b.py"]);
    }
}
