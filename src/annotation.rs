//! @ai:module:intent Define the occurrence records produced by a search
//! @ai:module:layer domain
//! @ai:module:public_api Occurrence, AnnotationData, Comment
//! @ai:module:stateless true

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Key under `extra` holding the identifier of an introspected object.
pub const EXTRA_OBJECT_ID: &str = "object_id";
/// Key under `extra` holding the verbatim docstring of an introspected object.
pub const EXTRA_FULL_COMMENT: &str = "full_comment";

/// @ai:intent A comment body handed out by an extractor, with the line it starts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub body: String,
    /// 1-based line of the comment opener in the scanned text.
    pub start_line: usize,
}

impl Comment {
    /// @ai:intent Create a new comment body
    pub fn new(body: impl Into<String>, start_line: usize) -> Self {
        Self {
            body: body.into(),
            start_line,
        }
    }
}

/// @ai:intent Payload captured after an annotation token
///
/// Free-text tokens keep the raw (trimmed) payload. Choice tokens hold the
/// payload split into candidate values; an empty first element means no value
/// was supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnnotationData {
    Text(String),
    Choices(Vec<String>),
}

impl fmt::Display for AnnotationData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationData::Text(text) => f.write_str(text),
            AnnotationData::Choices(choices) => f.write_str(&choices.join(", ")),
        }
    }
}

/// @ai:intent One annotation token found in a file, with its payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub filename: String,
    /// Line where the enclosing comment starts, not the token itself.
    pub line_number: usize,
    pub annotation_token: String,
    pub annotation_data: AnnotationData,
    pub found_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_group_id: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<BTreeMap<String, String>>,
}

impl Occurrence {
    /// @ai:intent Create an occurrence without group id or extra metadata
    pub fn new(
        filename: impl Into<String>,
        line_number: usize,
        token: impl Into<String>,
        data: AnnotationData,
        found_by: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            line_number,
            annotation_token: token.into(),
            annotation_data: data,
            found_by: found_by.into(),
            report_group_id: None,
            extra: None,
        }
    }

    /// @ai:intent Attach the identity of an introspected object to this occurrence
    pub fn with_object(mut self, object_id: &str, full_comment: &str) -> Self {
        let extra = self.extra.get_or_insert_with(BTreeMap::new);
        extra.insert(EXTRA_OBJECT_ID.to_string(), object_id.to_string());
        extra.insert(EXTRA_FULL_COMMENT.to_string(), full_comment.to_string());
        self
    }

    /// @ai:intent Look up the introspected object id, if one was attached
    pub fn object_id(&self) -> Option<&str> {
        self.extra
            .as_ref()
            .and_then(|extra| extra.get(EXTRA_OBJECT_ID))
            .map(String::as_str)
    }

    /// @ai:intent Describe where this occurrence lives, for error messages
    /// @ai:example (filename "a.py", line 3) -> "a.py::3"
    /// @ai:example (object "app.Model") -> "a.py::app.Model"
    pub fn location(&self) -> String {
        match self.object_id() {
            Some(object_id) => format!("{}::{}", self.filename, object_id),
            None => format!("{}::{}", self.filename, self.line_number),
        }
    }
}
