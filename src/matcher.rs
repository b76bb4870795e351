//! @ai:module:intent Find configured tokens inside comment bodies and capture their payloads
//! @ai:module:layer application
//! @ai:module:public_api TokenMatch, find_annotations, scan_comments, split_choices, annotation_data
//! @ai:module:depends_on schema, annotation, error
//! @ai:module:stateless true

use crate::annotation::{AnnotationData, Comment, Occurrence};
use crate::error::{Error, Result};
use crate::schema::Schema;
use regex::Regex;
use std::sync::OnceLock;

/// @ai:intent A token found in one comment body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMatch {
    pub token: String,
    pub data: String,
    /// Line of the token relative to the first line of the comment body.
    pub line_offset: usize,
}

/// @ai:intent Find every configured token in a comment body, in order
/// @ai:pre schema was compiled from the active configuration
/// @ai:post payloads are trimmed and include indented continuation lines
/// @ai:effects pure
pub fn find_annotations(body: &str, schema: &Schema) -> Result<Vec<TokenMatch>> {
    if !schema.contains_any_token(body) {
        return Ok(Vec::new());
    }

    let token_regex = schema.token_regex();
    let mut matches = Vec::new();
    let mut pos = 0;

    while let Some(caps) = token_regex.captures_at(body, pos) {
        let location = || format!("offset {}", caps.get(0).map_or(pos, |m| m.start()));
        let token = caps.name("token").ok_or_else(|| Error::MalformedMatch {
            location: location(),
            group: "token",
        })?;
        let data = caps.name("data").ok_or_else(|| Error::MalformedMatch {
            location: location(),
            group: "data",
        })?;
        let space = caps.name("space").map_or("", |m| m.as_str());

        let end = continuation_end(body, data.end(), space, schema.token_prefix_regex());
        let line_offset = body[..token.start()].matches('\n').count();

        tracing::trace!(token = token.as_str(), line_offset, "Token matched");
        matches.push(TokenMatch {
            token: token.as_str().trim().to_string(),
            data: body[data.start()..end].trim().to_string(),
            line_offset,
        });

        match advance(body, pos, end) {
            Some(next) => pos = next,
            None => break,
        }
    }

    Ok(matches)
}

/// @ai:intent Next search offset after a match ending at `end`
/// @ai:post the offset is always past `pos`, or None once the body is exhausted
fn advance(body: &str, pos: usize, end: usize) -> Option<usize> {
    if end > pos {
        return Some(end);
    }
    body[pos..].chars().next().map(|c| pos + c.len_utf8())
}

/// @ai:intent Extend a payload over the lines that continue it
///
/// A continuation line repeats the token line's leading whitespace, adds at
/// least two spaces, and must not start with a configured token. Blank lines
/// between continuation lines are allowed.
fn continuation_end(body: &str, mut end: usize, space: &str, token_prefix: &Regex) -> usize {
    loop {
        let rest = &body[end..];
        let newlines = rest.len() - rest.trim_start_matches('\n').len();
        if newlines == 0 {
            break;
        }

        let line_start = end + newlines;
        let line_end = body[line_start..]
            .find('\n')
            .map_or(body.len(), |idx| line_start + idx);
        let line = &body[line_start..line_end];

        let Some(after_space) = line.strip_prefix(space) else {
            break;
        };
        let content = after_space.trim_start_matches(' ');
        if after_space.len() - content.len() < 2 {
            break;
        }
        // The indent must be followed by some character, even a newline.
        if content.is_empty() && line_end == body.len() {
            break;
        }
        if token_prefix.is_match(content) {
            break;
        }

        end = line_end;
    }
    end
}

fn choice_separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r",\s?|\s").expect("choice separator regex is valid"))
}

/// @ai:intent Split a choice payload into candidate values
/// @ai:example ("id, name") -> ["id", "name"]
/// @ai:example ("") -> [""]
/// @ai:effects pure
pub fn split_choices(data: &str) -> Vec<String> {
    choice_separator().split(data).map(str::to_string).collect()
}

/// @ai:intent Shape a raw payload according to the token's kind
/// @ai:effects pure
pub fn annotation_data(schema: &Schema, token: &str, raw: String) -> AnnotationData {
    if schema.is_choice(token) {
        AnnotationData::Choices(split_choices(&raw))
    } else {
        AnnotationData::Text(raw)
    }
}

/// @ai:intent Turn comment bodies from one extractor into occurrences for a file
/// @ai:post occurrences carry the start line of their enclosing comment
/// @ai:effects pure
pub fn scan_comments(
    comments: &[Comment],
    schema: &Schema,
    filename: &str,
    found_by: &str,
) -> Result<Vec<Occurrence>> {
    let mut occurrences = Vec::new();

    for comment in comments {
        for found in find_annotations(&comment.body, schema)? {
            tracing::trace!(
                filename,
                line = comment.start_line + found.line_offset,
                token = %found.token,
                "Annotation found"
            );
            let data = annotation_data(schema, &found.token, found.data);
            occurrences.push(Occurrence::new(
                filename,
                comment.start_line,
                found.token,
                data,
                found_by,
            ));
        }
    }

    Ok(occurrences)
}
