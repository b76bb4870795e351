//! @ai:module:intent Compile a declarative annotation schema into lookup tables and a token regex
//! @ai:module:layer domain
//! @ai:module:public_api Schema, SchemaEntry, TokenDecl, TokenShape, TokenKind, AnnotationTokenSpec, Group
//! @ai:module:depends_on error
//! @ai:module:stateless true

use crate::error::{Error, Result};
use regex::Regex;
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::collections::{HashMap, HashSet};

const KEY_CHOICES: &str = "choices";
const KEY_OPTIONAL: &str = "optional";

/// @ai:intent Payload constraint attached to an annotation token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    FreeText,
    SingleChoice,
    MultiChoice,
}

impl TokenKind {
    /// @ai:intent Check if payloads of this kind are split into choice candidates
    pub fn is_choice(&self) -> bool {
        !matches!(self, TokenKind::FreeText)
    }
}

/// @ai:intent Declared payload shape of one token before compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenShape {
    FreeText {
        optional: bool,
    },
    Choices {
        choices: Vec<String>,
        optional: bool,
        multiple: bool,
    },
}

/// @ai:intent A token name paired with its declared shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDecl {
    pub token: String,
    pub shape: TokenShape,
}

impl TokenDecl {
    pub fn free_text(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            shape: TokenShape::FreeText { optional: false },
        }
    }

    pub fn multi_choice<S: Into<String>>(
        token: impl Into<String>,
        choices: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            token: token.into(),
            shape: TokenShape::Choices {
                choices: choices.into_iter().map(Into::into).collect(),
                optional: false,
                multiple: true,
            },
        }
    }

    pub fn single_choice<S: Into<String>>(
        token: impl Into<String>,
        choices: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            token: token.into(),
            shape: TokenShape::Choices {
                choices: choices.into_iter().map(Into::into).collect(),
                optional: false,
                multiple: false,
            },
        }
    }

    /// @ai:intent Mark this token as an optional group member
    pub fn optional(mut self) -> Self {
        match &mut self.shape {
            TokenShape::FreeText { optional } | TokenShape::Choices { optional, .. } => {
                *optional = true
            }
        }
        self
    }
}

/// @ai:intent One top-level entry of the annotation schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaEntry {
    Token(TokenDecl),
    Group { name: String, members: Vec<TokenDecl> },
}

impl SchemaEntry {
    pub fn group(name: impl Into<String>, members: Vec<TokenDecl>) -> Self {
        SchemaEntry::Group {
            name: name.into(),
            members,
        }
    }

    /// @ai:intent Parse the `annotations` mapping of a configuration file into entries
    /// @ai:pre value is the YAML node found under the `annotations` key
    /// @ai:post entries keep the declaration order of the mapping
    /// @ai:effects pure
    pub fn parse_all(value: &Value) -> Result<Vec<SchemaEntry>> {
        let mapping = value.as_mapping().ok_or_else(|| {
            Error::InvalidConfig("'annotations' must be a mapping of tokens and groups".into())
        })?;

        mapping
            .iter()
            .map(|(key, value)| {
                let name = key_as_str(key)?;
                match value {
                    Value::Sequence(members) => parse_group(name, members),
                    other => Ok(SchemaEntry::Token(parse_token(name, other)?)),
                }
            })
            .collect()
    }
}

/// @ai:intent Compiled description of one configured token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationTokenSpec {
    pub token: String,
    pub kind: TokenKind,
    pub choices: Vec<String>,
    pub required: bool,
}

/// @ai:intent A named, ordered set of tokens that must appear together
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub name: String,
    pub members: Vec<String>,
    pub optional: Vec<String>,
}

impl Group {
    pub fn contains(&self, token: &str) -> bool {
        self.members.iter().any(|member| member == token)
    }

    pub fn is_optional(&self, token: &str) -> bool {
        self.optional.iter().any(|member| member == token)
    }

    /// @ai:intent List members that must be present in every instance of the group
    pub fn required_members(&self) -> impl Iterator<Item = &str> {
        self.members
            .iter()
            .filter(|member| !self.is_optional(member))
            .map(String::as_str)
    }
}

/// @ai:intent Immutable lookup tables and matching regexes built from a schema
#[derive(Debug, Clone)]
pub struct Schema {
    specs: Vec<AnnotationTokenSpec>,
    spec_index: HashMap<String, usize>,
    groups: Vec<Group>,
    token_groups: HashMap<String, usize>,
    optional: HashSet<String>,
    token_regex: Regex,
    token_prefix: Regex,
}

impl Schema {
    /// @ai:intent Compile schema entries into a Schema
    /// @ai:pre entries come from configuration or the programmatic TokenDecl API
    /// @ai:post every token is unique and every group has at least two members
    /// @ai:effects pure
    pub fn compile(entries: Vec<SchemaEntry>) -> Result<Self> {
        let mut builder = SchemaBuilder::default();

        for entry in entries {
            match entry {
                SchemaEntry::Token(decl) => {
                    builder.add_token(decl)?;
                }
                SchemaEntry::Group { name, members } => {
                    if members.len() < 2 {
                        return Err(Error::GroupTooSmall(name));
                    }
                    let group_idx = builder.groups.len();
                    let mut group = Group {
                        name,
                        members: Vec::with_capacity(members.len()),
                        optional: Vec::new(),
                    };
                    for decl in members {
                        let spec = builder.add_token(decl)?;
                        if !spec.required {
                            group.optional.push(spec.token.clone());
                        }
                        builder.token_groups.insert(spec.token.clone(), group_idx);
                        group.members.push(spec.token);
                    }
                    builder.groups.push(group);
                }
            }
        }

        builder.finish()
    }

    /// @ai:intent Parse and compile the `annotations` node of a configuration file
    /// @ai:effects pure
    pub fn from_yaml_value(value: &Value) -> Result<Self> {
        Self::compile(SchemaEntry::parse_all(value)?)
    }

    /// @ai:intent Parse and compile a YAML document holding only the annotations mapping
    /// @ai:effects pure
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Self::from_yaml_value(&value)
    }

    pub fn spec(&self, token: &str) -> Option<&AnnotationTokenSpec> {
        self.spec_index.get(token).map(|&idx| &self.specs[idx])
    }

    /// @ai:intent Iterate configured tokens in declaration order
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|spec| spec.token.as_str())
    }

    pub fn specs(&self) -> &[AnnotationTokenSpec] {
        &self.specs
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|group| group.name == name)
    }

    /// @ai:intent Find the group a token belongs to, if any
    pub fn group_for_token(&self, token: &str) -> Option<&Group> {
        self.token_groups.get(token).map(|&idx| &self.groups[idx])
    }

    pub fn is_optional(&self, token: &str) -> bool {
        self.optional.contains(token)
    }

    /// @ai:intent Check if a token restricts its payload to a choice set
    pub fn is_choice(&self, token: &str) -> bool {
        self.spec(token).is_some_and(|spec| spec.kind.is_choice())
    }

    /// @ai:intent Regex locating any configured token with `space`, `token` and `data` groups
    pub fn token_regex(&self) -> &Regex {
        &self.token_regex
    }

    /// @ai:intent Anchored regex matching text that begins with a configured token
    pub fn token_prefix_regex(&self) -> &Regex {
        &self.token_prefix
    }

    /// @ai:intent Cheap substring test used to skip text without any token
    /// @ai:effects pure
    pub fn contains_any_token(&self, text: &str) -> bool {
        self.specs.iter().any(|spec| text.contains(&spec.token))
    }

    /// @ai:intent Log the configured groups, choices, tokens and token regex
    /// @ai:effects log
    pub fn log_summary(&self) {
        tracing::info!(
            groups = ?self.groups.iter().map(|g| (&g.name, &g.members)).collect::<Vec<_>>(),
            "Groups configured"
        );
        tracing::info!(
            choices = ?self
                .specs
                .iter()
                .filter(|spec| spec.kind.is_choice())
                .map(|spec| (&spec.token, &spec.choices))
                .collect::<Vec<_>>(),
            "Choices configured"
        );
        tracing::info!(
            tokens = ?self.specs.iter().map(|spec| &spec.token).collect::<Vec<_>>(),
            "Annotation tokens configured"
        );
        tracing::debug!(regex = self.token_regex.as_str(), "Annotation token regex");
    }
}

#[derive(Default)]
struct SchemaBuilder {
    specs: Vec<AnnotationTokenSpec>,
    spec_index: HashMap<String, usize>,
    groups: Vec<Group>,
    token_groups: HashMap<String, usize>,
}

impl SchemaBuilder {
    fn add_token(&mut self, decl: TokenDecl) -> Result<AnnotationTokenSpec> {
        if decl.token.trim().is_empty() {
            return Err(Error::BlankToken(decl.token));
        }
        if self.spec_index.contains_key(&decl.token) {
            return Err(Error::DuplicateToken(decl.token));
        }

        let spec = match decl.shape {
            TokenShape::FreeText { optional } => AnnotationTokenSpec {
                token: decl.token,
                kind: TokenKind::FreeText,
                choices: Vec::new(),
                required: !optional,
            },
            TokenShape::Choices {
                choices,
                optional,
                multiple,
            } => {
                if choices.is_empty() {
                    return Err(Error::EmptyChoices(decl.token));
                }
                let mut unique: Vec<String> = Vec::with_capacity(choices.len());
                for choice in choices {
                    if !unique.contains(&choice) {
                        unique.push(choice);
                    }
                }
                AnnotationTokenSpec {
                    token: decl.token,
                    kind: if multiple {
                        TokenKind::MultiChoice
                    } else {
                        TokenKind::SingleChoice
                    },
                    choices: unique,
                    required: !optional,
                }
            }
        };

        self.spec_index.insert(spec.token.clone(), self.specs.len());
        self.specs.push(spec.clone());
        Ok(spec)
    }

    fn finish(self) -> Result<Schema> {
        if self.specs.is_empty() {
            return Err(Error::InvalidConfig("no annotations are configured".into()));
        }

        // Longest first so a token that prefixes another never shadows it.
        let mut escaped: Vec<&str> = self.specs.iter().map(|spec| spec.token.as_str()).collect();
        escaped.sort_by_key(|token| std::cmp::Reverse(token.len()));
        let alternation = escaped
            .into_iter()
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join("|");

        let token_regex = Regex::new(&format!(
            r"(?P<space>[ \t]*)(?P<token>{alternation})(?P<data>[^\n]*)"
        ))?;
        let token_prefix = Regex::new(&format!(r"\A(?:{alternation})"))?;

        let optional: HashSet<String> = self
            .groups
            .iter()
            .flat_map(|group| group.optional.iter().cloned())
            .collect();

        Ok(Schema {
            specs: self.specs,
            spec_index: self.spec_index,
            groups: self.groups,
            token_groups: self.token_groups,
            optional,
            token_regex,
            token_prefix,
        })
    }
}

fn key_as_str(key: &Value) -> Result<&str> {
    key.as_str().ok_or_else(|| {
        Error::InvalidConfig(format!(
            "annotation names must be strings, found {}",
            describe_value(key)
        ))
    })
}

fn parse_group(name: &str, members: &[Value]) -> Result<SchemaEntry> {
    if members.len() < 2 {
        return Err(Error::GroupTooSmall(name.to_string()));
    }

    let mut decls = Vec::with_capacity(members.len());
    for member in members {
        let map = member.as_mapping().ok_or_else(|| Error::MalformedGroupMember {
            group: name.to_string(),
            detail: format!("expected a single-key mapping, found {}", describe_value(member)),
        })?;
        if map.len() != 1 {
            return Err(Error::MalformedGroupMember {
                group: name.to_string(),
                detail: format!(
                    "expected exactly one token per member, found {}",
                    describe_value(member)
                ),
            });
        }
        for (key, value) in map {
            let token = key_as_str(key)?;
            if value.is_sequence() {
                return Err(Error::UnknownAnnotationShape(describe_value(member)));
            }
            decls.push(parse_token(token, value)?);
        }
    }

    Ok(SchemaEntry::group(name, decls))
}

fn parse_token(token: &str, value: &Value) -> Result<TokenDecl> {
    match value {
        Value::Null => Ok(TokenDecl::free_text(token)),
        Value::Mapping(map) => parse_choice_map(token, map),
        other => Err(Error::UnknownAnnotationShape(format!(
            "{{{:?}: {}}}",
            token,
            describe_value(other)
        ))),
    }
}

fn parse_choice_map(token: &str, map: &Mapping) -> Result<TokenDecl> {
    let unknown_shape = || {
        Error::UnknownAnnotationShape(format!(
            "{{{:?}: {}}}",
            token,
            describe_value(&Value::Mapping(map.clone()))
        ))
    };

    let mut choices = None;
    let mut optional = false;

    for (key, value) in map {
        match key.as_str() {
            Some(KEY_CHOICES) => {
                let list = value.as_sequence().ok_or_else(unknown_shape)?;
                let parsed = list
                    .iter()
                    .map(|choice| scalar_to_string(choice).ok_or_else(unknown_shape))
                    .collect::<Result<Vec<_>>>()?;
                choices = Some(parsed);
            }
            Some(KEY_OPTIONAL) => {
                optional = value.as_bool().ok_or_else(unknown_shape)?;
            }
            _ => return Err(unknown_shape()),
        }
    }

    let shape = match choices {
        Some(choices) => TokenShape::Choices {
            choices,
            optional,
            multiple: true,
        },
        None => TokenShape::FreeText { optional },
    };

    Ok(TokenDecl {
        token: token.to_string(),
        shape,
    })
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn describe_value(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}"))
}
