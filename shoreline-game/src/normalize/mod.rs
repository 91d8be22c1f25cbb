//! Tolerant normalization of free-text oracle responses.
//!
//! Each schema is a declarative table of section labels and their prefix
//! synonyms, driven by one line-oriented scan. Parsing never fails: missing
//! sections default to empty text or zero and are reported as [`ParseIssue`]s.
use serde::{Deserialize, Serialize};
use std::fmt;

mod arbitration;
mod decision;
mod event_impact;
mod feedback;

pub use arbitration::{ArbitrationScores, parse_arbitration};
pub use decision::{Decision, clean_response, parse_decision, strip_reasoning};
pub use event_impact::{EventAssessment, parse_event_assessment};
pub use feedback::{EnvironmentFeedback, parse_feedback};

/// How repeated content for an already populated section is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Append with a single space.
    Concatenate,
    /// Keep the first non-empty value and ignore the rest.
    FirstWins,
    /// A repeated label replaces the earlier value; unlabeled lines only fill
    /// an empty section.
    LastWins,
}

/// A canonical section and the line prefixes that open it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionRule {
    pub section: &'static str,
    /// Checked in order, ASCII case-insensitive.
    pub prefixes: &'static [&'static str],
}

/// A section table plus its continuation behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    pub rules: &'static [SectionRule],
    pub continuation: Continuation,
}

impl Schema {
    fn match_label<'l>(&self, line: &'l str) -> Option<(&'static str, &'l str)> {
        self.rules.iter().find_map(|rule| {
            rule.prefixes
                .iter()
                .find_map(|prefix| strip_prefix_ignore_case(line, prefix))
                .map(|rest| (rule.section, rest))
        })
    }

    /// Whether any line of `text` opens a known section.
    #[must_use]
    pub fn recognizes(&self, text: &str) -> bool {
        text.lines()
            .any(|line| self.match_label(line.trim()).is_some())
    }
}

/// Section contents collected by [`scan`], in schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sections {
    values: Vec<(&'static str, String)>,
    seen: Vec<&'static str>,
    discarded_lines: usize,
}

impl Sections {
    /// Content of `section`, empty when it was never seen.
    #[must_use]
    pub fn get(&self, section: &str) -> &str {
        self.values
            .iter()
            .find(|(name, _)| *name == section)
            .map_or("", |(_, value)| value.as_str())
    }

    /// Whether a label for `section` appeared at all.
    #[must_use]
    pub fn saw(&self, section: &str) -> bool {
        self.seen.contains(&section)
    }

    /// Lines dropped before any section opened.
    #[must_use]
    pub const fn discarded_lines(&self) -> usize {
        self.discarded_lines
    }

    fn reset(&mut self, section: &'static str) {
        if let Some((_, value)) = self.values.iter_mut().find(|(name, _)| *name == section) {
            value.clear();
        }
    }

    fn push(&mut self, section: &'static str, content: &str, continuation: Continuation) {
        let Some((_, value)) = self.values.iter_mut().find(|(name, _)| *name == section) else {
            return;
        };
        if value.is_empty() {
            value.push_str(content);
        } else if continuation == Continuation::Concatenate {
            value.push(' ');
            value.push_str(content);
        }
    }
}

/// Line-oriented scan shared by every schema.
///
/// Blank lines and code-fence delimiters are skipped. A line that starts with
/// a known prefix opens that section and its remainder becomes the first
/// chunk; other lines continue the open section, or are dropped when none is
/// open yet. Fence markers glued to either end of a line are trimmed off.
#[must_use]
pub fn scan(text: &str, schema: &Schema) -> Sections {
    let mut sections = Sections {
        values: schema
            .rules
            .iter()
            .map(|rule| (rule.section, String::new()))
            .collect(),
        seen: Vec::new(),
        discarded_lines: 0,
    };
    let mut current: Option<&'static str> = None;
    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || is_fence_delimiter(line) {
            continue;
        }
        let line = strip_inline_fences(line);
        if line.is_empty() {
            continue;
        }
        if let Some((section, rest)) = schema.match_label(line) {
            current = Some(section);
            if !sections.seen.contains(&section) {
                sections.seen.push(section);
            }
            if schema.continuation == Continuation::LastWins {
                sections.reset(section);
            }
            let rest = rest.trim();
            if !rest.is_empty() {
                sections.push(section, rest, schema.continuation);
            }
        } else if let Some(section) = current {
            sections.push(section, line, schema.continuation);
        } else {
            sections.discarded_lines += 1;
        }
    }
    sections
}

fn strip_prefix_ignore_case<'l>(line: &'l str, prefix: &str) -> Option<&'l str> {
    let head = line.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        line.get(prefix.len()..)
    } else {
        None
    }
}

/// `line` without a fence marker glued to its start or end.
fn strip_inline_fences(line: &str) -> &str {
    let line = line.strip_prefix("```").map_or(line, str::trim_start);
    line.strip_suffix("```").map_or(line, str::trim_end)
}

/// A line made only of a fence marker, optionally tagged with a language.
pub(crate) fn is_fence_delimiter(line: &str) -> bool {
    line.strip_prefix("```").is_some_and(|tag| {
        tag.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
}

/// Diagnostic raised while normalizing; never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ParseIssue {
    /// The section never appeared; its default was used.
    MissingSection { section: String },
    /// A numeric line could not be read; the field defaults to zero.
    InvalidNumber { field: String, raw: String },
    /// A value was outside its allowed range and was clamped.
    Clamped { field: String, raw: i64, clamped: i32 },
    /// The primary grammar found nothing and the fallback grammar was used.
    FallbackGrammar,
}

impl fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSection { section } => write!(f, "missing `{section}`, using default"),
            Self::InvalidNumber { field, raw } => {
                write!(f, "`{field}` is not an integer ({raw:?}), using 0")
            }
            Self::Clamped {
                field,
                raw,
                clamped,
            } => write!(f, "`{field}` value {raw} clamped to {clamped}"),
            Self::FallbackGrammar => f.write_str("primary grammar empty, used fallback grammar"),
        }
    }
}

/// A parsed value together with the issues met along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized<T> {
    pub value: T,
    pub issues: Vec<ParseIssue>,
}

impl<T> Normalized<T> {
    #[must_use]
    pub const fn new(value: T, issues: Vec<ParseIssue>) -> Self {
        Self { value, issues }
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

fn missing(sections: &Sections, names: &[&'static str]) -> Vec<ParseIssue> {
    names
        .iter()
        .filter(|name| sections.get(name).is_empty())
        .map(|name| ParseIssue::MissingSection {
            section: (*name).to_string(),
        })
        .collect()
}

/// Read a signed integer from the start of `raw` (`+3`, `-2 points`, `1.`).
fn leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim().trim_start_matches(['*', '`', '"']);
    let end = trimmed
        .char_indices()
        .find(|&(idx, c)| !(c.is_ascii_digit() || (idx == 0 && (c == '+' || c == '-'))))
        .map_or(trimmed.len(), |(idx, _)| idx);
    trimmed.get(..end)?.parse::<i64>().ok()
}
