use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::{Continuation, Normalized, Schema, SectionRule, missing, scan};

/// The two actions proposed by the decision actor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub action_1: String,
    pub action_2: String,
}

impl Decision {
    #[must_use]
    pub fn new(action_1: impl Into<String>, action_2: impl Into<String>) -> Self {
        Self {
            action_1: action_1.into(),
            action_2: action_2.into(),
        }
    }

    /// Both actions as the text the later prompts quote.
    #[must_use]
    pub fn as_prompt_text(&self) -> String {
        format!("ACTION_1: {}\nACTION_2: {}", self.action_1, self.action_2)
    }
}

pub(super) const ACTION_1: &str = "action_1";
pub(super) const ACTION_2: &str = "action_2";

pub(super) const DECISION_RULES: &[SectionRule] = &[
    SectionRule {
        section: ACTION_1,
        prefixes: &["ACTION_1:", "ACTION 1:", "**ACTION_1:**", "行动1:", "行动1："],
    },
    SectionRule {
        section: ACTION_2,
        prefixes: &["ACTION_2:", "ACTION 2:", "**ACTION_2:**", "行动2:", "行动2："],
    },
];

const DECISION_SCHEMA: Schema = Schema {
    rules: DECISION_RULES,
    continuation: Continuation::Concatenate,
};

fn think_block() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<think>.*?</think>").ok())
        .as_ref()
}

fn fenced_block() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:[A-Za-z0-9_-]*[ \t]*\r?\n)?(.*?)```").ok())
        .as_ref()
}

/// Remove `<think>` reasoning blocks.
///
/// A dangling `</think>` drops everything before it; a dangling `<think>`
/// drops everything after it.
#[must_use]
pub fn strip_reasoning(raw: &str) -> String {
    let mut text = think_block().map_or_else(
        || raw.to_string(),
        |re| re.replace_all(raw, "").into_owned(),
    );
    if let Some(idx) = find_ignore_case(&text, "</think>") {
        text = text[idx + "</think>".len()..].to_string();
    }
    if let Some(idx) = find_ignore_case(&text, "<think>") {
        text.truncate(idx);
    }
    text
}

/// Remove reasoning markup and narrow the text to a fenced block when one
/// holds recognizable sections.
///
/// A fence may open on its own line, optionally tagged, or directly in front
/// of the content.
#[must_use]
pub fn clean_response(raw: &str, schema: &Schema) -> String {
    let text = strip_reasoning(raw);
    let Some(re) = fenced_block() else {
        return text;
    };
    let interiors: Vec<&str> = re
        .captures_iter(&text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();
    let chosen = interiors
        .iter()
        .find(|interior| schema.recognizes(interior))
        .or_else(|| if interiors.len() == 1 { interiors.first() } else { None });
    match chosen {
        Some(interior) if schema.recognizes(interior) || !schema.recognizes(&text) => {
            (*interior).to_string()
        }
        _ => text,
    }
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().find(needle)
}

/// Parse a decision response; never fails.
#[must_use]
pub fn parse_decision(raw: &str) -> Normalized<Decision> {
    let cleaned = clean_response(raw, &DECISION_SCHEMA);
    let sections = scan(&cleaned, &DECISION_SCHEMA);
    let issues = missing(&sections, &[ACTION_1, ACTION_2]);
    Normalized::new(
        Decision::new(sections.get(ACTION_1), sections.get(ACTION_2)),
        issues,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::ParseIssue;

    #[test]
    fn trailing_fence_is_ignored() {
        let parsed = parse_decision("ACTION_1: build seawall\nACTION_2: subsidize fishing\n```");
        assert_eq!(
            parsed.value,
            Decision::new("build seawall", "subsidize fishing")
        );
        assert!(parsed.is_clean());
    }

    #[test]
    fn unmarked_text_yields_empty_actions() {
        let parsed = parse_decision("I think we should help.\n");
        assert_eq!(parsed.value, Decision::default());
        assert_eq!(parsed.issues.len(), 2);
        assert!(matches!(
            &parsed.issues[0],
            ParseIssue::MissingSection { section } if section == "action_1"
        ));
    }

    #[test]
    fn reasoning_and_prose_are_stripped() {
        let raw = "<think>\nACTION_1: wrong\nweigh the options\n</think>\nHere is my plan:\n```\nACTION_1: restore mangroves\nalong the delta\nACTION_2: cap trawling\n```\nHope this helps!";
        let parsed = parse_decision(raw);
        assert_eq!(parsed.value.action_1, "restore mangroves along the delta");
        assert_eq!(parsed.value.action_2, "cap trawling");
    }

    #[test]
    fn unclosed_reasoning_before_answer_is_dropped() {
        let raw = "thinking hard...\n</think>\nACTION_1: dunes\nACTION_2: wetlands";
        let parsed = parse_decision(raw);
        assert_eq!(parsed.value, Decision::new("dunes", "wetlands"));
    }

    #[test]
    fn first_fence_with_sections_wins() {
        let raw = "```\nsome notes\n```\n```text\nACTION_1: a\nACTION_2: b\n```";
        let parsed = parse_decision(raw);
        assert_eq!(parsed.value, Decision::new("a", "b"));
    }

    #[test]
    fn fence_opened_inline_is_recognized() {
        let parsed = parse_decision("```ACTION_1: build seawall\nACTION_2: subsidize fishing```");
        assert_eq!(
            parsed.value,
            Decision::new("build seawall", "subsidize fishing")
        );
        assert!(parsed.is_clean());

        let prose = "Plan below. ```ACTION_1: dunes\nACTION_2: wetlands``` Thanks.";
        assert_eq!(parse_decision(prose).value, Decision::new("dunes", "wetlands"));
    }

    #[test]
    fn labels_are_case_insensitive() {
        let parsed = parse_decision("action_1: reef survey\nAction 2: port upgrade");
        assert_eq!(parsed.value, Decision::new("reef survey", "port upgrade"));
    }

    #[test]
    fn prompt_text_round_trips_through_parser() {
        let decision = Decision::new("seawall", "fishing quota");
        assert_eq!(parse_decision(&decision.as_prompt_text()).value, decision);
    }
}
