use serde::{Deserialize, Serialize};

use super::{
    Continuation, Normalized, ParseIssue, Schema, SectionRule, Sections, clean_response,
    leading_integer, scan,
};
use crate::numbers::clamp_impact;

/// Referee verdict on a single occurred event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAssessment {
    pub country_impact: i32,
    pub shoreline_impact: i32,
    pub reasoning: String,
}

const COUNTRY_IMPACT: &str = "country_impact";
const SHORELINE_IMPACT: &str = "shoreline_impact";
const REASONING: &str = "reasoning";

const EVENT_RULES: &[SectionRule] = &[
    SectionRule {
        section: COUNTRY_IMPACT,
        prefixes: &["country_impact:", "country impact:"],
    },
    SectionRule {
        section: SHORELINE_IMPACT,
        prefixes: &["shoreline_impact:", "shoreline impact:"],
    },
    SectionRule {
        section: REASONING,
        prefixes: &["reasoning:", "reason:"],
    },
];

const EVENT_SCHEMA: Schema = Schema {
    rules: EVENT_RULES,
    continuation: Continuation::Concatenate,
};

/// Parse an event-arbitration response. Impacts are clamped to `[-3, 3]`;
/// an unreadable line leaves that field at zero or empty.
#[must_use]
pub fn parse_event_assessment(raw: &str) -> Normalized<EventAssessment> {
    let cleaned = clean_response(raw, &EVENT_SCHEMA);
    let sections = scan(&cleaned, &EVENT_SCHEMA);
    let mut issues = Vec::new();
    let country_impact = read_impact(&sections, COUNTRY_IMPACT, &mut issues);
    let shoreline_impact = read_impact(&sections, SHORELINE_IMPACT, &mut issues);
    let reasoning = sections.get(REASONING).to_string();
    if reasoning.is_empty() {
        issues.push(ParseIssue::MissingSection {
            section: REASONING.to_string(),
        });
    }
    Normalized::new(
        EventAssessment {
            country_impact,
            shoreline_impact,
            reasoning,
        },
        issues,
    )
}

fn read_impact(sections: &Sections, name: &'static str, issues: &mut Vec<ParseIssue>) -> i32 {
    let text = sections.get(name);
    if text.is_empty() {
        issues.push(ParseIssue::MissingSection {
            section: name.to_string(),
        });
        return 0;
    }
    let Some(raw) = leading_integer(text) else {
        issues.push(ParseIssue::InvalidNumber {
            field: name.to_string(),
            raw: text.to_string(),
        });
        return 0;
    };
    let narrowed = i32::try_from(raw).unwrap_or(if raw < 0 { i32::MIN } else { i32::MAX });
    let clamped = clamp_impact(narrowed);
    if i64::from(clamped) != raw {
        issues.push(ParseIssue::Clamped {
            field: name.to_string(),
            raw,
            clamped,
        });
    }
    clamped
}
