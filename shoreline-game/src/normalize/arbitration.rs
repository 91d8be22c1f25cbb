use serde::{Deserialize, Serialize};

use super::{
    Continuation, Normalized, ParseIssue, Schema, SectionRule, Sections, clean_response,
    leading_integer, scan, strip_reasoning,
};
use crate::state::AxisDelta;

/// Score deltas assigned by the referee to each of the two actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbitrationScores {
    pub first_country: i32,
    pub first_shoreline: i32,
    pub second_country: i32,
    pub second_shoreline: i32,
}

impl ArbitrationScores {
    /// Combined delta of both actions per axis.
    #[must_use]
    pub fn total(&self) -> AxisDelta {
        AxisDelta::new(
            self.first_country.saturating_add(self.second_country),
            self.first_shoreline.saturating_add(self.second_shoreline),
        )
    }

    fn field_mut(&mut self, field: Field) -> &mut i32 {
        match field {
            Field::FirstCountry => &mut self.first_country,
            Field::FirstShoreline => &mut self.first_shoreline,
            Field::SecondCountry => &mut self.second_country,
            Field::SecondShoreline => &mut self.second_shoreline,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    FirstCountry,
    FirstShoreline,
    SecondCountry,
    SecondShoreline,
}

const FIELDS: [(Field, &str); 4] = [
    (Field::FirstCountry, "first_country_rank"),
    (Field::FirstShoreline, "first_shoreline_rank"),
    (Field::SecondCountry, "second_country_rank"),
    (Field::SecondShoreline, "second_shoreline_rank"),
];

const ARBITRATION_RULES: &[SectionRule] = &[
    SectionRule {
        section: "first_country_rank",
        prefixes: &["first_country_rank:", "first_country_rank："],
    },
    SectionRule {
        section: "first_shoreline_rank",
        prefixes: &["first_shoreline_rank:", "first_shoreline_rank："],
    },
    SectionRule {
        section: "second_country_rank",
        prefixes: &["second_country_rank:", "second_country_rank："],
    },
    SectionRule {
        section: "second_shoreline_rank",
        prefixes: &["second_shoreline_rank:", "second_shoreline_rank："],
    },
];

const ARBITRATION_SCHEMA: Schema = Schema {
    rules: ARBITRATION_RULES,
    continuation: Continuation::LastWins,
};

const COUNTRY_CHANGE: &str = "country score change:";
const SHORELINE_CHANGE: &str = "shoreline score change:";

/// Parse the referee response.
///
/// The primary grammar is one `<field>_rank: <n>` line per field. Fields it
/// does not supply are taken from the fallback grammar: `ACTION_1:` /
/// `ACTION_2:` context lines followed by `Country Score Change: <±n>` and
/// `Shoreline Score Change: <±n>`. Anything still missing is zero.
/// Reasoning blocks are ignored and a repeated label keeps its last value.
#[must_use]
pub fn parse_arbitration(raw: &str) -> Normalized<ArbitrationScores> {
    let answer = strip_reasoning(raw);
    let sections = scan(&clean_response(&answer, &ARBITRATION_SCHEMA), &ARBITRATION_SCHEMA);
    let mut scores = ArbitrationScores::default();
    let mut issues = Vec::new();
    let mut resolved = [false; 4];

    for (slot, (field, name)) in FIELDS.iter().enumerate() {
        if !sections.saw(name) {
            continue;
        }
        resolved[slot] = true;
        match read_number(&sections, name) {
            Some(value) => *scores.field_mut(*field) = value,
            None => issues.push(ParseIssue::InvalidNumber {
                field: (*name).to_string(),
                raw: sections.get(name).to_string(),
            }),
        }
    }

    if resolved.iter().any(|done| !done) {
        let fallback = parse_change_lines(&answer, &mut issues);
        let mut used = false;
        for (slot, (field, name)) in FIELDS.iter().enumerate() {
            if resolved[slot] {
                continue;
            }
            if let Some(value) = fallback[slot] {
                *scores.field_mut(*field) = value;
                used = true;
            } else {
                issues.push(ParseIssue::MissingSection {
                    section: (*name).to_string(),
                });
            }
        }
        if used {
            issues.push(ParseIssue::FallbackGrammar);
        }
    }

    Normalized::new(scores, issues)
}

fn read_number(sections: &Sections, name: &str) -> Option<i32> {
    leading_integer(sections.get(name)).and_then(|v| i32::try_from(v).ok())
}

/// Context-tracking scan for the `Score Change` grammar, indexed like `FIELDS`.
fn parse_change_lines(raw: &str, issues: &mut Vec<ParseIssue>) -> [Option<i32>; 4] {
    let mut found = [None; 4];
    let mut action: Option<usize> = None;
    for raw_line in raw.lines() {
        let line = raw_line
            .trim()
            .trim_start_matches(['-', '*', ' '])
            .trim();
        let lower = line.to_ascii_lowercase();
        if lower.starts_with("action_1:") || lower.starts_with("action 1:") {
            action = Some(0);
            continue;
        }
        if lower.starts_with("action_2:") || lower.starts_with("action 2:") {
            action = Some(1);
            continue;
        }
        let Some(action) = action else {
            continue;
        };
        for (axis, marker) in [(0, COUNTRY_CHANGE), (1, SHORELINE_CHANGE)] {
            let Some(pos) = lower.find(marker) else {
                continue;
            };
            let slot = action * 2 + axis;
            let value_text = lower[pos + marker.len()..].replace(' ', "");
            match leading_integer(&value_text).and_then(|v| i32::try_from(v).ok()) {
                Some(value) => found[slot] = Some(value),
                None => issues.push(ParseIssue::InvalidNumber {
                    field: FIELDS[slot].1.to_string(),
                    raw: value_text,
                }),
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_grammar() {
        let raw = "```\nfirst_country_rank: 3\nfirst_shoreline_rank: -2\nsecond_country_rank: +1\nsecond_shoreline_rank: 0\n```";
        let parsed = parse_arbitration(raw);
        assert_eq!(
            parsed.value,
            ArbitrationScores {
                first_country: 3,
                first_shoreline: -2,
                second_country: 1,
                second_shoreline: 0,
            }
        );
        assert!(parsed.is_clean());
        assert_eq!(parsed.value.total(), AxisDelta::new(4, -2));
    }

    #[test]
    fn bad_line_defaults_only_that_field() {
        let raw = "first_country_rank: lots\nfirst_shoreline_rank: 2\nsecond_country_rank: 1\nsecond_shoreline_rank: -1";
        let parsed = parse_arbitration(raw);
        assert_eq!(parsed.value.first_country, 0);
        assert_eq!(parsed.value.first_shoreline, 2);
        assert_eq!(parsed.value.second_shoreline, -1);
        assert_eq!(
            parsed.issues,
            vec![ParseIssue::InvalidNumber {
                field: String::from("first_country_rank"),
                raw: String::from("lots"),
            }]
        );
    }

    #[test]
    fn fallback_grammar_reads_score_change_lines() {
        let raw = "Evaluation follows.\nACTION_1: build a seawall\nCountry Score Change: +4\nShoreline Score Change: -3\n\nACTION_2: fishing subsidy\n- Country Score Change: + 2\n- Shoreline Score Change: -1";
        let parsed = parse_arbitration(raw);
        assert_eq!(
            parsed.value,
            ArbitrationScores {
                first_country: 4,
                first_shoreline: -3,
                second_country: 2,
                second_shoreline: -1,
            }
        );
        assert_eq!(parsed.issues, vec![ParseIssue::FallbackGrammar]);
    }

    #[test]
    fn change_lines_without_action_context_are_ignored() {
        let parsed = parse_arbitration("Country Score Change: +9");
        assert_eq!(parsed.value, ArbitrationScores::default());
        assert_eq!(parsed.issues.len(), 4);
    }

    #[test]
    fn primary_values_win_over_fallback() {
        let raw = "first_country_rank: 1\nACTION_1: x\nCountry Score Change: +5\nShoreline Score Change: +2";
        let parsed = parse_arbitration(raw);
        assert_eq!(parsed.value.first_country, 1);
        assert_eq!(parsed.value.first_shoreline, 2);
        assert_eq!(parsed.value.second_country, 0);
        assert!(parsed.issues.contains(&ParseIssue::FallbackGrammar));
    }

    #[test]
    fn draft_inside_reasoning_is_ignored() {
        let raw = "<think>\nfirst_country_rank: 5\nfirst_shoreline_rank: -4\nsecond_country_rank: 5\nsecond_shoreline_rank: -4\n</think>\nfirst_country_rank: 1\nfirst_shoreline_rank: 1\nsecond_country_rank: 1\nsecond_shoreline_rank: 1";
        let parsed = parse_arbitration(raw);
        assert_eq!(parsed.value.total(), AxisDelta::new(2, 2));
        assert!(parsed.is_clean());
    }

    #[test]
    fn repeated_label_keeps_the_last_value() {
        let raw = "first_country_rank: 3\nfirst_shoreline_rank: -1\nsecond_country_rank: 2\nsecond_shoreline_rank: 0\nOn reflection:\nfirst_country_rank: 1";
        let parsed = parse_arbitration(raw);
        assert_eq!(parsed.value.first_country, 1);
        assert_eq!(parsed.value.second_country, 2);
        assert!(parsed.is_clean());
    }

    #[test]
    fn garbage_never_panics() {
        for raw in ["", "```", "first_country_rank:", "ACTION_2:\nCountry Score Change:", "é"] {
            let parsed = parse_arbitration(raw);
            assert_eq!(parsed.value.total(), AxisDelta::ZERO);
        }
    }
}
