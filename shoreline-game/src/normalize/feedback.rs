use serde::{Deserialize, Serialize};

use super::{Continuation, Normalized, Schema, SectionRule, missing, scan};

/// Ecosystem response text carried into the next decision prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentFeedback {
    #[serde(default)]
    pub opportunities: String,
    #[serde(default)]
    pub challenges: String,
}

impl EnvironmentFeedback {
    #[must_use]
    pub fn new(opportunities: impl Into<String>, challenges: impl Into<String>) -> Self {
        Self {
            opportunities: opportunities.into(),
            challenges: challenges.into(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.opportunities.trim().is_empty() && self.challenges.trim().is_empty()
    }
}

const OPPORTUNITIES: &str = "opportunities";
const CHALLENGES: &str = "challenges";

const FEEDBACK_RULES: &[SectionRule] = &[
    SectionRule {
        section: OPPORTUNITIES,
        prefixes: &[
            "CHANCES:",
            "OPPORTUNITIES:",
            "**OPPORTUNITIES:**",
            "**CHANCES:**",
            "机遇:",
            "机遇：",
        ],
    },
    SectionRule {
        section: CHALLENGES,
        prefixes: &["CHALLENGES:", "**CHALLENGES:**", "挑战:", "挑战："],
    },
];

const FEEDBACK_SCHEMA: Schema = Schema {
    rules: FEEDBACK_RULES,
    continuation: Continuation::FirstWins,
};

/// Drop a leading bullet (`-`, `*`, `•`) that is followed by whitespace or
/// ends the line.
fn strip_bullet(line: &str) -> &str {
    let trimmed = line.trim_start();
    for bullet in ['-', '*', '•'] {
        if let Some(rest) = trimmed.strip_prefix(bullet)
            && (rest.is_empty() || rest.starts_with(char::is_whitespace))
        {
            return rest.trim_start();
        }
    }
    trimmed
}

/// Parse an environment feedback response; the first value per section wins.
#[must_use]
pub fn parse_feedback(raw: &str) -> Normalized<EnvironmentFeedback> {
    let unbulleted: String = raw
        .lines()
        .map(strip_bullet)
        .collect::<Vec<_>>()
        .join("\n");
    let sections = scan(&unbulleted, &FEEDBACK_SCHEMA);
    let issues = missing(&sections, &[OPPORTUNITIES, CHALLENGES]);
    Normalized::new(
        EnvironmentFeedback::new(sections.get(OPPORTUNITIES), sections.get(CHALLENGES)),
        issues,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_labels_on_one_line() {
        let parsed = parse_feedback(
            "CHANCES: wetland restoration draws birds\nCHALLENGES: runoff from farms",
        );
        assert_eq!(
            parsed.value,
            EnvironmentFeedback::new("wetland restoration draws birds", "runoff from farms")
        );
        assert!(parsed.is_clean());
    }

    #[test]
    fn bilingual_labels_with_bullets_keep_first_item() {
        let raw = "```\n机遇：\n- 红树林恢复\n- 渔业回暖\n挑战:\n- 海平面上升\n- 塑料污染\n```";
        let parsed = parse_feedback(raw);
        assert_eq!(parsed.value.opportunities, "红树林恢复");
        assert_eq!(parsed.value.challenges, "海平面上升");
    }

    #[test]
    fn dashed_labels_and_mixed_case() {
        let raw = "Sure, here you go.\n- Opportunities: kelp farming\n- Challenges:\n-\n  acid water\n  more text";
        let parsed = parse_feedback(raw);
        assert_eq!(parsed.value.opportunities, "kelp farming");
        assert_eq!(parsed.value.challenges, "acid water");
    }

    #[test]
    fn repeated_label_does_not_override() {
        let parsed = parse_feedback("CHANCES: first\nCHANCES: second\nCHALLENGES: c");
        assert_eq!(parsed.value.opportunities, "first");
    }

    #[test]
    fn missing_sections_are_empty_and_reported() {
        let parsed = parse_feedback("The sea is calm today.");
        assert!(parsed.value.is_empty());
        assert_eq!(parsed.issues.len(), 2);
    }

    #[test]
    fn hyphenated_words_survive() {
        assert_eq!(strip_bullet("-well-being"), "-well-being");
        assert_eq!(strip_bullet("  * item"), "item");
        assert_eq!(strip_bullet("-"), "");
    }
}
