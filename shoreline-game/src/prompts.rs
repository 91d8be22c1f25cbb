//! Prompt rendering for the four oracle roles.
use crate::constants::{DEFAULT_CHALLENGES, DEFAULT_OPPORTUNITIES};
use crate::events::RandomEvent;
use crate::normalize::{Decision, EnvironmentFeedback};
use crate::oracle::OracleRole;
use crate::state::Scores;

const DECISION_TEMPLATE: &str = include_str!("../assets/prompts/decision.txt");
const ARBITRATION_TEMPLATE: &str = include_str!("../assets/prompts/arbitration.txt");
const ENVIRONMENT_TEMPLATE: &str = include_str!("../assets/prompts/environment.txt");
const EVENT_ARBITRATION_TEMPLATE: &str = include_str!("../assets/prompts/event_arbitration.txt");
const REFERENCE_TABLE: &str = include_str!("../assets/prompts/reference_table.txt");

/// Renders the pre-formatted prompt strings a tick needs.
pub trait PromptBook {
    fn decision(&self, scores: Scores, environment: &EnvironmentFeedback) -> String;

    fn arbitration(&self, decision: &Decision) -> String;

    fn environment(&self, decision: &Decision) -> String;

    fn event_arbitration(&self, event: &RandomEvent, scores: Scores) -> String;

    fn system_prompt(&self, _role: OracleRole) -> Option<String> {
        None
    }
}

/// Bundled templates and reference scoring table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinPrompts {
    reference_table: String,
    system_prompt: Option<String>,
}

impl Default for BuiltinPrompts {
    fn default() -> Self {
        Self {
            reference_table: REFERENCE_TABLE.trim_end().to_string(),
            system_prompt: None,
        }
    }
}

impl BuiltinPrompts {
    #[must_use]
    pub fn with_reference_table(mut self, table: impl Into<String>) -> Self {
        self.reference_table = table.into();
        self
    }

    /// System prompt sent with every role.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }

    #[must_use]
    pub fn reference_table(&self) -> &str {
        &self.reference_table
    }
}

impl PromptBook for BuiltinPrompts {
    fn decision(&self, scores: Scores, environment: &EnvironmentFeedback) -> String {
        let (opportunities, challenges) = if environment.is_empty() {
            (DEFAULT_OPPORTUNITIES, DEFAULT_CHALLENGES)
        } else {
            (
                environment.opportunities.as_str(),
                environment.challenges.as_str(),
            )
        };
        let country = scores.country.to_string();
        let shoreline = scores.shoreline.to_string();
        render(
            DECISION_TEMPLATE,
            &[
                ("country_score", country.as_str()),
                ("shoreline_score", shoreline.as_str()),
                ("opportunities", opportunities),
                ("challenges", challenges),
                ("reference_table", self.reference_table.as_str()),
            ],
        )
    }

    fn arbitration(&self, decision: &Decision) -> String {
        let actions = decision.as_prompt_text();
        render(
            ARBITRATION_TEMPLATE,
            &[
                ("actions", actions.as_str()),
                ("reference_table", self.reference_table.as_str()),
            ],
        )
    }

    fn environment(&self, decision: &Decision) -> String {
        let actions = decision.as_prompt_text();
        render(ENVIRONMENT_TEMPLATE, &[("actions", actions.as_str())])
    }

    fn event_arbitration(&self, event: &RandomEvent, scores: Scores) -> String {
        let country = scores.country.to_string();
        let shoreline = scores.shoreline.to_string();
        render(
            EVENT_ARBITRATION_TEMPLATE,
            &[
                ("country_score", country.as_str()),
                ("shoreline_score", shoreline.as_str()),
                ("event_name", event.name.as_str()),
                ("event_description", event.description.as_str()),
            ],
        )
    }

    fn system_prompt(&self, _role: OracleRole) -> Option<String> {
        self.system_prompt.clone()
    }
}

/// Substitute `{name}` placeholders; unknown placeholders are left as they are.
#[must_use]
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (close, *value))
        });
        match replaced {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
