//! Offline oracle for dry runs and CLI tests.
//!
//! Every reply is a pure function of the oracle seed, the role and the prompt
//! text, so a game replays exactly under the same seed. Replies are
//! occasionally wrapped the way hosted models wrap them (preambles, fences,
//! `<think>` blocks, alternate labels) to exercise the normalizers.
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};
use shoreline_game::{Oracle, OracleError, OracleRequest, OracleRole};

/// Candidate actions with their typical `(country, shoreline)` effect.
const ACTIONS: &[(&str, i32, i32)] = &[
    ("Expand the container port at the river mouth", 3, -2),
    ("Build a coastal resort strip", 2, -2),
    ("License offshore gas drilling", 3, -3),
    ("Dredge the main shipping channel", 2, -1),
    ("Subsidize sustainable fisheries cooperatives", 1, 0),
    ("Restore the mangrove belt along the delta", 0, 2),
    ("Create a marine protected area around the reef", -1, 2),
    ("Fund eco-tourism guide training", 1, 1),
    ("Upgrade municipal wastewater treatment", 0, 1),
    ("Raise a concrete seawall at the capital", 1, -1),
];

const OPPORTUNITIES: &[&str] = &[
    "Seagrass meadows are spreading into the sheltered bays",
    "Returning migratory birds draw nature tourists",
    "Oyster reefs are filtering the estuary again",
    "Cooler currents bring richer fish stocks",
];

const CHALLENGES: &[&str] = &[
    "Sediment plumes smother the inner reef",
    "Plastic debris accumulates on the northern beaches",
    "Beach erosion is accelerating near the port",
    "Nutrient runoff triggers algal blooms",
];

const REASONS: &[&str] = &[
    "The coast absorbs most of the damage while trade barely slows.",
    "Ports pause for repairs, wetlands buffer the worst of it.",
    "Fishers gain briefly, but habitat recovery lags behind.",
    "Effects are local and short-lived.",
];

/// Deterministic text oracle.
#[derive(Debug, Clone, Copy)]
pub struct ScriptedOracle {
    seed: u64,
    noisy: bool,
}

impl ScriptedOracle {
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self { seed, noisy: true }
    }

    /// Always answer in the canonical format.
    #[must_use]
    pub const fn without_noise(mut self) -> Self {
        self.noisy = false;
        self
    }

    fn rng_for(&self, request: &OracleRequest) -> ChaCha20Rng {
        let mut hasher = Sha256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(request.role.as_str().as_bytes());
        hasher.update(request.prompt.as_bytes());
        let digest = hasher.finalize();
        let mut seed = [0u8; 32];
        seed.copy_from_slice(digest.as_slice());
        ChaCha20Rng::from_seed(seed)
    }

    fn decision(&self, rng: &mut ChaCha20Rng) -> String {
        let mut picks = ACTIONS.choose_multiple(rng, 2).map(|(text, _, _)| *text);
        let first = picks.next().unwrap_or(ACTIONS[0].0);
        let second = picks.next().unwrap_or(ACTIONS[1].0);
        let plain = format!("ACTION_1: {first}\nACTION_2: {second}");
        if !self.noisy {
            return plain;
        }
        match rng.gen_range(0..4) {
            0 => format!("Here is my plan for this year:\n```\n{plain}\n```\nLet me know."),
            1 => format!("<think>\nGrowth first, but watch the reef.\n</think>\n{plain}"),
            2 => format!("**ACTION_1:** {first}\n**ACTION_2:** {second}"),
            _ => plain,
        }
    }

    fn arbitration(&self, prompt: &str, rng: &mut ChaCha20Rng) -> String {
        let first = score_action(quoted_action(prompt, "ACTION_1:"), rng);
        let second = score_action(quoted_action(prompt, "ACTION_2:"), rng);
        if self.noisy && rng.gen_bool(0.2) {
            return format!(
                "ACTION_1: assessment\nCountry Score Change: {:+}\nShoreline Score Change: {:+}\n\nACTION_2: assessment\nCountry Score Change: {:+}\nShoreline Score Change: {:+}",
                first.0, first.1, second.0, second.1
            );
        }
        format!(
            "first_country_rank: {}\nfirst_shoreline_rank: {}\nsecond_country_rank: {}\nsecond_shoreline_rank: {}",
            first.0, first.1, second.0, second.1
        )
    }

    fn environment(&self, rng: &mut ChaCha20Rng) -> String {
        let opportunity = OPPORTUNITIES.choose(rng).copied().unwrap_or_default();
        let challenge = CHALLENGES.choose(rng).copied().unwrap_or_default();
        if self.noisy && rng.gen_bool(0.25) {
            return format!("OPPORTUNITIES:\n- {opportunity}\n\nCHALLENGES:\n- {challenge}");
        }
        format!("CHANCES: {opportunity}\nCHALLENGES: {challenge}")
    }

    fn event_verdict(&self, rng: &mut ChaCha20Rng) -> String {
        let country = rng.gen_range(-2..=1);
        let shoreline = rng.gen_range(-2..=1);
        let reason = REASONS.choose(rng).copied().unwrap_or_default();
        let plain =
            format!("country_impact: {country}\nshoreline_impact: {shoreline}\nreasoning: {reason}");
        if self.noisy && rng.gen_bool(0.25) {
            return format!("```\n{plain}\n```");
        }
        plain
    }
}

/// Text following `label` on the first line that starts with it.
fn quoted_action<'p>(prompt: &'p str, label: &str) -> Option<&'p str> {
    prompt
        .lines()
        .find_map(|line| line.trim().strip_prefix(label))
        .map(str::trim)
}

fn score_action(action: Option<&str>, rng: &mut ChaCha20Rng) -> (i32, i32) {
    let base = action
        .and_then(|text| {
            ACTIONS
                .iter()
                .find(|(known, _, _)| known.eq_ignore_ascii_case(text))
        })
        .map_or((1, -1), |(_, country, shoreline)| (*country, *shoreline));
    let jitter: i32 = rng.gen_range(-1..=1);
    ((base.0 + jitter).clamp(-3, 3), base.1.clamp(-3, 3))
}

impl Oracle for ScriptedOracle {
    fn invoke(&self, request: &OracleRequest) -> Result<String, OracleError> {
        let mut rng = self.rng_for(request);
        Ok(match request.role {
            OracleRole::Decision => self.decision(&mut rng),
            OracleRole::Arbitration => self.arbitration(&request.prompt, &mut rng),
            OracleRole::Environment => self.environment(&mut rng),
            OracleRole::EventArbitration => self.event_verdict(&mut rng),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoreline_game::{
        Decision, parse_arbitration, parse_decision, parse_event_assessment, parse_feedback,
    };

    fn ask(oracle: &ScriptedOracle, role: OracleRole, prompt: &str) -> String {
        oracle
            .invoke(&OracleRequest::new(role, prompt))
            .expect("scripted oracle never fails")
    }

    #[test]
    fn replies_are_reproducible() {
        let oracle = ScriptedOracle::new(7);
        let a = ask(&oracle, OracleRole::Decision, "year 1");
        let b = ask(&oracle, OracleRole::Decision, "year 1");
        assert_eq!(a, b);
    }

    #[test]
    fn noisy_replies_still_normalize_cleanly() {
        let oracle = ScriptedOracle::new(99);
        for round in 0..40 {
            let prompt = format!("round {round}");
            let decision = parse_decision(&ask(&oracle, OracleRole::Decision, &prompt));
            assert!(decision.is_clean(), "{:?}", decision.issues);

            let feedback = parse_feedback(&ask(&oracle, OracleRole::Environment, &prompt));
            assert!(feedback.is_clean(), "{:?}", feedback.issues);

            let verdict =
                parse_event_assessment(&ask(&oracle, OracleRole::EventArbitration, &prompt));
            assert!(verdict.is_clean(), "{:?}", verdict.issues);
        }
    }

    #[test]
    fn arbitration_scores_follow_the_quoted_actions() {
        let oracle = ScriptedOracle::new(3).without_noise();
        let actions = Decision::new(ACTIONS[2].0, ACTIONS[5].0).as_prompt_text();
        let parsed = parse_arbitration(&ask(&oracle, OracleRole::Arbitration, &actions));
        assert!(parsed.is_clean());
        assert_eq!(parsed.value.first_shoreline, -3);
        assert_eq!(parsed.value.second_shoreline, 2);
        assert!((2..=4).contains(&parsed.value.first_country));
    }

    #[test]
    fn unknown_actions_get_a_mild_default() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let (country, shoreline) = score_action(Some("build a moon base"), &mut rng);
        assert!((0..=2).contains(&country));
        assert_eq!(shoreline, -1);
        assert_eq!(quoted_action("x\n  ACTION_2:  plant dunes ", "ACTION_2:"), Some("plant dunes"));
    }
}
