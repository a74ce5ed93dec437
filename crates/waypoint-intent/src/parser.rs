//! The Intent Parser & Validator. A pure
//! function of `(utterance, bundle) -> Intent | IntentError` modeled as an
//! async trait method, since the model adapter call is the only suspension
//! point — a single parse-then-one-strict-retry shape, simplified down from
//! a general multi-iteration tool loop to this parser's exactly-one-retry
//! contract.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;
use waypoint_context::templates::{render_intent_parse, render_intent_parse_strict, IntentParseParams};
use waypoint_context::PromptBundle;
use waypoint_core::model::ModelAdapter;

use crate::error::{IntentError, Result};
use crate::intent::{Intent, MutateOp};

pub struct IntentParser {
    model: Arc<dyn ModelAdapter>,
    temperature: f32,
    timeout: Duration,
}

impl IntentParser {
    pub fn new(model: Arc<dyn ModelAdapter>, temperature: f32, timeout_ms: u64) -> Self {
        Self {
            model,
            temperature,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    pub async fn parse(&self, bundle: &PromptBundle, utterance: &str) -> Result<Intent> {
        let params = IntentParseParams { bundle, utterance };
        let prompt = render_intent_parse(params);

        let raw = self.model.complete(&prompt, self.temperature, self.timeout).await?;

        let intent = match parse_json(&raw) {
            Ok(intent) => intent,
            Err(first_err) => {
                warn!(error = %first_err, "intent parser: first JSON parse failed, retrying strict");
                let strict_params = IntentParseParams { bundle, utterance };
                let strict_prompt = render_intent_parse_strict(strict_params);
                let raw_retry = self
                    .model
                    .complete(&strict_prompt, self.temperature, self.timeout)
                    .await?;
                parse_json(&raw_retry).map_err(|e| IntentError::IntentParseError(e.to_string()))?
            }
        };

        validate(&intent)?;
        Ok(intent)
    }
}

fn parse_json(raw: &str) -> std::result::Result<Intent, serde_json::Error> {
    serde_json::from_str(raw.trim())
}

/// Step 4-5 of the algorithm: structural validation already happened via
/// `serde` (exactly one variant key, required fields present and typed).
/// What's left is the semantic checks `serde` can't express.
fn validate(intent: &Intent) -> Result<()> {
    match intent {
        Intent::EventSearch(p) => {
            if let (Some(from), Some(to)) = (p.date_from, p.date_to) {
                if from > to {
                    return Err(IntentError::IntentInvalid("date_from > date_to".into()));
                }
            }
            if let (Some(from), Some(to)) = (p.time_from, p.time_to) {
                if from > to {
                    return Err(IntentError::IntentInvalid("time_from > time_to".into()));
                }
            }
        }
        Intent::EventMutate(p) => {
            if matches!(p.op, MutateOp::Update | MutateOp::Delete) && p.target.is_none() {
                return Err(IntentError::IntentInvalid(
                    "event.mutate update/delete requires a target".into(),
                ));
            }
            validate_ordinal(p.target.as_ref())?;
        }
        Intent::GoalCreate(p) => {
            if p.title.trim().is_empty() {
                return Err(IntentError::IntentInvalid("goal.create title is empty".into()));
            }
        }
        Intent::GoalDelete(p) => validate_ordinal(Some(&p.target))?,
        Intent::GoalQuery(p) => validate_ordinal(Some(&p.target))?,
        Intent::GoalUpdateStep(p) => validate_ordinal(Some(&p.target))?,
        Intent::GoalDeleteStep(p) => validate_ordinal(Some(&p.target))?,
        Intent::GoalAddStep(p) => {
            if p.title.trim().is_empty() {
                return Err(IntentError::IntentInvalid("goal.add_step title is empty".into()));
            }
        }
        Intent::ProductSearch(p) => {
            if p.query.trim().is_empty() {
                return Err(IntentError::IntentInvalid("product.search query is empty".into()));
            }
        }
        Intent::SmallTalk(_) | Intent::GoalSearch(_) => {}
    }
    Ok(())
}

/// Ordinals are 1-based; `0` is never valid addressing, but
/// whether it's within `|ordered_ids|` can only be checked once the Result
/// Set cache is consulted — that bound check happens at dispatch time, not
/// here, since the parser has no store/cache access.
fn validate_ordinal(target: Option<&crate::intent::IdOrOrdinal>) -> Result<()> {
    if let Some(crate::intent::IdOrOrdinal::Ordinal { ordinal, .. }) = target {
        if *ordinal == 0 {
            return Err(IntentError::IntentInvalid("ordinal must be 1-based".into()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_small_talk() {
        let raw = r#"{"small_talk":{"reply_hint":"greeting"}}"#;
        let intent = parse_json(raw).unwrap();
        assert_eq!(intent.kind(), "small_talk");
    }

    #[test]
    fn parses_event_search_with_optional_fields() {
        let raw = r#"{"event.search":{"date_from":"2026-07-27","date_to":"2026-08-01"}}"#;
        let intent = parse_json(raw).unwrap();
        assert_eq!(intent.kind(), "event.search");
        validate(&intent).unwrap();
    }

    #[test]
    fn rejects_inverted_date_range() {
        let raw = r#"{"event.search":{"date_from":"2026-08-01","date_to":"2026-07-27"}}"#;
        let intent = parse_json(raw).unwrap();
        assert!(validate(&intent).is_err());
    }

    #[test]
    fn rejects_zero_ordinal() {
        let raw = r#"{"goal.query":{"target":{"set_id":"11111111-1111-4111-8111-111111111111","ordinal":0}}}"#;
        let intent = parse_json(raw).unwrap();
        assert!(validate(&intent).is_err());
    }

    #[test]
    fn accepts_direct_id_target() {
        let raw = r#"{"goal.query":{"target":42}}"#;
        let intent = parse_json(raw).unwrap();
        validate(&intent).unwrap();
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_json("not json at all").is_err());
    }
}
