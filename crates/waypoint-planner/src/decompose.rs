//! Phase 1 — Decomposition. Model-driven, with one
//! retry on validation failure and a catch-all single-step fallback on a
//! second failure, the same shape the intent parser uses for its own
//! parse-then-strict-retry (`waypoint_intent::parser`), generalized to a
//! different JSON payload.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;
use waypoint_context::templates::{render_decompose, render_decompose_strict, DecomposeParams};
use waypoint_core::model::ModelAdapter;
use waypoint_core::types::UserLevel;

const MIN_STEPS: usize = 3;
const MAX_STEPS: usize = 12;

#[derive(Debug, Clone)]
pub struct DecomposedStep {
    pub title: String,
    pub estimated_hours: f64,
    pub order: i64,
}

#[derive(Debug, Deserialize)]
struct RawDecomposition {
    steps: Vec<RawStep>,
}

#[derive(Debug, Deserialize)]
struct RawStep {
    title: String,
    estimated_hours: f64,
    order: i64,
}

pub struct Decomposer {
    model: Arc<dyn ModelAdapter>,
    temperature: f32,
    timeout: Duration,
}

impl Decomposer {
    pub fn new(model: Arc<dyn ModelAdapter>, temperature: f32, timeout_ms: u64) -> Self {
        Self {
            model,
            temperature,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Never fails: on two consecutive validation failures it falls back to
    /// a single catch-all step rather than propagating an
    /// error, since a goal with no steps at all would be a worse outcome
    /// than one coarse step.
    pub async fn decompose(
        &self,
        title: &str,
        description: Option<&str>,
        target_date: Option<chrono::NaiveDate>,
        user_level: UserLevel,
        time_commitment: Option<u32>,
    ) -> Vec<DecomposedStep> {
        let level_label = match user_level {
            UserLevel::Beginner => "beginner",
            UserLevel::Intermediate => "intermediate",
            UserLevel::Advanced => "advanced",
        };
        let params = DecomposeParams {
            title,
            description,
            target_date,
            user_level: level_label,
            time_commitment_minutes_per_week: time_commitment,
        };
        let prompt = render_decompose(params);

        let first = self.model.complete(&prompt, self.temperature, self.timeout).await;
        if let Ok(raw) = first {
            if let Some(steps) = parse_and_validate(&raw) {
                return steps;
            }
        }

        warn!("goal decomposer: first attempt invalid, retrying strict");
        let strict_params = DecomposeParams {
            title,
            description,
            target_date,
            user_level: level_label,
            time_commitment_minutes_per_week: time_commitment,
        };
        let strict_prompt = render_decompose_strict(strict_params);
        let second = self
            .model
            .complete(&strict_prompt, self.temperature, self.timeout)
            .await;
        if let Ok(raw) = second {
            if let Some(steps) = parse_and_validate(&raw) {
                return steps;
            }
        }

        warn!("goal decomposer: falling back to a single catch-all step");
        vec![DecomposedStep {
            title: title.to_string(),
            estimated_hours: 4.0,
            order: 1,
        }]
    }
}

fn parse_and_validate(raw: &str) -> Option<Vec<DecomposedStep>> {
    let parsed: RawDecomposition = serde_json::from_str(raw.trim()).ok()?;
    let n = parsed.steps.len();
    if !(MIN_STEPS..=MAX_STEPS).contains(&n) {
        return None;
    }
    let mut seen_orders = HashSet::with_capacity(n);
    for step in &parsed.steps {
        if step.title.trim().is_empty() || step.estimated_hours <= 0.0 {
            return None;
        }
        if !seen_orders.insert(step.order) {
            return None;
        }
    }
    let expected: HashSet<i64> = (1..=n as i64).collect();
    if seen_orders != expected {
        return None;
    }
    let mut steps: Vec<DecomposedStep> = parsed
        .steps
        .into_iter()
        .map(|s| DecomposedStep {
            title: s.title,
            estimated_hours: s.estimated_hours,
            order: s.order,
        })
        .collect();
    steps.sort_by_key(|s| s.order);
    Some(steps)
}
