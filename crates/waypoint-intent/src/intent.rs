//! The closed intent type. `Intent` is the one seam
//! between the dynamic JSON the model returns and the rest of this
//! workspace's typed Rust — nothing downstream of the parser ever touches
//! `serde_json::Value` for an intent again.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use waypoint_core::types::{GoalStatus, Priority, SetId, StepStatus, UserLevel};

/// Either a direct entity id or an ordinal reference into a previously
/// returned Result Set — the model never invents an entity id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdOrOrdinal {
    Id(i64),
    Ordinal { set_id: SetId, ordinal: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutateOp {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SmallTalkParams {
    pub reply_hint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EventSearchParams {
    #[serde(default)]
    pub title_like: Option<String>,
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
    #[serde(default)]
    pub time_from: Option<NaiveTime>,
    #[serde(default)]
    pub time_to: Option<NaiveTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMutateParams {
    pub op: MutateOp,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
    #[serde(default)]
    pub target: Option<IdOrOrdinal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GoalSearchParams {
    #[serde(default)]
    pub status: Option<GoalStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalCreateParams {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub user_level: Option<UserLevel>,
    #[serde(default)]
    pub time_commitment: Option<u32>,
    /// Not part of the model's JSON output — set by the dispatcher when
    /// constructing a "do you want to do X?" confirmation preview.
    #[serde(default, skip_serializing)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalDeleteParams {
    pub target: IdOrOrdinal,
    #[serde(default, skip_serializing)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalQueryParams {
    pub target: IdOrOrdinal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalUpdateStepParams {
    pub target: IdOrOrdinal,
    pub new_status: StepStatus,
    #[serde(default, skip_serializing)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalAddStepParams {
    pub goal_id: i64,
    pub title: String,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub planned_date: Option<NaiveDate>,
    #[serde(default)]
    pub planned_time: Option<NaiveTime>,
    #[serde(default, skip_serializing)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalDeleteStepParams {
    pub target: IdOrOrdinal,
    #[serde(default, skip_serializing)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSearchParams {
    pub query: String,
    #[serde(default)]
    pub price_max: Option<f64>,
}

/// The closed set of intent variants the parser can produce. Tagged
/// externally by the variant's own JSON key (via serde's default enum
/// representation) — exactly one key present in the model's JSON output
/// maps to exactly one variant here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Intent {
    #[serde(rename = "small_talk")]
    SmallTalk(SmallTalkParams),
    #[serde(rename = "event.search")]
    EventSearch(EventSearchParams),
    #[serde(rename = "event.mutate")]
    EventMutate(EventMutateParams),
    #[serde(rename = "goal.search")]
    GoalSearch(GoalSearchParams),
    #[serde(rename = "goal.create")]
    GoalCreate(GoalCreateParams),
    #[serde(rename = "goal.delete")]
    GoalDelete(GoalDeleteParams),
    #[serde(rename = "goal.query")]
    GoalQuery(GoalQueryParams),
    #[serde(rename = "goal.update_step")]
    GoalUpdateStep(GoalUpdateStepParams),
    #[serde(rename = "goal.add_step")]
    GoalAddStep(GoalAddStepParams),
    #[serde(rename = "goal.delete_step")]
    GoalDeleteStep(GoalDeleteStepParams),
    #[serde(rename = "product.search")]
    ProductSearch(ProductSearchParams),
}

impl Intent {
    /// The variant's JSON key, used for logging and for the dedup/metrics
    /// label — never re-derived from a `match` elsewhere.
    pub fn kind(&self) -> &'static str {
        match self {
            Intent::SmallTalk(_) => "small_talk",
            Intent::EventSearch(_) => "event.search",
            Intent::EventMutate(_) => "event.mutate",
            Intent::GoalSearch(_) => "goal.search",
            Intent::GoalCreate(_) => "goal.create",
            Intent::GoalDelete(_) => "goal.delete",
            Intent::GoalQuery(_) => "goal.query",
            Intent::GoalUpdateStep(_) => "goal.update_step",
            Intent::GoalAddStep(_) => "goal.add_step",
            Intent::GoalDeleteStep(_) => "goal.delete_step",
            Intent::ProductSearch(_) => "product.search",
        }
    }
}
