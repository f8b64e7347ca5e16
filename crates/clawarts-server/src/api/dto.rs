use serde::{Deserialize, Serialize};

use clawarts_core::board::{TickProject, TickTask};
use clawarts_core::{Character, Round, RoundPhase, WorldState};

use crate::ledger::{LeaderboardEntry, SettlementOutcome};

/// A row, or `{error}` when it does not exist yet. Polled dashboard reads
/// answer 200 either way.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OrMissing<T> {
    Found(T),
    Missing { error: String },
}

impl<T> OrMissing<T> {
    pub fn from_option(value: Option<T>, error: &str) -> Self {
        match value {
            Some(found) => OrMissing::Found(found),
            None => OrMissing::Missing {
                error: error.to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

// ============================================================================
// GET /health
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub store: crate::store::StoreStats,
    pub archive: String,
    pub cached_entries: u64,
}

// ============================================================================
// Ledger queries
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeasQuery {
    pub round_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct CharactersResponse {
    pub characters: Vec<Character>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub rounds: Vec<Round>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub participants: Vec<LeaderboardEntry>,
}

// ============================================================================
// Ledger mutations
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitResponse {
    pub ok: bool,
    pub world: WorldState,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundIdRequest {
    pub round_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundIdResponse {
    pub ok: bool,
    pub round_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPhaseRequest {
    pub phase: String,
    #[serde(default)]
    pub round_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PhaseResponse {
    pub ok: bool,
    pub phase: RoundPhase,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaResponse {
    pub ok: bool,
    pub idea_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmIdeaRequest {
    pub idea_id: String,
    pub tx_hash: String,
    #[serde(default = "default_tx_status")]
    pub tx_status: String,
}

fn default_tx_status() -> String {
    "confirmed".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaIdRequest {
    pub idea_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellResponse {
    pub ok: bool,
    pub spell_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummonRequest {
    pub spell_word: String,
    pub round_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummonResponse {
    pub ok: bool,
    pub character_id: String,
    pub character: Character,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub ok: bool,
    pub vote_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclareWinnerRequest {
    pub round_id: String,
    pub idea_id: String,
}

#[derive(Debug, Serialize)]
pub struct SettleResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub outcome: SettlementOutcome,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub address: String,
    pub display_name: String,
    #[serde(default)]
    pub is_agent: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub ok: bool,
    pub participant_id: String,
}

// ============================================================================
// Board
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub ok: bool,
    pub project: String,
    pub tasks_synced: usize,
    pub tasks_removed: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TasksQuery {
    pub slug: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectTasksResponse {
    pub project: TickProject,
    pub tasks: Vec<TickTask>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    pub slug: Option<String>,
    pub tick_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteProjectResponse {
    pub ok: bool,
    pub tasks_removed: usize,
}
