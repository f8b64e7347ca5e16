//! Ledger data model
//!
//! Every entity here is a row owned by the server's store. Timestamps are
//! epoch milliseconds, which is what the polling dashboard consumes; money is
//! an exact [`Decimal`] serialised as a JSON number.

use std::fmt;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Epoch milliseconds
pub type Millis = i64;

pub fn now_millis() -> Millis {
    Utc::now().timestamp_millis()
}

// =============================================================================
// Enums
// =============================================================================

/// Which side of an idea a funding record backs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Believe,
    Challenge,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Believe => write!(f, "believe"),
            Direction::Challenge => write!(f, "challenge"),
        }
    }
}

impl Direction {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "believe" => Some(Direction::Believe),
            "challenge" => Some(Direction::Challenge),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundPhase {
    Idle,
    Cauldron,
    Spells,
    Council,
    Forge,
    Portal,
    Completed,
    Settled,
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoundPhase::Idle => "idle",
            RoundPhase::Cauldron => "cauldron",
            RoundPhase::Spells => "spells",
            RoundPhase::Council => "council",
            RoundPhase::Forge => "forge",
            RoundPhase::Portal => "portal",
            RoundPhase::Completed => "completed",
            RoundPhase::Settled => "settled",
        };
        write!(f, "{}", s)
    }
}

impl RoundPhase {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "idle" => Some(RoundPhase::Idle),
            "cauldron" => Some(RoundPhase::Cauldron),
            "spells" => Some(RoundPhase::Spells),
            "council" => Some(RoundPhase::Council),
            "forge" => Some(RoundPhase::Forge),
            "portal" => Some(RoundPhase::Portal),
            "completed" => Some(RoundPhase::Completed),
            "settled" => Some(RoundPhase::Settled),
            _ => None,
        }
    }

    /// Completed and settled rounds no longer accept activity
    pub fn is_terminal(&self) -> bool {
        matches!(self, RoundPhase::Completed | RoundPhase::Settled)
    }
}

// =============================================================================
// World
// =============================================================================

/// The global world row. There is exactly one per store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldState {
    pub phase: RoundPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_round: Option<String>,
    pub treasury_dumble: Decimal,
    pub treasury_mon: Decimal,
    pub total_rounds: u32,
    pub total_apps_built: u32,
    pub total_spells_cast: u64,
    pub total_characters: u64,
    pub updated_at: Millis,
}

impl WorldState {
    pub fn new(now: Millis) -> Self {
        Self {
            phase: RoundPhase::Idle,
            current_round: None,
            treasury_dumble: Decimal::ZERO,
            treasury_mon: Decimal::ZERO,
            total_rounds: 0,
            total_apps_built: 0,
            total_spells_cast: 0,
            total_characters: 0,
            updated_at: now,
        }
    }
}

// =============================================================================
// Rounds and ideas
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub round_id: String,
    pub phase: RoundPhase,
    pub started_at: Millis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<Millis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winning_idea_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_symbol: Option<String>,
}

impl Round {
    pub fn open(round_id: impl Into<String>, now: Millis) -> Self {
        Self {
            round_id: round_id.into(),
            phase: RoundPhase::Cauldron,
            started_at: now,
            ended_at: None,
            winning_idea_id: None,
            app_name: None,
            app_url: None,
            token_address: None,
            token_symbol: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Idea {
    pub id: String,
    pub round_id: String,
    pub title: String,
    pub description: String,
    pub submitted_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    pub tx_status: String,
    pub stake_amount: Decimal,
    pub stake_currency: String,
    pub votes: Decimal,
    pub is_winner: bool,
    pub total_believed: Decimal,
    pub total_challenged: Decimal,
    pub created_at: Millis,
}

/// Append-only record of a single stake on an idea
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingRecord {
    pub id: String,
    pub round_id: String,
    pub idea_id: String,
    pub funder: String,
    pub amount: Decimal,
    pub direction: Direction,
    pub created_at: Millis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub address: String,
    pub display_name: String,
    pub is_agent: bool,
    pub rounds_participated: u32,
    pub total_staked: Decimal,
    pub total_won: Decimal,
    pub total_challenged: Decimal,
    pub is_contrarian: bool,
    pub joined_at: Millis,
}

impl Participant {
    pub fn new(address: impl Into<String>, display_name: impl Into<String>, is_agent: bool, now: Millis) -> Self {
        Self {
            address: address.into(),
            display_name: display_name.into(),
            is_agent,
            rounds_participated: 0,
            total_staked: Decimal::ZERO,
            total_won: Decimal::ZERO,
            total_challenged: Decimal::ZERO,
            is_contrarian: false,
            joined_at: now,
        }
    }
}

// =============================================================================
// Spells, characters and the council
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spell {
    pub id: String,
    pub round_id: String,
    pub word: String,
    pub caster: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caster_type: Option<String>,
    pub cost: Decimal,
    pub created_at: Millis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: String,
    pub name: String,
    pub spell_word: String,
    pub role: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub appearances: u32,
    pub wins: u32,
    pub losses: u32,
    pub rounds_served: Vec<String>,
    pub rarity: String,
    pub created_at: Millis,
    pub last_seen_at: Millis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouncilVote {
    pub id: String,
    pub round_id: String,
    pub character_id: String,
    pub idea_id: String,
    pub reasoning: String,
    pub weight: Decimal,
    pub created_at: Millis,
}

/// New identifier for an inserted row
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
