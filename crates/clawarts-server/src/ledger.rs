//! Game-state ledger: rounds, ideas, spells, characters, votes, funding and
//! settlement.
//!
//! Every public method is one store transaction. Settlement reads the
//! winning idea and the round's funding, asks the core engine for a plan,
//! then applies payouts, the treasury fee and the phase change together.

use std::sync::Arc;

use clawarts_core::character::{derive_traits, normalize_spell};
use clawarts_core::round::{next_action, round_id, RoundAction};
use clawarts_core::settlement::{credit, plan_settlement, Payout, PoolBreakdown, SettlementRates};
use clawarts_core::{
    new_id, now_millis, Character, CoreError, CoreResult, CouncilVote, Direction, FundingRecord,
    Idea, Participant, Round, RoundPhase, Spell, WorldState,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{MissingParticipantPolicy, SettlementConfig};
use crate::error::AppResult;
use crate::store::{Store, Tables};

const LEADERBOARD_SIZE: usize = 50;
const ACTIVE_ROUND_SCAN: usize = 10;
const DEFAULT_STAKE_CURRENCY: &str = "DUMBLE";

#[derive(Debug, Clone)]
pub struct LedgerSettings {
    pub rates: SettlementRates,
    pub guard_double_settlement: bool,
    pub missing_participant: MissingParticipantPolicy,
    pub round_duration_ms: i64,
}

impl LedgerSettings {
    pub fn from_config(settlement: &SettlementConfig, round_duration_ms: i64) -> CoreResult<Self> {
        Ok(Self {
            rates: settlement.rates()?,
            guard_double_settlement: settlement.guard_double_settlement,
            missing_participant: settlement.missing_participant,
            round_duration_ms,
        })
    }
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            rates: SettlementRates::default(),
            guard_double_settlement: true,
            missing_participant: MissingParticipantPolicy::Skip,
            round_duration_ms: clawarts_core::round::DEFAULT_ROUND_DURATION_MS,
        }
    }
}

// =============================================================================
// Inputs
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIdea {
    pub round_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub submitted_by: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub wallet: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub tx_status: Option<String>,
    #[serde(default)]
    pub stake_amount: Option<Decimal>,
    #[serde(default)]
    pub stake_currency: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSpell {
    pub round_id: String,
    pub word: String,
    pub caster: String,
    #[serde(default)]
    pub cost: Option<Decimal>,
    #[serde(default)]
    pub caster_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVote {
    pub round_id: String,
    pub character_id: String,
    pub idea_id: String,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub weight: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterPatch {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundCompletion {
    pub round_id: String,
    #[serde(default)]
    pub app_url: Option<String>,
    #[serde(default)]
    pub token_address: Option<String>,
    #[serde(default)]
    pub token_symbol: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingRequest {
    pub round_id: String,
    pub idea_id: String,
    pub funder: String,
    pub amount: Decimal,
    pub direction: String,
}

// =============================================================================
// Outputs
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundBundle {
    pub round: Round,
    pub ideas: Vec<Idea>,
    pub spells: Vec<Spell>,
    pub votes: Vec<CouncilVote>,
    pub phase: RoundPhase,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveRound {
    #[serde(flatten)]
    pub round: Round,
    pub ideas: Vec<Idea>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub address: String,
    pub display_name: String,
    pub total_won: Decimal,
    pub total_staked: Decimal,
    pub total_challenged: Decimal,
    pub is_contrarian: bool,
    pub rounds_participated: u32,
}

impl From<&Participant> for LeaderboardEntry {
    fn from(p: &Participant) -> Self {
        Self {
            address: p.address.clone(),
            display_name: p.display_name.clone(),
            total_won: p.total_won,
            total_staked: p.total_staked,
            total_challenged: p.total_challenged,
            is_contrarian: p.is_contrarian,
            rounds_participated: p.rounds_participated,
        }
    }
}

/// Result of a committed settlement
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementOutcome {
    pub round_id: String,
    pub winning_idea_id: String,
    pub winning_idea: String,
    #[serde(flatten)]
    pub breakdown: PoolBreakdown,
    pub payouts: Vec<Payout>,
    /// Payouts whose funder had no participant record under the skip policy
    pub dropped_payouts: Vec<Payout>,
    pub settled_at: i64,
}

// =============================================================================
// Ledger
// =============================================================================

#[derive(Clone)]
pub struct Ledger {
    store: Store,
    settings: Arc<LedgerSettings>,
}

fn require_fields(fields: &[(&str, &str)]) -> CoreResult<()> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(CoreError::Invalid(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}

/// Find the participant for `address`, applying the missing-participant policy
fn participant_for<'a>(
    tables: &'a mut Tables,
    address: &str,
    policy: MissingParticipantPolicy,
    now: i64,
) -> CoreResult<Option<&'a mut Participant>> {
    if !tables.participants.contains_key(address) {
        match policy {
            MissingParticipantPolicy::Skip => return Ok(None),
            MissingParticipantPolicy::Fail => {
                return Err(CoreError::MissingParticipant(address.to_string()))
            }
            MissingParticipantPolicy::Provision => {
                tracing::info!(address = %address, "Provisioning participant");
                tables
                    .participants
                    .insert(address.to_string(), Participant::new(address, address, false, now));
            }
        }
    }
    Ok(tables.participants.get_mut(address))
}

impl Ledger {
    pub fn new(store: Store, settings: LedgerSettings) -> Self {
        Self {
            store,
            settings: Arc::new(settings),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub async fn world(&self) -> Option<WorldState> {
        self.store.read(|t| t.world.clone()).await
    }

    pub async fn current_round(&self) -> Option<RoundBundle> {
        self.store
            .read(|t| {
                let world = t.world.as_ref()?;
                let round = t.round(world.current_round.as_deref()?)?;
                Some(RoundBundle {
                    ideas: t.ideas_in_round(&round.round_id),
                    spells: t.spells_in_round(&round.round_id),
                    votes: t.votes_in_round(&round.round_id),
                    round: round.clone(),
                    phase: world.phase,
                })
            })
            .await
    }

    /// Newest non-terminal round among the latest few
    pub async fn active_round(&self) -> Option<ActiveRound> {
        self.store
            .read(|t| {
                let round = t
                    .rounds
                    .iter()
                    .rev()
                    .take(ACTIVE_ROUND_SCAN)
                    .find(|r| !r.phase.is_terminal())?;
                Some(ActiveRound {
                    ideas: t.ideas_in_round(&round.round_id),
                    round: round.clone(),
                })
            })
            .await
    }

    pub async fn round_state(&self, now: i64) -> RoundAction {
        let duration = self.settings.round_duration_ms;
        self.store
            .read(|t| {
                let world = t.world.as_ref();
                let round = world
                    .and_then(|w| w.current_round.as_deref())
                    .and_then(|id| t.round(id));
                let (ideas, spells) = match round {
                    Some(r) => (t.ideas_in_round(&r.round_id), t.spells_in_round(&r.round_id)),
                    None => (Vec::new(), Vec::new()),
                };
                next_action(world, round, &ideas, &spells, now, duration)
            })
            .await
    }

    pub async fn ideas_by_round(&self, round_id: &str) -> Vec<Idea> {
        self.store.read(|t| t.ideas_in_round(round_id)).await
    }

    pub async fn characters(&self, limit: Option<usize>) -> Vec<Character> {
        self.store
            .read(|t| {
                let newest_first = t.characters.iter().rev().cloned();
                match limit {
                    Some(n) => newest_first.take(n).collect(),
                    None => newest_first.collect(),
                }
            })
            .await
    }

    pub async fn character_by_spell(&self, spell_word: &str) -> Option<Character> {
        let normalized = normalize_spell(spell_word);
        self.store.read(|t| t.character_by_spell(&normalized).cloned()).await
    }

    pub async fn history(&self, limit: usize) -> Vec<Round> {
        self.store
            .read(|t| t.rounds.iter().rev().take(limit).cloned().collect())
            .await
    }

    pub async fn participant(&self, address: &str) -> Option<Participant> {
        self.store.read(|t| t.participants.get(address).cloned()).await
    }

    pub async fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.store
            .read(|t| {
                let mut participants: Vec<&Participant> = t.participants.values().collect();
                participants.sort_by(|a, b| b.total_won.cmp(&a.total_won));
                participants
                    .into_iter()
                    .take(LEADERBOARD_SIZE)
                    .map(LeaderboardEntry::from)
                    .collect()
            })
            .await
    }

    // -------------------------------------------------------------------------
    // World and rounds
    // -------------------------------------------------------------------------

    /// Create the world singleton; returns the existing one when already present
    pub async fn init_world(&self) -> AppResult<WorldState> {
        self.store
            .write(|t| {
                if t.world.is_none() {
                    tracing::info!("Initializing world");
                    t.world = Some(WorldState::new(now_millis()));
                }
                t.world().cloned()
            })
            .await
    }

    /// Open the next numbered round
    pub async fn start_round(&self) -> AppResult<String> {
        self.store
            .write(|t| {
                let number = t.world()?.total_rounds + 1;
                let id = round_id(number);
                Self::insert_round(t, &id)?;
                Ok(id)
            })
            .await
    }

    /// Open a round under an id chosen by the orchestrator
    pub async fn open_round(&self, round_id: &str) -> AppResult<String> {
        require_fields(&[("roundId", round_id)])?;
        self.store
            .write(|t| {
                t.world()?;
                Self::insert_round(t, round_id)?;
                Ok(round_id.to_string())
            })
            .await
    }

    fn insert_round(t: &mut Tables, round_id: &str) -> CoreResult<()> {
        if t.round(round_id).is_some() {
            return Err(CoreError::Invalid(format!("Round already exists: {}", round_id)));
        }

        let now = now_millis();
        t.rounds.push(Round::open(round_id, now));

        let world = t.world_mut()?;
        world.phase = RoundPhase::Cauldron;
        world.current_round = Some(round_id.to_string());
        world.total_rounds += 1;
        world.updated_at = now;

        tracing::info!(round_id = %round_id, "Round opened");
        Ok(())
    }

    /// Set the world phase, and the round's phase when a round is named
    pub async fn set_phase(&self, phase: &str, round_id: Option<&str>) -> AppResult<RoundPhase> {
        let phase = RoundPhase::from_str(phase)
            .ok_or_else(|| CoreError::Invalid(format!("Unknown phase: {}", phase)))?;

        self.store
            .write(|t| {
                if let Some(round_id) = round_id {
                    t.round_mut(round_id)?.phase = phase;
                }
                let world = t.world_mut()?;
                world.phase = phase;
                world.updated_at = now_millis();
                Ok(phase)
            })
            .await
    }

    pub async fn declare_winner(&self, round_id: &str, idea_id: &str) -> AppResult<()> {
        self.store
            .write(|t| {
                let title = {
                    let idea = t.idea_mut(idea_id)?;
                    if idea.round_id != round_id {
                        return Err(CoreError::Invalid(format!(
                            "Idea {} does not belong to round {}",
                            idea_id, round_id
                        )));
                    }
                    idea.is_winner = true;
                    idea.title.clone()
                };

                // At most one winner per round
                for other in t.ideas.iter_mut() {
                    if other.round_id == round_id && other.id != idea_id {
                        other.is_winner = false;
                    }
                }

                let round = t.round_mut(round_id)?;
                round.phase = RoundPhase::Forge;
                round.winning_idea_id = Some(idea_id.to_string());
                round.app_name = Some(title.clone());

                let world = t.world_mut()?;
                world.phase = RoundPhase::Forge;
                world.updated_at = now_millis();

                tracing::info!(round_id = %round_id, idea_id = %idea_id, title = %title, "Winner declared");
                Ok(())
            })
            .await
    }

    pub async fn complete_round(&self, completion: RoundCompletion) -> AppResult<()> {
        self.store
            .write(|t| {
                let now = now_millis();
                let round = t.round_mut(&completion.round_id)?;
                round.phase = RoundPhase::Completed;
                round.ended_at = Some(now);
                round.app_url = completion.app_url;
                round.token_address = completion.token_address;
                round.token_symbol = completion.token_symbol;

                let world = t.world_mut()?;
                world.phase = RoundPhase::Idle;
                world.total_apps_built += 1;
                world.updated_at = now;
                Ok(())
            })
            .await
    }

    // -------------------------------------------------------------------------
    // Ideas
    // -------------------------------------------------------------------------

    pub async fn submit_idea(&self, new: NewIdea) -> AppResult<String> {
        require_fields(&[
            ("roundId", new.round_id.as_str()),
            ("title", new.title.as_str()),
            ("submittedBy", new.submitted_by.as_str()),
        ])?;

        self.store
            .write(|t| {
                if t.round(&new.round_id).is_none() {
                    return Err(CoreError::not_found("Round", new.round_id));
                }

                let idea = Idea {
                    id: new_id(),
                    round_id: new.round_id,
                    title: new.title,
                    description: new.description.unwrap_or_default(),
                    submitted_by: new.submitted_by,
                    author: new.author,
                    url: new.url,
                    wallet: new.wallet,
                    source: new.source,
                    tx_hash: new.tx_hash,
                    tx_status: new.tx_status.unwrap_or_else(|| "pending".to_string()),
                    stake_amount: new.stake_amount.unwrap_or_default(),
                    stake_currency: new
                        .stake_currency
                        .unwrap_or_else(|| DEFAULT_STAKE_CURRENCY.to_string()),
                    votes: Decimal::ZERO,
                    is_winner: false,
                    total_believed: Decimal::ZERO,
                    total_challenged: Decimal::ZERO,
                    created_at: now_millis(),
                };
                let id = idea.id.clone();
                tracing::info!(idea_id = %id, round_id = %idea.round_id, title = %idea.title, "Idea submitted");
                t.ideas.push(idea);
                Ok(id)
            })
            .await
    }

    pub async fn confirm_idea(&self, idea_id: &str, tx_hash: &str, tx_status: &str) -> AppResult<()> {
        self.store
            .write(|t| {
                let idea = t.idea_mut(idea_id)?;
                idea.tx_hash = Some(tx_hash.to_string());
                idea.tx_status = tx_status.to_string();
                Ok(())
            })
            .await
    }

    pub async fn delete_idea(&self, idea_id: &str) -> AppResult<()> {
        self.store
            .write(|t| {
                let before = t.ideas.len();
                t.ideas.retain(|i| i.id != idea_id);
                if t.ideas.len() == before {
                    return Err(CoreError::not_found("Idea", idea_id));
                }
                Ok(())
            })
            .await
    }

    // -------------------------------------------------------------------------
    // Spells, characters, votes
    // -------------------------------------------------------------------------

    pub async fn cast_spell(&self, new: NewSpell) -> AppResult<String> {
        require_fields(&[
            ("roundId", new.round_id.as_str()),
            ("word", new.word.as_str()),
            ("caster", new.caster.as_str()),
        ])?;
        let cost = new.cost.unwrap_or(Decimal::ONE);
        if cost.is_sign_negative() {
            return Err(CoreError::Invalid("cost must not be negative".to_string()).into());
        }

        self.store
            .write(|t| {
                let now = now_millis();
                let spell = Spell {
                    id: new_id(),
                    round_id: new.round_id,
                    word: normalize_spell(&new.word),
                    caster: new.caster,
                    caster_type: new.caster_type,
                    cost,
                    created_at: now,
                };

                let world = t.world_mut()?;
                world.total_spells_cast += 1;
                credit(&mut world.treasury_dumble, cost, "treasury")?;
                world.updated_at = now;

                let id = spell.id.clone();
                t.spells.push(spell);
                Ok(id)
            })
            .await
    }

    /// Summon the character bound to a spell word, creating it on first use
    pub async fn summon_character(&self, spell_word: &str, round_id: &str) -> AppResult<Character> {
        require_fields(&[("spellWord", spell_word), ("roundId", round_id)])?;
        let normalized = normalize_spell(spell_word);

        self.store
            .write(|t| {
                let now = now_millis();
                if let Some(existing) = t.characters.iter_mut().find(|c| c.spell_word == normalized) {
                    existing.appearances += 1;
                    existing.last_seen_at = now;
                    existing.rounds_served.push(round_id.to_string());
                    return Ok(existing.clone());
                }

                let traits = derive_traits(&normalized);
                let world = t.world_mut()?;
                world.total_characters += 1;
                world.updated_at = now;

                let character = Character {
                    id: new_id(),
                    // Named and described later by the orchestrator
                    name: String::new(),
                    spell_word: normalized,
                    role: traits.role.to_string(),
                    description: String::new(),
                    image_url: None,
                    appearances: 1,
                    wins: 0,
                    losses: 0,
                    rounds_served: vec![round_id.to_string()],
                    rarity: traits.rarity.to_string(),
                    created_at: now,
                    last_seen_at: now,
                };
                tracing::info!(
                    character_id = %character.id,
                    role = %character.role,
                    rarity = %character.rarity,
                    "New character summoned"
                );
                t.characters.push(character.clone());
                Ok(character)
            })
            .await
    }

    pub async fn update_character(&self, patch: CharacterPatch) -> AppResult<Character> {
        self.store
            .write(|t| {
                let character = t.character_mut(&patch.id)?;
                if let Some(name) = patch.name {
                    character.name = name;
                }
                if let Some(description) = patch.description {
                    character.description = description;
                }
                if let Some(image_url) = patch.image_url {
                    character.image_url = Some(image_url);
                }
                Ok(character.clone())
            })
            .await
    }

    pub async fn submit_vote(&self, new: NewVote) -> AppResult<String> {
        require_fields(&[
            ("roundId", new.round_id.as_str()),
            ("characterId", new.character_id.as_str()),
            ("ideaId", new.idea_id.as_str()),
        ])?;
        let weight = new.weight.unwrap_or(Decimal::ONE);

        self.store
            .write(|t| {
                let vote = CouncilVote {
                    id: new_id(),
                    round_id: new.round_id,
                    character_id: new.character_id,
                    idea_id: new.idea_id,
                    reasoning: new.reasoning.unwrap_or_default(),
                    weight,
                    created_at: now_millis(),
                };

                if let Ok(idea) = t.idea_mut(&vote.idea_id) {
                    credit(&mut idea.votes, weight, "idea votes")?;
                }

                let id = vote.id.clone();
                t.votes.push(vote);
                Ok(id)
            })
            .await
    }

    // -------------------------------------------------------------------------
    // Participants, funding, settlement
    // -------------------------------------------------------------------------

    /// Register a participant; joining twice returns the existing record
    pub async fn join_world(&self, address: &str, display_name: &str, is_agent: bool) -> AppResult<Participant> {
        require_fields(&[("address", address), ("displayName", display_name)])?;
        self.store
            .write(|t| {
                let participant = t
                    .participants
                    .entry(address.to_string())
                    .or_insert_with(|| {
                        tracing::info!(address = %address, is_agent = %is_agent, "Participant joined");
                        Participant::new(address, display_name, is_agent, now_millis())
                    });
                Ok(participant.clone())
            })
            .await
    }

    /// Stake on an idea. Challenge stakes go to the treasury immediately.
    pub async fn fund(&self, request: FundingRequest) -> AppResult<FundingRecord> {
        require_fields(&[
            ("roundId", request.round_id.as_str()),
            ("ideaId", request.idea_id.as_str()),
            ("funder", request.funder.as_str()),
            ("direction", request.direction.as_str()),
        ])?;
        let direction = Direction::from_str(&request.direction).ok_or_else(|| {
            CoreError::Invalid(format!(
                "direction must be 'believe' or 'challenge', got '{}'",
                request.direction
            ))
        })?;
        if request.amount <= Decimal::ZERO {
            return Err(CoreError::Invalid("amount must be positive".to_string()).into());
        }
        let policy = self.settings.missing_participant;

        self.store
            .write(|t| {
                let now = now_millis();
                t.world()?;

                let round = t
                    .round(&request.round_id)
                    .ok_or_else(|| CoreError::not_found("Round", request.round_id.as_str()))?;
                if round.phase == RoundPhase::Settled {
                    return Err(CoreError::AlreadySettled(request.round_id));
                }

                let idea = t.idea_mut(&request.idea_id)?;
                if idea.round_id != request.round_id {
                    return Err(CoreError::Invalid(format!(
                        "Idea {} does not belong to round {}",
                        request.idea_id, request.round_id
                    )));
                }
                match direction {
                    Direction::Believe => credit(&mut idea.total_believed, request.amount, "idea total believed")?,
                    Direction::Challenge => {
                        credit(&mut idea.total_challenged, request.amount, "idea total challenged")?
                    }
                }

                if let Some(participant) = participant_for(t, &request.funder, policy, now)? {
                    credit(&mut participant.total_staked, request.amount, "participant total staked")?;
                    if direction == Direction::Challenge {
                        participant.is_contrarian = true;
                        credit(&mut participant.total_challenged, request.amount, "participant total challenged")?;
                    }
                }

                if direction == Direction::Challenge {
                    let world = t.world_mut()?;
                    credit(&mut world.treasury_dumble, request.amount, "treasury")?;
                    world.updated_at = now;
                }

                let record = FundingRecord {
                    id: new_id(),
                    round_id: request.round_id,
                    idea_id: request.idea_id,
                    funder: request.funder,
                    amount: request.amount,
                    direction,
                    created_at: now,
                };
                t.funding.push(record.clone());
                Ok(record)
            })
            .await
    }

    /// Settle a round: pay winning believers and challengers out of the
    /// losing-believer pool, collect the treasury fee and close the round.
    pub async fn settle(&self, round_id: &str) -> AppResult<SettlementOutcome> {
        require_fields(&[("roundId", round_id)])?;
        let settings = Arc::clone(&self.settings);

        self.store
            .write(|t| {
                let now = now_millis();

                // Read
                let winner = t
                    .winning_idea(round_id)
                    .cloned()
                    .ok_or_else(|| CoreError::WinnerNotFound(round_id.to_string()))?;
                let phase = t
                    .round(round_id)
                    .map(|r| r.phase)
                    .ok_or_else(|| CoreError::not_found("Round", round_id))?;
                if settings.guard_double_settlement && phase == RoundPhase::Settled {
                    return Err(CoreError::AlreadySettled(round_id.to_string()));
                }
                t.world()?;
                let funding = t.funding_for_round(round_id);

                // Compute
                let plan = plan_settlement(&funding, &winner.id, &settings.rates)?;

                // Distribute
                let mut paid = Vec::new();
                let mut dropped = Vec::new();
                for payout in plan.payouts() {
                    match participant_for(t, &payout.funder, settings.missing_participant, now)? {
                        Some(participant) => {
                            credit(&mut participant.total_won, payout.amount, "participant total won")?;
                            paid.push(payout.clone());
                        }
                        None => {
                            tracing::warn!(
                                round_id = %round_id,
                                funder = %payout.funder,
                                amount = %payout.amount,
                                "No participant record for funder, payout dropped"
                            );
                            dropped.push(payout.clone());
                        }
                    }
                }

                // Finalize
                let world = t.world_mut()?;
                credit(&mut world.treasury_dumble, plan.breakdown.treasury_fee, "treasury")?;
                world.updated_at = now;

                let round = t.round_mut(round_id)?;
                round.phase = RoundPhase::Settled;
                round.ended_at = Some(now);

                Ok(SettlementOutcome {
                    round_id: round_id.to_string(),
                    winning_idea_id: winner.id,
                    winning_idea: winner.title,
                    breakdown: plan.breakdown,
                    payouts: paid,
                    dropped_payouts: dropped,
                    settled_at: now,
                })
            })
            .await
    }
}
