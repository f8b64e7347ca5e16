//! On-disk snapshot format
//!
//! API rows serialise money as JSON floats for the dashboard. Snapshot rows
//! keep every `Decimal` as a string so a reload restores exact amounts.

use std::collections::BTreeMap;

use clawarts_core::board::{ThreadMessage, TickProject, TickTask};
use clawarts_core::{
    Character, CouncilVote, Direction, FundingRecord, Idea, Millis, Participant, Round, RoundPhase,
    Spell, WorldState,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::tables::{AppendLog, Tables};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(super) struct Snapshot {
    world: Option<WorldRow>,
    rounds: Vec<Round>,
    ideas: Vec<IdeaRow>,
    funding: Vec<FundingRow>,
    spells: Vec<SpellRow>,
    characters: Vec<Character>,
    votes: Vec<VoteRow>,
    participants: Vec<ParticipantRow>,
    projects: Vec<TickProject>,
    /// Grouped back by `projectSlug` on load
    tasks: Vec<TickTask>,
    threads: Vec<ThreadMessage>,
}

impl From<&Tables> for Snapshot {
    fn from(t: &Tables) -> Self {
        Self {
            world: t.world.as_ref().map(WorldRow::from),
            rounds: t.rounds.clone(),
            ideas: t.ideas.iter().map(IdeaRow::from).collect(),
            funding: t.funding.iter().map(FundingRow::from).collect(),
            spells: t.spells.iter().map(SpellRow::from).collect(),
            characters: t.characters.clone(),
            votes: t.votes.iter().map(VoteRow::from).collect(),
            participants: t.participants.values().map(ParticipantRow::from).collect(),
            projects: t.projects.values().cloned().collect(),
            tasks: t.tasks.values().flat_map(|tasks| tasks.values().cloned()).collect(),
            threads: t.threads.clone(),
        }
    }
}

impl From<Snapshot> for Tables {
    fn from(s: Snapshot) -> Self {
        let mut tasks: BTreeMap<String, BTreeMap<String, TickTask>> = BTreeMap::new();
        for task in s.tasks {
            tasks
                .entry(task.project_slug.clone())
                .or_default()
                .insert(task.tick_id.clone(), task);
        }

        Self {
            world: s.world.map(WorldState::from),
            rounds: s.rounds,
            ideas: s.ideas.into_iter().map(Idea::from).collect(),
            funding: AppendLog::from_rows(s.funding.into_iter().map(FundingRecord::from).collect()),
            spells: AppendLog::from_rows(s.spells.into_iter().map(Spell::from).collect()),
            characters: s.characters,
            votes: AppendLog::from_rows(s.votes.into_iter().map(CouncilVote::from).collect()),
            participants: s
                .participants
                .into_iter()
                .map(|p| (p.address.clone(), Participant::from(p)))
                .collect(),
            projects: s.projects.into_iter().map(|p| (p.slug.clone(), p)).collect(),
            tasks,
            threads: s.threads,
        }
    }
}

// =============================================================================
// Rows with exact money
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorldRow {
    phase: RoundPhase,
    #[serde(default)]
    current_round: Option<String>,
    #[serde(with = "rust_decimal::serde::str")]
    treasury_dumble: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    treasury_mon: Decimal,
    total_rounds: u32,
    total_apps_built: u32,
    total_spells_cast: u64,
    total_characters: u64,
    updated_at: Millis,
}

impl From<&WorldState> for WorldRow {
    fn from(w: &WorldState) -> Self {
        Self {
            phase: w.phase,
            current_round: w.current_round.clone(),
            treasury_dumble: w.treasury_dumble,
            treasury_mon: w.treasury_mon,
            total_rounds: w.total_rounds,
            total_apps_built: w.total_apps_built,
            total_spells_cast: w.total_spells_cast,
            total_characters: w.total_characters,
            updated_at: w.updated_at,
        }
    }
}

impl From<WorldRow> for WorldState {
    fn from(w: WorldRow) -> Self {
        Self {
            phase: w.phase,
            current_round: w.current_round,
            treasury_dumble: w.treasury_dumble,
            treasury_mon: w.treasury_mon,
            total_rounds: w.total_rounds,
            total_apps_built: w.total_apps_built,
            total_spells_cast: w.total_spells_cast,
            total_characters: w.total_characters,
            updated_at: w.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdeaRow {
    id: String,
    round_id: String,
    title: String,
    description: String,
    submitted_by: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    wallet: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    tx_hash: Option<String>,
    tx_status: String,
    #[serde(with = "rust_decimal::serde::str")]
    stake_amount: Decimal,
    stake_currency: String,
    #[serde(with = "rust_decimal::serde::str")]
    votes: Decimal,
    is_winner: bool,
    #[serde(with = "rust_decimal::serde::str")]
    total_believed: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    total_challenged: Decimal,
    created_at: Millis,
}

impl From<&Idea> for IdeaRow {
    fn from(i: &Idea) -> Self {
        Self {
            id: i.id.clone(),
            round_id: i.round_id.clone(),
            title: i.title.clone(),
            description: i.description.clone(),
            submitted_by: i.submitted_by.clone(),
            author: i.author.clone(),
            url: i.url.clone(),
            wallet: i.wallet.clone(),
            source: i.source.clone(),
            tx_hash: i.tx_hash.clone(),
            tx_status: i.tx_status.clone(),
            stake_amount: i.stake_amount,
            stake_currency: i.stake_currency.clone(),
            votes: i.votes,
            is_winner: i.is_winner,
            total_believed: i.total_believed,
            total_challenged: i.total_challenged,
            created_at: i.created_at,
        }
    }
}

impl From<IdeaRow> for Idea {
    fn from(i: IdeaRow) -> Self {
        Self {
            id: i.id,
            round_id: i.round_id,
            title: i.title,
            description: i.description,
            submitted_by: i.submitted_by,
            author: i.author,
            url: i.url,
            wallet: i.wallet,
            source: i.source,
            tx_hash: i.tx_hash,
            tx_status: i.tx_status,
            stake_amount: i.stake_amount,
            stake_currency: i.stake_currency,
            votes: i.votes,
            is_winner: i.is_winner,
            total_believed: i.total_believed,
            total_challenged: i.total_challenged,
            created_at: i.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FundingRow {
    id: String,
    round_id: String,
    idea_id: String,
    funder: String,
    #[serde(with = "rust_decimal::serde::str")]
    amount: Decimal,
    direction: Direction,
    created_at: Millis,
}

impl From<&FundingRecord> for FundingRow {
    fn from(f: &FundingRecord) -> Self {
        Self {
            id: f.id.clone(),
            round_id: f.round_id.clone(),
            idea_id: f.idea_id.clone(),
            funder: f.funder.clone(),
            amount: f.amount,
            direction: f.direction,
            created_at: f.created_at,
        }
    }
}

impl From<FundingRow> for FundingRecord {
    fn from(f: FundingRow) -> Self {
        Self {
            id: f.id,
            round_id: f.round_id,
            idea_id: f.idea_id,
            funder: f.funder,
            amount: f.amount,
            direction: f.direction,
            created_at: f.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParticipantRow {
    address: String,
    display_name: String,
    is_agent: bool,
    rounds_participated: u32,
    #[serde(with = "rust_decimal::serde::str")]
    total_staked: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    total_won: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    total_challenged: Decimal,
    is_contrarian: bool,
    joined_at: Millis,
}

impl From<&Participant> for ParticipantRow {
    fn from(p: &Participant) -> Self {
        Self {
            address: p.address.clone(),
            display_name: p.display_name.clone(),
            is_agent: p.is_agent,
            rounds_participated: p.rounds_participated,
            total_staked: p.total_staked,
            total_won: p.total_won,
            total_challenged: p.total_challenged,
            is_contrarian: p.is_contrarian,
            joined_at: p.joined_at,
        }
    }
}

impl From<ParticipantRow> for Participant {
    fn from(p: ParticipantRow) -> Self {
        Self {
            address: p.address,
            display_name: p.display_name,
            is_agent: p.is_agent,
            rounds_participated: p.rounds_participated,
            total_staked: p.total_staked,
            total_won: p.total_won,
            total_challenged: p.total_challenged,
            is_contrarian: p.is_contrarian,
            joined_at: p.joined_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpellRow {
    id: String,
    round_id: String,
    word: String,
    caster: String,
    #[serde(default)]
    caster_type: Option<String>,
    #[serde(with = "rust_decimal::serde::str")]
    cost: Decimal,
    created_at: Millis,
}

impl From<&Spell> for SpellRow {
    fn from(s: &Spell) -> Self {
        Self {
            id: s.id.clone(),
            round_id: s.round_id.clone(),
            word: s.word.clone(),
            caster: s.caster.clone(),
            caster_type: s.caster_type.clone(),
            cost: s.cost,
            created_at: s.created_at,
        }
    }
}

impl From<SpellRow> for Spell {
    fn from(s: SpellRow) -> Self {
        Self {
            id: s.id,
            round_id: s.round_id,
            word: s.word,
            caster: s.caster,
            caster_type: s.caster_type,
            cost: s.cost,
            created_at: s.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoteRow {
    id: String,
    round_id: String,
    character_id: String,
    idea_id: String,
    reasoning: String,
    #[serde(with = "rust_decimal::serde::str")]
    weight: Decimal,
    created_at: Millis,
}

impl From<&CouncilVote> for VoteRow {
    fn from(v: &CouncilVote) -> Self {
        Self {
            id: v.id.clone(),
            round_id: v.round_id.clone(),
            character_id: v.character_id.clone(),
            idea_id: v.idea_id.clone(),
            reasoning: v.reasoning.clone(),
            weight: v.weight,
            created_at: v.created_at,
        }
    }
}

impl From<VoteRow> for CouncilVote {
    fn from(v: VoteRow) -> Self {
        Self {
            id: v.id,
            round_id: v.round_id,
            character_id: v.character_id,
            idea_id: v.idea_id,
            reasoning: v.reasoning,
            weight: v.weight,
            created_at: v.created_at,
        }
    }
}
