use std::collections::BTreeMap;
use std::ops::Deref;

use clawarts_core::board::{ThreadMessage, TickProject, TickTask};
use clawarts_core::{
    Character, CoreError, CoreResult, CouncilVote, FundingRecord, Idea, Participant, Round, Spell,
    WorldState,
};

/// Rows that are only ever appended. Reads go through the slice; the only
/// mutation is [`AppendLog::push`], so a rollback just truncates.
#[derive(Debug, Clone)]
pub struct AppendLog<T>(Vec<T>);

impl<T> Default for AppendLog<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> AppendLog<T> {
    pub fn push(&mut self, row: T) {
        self.0.push(row);
    }

    pub(super) fn from_rows(rows: Vec<T>) -> Self {
        Self(rows)
    }

    fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }
}

impl<T> Deref for AppendLog<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

/// Every table of the service. Rows are kept in insertion order so that
/// "newest first" queries are a reverse scan.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    /// The world singleton
    pub world: Option<WorldState>,
    pub rounds: Vec<Round>,
    pub ideas: Vec<Idea>,
    pub funding: AppendLog<FundingRecord>,
    pub spells: AppendLog<Spell>,
    pub characters: Vec<Character>,
    pub votes: AppendLog<CouncilVote>,
    /// Keyed by address
    pub participants: BTreeMap<String, Participant>,
    /// Keyed by slug
    pub projects: BTreeMap<String, TickProject>,
    /// Project slug -> tick id -> task
    pub tasks: BTreeMap<String, BTreeMap<String, TickTask>>,
    pub threads: Vec<ThreadMessage>,
}

/// State needed to undo one transaction: copies of the rewritable tables and
/// the lengths of the append logs.
pub(super) struct Checkpoint {
    world: Option<WorldState>,
    rounds: Vec<Round>,
    ideas: Vec<Idea>,
    characters: Vec<Character>,
    participants: BTreeMap<String, Participant>,
    projects: BTreeMap<String, TickProject>,
    tasks: BTreeMap<String, BTreeMap<String, TickTask>>,
    threads: Vec<ThreadMessage>,
    funding_len: usize,
    spells_len: usize,
    votes_len: usize,
}

impl Tables {
    pub(super) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            world: self.world.clone(),
            rounds: self.rounds.clone(),
            ideas: self.ideas.clone(),
            characters: self.characters.clone(),
            participants: self.participants.clone(),
            projects: self.projects.clone(),
            tasks: self.tasks.clone(),
            threads: self.threads.clone(),
            funding_len: self.funding.len(),
            spells_len: self.spells.len(),
            votes_len: self.votes.len(),
        }
    }

    pub(super) fn restore(&mut self, checkpoint: Checkpoint) {
        self.world = checkpoint.world;
        self.rounds = checkpoint.rounds;
        self.ideas = checkpoint.ideas;
        self.characters = checkpoint.characters;
        self.participants = checkpoint.participants;
        self.projects = checkpoint.projects;
        self.tasks = checkpoint.tasks;
        self.threads = checkpoint.threads;
        self.funding.truncate(checkpoint.funding_len);
        self.spells.truncate(checkpoint.spells_len);
        self.votes.truncate(checkpoint.votes_len);
    }

    pub fn world(&self) -> CoreResult<&WorldState> {
        self.world.as_ref().ok_or(CoreError::WorldNotInitialized)
    }

    pub fn world_mut(&mut self) -> CoreResult<&mut WorldState> {
        self.world.as_mut().ok_or(CoreError::WorldNotInitialized)
    }

    pub fn round(&self, round_id: &str) -> Option<&Round> {
        self.rounds.iter().find(|r| r.round_id == round_id)
    }

    pub fn round_mut(&mut self, round_id: &str) -> CoreResult<&mut Round> {
        self.rounds
            .iter_mut()
            .find(|r| r.round_id == round_id)
            .ok_or_else(|| CoreError::not_found("Round", round_id))
    }

    pub fn idea(&self, idea_id: &str) -> Option<&Idea> {
        self.ideas.iter().find(|i| i.id == idea_id)
    }

    pub fn idea_mut(&mut self, idea_id: &str) -> CoreResult<&mut Idea> {
        self.ideas
            .iter_mut()
            .find(|i| i.id == idea_id)
            .ok_or_else(|| CoreError::not_found("Idea", idea_id))
    }

    pub fn ideas_in_round(&self, round_id: &str) -> Vec<Idea> {
        self.ideas.iter().filter(|i| i.round_id == round_id).cloned().collect()
    }

    pub fn winning_idea(&self, round_id: &str) -> Option<&Idea> {
        self.ideas.iter().find(|i| i.round_id == round_id && i.is_winner)
    }

    pub fn funding_for_round(&self, round_id: &str) -> Vec<FundingRecord> {
        self.funding.iter().filter(|f| f.round_id == round_id).cloned().collect()
    }

    pub fn spells_in_round(&self, round_id: &str) -> Vec<Spell> {
        self.spells.iter().filter(|s| s.round_id == round_id).cloned().collect()
    }

    pub fn votes_in_round(&self, round_id: &str) -> Vec<CouncilVote> {
        self.votes.iter().filter(|v| v.round_id == round_id).cloned().collect()
    }

    pub fn character_mut(&mut self, id: &str) -> CoreResult<&mut Character> {
        self.characters
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| CoreError::not_found("Character", id))
    }

    pub fn character_by_spell(&self, spell_word: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.spell_word == spell_word)
    }

    pub fn project_tasks(&self, slug: &str) -> Vec<TickTask> {
        self.tasks
            .get(slug)
            .map(|tasks| tasks.values().cloned().collect())
            .unwrap_or_default()
    }
}
