//! Round numbering and orchestration
//!
//! The orchestrator (an external agent) polls [`next_action`] to learn
//! whether it should open a round, run the council, or keep waiting.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{Idea, Millis, Round, RoundPhase, Spell, WorldState};

/// How long the cauldron stays open before the council may run
pub const DEFAULT_ROUND_DURATION_MS: i64 = 10 * 60 * 1000;

/// `ROUND-001`, `ROUND-002`, ...
pub fn round_id(number: u32) -> String {
    format!("ROUND-{:03}", number)
}

pub fn next_round_id(world: &WorldState) -> String {
    round_id(world.total_rounds + 1)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouncilIdea {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet: Option<String>,
    pub total_believed: Decimal,
    pub total_challenged: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouncilSpell {
    pub word: String,
    pub caster: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caster_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RoundAction {
    None {
        error: String,
    },
    #[serde(rename_all = "camelCase")]
    OpenRound {
        next_round_id: String,
        total_rounds: u32,
        phase: RoundPhase,
    },
    #[serde(rename_all = "camelCase")]
    RunCouncil {
        round_id: String,
        phase: RoundPhase,
        ideas: Vec<CouncilIdea>,
        spells: Vec<CouncilSpell>,
        time_left: i64,
        expired: bool,
    },
    #[serde(rename_all = "camelCase")]
    Wait {
        round_id: String,
        phase: RoundPhase,
        idea_count: usize,
        spell_count: usize,
        time_left: i64,
        expired: bool,
        started_at: Millis,
        ends_at: Millis,
    },
}

/// Decide what the orchestrator should do next.
///
/// `round` is the row named by `world.current_round`, if any; `ideas` and
/// `spells` belong to that round.
pub fn next_action(
    world: Option<&WorldState>,
    round: Option<&Round>,
    ideas: &[Idea],
    spells: &[Spell],
    now: Millis,
    duration_ms: i64,
) -> RoundAction {
    let Some(world) = world else {
        return RoundAction::None {
            error: "World not initialized".to_string(),
        };
    };

    let Some(current_round) = world.current_round.as_deref() else {
        return RoundAction::OpenRound {
            next_round_id: next_round_id(world),
            total_rounds: world.total_rounds,
            phase: world.phase,
        };
    };

    let Some(round) = round else {
        // Pointer to a round row that was never written; reopen it
        return RoundAction::OpenRound {
            next_round_id: current_round.to_string(),
            total_rounds: world.total_rounds,
            phase: world.phase,
        };
    };

    if round.phase.is_terminal() {
        return RoundAction::OpenRound {
            next_round_id: next_round_id(world),
            total_rounds: world.total_rounds,
            phase: round.phase,
        };
    }

    let elapsed = now - round.started_at;
    let time_left = (duration_ms - elapsed).max(0);
    let expired = time_left == 0;

    if round.phase == RoundPhase::Cauldron && expired && !ideas.is_empty() {
        return RoundAction::RunCouncil {
            round_id: round.round_id.clone(),
            phase: round.phase,
            ideas: ideas
                .iter()
                .map(|i| CouncilIdea {
                    id: i.id.clone(),
                    title: i.title.clone(),
                    wallet: i.wallet.clone(),
                    total_believed: i.total_believed,
                    total_challenged: i.total_challenged,
                })
                .collect(),
            spells: spells
                .iter()
                .map(|s| CouncilSpell {
                    word: s.word.clone(),
                    caster: s.caster.clone(),
                    caster_type: s.caster_type.clone(),
                })
                .collect(),
            time_left: 0,
            expired: true,
        };
    }

    RoundAction::Wait {
        round_id: round.round_id.clone(),
        phase: round.phase,
        idea_count: ideas.len(),
        spell_count: spells.len(),
        time_left,
        expired,
        started_at: round.started_at,
        ends_at: round.started_at + duration_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: Millis = 1_700_000_000_000;

    fn world_with_round(round_id: Option<&str>, total_rounds: u32) -> WorldState {
        let mut world = WorldState::new(START);
        world.current_round = round_id.map(str::to_string);
        world.total_rounds = total_rounds;
        world.phase = RoundPhase::Cauldron;
        world
    }

    fn idea(id: &str) -> Idea {
        Idea {
            id: id.to_string(),
            round_id: "ROUND-001".to_string(),
            title: format!("Idea {}", id),
            description: String::new(),
            submitted_by: "agent".to_string(),
            author: None,
            url: None,
            wallet: None,
            source: None,
            tx_hash: None,
            tx_status: "pending".to_string(),
            stake_amount: Decimal::ZERO,
            stake_currency: "DUMBLE".to_string(),
            votes: Decimal::ZERO,
            is_winner: false,
            total_believed: Decimal::ZERO,
            total_challenged: Decimal::ZERO,
            created_at: START,
        }
    }

    #[test]
    fn test_round_id_is_zero_padded() {
        assert_eq!(round_id(1), "ROUND-001");
        assert_eq!(round_id(42), "ROUND-042");
        assert_eq!(round_id(1234), "ROUND-1234");
    }

    #[test]
    fn test_uninitialized_world() {
        let action = next_action(None, None, &[], &[], START, DEFAULT_ROUND_DURATION_MS);
        assert!(matches!(action, RoundAction::None { .. }));
    }

    #[test]
    fn test_no_current_round_opens_next() {
        let world = world_with_round(None, 3);
        let action = next_action(Some(&world), None, &[], &[], START, DEFAULT_ROUND_DURATION_MS);
        assert_eq!(
            action,
            RoundAction::OpenRound {
                next_round_id: "ROUND-004".to_string(),
                total_rounds: 3,
                phase: RoundPhase::Cauldron,
            }
        );
    }

    #[test]
    fn test_missing_round_row_reopens_current() {
        let world = world_with_round(Some("ROUND-002"), 2);
        let action = next_action(Some(&world), None, &[], &[], START, DEFAULT_ROUND_DURATION_MS);
        match action {
            RoundAction::OpenRound { next_round_id, .. } => assert_eq!(next_round_id, "ROUND-002"),
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_settled_round_opens_next() {
        let world = world_with_round(Some("ROUND-001"), 1);
        let mut round = Round::open("ROUND-001", START);
        round.phase = RoundPhase::Settled;
        let action = next_action(Some(&world), Some(&round), &[], &[], START, DEFAULT_ROUND_DURATION_MS);
        match action {
            RoundAction::OpenRound { next_round_id, phase, .. } => {
                assert_eq!(next_round_id, "ROUND-002");
                assert_eq!(phase, RoundPhase::Settled);
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_open_cauldron_waits() {
        let world = world_with_round(Some("ROUND-001"), 1);
        let round = Round::open("ROUND-001", START);
        let now = START + 4 * 60 * 1000;
        let action = next_action(Some(&world), Some(&round), &[idea("a")], &[], now, DEFAULT_ROUND_DURATION_MS);
        match action {
            RoundAction::Wait { time_left, expired, ends_at, idea_count, .. } => {
                assert_eq!(time_left, 6 * 60 * 1000);
                assert!(!expired);
                assert_eq!(ends_at, START + DEFAULT_ROUND_DURATION_MS);
                assert_eq!(idea_count, 1);
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_expired_cauldron_without_ideas_keeps_waiting() {
        let world = world_with_round(Some("ROUND-001"), 1);
        let round = Round::open("ROUND-001", START);
        let now = START + DEFAULT_ROUND_DURATION_MS + 1;
        let action = next_action(Some(&world), Some(&round), &[], &[], now, DEFAULT_ROUND_DURATION_MS);
        assert!(matches!(action, RoundAction::Wait { expired: true, time_left: 0, .. }));
    }

    #[test]
    fn test_expired_cauldron_runs_council() {
        let world = world_with_round(Some("ROUND-001"), 1);
        let round = Round::open("ROUND-001", START);
        let now = START + DEFAULT_ROUND_DURATION_MS;
        let action = next_action(Some(&world), Some(&round), &[idea("a"), idea("b")], &[], now, DEFAULT_ROUND_DURATION_MS);
        match &action {
            RoundAction::RunCouncil { ideas, expired, .. } => {
                assert_eq!(ideas.len(), 2);
                assert!(expired);
            }
            other => panic!("unexpected action {:?}", other),
        }

        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action"], "run_council");
        assert_eq!(json["roundId"], "ROUND-001");
        assert_eq!(json["timeLeft"], 0);
    }
}
