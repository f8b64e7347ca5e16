use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::HeaderMap,
    Json,
};
use std::time::Instant;

use clawarts_core::round::RoundAction;
use clawarts_core::{now_millis, Idea, Participant, WorldState};

use super::auth::require_world_write;
use super::dto::*;
use crate::error::{AppError, AppResult};
use crate::ledger::{
    ActiveRound, CharacterPatch, FundingRequest, NewIdea, NewSpell, NewVote, RoundBundle,
    RoundCompletion,
};
use crate::AppState;

const CHARACTER_LIMIT: usize = 50;
const HISTORY_LIMIT: usize = 20;

pub async fn health_check(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    let start = Instant::now();
    println!("[REQUEST] GET /health");
    tracing::info!("Processing health check request");

    let archive_status = if !state.archive.is_enabled() {
        "disabled"
    } else {
        match state.archive.health_check().await {
            Ok(_) => {
                tracing::debug!("Archive health check passed");
                "connected"
            }
            Err(e) => {
                tracing::warn!(error = %e, "Archive health check failed");
                "disconnected"
            }
        }
    };

    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: state.ledger.store().stats().await,
        archive: archive_status.to_string(),
        cached_entries: state.board.cached_entries(),
    };

    let duration = start.elapsed().as_millis();
    println!("[RESPONSE] GET /health -> 200 OK ({}ms) archive={}", duration, archive_status);
    tracing::info!(
        duration_ms = %duration,
        archive_status = %archive_status,
        "Health check completed"
    );

    Ok(Json(response))
}

// ============================================================================
// Queries
// ============================================================================

pub async fn get_world(State(state): State<AppState>) -> Json<OrMissing<WorldState>> {
    println!("[REQUEST] GET /api/clawarts/world");
    let world = state.ledger.world().await;
    tracing::debug!(initialized = %world.is_some(), "World state read");
    Json(OrMissing::from_option(world, "World not initialized"))
}

pub async fn get_round(State(state): State<AppState>) -> Json<OrMissing<RoundBundle>> {
    println!("[REQUEST] GET /api/clawarts/round");
    let bundle = state.ledger.current_round().await;
    Json(OrMissing::from_option(bundle, "No active round"))
}

pub async fn get_round_state(State(state): State<AppState>) -> Json<RoundAction> {
    let start = Instant::now();
    println!("[REQUEST] GET /api/clawarts/round/state");

    let action = state.ledger.round_state(now_millis()).await;

    let duration = start.elapsed().as_millis();
    println!("[RESPONSE] GET /api/clawarts/round/state -> 200 OK ({}ms)", duration);
    tracing::info!(duration_ms = %duration, action = ?action, "Round state computed");
    Json(action)
}

pub async fn get_active_round(State(state): State<AppState>) -> Json<OrMissing<ActiveRound>> {
    println!("[REQUEST] GET /api/clawarts/round/active");
    let active = state.ledger.active_round().await;
    Json(OrMissing::from_option(active, "No active round"))
}

pub async fn get_ideas(
    State(state): State<AppState>,
    query: Result<Query<IdeasQuery>, axum::extract::rejection::QueryRejection>,
) -> AppResult<Json<Vec<Idea>>> {
    let Query(query) = query?;
    let round_id = query
        .round_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing ?roundId= parameter".to_string()))?;
    println!("[REQUEST] GET /api/clawarts/ideas?roundId={}", round_id);

    let ideas = state.ledger.ideas_by_round(&round_id).await;
    tracing::debug!(round_id = %round_id, count = %ideas.len(), "Ideas listed");
    Ok(Json(ideas))
}

pub async fn get_characters(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Json<CharactersResponse> {
    println!("[REQUEST] GET /api/clawarts/characters");
    let limit = query.limit.unwrap_or(CHARACTER_LIMIT);
    let characters = state.ledger.characters(Some(limit)).await;
    Json(CharactersResponse { characters })
}

pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Json<HistoryResponse> {
    println!("[REQUEST] GET /api/clawarts/history");
    let rounds = state.ledger.history(query.limit.unwrap_or(HISTORY_LIMIT)).await;
    Json(HistoryResponse { rounds })
}

pub async fn get_leaderboard(State(state): State<AppState>) -> Json<LeaderboardResponse> {
    println!("[REQUEST] GET /api/clawarts/leaderboard");
    let participants = state.ledger.leaderboard().await;
    Json(LeaderboardResponse { participants })
}

pub async fn get_participant(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> AppResult<Json<Participant>> {
    println!("[REQUEST] GET /api/clawarts/participant/{}", address);
    let participant = state
        .ledger
        .participant(&address)
        .await
        .ok_or_else(|| clawarts_core::CoreError::not_found("Participant", &address))?;
    Ok(Json(participant))
}

// ============================================================================
// World and rounds
// ============================================================================

pub async fn post_init(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Json<InitResponse>> {
    println!("[REQUEST] POST /api/clawarts/init");
    require_world_write(&headers, &state.config.board)?;

    let world = state.ledger.init_world().await?;
    println!("[RESPONSE] POST /api/clawarts/init -> 200 OK rounds={}", world.total_rounds);
    Ok(Json(InitResponse { ok: true, world }))
}

pub async fn post_start_round(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<RoundIdResponse>> {
    println!("[REQUEST] POST /api/clawarts/startRound");
    require_world_write(&headers, &state.config.board)?;

    let round_id = state.ledger.start_round().await?;
    println!("[RESPONSE] POST /api/clawarts/startRound -> 200 OK round={}", round_id);
    Ok(Json(RoundIdResponse { ok: true, round_id }))
}

pub async fn post_open_round(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<RoundIdRequest>, JsonRejection>,
) -> AppResult<Json<RoundIdResponse>> {
    println!("[REQUEST] POST /api/clawarts/openRound");
    require_world_write(&headers, &state.config.board)?;
    let Json(req) = payload?;

    let round_id = state.ledger.open_round(&req.round_id).await?;
    println!("[RESPONSE] POST /api/clawarts/openRound -> 200 OK round={}", round_id);
    Ok(Json(RoundIdResponse { ok: true, round_id }))
}

pub async fn post_set_phase(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<SetPhaseRequest>, JsonRejection>,
) -> AppResult<Json<PhaseResponse>> {
    println!("[REQUEST] POST /api/clawarts/setPhase");
    require_world_write(&headers, &state.config.board)?;
    let Json(req) = payload?;

    let phase = state.ledger.set_phase(&req.phase, req.round_id.as_deref()).await?;
    tracing::info!(phase = %phase, round_id = ?req.round_id, "Phase set");
    Ok(Json(PhaseResponse { ok: true, phase }))
}

pub async fn post_declare_winner(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<DeclareWinnerRequest>, JsonRejection>,
) -> AppResult<Json<OkResponse>> {
    println!("[REQUEST] POST /api/clawarts/declareWinner");
    require_world_write(&headers, &state.config.board)?;
    let Json(req) = payload?;

    state.ledger.declare_winner(&req.round_id, &req.idea_id).await?;
    println!(
        "[RESPONSE] POST /api/clawarts/declareWinner -> 200 OK round={} idea={}",
        req.round_id, req.idea_id
    );
    Ok(Json(OkResponse::ok()))
}

pub async fn post_complete_round(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<RoundCompletion>, JsonRejection>,
) -> AppResult<Json<OkResponse>> {
    println!("[REQUEST] POST /api/clawarts/completeRound");
    require_world_write(&headers, &state.config.board)?;
    let Json(req) = payload?;

    let round_id = req.round_id.clone();
    state.ledger.complete_round(req).await?;
    tracing::info!(round_id = %round_id, "Round completed");
    Ok(Json(OkResponse::ok()))
}

// ============================================================================
// Ideas, spells, characters, votes
// ============================================================================

pub async fn post_idea(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<NewIdea>, JsonRejection>,
) -> AppResult<Json<IdeaResponse>> {
    println!("[REQUEST] POST /api/clawarts/idea");
    require_world_write(&headers, &state.config.board)?;
    let Json(req) = payload?;

    let idea_id = state.ledger.submit_idea(req).await?;
    println!("[RESPONSE] POST /api/clawarts/idea -> 200 OK idea={}", idea_id);
    Ok(Json(IdeaResponse { ok: true, idea_id }))
}

pub async fn post_confirm_idea(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ConfirmIdeaRequest>, JsonRejection>,
) -> AppResult<Json<OkResponse>> {
    println!("[REQUEST] POST /api/clawarts/confirmIdea");
    require_world_write(&headers, &state.config.board)?;
    let Json(req) = payload?;

    state
        .ledger
        .confirm_idea(&req.idea_id, &req.tx_hash, &req.tx_status)
        .await?;
    tracing::info!(idea_id = %req.idea_id, tx_status = %req.tx_status, "Idea stake confirmed");
    Ok(Json(OkResponse::ok()))
}

pub async fn post_delete_idea(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<IdeaIdRequest>, JsonRejection>,
) -> AppResult<Json<OkResponse>> {
    println!("[REQUEST] POST /api/clawarts/deleteIdea");
    require_world_write(&headers, &state.config.board)?;
    let Json(req) = payload?;

    state.ledger.delete_idea(&req.idea_id).await?;
    tracing::info!(idea_id = %req.idea_id, "Idea deleted");
    Ok(Json(OkResponse::ok()))
}

pub async fn post_spell(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<NewSpell>, JsonRejection>,
) -> AppResult<Json<SpellResponse>> {
    println!("[REQUEST] POST /api/clawarts/spell");
    require_world_write(&headers, &state.config.board)?;
    let Json(req) = payload?;

    let spell_id = state.ledger.cast_spell(req).await?;
    Ok(Json(SpellResponse { ok: true, spell_id }))
}

pub async fn post_summon(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<SummonRequest>, JsonRejection>,
) -> AppResult<Json<SummonResponse>> {
    let start = Instant::now();
    println!("[REQUEST] POST /api/clawarts/summon");
    require_world_write(&headers, &state.config.board)?;
    let Json(req) = payload?;

    let character = state.ledger.summon_character(&req.spell_word, &req.round_id).await?;

    let duration = start.elapsed().as_millis();
    println!(
        "[RESPONSE] POST /api/clawarts/summon -> 200 OK ({}ms) role={} rarity={} appearances={}",
        duration, character.role, character.rarity, character.appearances
    );
    Ok(Json(SummonResponse {
        ok: true,
        character_id: character.id.clone(),
        character,
    }))
}

pub async fn post_update_character(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CharacterPatch>, JsonRejection>,
) -> AppResult<Json<OkResponse>> {
    println!("[REQUEST] POST /api/clawarts/updateCharacter");
    require_world_write(&headers, &state.config.board)?;
    let Json(req) = payload?;

    let character = state.ledger.update_character(req).await?;
    tracing::info!(character_id = %character.id, name = %character.name, "Character updated");
    Ok(Json(OkResponse::ok()))
}

pub async fn post_vote(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<NewVote>, JsonRejection>,
) -> AppResult<Json<VoteResponse>> {
    println!("[REQUEST] POST /api/clawarts/vote");
    require_world_write(&headers, &state.config.board)?;
    let Json(req) = payload?;

    let vote_id = state.ledger.submit_vote(req).await?;
    Ok(Json(VoteResponse { ok: true, vote_id }))
}

// ============================================================================
// Participants, funding, settlement
// ============================================================================

pub async fn post_join(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<JoinRequest>, JsonRejection>,
) -> AppResult<Json<JoinResponse>> {
    println!("[REQUEST] POST /api/clawarts/join");
    require_world_write(&headers, &state.config.board)?;
    let Json(req) = payload?;

    let participant = state
        .ledger
        .join_world(&req.address, &req.display_name, req.is_agent)
        .await?;
    Ok(Json(JoinResponse {
        ok: true,
        participant_id: participant.address,
    }))
}

pub async fn post_fund(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<FundingRequest>, JsonRejection>,
) -> AppResult<Json<OkResponse>> {
    let start = Instant::now();
    println!("[REQUEST] POST /api/clawarts/fund");
    require_world_write(&headers, &state.config.board)?;
    let Json(req) = payload?;
    tracing::info!(
        round_id = %req.round_id,
        idea_id = %req.idea_id,
        funder = %req.funder,
        amount = %req.amount,
        direction = %req.direction,
        "Processing funding request"
    );

    let record = state.ledger.fund(req).await?;
    state.archive.record_funding(&record);

    let duration = start.elapsed().as_millis();
    println!(
        "[RESPONSE] POST /api/clawarts/fund -> 200 OK ({}ms) {} {} on {}",
        duration, record.direction, record.amount, record.idea_id
    );
    tracing::info!(
        funding_id = %record.id,
        duration_ms = %duration,
        "Funding recorded"
    );
    Ok(Json(OkResponse::ok()))
}

pub async fn post_settle(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<RoundIdRequest>, JsonRejection>,
) -> AppResult<Json<SettleResponse>> {
    let start = Instant::now();
    println!("[REQUEST] POST /api/clawarts/settle");
    require_world_write(&headers, &state.config.board)?;
    let Json(req) = payload?;
    tracing::info!(round_id = %req.round_id, "Processing settlement request");

    let outcome = state.ledger.settle(&req.round_id).await?;
    state.archive.record_settlement(&outcome);

    let duration = start.elapsed().as_millis();
    println!(
        "[RESPONSE] POST /api/clawarts/settle -> 200 OK ({}ms) round={} pool={} fee={} payouts={}",
        duration,
        outcome.round_id,
        outcome.breakdown.losing_believers_pool,
        outcome.breakdown.treasury_fee,
        outcome.payouts.len()
    );
    tracing::info!(
        round_id = %outcome.round_id,
        winning_idea = %outcome.winning_idea,
        losing_believers_pool = %outcome.breakdown.losing_believers_pool,
        treasury_fee = %outcome.breakdown.treasury_fee,
        payouts = %outcome.payouts.len(),
        dropped = %outcome.dropped_payouts.len(),
        duration_ms = %duration,
        "Round settled"
    );
    Ok(Json(SettleResponse { ok: true, outcome }))
}
