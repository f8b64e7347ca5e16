pub mod auth;
pub mod board;
pub mod dto;
pub mod handlers;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Ledger reads
        .route("/api/clawarts/world", get(handlers::get_world))
        .route("/api/clawarts/round", get(handlers::get_round))
        .route("/api/clawarts/round/state", get(handlers::get_round_state))
        .route("/api/clawarts/round/active", get(handlers::get_active_round))
        .route("/api/clawarts/ideas", get(handlers::get_ideas))
        .route("/api/clawarts/characters", get(handlers::get_characters))
        .route("/api/clawarts/history", get(handlers::get_history))
        .route("/api/clawarts/leaderboard", get(handlers::get_leaderboard))
        .route("/api/clawarts/participant/{address}", get(handlers::get_participant))
        // Ledger writes
        .route("/api/clawarts/init", post(handlers::post_init))
        .route("/api/clawarts/startRound", post(handlers::post_start_round))
        .route("/api/clawarts/openRound", post(handlers::post_open_round))
        .route("/api/clawarts/setPhase", post(handlers::post_set_phase))
        .route("/api/clawarts/idea", post(handlers::post_idea))
        .route("/api/clawarts/confirmIdea", post(handlers::post_confirm_idea))
        .route("/api/clawarts/deleteIdea", post(handlers::post_delete_idea))
        .route("/api/clawarts/spell", post(handlers::post_spell))
        .route("/api/clawarts/summon", post(handlers::post_summon))
        .route("/api/clawarts/updateCharacter", post(handlers::post_update_character))
        .route("/api/clawarts/vote", post(handlers::post_vote))
        .route("/api/clawarts/declareWinner", post(handlers::post_declare_winner))
        .route("/api/clawarts/completeRound", post(handlers::post_complete_round))
        .route("/api/clawarts/join", post(handlers::post_join))
        .route("/api/clawarts/fund", post(handlers::post_fund))
        .route("/api/clawarts/settle", post(handlers::post_settle))
        // Task board
        .route("/api/tick/sync", post(board::post_sync))
        .route("/api/tick/projects", get(board::get_projects))
        .route("/api/tick/projects/{slug}", delete(board::delete_project))
        .route("/api/tick/tasks", get(board::get_tasks))
        .route("/api/tick/task", get(board::get_task))
        .route("/api/tick/threads", post(board::post_thread))
}
