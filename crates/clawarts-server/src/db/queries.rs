use clickhouse::Client;
use std::time::Instant;

use super::models::{FundingLogRow, SettlementLogRow};
use crate::error::AppResult;

const CREATE_FUNDING_LOG: &str = r#"
    CREATE TABLE IF NOT EXISTS funding_log (
        id String,
        round_id String,
        idea_id String,
        funder String,
        direction LowCardinality(String),
        amount String,
        created_at Int64,
        inserted_at DateTime64(3) DEFAULT now64(3)
    )
    ENGINE = MergeTree
    ORDER BY (round_id, created_at)
"#;

const CREATE_SETTLEMENT_LOG: &str = r#"
    CREATE TABLE IF NOT EXISTS settlement_log (
        round_id String,
        winning_idea_id String,
        losing_believers_pool String,
        treasury_fee String,
        reward_pool String,
        challenger_bonus String,
        believer_reward_pool String,
        payout_count UInt32,
        dropped_count UInt32,
        settled_at Int64,
        inserted_at DateTime64(3) DEFAULT now64(3)
    )
    ENGINE = MergeTree
    ORDER BY (round_id, settled_at)
"#;

pub async fn create_tables(client: &Client) -> AppResult<()> {
    let start = Instant::now();
    for ddl in [CREATE_FUNDING_LOG, CREATE_SETTLEMENT_LOG] {
        client.query(ddl).execute().await?;
    }
    tracing::debug!(
        query = "create_tables",
        duration_ms = %start.elapsed().as_millis(),
        "Archive schema ready"
    );
    Ok(())
}

pub async fn insert_funding(client: &Client, row: &FundingLogRow) -> AppResult<()> {
    let start = Instant::now();
    tracing::debug!(
        round_id = %row.round_id,
        funder = %row.funder,
        query = "insert_funding",
        "Executing database insert"
    );

    let query = r#"
        INSERT INTO funding_log (
            id, round_id, idea_id, funder, direction, amount, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
    "#;

    client
        .query(query)
        .bind(&row.id)
        .bind(&row.round_id)
        .bind(&row.idea_id)
        .bind(&row.funder)
        .bind(&row.direction)
        .bind(&row.amount)
        .bind(row.created_at)
        .execute()
        .await?;

    tracing::debug!(
        round_id = %row.round_id,
        query = "insert_funding",
        duration_ms = %start.elapsed().as_millis(),
        "Database insert completed"
    );

    Ok(())
}

pub async fn insert_settlement(client: &Client, row: &SettlementLogRow) -> AppResult<()> {
    let start = Instant::now();
    tracing::debug!(round_id = %row.round_id, query = "insert_settlement", "Executing database insert");

    let query = r#"
        INSERT INTO settlement_log (
            round_id, winning_idea_id, losing_believers_pool, treasury_fee,
            reward_pool, challenger_bonus, believer_reward_pool,
            payout_count, dropped_count, settled_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    "#;

    client
        .query(query)
        .bind(&row.round_id)
        .bind(&row.winning_idea_id)
        .bind(&row.losing_believers_pool)
        .bind(&row.treasury_fee)
        .bind(&row.reward_pool)
        .bind(&row.challenger_bonus)
        .bind(&row.believer_reward_pool)
        .bind(row.payout_count)
        .bind(row.dropped_count)
        .bind(row.settled_at)
        .execute()
        .await?;

    tracing::debug!(
        round_id = %row.round_id,
        query = "insert_settlement",
        duration_ms = %start.elapsed().as_millis(),
        "Database insert completed"
    );

    Ok(())
}
