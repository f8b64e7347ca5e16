//! Optional ClickHouse archive of funding and settlement events
//!
//! The in-memory store stays the source of truth. Archive writes happen after
//! the ledger committed and only ever log on failure.

pub mod models;
pub mod queries;

use clickhouse::Client;

use clawarts_core::FundingRecord;

use crate::config::ArchiveConfig;
use crate::error::AppResult;
use crate::ledger::SettlementOutcome;
use models::{FundingLogRow, SettlementLogRow};

#[derive(Clone)]
pub struct Archive {
    client: Option<Client>,
}

impl Archive {
    pub fn new(config: &ArchiveConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }

        let mut client = Client::default()
            .with_url(&config.url)
            .with_database(&config.database);

        // Add user/password if provided
        if let Some(ref user) = config.user {
            client = client.with_user(user);
        }
        if let Some(ref password) = config.password {
            client = client.with_password(password);
        }

        println!("[ARCHIVE] Connecting to {} database '{}'", config.url, config.database);

        Self { client: Some(client) }
    }

    pub fn disabled() -> Self {
        Self { client: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    pub async fn health_check(&self) -> AppResult<()> {
        if let Some(client) = &self.client {
            client.query("SELECT 1").execute().await?;
        }
        Ok(())
    }

    pub async fn ensure_schema(&self) -> AppResult<()> {
        match &self.client {
            Some(client) => queries::create_tables(client).await,
            None => Ok(()),
        }
    }

    /// Log a funding record in the background
    pub fn record_funding(&self, record: &FundingRecord) {
        let Some(client) = self.client.clone() else {
            return;
        };
        let row = FundingLogRow::from(record);
        tokio::spawn(async move {
            if let Err(e) = queries::insert_funding(&client, &row).await {
                tracing::warn!(round_id = %row.round_id, error = %e, "Failed to archive funding record");
            }
        });
    }

    /// Log a settlement summary in the background
    pub fn record_settlement(&self, outcome: &SettlementOutcome) {
        let Some(client) = self.client.clone() else {
            return;
        };
        let row = SettlementLogRow::from(outcome);
        tokio::spawn(async move {
            if let Err(e) = queries::insert_settlement(&client, &row).await {
                tracing::warn!(round_id = %row.round_id, error = %e, "Failed to archive settlement");
            }
        });
    }
}
