use clickhouse::Row;
use serde::{Deserialize, Serialize};

use clawarts_core::FundingRecord;

use crate::ledger::SettlementOutcome;

/// Decimal values are stored as strings for precise representation in ClickHouse
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct FundingLogRow {
    pub id: String,
    pub round_id: String,
    pub idea_id: String,
    pub funder: String,
    pub direction: String,
    pub amount: String,
    pub created_at: i64,
}

impl From<&FundingRecord> for FundingLogRow {
    fn from(record: &FundingRecord) -> Self {
        Self {
            id: record.id.clone(),
            round_id: record.round_id.clone(),
            idea_id: record.idea_id.clone(),
            funder: record.funder.clone(),
            direction: record.direction.to_string(),
            amount: record.amount.to_string(),
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct SettlementLogRow {
    pub round_id: String,
    pub winning_idea_id: String,
    pub losing_believers_pool: String,
    pub treasury_fee: String,
    pub reward_pool: String,
    pub challenger_bonus: String,
    pub believer_reward_pool: String,
    pub payout_count: u32,
    pub dropped_count: u32,
    pub settled_at: i64,
}

impl From<&SettlementOutcome> for SettlementLogRow {
    fn from(outcome: &SettlementOutcome) -> Self {
        let b = &outcome.breakdown;
        Self {
            round_id: outcome.round_id.clone(),
            winning_idea_id: outcome.winning_idea_id.clone(),
            losing_believers_pool: b.losing_believers_pool.to_string(),
            treasury_fee: b.treasury_fee.to_string(),
            reward_pool: b.reward_pool.to_string(),
            challenger_bonus: b.challenger_bonus.to_string(),
            believer_reward_pool: b.believer_reward_pool.to_string(),
            payout_count: outcome.payouts.len() as u32,
            dropped_count: outcome.dropped_payouts.len() as u32,
            settled_at: outcome.settled_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawarts_core::Direction;
    use rust_decimal_macros::dec;

    #[test]
    fn test_funding_row_keeps_exact_amount() {
        let record = FundingRecord {
            id: "f1".to_string(),
            round_id: "ROUND-001".to_string(),
            idea_id: "i1".to_string(),
            funder: "0xabc".to_string(),
            amount: dec!(12.3456),
            direction: Direction::Challenge,
            created_at: 42,
        };
        let row = FundingLogRow::from(&record);
        assert_eq!(row.amount, "12.3456");
        assert_eq!(row.direction, "challenge");
    }
}
