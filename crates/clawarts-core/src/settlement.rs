//! Round settlement engine
//!
//! Settlement turns the funding records of a round into payouts:
//!
//! 1. [`PoolBreakdown::compute`] splits the funding into winner and loser
//!    stakes and derives the losing-believer pool, the treasury fee, the
//!    reward pool and the challenger bonus.
//! 2. [`distribute`] shares a pool across a set of stakes proportionally.
//! 3. [`plan_settlement`] combines both into a [`SettlementPlan`] which the
//!    store applies atomically together with the treasury fee.
//!
//! Challenge stakes on losing ideas never enter the pool. They were moved to
//! the treasury when the stake was placed.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::models::{Direction, FundingRecord};

const BPS_DENOMINATOR: u32 = 10_000;

/// Fractions taken out of the losing-believer pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementRates {
    /// Share of the losing-believer pool kept by the treasury
    pub treasury_fee: Decimal,
    /// Share of the reward pool reserved for challengers of the winner
    pub challenger_bonus: Decimal,
}

impl Default for SettlementRates {
    fn default() -> Self {
        Self {
            treasury_fee: dec!(0.1),
            challenger_bonus: dec!(0.1),
        }
    }
}

impl SettlementRates {
    /// Build rates from basis points (1000 bps = 10%)
    pub fn from_bps(treasury_fee_bps: u32, challenger_bonus_bps: u32) -> CoreResult<Self> {
        for (name, bps) in [
            ("treasury_fee_bps", treasury_fee_bps),
            ("challenger_bonus_bps", challenger_bonus_bps),
        ] {
            if bps > BPS_DENOMINATOR {
                return Err(CoreError::Invalid(format!(
                    "{} must be at most {}, got {}",
                    name, BPS_DENOMINATOR, bps
                )));
            }
        }

        Ok(Self {
            treasury_fee: Decimal::new(treasury_fee_bps as i64, 4),
            challenger_bonus: Decimal::new(challenger_bonus_bps as i64, 4),
        })
    }
}

/// Funding records of one round split by winner/loser and direction
#[derive(Debug, Default)]
pub struct FundingPartition<'a> {
    pub winner_believers: Vec<&'a FundingRecord>,
    pub winner_challengers: Vec<&'a FundingRecord>,
    pub loser_believers: Vec<&'a FundingRecord>,
    pub loser_challengers: Vec<&'a FundingRecord>,
}

impl<'a> FundingPartition<'a> {
    pub fn new(funding: &'a [FundingRecord], winning_idea_id: &str) -> Self {
        let mut partition = Self::default();
        for record in funding {
            let is_winner = record.idea_id == winning_idea_id;
            let bucket = match (is_winner, record.direction) {
                (true, Direction::Believe) => &mut partition.winner_believers,
                (true, Direction::Challenge) => &mut partition.winner_challengers,
                (false, Direction::Believe) => &mut partition.loser_believers,
                (false, Direction::Challenge) => &mut partition.loser_challengers,
            };
            bucket.push(record);
        }
        partition
    }
}

/// The amounts derived from a round's losing-believer stakes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolBreakdown {
    pub losing_believers_pool: Decimal,
    pub treasury_fee: Decimal,
    pub reward_pool: Decimal,
    pub challenger_bonus: Decimal,
    pub believer_reward_pool: Decimal,
}

impl PoolBreakdown {
    pub fn compute(
        funding: &[FundingRecord],
        winning_idea_id: &str,
        rates: &SettlementRates,
    ) -> CoreResult<Self> {
        Self::from_partition(&FundingPartition::new(funding, winning_idea_id), rates)
    }

    pub fn from_partition(partition: &FundingPartition<'_>, rates: &SettlementRates) -> CoreResult<Self> {
        let losing_believers_pool = total_stake(&partition.loser_believers)?;
        Self::from_pool(losing_believers_pool, rates)
    }

    pub fn from_pool(losing_believers_pool: Decimal, rates: &SettlementRates) -> CoreResult<Self> {
        let treasury_fee = losing_believers_pool
            .checked_mul(rates.treasury_fee)
            .ok_or_else(|| CoreError::overflow("treasury fee"))?;
        let reward_pool = losing_believers_pool - treasury_fee;
        let challenger_bonus = reward_pool
            .checked_mul(rates.challenger_bonus)
            .ok_or_else(|| CoreError::overflow("challenger bonus"))?;
        let believer_reward_pool = reward_pool - challenger_bonus;

        Ok(Self {
            losing_believers_pool,
            treasury_fee,
            reward_pool,
            challenger_bonus,
            believer_reward_pool,
        })
    }
}

/// One proportional share owed to a funder for one funding record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payout {
    pub funder: String,
    pub direction: Direction,
    pub stake: Decimal,
    pub amount: Decimal,
}

/// Add `amount` to a running total, failing instead of panicking past
/// `Decimal::MAX`
pub fn credit(total: &mut Decimal, amount: Decimal, what: &str) -> CoreResult<()> {
    *total = total
        .checked_add(amount)
        .ok_or_else(|| CoreError::overflow(what))?;
    Ok(())
}

pub fn total_stake(records: &[&FundingRecord]) -> CoreResult<Decimal> {
    records.iter().try_fold(Decimal::ZERO, |total, record| {
        total
            .checked_add(record.amount)
            .ok_or_else(|| CoreError::overflow("stake total"))
    })
}

/// `amount / total * pool`. Multiplies first to keep precision and divides
/// first when the product would not fit.
fn share_of(amount: Decimal, total: Decimal, pool: Decimal) -> CoreResult<Decimal> {
    if let Some(share) = amount.checked_mul(pool).and_then(|p| p.checked_div(total)) {
        return Ok(share);
    }
    amount
        .checked_div(total)
        .and_then(|ratio| ratio.checked_mul(pool))
        .ok_or_else(|| CoreError::overflow("payout share"))
}

/// Share `pool` across `stakes` in proportion to each record's amount.
///
/// Records are not merged by funder: a funder with two records receives two
/// payouts. A zero stake total yields no payouts.
pub fn distribute(stakes: &[&FundingRecord], pool: Decimal) -> CoreResult<Vec<Payout>> {
    let total = total_stake(stakes)?;
    if total.is_zero() {
        return Ok(Vec::new());
    }

    stakes
        .iter()
        .map(|record| {
            Ok(Payout {
                funder: record.funder.clone(),
                direction: record.direction,
                stake: record.amount,
                amount: share_of(record.amount, total, pool)?,
            })
        })
        .collect()
}

/// Everything settlement needs to write back, computed without side effects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementPlan {
    pub breakdown: PoolBreakdown,
    pub believer_payouts: Vec<Payout>,
    pub challenger_payouts: Vec<Payout>,
}

impl SettlementPlan {
    pub fn payouts(&self) -> impl Iterator<Item = &Payout> {
        self.believer_payouts.iter().chain(self.challenger_payouts.iter())
    }

    pub fn total_paid(&self) -> Decimal {
        self.payouts().map(|p| p.amount).sum()
    }
}

pub fn plan_settlement(
    funding: &[FundingRecord],
    winning_idea_id: &str,
    rates: &SettlementRates,
) -> CoreResult<SettlementPlan> {
    let partition = FundingPartition::new(funding, winning_idea_id);
    let breakdown = PoolBreakdown::from_partition(&partition, rates)?;

    Ok(SettlementPlan {
        believer_payouts: distribute(&partition.winner_believers, breakdown.believer_reward_pool)?,
        challenger_payouts: distribute(&partition.winner_challengers, breakdown.challenger_bonus)?,
        breakdown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fund(idea: &str, funder: &str, amount: Decimal, direction: Direction) -> FundingRecord {
        FundingRecord {
            id: format!("{}-{}-{}", idea, funder, amount),
            round_id: "R1".to_string(),
            idea_id: idea.to_string(),
            funder: funder.to_string(),
            amount,
            direction,
            created_at: 0,
        }
    }

    /// I1 wins. I2 loses with 100 believed by A. B and C believe I1 with
    /// 60 and 40, D challenges I1 with 20.
    fn example_round() -> Vec<FundingRecord> {
        vec![
            fund("I2", "A", dec!(100), Direction::Believe),
            fund("I1", "B", dec!(60), Direction::Believe),
            fund("I1", "C", dec!(40), Direction::Believe),
            fund("I1", "D", dec!(20), Direction::Challenge),
        ]
    }

    fn payout_for<'a>(payouts: &'a [Payout], funder: &str) -> Vec<&'a Payout> {
        payouts.iter().filter(|p| p.funder == funder).collect()
    }

    fn assert_close(a: Decimal, b: Decimal) {
        assert!((a - b).abs() < dec!(0.000000001), "{} != {}", a, b);
    }

    #[test]
    fn test_example_round_breakdown() {
        let breakdown = PoolBreakdown::compute(&example_round(), "I1", &SettlementRates::default()).unwrap();

        assert_eq!(breakdown.losing_believers_pool, dec!(100));
        assert_eq!(breakdown.treasury_fee, dec!(10));
        assert_eq!(breakdown.reward_pool, dec!(90));
        assert_eq!(breakdown.challenger_bonus, dec!(9));
        assert_eq!(breakdown.believer_reward_pool, dec!(81));
    }

    #[test]
    fn test_example_round_payouts() {
        let plan = plan_settlement(&example_round(), "I1", &SettlementRates::default()).unwrap();

        assert_eq!(payout_for(&plan.believer_payouts, "B")[0].amount, dec!(48.6));
        assert_eq!(payout_for(&plan.believer_payouts, "C")[0].amount, dec!(32.4));
        assert_eq!(payout_for(&plan.challenger_payouts, "D")[0].amount, dec!(9));
        assert!(payout_for(&plan.believer_payouts, "A").is_empty());
        assert_eq!(plan.total_paid(), dec!(90));
    }

    #[test]
    fn test_losing_challenges_stay_out_of_pool() {
        let mut funding = example_round();
        funding.push(fund("I2", "E", dec!(500), Direction::Challenge));
        funding.push(fund("I3", "F", dec!(25), Direction::Believe));

        let breakdown = PoolBreakdown::compute(&funding, "I1", &SettlementRates::default()).unwrap();
        assert_eq!(breakdown.losing_believers_pool, dec!(125));
    }

    #[test]
    fn test_pool_identities_hold() {
        let rates = SettlementRates::default();
        for pool in [dec!(0), dec!(1), dec!(3.33), dec!(77.7777), dec!(1000000.01)] {
            let b = PoolBreakdown::from_pool(pool, &rates).unwrap();
            assert_eq!(b.treasury_fee + b.reward_pool, b.losing_believers_pool);
            assert_eq!(b.challenger_bonus + b.believer_reward_pool, b.reward_pool);
        }
    }

    #[test]
    fn test_empty_loser_pool_pays_nothing() {
        let funding = vec![
            fund("I1", "B", dec!(60), Direction::Believe),
            fund("I1", "D", dec!(20), Direction::Challenge),
        ];
        let plan = plan_settlement(&funding, "I1", &SettlementRates::default()).unwrap();

        assert_eq!(plan.breakdown, PoolBreakdown::default());
        assert!(plan.payouts().all(|p| p.amount.is_zero()));
    }

    #[test]
    fn test_no_winning_believers_skips_distribution() {
        let funding = vec![
            fund("I2", "A", dec!(100), Direction::Believe),
            fund("I1", "D", dec!(20), Direction::Challenge),
        ];
        let plan = plan_settlement(&funding, "I1", &SettlementRates::default()).unwrap();

        assert!(plan.believer_payouts.is_empty());
        assert_eq!(plan.challenger_payouts.len(), 1);
        assert_eq!(plan.challenger_payouts[0].amount, dec!(9));
    }

    #[test]
    fn test_zero_amount_stakes_do_not_divide_by_zero() {
        let stakes = [fund("I1", "B", dec!(0), Direction::Believe)];
        let refs: Vec<&FundingRecord> = stakes.iter().collect();
        assert!(distribute(&refs, dec!(81)).unwrap().is_empty());
    }

    #[test]
    fn test_funder_with_multiple_records_gets_multiple_payouts() {
        let funding = vec![
            fund("I2", "A", dec!(100), Direction::Believe),
            fund("I1", "B", dec!(30), Direction::Believe),
            fund("I1", "B", dec!(30), Direction::Believe),
            fund("I1", "C", dec!(40), Direction::Believe),
        ];
        let plan = plan_settlement(&funding, "I1", &SettlementRates::default()).unwrap();

        let b_payouts = payout_for(&plan.believer_payouts, "B");
        assert_eq!(b_payouts.len(), 2);
        let b_total: Decimal = b_payouts.iter().map(|p| p.amount).sum();
        assert_eq!(b_total, dec!(48.6));
    }

    #[test]
    fn test_believer_shares_sum_to_pool_with_uneven_split() {
        let funding = vec![
            fund("I2", "A", dec!(100), Direction::Believe),
            fund("I1", "B", dec!(1), Direction::Believe),
            fund("I1", "C", dec!(2), Direction::Believe),
            fund("I1", "E", dec!(4), Direction::Believe),
        ];
        let plan = plan_settlement(&funding, "I1", &SettlementRates::default()).unwrap();

        let sum: Decimal = plan.believer_payouts.iter().map(|p| p.amount).sum();
        assert_close(sum, plan.breakdown.believer_reward_pool);
    }

    #[test]
    fn test_large_stakes_settle_without_overflow() {
        let funding = vec![
            fund("I2", "A", dec!(100000000000000000000), Direction::Believe),
            fund("I1", "B", dec!(100000000000000000000), Direction::Believe),
            fund("I1", "C", dec!(300000000000000000000), Direction::Believe),
        ];
        let plan = plan_settlement(&funding, "I1", &SettlementRates::default()).unwrap();

        assert_eq!(plan.breakdown.believer_reward_pool, dec!(81000000000000000000));
        assert_eq!(payout_for(&plan.believer_payouts, "B")[0].amount, dec!(20250000000000000000));
        assert_eq!(payout_for(&plan.believer_payouts, "C")[0].amount, dec!(60750000000000000000));
    }

    #[test]
    fn test_stake_total_past_max_is_an_error() {
        let funding = vec![
            fund("I2", "A", Decimal::MAX, Direction::Believe),
            fund("I2", "E", Decimal::MAX, Direction::Believe),
            fund("I1", "B", dec!(1), Direction::Believe),
        ];
        let result = plan_settlement(&funding, "I1", &SettlementRates::default());
        assert!(matches!(result, Err(CoreError::Overflow(_))));
    }

    #[test]
    fn test_credit_leaves_total_untouched_on_overflow() {
        let mut total = Decimal::MAX;
        assert!(credit(&mut total, dec!(1), "treasury").is_err());
        assert_eq!(total, Decimal::MAX);

        let mut total = dec!(1.5);
        credit(&mut total, dec!(2.25), "treasury").unwrap();
        assert_eq!(total, dec!(3.75));
    }

    #[test]
    fn test_rates_from_bps() {
        let rates = SettlementRates::from_bps(1000, 1000).unwrap();
        assert_eq!(rates, SettlementRates::default());

        let rates = SettlementRates::from_bps(250, 0).unwrap();
        let b = PoolBreakdown::from_pool(dec!(200), &rates).unwrap();
        assert_eq!(b.treasury_fee, dec!(5));
        assert_eq!(b.challenger_bonus, dec!(0));
        assert_eq!(b.believer_reward_pool, dec!(195));

        assert!(SettlementRates::from_bps(10_001, 0).is_err());
    }
}
