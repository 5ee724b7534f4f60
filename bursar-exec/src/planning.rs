//! Distribution planning from holder snapshots.
//!
//! Turns a point-in-time holder snapshot into a recipient list for a
//! proportional distribution. The sum of all allocations is always exactly
//! the requested total: every share but the last is truncated at the
//! planning scale, and the last recipient receives the exact remainder.

use bursar_domain::{Address, Amount, HolderSnapshot};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{ExecError, ExecResult};

/// Default number of decimal places allocations are planned at.
pub const DEFAULT_PLAN_SCALE: u32 = 9;

/// One planned transfer within a distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipient {
    /// Destination account
    pub address: Address,
    /// Amount to transfer
    pub amount: Amount,
}

/// Plan a proportional distribution of `total` across the holders of a
/// snapshot.
///
/// Each holder's allocation is `total * (balance / total_held)`, truncated
/// (`RoundingStrategy::ToZero`) at `scale` decimal places — except the last
/// holder, who receives the exact remainder `total - sum(previous shares)`.
/// Truncation keeps every intermediate share at or below its exact value,
/// so the remainder is always at least the last holder's exact share and
/// the allocations sum to `total` with no rounding loss.
///
/// Holders whose truncated share is zero are omitted; their dust flows into
/// the remainder.
///
/// # Errors
/// Returns `ExecError::EmptySnapshot` if the snapshot has no holders with a
/// positive balance. The error is raised here so an unplannable snapshot
/// never reaches the distribution engine.
pub fn plan_proportional(
    snapshot: &HolderSnapshot,
    total: Amount,
    scale: u32,
) -> ExecResult<Vec<Recipient>> {
    let holders: Vec<(&Address, Decimal)> = snapshot
        .holders
        .iter()
        .filter(|h| h.balance > Decimal::ZERO)
        .map(|h| (&h.address, h.balance))
        .collect();

    if holders.is_empty() {
        return Err(ExecError::EmptySnapshot(snapshot.asset_id.to_string()));
    }

    let total = total.as_decimal();
    let total_held: Decimal = holders.iter().map(|(_, balance)| *balance).sum();

    let mut recipients = Vec::with_capacity(holders.len());
    let mut allocated = Decimal::ZERO;

    for (address, balance) in &holders[..holders.len() - 1] {
        let share = (total * *balance / total_held)
            .round_dp_with_strategy(scale, RoundingStrategy::ToZero);
        if share > Decimal::ZERO {
            allocated += share;
            recipients.push(Recipient {
                address: (*address).clone(),
                amount: Amount::new(share)?,
            });
        }
    }

    let (last_address, _) = holders[holders.len() - 1];
    let remainder = total - allocated;
    recipients.push(Recipient {
        address: last_address.clone(),
        amount: Amount::new(remainder)?,
    });

    Ok(recipients)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bursar_domain::AssetId;
    use rust_decimal_macros::dec;

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    fn snapshot(balances: Vec<(&str, Decimal)>) -> HolderSnapshot {
        HolderSnapshot::from_balances(
            AssetId::new("MINT1").unwrap(),
            balances
                .into_iter()
                .map(|(a, b)| (addr(a), b))
                .collect(),
        )
    }

    #[test]
    fn test_plan_exact_split() {
        let snapshot = snapshot(vec![("A1", dec!(70)), ("B2", dec!(20)), ("C3", dec!(10))]);
        let plan = plan_proportional(&snapshot, Amount::new(dec!(100)).unwrap(), DEFAULT_PLAN_SCALE)
            .unwrap();

        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0].amount.as_decimal(), dec!(70));
        assert_eq!(plan[1].amount.as_decimal(), dec!(20));
        assert_eq!(plan[2].amount.as_decimal(), dec!(10));

        let sum: Decimal = plan.iter().map(|r| r.amount.as_decimal()).sum();
        assert_eq!(sum, dec!(100));
    }

    #[test]
    fn test_plan_remainder_goes_to_last() {
        // Three equal holders cannot split 100 evenly at any finite scale.
        let snapshot = snapshot(vec![("A1", dec!(1)), ("B2", dec!(1)), ("C3", dec!(1))]);
        let plan =
            plan_proportional(&snapshot, Amount::new(dec!(100)).unwrap(), 9).unwrap();

        assert_eq!(plan[0].amount.as_decimal(), dec!(33.333333333));
        assert_eq!(plan[1].amount.as_decimal(), dec!(33.333333333));
        assert_eq!(plan[2].amount.as_decimal(), dec!(33.333333334));

        let sum: Decimal = plan.iter().map(|r| r.amount.as_decimal()).sum();
        assert_eq!(sum, dec!(100));
    }

    #[test]
    fn test_plan_sum_is_exact_at_coarse_scale() {
        let snapshot = snapshot(vec![
            ("A1", dec!(3)),
            ("B2", dec!(5)),
            ("C3", dec!(7)),
            ("D4", dec!(11)),
        ]);
        let plan = plan_proportional(&snapshot, Amount::new(dec!(1)).unwrap(), 2).unwrap();

        let sum: Decimal = plan.iter().map(|r| r.amount.as_decimal()).sum();
        assert_eq!(sum, dec!(1));
        for recipient in &plan {
            assert!(recipient.amount.as_decimal() > Decimal::ZERO);
        }
    }

    #[test]
    fn test_plan_omits_dust_holders() {
        // At scale 2, the middle holder's share of 0.01 * tiny truncates to 0.
        let snapshot = snapshot(vec![
            ("A1", dec!(1000000)),
            ("B2", dec!(1)),
            ("C3", dec!(1000000)),
        ]);
        let plan = plan_proportional(&snapshot, Amount::new(dec!(1)).unwrap(), 2).unwrap();

        // B2's truncated share is zero, so it is omitted.
        assert_eq!(plan.len(), 2);
        assert!(plan.iter().all(|r| r.address != addr("B2")));

        let sum: Decimal = plan.iter().map(|r| r.amount.as_decimal()).sum();
        assert_eq!(sum, dec!(1));
    }

    #[test]
    fn test_plan_single_holder_gets_total() {
        let snapshot = snapshot(vec![("A1", dec!(42))]);
        let plan =
            plan_proportional(&snapshot, Amount::new(dec!(500)).unwrap(), DEFAULT_PLAN_SCALE)
                .unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].amount.as_decimal(), dec!(500));
    }

    #[test]
    fn test_plan_empty_snapshot_rejected() {
        let snapshot = snapshot(vec![]);
        let result =
            plan_proportional(&snapshot, Amount::new(dec!(100)).unwrap(), DEFAULT_PLAN_SCALE);
        assert!(matches!(result, Err(ExecError::EmptySnapshot(_))));
    }
}
