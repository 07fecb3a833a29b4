use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::contribution::{Contribution, ContributionStatus};
use crate::models::expense::Expense;

/// Derived, per-event funding statistics. Never persisted; recomputed from
/// ledger rows on every read. All sums are fixed-point integer cents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStats {
    pub total_collected_cents: i64,
    pub total_expenses_cents: i64,
    pub contributors_count: u64,
    pub pending_requests: u64,
    pub remaining_funds_cents: i64,
}

pub fn compute(contributions: &[Contribution], expenses: &[Expense]) -> EventStats {
    let mut total_collected_cents = 0i64;
    let mut pending_requests = 0u64;
    let mut approved_contributors = HashSet::new();

    for contribution in contributions {
        match ContributionStatus::from_i16(contribution.status) {
            Some(ContributionStatus::Approved) => {
                total_collected_cents += contribution.amount_cents;
                approved_contributors.insert(contribution.contributor_contact.as_str());
            }
            Some(ContributionStatus::Pending) => pending_requests += 1,
            Some(ContributionStatus::Rejected) => (),
            None => {
                log::error!(
                    "Contribution {} has unknown status {}; excluded from stats",
                    contribution.id,
                    contribution.status
                );
            }
        }
    }

    let total_expenses_cents = expenses.iter().map(|e| e.amount_cents).sum();

    EventStats {
        total_collected_cents,
        total_expenses_cents,
        contributors_count: approved_contributors.len() as u64,
        pending_requests,
        // May go negative when spending outruns collection; not clamped
        remaining_funds_cents: total_collected_cents - total_expenses_cents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::Rng;
    use std::time::SystemTime;
    use uuid::Uuid;

    use crate::threadrand::SecureRng;

    fn contribution(contact: &str, amount_cents: i64, status: ContributionStatus) -> Contribution {
        Contribution {
            id: Uuid::now_v7(),
            event_id: Uuid::now_v7(),
            contributor_name: String::from("Contributor"),
            contributor_contact: String::from(contact),
            amount_cents,
            status: status.as_i16(),
            approved_by: None,
            rejection_reason: None,
            created_timestamp: SystemTime::now(),
        }
    }

    fn expense(amount_cents: i64) -> Expense {
        Expense {
            id: Uuid::now_v7(),
            event_id: Uuid::now_v7(),
            description: String::from("Venue deposit"),
            category: String::from("venue"),
            amount_cents,
            added_by: Uuid::now_v7(),
            expense_date: SystemTime::now(),
            receipt_url: None,
            created_timestamp: SystemTime::now(),
        }
    }

    #[test]
    fn test_empty_ledger() {
        let stats = compute(&[], &[]);

        assert_eq!(stats.total_collected_cents, 0);
        assert_eq!(stats.total_expenses_cents, 0);
        assert_eq!(stats.contributors_count, 0);
        assert_eq!(stats.pending_requests, 0);
        assert_eq!(stats.remaining_funds_cents, 0);
    }

    #[test]
    fn test_only_approved_contributions_are_collected() {
        let contributions = vec![
            contribution("a@test.com", 600_00, ContributionStatus::Approved),
            contribution("b@test.com", 250_00, ContributionStatus::Pending),
            contribution("c@test.com", 100_00, ContributionStatus::Rejected),
        ];

        let stats = compute(&contributions, &[]);

        assert_eq!(stats.total_collected_cents, 600_00);
        assert_eq!(stats.contributors_count, 1);
        assert_eq!(stats.pending_requests, 1);
    }

    #[test]
    fn test_contributors_deduplicated_by_contact() {
        let contributions = vec![
            contribution("a@test.com", 10_00, ContributionStatus::Approved),
            contribution("a@test.com", 20_00, ContributionStatus::Approved),
            contribution("b@test.com", 30_00, ContributionStatus::Approved),
        ];

        let stats = compute(&contributions, &[]);

        assert_eq!(stats.total_collected_cents, 60_00);
        assert_eq!(stats.contributors_count, 2);
    }

    #[test]
    fn test_remaining_funds_may_go_negative() {
        let contributions = vec![contribution("a@test.com", 50_00, ContributionStatus::Approved)];
        let expenses = vec![expense(80_00)];

        let stats = compute(&contributions, &expenses);

        assert_eq!(stats.remaining_funds_cents, -30_00);
    }

    #[test]
    fn test_funding_scenario() {
        // Pledge of $600 gets approved, then a $200 expense is logged
        let contributions = vec![contribution(
            "a@test.com",
            600_00,
            ContributionStatus::Approved,
        )];
        let expenses = vec![expense(200_00)];

        let stats = compute(&contributions, &expenses);

        assert_eq!(stats.total_collected_cents, 600_00);
        assert_eq!(stats.pending_requests, 0);
        assert_eq!(stats.total_expenses_cents, 200_00);
        assert_eq!(stats.remaining_funds_cents, 400_00);
    }

    #[test]
    fn test_collected_total_is_exact_over_random_sequences() {
        for _ in 0..50 {
            let count = SecureRng.gen_range(1..200);
            let mut expected_total = 0i64;
            let mut contributions = Vec::with_capacity(count);

            for i in 0..count {
                let amount_cents = SecureRng.gen_range(1..10_000_00);
                let status = match SecureRng.gen_range(0..3) {
                    0 => ContributionStatus::Pending,
                    1 => ContributionStatus::Approved,
                    _ => ContributionStatus::Rejected,
                };

                if status == ContributionStatus::Approved {
                    expected_total += amount_cents;
                }

                contributions.push(contribution(
                    &format!("contributor{i}@test.com"),
                    amount_cents,
                    status,
                ));
            }

            let stats = compute(&contributions, &[]);
            assert_eq!(stats.total_collected_cents, expected_total);
        }
    }
}
