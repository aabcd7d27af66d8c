use auth::ResourceOwners;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::value_object::ids::{UserId, WithdrawalId};
use crate::domain::value_object::money::Cents;
use crate::error::{MarketError, MarketResult};

coded_enum! {
    WithdrawalStatus {
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
}

#[derive(Debug, Clone)]
pub struct Withdrawal {
    pub id: WithdrawalId,
    pub seller_id: UserId,
    pub amount: Cents,
    pub status: WithdrawalStatus,
    pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewWithdrawal {
    pub seller_id: UserId,
    pub amount: Cents,
}

impl Withdrawal {
    pub fn owners(&self) -> ResourceOwners {
        ResourceOwners::owned_by(self.seller_id)
    }

    /// Approve or reject a pending request
    pub fn process(&mut self, to: WithdrawalStatus, note: Option<String>) -> MarketResult<WithdrawalStatus> {
        let previous = self.status;
        if previous != WithdrawalStatus::Pending {
            return Err(MarketError::conflict(format!(
                "Withdrawal was already processed ({previous})"
            )));
        }
        if to == WithdrawalStatus::Pending {
            return Err(MarketError::bad_input("A withdrawal cannot be moved back to pending"));
        }
        self.status = to;
        self.admin_note = note;
        self.processed_at = Some(Utc::now());
        Ok(previous)
    }
}

/// Seller funds, in cents
///
/// `available = completed_revenue - committed`, where `committed` counts every
/// withdrawal that is not rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub completed_revenue_cents: i64,
    pub committed_cents: i64,
    pub available_cents: i64,
}

impl Balance {
    pub fn new(completed_revenue_cents: i64, committed_cents: i64) -> Self {
        Self {
            completed_revenue_cents,
            committed_cents,
            available_cents: completed_revenue_cents - committed_cents,
        }
    }

    pub fn covers(&self, amount: Cents) -> bool {
        amount.get() <= self.available_cents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> Withdrawal {
        Withdrawal {
            id: WithdrawalId::from_db(1),
            seller_id: UserId::from_db(2),
            amount: Cents::from_db(5_000),
            status: WithdrawalStatus::Pending,
            admin_note: None,
            created_at: Utc::now(),
            processed_at: None,
        }
    }

    #[test]
    fn test_process_once() {
        let mut w = pending();
        w.process(WithdrawalStatus::Rejected, Some("IBAN mismatch".into())).unwrap();
        assert_eq!(w.status, WithdrawalStatus::Rejected);
        assert!(w.processed_at.is_some());
        assert!(matches!(
            w.process(WithdrawalStatus::Approved, None),
            Err(MarketError::Conflict(_))
        ));
    }

    #[test]
    fn test_cannot_process_to_pending() {
        assert!(pending().process(WithdrawalStatus::Pending, None).is_err());
    }

    #[test]
    fn test_balance() {
        let balance = Balance::new(20_000, 7_500);
        assert_eq!(balance.available_cents, 12_500);
        assert!(balance.covers(Cents::from_db(12_500)));
        assert!(!balance.covers(Cents::from_db(12_501)));
    }
}
