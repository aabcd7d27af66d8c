//! After-sales cases (SAV)

use auth::ResourceOwners;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::value_object::ids::{CaseId, MessageId, OrderId, UserId};
use crate::error::{MarketError, MarketResult};

coded_enum! {
    CaseStatus {
        Open => "OPEN",
        Resolved => "RESOLVED",
    }
}

#[derive(Debug, Clone)]
pub struct Case {
    pub id: CaseId,
    pub order_id: OrderId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub reason: String,
    pub status: CaseStatus,
    pub resolution: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewCase {
    pub order_id: OrderId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub reason: String,
}

impl Case {
    pub fn owners(&self) -> ResourceOwners {
        ResourceOwners::trade(self.buyer_id, self.seller_id)
    }

    pub fn ensure_open(&self) -> MarketResult<()> {
        if self.status != CaseStatus::Open {
            return Err(MarketError::conflict("Case is already resolved"));
        }
        Ok(())
    }

    pub fn resolve(&mut self, resolution: String) -> MarketResult<CaseStatus> {
        self.ensure_open()?;
        let previous = self.status;
        self.status = CaseStatus::Resolved;
        self.resolution = Some(resolution);
        self.resolved_at = Some(Utc::now());
        Ok(previous)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseMessage {
    pub id: MessageId,
    pub case_id: CaseId,
    pub author_id: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCaseMessage {
    pub case_id: CaseId,
    pub author_id: UserId,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_once() {
        let mut case = Case {
            id: CaseId::from_db(1),
            order_id: OrderId::from_db(1),
            buyer_id: UserId::from_db(1),
            seller_id: UserId::from_db(2),
            reason: "Item arrived broken".into(),
            status: CaseStatus::Open,
            resolution: None,
            created_at: Utc::now(),
            resolved_at: None,
        };
        case.resolve("Partial refund".into()).unwrap();
        assert_eq!(case.status, CaseStatus::Resolved);
        assert!(case.resolved_at.is_some());
        assert!(case.ensure_open().is_err());
        assert!(case.resolve("again".into()).is_err());
    }
}
