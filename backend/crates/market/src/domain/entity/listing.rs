use auth::ResourceOwners;
use chrono::{DateTime, Utc};

use crate::domain::value_object::ids::{ListingId, UserId};
use crate::domain::value_object::money::Cents;
use crate::error::{MarketError, MarketResult};

coded_enum! {
    ListingStatus {
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
        Sold => "SOLD",
    }
}

#[derive(Debug, Clone)]
pub struct Listing {
    pub id: ListingId,
    pub seller_id: UserId,
    pub title: String,
    pub description: String,
    pub price: Cents,
    pub status: ListingStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewListing {
    pub seller_id: UserId,
    pub title: String,
    pub description: String,
    pub price: Cents,
}

/// Validated edit
#[derive(Debug, Clone)]
pub struct ListingChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Cents>,
}

impl Listing {
    pub fn owners(&self) -> ResourceOwners {
        ResourceOwners::seller(self.seller_id)
    }

    /// Visible to everyone
    pub fn is_public(&self) -> bool {
        self.status == ListingStatus::Approved
    }

    /// Any edit sends the listing back to moderation
    pub fn apply(&mut self, changes: ListingChanges) -> MarketResult<ListingStatus> {
        let previous = self.status;
        if previous == ListingStatus::Sold {
            return Err(MarketError::conflict("A sold listing cannot be edited"));
        }
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(price) = changes.price {
            self.price = price;
        }
        self.status = ListingStatus::Pending;
        self.rejection_reason = None;
        self.updated_at = Utc::now();
        Ok(previous)
    }

    pub fn approve(&mut self) -> MarketResult<ListingStatus> {
        let previous = self.status;
        if previous != ListingStatus::Pending {
            return Err(MarketError::conflict(format!(
                "Only pending listings can be approved (listing is {previous})"
            )));
        }
        self.status = ListingStatus::Approved;
        self.rejection_reason = None;
        self.updated_at = Utc::now();
        Ok(previous)
    }

    pub fn reject(&mut self, reason: String) -> MarketResult<ListingStatus> {
        let previous = self.status;
        if !matches!(previous, ListingStatus::Pending | ListingStatus::Approved) {
            return Err(MarketError::conflict(format!(
                "Listing cannot be rejected while {previous}"
            )));
        }
        self.status = ListingStatus::Rejected;
        self.rejection_reason = Some(reason);
        self.updated_at = Utc::now();
        Ok(previous)
    }

    pub fn ensure_deletable(&self) -> MarketResult<()> {
        if self.status == ListingStatus::Sold {
            return Err(MarketError::conflict("A sold listing cannot be deleted"));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn listing(id: i64, seller: i64, status: ListingStatus) -> Listing {
        let now = Utc::now();
        Listing {
            id: ListingId::from_db(id),
            seller_id: UserId::from_db(seller),
            title: "Vintage bike".into(),
            description: String::new(),
            price: Cents::from_db(15_000),
            status,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::listing;
    use super::*;

    #[test]
    fn test_approve_only_pending() {
        let mut l = listing(1, 1, ListingStatus::Pending);
        assert_eq!(l.approve().unwrap(), ListingStatus::Pending);
        assert_eq!(l.status, ListingStatus::Approved);
        assert!(l.approve().is_err());
    }

    #[test]
    fn test_reject_sets_reason() {
        let mut l = listing(1, 1, ListingStatus::Approved);
        l.reject("Counterfeit".into()).unwrap();
        assert_eq!(l.status, ListingStatus::Rejected);
        assert_eq!(l.rejection_reason.as_deref(), Some("Counterfeit"));
        assert!(listing(1, 1, ListingStatus::Sold).reject("x".into()).is_err());
    }

    #[test]
    fn test_edit_returns_to_moderation() {
        let mut l = listing(1, 1, ListingStatus::Rejected);
        l.rejection_reason = Some("Blurry photos".into());
        l.apply(ListingChanges {
            title: Some("Vintage bike, new photos".into()),
            description: None,
            price: None,
        })
        .unwrap();
        assert_eq!(l.status, ListingStatus::Pending);
        assert_eq!(l.rejection_reason, None);
    }

    #[test]
    fn test_sold_is_frozen() {
        let mut l = listing(1, 1, ListingStatus::Sold);
        let changes = ListingChanges { title: None, description: None, price: None };
        assert!(l.apply(changes).is_err());
        assert!(l.ensure_deletable().is_err());
    }
}
