use auth::ResourceOwners;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::value_object::ids::{OrderId, ReviewId, UserId};
use crate::error::{MarketError, MarketResult};

/// Star rating, 1 to 5
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: i64) -> MarketResult<Self> {
        match u8::try_from(value) {
            Ok(v @ 1..=5) => Ok(Self(v)),
            _ => Err(MarketError::bad_input("Rating must be between 1 and 5")),
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct Review {
    pub id: ReviewId,
    pub order_id: OrderId,
    pub author_id: UserId,
    pub seller_id: UserId,
    pub rating: Rating,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub order_id: OrderId,
    pub author_id: UserId,
    pub seller_id: UserId,
    pub rating: Rating,
    pub comment: Option<String>,
}

impl Review {
    pub fn owners(&self) -> ResourceOwners {
        ResourceOwners::owned_by(self.author_id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub count: i64,
    pub average: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        assert!(Rating::new(-1).is_err());
        assert!(Rating::new(300).is_err());
        assert_eq!(Rating::new(5).unwrap().get(), 5);
    }
}
