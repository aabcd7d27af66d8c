use auth::ResourceOwners;
use chrono::{DateTime, Utc};

use crate::domain::value_object::ids::{ListingId, OrderId, UserId};
use crate::domain::value_object::money::Cents;
use crate::error::{MarketError, MarketResult};

coded_enum! {
    OrderStatus {
        Placed => "PLACED",
        Shipped => "SHIPPED",
        Completed => "COMPLETED",
        Cancelled => "CANCELLED",
        Refunded => "REFUNDED",
    }
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub listing_id: ListingId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub amount: Cents,
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub listing_id: ListingId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub amount: Cents,
}

impl Order {
    pub fn owners(&self) -> ResourceOwners {
        ResourceOwners::trade(self.buyer_id, self.seller_id)
    }

    /// The party that is not `user_id`
    pub fn counterpart(&self, user_id: UserId) -> UserId {
        if user_id == self.buyer_id {
            self.seller_id
        } else {
            self.buyer_id
        }
    }

    /// After-sales cases need the goods to have left the seller
    pub fn allows_case(&self) -> bool {
        matches!(self.status, OrderStatus::Shipped | OrderStatus::Completed)
    }

    fn transition(&mut self, allowed_from: &[OrderStatus], to: OrderStatus) -> MarketResult<OrderStatus> {
        let previous = self.status;
        if !allowed_from.contains(&previous) {
            return Err(MarketError::conflict(format!(
                "Order cannot move from {previous} to {to}"
            )));
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(previous)
    }

    pub fn ship(&mut self, tracking_number: Option<String>) -> MarketResult<OrderStatus> {
        let previous = self.transition(&[OrderStatus::Placed], OrderStatus::Shipped)?;
        self.tracking_number = tracking_number;
        Ok(previous)
    }

    pub fn confirm_receipt(&mut self) -> MarketResult<OrderStatus> {
        self.transition(&[OrderStatus::Shipped], OrderStatus::Completed)
    }

    pub fn cancel(&mut self) -> MarketResult<OrderStatus> {
        self.transition(&[OrderStatus::Placed], OrderStatus::Cancelled)
    }

    pub fn refund(&mut self) -> MarketResult<OrderStatus> {
        self.transition(
            &[OrderStatus::Placed, OrderStatus::Shipped, OrderStatus::Completed],
            OrderStatus::Refunded,
        )
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn order(id: i64, buyer: i64, seller: i64, status: OrderStatus) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::from_db(id),
            listing_id: ListingId::from_db(1),
            buyer_id: UserId::from_db(buyer),
            seller_id: UserId::from_db(seller),
            amount: Cents::from_db(15_000),
            status,
            tracking_number: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::order;
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut o = order(1, 10, 20, OrderStatus::Placed);
        assert_eq!(o.ship(Some("LP123".into())).unwrap(), OrderStatus::Placed);
        assert_eq!(o.tracking_number.as_deref(), Some("LP123"));
        assert!(o.allows_case());
        assert_eq!(o.confirm_receipt().unwrap(), OrderStatus::Shipped);
        assert_eq!(o.status, OrderStatus::Completed);
    }

    #[test]
    fn test_cancel_only_when_placed() {
        assert!(order(1, 10, 20, OrderStatus::Placed).cancel().is_ok());
        for status in [OrderStatus::Shipped, OrderStatus::Completed, OrderStatus::Refunded] {
            let mut o = order(1, 10, 20, status);
            assert!(matches!(o.cancel(), Err(MarketError::Conflict(_))));
            assert_eq!(o.status, status);
        }
    }

    #[test]
    fn test_refund_rules() {
        assert!(order(1, 10, 20, OrderStatus::Completed).refund().is_ok());
        assert!(order(1, 10, 20, OrderStatus::Cancelled).refund().is_err());
        assert!(order(1, 10, 20, OrderStatus::Refunded).refund().is_err());
    }

    #[test]
    fn test_counterpart() {
        let o = order(1, 10, 20, OrderStatus::Placed);
        assert_eq!(o.counterpart(UserId::from_db(10)), UserId::from_db(20));
        assert_eq!(o.counterpart(UserId::from_db(20)), UserId::from_db(10));
    }
}
