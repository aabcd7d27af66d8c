//! Marketplace orders
//!
//! Payment is out of scope: an order starts as `PLACED` and the listing is
//! marked sold in the same step.

use std::sync::Arc;

use auth::{Action, Session, authorize};
use kernel::pagination::Page;

use crate::application::guard::{notify, require_user};
use crate::domain::entity::listing::ListingStatus;
use crate::domain::entity::notification::NotificationKind;
use crate::domain::entity::order::{NewOrder, Order, OrderStatus};
use crate::domain::repository::MarketRepository;
use crate::domain::value_object::ids::{ListingId, OrderId};
use crate::error::{MarketError, MarketResult};

pub struct OrderService<R>
where
    R: MarketRepository,
{
    repo: Arc<R>,
}

impl<R> OrderService<R>
where
    R: MarketRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn place(&self, session: &Session, listing_id: ListingId) -> MarketResult<Order> {
        let buyer = authorize(session, Action::OrderPlace, None)?;
        let listing = self
            .repo
            .find_listing(listing_id)
            .await?
            .ok_or(MarketError::NotFound("Listing"))?;

        match listing.status {
            ListingStatus::Approved => {}
            ListingStatus::Sold => return Err(MarketError::conflict("Listing is already sold")),
            ListingStatus::Pending | ListingStatus::Rejected => {
                return Err(MarketError::NotFound("Listing"));
            }
        }
        if listing.seller_id == buyer.id {
            return Err(MarketError::bad_input("You cannot buy your own listing"));
        }

        let order = self
            .repo
            .place_order(&NewOrder {
                listing_id,
                buyer_id: buyer.id,
                seller_id: listing.seller_id,
                amount: listing.price,
            })
            .await?
            .ok_or_else(|| MarketError::conflict("Listing is no longer available"))?;

        tracing::info!(order_id = %order.id, listing_id = %listing_id, buyer_id = %buyer.id, "Order placed");
        notify(
            &*self.repo,
            order.seller_id,
            NotificationKind::OrderPlaced,
            format!("\"{}\" has been ordered", listing.title),
        )
        .await;
        Ok(order)
    }

    pub async fn list_mine(&self, session: &Session, page: Page) -> MarketResult<Vec<Order>> {
        let user = require_user(session)?;
        self.repo.list_orders_for_user(user.id, page).await
    }

    pub async fn get(&self, session: &Session, id: OrderId) -> MarketResult<Order> {
        require_user(session)?;
        let order = self.load(id).await?;
        authorize(session, Action::OrderView, Some(&order.owners()))?;
        Ok(order)
    }

    pub async fn ship(&self, session: &Session, id: OrderId, tracking_number: Option<String>) -> MarketResult<Order> {
        require_user(session)?;
        let mut order = self.load(id).await?;
        authorize(session, Action::OrderShip, Some(&order.owners()))?;

        let previous = order.ship(tracking_number)?;
        self.save(&order, previous).await?;

        tracing::info!(order_id = %id, "Order shipped");
        let message = match &order.tracking_number {
            Some(tracking) => format!("Order #{id} has shipped (tracking {tracking})"),
            None => format!("Order #{id} has shipped"),
        };
        notify(&*self.repo, order.buyer_id, NotificationKind::OrderShipped, message).await;
        Ok(order)
    }

    pub async fn confirm_receipt(&self, session: &Session, id: OrderId) -> MarketResult<Order> {
        require_user(session)?;
        let mut order = self.load(id).await?;
        authorize(session, Action::OrderConfirmReceipt, Some(&order.owners()))?;

        let previous = order.confirm_receipt()?;
        self.save(&order, previous).await?;

        tracing::info!(order_id = %id, "Order completed");
        notify(
            &*self.repo,
            order.seller_id,
            NotificationKind::OrderCompleted,
            format!("The buyer confirmed receipt of order #{id}"),
        )
        .await;
        Ok(order)
    }

    pub async fn cancel(&self, session: &Session, id: OrderId) -> MarketResult<Order> {
        let user_id = require_user(session)?.id;
        let mut order = self.load(id).await?;
        authorize(session, Action::OrderCancel, Some(&order.owners()))?;

        order.cancel()?;
        if !self.repo.cancel_order(&order).await? {
            return Err(MarketError::conflict("Order changed in the meantime, reload and retry"));
        }

        tracing::info!(order_id = %id, cancelled_by = %user_id, "Order cancelled");
        for recipient in [order.buyer_id, order.seller_id] {
            if recipient != user_id {
                notify(
                    &*self.repo,
                    recipient,
                    NotificationKind::OrderCancelled,
                    format!("Order #{id} was cancelled"),
                )
                .await;
            }
        }
        Ok(order)
    }

    pub async fn refund(&self, session: &Session, id: OrderId) -> MarketResult<Order> {
        let admin = authorize(session, Action::OrderRefund, None)?;
        let mut order = self.load(id).await?;

        let previous = order.refund()?;
        self.save(&order, previous).await?;

        tracing::info!(order_id = %id, admin_id = %admin.id, from = %previous, "Order refunded");
        for recipient in [order.buyer_id, order.seller_id] {
            notify(
                &*self.repo,
                recipient,
                NotificationKind::OrderRefunded,
                format!("Order #{id} was refunded"),
            )
            .await;
        }
        Ok(order)
    }

    async fn load(&self, id: OrderId) -> MarketResult<Order> {
        self.repo
            .find_order(id)
            .await?
            .ok_or(MarketError::NotFound("Order"))
    }

    async fn save(&self, order: &Order, previous: OrderStatus) -> MarketResult<()> {
        if self.repo.update_order(order, previous).await? {
            Ok(())
        } else {
            Err(MarketError::conflict("Order changed in the meantime, reload and retry"))
        }
    }
}
