//! Buyer reviews of sellers

use std::sync::Arc;

use auth::{Action, Session, authorize};
use kernel::pagination::Page;

use crate::application::guard::require_user;
use crate::domain::entity::order::OrderStatus;
use crate::domain::entity::review::{NewReview, Rating, RatingSummary, Review};
use crate::domain::repository::MarketRepository;
use crate::domain::value_object::ids::{OrderId, ReviewId, UserId};
use crate::error::{MarketError, MarketResult};

pub struct ReviewService<R>
where
    R: MarketRepository,
{
    repo: Arc<R>,
}

impl<R> ReviewService<R>
where
    R: MarketRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn create(
        &self,
        session: &Session,
        order_id: OrderId,
        rating: Rating,
        comment: Option<String>,
    ) -> MarketResult<Review> {
        require_user(session)?;
        let order = self
            .repo
            .find_order(order_id)
            .await?
            .ok_or(MarketError::NotFound("Order"))?;
        let author = authorize(session, Action::ReviewCreate, Some(&order.owners()))?;

        if order.status != OrderStatus::Completed {
            return Err(MarketError::conflict("Only completed orders can be reviewed"));
        }

        let review = self
            .repo
            .create_review(&NewReview {
                order_id,
                author_id: author.id,
                seller_id: order.seller_id,
                rating,
                comment,
            })
            .await?;

        tracing::info!(review_id = %review.id, seller_id = %review.seller_id, rating = rating.get(), "Review posted");
        Ok(review)
    }

    /// Public
    pub async fn list_for_seller(&self, seller_id: UserId, page: Page) -> MarketResult<(Vec<Review>, RatingSummary)> {
        let reviews = self.repo.list_reviews_for_seller(seller_id, page).await?;
        let summary = self.repo.rating_summary(seller_id).await?;
        Ok((reviews, summary))
    }

    pub async fn delete(&self, session: &Session, id: ReviewId) -> MarketResult<()> {
        require_user(session)?;
        let review = self
            .repo
            .find_review(id)
            .await?
            .ok_or(MarketError::NotFound("Review"))?;
        let user = authorize(session, Action::ReviewDelete, Some(&review.owners()))?;

        if !self.repo.delete_review(id).await? {
            return Err(MarketError::NotFound("Review"));
        }
        tracing::info!(review_id = %id, deleted_by = %user.id, "Review deleted");
        Ok(())
    }
}
