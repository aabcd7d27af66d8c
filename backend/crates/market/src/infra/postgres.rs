//! PostgreSQL Repository Implementation
//!
//! Multi-row operations (placing and cancelling orders, requesting a
//! withdrawal) run in a transaction. Withdrawal requests take an advisory
//! lock on the seller so two concurrent requests cannot both pass the
//! balance check.

use chrono::{DateTime, Utc};
use kernel::pagination::Page;
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::entity::{
    case::{Case, CaseMessage, CaseStatus, NewCase, NewCaseMessage},
    conversation::{Conversation, Message, NewMessage},
    listing::{Listing, ListingStatus, NewListing},
    notification::{NewNotification, Notification, NotificationKind},
    order::{NewOrder, Order, OrderStatus},
    review::{NewReview, Rating, RatingSummary, Review},
    testimonial::{NewTestimonial, Testimonial, TestimonialStatus},
    withdrawal::{Balance, NewWithdrawal, Withdrawal, WithdrawalStatus},
};
use crate::domain::repository::{
    CaseRepository, ConversationRepository, ListingRepository, NotificationRepository,
    OrderRepository, ReviewRepository, TestimonialRepository, WithdrawalRepository,
};
use crate::domain::value_object::ids::{
    CaseId, ConversationId, ListingId, MessageId, NotificationId, OrderId, ReviewId,
    TestimonialId, UserId, WithdrawalId,
};
use crate::domain::value_object::money::Cents;
use crate::error::{MarketError, MarketResult};

const LISTING_COLUMNS: &str =
    "id, seller_id, title, description, price_cents, status, rejection_reason, created_at, updated_at";
const ORDER_COLUMNS: &str =
    "id, listing_id, buyer_id, seller_id, amount_cents, status, tracking_number, created_at, updated_at";
const CONVERSATION_COLUMNS: &str = "id, listing_id, buyer_id, seller_id, created_at, last_message_at";
const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, body, created_at";
const WITHDRAWAL_COLUMNS: &str =
    "id, seller_id, amount_cents, status, admin_note, created_at, processed_at";
const CASE_COLUMNS: &str =
    "id, order_id, buyer_id, seller_id, reason, status, resolution, created_at, resolved_at";
const CASE_MESSAGE_COLUMNS: &str = "id, case_id, author_id, body, created_at";
const REVIEW_COLUMNS: &str = "id, order_id, author_id, seller_id, rating, comment, created_at";
const TESTIMONIAL_COLUMNS: &str = "id, author_id, author_name, body, status, created_at";
const NOTIFICATION_COLUMNS: &str = "id, recipient_id, kind, message, read_at, created_at";

/// PostgreSQL-backed market repository
#[derive(Clone)]
pub struct PgMarketRepository {
    pool: PgPool,
}

impl PgMarketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> MarketResult<Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await?)
    }
}

fn decode<T>(table: &str, code: &str, parse: fn(&str) -> Option<T>) -> MarketResult<T> {
    parse(code).ok_or_else(|| MarketError::Internal(format!("Invalid status code in {table}: {code}")))
}

fn unique_violation(conflict: &'static str) -> impl FnOnce(sqlx::Error) -> MarketError {
    move |e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => MarketError::conflict(conflict),
        other => MarketError::Database(other),
    }
}

// ============================================================================
// Listings
// ============================================================================

impl ListingRepository for PgMarketRepository {
    async fn create_listing(&self, listing: &NewListing) -> MarketResult<Listing> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            r#"
            INSERT INTO listings (seller_id, title, description, price_cents, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING {LISTING_COLUMNS}
            "#
        ))
        .bind(listing.seller_id.get())
        .bind(&listing.title)
        .bind(&listing.description)
        .bind(listing.price.get())
        .bind(ListingStatus::Pending.code())
        .fetch_one(&self.pool)
        .await?;

        row.into_listing()
    }

    async fn find_listing(&self, id: ListingId) -> MarketResult<Option<Listing>> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ListingRow::into_listing).transpose()
    }

    async fn list_listings(&self, status: Option<ListingStatus>, page: Page) -> MarketResult<Vec<Listing>> {
        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            r#"
            SELECT {LISTING_COLUMNS} FROM listings
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY id DESC LIMIT $2 OFFSET $3
            "#
        ))
        .bind(status.map(|s| s.code()))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ListingRow::into_listing).collect()
    }

    async fn list_listings_by_seller(&self, seller_id: UserId, page: Page) -> MarketResult<Vec<Listing>> {
        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE seller_id = $1 ORDER BY id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(seller_id.get())
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ListingRow::into_listing).collect()
    }

    async fn update_listing(&self, listing: &Listing, expected: ListingStatus) -> MarketResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE listings SET
                title = $3,
                description = $4,
                price_cents = $5,
                status = $6,
                rejection_reason = $7,
                updated_at = $8
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(listing.id.get())
        .bind(expected.code())
        .bind(&listing.title)
        .bind(&listing.description)
        .bind(listing.price.get())
        .bind(listing.status.code())
        .bind(listing.rejection_reason.as_deref())
        .bind(listing.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_listing(&self, id: ListingId) -> MarketResult<bool> {
        let result = sqlx::query("DELETE FROM listings WHERE id = $1 AND status <> $2")
            .bind(id.get())
            .bind(ListingStatus::Sold.code())
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                // orders keep their listing row, even cancelled ones
                sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                    MarketError::conflict("A listing with order history cannot be deleted")
                }
                other => MarketError::Database(other),
            })?;

        Ok(result.rows_affected() == 1)
    }
}

// ============================================================================
// Orders
// ============================================================================

impl OrderRepository for PgMarketRepository {
    async fn place_order(&self, order: &NewOrder) -> MarketResult<Option<Order>> {
        let mut tx = self.begin().await?;

        let sold = sqlx::query(
            "UPDATE listings SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2",
        )
        .bind(order.listing_id.get())
        .bind(ListingStatus::Approved.code())
        .bind(ListingStatus::Sold.code())
        .execute(&mut *tx)
        .await?;

        if sold.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO orders (listing_id, buyer_id, seller_id, amount_cents, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order.listing_id.get())
        .bind(order.buyer_id.get())
        .bind(order.seller_id.get())
        .bind(order.amount.get())
        .bind(OrderStatus::Placed.code())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.into_order().map(Some)
    }

    async fn find_order(&self, id: OrderId) -> MarketResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;

        row.map(OrderRow::into_order).transpose()
    }

    async fn list_orders_for_user(&self, user_id: UserId, page: Page) -> MarketResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE buyer_id = $1 OR seller_id = $1
            ORDER BY id DESC LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id.get())
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(OrderRow::into_order).collect()
    }

    async fn update_order(&self, order: &Order, expected: OrderStatus) -> MarketResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET status = $3, tracking_number = $4, updated_at = $5
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(order.id.get())
        .bind(expected.code())
        .bind(order.status.code())
        .bind(order.tracking_number.as_deref())
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn cancel_order(&self, order: &Order) -> MarketResult<bool> {
        let mut tx = self.begin().await?;

        let cancelled = sqlx::query(
            "UPDATE orders SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2",
        )
        .bind(order.id.get())
        .bind(OrderStatus::Placed.code())
        .bind(OrderStatus::Cancelled.code())
        .execute(&mut *tx)
        .await?;

        if cancelled.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "UPDATE listings SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2",
        )
        .bind(order.listing_id.get())
        .bind(ListingStatus::Sold.code())
        .bind(ListingStatus::Approved.code())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

}

// ============================================================================
// Conversations
// ============================================================================

impl ConversationRepository for PgMarketRepository {
    async fn open_conversation(
        &self,
        listing_id: ListingId,
        buyer_id: UserId,
        seller_id: UserId,
    ) -> MarketResult<Conversation> {
        // The no-op update makes RETURNING yield the existing row on conflict
        let row = sqlx::query_as::<_, ConversationRow>(&format!(
            r#"
            INSERT INTO conversations (listing_id, buyer_id, seller_id, created_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (listing_id, buyer_id) DO UPDATE SET listing_id = EXCLUDED.listing_id
            RETURNING {CONVERSATION_COLUMNS}
            "#
        ))
        .bind(listing_id.get())
        .bind(buyer_id.get())
        .bind(seller_id.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_conversation())
    }

    async fn find_conversation(&self, id: ConversationId) -> MarketResult<Option<Conversation>> {
        let row = sqlx::query_as::<_, ConversationRow>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ConversationRow::into_conversation))
    }

    async fn list_conversations_for_user(&self, user_id: UserId, page: Page) -> MarketResult<Vec<Conversation>> {
        let rows = sqlx::query_as::<_, ConversationRow>(&format!(
            r#"
            SELECT {CONVERSATION_COLUMNS} FROM conversations
            WHERE buyer_id = $1 OR seller_id = $1
            ORDER BY COALESCE(last_message_at, created_at) DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id.get())
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ConversationRow::into_conversation).collect())
    }

    async fn list_conversations(&self, page: Page) -> MarketResult<Vec<Conversation>> {
        let rows = sqlx::query_as::<_, ConversationRow>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations ORDER BY id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ConversationRow::into_conversation).collect())
    }

    async fn add_message(&self, message: &NewMessage) -> MarketResult<Message> {
        let mut tx = self.begin().await?;

        let row = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            INSERT INTO messages (conversation_id, sender_id, body, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(message.conversation_id.get())
        .bind(message.sender_id.get())
        .bind(&message.body)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE conversations SET last_message_at = $2 WHERE id = $1")
            .bind(message.conversation_id.get())
            .bind(row.created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row.into_message())
    }

    async fn list_messages(&self, conversation_id: ConversationId) -> MarketResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = $1 ORDER BY id"
        ))
        .bind(conversation_id.get())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MessageRow::into_message).collect())
    }
}

// ============================================================================
// Withdrawals
// ============================================================================

impl PgMarketRepository {
    async fn balance_in<'e, E>(executor: E, seller_id: UserId) -> MarketResult<Balance>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let (revenue, committed): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COALESCE(SUM(amount_cents), 0)::BIGINT FROM orders
                    WHERE seller_id = $1 AND status = $2),
                (SELECT COALESCE(SUM(amount_cents), 0)::BIGINT FROM withdrawals
                    WHERE seller_id = $1 AND status <> $3)
            "#,
        )
        .bind(seller_id.get())
        .bind(OrderStatus::Completed.code())
        .bind(WithdrawalStatus::Rejected.code())
        .fetch_one(executor)
        .await?;

        Ok(Balance::new(revenue, committed))
    }
}

impl WithdrawalRepository for PgMarketRepository {
    async fn balance(&self, seller_id: UserId) -> MarketResult<Balance> {
        Self::balance_in(&self.pool, seller_id).await
    }

    async fn request_withdrawal(&self, withdrawal: &NewWithdrawal) -> MarketResult<Option<Withdrawal>> {
        let mut tx = self.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(withdrawal.seller_id.get())
            .execute(&mut *tx)
            .await?;

        let balance = Self::balance_in(&mut *tx, withdrawal.seller_id).await?;
        if !balance.covers(withdrawal.amount) {
            tx.rollback().await?;
            return Ok(None);
        }

        let row = sqlx::query_as::<_, WithdrawalRow>(&format!(
            r#"
            INSERT INTO withdrawals (seller_id, amount_cents, status, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING {WITHDRAWAL_COLUMNS}
            "#
        ))
        .bind(withdrawal.seller_id.get())
        .bind(withdrawal.amount.get())
        .bind(WithdrawalStatus::Pending.code())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.into_withdrawal().map(Some)
    }

    async fn find_withdrawal(&self, id: WithdrawalId) -> MarketResult<Option<Withdrawal>> {
        let row = sqlx::query_as::<_, WithdrawalRow>(&format!(
            "SELECT {WITHDRAWAL_COLUMNS} FROM withdrawals WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;

        row.map(WithdrawalRow::into_withdrawal).transpose()
    }

    async fn list_withdrawals_by_seller(&self, seller_id: UserId, page: Page) -> MarketResult<Vec<Withdrawal>> {
        let rows = sqlx::query_as::<_, WithdrawalRow>(&format!(
            "SELECT {WITHDRAWAL_COLUMNS} FROM withdrawals WHERE seller_id = $1 ORDER BY id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(seller_id.get())
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(WithdrawalRow::into_withdrawal).collect()
    }

    async fn list_withdrawals(&self, status: Option<WithdrawalStatus>, page: Page) -> MarketResult<Vec<Withdrawal>> {
        let rows = sqlx::query_as::<_, WithdrawalRow>(&format!(
            r#"
            SELECT {WITHDRAWAL_COLUMNS} FROM withdrawals
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY id DESC LIMIT $2 OFFSET $3
            "#
        ))
        .bind(status.map(|s| s.code()))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(WithdrawalRow::into_withdrawal).collect()
    }

    async fn update_withdrawal(&self, withdrawal: &Withdrawal, expected: WithdrawalStatus) -> MarketResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE withdrawals SET status = $3, admin_note = $4, processed_at = $5
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(withdrawal.id.get())
        .bind(expected.code())
        .bind(withdrawal.status.code())
        .bind(withdrawal.admin_note.as_deref())
        .bind(withdrawal.processed_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// ============================================================================
// Cases
// ============================================================================

impl CaseRepository for PgMarketRepository {
    async fn open_case(&self, case: &NewCase) -> MarketResult<Case> {
        let row = sqlx::query_as::<_, CaseRow>(&format!(
            r#"
            INSERT INTO cases (order_id, buyer_id, seller_id, reason, status, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING {CASE_COLUMNS}
            "#
        ))
        .bind(case.order_id.get())
        .bind(case.buyer_id.get())
        .bind(case.seller_id.get())
        .bind(&case.reason)
        .bind(CaseStatus::Open.code())
        .fetch_one(&self.pool)
        .await
        .map_err(unique_violation("A case is already open for this order"))?;

        row.into_case()
    }

    async fn find_case(&self, id: CaseId) -> MarketResult<Option<Case>> {
        let row = sqlx::query_as::<_, CaseRow>(&format!("SELECT {CASE_COLUMNS} FROM cases WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;

        row.map(CaseRow::into_case).transpose()
    }

    async fn list_cases_for_user(&self, user_id: UserId, page: Page) -> MarketResult<Vec<Case>> {
        let rows = sqlx::query_as::<_, CaseRow>(&format!(
            r#"
            SELECT {CASE_COLUMNS} FROM cases
            WHERE buyer_id = $1 OR seller_id = $1
            ORDER BY id DESC LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id.get())
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CaseRow::into_case).collect()
    }

    async fn list_cases(&self, status: Option<CaseStatus>, page: Page) -> MarketResult<Vec<Case>> {
        let rows = sqlx::query_as::<_, CaseRow>(&format!(
            r#"
            SELECT {CASE_COLUMNS} FROM cases
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY id DESC LIMIT $2 OFFSET $3
            "#
        ))
        .bind(status.map(|s| s.code()))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CaseRow::into_case).collect()
    }

    async fn update_case(&self, case: &Case, expected: CaseStatus) -> MarketResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE cases SET status = $3, resolution = $4, resolved_at = $5
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(case.id.get())
        .bind(expected.code())
        .bind(case.status.code())
        .bind(case.resolution.as_deref())
        .bind(case.resolved_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn add_case_message(&self, message: &NewCaseMessage) -> MarketResult<CaseMessage> {
        let row = sqlx::query_as::<_, CaseMessageRow>(&format!(
            r#"
            INSERT INTO case_messages (case_id, author_id, body, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING {CASE_MESSAGE_COLUMNS}
            "#
        ))
        .bind(message.case_id.get())
        .bind(message.author_id.get())
        .bind(&message.body)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_case_message())
    }

    async fn list_case_messages(&self, case_id: CaseId) -> MarketResult<Vec<CaseMessage>> {
        let rows = sqlx::query_as::<_, CaseMessageRow>(&format!(
            "SELECT {CASE_MESSAGE_COLUMNS} FROM case_messages WHERE case_id = $1 ORDER BY id"
        ))
        .bind(case_id.get())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CaseMessageRow::into_case_message).collect())
    }
}

// ============================================================================
// Reviews
// ============================================================================

impl ReviewRepository for PgMarketRepository {
    async fn create_review(&self, review: &NewReview) -> MarketResult<Review> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            r#"
            INSERT INTO reviews (order_id, author_id, seller_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(review.order_id.get())
        .bind(review.author_id.get())
        .bind(review.seller_id.get())
        .bind(i16::from(review.rating.get()))
        .bind(review.comment.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(unique_violation("This order has already been reviewed"))?;

        row.into_review()
    }

    async fn find_review(&self, id: ReviewId) -> MarketResult<Option<Review>> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;

        row.map(ReviewRow::into_review).transpose()
    }

    async fn list_reviews_for_seller(&self, seller_id: UserId, page: Page) -> MarketResult<Vec<Review>> {
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE seller_id = $1 ORDER BY id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(seller_id.get())
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ReviewRow::into_review).collect()
    }

    async fn rating_summary(&self, seller_id: UserId) -> MarketResult<RatingSummary> {
        let (count, average): (i64, Option<f64>) = sqlx::query_as(
            "SELECT COUNT(*), AVG(rating)::DOUBLE PRECISION FROM reviews WHERE seller_id = $1",
        )
        .bind(seller_id.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(RatingSummary { count, average })
    }

    async fn delete_review(&self, id: ReviewId) -> MarketResult<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

// ============================================================================
// Testimonials
// ============================================================================

impl TestimonialRepository for PgMarketRepository {
    async fn create_testimonial(&self, testimonial: &NewTestimonial) -> MarketResult<Testimonial> {
        let row = sqlx::query_as::<_, TestimonialRow>(&format!(
            r#"
            INSERT INTO testimonials (author_id, author_name, body, status, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING {TESTIMONIAL_COLUMNS}
            "#
        ))
        .bind(testimonial.author_id.get())
        .bind(&testimonial.author_name)
        .bind(&testimonial.body)
        .bind(TestimonialStatus::Pending.code())
        .fetch_one(&self.pool)
        .await?;

        row.into_testimonial()
    }

    async fn find_testimonial(&self, id: TestimonialId) -> MarketResult<Option<Testimonial>> {
        let row = sqlx::query_as::<_, TestimonialRow>(&format!(
            "SELECT {TESTIMONIAL_COLUMNS} FROM testimonials WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TestimonialRow::into_testimonial).transpose()
    }

    async fn list_testimonials(&self, status: Option<TestimonialStatus>, page: Page) -> MarketResult<Vec<Testimonial>> {
        let rows = sqlx::query_as::<_, TestimonialRow>(&format!(
            r#"
            SELECT {TESTIMONIAL_COLUMNS} FROM testimonials
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY id DESC LIMIT $2 OFFSET $3
            "#
        ))
        .bind(status.map(|s| s.code()))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TestimonialRow::into_testimonial).collect()
    }

    async fn update_testimonial(&self, testimonial: &Testimonial, expected: TestimonialStatus) -> MarketResult<bool> {
        let result = sqlx::query("UPDATE testimonials SET status = $3 WHERE id = $1 AND status = $2")
            .bind(testimonial.id.get())
            .bind(expected.code())
            .bind(testimonial.status.code())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_testimonial(&self, id: TestimonialId) -> MarketResult<bool> {
        let result = sqlx::query("DELETE FROM testimonials WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

// ============================================================================
// Notifications
// ============================================================================

impl NotificationRepository for PgMarketRepository {
    async fn create_notification(&self, notification: &NewNotification) -> MarketResult<Notification> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            INSERT INTO notifications (recipient_id, kind, message, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(notification.recipient_id.get())
        .bind(notification.kind.code())
        .bind(&notification.message)
        .fetch_one(&self.pool)
        .await?;

        row.into_notification()
    }

    async fn find_notification(&self, id: NotificationId) -> MarketResult<Option<Notification>> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;

        row.map(NotificationRow::into_notification).transpose()
    }

    async fn list_notifications(
        &self,
        recipient_id: UserId,
        unread_only: bool,
        page: Page,
    ) -> MarketResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS} FROM notifications
            WHERE recipient_id = $1 AND (NOT $2 OR read_at IS NULL)
            ORDER BY id DESC LIMIT $3 OFFSET $4
            "#
        ))
        .bind(recipient_id.get())
        .bind(unread_only)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(NotificationRow::into_notification).collect()
    }

    async fn unread_count(&self, recipient_id: UserId) -> MarketResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND read_at IS NULL",
        )
        .bind(recipient_id.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn mark_read(&self, id: NotificationId, at: DateTime<Utc>) -> MarketResult<()> {
        sqlx::query("UPDATE notifications SET read_at = $2 WHERE id = $1 AND read_at IS NULL")
            .bind(id.get())
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn mark_all_read(&self, recipient_id: UserId, at: DateTime<Utc>) -> MarketResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET read_at = $2 WHERE recipient_id = $1 AND read_at IS NULL",
        )
        .bind(recipient_id.get())
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(sqlx::FromRow)]
struct ListingRow {
    id: i64,
    seller_id: i64,
    title: String,
    description: String,
    price_cents: i64,
    status: String,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ListingRow {
    fn into_listing(self) -> MarketResult<Listing> {
        Ok(Listing {
            id: ListingId::from_db(self.id),
            seller_id: UserId::from_db(self.seller_id),
            title: self.title,
            description: self.description,
            price: Cents::from_db(self.price_cents),
            status: decode("listings", &self.status, ListingStatus::from_code)?,
            rejection_reason: self.rejection_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    listing_id: i64,
    buyer_id: i64,
    seller_id: i64,
    amount_cents: i64,
    status: String,
    tracking_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self) -> MarketResult<Order> {
        Ok(Order {
            id: OrderId::from_db(self.id),
            listing_id: ListingId::from_db(self.listing_id),
            buyer_id: UserId::from_db(self.buyer_id),
            seller_id: UserId::from_db(self.seller_id),
            amount: Cents::from_db(self.amount_cents),
            status: decode("orders", &self.status, OrderStatus::from_code)?,
            tracking_number: self.tracking_number,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ConversationRow {
    id: i64,
    listing_id: i64,
    buyer_id: i64,
    seller_id: i64,
    created_at: DateTime<Utc>,
    last_message_at: Option<DateTime<Utc>>,
}

impl ConversationRow {
    fn into_conversation(self) -> Conversation {
        Conversation {
            id: ConversationId::from_db(self.id),
            listing_id: ListingId::from_db(self.listing_id),
            buyer_id: UserId::from_db(self.buyer_id),
            seller_id: UserId::from_db(self.seller_id),
            created_at: self.created_at,
            last_message_at: self.last_message_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: i64,
    conversation_id: i64,
    sender_id: i64,
    body: String,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    fn into_message(self) -> Message {
        Message {
            id: MessageId::from_db(self.id),
            conversation_id: ConversationId::from_db(self.conversation_id),
            sender_id: UserId::from_db(self.sender_id),
            body: self.body,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct WithdrawalRow {
    id: i64,
    seller_id: i64,
    amount_cents: i64,
    status: String,
    admin_note: Option<String>,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
}

impl WithdrawalRow {
    fn into_withdrawal(self) -> MarketResult<Withdrawal> {
        Ok(Withdrawal {
            id: WithdrawalId::from_db(self.id),
            seller_id: UserId::from_db(self.seller_id),
            amount: Cents::from_db(self.amount_cents),
            status: decode("withdrawals", &self.status, WithdrawalStatus::from_code)?,
            admin_note: self.admin_note,
            created_at: self.created_at,
            processed_at: self.processed_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CaseRow {
    id: i64,
    order_id: i64,
    buyer_id: i64,
    seller_id: i64,
    reason: String,
    status: String,
    resolution: Option<String>,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl CaseRow {
    fn into_case(self) -> MarketResult<Case> {
        Ok(Case {
            id: CaseId::from_db(self.id),
            order_id: OrderId::from_db(self.order_id),
            buyer_id: UserId::from_db(self.buyer_id),
            seller_id: UserId::from_db(self.seller_id),
            reason: self.reason,
            status: decode("cases", &self.status, CaseStatus::from_code)?,
            resolution: self.resolution,
            created_at: self.created_at,
            resolved_at: self.resolved_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CaseMessageRow {
    id: i64,
    case_id: i64,
    author_id: i64,
    body: String,
    created_at: DateTime<Utc>,
}

impl CaseMessageRow {
    fn into_case_message(self) -> CaseMessage {
        CaseMessage {
            id: MessageId::from_db(self.id),
            case_id: CaseId::from_db(self.case_id),
            author_id: UserId::from_db(self.author_id),
            body: self.body,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: i64,
    order_id: i64,
    author_id: i64,
    seller_id: i64,
    rating: i16,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

impl ReviewRow {
    fn into_review(self) -> MarketResult<Review> {
        let rating = Rating::new(i64::from(self.rating))
            .map_err(|_| MarketError::Internal(format!("Invalid rating in reviews: {}", self.rating)))?;

        Ok(Review {
            id: ReviewId::from_db(self.id),
            order_id: OrderId::from_db(self.order_id),
            author_id: UserId::from_db(self.author_id),
            seller_id: UserId::from_db(self.seller_id),
            rating,
            comment: self.comment,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TestimonialRow {
    id: i64,
    author_id: i64,
    author_name: String,
    body: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl TestimonialRow {
    fn into_testimonial(self) -> MarketResult<Testimonial> {
        Ok(Testimonial {
            id: TestimonialId::from_db(self.id),
            author_id: UserId::from_db(self.author_id),
            author_name: self.author_name,
            body: self.body,
            status: decode("testimonials", &self.status, TestimonialStatus::from_code)?,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: i64,
    recipient_id: i64,
    kind: String,
    message: String,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl NotificationRow {
    fn into_notification(self) -> MarketResult<Notification> {
        Ok(Notification {
            id: NotificationId::from_db(self.id),
            recipient_id: UserId::from_db(self.recipient_id),
            kind: decode("notifications", &self.kind, NotificationKind::from_code)?,
            message: self.message,
            read_at: self.read_at,
            created_at: self.created_at,
        })
    }
}
