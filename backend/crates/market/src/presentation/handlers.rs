//! HTTP Handlers
//!
//! Handlers check the caller, then parse the path id and the query string,
//! then hand over to a service. A malformed id never hides a 401 or 403.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use auth::{Action, CurrentSession, authorize};
use kernel::extract::{Params, PathId};
use kernel::pagination::PageQuery;
use platform::client::ClientIdentity;
use platform::presence::PresenceSnapshot;

use crate::application::{
    CaseService, ConversationService, ListingService, NotificationService, OrderService,
    PresenceService, ReviewService, TestimonialService, WithdrawalService,
};
use crate::domain::entity::{
    case::CaseStatus, listing::ListingStatus, testimonial::TestimonialStatus,
    withdrawal::{Balance, WithdrawalStatus},
};
use crate::domain::repository::MarketRepository;
use crate::domain::value_object::ids::{CaseId, ConversationId, ListingId, OrderId, WithdrawalId};
use crate::error::MarketResult;
use crate::presentation::dto::*;
use crate::presentation::extractor::Payload;
use crate::presentation::state::MarketAppState;

impl<R> MarketAppState<R>
where
    R: MarketRepository,
{
    fn listings(&self) -> ListingService<R> {
        ListingService::new(self.repo.clone(), self.limiter.clone(), self.config.clone())
    }

    fn orders(&self) -> OrderService<R> {
        OrderService::new(self.repo.clone())
    }

    fn conversations(&self) -> ConversationService<R> {
        ConversationService::new(self.repo.clone(), self.limiter.clone(), self.config.clone())
    }

    fn withdrawals(&self) -> WithdrawalService<R> {
        WithdrawalService::new(self.repo.clone(), self.config.clone())
    }

    fn cases(&self) -> CaseService<R> {
        CaseService::new(self.repo.clone(), self.limiter.clone(), self.config.clone())
    }

    fn reviews(&self) -> ReviewService<R> {
        ReviewService::new(self.repo.clone())
    }

    fn testimonials(&self) -> TestimonialService<R> {
        TestimonialService::new(self.repo.clone())
    }

    fn notifications(&self) -> NotificationService<R> {
        NotificationService::new(self.repo.clone())
    }

    fn presence_service(&self) -> PresenceService {
        PresenceService::new(self.presence.clone(), self.limiter.clone(), self.config.clone())
    }
}

fn list<T, U: From<T>>(items: Vec<T>) -> Json<Vec<U>> {
    Json(items.into_iter().map(U::from).collect())
}

// ============================================================================
// Listings
// ============================================================================

/// GET /api/listings
pub async fn list_listings<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    query: Params<PageQuery>,
) -> MarketResult<Json<Vec<ListingResponse>>> {
    let page = query.get()?.resolve(state.config.max_page_size);
    Ok(list(state.listings().list_public(page).await?))
}

/// GET /api/listings/mine
pub async fn my_listings<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    query: Params<PageQuery>,
) -> MarketResult<Json<Vec<ListingResponse>>> {
    session.require_user()?;
    let page = query.get()?.resolve(state.config.max_page_size);
    Ok(list(state.listings().list_mine(&session, page).await?))
}

/// GET /api/listings/{id}
pub async fn get_listing<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    id: PathId,
) -> MarketResult<Json<ListingResponse>> {
    let listing = state.listings().get(&session, id.parse()?).await?;
    Ok(Json(listing.into()))
}

/// POST /api/listings
pub async fn create_listing<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    client: ClientIdentity,
    Payload(req): Payload<CreateListingRequest>,
) -> MarketResult<impl IntoResponse> {
    session.require_user()?;
    let draft = req.validate()?;
    let listing = state.listings().create(&session, &client, draft).await?;
    Ok((StatusCode::CREATED, Json(ListingResponse::from(listing))))
}

/// PATCH /api/listings/{id}
pub async fn update_listing<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    id: PathId,
    Payload(req): Payload<UpdateListingRequest>,
) -> MarketResult<Json<ListingResponse>> {
    session.require_user()?;
    let id: ListingId = id.parse()?;
    let changes = req.validate()?;
    let listing = state.listings().update(&session, id, changes).await?;
    Ok(Json(listing.into()))
}

/// DELETE /api/listings/{id}
pub async fn delete_listing<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    id: PathId,
) -> MarketResult<StatusCode> {
    session.require_user()?;
    state.listings().delete(&session, id.parse()?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/listings?status=PENDING
pub async fn admin_list_listings<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    query: Params<StatusQuery>,
) -> MarketResult<Json<Vec<ListingResponse>>> {
    authorize(&session, Action::ListingModerate, None)?;
    let query = query.get()?;
    let status = query.status(ListingStatus::from_code)?;
    let page = query.page(state.config.max_page_size);
    Ok(list(state.listings().admin_list(&session, status, page).await?))
}

/// POST /api/admin/listings/{id}/approve
pub async fn approve_listing<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    id: PathId,
) -> MarketResult<Json<ListingResponse>> {
    authorize(&session, Action::ListingModerate, None)?;
    let listing = state.listings().approve(&session, id.parse()?).await?;
    Ok(Json(listing.into()))
}

/// POST /api/admin/listings/{id}/reject
pub async fn reject_listing<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    id: PathId,
    Payload(req): Payload<ReasonRequest>,
) -> MarketResult<Json<ListingResponse>> {
    authorize(&session, Action::ListingModerate, None)?;
    let id: ListingId = id.parse()?;
    let reason = req.validate()?;
    let listing = state.listings().reject(&session, id, reason).await?;
    Ok(Json(listing.into()))
}

// ============================================================================
// Orders
// ============================================================================

/// POST /api/orders
pub async fn place_order<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    Payload(req): Payload<PlaceOrderRequest>,
) -> MarketResult<impl IntoResponse> {
    session.require_user()?;
    let listing_id = req.validate()?;
    let order = state.orders().place(&session, listing_id).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(order))))
}

/// GET /api/orders
pub async fn my_orders<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    query: Params<PageQuery>,
) -> MarketResult<Json<Vec<OrderResponse>>> {
    session.require_user()?;
    let page = query.get()?.resolve(state.config.max_page_size);
    Ok(list(state.orders().list_mine(&session, page).await?))
}

/// GET /api/orders/{id}
pub async fn get_order<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    id: PathId,
) -> MarketResult<Json<OrderResponse>> {
    session.require_user()?;
    let order = state.orders().get(&session, id.parse()?).await?;
    Ok(Json(order.into()))
}

/// POST /api/orders/{id}/ship
pub async fn ship_order<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    id: PathId,
    Payload(req): Payload<ShipRequest>,
) -> MarketResult<Json<OrderResponse>> {
    session.require_user()?;
    let id: OrderId = id.parse()?;
    let tracking = req.validate()?;
    let order = state.orders().ship(&session, id, tracking).await?;
    Ok(Json(order.into()))
}

/// POST /api/orders/{id}/confirm
pub async fn confirm_order<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    id: PathId,
) -> MarketResult<Json<OrderResponse>> {
    session.require_user()?;
    let order = state.orders().confirm_receipt(&session, id.parse()?).await?;
    Ok(Json(order.into()))
}

/// POST /api/orders/{id}/cancel
pub async fn cancel_order<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    id: PathId,
) -> MarketResult<Json<OrderResponse>> {
    session.require_user()?;
    let order = state.orders().cancel(&session, id.parse()?).await?;
    Ok(Json(order.into()))
}

/// POST /api/admin/orders/{id}/refund
pub async fn refund_order<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    id: PathId,
) -> MarketResult<Json<OrderResponse>> {
    authorize(&session, Action::OrderRefund, None)?;
    let order = state.orders().refund(&session, id.parse()?).await?;
    Ok(Json(order.into()))
}

// ============================================================================
// Conversations
// ============================================================================

/// POST /api/conversations
pub async fn open_conversation<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    Payload(req): Payload<OpenConversationRequest>,
) -> MarketResult<Json<ConversationResponse>> {
    session.require_user()?;
    let listing_id = req.validate()?;
    let conversation = state.conversations().open(&session, listing_id).await?;
    Ok(Json(conversation.into()))
}

/// GET /api/conversations
pub async fn my_conversations<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    query: Params<PageQuery>,
) -> MarketResult<Json<Vec<ConversationResponse>>> {
    session.require_user()?;
    let page = query.get()?.resolve(state.config.max_page_size);
    Ok(list(state.conversations().list_mine(&session, page).await?))
}

/// GET /api/conversations/{id}
pub async fn get_conversation<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    id: PathId,
) -> MarketResult<Json<ConversationResponse>> {
    session.require_user()?;
    let (conversation, messages) = state
        .conversations()
        .get(&session, id.parse()?)
        .await?;
    Ok(Json(ConversationResponse::with_messages(conversation, messages)))
}

/// POST /api/conversations/{id}/messages
pub async fn post_message<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    client: ClientIdentity,
    id: PathId,
    Payload(req): Payload<MessageRequest>,
) -> MarketResult<impl IntoResponse> {
    session.require_user()?;
    let id: ConversationId = id.parse()?;
    let body = req.validate()?;
    let message = state.conversations().post(&session, &client, id, body).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/admin/conversations
pub async fn admin_list_conversations<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    query: Params<PageQuery>,
) -> MarketResult<Json<Vec<ConversationResponse>>> {
    authorize(&session, Action::ConversationModerate, None)?;
    let page = query.get()?.resolve(state.config.max_page_size);
    Ok(list(state.conversations().admin_list(&session, page).await?))
}

// ============================================================================
// Withdrawals
// ============================================================================

/// POST /api/withdrawals
pub async fn request_withdrawal<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    Payload(req): Payload<WithdrawalRequest>,
) -> MarketResult<impl IntoResponse> {
    session.require_user()?;
    let amount = req.validate()?;
    let withdrawal = state.withdrawals().request(&session, amount).await?;
    Ok((StatusCode::CREATED, Json(WithdrawalResponse::from(withdrawal))))
}

/// GET /api/withdrawals
pub async fn my_withdrawals<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    query: Params<PageQuery>,
) -> MarketResult<Json<Vec<WithdrawalResponse>>> {
    session.require_user()?;
    let page = query.get()?.resolve(state.config.max_page_size);
    Ok(list(state.withdrawals().list_mine(&session, page).await?))
}

/// GET /api/withdrawals/balance
pub async fn my_balance<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
) -> MarketResult<Json<Balance>> {
    Ok(Json(state.withdrawals().balance(&session).await?))
}

/// GET /api/withdrawals/{id}
pub async fn get_withdrawal<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    id: PathId,
) -> MarketResult<Json<WithdrawalResponse>> {
    session.require_user()?;
    let withdrawal = state.withdrawals().get(&session, id.parse()?).await?;
    Ok(Json(withdrawal.into()))
}

/// GET /api/admin/withdrawals?status=PENDING
pub async fn admin_list_withdrawals<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    query: Params<StatusQuery>,
) -> MarketResult<Json<Vec<WithdrawalResponse>>> {
    authorize(&session, Action::WithdrawalProcess, None)?;
    let query = query.get()?;
    let status = query.status(WithdrawalStatus::from_code)?;
    let page = query.page(state.config.max_page_size);
    Ok(list(state.withdrawals().admin_list(&session, status, page).await?))
}

/// POST /api/admin/withdrawals/{id}/approve
pub async fn approve_withdrawal<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    id: PathId,
    Payload(req): Payload<NoteRequest>,
) -> MarketResult<Json<WithdrawalResponse>> {
    authorize(&session, Action::WithdrawalProcess, None)?;
    let id: WithdrawalId = id.parse()?;
    let note = req.optional()?;
    let withdrawal = state.withdrawals().approve(&session, id, note).await?;
    Ok(Json(withdrawal.into()))
}

/// POST /api/admin/withdrawals/{id}/reject
pub async fn reject_withdrawal<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    id: PathId,
    Payload(req): Payload<NoteRequest>,
) -> MarketResult<Json<WithdrawalResponse>> {
    authorize(&session, Action::WithdrawalProcess, None)?;
    let id: WithdrawalId = id.parse()?;
    let note = req.required()?;
    let withdrawal = state.withdrawals().reject(&session, id, note).await?;
    Ok(Json(withdrawal.into()))
}

// ============================================================================
// Cases
// ============================================================================

/// POST /api/cases
pub async fn open_case<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    client: ClientIdentity,
    Payload(req): Payload<OpenCaseRequest>,
) -> MarketResult<impl IntoResponse> {
    session.require_user()?;
    let (order_id, reason) = req.validate()?;
    let case = state.cases().open(&session, &client, order_id, reason).await?;
    Ok((StatusCode::CREATED, Json(CaseResponse::from(case))))
}

/// GET /api/cases
pub async fn my_cases<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    query: Params<PageQuery>,
) -> MarketResult<Json<Vec<CaseResponse>>> {
    session.require_user()?;
    let page = query.get()?.resolve(state.config.max_page_size);
    Ok(list(state.cases().list_mine(&session, page).await?))
}

/// GET /api/cases/{id}
pub async fn get_case<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    id: PathId,
) -> MarketResult<Json<CaseResponse>> {
    session.require_user()?;
    let (case, messages) = state.cases().get(&session, id.parse()?).await?;
    Ok(Json(CaseResponse::with_messages(case, messages)))
}

/// POST /api/cases/{id}/messages
pub async fn reply_case<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    client: ClientIdentity,
    id: PathId,
    Payload(req): Payload<MessageRequest>,
) -> MarketResult<impl IntoResponse> {
    session.require_user()?;
    let id: CaseId = id.parse()?;
    let body = req.validate()?;
    let message = state.cases().reply(&session, &client, id, body).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/admin/cases?status=OPEN
pub async fn admin_list_cases<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    query: Params<StatusQuery>,
) -> MarketResult<Json<Vec<CaseResponse>>> {
    authorize(&session, Action::CaseResolve, None)?;
    let query = query.get()?;
    let status = query.status(CaseStatus::from_code)?;
    let page = query.page(state.config.max_page_size);
    Ok(list(state.cases().admin_list(&session, status, page).await?))
}

/// POST /api/admin/cases/{id}/resolve
pub async fn resolve_case<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    id: PathId,
    Payload(req): Payload<ResolutionRequest>,
) -> MarketResult<Json<CaseResponse>> {
    authorize(&session, Action::CaseResolve, None)?;
    let id: CaseId = id.parse()?;
    let resolution = req.validate()?;
    let case = state.cases().resolve(&session, id, resolution).await?;
    Ok(Json(case.into()))
}

// ============================================================================
// Reviews
// ============================================================================

/// POST /api/reviews
pub async fn create_review<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    Payload(req): Payload<CreateReviewRequest>,
) -> MarketResult<impl IntoResponse> {
    session.require_user()?;
    let input = req.validate()?;
    let review = state
        .reviews()
        .create(&session, input.order_id, input.rating, input.comment)
        .await?;
    Ok((StatusCode::CREATED, Json(ReviewResponse::from(review))))
}

/// GET /api/sellers/{id}/reviews
pub async fn seller_reviews<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    id: PathId,
    query: Params<PageQuery>,
) -> MarketResult<Json<SellerReviewsResponse>> {
    let page = query.get()?.resolve(state.config.max_page_size);
    let (reviews, summary) = state.reviews().list_for_seller(id.parse()?, page).await?;
    Ok(Json(SellerReviewsResponse {
        summary,
        reviews: reviews.into_iter().map(ReviewResponse::from).collect(),
    }))
}

/// DELETE /api/reviews/{id}
pub async fn delete_review<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    id: PathId,
) -> MarketResult<StatusCode> {
    session.require_user()?;
    state.reviews().delete(&session, id.parse()?).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Testimonials
// ============================================================================

/// GET /api/testimonials
pub async fn list_testimonials<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    query: Params<PageQuery>,
) -> MarketResult<Json<Vec<TestimonialResponse>>> {
    let page = query.get()?.resolve(state.config.max_page_size);
    Ok(list(state.testimonials().list_public(page).await?))
}

/// POST /api/testimonials
pub async fn create_testimonial<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    Payload(req): Payload<TestimonialRequest>,
) -> MarketResult<impl IntoResponse> {
    session.require_user()?;
    let body = req.validate()?;
    let testimonial = state.testimonials().create(&session, body).await?;
    Ok((StatusCode::CREATED, Json(TestimonialResponse::from(testimonial))))
}

/// GET /api/admin/testimonials?status=PENDING
pub async fn admin_list_testimonials<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    query: Params<StatusQuery>,
) -> MarketResult<Json<Vec<TestimonialResponse>>> {
    authorize(&session, Action::TestimonialModerate, None)?;
    let query = query.get()?;
    let status = query.status(TestimonialStatus::from_code)?;
    let page = query.page(state.config.max_page_size);
    Ok(list(state.testimonials().admin_list(&session, status, page).await?))
}

/// POST /api/admin/testimonials/{id}/publish
pub async fn publish_testimonial<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    id: PathId,
) -> MarketResult<Json<TestimonialResponse>> {
    authorize(&session, Action::TestimonialModerate, None)?;
    let testimonial = state.testimonials().publish(&session, id.parse()?).await?;
    Ok(Json(testimonial.into()))
}

/// POST /api/admin/testimonials/{id}/hide
pub async fn hide_testimonial<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    id: PathId,
) -> MarketResult<Json<TestimonialResponse>> {
    authorize(&session, Action::TestimonialModerate, None)?;
    let testimonial = state.testimonials().hide(&session, id.parse()?).await?;
    Ok(Json(testimonial.into()))
}

/// DELETE /api/admin/testimonials/{id}
pub async fn delete_testimonial<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    id: PathId,
) -> MarketResult<StatusCode> {
    authorize(&session, Action::TestimonialModerate, None)?;
    state.testimonials().delete(&session, id.parse()?).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Notifications
// ============================================================================

/// GET /api/notifications?unreadOnly=true
pub async fn my_notifications<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    query: Params<NotificationQuery>,
) -> MarketResult<Json<NotificationListResponse>> {
    session.require_user()?;
    let query = query.get()?;
    let page = query.page(state.config.max_page_size);
    let (items, unread_count) = state
        .notifications()
        .list_mine(&session, query.unread_only, page)
        .await?;
    Ok(Json(NotificationListResponse {
        unread_count,
        items: items.into_iter().map(NotificationResponse::from).collect(),
    }))
}

/// POST /api/notifications/{id}/read
pub async fn mark_notification_read<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    id: PathId,
) -> MarketResult<StatusCode> {
    session.require_user()?;
    state
        .notifications()
        .mark_read(&session, id.parse()?)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/notifications/read-all
pub async fn mark_all_notifications_read<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
) -> MarketResult<Json<MarkedResponse>> {
    let marked = state.notifications().mark_all_read(&session).await?;
    Ok(Json(MarkedResponse { marked }))
}

// ============================================================================
// Presence
// ============================================================================

/// POST /api/presence/heartbeat
pub async fn heartbeat<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
    client: ClientIdentity,
) -> MarketResult<StatusCode> {
    state.presence_service().heartbeat(&session, &client)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/presence
pub async fn presence_stats<R: MarketRepository>(
    State(state): State<MarketAppState<R>>,
    session: CurrentSession,
) -> MarketResult<Json<PresenceSnapshot>> {
    Ok(Json(state.presence_service().stats(&session)?))
}
