//! Market Routers

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::domain::repository::MarketRepository;
use crate::presentation::handlers::*;
use crate::presentation::state::MarketAppState;

/// Routes mounted under `/api`
pub fn market_router<R: MarketRepository>(state: MarketAppState<R>) -> Router {
    Router::new()
        .route("/listings", get(list_listings::<R>).post(create_listing::<R>))
        .route("/listings/mine", get(my_listings::<R>))
        .route(
            "/listings/{id}",
            get(get_listing::<R>)
                .patch(update_listing::<R>)
                .delete(delete_listing::<R>),
        )
        .route("/orders", get(my_orders::<R>).post(place_order::<R>))
        .route("/orders/{id}", get(get_order::<R>))
        .route("/orders/{id}/ship", post(ship_order::<R>))
        .route("/orders/{id}/confirm", post(confirm_order::<R>))
        .route("/orders/{id}/cancel", post(cancel_order::<R>))
        .route(
            "/conversations",
            get(my_conversations::<R>).post(open_conversation::<R>),
        )
        .route("/conversations/{id}", get(get_conversation::<R>))
        .route("/conversations/{id}/messages", post(post_message::<R>))
        .route(
            "/withdrawals",
            get(my_withdrawals::<R>).post(request_withdrawal::<R>),
        )
        .route("/withdrawals/balance", get(my_balance::<R>))
        .route("/withdrawals/{id}", get(get_withdrawal::<R>))
        .route("/cases", get(my_cases::<R>).post(open_case::<R>))
        .route("/cases/{id}", get(get_case::<R>))
        .route("/cases/{id}/messages", post(reply_case::<R>))
        .route("/reviews", post(create_review::<R>))
        .route("/reviews/{id}", delete(delete_review::<R>))
        .route("/sellers/{id}/reviews", get(seller_reviews::<R>))
        .route(
            "/testimonials",
            get(list_testimonials::<R>).post(create_testimonial::<R>),
        )
        .route("/notifications", get(my_notifications::<R>))
        .route("/notifications/read-all", post(mark_all_notifications_read::<R>))
        .route("/notifications/{id}/read", post(mark_notification_read::<R>))
        .route("/presence/heartbeat", post(heartbeat::<R>))
        .with_state(state)
}

/// Moderation routes, mounted under `/api/admin`
pub fn market_admin_router<R: MarketRepository>(state: MarketAppState<R>) -> Router {
    Router::new()
        .route("/listings", get(admin_list_listings::<R>))
        .route("/listings/{id}/approve", post(approve_listing::<R>))
        .route("/listings/{id}/reject", post(reject_listing::<R>))
        .route("/orders/{id}/refund", post(refund_order::<R>))
        .route("/conversations", get(admin_list_conversations::<R>))
        .route("/withdrawals", get(admin_list_withdrawals::<R>))
        .route("/withdrawals/{id}/approve", post(approve_withdrawal::<R>))
        .route("/withdrawals/{id}/reject", post(reject_withdrawal::<R>))
        .route("/cases", get(admin_list_cases::<R>))
        .route("/cases/{id}/resolve", post(resolve_case::<R>))
        .route("/testimonials", get(admin_list_testimonials::<R>))
        .route("/testimonials/{id}/publish", post(publish_testimonial::<R>))
        .route("/testimonials/{id}/hide", post(hide_testimonial::<R>))
        .route("/testimonials/{id}", delete(delete_testimonial::<R>))
        .route("/presence", get(presence_stats::<R>))
        .with_state(state)
}
