//! Listings: seller-submitted items, moderated before they go public

use std::sync::Arc;

use auth::{Action, Session, authorize};
use kernel::pagination::Page;
use platform::client::ClientIdentity;
use platform::rate_limit::FixedWindowRateLimiter;

use crate::application::config::MarketConfig;
use crate::application::guard::{enforce_rate_limit, notify, require_user};
use crate::domain::entity::listing::{Listing, ListingChanges, ListingStatus, NewListing};
use crate::domain::entity::notification::NotificationKind;
use crate::domain::repository::MarketRepository;
use crate::domain::value_object::ids::ListingId;
use crate::domain::value_object::money::Cents;
use crate::error::{MarketError, MarketResult};

/// Validated creation payload
#[derive(Debug, Clone)]
pub struct ListingDraft {
    pub title: String,
    pub description: String,
    pub price: Cents,
}

pub struct ListingService<R>
where
    R: MarketRepository,
{
    repo: Arc<R>,
    limiter: Arc<FixedWindowRateLimiter>,
    config: Arc<MarketConfig>,
}

impl<R> ListingService<R>
where
    R: MarketRepository,
{
    pub fn new(repo: Arc<R>, limiter: Arc<FixedWindowRateLimiter>, config: Arc<MarketConfig>) -> Self {
        Self {
            repo,
            limiter,
            config,
        }
    }

    pub async fn list_public(&self, page: Page) -> MarketResult<Vec<Listing>> {
        self.repo.list_listings(Some(ListingStatus::Approved), page).await
    }

    /// Unpublished listings are only visible to their seller and admins;
    /// everyone else gets `NotFound`, anonymous callers included.
    pub async fn get(&self, session: &Session, id: ListingId) -> MarketResult<Listing> {
        let listing = self.load(id).await?;
        if listing.is_public() {
            return Ok(listing);
        }
        match authorize(session, Action::ListingViewUnpublished, Some(&listing.owners())) {
            Ok(_) => Ok(listing),
            Err(_) => Err(MarketError::NotFound("Listing")),
        }
    }

    pub async fn list_mine(&self, session: &Session, page: Page) -> MarketResult<Vec<Listing>> {
        let user = require_user(session)?;
        self.repo.list_listings_by_seller(user.id, page).await
    }

    pub async fn create(
        &self,
        session: &Session,
        client: &ClientIdentity,
        draft: ListingDraft,
    ) -> MarketResult<Listing> {
        let user = authorize(session, Action::ListingCreate, None)?;
        enforce_rate_limit(
            &self.limiter,
            &client.rate_limit_key("listing_create"),
            &self.config.listing_create_rate_limit,
        )?;

        let listing = self
            .repo
            .create_listing(&NewListing {
                seller_id: user.id,
                title: draft.title,
                description: draft.description,
                price: draft.price,
            })
            .await?;

        tracing::info!(listing_id = %listing.id, seller_id = %user.id, "Listing submitted");
        Ok(listing)
    }

    pub async fn update(
        &self,
        session: &Session,
        id: ListingId,
        changes: ListingChanges,
    ) -> MarketResult<Listing> {
        require_user(session)?;
        let mut listing = self.load(id).await?;
        authorize(session, Action::ListingUpdate, Some(&listing.owners()))?;

        let previous = listing.apply(changes)?;
        self.save(&listing, previous).await?;

        tracing::info!(listing_id = %listing.id, "Listing edited, back to moderation");
        Ok(listing)
    }

    pub async fn delete(&self, session: &Session, id: ListingId) -> MarketResult<()> {
        require_user(session)?;
        let listing = self.load(id).await?;
        authorize(session, Action::ListingDelete, Some(&listing.owners()))?;
        listing.ensure_deletable()?;

        if !self.repo.delete_listing(id).await? {
            return Err(MarketError::conflict("Listing was sold in the meantime"));
        }

        tracing::info!(listing_id = %id, "Listing deleted");
        Ok(())
    }

    pub async fn admin_list(
        &self,
        session: &Session,
        status: Option<ListingStatus>,
        page: Page,
    ) -> MarketResult<Vec<Listing>> {
        authorize(session, Action::ListingModerate, None)?;
        self.repo.list_listings(status, page).await
    }

    pub async fn approve(&self, session: &Session, id: ListingId) -> MarketResult<Listing> {
        let admin = authorize(session, Action::ListingModerate, None)?;
        let mut listing = self.load(id).await?;

        let previous = listing.approve()?;
        self.save(&listing, previous).await?;

        tracing::info!(listing_id = %id, admin_id = %admin.id, "Listing approved");
        notify(
            &*self.repo,
            listing.seller_id,
            NotificationKind::ListingApproved,
            format!("Your listing \"{}\" is now online", listing.title),
        )
        .await;
        Ok(listing)
    }

    pub async fn reject(&self, session: &Session, id: ListingId, reason: String) -> MarketResult<Listing> {
        let admin = authorize(session, Action::ListingModerate, None)?;
        let mut listing = self.load(id).await?;

        let previous = listing.reject(reason)?;
        self.save(&listing, previous).await?;

        tracing::info!(listing_id = %id, admin_id = %admin.id, "Listing rejected");
        notify(
            &*self.repo,
            listing.seller_id,
            NotificationKind::ListingRejected,
            format!(
                "Your listing \"{}\" was rejected: {}",
                listing.title,
                listing.rejection_reason.as_deref().unwrap_or_default()
            ),
        )
        .await;
        Ok(listing)
    }

    async fn load(&self, id: ListingId) -> MarketResult<Listing> {
        self.repo
            .find_listing(id)
            .await?
            .ok_or(MarketError::NotFound("Listing"))
    }

    async fn save(&self, listing: &Listing, previous: ListingStatus) -> MarketResult<()> {
        if self.repo.update_listing(listing, previous).await? {
            Ok(())
        } else {
            Err(MarketError::conflict("Listing changed in the meantime, reload and retry"))
        }
    }
}
