//! After-sales cases opened by a buyer on a shipped or completed order

use std::sync::Arc;

use auth::{Action, Session, authorize};
use kernel::pagination::Page;
use platform::client::ClientIdentity;
use platform::rate_limit::FixedWindowRateLimiter;

use crate::application::config::MarketConfig;
use crate::application::guard::{enforce_rate_limit, notify, require_user};
use crate::domain::entity::case::{Case, CaseMessage, CaseStatus, NewCase, NewCaseMessage};
use crate::domain::entity::notification::NotificationKind;
use crate::domain::repository::MarketRepository;
use crate::domain::value_object::ids::{CaseId, OrderId};
use crate::error::{MarketError, MarketResult};

pub struct CaseService<R>
where
    R: MarketRepository,
{
    repo: Arc<R>,
    limiter: Arc<FixedWindowRateLimiter>,
    config: Arc<MarketConfig>,
}

impl<R> CaseService<R>
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

    pub async fn open(
        &self,
        session: &Session,
        client: &ClientIdentity,
        order_id: OrderId,
        reason: String,
    ) -> MarketResult<Case> {
        require_user(session)?;
        let order = self
            .repo
            .find_order(order_id)
            .await?
            .ok_or(MarketError::NotFound("Order"))?;
        let buyer = authorize(session, Action::CaseOpen, Some(&order.owners()))?;

        if !order.allows_case() {
            return Err(MarketError::conflict(format!(
                "A case can only be opened on a shipped or completed order (order is {})",
                order.status
            )));
        }
        enforce_rate_limit(
            &self.limiter,
            &client.rate_limit_key("case_open"),
            &self.config.case_open_rate_limit,
        )?;

        let case = self
            .repo
            .open_case(&NewCase {
                order_id,
                buyer_id: buyer.id,
                seller_id: order.seller_id,
                reason,
            })
            .await?;

        tracing::info!(case_id = %case.id, order_id = %order_id, buyer_id = %buyer.id, "Case opened");
        notify(
            &*self.repo,
            case.seller_id,
            NotificationKind::CaseOpened,
            format!("The buyer opened a case on order #{order_id}"),
        )
        .await;
        Ok(case)
    }

    pub async fn list_mine(&self, session: &Session, page: Page) -> MarketResult<Vec<Case>> {
        let user = require_user(session)?;
        self.repo.list_cases_for_user(user.id, page).await
    }

    pub async fn get(&self, session: &Session, id: CaseId) -> MarketResult<(Case, Vec<CaseMessage>)> {
        require_user(session)?;
        let case = self.load(id).await?;
        authorize(session, Action::CaseView, Some(&case.owners()))?;

        let messages = self.repo.list_case_messages(id).await?;
        Ok((case, messages))
    }

    pub async fn reply(
        &self,
        session: &Session,
        client: &ClientIdentity,
        id: CaseId,
        body: String,
    ) -> MarketResult<CaseMessage> {
        require_user(session)?;
        let case = self.load(id).await?;
        let author = authorize(session, Action::CaseReply, Some(&case.owners()))?;
        case.ensure_open()?;
        enforce_rate_limit(
            &self.limiter,
            &client.rate_limit_key("message"),
            &self.config.message_rate_limit,
        )?;

        let message = self
            .repo
            .add_case_message(&NewCaseMessage {
                case_id: id,
                author_id: author.id,
                body,
            })
            .await?;

        for recipient in [case.buyer_id, case.seller_id] {
            if recipient != author.id {
                notify(
                    &*self.repo,
                    recipient,
                    NotificationKind::CaseMessage,
                    format!("New reply on case #{id}"),
                )
                .await;
            }
        }
        Ok(message)
    }

    pub async fn admin_list(
        &self,
        session: &Session,
        status: Option<CaseStatus>,
        page: Page,
    ) -> MarketResult<Vec<Case>> {
        authorize(session, Action::CaseResolve, None)?;
        self.repo.list_cases(status, page).await
    }

    pub async fn resolve(&self, session: &Session, id: CaseId, resolution: String) -> MarketResult<Case> {
        let admin = authorize(session, Action::CaseResolve, None)?;
        let mut case = self.load(id).await?;

        let previous = case.resolve(resolution)?;
        if !self.repo.update_case(&case, previous).await? {
            return Err(MarketError::conflict("Case was already resolved"));
        }

        tracing::info!(case_id = %id, admin_id = %admin.id, "Case resolved");
        for recipient in [case.buyer_id, case.seller_id] {
            notify(
                &*self.repo,
                recipient,
                NotificationKind::CaseResolved,
                format!("Case #{id} was resolved"),
            )
            .await;
        }
        Ok(case)
    }

    async fn load(&self, id: CaseId) -> MarketResult<Case> {
        self.repo
            .find_case(id)
            .await?
            .ok_or(MarketError::NotFound("Case"))
    }
}
