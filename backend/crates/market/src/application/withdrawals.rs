//! Seller withdrawals of completed-order revenue

use std::sync::Arc;

use auth::{Action, Session, authorize};
use kernel::pagination::Page;

use crate::application::config::MarketConfig;
use crate::application::guard::{notify, require_user};
use crate::domain::entity::notification::NotificationKind;
use crate::domain::entity::withdrawal::{Balance, NewWithdrawal, Withdrawal, WithdrawalStatus};
use crate::domain::repository::MarketRepository;
use crate::domain::value_object::ids::WithdrawalId;
use crate::domain::value_object::money::Cents;
use crate::error::{MarketError, MarketResult};

pub struct WithdrawalService<R>
where
    R: MarketRepository,
{
    repo: Arc<R>,
    config: Arc<MarketConfig>,
}

impl<R> WithdrawalService<R>
where
    R: MarketRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<MarketConfig>) -> Self {
        Self { repo, config }
    }

    pub async fn balance(&self, session: &Session) -> MarketResult<Balance> {
        let user = require_user(session)?;
        self.repo.balance(user.id).await
    }

    pub async fn request(&self, session: &Session, amount: Cents) -> MarketResult<Withdrawal> {
        let seller = authorize(session, Action::WithdrawalRequest, None)?;

        if amount.get() < self.config.min_withdrawal_cents {
            return Err(MarketError::bad_input(format!(
                "Minimum withdrawal is {} cents",
                self.config.min_withdrawal_cents
            )));
        }

        let request = NewWithdrawal {
            seller_id: seller.id,
            amount,
        };
        match self.repo.request_withdrawal(&request).await? {
            Some(withdrawal) => {
                tracing::info!(withdrawal_id = %withdrawal.id, seller_id = %seller.id, amount_cents = amount.get(), "Withdrawal requested");
                Ok(withdrawal)
            }
            None => {
                let balance = self.repo.balance(seller.id).await?;
                Err(MarketError::InsufficientBalance {
                    available_cents: balance.available_cents,
                    requested_cents: amount.get(),
                })
            }
        }
    }

    pub async fn list_mine(&self, session: &Session, page: Page) -> MarketResult<Vec<Withdrawal>> {
        let user = require_user(session)?;
        self.repo.list_withdrawals_by_seller(user.id, page).await
    }

    pub async fn get(&self, session: &Session, id: WithdrawalId) -> MarketResult<Withdrawal> {
        require_user(session)?;
        let withdrawal = self.load(id).await?;
        authorize(session, Action::WithdrawalView, Some(&withdrawal.owners()))?;
        Ok(withdrawal)
    }

    pub async fn admin_list(
        &self,
        session: &Session,
        status: Option<WithdrawalStatus>,
        page: Page,
    ) -> MarketResult<Vec<Withdrawal>> {
        authorize(session, Action::WithdrawalProcess, None)?;
        self.repo.list_withdrawals(status, page).await
    }

    pub async fn approve(&self, session: &Session, id: WithdrawalId, note: Option<String>) -> MarketResult<Withdrawal> {
        self.process(session, id, WithdrawalStatus::Approved, note).await
    }

    pub async fn reject(&self, session: &Session, id: WithdrawalId, note: String) -> MarketResult<Withdrawal> {
        self.process(session, id, WithdrawalStatus::Rejected, Some(note)).await
    }

    async fn process(
        &self,
        session: &Session,
        id: WithdrawalId,
        to: WithdrawalStatus,
        note: Option<String>,
    ) -> MarketResult<Withdrawal> {
        let admin = authorize(session, Action::WithdrawalProcess, None)?;
        let mut withdrawal = self.load(id).await?;

        let previous = withdrawal.process(to, note)?;
        if !self.repo.update_withdrawal(&withdrawal, previous).await? {
            return Err(MarketError::conflict("Withdrawal was already processed"));
        }

        tracing::info!(withdrawal_id = %id, admin_id = %admin.id, status = %to, "Withdrawal processed");
        let message = match to {
            WithdrawalStatus::Approved => format!(
                "Your withdrawal of {} cents was approved",
                withdrawal.amount.get()
            ),
            _ => format!(
                "Your withdrawal of {} cents was rejected{}",
                withdrawal.amount.get(),
                withdrawal
                    .admin_note
                    .as_deref()
                    .map(|n| format!(": {n}"))
                    .unwrap_or_default()
            ),
        };
        notify(&*self.repo, withdrawal.seller_id, NotificationKind::WithdrawalProcessed, message).await;
        Ok(withdrawal)
    }

    async fn load(&self, id: WithdrawalId) -> MarketResult<Withdrawal> {
        self.repo
            .find_withdrawal(id)
            .await?
            .ok_or(MarketError::NotFound("Withdrawal"))
    }
}
