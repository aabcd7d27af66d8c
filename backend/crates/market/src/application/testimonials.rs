//! Site testimonials, published after moderation

use std::sync::Arc;

use auth::{Action, Session, SessionUser, authorize};
use kernel::pagination::Page;

use crate::domain::entity::testimonial::{NewTestimonial, Testimonial, TestimonialStatus};
use crate::domain::repository::MarketRepository;
use crate::domain::value_object::ids::TestimonialId;
use crate::error::{MarketError, MarketResult};

pub struct TestimonialService<R>
where
    R: MarketRepository,
{
    repo: Arc<R>,
}

impl<R> TestimonialService<R>
where
    R: MarketRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn list_public(&self, page: Page) -> MarketResult<Vec<Testimonial>> {
        self.repo
            .list_testimonials(Some(TestimonialStatus::Published), page)
            .await
    }

    pub async fn create(&self, session: &Session, body: String) -> MarketResult<Testimonial> {
        let author = authorize(session, Action::TestimonialCreate, None)?;

        let testimonial = self
            .repo
            .create_testimonial(&NewTestimonial {
                author_id: author.id,
                author_name: display_name(author),
                body,
            })
            .await?;

        tracing::info!(testimonial_id = %testimonial.id, author_id = %author.id, "Testimonial submitted");
        Ok(testimonial)
    }

    pub async fn admin_list(
        &self,
        session: &Session,
        status: Option<TestimonialStatus>,
        page: Page,
    ) -> MarketResult<Vec<Testimonial>> {
        authorize(session, Action::TestimonialModerate, None)?;
        self.repo.list_testimonials(status, page).await
    }

    pub async fn publish(&self, session: &Session, id: TestimonialId) -> MarketResult<Testimonial> {
        self.moderate(session, id, TestimonialStatus::Published).await
    }

    pub async fn hide(&self, session: &Session, id: TestimonialId) -> MarketResult<Testimonial> {
        self.moderate(session, id, TestimonialStatus::Hidden).await
    }

    pub async fn delete(&self, session: &Session, id: TestimonialId) -> MarketResult<()> {
        let admin = authorize(session, Action::TestimonialModerate, None)?;
        if !self.repo.delete_testimonial(id).await? {
            return Err(MarketError::NotFound("Testimonial"));
        }
        tracing::info!(testimonial_id = %id, admin_id = %admin.id, "Testimonial deleted");
        Ok(())
    }

    async fn moderate(&self, session: &Session, id: TestimonialId, to: TestimonialStatus) -> MarketResult<Testimonial> {
        let admin = authorize(session, Action::TestimonialModerate, None)?;
        let mut testimonial = self
            .repo
            .find_testimonial(id)
            .await?
            .ok_or(MarketError::NotFound("Testimonial"))?;

        let previous = testimonial.moderate(to)?;
        if !self.repo.update_testimonial(&testimonial, previous).await? {
            return Err(MarketError::conflict("Testimonial changed in the meantime, reload and retry"));
        }

        tracing::info!(testimonial_id = %id, admin_id = %admin.id, status = %to, "Testimonial moderated");
        Ok(testimonial)
    }
}

/// Profile name, or the local part of the email
fn display_name(user: &SessionUser) -> String {
    match user.name.as_deref() {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => user
            .email
            .split('@')
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth::UserId;
    use auth::domain::value_object::user_role::UserRole;

    #[test]
    fn test_display_name_falls_back_to_email() {
        let mut user = SessionUser {
            id: UserId::from_db(1),
            email: "lea.martin@example.com".into(),
            name: None,
            role: UserRole::User,
        };
        assert_eq!(display_name(&user), "lea.martin");

        user.name = Some("  Léa  ".into());
        assert_eq!(display_name(&user), "Léa");
    }
}
