use chrono::{DateTime, Utc};

use crate::domain::value_object::ids::{TestimonialId, UserId};
use crate::error::{MarketError, MarketResult};

coded_enum! {
    TestimonialStatus {
        Pending => "PENDING",
        Published => "PUBLISHED",
        Hidden => "HIDDEN",
    }
}

/// Site-wide customer feedback shown on the storefront once published
#[derive(Debug, Clone)]
pub struct Testimonial {
    pub id: TestimonialId,
    pub author_id: UserId,
    pub author_name: String,
    pub body: String,
    pub status: TestimonialStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTestimonial {
    pub author_id: UserId,
    pub author_name: String,
    pub body: String,
}

impl Testimonial {
    pub fn moderate(&mut self, to: TestimonialStatus) -> MarketResult<TestimonialStatus> {
        let previous = self.status;
        if to == TestimonialStatus::Pending || previous == to {
            return Err(MarketError::conflict(format!(
                "Testimonial cannot move from {previous} to {to}"
            )));
        }
        self.status = to;
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moderation() {
        let mut t = Testimonial {
            id: TestimonialId::from_db(1),
            author_id: UserId::from_db(1),
            author_name: "Léa".into(),
            body: "Smooth purchase, fast shipping".into(),
            status: TestimonialStatus::Pending,
            created_at: Utc::now(),
        };
        assert!(t.moderate(TestimonialStatus::Published).is_ok());
        assert!(t.moderate(TestimonialStatus::Published).is_err());
        assert!(t.moderate(TestimonialStatus::Hidden).is_ok());
        assert!(t.moderate(TestimonialStatus::Pending).is_err());
        assert!(t.moderate(TestimonialStatus::Published).is_ok());
    }
}
