//! Authorization Guard
//!
//! One table decides who may perform each protected action. Handlers resolve
//! the session, look the target record up, then ask [`authorize`] with the
//! record's owners.
//!
//! Entries differ on purpose: some owner-gated actions let an admin through,
//! others do not, and some answer a foreign caller with `NotFound` rather than
//! `Forbidden`. Those differences are product behaviour and stay explicit here.

use derive_more::Display;
use thiserror::Error;

use crate::domain::entity::session::{Session, SessionUser};
use crate::domain::value_object::user_id::UserId;

/// Why a request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessDenied {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("You are not allowed to perform this action")]
    Forbidden,

    #[error("Resource not found")]
    NotFound,
}

/// Which owner field of a record the caller must match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Buyer,
    Seller,
    BuyerOrSeller,
    /// Single-owner records (withdrawals, reviews, notifications)
    Owner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Any logged-in user
    Authenticated,
    /// `ADMIN` role only
    Admin,
    Owner {
        relation: Relation,
        admin_override: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub requirement: Requirement,
    /// Answer given to a logged-in caller who fails the requirement
    pub foreign_denial: AccessDenied,
}

impl Policy {
    const fn authenticated() -> Self {
        Self {
            requirement: Requirement::Authenticated,
            foreign_denial: AccessDenied::Forbidden,
        }
    }

    const fn admin() -> Self {
        Self {
            requirement: Requirement::Admin,
            foreign_denial: AccessDenied::Forbidden,
        }
    }

    const fn owner(relation: Relation, admin_override: bool, foreign_denial: AccessDenied) -> Self {
        Self {
            requirement: Requirement::Owner {
                relation,
                admin_override,
            },
            foreign_denial,
        }
    }
}

/// Protected operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Action {
    ListingCreate,
    /// Reading a listing that is not (yet) public
    ListingViewUnpublished,
    ListingUpdate,
    ListingDelete,
    ListingModerate,

    OrderPlace,
    OrderView,
    OrderShip,
    OrderConfirmReceipt,
    OrderCancel,
    OrderRefund,

    ConversationOpen,
    ConversationView,
    ConversationPost,
    ConversationModerate,

    WithdrawalRequest,
    WithdrawalView,
    WithdrawalProcess,

    CaseOpen,
    CaseView,
    CaseReply,
    CaseResolve,

    ReviewCreate,
    ReviewDelete,

    TestimonialCreate,
    TestimonialModerate,

    NotificationRead,

    UserManage,
    PresenceStats,
}

impl Action {
    pub const fn policy(self) -> Policy {
        use AccessDenied::{Forbidden, NotFound};
        use Action::*;
        use Relation::*;

        match self {
            ListingCreate | OrderPlace | ConversationOpen | WithdrawalRequest
            | TestimonialCreate => Policy::authenticated(),

            ListingViewUnpublished => Policy::owner(Seller, true, NotFound),
            ListingUpdate | ListingDelete => Policy::owner(Seller, true, Forbidden),

            OrderView => Policy::owner(BuyerOrSeller, true, Forbidden),
            OrderShip => Policy::owner(Seller, false, Forbidden),
            OrderConfirmReceipt => Policy::owner(Buyer, false, Forbidden),
            OrderCancel => Policy::owner(BuyerOrSeller, true, Forbidden),

            ConversationView => Policy::owner(BuyerOrSeller, true, NotFound),
            ConversationPost => Policy::owner(BuyerOrSeller, false, NotFound),

            WithdrawalView => Policy::owner(Owner, true, NotFound),

            CaseOpen => Policy::owner(Buyer, false, Forbidden),
            CaseView | CaseReply => Policy::owner(BuyerOrSeller, true, Forbidden),

            ReviewCreate => Policy::owner(Buyer, false, Forbidden),
            ReviewDelete => Policy::owner(Owner, true, Forbidden),

            NotificationRead => Policy::owner(Owner, false, NotFound),

            ListingModerate | OrderRefund | ConversationModerate | WithdrawalProcess
            | CaseResolve | TestimonialModerate | UserManage | PresenceStats => Policy::admin(),
        }
    }
}

/// Owner fields of the record being acted on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceOwners {
    pub buyer_id: Option<UserId>,
    pub seller_id: Option<UserId>,
    pub owner_id: Option<UserId>,
}

impl ResourceOwners {
    pub fn trade(buyer_id: UserId, seller_id: UserId) -> Self {
        Self {
            buyer_id: Some(buyer_id),
            seller_id: Some(seller_id),
            owner_id: None,
        }
    }

    pub fn seller(seller_id: UserId) -> Self {
        Self {
            seller_id: Some(seller_id),
            ..Self::default()
        }
    }

    pub fn owned_by(owner_id: UserId) -> Self {
        Self {
            owner_id: Some(owner_id),
            ..Self::default()
        }
    }

    fn matches(&self, relation: Relation, user_id: UserId) -> bool {
        let is = |field: Option<UserId>| field == Some(user_id);
        match relation {
            Relation::Buyer => is(self.buyer_id),
            Relation::Seller => is(self.seller_id),
            Relation::BuyerOrSeller => is(self.buyer_id) || is(self.seller_id),
            Relation::Owner => is(self.owner_id),
        }
    }
}

/// Decide whether `session` may perform `action` on a record owned by `owners`
///
/// Owner-gated actions need `owners`; without it only the admin override
/// can succeed.
pub fn authorize<'a>(
    session: &'a Session,
    action: Action,
    owners: Option<&ResourceOwners>,
) -> Result<&'a SessionUser, AccessDenied> {
    let user = session.user().ok_or(AccessDenied::Unauthenticated)?;
    let policy = action.policy();

    let allowed = match policy.requirement {
        Requirement::Authenticated => true,
        Requirement::Admin => user.is_admin(),
        Requirement::Owner {
            relation,
            admin_override,
        } => {
            (admin_override && user.is_admin())
                || owners.is_some_and(|o| o.matches(relation, user.id))
        }
    };

    if allowed {
        Ok(user)
    } else {
        tracing::debug!(user_id = %user.id, %action, "Access denied");
        Err(policy.foreign_denial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::user_role::UserRole;

    fn session(id: i64, role: UserRole) -> Session {
        Session::authenticated(SessionUser {
            id: UserId::from_db(id),
            email: format!("u{id}@example.com"),
            name: None,
            role,
        })
    }

    const ALL_ACTIONS: &[Action] = &[
        Action::ListingCreate,
        Action::ListingViewUnpublished,
        Action::ListingUpdate,
        Action::ListingDelete,
        Action::ListingModerate,
        Action::OrderPlace,
        Action::OrderView,
        Action::OrderShip,
        Action::OrderConfirmReceipt,
        Action::OrderCancel,
        Action::OrderRefund,
        Action::ConversationOpen,
        Action::ConversationView,
        Action::ConversationPost,
        Action::ConversationModerate,
        Action::WithdrawalRequest,
        Action::WithdrawalView,
        Action::WithdrawalProcess,
        Action::CaseOpen,
        Action::CaseView,
        Action::CaseReply,
        Action::CaseResolve,
        Action::ReviewCreate,
        Action::ReviewDelete,
        Action::TestimonialCreate,
        Action::TestimonialModerate,
        Action::NotificationRead,
        Action::UserManage,
        Action::PresenceStats,
    ];

    #[test]
    fn test_anonymous_is_always_unauthenticated() {
        let anon = Session::anonymous();
        let owners = ResourceOwners::trade(UserId::from_db(1), UserId::from_db(2));
        for &action in ALL_ACTIONS {
            assert_eq!(
                authorize(&anon, action, Some(&owners)),
                Err(AccessDenied::Unauthenticated),
                "{action}"
            );
        }
    }

    #[test]
    fn test_admin_gated_actions_reject_users() {
        let user = session(1, UserRole::User);
        let admin = session(2, UserRole::Admin);
        for &action in ALL_ACTIONS {
            if action.policy().requirement != Requirement::Admin {
                continue;
            }
            assert_eq!(authorize(&user, action, None), Err(AccessDenied::Forbidden), "{action}");
            assert!(authorize(&admin, action, None).is_ok(), "{action}");
        }
    }

    #[test]
    fn test_stranger_is_denied_owner_gated_actions() {
        let stranger = session(99, UserRole::User);
        let owners = ResourceOwners {
            buyer_id: Some(UserId::from_db(1)),
            seller_id: Some(UserId::from_db(2)),
            owner_id: Some(UserId::from_db(3)),
        };
        for &action in ALL_ACTIONS {
            let policy = action.policy();
            if let Requirement::Owner { .. } = policy.requirement {
                assert_eq!(
                    authorize(&stranger, action, Some(&owners)),
                    Err(policy.foreign_denial),
                    "{action}"
                );
            }
        }
    }

    #[test]
    fn test_relations() {
        let owners = ResourceOwners::trade(UserId::from_db(1), UserId::from_db(2));
        let buyer = session(1, UserRole::User);
        let seller = session(2, UserRole::User);

        assert!(authorize(&buyer, Action::OrderConfirmReceipt, Some(&owners)).is_ok());
        assert_eq!(
            authorize(&seller, Action::OrderConfirmReceipt, Some(&owners)),
            Err(AccessDenied::Forbidden)
        );
        assert!(authorize(&seller, Action::OrderShip, Some(&owners)).is_ok());
        assert_eq!(
            authorize(&buyer, Action::OrderShip, Some(&owners)),
            Err(AccessDenied::Forbidden)
        );
        assert!(authorize(&buyer, Action::OrderView, Some(&owners)).is_ok());
        assert!(authorize(&seller, Action::OrderView, Some(&owners)).is_ok());
    }

    #[test]
    fn test_admin_override_is_per_action() {
        let admin = session(50, UserRole::Admin);
        let owners = ResourceOwners::trade(UserId::from_db(1), UserId::from_db(2));

        assert!(authorize(&admin, Action::OrderView, Some(&owners)).is_ok());
        assert!(authorize(&admin, Action::OrderCancel, Some(&owners)).is_ok());
        assert!(authorize(&admin, Action::ConversationView, Some(&owners)).is_ok());

        assert_eq!(
            authorize(&admin, Action::OrderShip, Some(&owners)),
            Err(AccessDenied::Forbidden)
        );
        assert_eq!(
            authorize(&admin, Action::ConversationPost, Some(&owners)),
            Err(AccessDenied::NotFound)
        );
        assert_eq!(
            authorize(&admin, Action::NotificationRead, Some(&ResourceOwners::owned_by(UserId::from_db(1)))),
            Err(AccessDenied::NotFound)
        );
    }

    #[test]
    fn test_owner_without_record_only_admin_override() {
        let user = session(1, UserRole::User);
        let admin = session(2, UserRole::Admin);
        assert_eq!(authorize(&user, Action::OrderView, None), Err(AccessDenied::Forbidden));
        assert!(authorize(&admin, Action::OrderView, None).is_ok());
        assert_eq!(authorize(&admin, Action::OrderShip, None), Err(AccessDenied::Forbidden));
    }

    #[test]
    fn test_authenticated_actions_allow_any_user() {
        let user = session(1, UserRole::User);
        let granted = authorize(&user, Action::ListingCreate, None).unwrap();
        assert_eq!(granted.id, UserId::from_db(1));
    }
}
