//! Permission checking and access control logic.
//!
//! Authorization combines four signals: the admin flag, the subscription
//! tier, the creator flag, and resource ownership. Ownership itself is
//! checked at the handler level (the handler knows which row it fetched);
//! this module answers the role-shaped questions.

use crate::api::models::users::{CurrentUser, SubscriptionTier};
use crate::errors::{Error, Result};
use crate::types::{Operation, Permission, Resource};

/// Whether the user is an administrator. The admin tier and the account
/// flag are equivalent.
pub fn is_admin(user: &CurrentUser) -> bool {
    user.is_admin || user.subscription_tier == SubscriptionTier::Admin
}

/// Check whether the user holds (resource, operation).
pub fn has_permission(user: &CurrentUser, resource: Resource, operation: Operation) -> bool {
    if is_admin(user) {
        return true;
    }

    use Operation::*;
    match (resource, operation) {
        // Everyone operates on their own stories, chapters, and reports
        (Resource::Stories, CreateOwn | ReadOwn | UpdateOwn) => true,
        (Resource::Chapters, CreateOwn | ReadOwn) => true,
        (Resource::Credits, ReadOwn) => true,
        (Resource::Analytics, ReadOwn) => true,
        (Resource::ErrorReports, CreateOwn) => true,
        // Earnings are gated on the creator flag
        (Resource::Earnings, ReadOwn) => user.is_creator,
        // Everything *All is admin-only, as is user management
        _ => false,
    }
}

/// Require a permission, mapping refusal to a 403.
pub fn require(user: &CurrentUser, resource: Resource, operation: Operation) -> Result<()> {
    if has_permission(user, resource, operation) {
        return Ok(());
    }

    Err(Error::InsufficientPermissions {
        required: Permission::Allow(resource, operation),
        action: operation,
        resource: resource.to_string(),
    })
}

/// Require administrator access.
pub fn require_admin(user: &CurrentUser) -> Result<()> {
    if is_admin(user) {
        return Ok(());
    }

    Err(Error::InsufficientPermissions {
        required: Permission::Granted,
        action: Operation::ReadAll,
        resource: "admin resource".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(tier: SubscriptionTier, is_creator: bool, admin_flag: bool) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            display_name: None,
            is_admin: admin_flag,
            subscription_tier: tier,
            is_creator,
        }
    }

    #[test]
    fn test_standard_user_owns_their_stories() {
        let u = user(SubscriptionTier::Free, false, false);
        assert!(has_permission(&u, Resource::Stories, Operation::CreateOwn));
        assert!(has_permission(&u, Resource::Stories, Operation::ReadOwn));
        assert!(!has_permission(&u, Resource::Stories, Operation::ReadAll));
    }

    #[test]
    fn test_earnings_require_creator_flag() {
        let reader = user(SubscriptionTier::Premium, false, false);
        assert!(!has_permission(&reader, Resource::Earnings, Operation::ReadOwn));

        let creator = user(SubscriptionTier::Free, true, false);
        assert!(has_permission(&creator, Resource::Earnings, Operation::ReadOwn));
    }

    #[test]
    fn test_admin_tier_and_flag_are_equivalent() {
        let by_tier = user(SubscriptionTier::Admin, false, false);
        let by_flag = user(SubscriptionTier::Free, false, true);

        for u in [by_tier, by_flag] {
            assert!(is_admin(&u));
            assert!(has_permission(&u, Resource::Stories, Operation::ReadAll));
            assert!(has_permission(&u, Resource::Credits, Operation::CreateAll));
            assert!(has_permission(&u, Resource::Earnings, Operation::ReadOwn));
        }
    }

    #[test]
    fn test_credit_grants_are_admin_only() {
        let u = user(SubscriptionTier::Premium, true, false);
        assert!(!has_permission(&u, Resource::Credits, Operation::CreateAll));
        assert!(require(&u, Resource::Credits, Operation::CreateAll).is_err());
    }

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&user(SubscriptionTier::Admin, false, false)).is_ok());
        let err = require_admin(&user(SubscriptionTier::Free, false, false)).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
    }
}
