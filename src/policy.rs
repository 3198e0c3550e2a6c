use uuid::Uuid;

use crate::dtos::PostDto;

/// Outcome of an authorization predicate. Handlers evaluate these
/// before touching the store and map `Denied` onto a 401/403 or a
/// browser redirect, so the rules live in one place instead of being
/// buried in per-route control flow.
#[derive(Debug, Clone, PartialEq)]
pub enum Access {
    Allowed,
    Denied(DenyReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DenyReason {
    /// No authenticated identity where one is required.
    Unauthenticated,
    /// Identity present but not the post's owner.
    NotOwner,
    /// Post is private and the requester is not the owner.
    PrivatePost,
    /// Account exists but its email was never confirmed.
    Unconfirmed,
}

/// Password login requires a confirmed account. The gate applies after
/// credential verification, so a correct password on an unconfirmed
/// account is still denied.
pub fn can_login(confirmed: bool) -> Access {
    if confirmed {
        Access::Allowed
    } else {
        Access::Denied(DenyReason::Unconfirmed)
    }
}

/// A public post is readable by anyone, including anonymous visitors.
/// A private post is readable only by its owner.
pub fn can_view_post(requester: Option<Uuid>, post: &PostDto) -> Access {
    if post.is_public || requester == Some(post.author_id) {
        Access::Allowed
    } else {
        Access::Denied(DenyReason::PrivatePost)
    }
}

/// Edit and delete are owner-only.
pub fn can_modify_post(requester: Option<Uuid>, post: &PostDto) -> Access {
    match requester {
        None => Access::Denied(DenyReason::Unauthenticated),
        Some(user_id) if user_id == post.author_id => Access::Allowed,
        Some(_) => Access::Denied(DenyReason::NotOwner),
    }
}

/// Commenting requires an authenticated identity and a public post.
/// The owner may comment on their own private post.
pub fn can_comment(requester: Option<Uuid>, post: &PostDto) -> Access {
    match requester {
        None => Access::Denied(DenyReason::Unauthenticated),
        Some(user_id) => {
            if post.is_public || user_id == post.author_id {
                Access::Allowed
            } else {
                Access::Denied(DenyReason::PrivatePost)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn post(author_id: Uuid, is_public: bool) -> PostDto {
        PostDto {
            id: 1,
            title: "Hi".to_string(),
            content: "Body".to_string(),
            timestamp: Utc::now(),
            author: "Ann".to_string(),
            author_id,
            is_public,
        }
    }

    #[test]
    fn anyone_views_public_posts() {
        let owner = Uuid::new_v4();
        let p = post(owner, true);
        assert_eq!(can_view_post(None, &p), Access::Allowed);
        assert_eq!(can_view_post(Some(Uuid::new_v4()), &p), Access::Allowed);
    }

    #[test]
    fn private_post_is_owner_only() {
        let owner = Uuid::new_v4();
        let p = post(owner, false);
        assert_eq!(can_view_post(Some(owner), &p), Access::Allowed);
        assert_eq!(
            can_view_post(Some(Uuid::new_v4()), &p),
            Access::Denied(DenyReason::PrivatePost)
        );
        assert_eq!(
            can_view_post(None, &p),
            Access::Denied(DenyReason::PrivatePost)
        );
    }

    #[test]
    fn only_owner_modifies() {
        let owner = Uuid::new_v4();
        let p = post(owner, true);
        assert_eq!(can_modify_post(Some(owner), &p), Access::Allowed);
        assert_eq!(
            can_modify_post(Some(Uuid::new_v4()), &p),
            Access::Denied(DenyReason::NotOwner)
        );
        assert_eq!(
            can_modify_post(None, &p),
            Access::Denied(DenyReason::Unauthenticated)
        );
    }

    #[test]
    fn unconfirmed_account_cannot_log_in() {
        // Holds even when the password already checked out.
        assert_eq!(can_login(false), Access::Denied(DenyReason::Unconfirmed));
        assert_eq!(can_login(true), Access::Allowed);
    }

    #[test]
    fn commenting_needs_identity_and_public_post() {
        let owner = Uuid::new_v4();
        let public = post(owner, true);
        let private = post(owner, false);

        assert_eq!(
            can_comment(None, &public),
            Access::Denied(DenyReason::Unauthenticated)
        );
        assert_eq!(can_comment(Some(Uuid::new_v4()), &public), Access::Allowed);
        assert_eq!(
            can_comment(Some(Uuid::new_v4()), &private),
            Access::Denied(DenyReason::PrivatePost)
        );
        // The owner may still comment under their own private post.
        assert_eq!(can_comment(Some(owner), &private), Access::Allowed);
    }
}
