use super::Identity;
use crate::db::models::User;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Authenticated,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Anonymous,
    NotAdmin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(DenyReason),
}

/// Creating, editing and deleting posts.
pub const PUBLISH: &[Capability] = &[Capability::Authenticated, Capability::Admin];

/// Commenting and logging out.
pub const MEMBER: &[Capability] = &[Capability::Authenticated];

impl From<DenyReason> for AppError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::Anonymous => AppError::Unauthorized,
            DenyReason::NotAdmin => AppError::Forbidden,
        }
    }
}

/// Evaluates declared capabilities against an already resolved identity.
#[derive(Debug, Clone, Copy)]
pub struct Guard {
    admin_user_id: i64,
}

impl Guard {
    pub fn new(admin_user_id: i64) -> Self {
        Self { admin_user_id }
    }

    pub fn admin_user_id(&self) -> i64 {
        self.admin_user_id
    }

    /// Checks run in the order given; the first failure wins.
    pub fn authorize(&self, identity: &Identity, required: &[Capability]) -> Decision {
        for capability in required {
            if let Err(reason) = self.check(identity, *capability) {
                return Decision::Denied(reason);
            }
        }
        Decision::Allowed
    }

    fn check(&self, identity: &Identity, capability: Capability) -> Result<(), DenyReason> {
        let user = identity.user().ok_or(DenyReason::Anonymous)?;
        match capability {
            Capability::Authenticated => Ok(()),
            Capability::Admin if self.is_admin(user) => Ok(()),
            Capability::Admin => Err(DenyReason::NotAdmin),
        }
    }

    /// `authorize`, turned into the caller's user or the matching error.
    pub fn enforce<'a>(
        &self,
        identity: &'a Identity,
        required: &[Capability],
    ) -> Result<&'a User, AppError> {
        match self.authorize(identity, required) {
            Decision::Allowed => identity.user().ok_or(AppError::Unauthorized),
            Decision::Denied(reason) => {
                tracing::warn!(user_id = ?identity.user_id(), ?reason, "authorization denied");
                Err(reason.into())
            }
        }
    }

    pub fn require_authenticated<'a>(&self, identity: &'a Identity) -> Result<&'a User, AppError> {
        self.enforce(identity, MEMBER)
    }

    pub fn require_admin<'a>(&self, identity: &'a Identity) -> Result<&'a User, AppError> {
        self.enforce(identity, PUBLISH)
    }

    pub fn is_admin(&self, user: &User) -> bool {
        user.id == self.admin_user_id
    }

    /// Whether `identity` may create, edit or delete posts.
    pub fn can_publish(&self, identity: &Identity) -> bool {
        self.authorize(identity, PUBLISH) == Decision::Allowed
    }

    /// Render flag for the single-post view: the viewer wrote the post or is
    /// the admin. Wider than `can_publish`; an author who is not the admin
    /// sees the flag but still gets 403 on edit.
    pub fn is_owner_or_admin(&self, identity: &Identity, author_id: i64) -> bool {
        identity
            .user()
            .is_some_and(|u| u.id == author_id || self.is_admin(u))
    }
}
