//! Resolves the calling user's grants for permission checks

use axum::{extract::FromRequestParts, http::request::Parts};
use paperdesk_common::{
    auth::AuthContext,
    errors::{AppError, Result},
    rbac::{self, Action, Actor, ResourceKind},
};

use crate::AppState;

/// The acting user with their permission set, `None` for guests.
///
/// A valid token whose user no longer exists also yields a guest.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Option<Actor>);

impl CurrentActor {
    pub fn actor(&self) -> Option<&Actor> {
        self.0.as_ref()
    }

    /// Deny unless the actor holds `resource.action`
    pub fn require(&self, resource: ResourceKind, action: Action) -> Result<&Actor> {
        rbac::require(self.actor(), resource, action)?;
        self.authenticated()
    }

    /// Deny unless the actor may perform `action` on record `record_id`
    pub fn require_on_record(
        &self,
        resource: ResourceKind,
        action: Action,
        record_id: i64,
    ) -> Result<&Actor> {
        rbac::require_on_record(self.actor(), resource, action, record_id)?;
        self.authenticated()
    }

    fn authenticated(&self) -> Result<&Actor> {
        self.actor().ok_or_else(|| AppError::Unauthorized {
            message: "Authentication required".to_string(),
        })
    }
}

impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let auth = AuthContext::from_request_parts(parts, state).await?;

        let actor = match auth.user_id {
            Some(user_id) => state.repo.load_actor(user_id).await?,
            None => None,
        };

        if let Some(actor) = &actor {
            tracing::debug!(
                user_id = actor.user_id,
                request_id = %auth.request_id,
                permissions = actor.permissions().len(),
                "Actor resolved"
            );
        }

        Ok(CurrentActor(actor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperdesk_common::rbac::PermissionSet;
    use tokio_test::assert_ok;

    fn actor(id: i64, names: &[&str]) -> CurrentActor {
        CurrentActor(Some(Actor::new(id, PermissionSet::from_names(names.iter().copied()))))
    }

    #[test]
    fn test_guest_is_unauthorized() {
        let guest = CurrentActor(None);
        let err = guest.require(ResourceKind::Paper, Action::ViewAny).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));
    }

    #[test]
    fn test_missing_grant_is_forbidden() {
        let current = actor(3, &["paper.view"]);
        assert_ok!(current.require(ResourceKind::Paper, Action::View));

        let err = current.require(ResourceKind::Paper, Action::Delete).unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));
    }

    #[test]
    fn test_self_delete_is_forbidden() {
        let current = actor(3, &["user.delete"]);
        assert_ok!(current.require_on_record(ResourceKind::User, Action::Delete, 4));

        let err = current
            .require_on_record(ResourceKind::User, Action::Delete, 3)
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));
    }
}
