//! Allow/deny decisions for an acting user

use super::permission::{Action, Permission, PermissionSet, ResourceKind};
use crate::errors::{AppError, Result};
use crate::metrics;

/// An authenticated user together with the union of their role grants
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: i64,
    permissions: PermissionSet,
}

impl Actor {
    pub fn new(user_id: i64, permissions: PermissionSet) -> Self {
        Self { user_id, permissions }
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    fn holds(&self, resource: ResourceKind, action: Action) -> bool {
        self.permissions.contains(Permission::new(resource, action))
    }
}

/// Can the actor perform `action` on resources of this kind?
///
/// Guests (`None`) are denied without looking at any grant.
pub fn can(actor: Option<&Actor>, resource: ResourceKind, action: Action) -> bool {
    let Some(actor) = actor else {
        return false;
    };
    actor.holds(resource, action)
}

/// Like [`can`], for an action on a specific record.
///
/// A user may never delete their own account, whatever their roles grant.
pub fn can_on_record(
    actor: Option<&Actor>,
    resource: ResourceKind,
    action: Action,
    record_id: i64,
) -> bool {
    let Some(actor) = actor else {
        return false;
    };

    if !actor.holds(resource, action) {
        return false;
    }

    !(resource == ResourceKind::User && action == Action::Delete && record_id == actor.user_id)
}

/// [`can`] as a `Result`, for handlers
pub fn require(actor: Option<&Actor>, resource: ResourceKind, action: Action) -> Result<()> {
    let allowed = can(actor, resource, action);
    metrics::record_authorization(resource.as_str(), action.as_str(), allowed);
    if allowed {
        Ok(())
    } else {
        Err(denied(actor, resource, action))
    }
}

/// [`can_on_record`] as a `Result`, for handlers
pub fn require_on_record(
    actor: Option<&Actor>,
    resource: ResourceKind,
    action: Action,
    record_id: i64,
) -> Result<()> {
    let allowed = can_on_record(actor, resource, action, record_id);
    metrics::record_authorization(resource.as_str(), action.as_str(), allowed);
    if allowed {
        Ok(())
    } else {
        Err(denied(actor, resource, action))
    }
}

fn denied(actor: Option<&Actor>, resource: ResourceKind, action: Action) -> AppError {
    let permission = Permission::new(resource, action);
    match actor {
        None => AppError::Unauthorized {
            message: "Authentication required".to_string(),
        },
        Some(actor) => {
            tracing::info!(user_id = actor.user_id, permission = %permission, "Access denied");
            AppError::Forbidden {
                message: format!("{} is not permitted", permission),
            }
        }
    }
}
