//! Role-based access control
//!
//! Provides:
//! - Typed `resource.action` permission names
//! - Per-user permission sets (union over roles)
//! - Allow/deny evaluation, including the self-delete rule for users

mod evaluator;
mod permission;

pub use evaluator::{can, can_on_record, require, require_on_record, Actor};
pub use permission::{permission_catalogue, Action, Permission, PermissionSet, ResourceKind};
