//! Users, roles and permission grants

use super::{ensure_deleted, not_found, now, Repository, TitleFields};
use crate::auth::{hash_password, verify_password};
use crate::db::models::*;
use crate::errors::{AppError, Result};
use crate::rbac::{permission_catalogue, Actor, PermissionSet};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, Statement, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info};
use validator::Validate;

/// Input for creating a user
#[derive(Debug, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    pub mobile: Option<String>,

    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Outcome of seeding the permission catalogue
#[derive(Debug, Clone, Serialize)]
pub struct SeedReport {
    pub role_id: i64,
    pub permissions_created: usize,
    pub grants_added: usize,
}

/// Distinct permission names granted to a user through any role
const USER_PERMISSIONS_SQL: &str = r#"
    SELECT DISTINCT p.name
    FROM permissions p
    JOIN permission_role pr ON pr.permission_id = p.id
    JOIN role_user ru ON ru.role_id = pr.role_id
    WHERE ru.user_id = $1
"#;

impl Repository {
    // ========================================================================
    // Actors
    // ========================================================================

    /// Permission names held by a user, deduplicated across roles
    pub async fn permission_names_for_user(&self, user_id: i64) -> Result<Vec<String>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            USER_PERMISSIONS_SQL,
            [user_id.into()],
        );

        self.conn()
            .query_all(stmt)
            .await?
            .iter()
            .map(|row| row.try_get::<String>("", "name").map_err(Into::into))
            .collect()
    }

    /// Load a user with their effective permissions. Unknown users yield
    /// `None` and are treated as guests by callers.
    pub async fn load_actor(&self, user_id: i64) -> Result<Option<Actor>> {
        if self.find_user(user_id).await?.is_none() {
            return Ok(None);
        }

        let names = self.permission_names_for_user(user_id).await?;
        let permissions = PermissionSet::from_names(names);
        debug!(user_id, permissions = permissions.len(), "Actor loaded");

        Ok(Some(Actor::new(user_id, permissions)))
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    /// Check credentials, returning the user on success
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let user = self
            .find_user_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash) {
            return Err(AppError::InvalidCredentials);
        }

        Ok(user)
    }

    pub async fn find_user(&self, id: i64) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    pub async fn get_user(&self, id: i64) -> Result<User> {
        self.find_user(id)
            .await?
            .ok_or(AppError::UserNotFound { id })
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::Email.eq(email))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// List users with pagination (0-based page)
    pub async fn list_users(&self, page: u64, per_page: u64) -> Result<(Vec<User>, u64)> {
        let paginator = UserEntity::find()
            .order_by_asc(UserColumn::Id)
            .paginate(self.conn(), per_page);

        let total = paginator.num_items().await?;
        let users = paginator.fetch_page(page).await?;

        Ok((users, total))
    }

    /// Create a user, hashing the password
    pub async fn create_user(&self, input: NewUser) -> Result<User> {
        let password_hash = hash_password(&input.password)?;

        let user = UserActiveModel {
            name: Set(input.name),
            email: Set(input.email),
            mobile: Set(input.mobile),
            password_hash: Set(password_hash),
            created_at: Set(now()),
            updated_at: Set(now()),
            ..Default::default()
        };

        let user = user.insert(self.conn()).await?;
        info!(user_id = user.id, "User created");
        Ok(user)
    }

    pub async fn delete_user(&self, id: i64) -> Result<()> {
        let result = UserEntity::delete_by_id(id).exec(self.conn()).await?;
        ensure_deleted(result, "user", id)
    }

    /// Roles assigned to a user
    pub async fn user_roles(&self, user_id: i64) -> Result<Vec<Role>> {
        let user = self.get_user(user_id).await?;
        user.find_related(RoleEntity)
            .order_by_asc(RoleColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Replace a user's role assignments
    pub async fn set_user_roles(&self, user_id: i64, role_ids: &[i64]) -> Result<Vec<Role>> {
        let wanted: BTreeSet<i64> = role_ids.iter().copied().collect();
        let txn = self.conn().begin().await?;

        if UserEntity::find_by_id(user_id).one(&txn).await?.is_none() {
            return Err(AppError::UserNotFound { id: user_id });
        }

        let known = RoleEntity::find()
            .filter(RoleColumn::Id.is_in(wanted.iter().copied()))
            .count(&txn)
            .await?;
        if known != wanted.len() as u64 {
            return Err(AppError::Validation {
                message: "One or more roles do not exist".to_string(),
                field: Some("role_ids".to_string()),
            });
        }

        RoleUserEntity::delete_many()
            .filter(RoleUserColumn::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        if !wanted.is_empty() {
            RoleUserEntity::insert_many(wanted.iter().map(|role_id| RoleUserActiveModel {
                user_id: Set(user_id),
                role_id: Set(*role_id),
            }))
            .exec_without_returning(&txn)
            .await?;
        }

        txn.commit().await?;
        info!(user_id, roles = wanted.len(), "User roles replaced");

        self.user_roles(user_id).await
    }

    // ========================================================================
    // Role Operations
    // ========================================================================

    pub async fn list_roles(&self) -> Result<Vec<Role>> {
        RoleEntity::find()
            .order_by_asc(RoleColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    pub async fn get_role(&self, id: i64) -> Result<Role> {
        RoleEntity::find_by_id(id)
            .one(self.conn())
            .await?
            .ok_or(AppError::RoleNotFound { id })
    }

    pub async fn create_role(&self, input: TitleFields) -> Result<Role> {
        let role = RoleActiveModel {
            title: Set(input.title),
            created_at: Set(now()),
            updated_at: Set(now()),
            ..Default::default()
        };

        role.insert(self.conn()).await.map_err(Into::into)
    }

    pub async fn update_role(&self, id: i64, input: TitleFields) -> Result<Role> {
        let mut role: RoleActiveModel = self.get_role(id).await?.into();
        role.title = Set(input.title);
        role.updated_at = Set(now());

        role.update(self.conn()).await.map_err(Into::into)
    }

    pub async fn delete_role(&self, id: i64) -> Result<()> {
        let result = RoleEntity::delete_by_id(id).exec(self.conn()).await?;
        ensure_deleted(result, "role", id)
    }

    /// Permissions granted to a role
    pub async fn role_permissions(&self, role_id: i64) -> Result<Vec<Permission>> {
        let role = self.get_role(role_id).await?;
        role.find_related(PermissionEntity)
            .order_by_asc(PermissionColumn::Name)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Permission Operations
    // ========================================================================

    pub async fn list_permissions(&self) -> Result<Vec<Permission>> {
        PermissionEntity::find()
            .order_by_asc(PermissionColumn::Name)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Grant a permission to a role. Returns false when already granted.
    pub async fn grant_permission(&self, role_id: i64, permission_id: i64) -> Result<bool> {
        self.get_role(role_id).await?;
        PermissionEntity::find_by_id(permission_id)
            .one(self.conn())
            .await?
            .ok_or_else(|| not_found("permission", permission_id))?;

        let grant = PermissionRoleActiveModel {
            permission_id: Set(permission_id),
            role_id: Set(role_id),
        };

        let inserted = PermissionRoleEntity::insert(grant)
            .on_conflict(
                OnConflict::columns([
                    PermissionRoleColumn::PermissionId,
                    PermissionRoleColumn::RoleId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.conn())
            .await?;

        Ok(inserted > 0)
    }

    /// Revoke a permission from a role. Returns false when it was not granted.
    pub async fn revoke_permission(&self, role_id: i64, permission_id: i64) -> Result<bool> {
        let result = PermissionRoleEntity::delete_many()
            .filter(PermissionRoleColumn::RoleId.eq(role_id))
            .filter(PermissionRoleColumn::PermissionId.eq(permission_id))
            .exec(self.conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Ensure every catalogue permission exists and is granted to the
    /// role with this title, creating the role if needed.
    pub async fn seed_permissions(&self, role_title: &str) -> Result<SeedReport> {
        let txn = self.conn().begin().await?;

        let role = match RoleEntity::find()
            .filter(RoleColumn::Title.eq(role_title))
            .one(&txn)
            .await?
        {
            Some(role) => role,
            None => {
                RoleActiveModel {
                    title: Set(role_title.to_string()),
                    created_at: Set(now()),
                    updated_at: Set(now()),
                    ..Default::default()
                }
                .insert(&txn)
                .await?
            }
        };

        let existing: HashMap<String, i64> = PermissionEntity::find()
            .all(&txn)
            .await?
            .into_iter()
            .map(|p| (p.name, p.id))
            .collect();

        let granted: HashSet<i64> = PermissionRoleEntity::find()
            .filter(PermissionRoleColumn::RoleId.eq(role.id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|g| g.permission_id)
            .collect();

        let mut permissions_created = 0;
        let mut grants_added = 0;

        for permission in permission_catalogue() {
            let name = permission.name();

            let permission_id = match existing.get(&name) {
                Some(id) => *id,
                None => {
                    let created = PermissionActiveModel {
                        name: Set(name),
                        action: Set(permission.action.as_str().to_string()),
                        created_at: Set(now()),
                        updated_at: Set(now()),
                        ..Default::default()
                    }
                    .insert(&txn)
                    .await?;
                    permissions_created += 1;
                    created.id
                }
            };

            if !granted.contains(&permission_id) {
                PermissionRoleActiveModel {
                    permission_id: Set(permission_id),
                    role_id: Set(role.id),
                }
                .insert(&txn)
                .await?;
                grants_added += 1;
            }
        }

        txn.commit().await?;

        info!(
            role_id = role.id,
            permissions_created,
            grants_added,
            "Permission catalogue seeded"
        );

        Ok(SeedReport {
            role_id: role.id,
            permissions_created,
            grants_added,
        })
    }
}
