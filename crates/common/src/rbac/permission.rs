//! Typed permission names
//!
//! Persisted permissions are strings of the form `resource.action`
//! (`paper.update`, `permission_role.viewAny`). These types are the only
//! place that format is produced or parsed.

use crate::errors::AppError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// The six canonical actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "view")]
    View,
    #[serde(rename = "viewAny")]
    ViewAny,
    #[serde(rename = "update")]
    Update,
    #[serde(rename = "create")]
    Create,
    #[serde(rename = "delete")]
    Delete,
    #[serde(rename = "restore")]
    Restore,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::View,
        Action::ViewAny,
        Action::Update,
        Action::Create,
        Action::Delete,
        Action::Restore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::ViewAny => "viewAny",
            Action::Update => "update",
            Action::Create => "create",
            Action::Delete => "delete",
            Action::Restore => "restore",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| AppError::InvalidFormat {
                message: format!("unknown action '{}'", s),
            })
    }
}

/// Entity kinds subject to access control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    PermissionRole,
    Role,
    User,
    Country,
    Province,
    City,
    Paper,
    Person,
    PaperType,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 9] = [
        ResourceKind::PermissionRole,
        ResourceKind::Role,
        ResourceKind::User,
        ResourceKind::Country,
        ResourceKind::Province,
        ResourceKind::City,
        ResourceKind::Paper,
        ResourceKind::Person,
        ResourceKind::PaperType,
    ];

    /// Identifier used in persisted permission names
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::PermissionRole => "permission_role",
            ResourceKind::Role => "role",
            ResourceKind::User => "user",
            ResourceKind::Country => "country",
            ResourceKind::Province => "province",
            ResourceKind::City => "city",
            ResourceKind::Paper => "paper",
            ResourceKind::Person => "person",
            ResourceKind::PaperType => "paper_type",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| AppError::InvalidFormat {
                message: format!("unknown resource '{}'", s),
            })
    }
}

/// A `(resource, action)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Permission {
    pub resource: ResourceKind,
    pub action: Action,
}

impl Permission {
    pub const fn new(resource: ResourceKind, action: Action) -> Self {
        Self { resource, action }
    }

    /// Persisted name, e.g. `paper.update`
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource, self.action)
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (resource, action) = s.split_once('.').ok_or_else(|| AppError::InvalidFormat {
            message: format!("permission name '{}' is not of the form resource.action", s),
        })?;

        Ok(Self {
            resource: resource.parse()?,
            action: action.parse()?,
        })
    }
}

/// Every resource × action pair, in seed order
pub fn permission_catalogue() -> impl Iterator<Item = Permission> {
    ResourceKind::ALL.into_iter().flat_map(|resource| {
        Action::ALL
            .into_iter()
            .map(move |action| Permission::new(resource, action))
    })
}

/// Deduplicated set of granted permissions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    granted: HashSet<Permission>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from persisted names. Names outside the typed vocabulary can
    /// never satisfy a check and are skipped.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .filter_map(|name| match name.as_ref().parse::<Permission>() {
                Ok(permission) => Some(permission),
                Err(_) => {
                    tracing::debug!(name = name.as_ref(), "Ignoring unrecognised permission name");
                    None
                }
            })
            .collect()
    }

    /// Union of several role grants
    pub fn union<'a, I>(sets: I) -> Self
    where
        I: IntoIterator<Item = &'a PermissionSet>,
    {
        let mut merged = Self::new();
        for set in sets {
            merged.granted.extend(set.granted.iter().copied());
        }
        merged
    }

    pub fn insert(&mut self, permission: Permission) -> bool {
        self.granted.insert(permission)
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.granted.contains(&permission)
    }

    pub fn len(&self) -> usize {
        self.granted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.granted.is_empty()
    }

    /// Granted names in a stable order
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.granted.iter().map(Permission::name).collect();
        names.sort();
        names
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self {
            granted: iter.into_iter().collect(),
        }
    }
}
