//! Role model - the three fixed roles and their advisory member counts.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// One of the seeded roles. Roles are never created or deleted at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoleName {
    Admin,
    Staff,
    Client,
}

impl RoleName {
    pub const ALL: [RoleName; 3] = [RoleName::Admin, RoleName::Staff, RoleName::Client];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::Admin => "ADMIN",
            RoleName::Staff => "STAFF",
            RoleName::Client => "CLIENT",
        }
    }

    /// ADMIN and STAFF may use the management endpoints.
    pub fn is_privileged(&self) -> bool {
        matches!(self, RoleName::Admin | RoleName::Staff)
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(RoleName::Admin),
            "STAFF" => Ok(RoleName::Staff),
            "CLIENT" => Ok(RoleName::Client),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Role record. `count` is denormalized and only advisory.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Role {
    pub id: i64,
    pub name: RoleName,
    pub count: i64,
}

/// Row shape of the `roles` table.
#[derive(Debug, Clone, FromRow)]
pub struct RoleRow {
    pub id: i64,
    pub name: String,
    pub member_count: i64,
}

impl TryFrom<RoleRow> for Role {
    type Error = anyhow::Error;

    fn try_from(row: RoleRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name.parse().map_err(anyhow::Error::msg)?,
            count: row.member_count,
        })
    }
}
