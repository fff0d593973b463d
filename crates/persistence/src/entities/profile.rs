//! Profile entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Profile, Role};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for user_role that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum RoleDb {
    Guest,
    Member,
    Admin,
}

impl From<RoleDb> for Role {
    fn from(db: RoleDb) -> Self {
        match db {
            RoleDb::Guest => Role::Guest,
            RoleDb::Member => Role::Member,
            RoleDb::Admin => Role::Admin,
        }
    }
}

impl From<Role> for RoleDb {
    fn from(role: Role) -> Self {
        match role {
            Role::Guest => RoleDb::Guest,
            Role::Member => RoleDb::Member,
            Role::Admin => RoleDb::Admin,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ProfileEntity {
    pub id: Uuid,
    pub username: Option<String>,
    pub role: RoleDb,
    pub created_at: DateTime<Utc>,
}

impl From<ProfileEntity> for Profile {
    fn from(entity: ProfileEntity) -> Self {
        Self {
            id: entity.id,
            username: entity.username,
            role: entity.role.into(),
            created_at: entity.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_conversion() {
        for role in [Role::Guest, Role::Member, Role::Admin] {
            assert_eq!(Role::from(RoleDb::from(role)), role);
        }
    }
}
