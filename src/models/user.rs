use std::str::FromStr;

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::{normalize_token, string_enum_serde, UnknownVariant};

/// The two roles known to the system. Role strings from tokens and request
/// bodies are parsed case-insensitively into this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Employee,
    TeamLeader,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::TeamLeader => "teamleader",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "Team Leader", "team_leader" and "teamleader" are the same role.
        match normalize_token(s).replace(' ', "").as_str() {
            "employee" => Ok(Role::Employee),
            "teamleader" => Ok(Role::TeamLeader),
            _ => Err(UnknownVariant {
                kind: "role",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "Active",
            UserStatus::Inactive => "Inactive",
        }
    }
}

impl FromStr for UserStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "active" => Ok(UserStatus::Active),
            "inactive" => Ok(UserStatus::Inactive),
            _ => Err(UnknownVariant {
                kind: "status",
                value: s.to_string(),
            }),
        }
    }
}

string_enum_serde!(Role, UserStatus);

/// A user record as stored in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub fullname: String,
    pub username: String,
    pub email: String,
    /// bcrypt hash, never leaves the server.
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        fullname: String,
        username: String,
        email: String,
        password_hash: String,
        role: Role,
        status: UserStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ObjectId::new(),
            fullname,
            username,
            email,
            password: password_hash,
            role,
            status,
            created_at: now,
            updated_at: now,
        }
    }
}

/// What the API exposes for a user: everything except the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub fullname: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.to_hex(),
            fullname: u.fullname.clone(),
            username: u.username.clone(),
            email: u.email.clone(),
            role: u.role,
            status: u.status,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

impl From<User> for UserView {
    fn from(u: User) -> Self {
        UserView::from(&u)
    }
}

/// Display fields used wherever another record references a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub fullname: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.to_hex(),
            fullname: u.fullname.clone(),
            email: u.email.clone(),
            role: u.role,
        }
    }
}

/// Partial update of a user record. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub fullname: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.fullname.is_none()
            && self.username.is_none()
            && self.email.is_none()
            && self.role.is_none()
            && self.status.is_none()
    }

    pub fn apply(&self, user: &mut User) {
        if let Some(fullname) = &self.fullname {
            user.fullname = fullname.clone();
        }
        if let Some(username) = &self.username {
            user.username = username.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(status) = self.status {
            user.status = status;
        }
        user.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!("TeamLeader".parse::<Role>().unwrap(), Role::TeamLeader);
        assert_eq!("Team Leader".parse::<Role>().unwrap(), Role::TeamLeader);
        assert_eq!(" EMPLOYEE ".parse::<Role>().unwrap(), Role::Employee);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn user_view_has_no_password() {
        let user = User::new(
            "Ada Lovelace".into(),
            "ada".into(),
            "ada@x.com".into(),
            "$2b$10$hash".into(),
            Role::Employee,
            UserStatus::Active,
        );
        let json = serde_json::to_value(UserView::from(&user)).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["role"], "employee");
        assert_eq!(json["status"], "Active");
        assert_eq!(json["id"], user.id.to_hex());
    }
}
