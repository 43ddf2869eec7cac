//! User entity. Authentication and session issuance live outside the core;
//! the store only carries the profile fields the lookup patterns need.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityFilter, EntityKind};
use crate::error::{Result, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            email: email.into(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPatch {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserFilter;

impl EntityFilter<User> for UserFilter {
    fn matches(&self, _user: &User) -> bool {
        true
    }
}

impl Entity for User {
    type Patch = UserPatch;
    type Filter = UserFilter;

    const KIND: EntityKind = EntityKind::User;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn validate(&self) -> Result<()> {
        if !self.email.contains('@') {
            return Err(StoreError::validation(format!(
                "user email {:?} is not an address",
                self.email
            )));
        }
        if self.name.trim().is_empty() {
            return Err(StoreError::validation("user name must not be empty"));
        }
        Ok(())
    }

    fn apply_patch(&mut self, patch: &UserPatch) {
        if let Some(email) = &patch.email {
            self.email = email.clone();
        }
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        self.updated_at = Utc::now();
    }
}
