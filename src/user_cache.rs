//! Locally cached identity of the signed-in user.
//!
//! There is exactly one record, stored as JSON under the well-known key
//! [`USER_CACHE_KEY`]. A record that no longer parses is deleted and reported
//! as [`CacheLoad::Cleared`], which callers treat as signed out.

use crate::error::Result;
use crate::llm::models::{RoleContext, UserRole};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const USER_CACHE_KEY: &str = "internmatch_user";

/// Opaque identity record of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub name: String,
    pub role: UserRole,
    pub email: String,
    pub avatar: String,
}

impl UserProfile {
    /// Demo identity for `role`, using the role's demo address when `email` is blank.
    pub fn demo(role: UserRole, email: Option<&str>) -> Self {
        let (id, name) = match role {
            UserRole::Student => (1, "Shrenika Kumar"),
            UserRole::Company => (2, "TechCorp Hiring"),
            UserRole::Faculty => (3, "Prof. Sharma"),
            UserRole::Admin => (4, "Admin User"),
        };

        let email = match email.map(str::trim) {
            Some(email) if !email.is_empty() => email.to_string(),
            _ => format!("{}@example.com", role),
        };

        Self {
            id,
            name: name.to_string(),
            role,
            email,
            avatar: format!("https://api.dicebear.com/7.x/avataaars/svg?seed={}", role),
        }
    }

    pub fn role_context(&self) -> RoleContext {
        RoleContext::new(&self.name, self.role)
    }
}

/// Result of reading the cache at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLoad {
    LoggedIn(UserProfile),
    LoggedOut,
    /// The stored record was corrupt and has been removed
    Cleared,
}

/// File-backed store for the single cached user record
#[derive(Debug, Clone)]
pub struct UserCache {
    path: PathBuf,
}

impl UserCache {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{USER_CACHE_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<CacheLoad> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CacheLoad::LoggedOut),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<UserProfile>(&raw) {
            Ok(profile) => {
                debug!(user_id = profile.id, role = %profile.role, "Loaded cached user");
                Ok(CacheLoad::LoggedIn(profile))
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Discarding corrupt user cache");
                self.clear()?;
                Ok(CacheLoad::Cleared)
            }
        }
    }

    /// Persist `profile` as the signed-in user, replacing any previous record.
    pub fn store(&self, profile: &UserProfile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string(profile)?)?;
        info!(user_id = profile.id, role = %profile.role, "Cached signed-in user");
        Ok(())
    }

    /// Forget the signed-in user. Clearing an empty cache is not an error.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
