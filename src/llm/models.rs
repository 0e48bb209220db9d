use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who authored a turn in the transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One message in a chat transcript.
///
/// Turns are immutable once created; the session only ever appends them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: u64,
    pub speaker: Speaker,
    pub text: String,
    /// True when `text` is the fallback returned after every attempt failed.
    #[serde(default)]
    pub was_fallback: bool,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// Create a user turn
    pub fn user(id: u64, text: impl Into<String>) -> Self {
        Self {
            id,
            speaker: Speaker::User,
            text: text.into(),
            was_fallback: false,
            created_at: Utc::now(),
        }
    }

    /// Create an assistant turn
    pub fn assistant(id: u64, text: impl Into<String>, was_fallback: bool) -> Self {
        Self {
            id,
            speaker: Speaker::Assistant,
            text: text.into(),
            was_fallback,
            created_at: Utc::now(),
        }
    }
}

/// Portal role of the signed-in user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Company,
    Faculty,
    Admin,
}

impl UserRole {
    pub const ALL: [UserRole; 4] =
        [UserRole::Student, UserRole::Company, UserRole::Faculty, UserRole::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Company => "company",
            UserRole::Faculty => "faculty",
            UserRole::Admin => "admin",
        }
    }

    /// What the assistant should concentrate on for this role.
    pub fn focus(&self) -> &'static str {
        match self {
            UserRole::Student => "interview prep, resume tips, and job fit",
            UserRole::Company => "candidate analytics, hiring funnels, and JD optimization",
            UserRole::Faculty => {
                "student progress, research opportunities, and academic mentorship"
            }
            UserRole::Admin => "governance, fairness checks, and system health",
        }
    }

    /// Dashboard a caller should route to after sign-in.
    pub fn landing_path(&self) -> &'static str {
        match self {
            UserRole::Student => "/student/dashboard",
            UserRole::Company => "/company/overview",
            UserRole::Faculty => "/faculty/dashboard",
            UserRole::Admin => "/admin/dashboard",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = crate::error::InternMatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(UserRole::Student),
            "company" => Ok(UserRole::Company),
            "faculty" => Ok(UserRole::Faculty),
            "admin" => Ok(UserRole::Admin),
            other => Err(crate::error::InternMatchError::InvalidArgument(format!(
                "unknown role: {other}"
            ))),
        }
    }
}

/// Immutable per-session descriptor used to steer the assistant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleContext {
    pub display_name: String,
    pub role: UserRole,
}

impl RoleContext {
    pub fn new(display_name: impl Into<String>, role: UserRole) -> Self {
        Self {
            display_name: display_name.into(),
            role,
        }
    }

    /// Build the system instruction sent with every generation request.
    pub fn instruction_prefix(&self) -> String {
        format!(
            "You are the InternMatch AI Expert for a user with role: {role}. User name: {name}.\n\
             Focus on {focus}.\n\
             Keep answers concise, professional, and encouraging. Use emojis.",
            role = self.role,
            name = self.display_name,
            focus = self.role.focus(),
        )
    }

    /// Opening line shown before the user has said anything.
    pub fn greeting(&self) -> String {
        let name = if self.display_name.trim().is_empty() {
            "there"
        } else {
            self.display_name.as_str()
        };
        format!("Hi {name}! I'm your InternMatch AI. How can I help with your career today? ✨")
    }
}
