pub mod config;
pub mod error;
pub mod llm;
pub mod user_cache;

pub use error::{InternMatchError, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::AssistantConfig;
    pub use crate::error::{InternMatchError, Result};
    pub use crate::llm::gateways::GeminiGateway;
    pub use crate::llm::{
        create_session, ChatSession, RequestClient, RetryPolicy, RoleContext, Speaker, Turn,
        UserRole, FALLBACK_TEXT,
    };
    pub use crate::user_cache::{CacheLoad, UserCache, UserProfile};
}
