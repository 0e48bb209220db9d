pub mod chat_session;
pub mod client;
pub mod gateway;
pub mod gateways;
pub mod models;
pub mod retry;

pub use chat_session::{create_session, ChatSession, ChatSessionBuilder};
pub use client::{Generation, RequestClient, DEFAULT_ATTEMPT_TIMEOUT, FALLBACK_TEXT};
pub use gateway::{GenerateRequest, TextGateway};
pub use models::{RoleContext, Speaker, Turn, UserRole};
pub use retry::{RetryPolicy, RetryState};
