//! Interactive terminal front-end for the InternMatch assistant.
//!
//! Signs in with the cached user (or a demo user for the given role), then
//! relays each line typed to a chat session. Send an empty line to exit, or
//! `/logout` to forget the cached user.
//!
//! Run with: cargo run --example internmatch_chat -- [student|company|faculty|admin] [email]

use anyhow::Context;
use internmatch::prelude::*;
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let config = AssistantConfig::from_env().context("loading configuration")?;
    let cache = config.user_cache();

    let mut args = std::env::args().skip(1);
    let requested_role = args.next().map(|r| r.parse::<UserRole>()).transpose()?;
    let email = args.next();

    let profile = match cache.load()? {
        CacheLoad::LoggedIn(profile) if requested_role.map_or(true, |r| r == profile.role) => {
            profile
        }
        CacheLoad::Cleared => {
            eprintln!("Cached sign-in was unreadable and has been cleared.");
            sign_in(&cache, requested_role, email.as_deref())?
        }
        _ => sign_in(&cache, requested_role, email.as_deref())?,
    };

    let session = ChatSession::builder(config.request_client(), profile.role_context())
        .with_greeting()
        .build();

    println!("Signed in as {} ({}) -> {}", profile.name, profile.role, profile.role.landing_path());
    println!("Type your messages and press Enter. Send an empty message to exit.\n");
    for turn in session.transcript() {
        println!("Assistant: {}\n", turn.text);
    }

    loop {
        print!("You: ");
        io::stdout().flush()?;

        let mut query = String::new();
        if io::stdin().read_line(&mut query)? == 0 {
            break;
        }
        let query = query.trim();

        if query.is_empty() {
            println!("\nGoodbye!");
            break;
        }
        if query == "/logout" {
            cache.clear()?;
            println!("\nSigned out.");
            break;
        }

        match session.send_message(query).await {
            Ok(reply) => {
                let marker = if reply.was_fallback { " (offline)" } else { "" };
                println!("Assistant{}: {}\n", marker, reply.text);
            }
            Err(e) => eprintln!("Error: {}\n", e),
        }
    }

    Ok(())
}

fn sign_in(
    cache: &UserCache,
    role: Option<UserRole>,
    email: Option<&str>,
) -> anyhow::Result<UserProfile> {
    let profile = UserProfile::demo(role.unwrap_or(UserRole::Student), email);
    cache.store(&profile).context("caching signed-in user")?;
    Ok(profile)
}
