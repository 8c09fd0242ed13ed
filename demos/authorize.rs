//! Walk through the OAuth1 handshake interactively.
//!
//! ```bash
//! MAUTIC_URL=https://mautic.example.com MAUTIC_KEY=... MAUTIC_SECRET=... \
//!   cargo run --example authorize
//! ```
//!
//! Open the printed URL, approve the application, paste the verifier shown by
//! Mautic. The access token pair is printed so it can be stored as
//! `MAUTIC_ACCESS_TOKEN` / `MAUTIC_ACCESS_TOKEN_SECRET` for later runs.

use mautic_sdk::BlockingClient;
use std::io::{self, BufRead, Write};
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    let host = env_or("MAUTIC_URL", "https://mautic.example.com");
    let key = std::env::var("MAUTIC_KEY")?;
    let secret = std::env::var("MAUTIC_SECRET")?;

    let mut builder = BlockingClient::builder(&host, key, secret)?
        .no_system_proxy()
        .timeout(Duration::from_secs(20));
    if let Some(callback) = env_opt("MAUTIC_CALLBACK") {
        builder = builder.callback_url(callback);
    }
    let client = builder.build()?;

    let authorize = client.request_and_authorize()?;
    println!("Open this URL and approve the application:\n  {authorize}");
    print!("Verifier: ");
    io::stdout().flush()?;

    let mut verifier = String::new();
    io::stdin().lock().read_line(&mut verifier)?;

    let access = client.get_access_token(verifier.trim())?;
    client.get_session()?;

    println!("MAUTIC_ACCESS_TOKEN={}", access.token());
    println!("MAUTIC_ACCESS_TOKEN_SECRET={}", access.secret().expose());
    Ok(())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_owned())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
