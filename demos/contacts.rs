//! Look up, create or update a contact and enroll it in a campaign.
//!
//! ```bash
//! cargo run --example contacts
//! ```
//!
//! Env vars:
//! - `MAUTIC_URL`, `MAUTIC_KEY`, `MAUTIC_SECRET`
//! - `MAUTIC_ACCESS_TOKEN`, `MAUTIC_ACCESS_TOKEN_SECRET` (from the `authorize` demo)
//! - `MAUTIC_EMAIL` (default: `ada@example.com`)
//! - `MAUTIC_CAMPAIGN` to enroll the contact in that campaign

use mautic_sdk::{BlockingClient, ContactLookup, ContactQuery};
use serde_json::json;
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    let host = env_or("MAUTIC_URL", "https://mautic.example.com");
    let email = env_or("MAUTIC_EMAIL", "ada@example.com");

    let client = BlockingClient::builder(
        &host,
        std::env::var("MAUTIC_KEY")?,
        std::env::var("MAUTIC_SECRET")?,
    )?
    .access_token_parts(
        env_opt("MAUTIC_ACCESS_TOKEN"),
        env_opt("MAUTIC_ACCESS_TOKEN_SECRET"),
    )
    .with_retry(2, Duration::from_millis(200))
    .build()?;

    let contacts = client.contacts();
    let query = ContactQuery::search(format!("email:{email}")).minimal(true);
    let id = match contacts.find_id(query)? {
        ContactLookup::Found(id) => {
            contacts.update(id.clone(), &json!({"lastActive": "now"}))?;
            println!("updated contact {id}");
            id
        }
        ContactLookup::NotFound => {
            let created = contacts.create(&json!({"email": email, "firstname": "Ada"}))?;
            let id = created
                .id()
                .ok_or_else(|| anyhow::anyhow!("create response has no contact id"))?;
            println!("created contact {id}");
            id
        }
        ContactLookup::RequestFailed(status) => {
            anyhow::bail!("contact lookup failed with HTTP {status}");
        }
    };

    if let Some(campaign) = env_opt("MAUTIC_CAMPAIGN") {
        let enrollment = client.campaigns().add_contact(campaign.as_str(), id)?;
        println!(
            "campaign enrollment: HTTP {} success={}",
            enrollment.status,
            enrollment.is_success()
        );
    }

    Ok(())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_owned())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
