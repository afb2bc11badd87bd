//! Basic usage example for the MouseHunt HTTP client
//!
//! This example demonstrates how to:
//! - Create a client with default and custom settings
//! - Resolve a profile id to a session id
//! - Read the latest corkboard message
//! - Check achievements and crown tiers
//!
//! Note: This example needs the `HG_TOKEN` and `MH_UNIQUE_HASH` environment
//! variables from a logged-in browser session, and a profile id argument.

use mh_http_client::{AchievementService, Credentials, MhClient};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let token = std::env::var("HG_TOKEN")?;
    let unique_hash = std::env::var("MH_UNIQUE_HASH")?;
    let profile_id: u64 = std::env::args()
        .nth(1)
        .ok_or("usage: basic_usage <profile id>")?
        .parse()?;
    let credentials = Credentials::new(token, unique_hash);

    println!("=== Custom Client ===");
    let _custom_client = MhClient::builder()
        .base_url("https://www.mousehuntgame.com")? // Could be a mock server URL for testing
        .timeout(Duration::from_secs(10))
        .build()?;
    println!("✓ Client created with a 10s timeout");

    let client = MhClient::new()?;

    println!("\nResolving profile {profile_id}...");
    let snuid = client.resolve_snuid(&credentials, profile_id).await?;
    println!("✓ Session id: {snuid}");

    let messages = client
        .fetch_corkboard_messages(&credentials, &snuid, 1)
        .await?;
    match messages.first() {
        Some(message) => println!("\nLatest corkboard message: {}", message.body),
        None => println!("\nCorkboard is empty"),
    }

    let service = AchievementService::new(&client, &credentials);
    println!("\n=== Achievements ===");
    for (kind, eligible) in service.evaluate_all(&snuid).await? {
        println!("{kind}: {}", if eligible { "✓" } else { "✗" });
    }

    let summary = service.crown_summary(&snuid).await?;
    println!("\n=== Crowns over {} mice ===", summary.eligible);
    for (tier, count) in &summary.tiers {
        println!("{tier:?}: {} ({:.1}%)", count.count, count.percent);
    }

    Ok(())
}
