//! Mirror/channel sync demo
//!
//! Walks through the whole lifecycle against the in-process channel:
//! login, a couple of local mutations, a simulated remote removal from
//! another client, and logout.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use grumble_sdk::{
    auth::StaticAuthProvider, sync::MemorySyncChannel, GrubDraft, GrumbleClient, GrumbleConfig,
    RemoteSyncChannel,
};
use tokio::time::sleep;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = GrumbleConfig::builder()
        .data_dir(PathBuf::from("/tmp/grumble_sync_demo"))
        .build();

    let channel = MemorySyncChannel::new();
    let auth = StaticAuthProvider::new("demo_user");

    println!("📦 initializing client...");
    let client =
        GrumbleClient::initialize(config, Arc::new(channel.clone()), Arc::new(auth)).await?;

    client.login().await?;
    println!("✅ logged in, {} record(s) in session", client.session().len().await);

    let taco = client
        .add_grub(GrubDraft::new("Taco").with_price(3.5).with_tag("mexican", 2.0))
        .await?;
    let pho = client
        .add_grub(GrubDraft::new("Pho").with_restaurant("Pho 99"))
        .await?;
    println!("🌮 added {} and {}", taco.fid, pho.fid);
    println!("   mirror now holds {} record(s)", client.mirror().load().await.len());

    // Another device removes the taco remotely.
    channel.delete("demo_user", &taco.fid).await;
    sleep(Duration::from_millis(50)).await;
    println!(
        "📡 after remote removal the session holds {} record(s)",
        client.session().len().await
    );

    client.logout().await?;
    println!(
        "👋 logged out, session empty: {}, mirror empty: {}",
        client.session().is_empty().await,
        client.mirror().load().await.is_empty()
    );

    Ok(())
}
