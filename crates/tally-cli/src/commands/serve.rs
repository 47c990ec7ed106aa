//! Server command implementation

use std::path::Path;

use anyhow::Result;

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_encrypt: bool,
    allowed_origins: Vec<String>,
) -> Result<()> {
    println!("🚀 Starting Tally web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if !allowed_origins.is_empty() {
        println!("   🌐 Allowed origins: {}", allowed_origins.join(", "));
    }

    let notifier = std::env::var("NOTIFIER").unwrap_or_else(|_| "log".to_string());
    println!("   📬 Alert sender: {} (NOTIFIER)", notifier);
    match std::env::var("TALLY_ALERT_SCAN_HOURS").as_deref() {
        Ok("0") => println!("   ⏸️  Scheduled alert scans disabled"),
        Ok(hours) => println!("   ⏰ Alert scan every {} hours", hours),
        Err(_) => println!("   ⏰ Alert scan every 24 hours"),
    }

    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    let config = tally_server::ServerConfig { allowed_origins };
    tally_server::serve_with_config(db, host, port, config).await?;

    Ok(())
}
