//! User command implementations

use anyhow::Result;
use tally_core::db::Database;

pub fn cmd_users_add(db: &Database, email: &str, name: Option<&str>) -> Result<()> {
    let user = db.create_user(email, name)?;
    db.log_audit(
        "cli",
        "create",
        Some("user"),
        Some(user.id),
        Some(&format!("email={}", user.email)),
    )?;

    println!("✅ Added user [{}] {}", user.id, user.email);
    Ok(())
}

pub fn cmd_users_list(db: &Database) -> Result<()> {
    let users = db.list_users()?;

    if users.is_empty() {
        println!("No users yet. Add one with:");
        println!("  tally users add you@example.com");
        return Ok(());
    }

    println!();
    println!("👤 Users");
    println!("   ─────────────────────────────────────────────");

    for user in users {
        println!(
            "   [{}] {:<30} {}",
            user.id,
            user.email,
            user.name.as_deref().unwrap_or("")
        );
    }

    Ok(())
}
