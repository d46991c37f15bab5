//! Server command implementation

use std::path::Path;

use anyhow::Result;
use cofre_core::db::LedgerPolicy;
use cofre_server::{ServerConfig, JWT_SECRET_ENV};

use super::open_db;

#[allow(clippy::too_many_arguments)]
pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_auth: bool,
    allow_negative: bool,
    cors_origins: Option<&str>,
    no_encrypt: bool,
) -> Result<()> {
    println!("🚀 Starting Cofre web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);

    let allowed_origins: Vec<String> = cors_origins
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else {
        println!("   🔒 Authentication: bearer JWT ({} signs tokens)", JWT_SECRET_ENV);
    }
    if allow_negative {
        println!("   ⚠️  Overdrafts allowed (--allow-negative)");
    }
    if !allowed_origins.is_empty() {
        println!("   🌐 CORS origins: {}", allowed_origins.join(", "));
    }

    let db = open_db(db_path, no_encrypt)?.with_policy(LedgerPolicy {
        allow_negative_balance: allow_negative,
    });
    tracing::debug!("Database opened at {}", db_path.display());

    let config = ServerConfig {
        require_auth: !no_auth,
        allowed_origins,
        ..Default::default()
    };

    cofre_server::serve(db, host, port, config).await
}
