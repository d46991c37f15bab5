//! CLI command tests

use clap::Parser;
use tempfile::TempDir;

use crate::cli::{Cli, Commands};
use crate::commands;

#[test]
fn test_cli_defaults() {
    let cli = Cli::parse_from(["cofre", "status"]);
    assert_eq!(cli.db.to_str().unwrap(), "cofre.db");
    assert!(!cli.no_encrypt);
    assert!(matches!(cli.command, Commands::Status));
}

#[test]
fn test_cli_serve_flags() {
    let cli = Cli::parse_from([
        "cofre",
        "--db",
        "/tmp/x.db",
        "--no-encrypt",
        "serve",
        "--port",
        "8080",
        "--no-auth",
        "--allow-negative",
    ]);
    assert_eq!(cli.db.to_str().unwrap(), "/tmp/x.db");
    assert!(cli.no_encrypt);
    match cli.command {
        Commands::Serve {
            port,
            host,
            no_auth,
            allow_negative,
            cors_origins,
        } => {
            assert_eq!(port, 8080);
            assert_eq!(host, "127.0.0.1");
            assert!(no_auth);
            assert!(allow_negative);
            assert!(cors_origins.is_none());
        }
        _ => panic!("expected serve command"),
    }
}

#[test]
fn test_cmd_init_creates_database() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");

    let result = commands::cmd_init(&path, true);
    assert!(result.is_ok());
    assert!(path.exists());

    // Reopening the same file works
    let db = commands::open_db(&path, true).unwrap();
    let stats = db.stats().unwrap();
    assert_eq!(stats.users, 0);
}

#[test]
fn test_cmd_status_on_missing_database() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.db");

    // Status should report rather than fail
    let result = commands::cmd_status(&path, true);
    assert!(result.is_ok());
}

#[test]
fn test_open_db_encrypted_requires_key() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("enc.db");

    if std::env::var(cofre_core::db::DB_KEY_ENV).is_err() {
        let result = commands::open_db(&path, false);
        assert!(result.is_err());
    }
}
