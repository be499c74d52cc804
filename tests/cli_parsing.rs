//! Tests for CLI subcommand parsing.

use std::time::Duration;

use clap::Parser;
use conn_watch::config::{Cli, Command, LogFormat, LogLevel, ServerConfig, WatchConfig};

#[test]
fn test_serve_defaults() {
    let cli = Cli::try_parse_from(["conn_watch", "serve"]).expect("serve should parse");
    assert!(matches!(cli.log_level, LogLevel::Info));
    assert!(matches!(cli.log_format, LogFormat::Plain));

    let Command::Serve(args) = cli.command else {
        panic!("expected serve subcommand");
    };
    let config = ServerConfig::from(args);
    if std::env::var_os("MONITORED_PORT").is_none() {
        assert_eq!(config.monitored_port, 443);
    }
    assert_eq!(config.nsenter_target_pid, 1);
    assert_eq!(config.harvest_timeout, Duration::from_secs(5));
    assert_eq!(config.max_concurrent_harvests, 1);
    assert!(config.validate().is_ok());
}

#[test]
fn test_serve_options() {
    let cli = Cli::try_parse_from([
        "conn_watch",
        "serve",
        "--bind",
        "127.0.0.1:8080",
        "--monitored-port",
        "8443",
        "--nsenter-target-pid",
        "42",
        "--harvest-timeout-secs",
        "3",
        "--geo-endpoint",
        "http://localhost:9000",
        "--geo-ttl-secs",
        "60",
        "--geo-negative-ttl-secs",
        "10",
        "--admin-username",
        "ops",
        "--admin-password",
        "hunter2",
    ])
    .expect("serve options should parse");

    let Command::Serve(args) = cli.command else {
        panic!("expected serve subcommand");
    };
    let config = ServerConfig::from(args);
    assert_eq!(config.bind.to_string(), "127.0.0.1:8080");
    assert_eq!(config.monitored_port, 8443);
    assert_eq!(config.nsenter_target_pid, 42);
    assert_eq!(config.harvest_timeout, Duration::from_secs(3));
    assert_eq!(config.geo_endpoint, "http://localhost:9000");
    assert_eq!(config.geo_ttl, Duration::from_secs(60));
    assert_eq!(config.geo_negative_ttl, Duration::from_secs(10));

    let creds = config.credentials.expect("password enables auth");
    assert_eq!(creds.username, "ops");
    assert_eq!(creds.password, "hunter2");
}

#[test]
fn test_watch_options() {
    let cli = Cli::try_parse_from([
        "conn_watch",
        "--log-level",
        "debug",
        "watch",
        "--api-url",
        "http://dashboard:5000",
        "--interval-secs",
        "5",
    ])
    .expect("watch should parse");
    assert!(matches!(cli.log_level, LogLevel::Debug));

    let Command::Watch(args) = cli.command else {
        panic!("expected watch subcommand");
    };
    let config = WatchConfig::from(args);
    assert_eq!(config.api_url, "http://dashboard:5000");
    assert_eq!(config.interval, Duration::from_secs(5));
    assert!(config.validate().is_ok());
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from(["conn_watch", "serve", "--log-format", "json"])
        .expect("global flag should parse after subcommand");
    assert!(matches!(cli.log_format, LogFormat::Json));
}

#[test]
fn test_invalid_values_rejected() {
    assert!(Cli::try_parse_from(["conn_watch", "serve", "--monitored-port", "70000"]).is_err());
    assert!(Cli::try_parse_from(["conn_watch", "serve", "--bind", "nowhere"]).is_err());
    assert!(Cli::try_parse_from(["conn_watch", "--log-level", "loud", "serve"]).is_err());
    assert!(Cli::try_parse_from(["conn_watch"]).is_err());
}
