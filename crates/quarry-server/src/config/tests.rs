use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_defaults() {
    let config = ServerConfig::default();
    assert_eq!(config.bind, "0.0.0.0:8080");
    assert_eq!(config.database, PathBuf::from("quarry.db"));
    assert_eq!(config.connector, ConnectorSettings::default());
    assert!(!config.logging.json);
}

#[test]
fn test_partial_file_keeps_defaults() {
    let config = ServerConfig::from_toml(indoc::indoc! {r#"
        database = "/var/lib/quarry/directory.db"

        [connector]
        query_timeout_secs = 30

        [logging]
        json = true
        filter = "info,quarry_connector=debug"
    "#})
    .unwrap();

    assert_eq!(config.bind, DEFAULT_BIND);
    assert_eq!(config.database, PathBuf::from("/var/lib/quarry/directory.db"));
    assert_eq!(config.connector.query_timeout_secs, 30);
    assert_eq!(config.connector.connect_timeout_secs, 5);
    assert!(config.logging.json);
    assert_eq!(
        config.logging.filter.as_deref(),
        Some("info,quarry_connector=debug")
    );
}

#[test]
fn test_cli_overrides_file() {
    let cli = Cli::parse_from([
        "quarry",
        "--bind",
        "127.0.0.1:9000",
        "--database",
        "/tmp/q.db",
        "--json-logs",
    ]);
    let config = ServerConfig::from_toml("bind = \"0.0.0.0:1\"")
        .unwrap()
        .with_cli(&cli);

    assert_eq!(config.bind, "127.0.0.1:9000");
    assert_eq!(config.database, PathBuf::from("/tmp/q.db"));
    assert!(config.logging.json);
}

#[test]
fn test_rejects_unknown_types() {
    assert!(ServerConfig::from_toml("[connector]\npreview_row_limit = \"many\"").is_err());
}
