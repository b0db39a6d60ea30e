#![cfg(feature = "cli")]

use clap::Parser;
use confd_aws::{BackendSettings, CliConfig, DynamoDbSettings, SsmSettings};
use std::io::Write;
use tempfile::NamedTempFile;

fn config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_flags_override_config_file() {
    let file = config_file(
        r#"
backend = "dynamodb"
keys = ["/from-file"]
interval = 30

[dynamodb]
table = "confd"
"#,
    );

    let cli = CliConfig::parse_from([
        "confd-aws",
        "--config",
        file.path().to_str().unwrap(),
        "--keys",
        "/app/db,/app/cache",
        "--region",
        "ap-southeast-2",
    ]);
    let settings = cli.resolve().unwrap();

    assert_eq!(settings.keys, vec!["/app/db", "/app/cache"]);
    assert_eq!(settings.interval, 30);
    assert_eq!(
        settings.backend,
        BackendSettings::DynamoDb(DynamoDbSettings {
            table: "confd".to_string(),
            endpoint_url: None,
            region: Some("ap-southeast-2".to_string()),
        })
    );
}

#[test]
fn test_backend_flag_switches_to_ssm() {
    let file = config_file(
        r#"
backend = "dynamodb"
keys = ["/app"]

[dynamodb]
table = "confd"

[ssm]
endpoint_url = "http://localhost:8001"
"#,
    );

    let cli = CliConfig::parse_from([
        "confd-aws",
        "--config",
        file.path().to_str().unwrap(),
        "--backend",
        "ssm",
    ]);
    let settings = cli.resolve().unwrap();

    assert_eq!(
        settings.backend,
        BackendSettings::Ssm(SsmSettings {
            endpoint_url: Some("http://localhost:8001".to_string()),
            region: None,
        })
    );
}

#[test]
fn test_missing_config_file_is_an_io_error() {
    let cli = CliConfig::parse_from([
        "confd-aws",
        "--config",
        "/definitely/not/here.toml",
        "--backend",
        "ssm",
        "--keys",
        "/app",
    ]);

    let err = cli.resolve().unwrap_err();
    assert!(matches!(err, confd_aws::BackendError::IoError(_)));
}

#[test]
fn test_invalid_table_name_is_rejected() {
    let cli = CliConfig::parse_from([
        "confd-aws",
        "--backend",
        "dynamodb",
        "--table",
        "no spaces allowed",
        "--keys",
        "/app",
    ]);

    assert!(cli.resolve().unwrap_err().is_config_error());
}
