use std::env;
use std::fs;
use std::str::FromStr;
use std::sync::{Mutex, OnceLock};

use rust_decimal::Decimal;
use serde_json::Value;
use valora_cli::commands::price::PriceArgs;
use valora_cli::commands::{config, migrate, price};

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("VALORA_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["error_class"], Value::Null);
    });
}

#[test]
fn migrate_creates_file_database_and_is_repeatable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("valora.db").display());

    with_env(&[("VALORA_DATABASE_URL", url.as_str())], || {
        let first = migrate::run();
        assert_eq!(first.exit_code, 0, "expected first migrate run to succeed");

        let second = migrate::run();
        assert_eq!(second.exit_code, 0, "expected re-run to be a no-op success");
        assert_eq!(parse_payload(&second.output)["status"], "ok");
    });

    assert!(dir.path().join("valora.db").exists());
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("VALORA_DATABASE_URL", "postgres://localhost/valora")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn migrate_returns_connectivity_failure_for_unreachable_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("missing").join("valora.db").display());

    with_env(&[("VALORA_DATABASE_URL", url.as_str())], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 4, "expected connectivity failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "db_connectivity");
    });
}

#[test]
fn config_reports_sources_and_redacts_gateway_secret() {
    with_env(
        &[
            ("VALORA_DATABASE_URL", "sqlite::memory:"),
            ("VALORA_LOG_LEVEL", "debug"),
            ("VALORA_IDENTITY_GATEWAY_SECRET", "gw-super-secret-value"),
        ],
        || {
            let result = config::run();
            assert_eq!(result.exit_code, 0, "expected config inspection success");
            assert!(!result.output.contains("gw-super-secret-value"));

            assert!(result
                .output
                .contains("- database.url = sqlite::memory: (source: env (VALORA_DATABASE_URL))"));
            assert!(result
                .output
                .contains("- logging.level = debug (source: env (VALORA_LOG_LEVEL))"));
            assert!(result
                .output
                .contains("- identity.gateway_secret = <redacted> (source: env (VALORA_IDENTITY_GATEWAY_SECRET))"));
            assert!(result.output.contains("- server.port = 8080 (source: default)"));

            let payload = parse_payload(last_line(&result.output));
            assert_eq!(payload["command"], "config");
            assert_eq!(payload["status"], "ok");
        },
    );
}

#[test]
fn config_reports_unset_gateway_secret() {
    with_env(&[], || {
        let result = config::run();
        assert_eq!(result.exit_code, 0);
        assert!(result
            .output
            .contains("- identity.gateway_secret = <unset> (source: default)"));
    });
}

#[test]
fn config_returns_failure_for_invalid_override() {
    with_env(&[("VALORA_SERVER_PORT", "not-a-port")], || {
        let result = config::run();
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(last_line(&result.output));
        assert_eq!(payload["command"], "config");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn price_with_default_weights_reports_both_budgets() {
    let result = price::run(&PriceArgs { base_price: "1000".to_string(), ..PriceArgs::default() });
    assert_eq!(result.exit_code, 0, "expected pricing success");

    let detail = parse_payload(first_line(&result.output));
    assert_eq!(decimal_field(&detail, "budget_interno"), Decimal::from_str("1628.64").unwrap());
    assert_eq!(decimal_field(&detail, "budget_effettivo"), Decimal::from_str("1935.36").unwrap());
    assert_eq!(decimal_field(&detail, "urgenza"), Decimal::TWO);

    let payload = parse_payload(last_line(&result.output));
    assert_eq!(payload["command"], "price");
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["message"], "budget_interno=1628.64 budget_effettivo=1935.36");
}

#[test]
fn price_clamps_out_of_range_inputs() {
    let clamped = price::run(&PriceArgs {
        base_price: "1000".to_string(),
        urgenza: Some("9".to_string()),
        complessita: Some("-3".to_string()),
        ..PriceArgs::default()
    });
    let bounded = price::run(&PriceArgs {
        base_price: "1000".to_string(),
        urgenza: Some("5".to_string()),
        complessita: Some("0".to_string()),
        ..PriceArgs::default()
    });

    assert_eq!(clamped.exit_code, 0);
    assert_eq!(first_line(&clamped.output), first_line(&bounded.output));
}

#[test]
fn price_merges_json_weights_file_over_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("weights.json");
    fs::write(&path, r#"{"moltiplicatore_arrotondamento": "0.1", "moltiplicatore_base": "10"}"#)
        .expect("write weights");

    let result = price::run(&PriceArgs {
        base_price: "1000".to_string(),
        importanza: Some("0".to_string()),
        prosperita_economica: Some("0".to_string()),
        weights: Some(path),
        ..PriceArgs::default()
    });
    assert_eq!(result.exit_code, 0, "expected pricing success: {}", result.output);

    let detail = parse_payload(first_line(&result.output));
    assert_eq!(decimal_field(&detail, "budget_interno"), Decimal::from_str("1628.64").unwrap());
    assert_eq!(decimal_field(&detail, "budget_effettivo"), Decimal::from_str("1630").unwrap());
}

#[test]
fn price_reads_toml_weights_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("weights.toml");
    fs::write(&path, "peso_urgenza = \"0\"\npeso_complessita = \"0\"\n").expect("write weights");

    let result = price::run(&PriceArgs {
        base_price: "1000".to_string(),
        weights: Some(path),
        ..PriceArgs::default()
    });
    assert_eq!(result.exit_code, 0, "expected pricing success: {}", result.output);

    // 1000 × 1 × 1 × 0.9 × 1.16
    let detail = parse_payload(first_line(&result.output));
    assert_eq!(decimal_field(&detail, "budget_interno"), Decimal::from_str("1044").unwrap());
}

#[test]
fn price_rejects_malformed_numbers_as_input_failures() {
    let result = price::run(&PriceArgs {
        base_price: "1000".to_string(),
        urgenza: Some("high".to_string()),
        ..PriceArgs::default()
    });
    assert_eq!(result.exit_code, 6);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "price");
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["error_class"], "input");
    assert!(payload["message"].as_str().unwrap_or_default().contains("--urgenza"));
}

#[test]
fn price_rejects_missing_weights_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = price::run(&PriceArgs {
        base_price: "1000".to_string(),
        weights: Some(dir.path().join("absent.json")),
        ..PriceArgs::default()
    });

    assert_eq!(result.exit_code, 6);
    assert_eq!(parse_payload(&result.output)["error_class"], "input");
}

#[test]
fn price_reports_overflow_instead_of_panicking() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("weights.json");
    fs::write(&path, r#"{"peso_urgenza": "79228162514264337593543950335"}"#).expect("write");

    let result = price::run(&PriceArgs {
        base_price: "79228162514264337593543950335".to_string(),
        urgenza: Some("5".to_string()),
        weights: Some(path),
        ..PriceArgs::default()
    });

    assert_eq!(result.exit_code, 6);
    let payload = parse_payload(&result.output);
    assert!(payload["message"].as_str().unwrap_or_default().contains("overflow"));
}

fn decimal_field(detail: &Value, key: &str) -> Decimal {
    let raw = detail[key].as_str().expect("decimal fields serialize as strings");
    Decimal::from_str(raw).expect("valid decimal")
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn first_line(output: &str) -> &str {
    output.lines().next().unwrap_or_default()
}

fn last_line(output: &str) -> &str {
    output.lines().last().unwrap_or_default()
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "VALORA_DATABASE_URL",
        "VALORA_DATABASE_MAX_CONNECTIONS",
        "VALORA_DATABASE_TIMEOUT_SECS",
        "VALORA_SERVER_BIND_ADDRESS",
        "VALORA_SERVER_PORT",
        "VALORA_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "VALORA_IDENTITY_GATEWAY_SECRET",
        "VALORA_LOGGING_LEVEL",
        "VALORA_LOGGING_FORMAT",
        "VALORA_LOG_LEVEL",
        "VALORA_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
