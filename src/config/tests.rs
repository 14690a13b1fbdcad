use std::io::Write;

use clap::Parser;
use serial_test::serial;
use tempfile::NamedTempFile;

use super::*;

#[derive(Debug, Parser)]
struct TestCli {
    #[command(flatten)]
    overrides: ConfigOverrides,
}

fn raw_with_base() -> RawSettings {
    let mut raw = RawSettings::default();
    raw.client.base_url = Some("https://api.example.com".to_string());
    raw
}

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("tmp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = raw_with_base();
    raw.client.timeout_ms = Some(1_000);
    raw.logging.level = Some("info".to_string());

    let overrides = ConfigOverrides {
        timeout_ms: Some(2_500),
        log_level: Some("debug".to_string()),
        base_url: Some("https://override.example.com/v1/".to_string()),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.client.timeout, Duration::from_millis(2_500));
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(
        settings.client.base_url.as_str(),
        "https://override.example.com/v1/"
    );
}

#[test]
fn defaults_apply_when_sections_are_missing() {
    let settings = Settings::from_raw(raw_with_base()).expect("valid settings");
    assert_eq!(settings.client.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
    assert!(settings.client.user_agent.is_none());
    assert!(settings.proxy.throw_on_http_error);
    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert!(settings.routes.is_empty());
}

#[test]
fn base_url_is_required() {
    let err = Settings::from_raw(RawSettings::default()).expect_err("missing base url");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "client.base_url",
            ..
        }
    ));
}

#[test]
fn zero_timeout_is_rejected() {
    let mut raw = raw_with_base();
    raw.client.timeout_ms = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero timeout");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "client.timeout_ms",
            ..
        }
    ));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = raw_with_base();
    let overrides = ConfigOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn no_throw_flag_disables_http_policy() {
    let cli = TestCli::parse_from([
        "route-query",
        "--base-url",
        "https://api.example.com",
        "--no-throw-on-http-error",
    ]);
    let mut raw = RawSettings::default();
    raw.apply_overrides(&cli.overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(!settings.proxy.throw_on_http_error);
    assert!(!settings.proxy_config().throw_on_http_error);
}

#[test]
fn parse_override_arguments() {
    let cli = TestCli::parse_from([
        "route-query",
        "--timeout-ms",
        "750",
        "--user-agent",
        "tests/1.0",
        "--log-json",
        "yes",
    ]);

    assert_eq!(cli.overrides.timeout_ms, Some(750));
    assert_eq!(cli.overrides.user_agent.as_deref(), Some("tests/1.0"));
    assert_eq!(cli.overrides.log_json, Some(true));
    assert!(!cli.overrides.no_throw_on_http_error);
}

#[test]
fn routes_are_validated() {
    let mut raw = raw_with_base();
    raw.routes.push(RawRouteSettings {
        method: "PUT".to_string(),
        path: "/params/:id".to_string(),
        accepts: vec!["param".to_string(), "json".to_string()],
    });
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(
        settings.routes,
        vec![RouteSettings {
            verb: Verb::Put,
            path: "/params/:id".to_string(),
            accepts: InputShape::PARAM | InputShape::JSON,
        }]
    );

    let mut raw = raw_with_base();
    raw.routes.push(RawRouteSettings {
        method: "$get".to_string(),
        path: "/".to_string(),
        accepts: vec!["body".to_string()],
    });
    let err = Settings::from_raw(raw).expect_err("unknown part");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "routes.accepts",
            ..
        }
    ));

    let mut raw = raw_with_base();
    raw.routes.push(RawRouteSettings {
        method: "TRACE".to_string(),
        path: "/".to_string(),
        accepts: Vec::new(),
    });
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
#[serial]
fn load_reads_an_explicit_config_file() {
    let file = config_file(
        r#"
[client]
base_url = "https://files.example.com"
timeout_ms = 5000

[proxy]
throw_on_http_error = false

[[routes]]
method = "GET"
path = "/"

[[routes]]
method = "POST"
path = "/params/:id"
accepts = ["param", "json"]
"#,
    );

    let settings = load(Some(file.path()), &ConfigOverrides::default()).expect("settings");
    assert_eq!(settings.client.base_url.as_str(), "https://files.example.com/");
    assert_eq!(settings.client.timeout, Duration::from_secs(5));
    assert!(!settings.proxy.throw_on_http_error);
    assert_eq!(settings.routes.len(), 2);
    assert_eq!(settings.routes[1].verb, Verb::Post);

    let client = settings.build_client().expect("client");
    assert_eq!(client.base_url().as_str(), "https://files.example.com/");
}

#[test]
#[serial]
fn environment_overrides_file_values() {
    let file = config_file(
        r#"
[client]
base_url = "https://files.example.com"
timeout_ms = 5000
"#,
    );

    // SAFETY: serialized with every other test touching the environment.
    unsafe {
        std::env::set_var("ROUTE_QUERY__CLIENT__TIMEOUT_MS", "1200");
    }
    let settings = load(Some(file.path()), &ConfigOverrides::default());
    unsafe {
        std::env::remove_var("ROUTE_QUERY__CLIENT__TIMEOUT_MS");
    }

    let settings = settings.expect("settings");
    assert_eq!(settings.client.timeout, Duration::from_millis(1_200));
}

#[test]
#[serial]
fn missing_explicit_config_file_is_an_error() {
    let err = load(
        Some(Path::new("/nonexistent/route-query.toml")),
        &ConfigOverrides::default(),
    )
    .expect_err("missing file");
    assert!(matches!(err, LoadError::Build(_)));
}
