use super::*;

fn settings(raw: RawSettings) -> Settings {
    Settings::from_raw(raw, ServiceRole::Notes).expect("valid settings")
}

fn invalid_key(raw: RawSettings) -> &'static str {
    match Settings::from_raw(raw, ServiceRole::Notes) {
        Err(LoadError::Invalid { key, .. }) => key,
        other => panic!("expected invalid settings, got {other:?}"),
    }
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = settings(raw);

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn default_port_follows_the_service_role() {
    let notebooks = Settings::from_raw(RawSettings::default(), ServiceRole::Notebooks)
        .expect("valid settings");
    let notes = settings(RawSettings::default());

    assert_eq!(notebooks.server.addr.port(), 3001);
    assert_eq!(notes.server.addr.port(), 3002);
}

#[test]
fn defaults_match_documented_values() {
    let settings = settings(RawSettings::default());

    assert!(settings.database.url.is_none());
    assert_eq!(
        settings.cache.redis_url.as_deref(),
        Some("redis://127.0.0.1:6379")
    );
    assert_eq!(settings.cache.fresh_ttl, Duration::from_secs(1));
    assert_eq!(settings.cache.timeout, Duration::from_millis(500));
    assert_eq!(settings.peers.request_timeout, Duration::from_millis(2000));
    assert_eq!(settings.peers.notebooks_origin.as_str(), "http://127.0.0.1:3001/");
    assert_eq!(settings.retry.max_attempts.get(), 2);
    assert_eq!(settings.retry.delay, Duration::from_millis(1000));
    assert_eq!(settings.ids.notebooks.encode(0).unwrap(), "b8ameai");
    assert_eq!(settings.ids.notes.encode(0).unwrap(), "nyUmPne");
}

#[test]
fn empty_redis_url_selects_in_process_store() {
    let mut raw = RawSettings::default();
    raw.apply_serve_overrides(&ServeOverrides {
        cache_redis_url: Some(String::new()),
        ..Default::default()
    });

    assert!(settings(raw).cache.redis_url.is_none());
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);

    assert!(matches!(settings(raw).logging.format, LogFormat::Json));
}

#[test]
fn zero_values_are_rejected() {
    let mut raw = RawSettings::default();
    raw.retry.max_attempts = Some(0);
    assert_eq!(invalid_key(raw), "retry.max_attempts");

    let mut raw = RawSettings::default();
    raw.cache.timeout_ms = Some(0);
    assert_eq!(invalid_key(raw), "cache.timeout_ms");

    let mut raw = RawSettings::default();
    raw.server.port = Some(0);
    assert_eq!(invalid_key(raw), "server.port");
}

#[test]
fn retry_delay_must_cover_fresh_ttl() {
    let mut raw = RawSettings::default();
    raw.retry.delay_ms = Some(500);
    assert_eq!(invalid_key(raw), "retry.delay_ms");

    let mut raw = RawSettings::default();
    raw.retry.delay_ms = Some(500);
    raw.retry.max_attempts = Some(1);
    assert_eq!(settings(raw).retry.delay, Duration::from_millis(500));

    let mut raw = RawSettings::default();
    raw.cache.fresh_ttl_seconds = Some(3);
    raw.retry.delay_ms = Some(3000);
    assert_eq!(settings(raw).cache.fresh_ttl, Duration::from_secs(3));
}

#[test]
fn codec_parameters_are_validated_at_load() {
    let mut raw = RawSettings::default();
    raw.ids.notes.multiplier = Some(62);
    assert_eq!(invalid_key(raw), "ids.notes");

    let mut raw = RawSettings::default();
    raw.ids.notebooks.length = Some(11);
    assert_eq!(invalid_key(raw), "ids.notebooks");
}

#[test]
fn peer_origins_must_be_http() {
    let mut raw = RawSettings::default();
    raw.peers.notebooks_origin = Some("ftp://example.com".to_string());
    assert_eq!(invalid_key(raw), "peers.notebooks_origin");
}

#[test]
fn parse_notes_command_with_overrides() {
    let args = CliArgs::parse_from([
        "notekeep",
        "notes",
        "--server-host",
        "0.0.0.0",
        "--database-url",
        "postgres://override",
        "--retry-max-attempts",
        "3",
    ]);

    assert_eq!(args.command.role(), ServiceRole::Notes);
    let overrides = args.command.overrides();
    assert_eq!(overrides.server_host.as_deref(), Some("0.0.0.0"));
    assert_eq!(overrides.database_url.as_deref(), Some("postgres://override"));
    assert_eq!(overrides.retry_max_attempts, Some(3));
}

#[test]
fn parse_notebooks_command() {
    let args = CliArgs::parse_from(["notekeep", "notebooks"]);
    assert_eq!(args.command.role(), ServiceRole::Notebooks);
}
