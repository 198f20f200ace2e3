//! Session construction and multi-source queries.

mod support;

use std::io::Write;
use std::sync::Arc;

use lightfirst::config::SessionConfig;
use lightfirst::services::{Session, SessionError};
use lightfirst::sources::{AuthInfo, RecordingSleeper, RetryPolicy, SourceRegistry};
use support::{
    photopoint, spawn_atlas, spawn_skypatrol, spawn_ztf, with_scoped_env,
    AtlasScenario, ZtfScenario, AMPEL_TOKEN, ATLAS_PASSWORD, ATLAS_USER,
};

const MJD_OFFSET: f64 = 2_400_000.5;

#[test]
fn test_unknown_source_fails_before_any_query() {
    let config = SessionConfig::with_sources([("atlas", AuthInfo::credentials("u", "p")), ("tess", AuthInfo::none())]);
    match Session::new(&config) {
        Err(SessionError::Configuration { source_name, .. }) => {
            assert_eq!(source_name.as_deref(), Some("tess"));
        }
        other => panic!("expected configuration error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_custom_registry() {
    let config = SessionConfig::with_sources([("asas-sn", AuthInfo::none())]);
    let err = Session::builder(config)
        .registry(SourceRegistry::empty())
        .build()
        .unwrap_err();
    assert!(matches!(err, SessionError::Configuration { .. }));
}

#[tokio::test]
async fn test_all_sources_aggregated() {
    let (atlas_base, _) = spawn_atlas(AtlasScenario::default()).await;
    let (ztf_base, _) = spawn_ztf(ZtfScenario {
        objects: vec![(
            "ZTF18a".to_string(),
            vec![photopoint(58285.0 + MJD_OFFSET, Some(17.4), 2)],
        )],
        ..Default::default()
    })
    .await;
    // Sky Patrol finds nothing; the other sources are unaffected
    let (asas_base, _) = spawn_skypatrol(200, vec![]).await;

    let mut config = SessionConfig::with_sources([
        ("atlas", AuthInfo::credentials(ATLAS_USER, ATLAS_PASSWORD)),
        ("ztf", AuthInfo::token(AMPEL_TOKEN)),
        ("asas-sn", AuthInfo::none()),
    ]);
    config.endpoints.atlas = Some(atlas_base);
    config.endpoints.ztf = Some(ztf_base);
    config.endpoints.asas_sn = Some(asas_base);

    let session = Session::builder(config)
        .sleeper(Arc::new(RecordingSleeper::new()))
        .build()
        .unwrap();
    let results = session
        .query_all(244.00092, 22.26803, "2018-06-04", "2018-06-29")
        .await
        .unwrap();

    assert_eq!(
        results.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["asas-sn", "atlas", "ztf"]
    );
    assert!(results["asas-sn"].is_empty());
    assert_eq!(results["asas-sn"].columns().len(), 6);
    assert_eq!(results["atlas"].len(), 2);
    assert_eq!(results["ztf"].len(), 1);
    assert_eq!(results["ztf"].filters(), vec!["r"]);
}

#[tokio::test]
async fn test_fatal_source_error_propagates() {
    let (atlas_base, _) = spawn_atlas(AtlasScenario {
        poll_status: 500,
        ..Default::default()
    })
    .await;
    let mut config = SessionConfig::with_sources([(
        "atlas",
        AuthInfo::credentials(ATLAS_USER, ATLAS_PASSWORD),
    )]);
    config.endpoints.atlas = Some(atlas_base);

    let session = Session::builder(config)
        .sleeper(Arc::new(RecordingSleeper::new()))
        .build()
        .unwrap();
    let err = session
        .query_all(244.00092, 22.26803, "2018-06-04", "2018-06-29")
        .await
        .unwrap_err();

    match err {
        SessionError::Source { source_name, .. } => assert_eq!(source_name, "atlas"),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_invalid_dates_rejected() {
    let session = Session::from_sources(Vec::new());
    assert!(matches!(
        session.query_all(10.0, 10.0, "2018-13-45", "2018-06-29").await,
        Err(SessionError::InvalidDate(_))
    ));
    assert!(matches!(
        session.query_all(10.0, 95.0, "2018-06-04", "2018-06-29").await,
        Err(SessionError::InvalidQuery(_))
    ));
}

#[test]
fn test_config_from_env() {
    let config = with_scoped_env(
        &[
            ("LIGHTFIRST_SOURCES", Some("atlas, ztf")),
            ("ATLAS_USERNAME", Some("observer")),
            ("ATLAS_PASSWORD", Some("secret")),
            ("AMPEL_TOKEN", Some("tok")),
            ("ATLAS_URL", Some("http://127.0.0.1:8000")),
            ("AMPEL_URL", None),
            ("ASASSN_URL", None),
            ("LIGHTFIRST_MAX_ATTEMPTS", Some("4")),
            ("LIGHTFIRST_REQUEST_TIMEOUT", None),
        ],
        SessionConfig::from_env,
    )
    .unwrap();

    assert_eq!(config.sources["atlas"], AuthInfo::credentials("observer", "secret"));
    assert_eq!(config.sources["ztf"], AuthInfo::token("tok"));
    assert_eq!(config.endpoints.atlas.as_deref(), Some("http://127.0.0.1:8000"));
    assert_eq!(config.endpoints.ztf, None);
    assert_eq!(config.retry_policy(), RetryPolicy::bounded(4));
    assert_eq!(config.retry.request_timeout_secs, 60);
    assert!(Session::new(&config).is_ok());
}

#[test]
fn test_config_from_env_requires_sources() {
    let result = with_scoped_env(&[("LIGHTFIRST_SOURCES", None)], SessionConfig::from_env);
    assert!(matches!(result, Err(SessionError::Configuration { .. })));
}

#[test]
fn test_config_from_env_missing_credentials() {
    let config = with_scoped_env(
        &[
            ("LIGHTFIRST_SOURCES", Some("atlas")),
            ("ATLAS_USERNAME", None),
            ("ATLAS_PASSWORD", None),
            ("LIGHTFIRST_MAX_ATTEMPTS", None),
            ("LIGHTFIRST_REQUEST_TIMEOUT", None),
        ],
        SessionConfig::from_env,
    )
    .unwrap();
    assert!(matches!(
        Session::new(&config),
        Err(SessionError::Configuration { .. })
    ));
}

#[test]
fn test_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[sources."asas-sn"]

[sources.ztf]
token = "tok"

[endpoints]
ztf = "http://127.0.0.1:9000"

[retry]
request_timeout_secs = 5
"#
    )
    .unwrap();

    let config = SessionConfig::from_file(file.path()).unwrap();
    let session = Session::new(&config).unwrap();
    assert_eq!(session.source_names(), vec!["asas-sn", "ztf"]);
    assert_eq!(config.retry.request_timeout_secs, 5);
}

#[test]
fn test_config_file_missing() {
    let dir = tempfile::tempdir().unwrap();
    let err = SessionConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_config_file_alternate_source_spelling() {
    let config = SessionConfig::from_toml_str(
        r#"
[sources.asas_sn]

[endpoints]
asas_sn = "http://127.0.0.1:9006"
"#,
    )
    .unwrap();
    let session = Session::new(&config).unwrap();
    assert_eq!(session.source_names(), vec!["asas-sn"]);
}
