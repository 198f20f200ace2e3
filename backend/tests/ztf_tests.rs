//! ZTF through a mock AMPEL archive.

mod support;

use std::sync::atomic::Ordering;

use lightfirst::models::QueryWindow;
use lightfirst::sources::{AuthInfo, DataSource, SourceSettings, ZtfSource};
use support::{photopoint, spawn_ztf, ZtfScenario, AMPEL_TOKEN};

const MJD_OFFSET: f64 = 2_400_000.5;

fn window() -> QueryWindow {
    QueryWindow::new(244.00092, 22.26803, 58273.0, 58298.0).unwrap()
}

fn ztf(base: &str, token: &str) -> ZtfSource {
    ZtfSource::new(&SourceSettings::new(AuthInfo::token(token)).with_endpoint(base)).unwrap()
}

#[tokio::test]
async fn test_photopoints_mapped_to_unified_schema() {
    let (base, recorder) = spawn_ztf(ZtfScenario {
        objects: vec![(
            "ZTF18aaaaaaa".to_string(),
            vec![
                photopoint(58280.0 + MJD_OFFSET, Some(18.1), 1),
                photopoint(58281.0 + MJD_OFFSET, Some(18.3), 2),
                photopoint(58282.0 + MJD_OFFSET, Some(18.6), 3),
                // Non-detection
                photopoint(58283.0 + MJD_OFFSET, None, 1),
            ],
        )],
        ..Default::default()
    })
    .await;

    let table = ztf(&base, AMPEL_TOKEN).get_lc(&window()).await.unwrap();

    assert_eq!(table.len(), 3);
    assert_eq!(table.filters(), vec!["g", "r", "i"]);
    let first = table.iter().next().unwrap();
    assert_eq!(first.obj_id, "ZTF18aaaaaaa");
    assert!((first.mjd - 58280.0).abs() < 1e-6);
    assert_eq!(first.mag, 18.1);
    assert_eq!(first.mag_err, 0.05);
    assert_eq!(first.limit, 20.5);

    let query = recorder.cone_query.lock().unwrap().clone();
    let radius: f64 = query["radius"].parse().unwrap();
    assert!((radius - 1.0 / 3600.0).abs() < 1e-12);
    let jd_start: f64 = query["jd_start"].parse().unwrap();
    assert!((jd_start - (58273.0 + MJD_OFFSET)).abs() < 1e-6);
}

#[tokio::test]
async fn test_objects_concatenated_and_failures_skipped() {
    let (base, recorder) = spawn_ztf(ZtfScenario {
        objects: vec![
            (
                "ZTF18a".to_string(),
                vec![photopoint(58280.0 + MJD_OFFSET, Some(18.0), 1)],
            ),
            (
                "ZTF18b".to_string(),
                vec![
                    photopoint(58285.0 + MJD_OFFSET, Some(19.0), 2),
                    // Outside the window
                    photopoint(58400.0 + MJD_OFFSET, Some(19.2), 2),
                ],
            ),
            ("ZTF18c".to_string(), vec![]),
        ],
        failing_objects: vec!["ZTF18c".to_string()],
        ..Default::default()
    })
    .await;

    let table = ztf(&base, AMPEL_TOKEN).get_lc(&window()).await.unwrap();

    assert_eq!(recorder.photo_requests.load(Ordering::SeqCst), 3);
    let ids: Vec<&str> = table.iter().map(|r| r.obj_id.as_str()).collect();
    assert_eq!(ids, vec!["ZTF18a", "ZTF18b"]);
}

#[tokio::test]
async fn test_unknown_fid_marked() {
    let (base, _) = spawn_ztf(ZtfScenario {
        objects: vec![(
            "ZTF18x".to_string(),
            vec![photopoint(58280.0 + MJD_OFFSET, Some(18.0), 4)],
        )],
        ..Default::default()
    })
    .await;

    let table = ztf(&base, AMPEL_TOKEN).get_lc(&window()).await.unwrap();
    assert_eq!(table.filters(), vec!["fid:4"]);
}

#[tokio::test]
async fn test_failed_cone_search_is_empty() {
    let (base, recorder) = spawn_ztf(ZtfScenario {
        cone_status: 503,
        ..Default::default()
    })
    .await;

    let table = ztf(&base, AMPEL_TOKEN).get_lc(&window()).await.unwrap();
    assert!(table.is_empty());
    assert_eq!(recorder.photo_requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_rejected_token_is_empty() {
    let (base, _) = spawn_ztf(ZtfScenario {
        objects: vec![(
            "ZTF18a".to_string(),
            vec![photopoint(58280.0 + MJD_OFFSET, Some(18.0), 1)],
        )],
        ..Default::default()
    })
    .await;

    let table = ztf(&base, "wrong-token").get_lc(&window()).await.unwrap();
    assert!(table.is_empty());
}
