mod common;

use std::sync::atomic::Ordering;

use common::{Fixture, url};
use http::StatusCode;
use offgrid::{
    Event, FetchOutcome, InterceptError, LifecycleEvent, LifecycleState, Outcome,
    PassthroughReason,
};
use offgrid_backend::CacheStorage;
use offgrid_core::{CacheKind, CacheName, Request, Response};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn install_stores_whole_manifest_and_skips_waiting() {
    let fixture = Fixture::new();

    let outcome = fixture.interceptor.dispatch(Event::Install).await.unwrap();
    assert_eq!(outcome, Outcome::Installed);
    assert_eq!(fixture.interceptor.state(), LifecycleState::Installed);
    assert_eq!(fixture.host.skipped_waiting.load(Ordering::SeqCst), 1);

    let static_cache = fixture.interceptor.config().cache_names.get(CacheKind::Static);
    let stored: Vec<_> = fixture
        .storage
        .requests(static_cache)
        .await
        .unwrap()
        .iter()
        .map(|r| r.path().to_owned())
        .collect();
    assert_eq!(stored, offgrid::config::DEFAULT_MANIFEST.to_vec());
}

#[tokio::test]
async fn one_failing_manifest_entry_fails_whole_install() {
    let fixture = Fixture::new();
    fixture
        .network
        .respond_with("/images/hero-bg.webp", StatusCode::NOT_FOUND);

    let error = fixture.interceptor.dispatch(Event::Install).await.unwrap_err();
    assert!(matches!(
        error,
        InterceptError::ManifestStatus { status: StatusCode::NOT_FOUND, .. }
    ));
    assert_eq!(fixture.interceptor.state(), LifecycleState::Redundant);

    let static_cache = fixture.interceptor.config().cache_names.get(CacheKind::Static);
    assert_eq!(fixture.storage.len(static_cache).await.unwrap(), 0);
}

#[tokio::test]
async fn offline_install_fails() {
    let fixture = Fixture::new();
    fixture.network.set_offline(true);

    let error = fixture.interceptor.install().await.unwrap_err();
    assert!(matches!(error, InterceptError::ManifestFetch { .. }));
}

#[tokio::test]
async fn activate_before_install_is_rejected() {
    let fixture = Fixture::new();

    let error = fixture.interceptor.dispatch(Event::Activate).await.unwrap_err();
    assert!(matches!(
        error,
        InterceptError::InvalidTransition {
            from: LifecycleState::Parsed,
            event: LifecycleEvent::Activate,
        }
    ));
    assert_eq!(fixture.interceptor.state(), LifecycleState::Parsed);
}

#[tokio::test]
async fn activate_deletes_only_stale_caches() {
    let fixture = Fixture::new();
    fixture.interceptor.install().await.unwrap();

    let entry = Request::get(url("/"));
    for name in [
        "devcommunity-dynamic-v1",
        "devcommunity-image-v1",
        "devcommunity-static-v0",
    ] {
        fixture
            .storage
            .put(&CacheName::from(name), &entry, Response::ok("old"))
            .await
            .unwrap();
    }

    let outcome = fixture.interceptor.dispatch(Event::Activate).await.unwrap();
    assert_eq!(
        outcome,
        Outcome::Activated {
            deleted: vec![CacheName::from("devcommunity-static-v0")]
        }
    );
    assert_eq!(fixture.host.claims.load(Ordering::SeqCst), 1);

    let mut remaining: Vec<_> = fixture
        .storage
        .keys()
        .await
        .unwrap()
        .into_iter()
        .map(|name| name.to_string())
        .collect();
    remaining.sort();
    assert_eq!(
        remaining,
        vec![
            "devcommunity-dynamic-v1",
            "devcommunity-image-v1",
            "devcommunity-static-v1",
        ]
    );
}

#[tokio::test]
async fn fetches_pass_through_until_activated() {
    let fixture = Fixture::new();
    fixture.interceptor.install().await.unwrap();

    let outcome = fixture.interceptor.fetch(&Request::get(url("/favicon.svg"))).await;
    assert_eq!(outcome, FetchOutcome::Passthrough(PassthroughReason::NotActive));
}
