mod common;

use common::{Fixture, url};
use http::{Method, StatusCode};
use offgrid::{FetchOutcome, PassthroughReason, RequestClass, ResponseSource};
use offgrid_backend::CacheStorage;
use offgrid_core::{CacheKind, Request, Response};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn cached_static_asset_skips_network_and_is_byte_identical() {
    let fixture = Fixture::activated().await;
    let request = Request::get(url("/_astro/app.js"));
    let stored = Response::ok("console.log(1)");
    let static_cache = fixture.interceptor.config().cache_names.get(CacheKind::Static);
    fixture
        .storage
        .put(static_cache, &request, stored.clone())
        .await
        .unwrap();

    let outcome = fixture.interceptor.fetch(&request).await;
    assert_eq!(outcome.source(), Some(ResponseSource::Cache(CacheKind::Static)));
    assert_eq!(outcome.into_response().unwrap(), stored);
    assert_eq!(fixture.network.calls(), 0);
}

#[tokio::test]
async fn image_miss_is_fetched_and_stored() {
    let fixture = Fixture::activated().await;
    let request = Request::image(url("/images/speakers/alice.webp"));

    let first = fixture.interceptor.fetch(&request).await;
    assert_eq!(first.source(), Some(ResponseSource::Network));
    let second = fixture.interceptor.fetch(&request).await;
    assert_eq!(second.source(), Some(ResponseSource::Cache(CacheKind::Image)));
    assert_eq!(fixture.network.calls(), 1);
}

#[tokio::test]
async fn non_ok_responses_are_not_stored() {
    let fixture = Fixture::activated().await;
    fixture
        .network
        .respond_with("/assets/missing.css", StatusCode::NOT_FOUND);
    let request = Request::get(url("/assets/missing.css"));

    let outcome = fixture.interceptor.fetch(&request).await;
    assert_eq!(outcome.response().unwrap().status(), StatusCode::NOT_FOUND);
    let static_cache = fixture.interceptor.config().cache_names.get(CacheKind::Static);
    assert!(fixture.storage.match_in(static_cache, &request).await.unwrap().is_none());
}

#[tokio::test]
async fn offline_image_miss_is_synthesized_404() {
    let fixture = Fixture::activated().await;
    fixture.network.set_offline(true);

    let outcome = fixture
        .interceptor
        .fetch(&Request::image(url("/images/unknown.png")))
        .await;
    let response = outcome.response().unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.text(), "Image not available");
}

#[tokio::test]
async fn offline_static_navigation_uses_offline_page_then_503() {
    let fixture = Fixture::activated().await;
    fixture.network.set_offline(true);
    let navigation = Request::navigate(url("/about/"));

    let outcome = fixture.interceptor.fetch(&navigation).await;
    assert_eq!(outcome.source(), Some(ResponseSource::Synthesized));
    assert_eq!(outcome.response().unwrap().status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(outcome.response().unwrap().text(), "Offline");

    let static_cache = fixture.interceptor.config().cache_names.get(CacheKind::Static);
    fixture
        .storage
        .put(
            static_cache,
            &Request::get(url("/offline.html")),
            Response::ok("<h1>offline</h1>"),
        )
        .await
        .unwrap();
    let outcome = fixture.interceptor.fetch(&navigation).await;
    assert_eq!(outcome.source(), Some(ResponseSource::OfflinePage));
    assert_eq!(outcome.response().unwrap().text(), "<h1>offline</h1>");
}

#[tokio::test]
async fn offline_static_subresource_is_404() {
    let fixture = Fixture::activated().await;
    fixture.network.set_offline(true);

    let outcome = fixture.interceptor.fetch(&Request::get(url("/assets/site.css"))).await;
    assert_eq!(outcome.response().unwrap().status(), StatusCode::NOT_FOUND);
    assert_eq!(outcome.response().unwrap().text(), "Resource not available");
}

#[tokio::test]
async fn dynamic_success_updates_cache_before_delivery() {
    let fixture = Fixture::activated().await;
    let request = Request::navigate(url("/cities/beijing"));

    let outcome = fixture.interceptor.fetch(&request).await;
    let FetchOutcome::Answered { class, source, response } = outcome else {
        panic!("dynamic request was not answered");
    };
    assert_eq!(class, RequestClass::Dynamic);
    assert_eq!(source, ResponseSource::Network);

    let dynamic = fixture.interceptor.config().cache_names.get(CacheKind::Dynamic);
    let cached = fixture.storage.match_in(dynamic, &request).await.unwrap();
    assert_eq!(cached, Some(response));
}

#[tokio::test]
async fn dynamic_falls_back_to_cache_then_root() {
    let fixture = Fixture::activated().await;
    let cached_city = Request::navigate(url("/en/cities/shanghai"));
    fixture.interceptor.fetch(&cached_city).await;
    fixture.network.set_offline(true);

    let outcome = fixture.interceptor.fetch(&cached_city).await;
    assert_eq!(outcome.source(), Some(ResponseSource::Cache(CacheKind::Dynamic)));

    // The root was stored by install.
    let outcome = fixture
        .interceptor
        .fetch(&Request::navigate(url("/cities/shenzhen")))
        .await;
    assert_eq!(outcome.source(), Some(ResponseSource::Root));
    assert_eq!(outcome.response().unwrap().text(), "network /");

    let outcome = fixture.interceptor.fetch(&Request::get(url("/api/events"))).await;
    assert_eq!(outcome.response().unwrap().status(), StatusCode::NOT_FOUND);
    assert_eq!(outcome.response().unwrap().text(), "Content not available");
}

#[tokio::test]
async fn default_requests_are_never_cached() {
    let fixture = Fixture::activated().await;
    let request = Request::get(url("/robots.txt"));

    fixture.interceptor.fetch(&request).await;
    fixture.interceptor.fetch(&request).await;
    assert_eq!(fixture.network.calls(), 2);
    assert!(fixture.storage.match_any(&request).await.unwrap().is_none());

    fixture.network.set_offline(true);
    let outcome = fixture.interceptor.fetch(&request).await;
    assert_eq!(outcome.response().unwrap().text(), "Request failed");
}

#[tokio::test]
async fn offline_default_navigation_without_root_is_503() {
    let fixture = Fixture::new();
    fixture.interceptor.install().await.unwrap();
    fixture.interceptor.activate().await.unwrap();
    let static_cache = fixture.interceptor.config().cache_names.get(CacheKind::Static);
    fixture.storage.delete(static_cache).await.unwrap();
    fixture.network.set_offline(true);

    let outcome = fixture.interceptor.fetch(&Request::navigate(url("/about"))).await;
    assert_eq!(outcome.response().unwrap().status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn cross_origin_and_non_get_pass_through() {
    let fixture = Fixture::activated().await;

    let cross = Request::parse("https://fonts.example.com/inter.woff2").unwrap();
    assert_eq!(
        fixture.interceptor.fetch(&cross).await,
        FetchOutcome::Passthrough(PassthroughReason::CrossOrigin)
    );

    let post = Request::get(url("/api/rsvp")).with_method(Method::POST);
    assert_eq!(
        fixture.interceptor.fetch(&post).await,
        FetchOutcome::Passthrough(PassthroughReason::Method)
    );
    assert_eq!(fixture.network.calls(), 0);
}

#[tokio::test]
async fn concurrent_fetches_complete_independently() {
    let fixture = Fixture::activated().await;
    let requests: Vec<_> = (0..20)
        .map(|i| Request::get(url(&format!("/api/items/{i}"))))
        .collect();

    let outcomes =
        futures::future::join_all(requests.iter().map(|r| fixture.interceptor.fetch(r))).await;
    assert!(outcomes.iter().all(|o| o.source() == Some(ResponseSource::Network)));

    let dynamic = fixture.interceptor.config().cache_names.get(CacheKind::Dynamic);
    assert_eq!(fixture.storage.len(dynamic).await.unwrap(), 20);
}
