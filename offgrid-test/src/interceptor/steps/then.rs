use std::sync::atomic::Ordering;

use anyhow::{Error, anyhow};
use cucumber::then;
use offgrid::FetchOutcome;
use offgrid::push::ClickOutcome;
use offgrid_backend::CacheStorage;
use offgrid_core::CacheName;
use pretty_assertions::assert_eq;

use crate::interceptor::world::{InterceptorWorld, parse_kind};

// =============================================================================
// Response Assertions
// =============================================================================

#[then(expr = "the response status is {int}")]
fn response_status(world: &mut InterceptorWorld, status: u16) -> Result<(), Error> {
    let response = world
        .fetched()?
        .response()
        .ok_or_else(|| anyhow!("request was passed through"))?;
    assert_eq!(response.status().as_u16(), status);
    Ok(())
}

#[then(expr = "the response body is {string}")]
fn response_body(world: &mut InterceptorWorld, body: String) -> Result<(), Error> {
    let response = world
        .fetched()?
        .response()
        .ok_or_else(|| anyhow!("request was passed through"))?;
    assert_eq!(response.text(), body);
    Ok(())
}

#[then(expr = "the response comes from {string}")]
fn response_source(world: &mut InterceptorWorld, source: String) -> Result<(), Error> {
    let actual = world
        .fetched()?
        .source()
        .ok_or_else(|| anyhow!("request was passed through"))?;
    assert_eq!(actual.as_str(), source);
    Ok(())
}

#[then(expr = "the request is passed through")]
fn passed_through(world: &mut InterceptorWorld) -> Result<(), Error> {
    assert!(
        matches!(world.fetched()?, FetchOutcome::Passthrough(_)),
        "expected passthrough, got {:?}",
        world.last_fetch
    );
    Ok(())
}

// =============================================================================
// Network Assertions
// =============================================================================

#[then(expr = "the network is called {int} time(s)")]
fn network_calls(world: &mut InterceptorWorld, count: usize) -> Result<(), Error> {
    assert_eq!(world.network.call_count(), count);
    Ok(())
}

#[then(expr = "the network is asked for {string} {int} time(s)")]
fn network_calls_to(world: &mut InterceptorWorld, path: String, count: usize) -> Result<(), Error> {
    assert_eq!(world.network.calls_to(&path), count);
    Ok(())
}

// =============================================================================
// Cache Assertions
// =============================================================================

#[then(expr = "the {word} cache holds {string} with body {string}")]
async fn cache_holds(
    world: &mut InterceptorWorld,
    kind: String,
    path: String,
    body: String,
) -> Result<(), Error> {
    let name = world.cache_name(parse_kind(&kind)?);
    let request = world.request(&path);
    let cached = world
        .storage
        .match_in(&name, &request)
        .await?
        .ok_or_else(|| anyhow!("{path} is not in {name}"))?;
    assert_eq!(cached.text(), body);
    Ok(())
}

#[then(expr = "the {word} cache does not hold {string}")]
async fn cache_misses(world: &mut InterceptorWorld, kind: String, path: String) -> Result<(), Error> {
    let name = world.cache_name(parse_kind(&kind)?);
    let request = world.request(&path);
    assert!(world.storage.match_in(&name, &request).await?.is_none());
    Ok(())
}

#[then(expr = "the {word} cache has {int} entries")]
async fn cache_len(world: &mut InterceptorWorld, kind: String, count: usize) -> Result<(), Error> {
    let name = world.cache_name(parse_kind(&kind)?);
    assert_eq!(world.storage.len(&name).await?, count);
    Ok(())
}

#[then(expr = "the cache named {string} exists")]
async fn named_cache_exists(world: &mut InterceptorWorld, name: String) -> Result<(), Error> {
    assert!(world.storage.has(&CacheName::from(name.as_str())).await?);
    Ok(())
}

#[then(expr = "the cache named {string} is gone")]
async fn named_cache_gone(world: &mut InterceptorWorld, name: String) -> Result<(), Error> {
    assert!(!world.storage.has(&CacheName::from(name.as_str())).await?);
    Ok(())
}

#[then(expr = "the cache named {string} has {int} entries")]
async fn named_cache_len(
    world: &mut InterceptorWorld,
    name: String,
    count: usize,
) -> Result<(), Error> {
    assert_eq!(world.storage.len(&CacheName::from(name.as_str())).await?, count);
    Ok(())
}

#[then(expr = "{int} entries were evicted")]
fn evicted(world: &mut InterceptorWorld, count: usize) -> Result<(), Error> {
    let report = world
        .last_trim
        .as_ref()
        .ok_or_else(|| anyhow!("no trim ran"))?;
    assert_eq!(report.evicted(), count);
    Ok(())
}

#[then(expr = "the newest {int} entries of the {word} cache remain")]
async fn newest_remain(world: &mut InterceptorWorld, count: usize, kind: String) -> Result<(), Error> {
    let name = world.cache_name(parse_kind(&kind)?);
    let paths: Vec<String> = world
        .storage
        .requests(&name)
        .await?
        .iter()
        .map(|request| request.path().to_owned())
        .collect();
    assert_eq!(paths.len(), count);
    let total = paths.len() + world.last_trim.as_ref().map_or(0, |r| r.evicted());
    let expected: Vec<String> = (total - count..total)
        .map(|i| format!("/api/items/{i}"))
        .collect();
    assert_eq!(paths, expected);
    Ok(())
}

// =============================================================================
// Lifecycle Assertions
// =============================================================================

#[then(expr = "the lifecycle state is {string}")]
fn lifecycle_state(world: &mut InterceptorWorld, state: String) -> Result<(), Error> {
    assert_eq!(world.interceptor().state().as_str(), state);
    Ok(())
}

#[then(expr = "the install fails")]
fn install_fails(world: &mut InterceptorWorld) -> Result<(), Error> {
    assert!(world.last_error.is_some(), "install unexpectedly succeeded");
    Ok(())
}

#[then(expr = "the host was asked to skip waiting")]
fn skipped_waiting(world: &mut InterceptorWorld) -> Result<(), Error> {
    assert_eq!(world.host.skipped_waiting.load(Ordering::SeqCst), 1);
    Ok(())
}

#[then(expr = "the host was asked to claim clients")]
fn claimed(world: &mut InterceptorWorld) -> Result<(), Error> {
    assert_eq!(world.host.claims.load(Ordering::SeqCst), 1);
    Ok(())
}

// =============================================================================
// Notification Assertions
// =============================================================================

#[then(expr = "a notification titled {string} is shown")]
fn notification_shown(world: &mut InterceptorWorld, title: String) -> Result<(), Error> {
    let shown = world.host.shown.lock().unwrap();
    let last = shown
        .last()
        .ok_or_else(|| anyhow!("no notification was shown"))?;
    assert_eq!(last.title, title);
    Ok(())
}

#[then(expr = "the notification links to {string}")]
fn notification_url(world: &mut InterceptorWorld, url: String) -> Result<(), Error> {
    let notification = world
        .last_notification
        .as_ref()
        .ok_or_else(|| anyhow!("no notification was shown"))?;
    assert_eq!(notification.url, url);
    Ok(())
}

#[then(expr = "the notification offers the actions {string}")]
fn notification_actions(world: &mut InterceptorWorld, actions: String) -> Result<(), Error> {
    let notification = world
        .last_notification
        .as_ref()
        .ok_or_else(|| anyhow!("no notification was shown"))?;
    let offered: Vec<&str> = notification
        .actions
        .iter()
        .map(|action| action.action.as_str())
        .collect();
    assert_eq!(offered.join(","), actions);
    Ok(())
}

#[then(expr = "no notification is shown")]
fn no_notification(world: &mut InterceptorWorld) -> Result<(), Error> {
    assert!(world.host.shown.lock().unwrap().is_empty());
    Ok(())
}

#[then(expr = "the notification is closed")]
fn notification_closed(world: &mut InterceptorWorld) -> Result<(), Error> {
    assert_eq!(world.host.closed.lock().unwrap().len(), 1);
    Ok(())
}

#[then(expr = "a window is opened at {string}")]
fn window_opened(world: &mut InterceptorWorld, path: String) -> Result<(), Error> {
    let expected = world.origin.join(&path)?;
    assert_eq!(world.last_click, Some(ClickOutcome::Opened(expected.clone())));
    assert_eq!(*world.host.opened.lock().unwrap(), vec![expected]);
    Ok(())
}

#[then(expr = "the window at {string} is focused")]
fn window_focused(world: &mut InterceptorWorld, path: String) -> Result<(), Error> {
    let expected = world.origin.join(&path)?;
    assert_eq!(world.last_click, Some(ClickOutcome::Focused(expected)));
    assert!(world.host.opened.lock().unwrap().is_empty());
    Ok(())
}

#[then(expr = "no window is opened")]
fn no_window(world: &mut InterceptorWorld) -> Result<(), Error> {
    assert_eq!(world.last_click, Some(ClickOutcome::Dismissed));
    assert!(world.host.opened.lock().unwrap().is_empty());
    Ok(())
}

// =============================================================================
// Tracing Assertions
// =============================================================================

#[then(expr = "a {string} span is recorded")]
fn span_recorded(world: &mut InterceptorWorld, name: String) -> Result<(), Error> {
    let names = world.spans.span_names();
    assert!(names.contains(&name), "no {name} span in {names:?}");
    Ok(())
}

#[then(expr = "the {string} span has {string} set to {string}")]
fn span_field(
    world: &mut InterceptorWorld,
    span: String,
    field: String,
    value: String,
) -> Result<(), Error> {
    assert_eq!(world.spans.get_field(&span, &field), Some(value));
    Ok(())
}

#[then(expr = "a warning {string} is logged while handling {string}")]
fn warning_logged(world: &mut InterceptorWorld, message: String, span: String) -> Result<(), Error> {
    let warnings = world.spans.events_at_least(tracing::Level::WARN);
    assert!(
        warnings
            .iter()
            .any(|event| event.message == message && event.span == Some(span.as_str())),
        "no warning {message:?} in {span}: {warnings:?}"
    );
    Ok(())
}
