use std::sync::atomic::Ordering;

use anyhow::Error;
use cucumber::gherkin::Step;
use cucumber::given;
use http::StatusCode;
use offgrid_backend::CacheStorage;
use offgrid_core::{CacheName, Response};

use crate::interceptor::world::{InterceptorWorld, parse_kind};

// =============================================================================
// Setup Steps
// =============================================================================

#[given(expr = "the interceptor runs version {string}")]
fn runs_version(world: &mut InterceptorWorld, version: String) -> Result<(), Error> {
    world.version = version;
    Ok(())
}

#[given(expr = "the install manifest is")]
fn manifest(world: &mut InterceptorWorld, step: &Step) -> Result<(), Error> {
    let table = step
        .table
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("manifest step needs a table"))?;
    world.manifest = Some(table.rows.iter().map(|row| row[0].clone()).collect());
    Ok(())
}

#[given(expr = "the interceptor is active")]
async fn active(world: &mut InterceptorWorld) -> Result<(), Error> {
    world.activate().await
}

#[given(expr = "the host refuses to skip waiting")]
fn refuse_skip_waiting(world: &mut InterceptorWorld) -> Result<(), Error> {
    world.host.refuse_skip_waiting.store(true, Ordering::SeqCst);
    Ok(())
}

#[given(expr = "a window is open at {string}")]
fn window_open(world: &mut InterceptorWorld, path: String) -> Result<(), Error> {
    let url = world.origin.join(&path)?;
    world.host.open_windows.lock().unwrap().push(url);
    Ok(())
}

// =============================================================================
// Network Steps
// =============================================================================

#[given(expr = "the network is offline")]
fn offline(world: &mut InterceptorWorld) -> Result<(), Error> {
    world.network.set_offline(true);
    Ok(())
}

#[given(expr = "the network answers {string} with status {int}")]
fn network_status(world: &mut InterceptorWorld, path: String, status: u16) -> Result<(), Error> {
    world.network.respond_with(&path, StatusCode::from_u16(status)?);
    Ok(())
}

// =============================================================================
// Cache Content Steps
// =============================================================================

#[given(expr = "the {word} cache holds {string} with body {string}")]
async fn cache_holds(
    world: &mut InterceptorWorld,
    kind: String,
    path: String,
    body: String,
) -> Result<(), Error> {
    let name = world.cache_name(parse_kind(&kind)?);
    let request = world.request(&path);
    world.storage.put(&name, &request, Response::ok(body)).await?;
    Ok(())
}

#[given(expr = "the {word} cache holds {int} entries")]
async fn cache_filled(world: &mut InterceptorWorld, kind: String, count: usize) -> Result<(), Error> {
    let name = world.cache_name(parse_kind(&kind)?);
    world.fill(&name, count).await
}

#[given(expr = "a cache named {string} holds {int} entries")]
async fn named_cache_filled(
    world: &mut InterceptorWorld,
    name: String,
    count: usize,
) -> Result<(), Error> {
    world.fill(&CacheName::from(name.as_str()), count).await
}
