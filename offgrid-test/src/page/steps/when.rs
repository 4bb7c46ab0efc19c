use std::time::Duration;

use anyhow::Error;
use cucumber::when;
use futures::future::join_all;
use offgrid_page::{Priority, ResourceType, SmartSetOptions};
use serde_json::json;

use crate::page::world::PageWorld;

fn resource_type(kind: &str) -> Result<ResourceType, Error> {
    Ok(serde_json::from_value(json!(kind))?)
}

// =============================================================================
// Memory Cache Steps
// =============================================================================

#[when(expr = "{string} is kept in memory for {int} ms")]
fn remember(world: &mut PageWorld, key: String, millis: u64) -> Result<(), Error> {
    world
        .page()
        .memory()
        .set(key, json!(true), Some(Duration::from_millis(millis)));
    Ok(())
}

#[when(expr = "{int} ms pass")]
fn time_passes(world: &mut PageWorld, millis: u64) -> Result<(), Error> {
    world.clock.advance(Duration::from_millis(millis));
    Ok(())
}

// =============================================================================
// Persisted Cache Steps
// =============================================================================

#[when(expr = "{string} is saved as {string}")]
fn save(world: &mut PageWorld, key: String, value: String) -> Result<(), Error> {
    let flag = world
        .page()
        .persistent()
        .smart_set(&key, &value, SmartSetOptions::default());
    world.last_flag = Some(flag);
    Ok(())
}

#[when(expr = "{string} is saved as {string} depending on the network")]
fn save_network_dependent(world: &mut PageWorld, key: String, value: String) -> Result<(), Error> {
    let options = SmartSetOptions {
        network_dependent: true,
        ..SmartSetOptions::default()
    };
    let flag = world.page().persistent().smart_set(&key, &value, options);
    world.last_flag = Some(flag);
    Ok(())
}

#[when(expr = "{string} is saved as {string} with high priority")]
fn save_high_priority(world: &mut PageWorld, key: String, value: String) -> Result<(), Error> {
    let options = SmartSetOptions {
        priority: Priority::High,
        ..SmartSetOptions::default()
    };
    let flag = world.page().persistent().smart_set(&key, &value, options);
    world.last_flag = Some(flag);
    Ok(())
}

#[when(expr = "the connection comes back")]
async fn reconnect(world: &mut PageWorld) -> Result<(), Error> {
    world.connectivity.set_online(true);
    // Let the connectivity watcher run.
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}

#[when(expr = "the connection comes back and drops again")]
async fn flicker(world: &mut PageWorld) -> Result<(), Error> {
    world.connectivity.set_online(true);
    world.connectivity.set_online(false);
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}

#[when(expr = "the connection drops")]
fn disconnect(world: &mut PageWorld) -> Result<(), Error> {
    world.connectivity.set_online(false);
    Ok(())
}

// =============================================================================
// Preload Steps
// =============================================================================

#[when(expr = "the page initialises")]
fn init(world: &mut PageWorld) -> Result<(), Error> {
    world.last_count = world.page().init();
    Ok(())
}

#[when(expr = "{string} is preloaded as {word}")]
fn preload(world: &mut PageWorld, url: String, kind: String) -> Result<(), Error> {
    let kind = resource_type(&kind)?;
    world.last_flag = Some(world.page().preloader().preload_resource(&url, kind));
    Ok(())
}

#[when(expr = "the user hovers over a link to {string}")]
fn hover(world: &mut PageWorld, href: String) -> Result<(), Error> {
    world.last_flag = Some(world.page().preloader().on_link_hover(&href));
    Ok(())
}

// =============================================================================
// Image Steps
// =============================================================================

#[when(expr = "{int} components validate {string} at once")]
async fn validate_concurrently(world: &mut PageWorld, count: usize, src: String) -> Result<(), Error> {
    let validator = world.page().validator();
    let results = join_all((0..count).map(|_| validator.preload(&src))).await;
    world.validations = results;
    Ok(())
}

#[when(expr = "{string} is validated")]
async fn validate(world: &mut PageWorld, src: String) -> Result<(), Error> {
    let valid = world.page().validator().preload(&src).await;
    world.validations = vec![valid];
    Ok(())
}

#[when(expr = "the image {string} starts loading")]
fn start_loading(world: &mut PageWorld, src: String) -> Result<(), Error> {
    world.last_flag = Some(world.page().images().start_loading(&src));
    Ok(())
}

#[when(expr = "the image {string} fails to load")]
fn fail_loading(world: &mut PageWorld, src: String) -> Result<(), Error> {
    world.page().images().mark_failed(&src);
    Ok(())
}

#[when(expr = "the image {string} finishes loading")]
fn finish_loading(world: &mut PageWorld, src: String) -> Result<(), Error> {
    world.last_flag = Some(world.page().images().mark_loaded(&src));
    Ok(())
}

