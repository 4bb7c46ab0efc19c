use std::time::Duration;

use anyhow::{Error, anyhow};
use cucumber::then;
use offgrid_core::CacheKind;
use offgrid_page::ImageLoadState;
use pretty_assertions::assert_eq;

use crate::page::world::PageWorld;

fn flag(word: &str) -> Result<bool, Error> {
    match word {
        "valid" | "true" | "yes" => Ok(true),
        "invalid" | "false" | "no" => Ok(false),
        _ => Err(anyhow!("not a flag: {word}")),
    }
}

// =============================================================================
// Memory Cache Assertions
// =============================================================================

#[then(expr = "memory holds {string}")]
fn memory_holds(world: &mut PageWorld, key: String) -> Result<(), Error> {
    assert!(world.page().memory().get(&key).is_some(), "{key} missing");
    Ok(())
}

#[then(expr = "memory no longer holds {string}")]
fn memory_misses(world: &mut PageWorld, key: String) -> Result<(), Error> {
    assert_eq!(world.page().memory().get(&key), None);
    Ok(())
}

// =============================================================================
// Persisted Cache Assertions
// =============================================================================

#[then(expr = "the save succeeded")]
fn save_succeeded(world: &mut PageWorld) -> Result<(), Error> {
    assert_eq!(world.last_flag, Some(true));
    Ok(())
}

#[then(expr = "{string} reads back as {string}")]
fn reads_back(world: &mut PageWorld, key: String, value: String) -> Result<(), Error> {
    let stored: Option<String> = world.page().persistent().smart_get(&key);
    assert_eq!(stored, Some(value));
    Ok(())
}

#[then(expr = "{string} is not available")]
fn not_available(world: &mut PageWorld, key: String) -> Result<(), Error> {
    let stored: Option<String> = world.page().persistent().smart_get(&key);
    assert_eq!(stored, None);
    Ok(())
}

#[then(expr = "the store holds {int} item(s)")]
fn store_len(world: &mut PageWorld, count: usize) -> Result<(), Error> {
    assert_eq!(world.store.len(), count);
    Ok(())
}

// =============================================================================
// Preload Assertions
// =============================================================================

#[then(expr = "{int} preload(s) were injected")]
fn injected(world: &mut PageWorld, count: usize) -> Result<(), Error> {
    assert_eq!(world.last_count, count);
    assert_eq!(world.sink.directives().len(), count);
    Ok(())
}

#[then(expr = "{string} was injected {int} time(s)")]
fn injected_times(world: &mut PageWorld, url: String, count: usize) -> Result<(), Error> {
    assert_eq!(world.sink.count_for(&url), count);
    Ok(())
}

#[then(expr = "the head holds {int} directive(s)")]
fn head_len(world: &mut PageWorld, count: usize) -> Result<(), Error> {
    assert_eq!(world.sink.directives().len(), count);
    Ok(())
}

#[then(expr = "every directive uses rel {string}")]
fn directive_rel(world: &mut PageWorld, rel: String) -> Result<(), Error> {
    for directive in world.sink.directives() {
        assert_eq!(directive.rel, rel);
    }
    Ok(())
}

// =============================================================================
// Image Assertions
// =============================================================================

#[then(expr = "the image loader ran {int} time(s)")]
fn loads(world: &mut PageWorld, count: usize) -> Result<(), Error> {
    assert_eq!(world.probe.loads(), count);
    Ok(())
}

#[then(expr = "every validation reported {word}")]
fn validations(world: &mut PageWorld, expected: String) -> Result<(), Error> {
    let expected = flag(&expected)?;
    assert!(!world.validations.is_empty(), "nothing was validated");
    assert!(world.validations.iter().all(|valid| *valid == expected));
    Ok(())
}

#[then(expr = "the validator remembers {string} as {word}")]
fn remembered(world: &mut PageWorld, src: String, expected: String) -> Result<(), Error> {
    let expected = flag(&expected)?;
    assert_eq!(world.page().validator().cached(&src), Some(expected));
    assert_eq!(world.page().validator().in_flight(), 0);
    Ok(())
}

#[then(expr = "the image {string} is {word}")]
fn image_state(world: &mut PageWorld, src: String, state: String) -> Result<(), Error> {
    let expected = match state.as_str() {
        "loading" => ImageLoadState::Loading,
        "loaded" => ImageLoadState::Loaded,
        "failed" => ImageLoadState::Failed,
        _ => return Err(anyhow!("unknown load state: {state}")),
    };
    assert_eq!(world.page().images().state(&src), Some(expected));
    Ok(())
}

#[then(expr = "the last change was ignored")]
fn ignored(world: &mut PageWorld) -> Result<(), Error> {
    assert_eq!(world.last_flag, Some(false));
    Ok(())
}

#[then(expr = "the offline notice reads {string}")]
fn offline_notice(world: &mut PageWorld, notice: String) -> Result<(), Error> {
    assert_eq!(world.page().offline_notice(), Some(notice.as_str()));
    Ok(())
}

// =============================================================================
// Configuration Assertions
// =============================================================================

#[then(expr = "the configuration is rejected")]
fn config_rejected(world: &mut PageWorld) -> Result<(), Error> {
    assert!(world.runtime.is_none());
    assert!(world.config_error.is_some());
    Ok(())
}

#[then(expr = "the {word} cache is named {string}")]
fn cache_named(world: &mut PageWorld, kind: String, name: String) -> Result<(), Error> {
    let runtime = world
        .runtime
        .as_ref()
        .ok_or_else(|| anyhow!("configuration was rejected: {:?}", world.config_error))?;
    let kind = match kind.as_str() {
        "static" => CacheKind::Static,
        "dynamic" => CacheKind::Dynamic,
        "image" => CacheKind::Image,
        _ => return Err(anyhow!("unknown cache kind: {kind}")),
    };
    assert_eq!(runtime.interceptor.cache_names.get(kind).as_str(), name);
    Ok(())
}

#[then(expr = "memory entries live for {int} seconds")]
fn memory_ttl(world: &mut PageWorld, secs: u64) -> Result<(), Error> {
    let runtime = world
        .runtime
        .as_ref()
        .ok_or_else(|| anyhow!("configuration was rejected: {:?}", world.config_error))?;
    assert_eq!(runtime.page.memory_ttl, Duration::from_secs(secs));
    Ok(())
}

#[then(expr = "trimming keeps {int} of more than {int} entries")]
fn trim_policy(world: &mut PageWorld, keep: usize, max: usize) -> Result<(), Error> {
    let runtime = world
        .runtime
        .as_ref()
        .ok_or_else(|| anyhow!("configuration was rejected: {:?}", world.config_error))?;
    assert_eq!(runtime.interceptor.trim.keep_entries, keep);
    assert_eq!(runtime.interceptor.trim.max_entries, max);
    Ok(())
}
