use std::time::Duration;

use anyhow::{Error, anyhow};
use cucumber::gherkin::Step;
use cucumber::given;

use crate::page::world::PageWorld;

#[given(expr = "a page at {string}")]
fn page_at(world: &mut PageWorld, path: String) -> Result<(), Error> {
    world.path = path;
    Ok(())
}

#[given(expr = "the page is initialised")]
fn initialised(world: &mut PageWorld) -> Result<(), Error> {
    world.last_count = world.page().init();
    Ok(())
}

#[given(expr = "the browser is offline")]
fn offline(world: &mut PageWorld) -> Result<(), Error> {
    world.connectivity.set_online(false);
    Ok(())
}

#[given(expr = "image loads take {int} ms")]
fn image_delay(world: &mut PageWorld, millis: u64) -> Result<(), Error> {
    world.probe.set_delay(Duration::from_millis(millis));
    Ok(())
}

#[given(expr = "the image {string} is broken")]
fn broken_image(world: &mut PageWorld, src: String) -> Result<(), Error> {
    world.probe.break_source(&src);
    Ok(())
}

#[given(expr = "the configuration")]
fn configuration(world: &mut PageWorld, step: &Step) -> Result<(), Error> {
    let yaml = step
        .docstring
        .as_ref()
        .ok_or_else(|| anyhow!("configuration step needs a docstring"))?;
    match offgrid_configuration::from_yaml(yaml) {
        Ok(runtime) => world.runtime = Some(runtime),
        Err(error) => world.config_error = Some(error.to_string()),
    }
    Ok(())
}
