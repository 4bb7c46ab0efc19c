use anyhow::{Error, anyhow};
use bytes::Bytes;
use cucumber::when;
use offgrid::push::NotificationClick;
use offgrid::{ControlMessage, Event};
use offgrid_core::Request;
use serde_json::json;

use crate::interceptor::world::InterceptorWorld;

// =============================================================================
// Lifecycle Steps
// =============================================================================

#[when(expr = "the interceptor installs")]
async fn install(world: &mut InterceptorWorld) -> Result<(), Error> {
    world.dispatch(Event::Install).await
}

#[when(expr = "the interceptor activates")]
async fn activate(world: &mut InterceptorWorld) -> Result<(), Error> {
    world.dispatch(Event::Activate).await
}

// =============================================================================
// Fetch Steps
// =============================================================================

#[when(expr = "the page fetches {string}")]
async fn fetch(world: &mut InterceptorWorld, path: String) -> Result<(), Error> {
    let request = world.request(&path);
    world.dispatch(Event::Fetch(request)).await
}

#[when(expr = "the page navigates to {string}")]
async fn navigate(world: &mut InterceptorWorld, path: String) -> Result<(), Error> {
    let request = Request::navigate(world.origin.join(&path)?);
    world.dispatch(Event::Fetch(request)).await
}

#[when(expr = "the page loads image {string}")]
async fn image(world: &mut InterceptorWorld, path: String) -> Result<(), Error> {
    let request = Request::image(world.origin.join(&path)?);
    world.dispatch(Event::Fetch(request)).await
}

#[when(expr = "the page posts to {string}")]
async fn post(world: &mut InterceptorWorld, path: String) -> Result<(), Error> {
    let request = world.request(&path).with_method(http::Method::POST);
    world.dispatch(Event::Fetch(request)).await
}

// =============================================================================
// Message Steps
// =============================================================================

#[when(expr = "the page sends a {string} message")]
async fn message(world: &mut InterceptorWorld, kind: String) -> Result<(), Error> {
    let message = ControlMessage::from_value(json!({ "type": kind }));
    world.dispatch(Event::Message(message)).await
}

// =============================================================================
// Push Steps
// =============================================================================

#[when(expr = "a push arrives with {string}")]
async fn push(world: &mut InterceptorWorld, body: String) -> Result<(), Error> {
    world.dispatch(Event::Push(Some(Bytes::from(body)))).await
}

#[when(expr = "a push arrives without a body")]
async fn push_empty(world: &mut InterceptorWorld) -> Result<(), Error> {
    world.dispatch(Event::Push(None)).await
}

#[when(expr = "the user taps {string} on the notification")]
async fn tap_action(world: &mut InterceptorWorld, action: String) -> Result<(), Error> {
    click(world, Some(action)).await
}

#[when(expr = "the user taps the notification body")]
async fn tap_body(world: &mut InterceptorWorld) -> Result<(), Error> {
    click(world, None).await
}

async fn click(world: &mut InterceptorWorld, action: Option<String>) -> Result<(), Error> {
    let notification = world
        .last_notification
        .clone()
        .ok_or_else(|| anyhow!("no notification was shown"))?;
    let click = NotificationClick {
        action: action.map(Into::into),
        notification,
    };
    world.dispatch(Event::NotificationClick(click)).await
}
