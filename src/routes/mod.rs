//! HTTP route handlers grouped by resource domain.
//!
//! Each submodule corresponds to a logical area of the API (auth lives
//! in `crate::auth::routes`) and exposes typed Rocket handlers annotated
//! with `#[openapi]` so `rocket_okapi` can derive an OpenAPI document
//! automatically. The SSE stream is the one exception: it is mounted as
//! a plain route because event streams have no schema to document.

pub mod attendance;
pub mod classes;
pub(crate) mod helpers;
pub mod health;
pub mod params;
