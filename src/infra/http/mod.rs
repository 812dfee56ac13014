//! Public HTTP surface: router construction, handlers, and middleware.

mod middleware;
mod public;

pub use public::{HttpState, build_router};
