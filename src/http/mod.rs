//! HTTP surface: router and JWT verification

pub mod middleware;
pub mod routes;

pub use routes::build_router;
