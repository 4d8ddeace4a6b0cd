pub mod auth;
mod extract;
pub mod handlers;
pub mod metrics;
pub mod response;
mod routes;

pub use routes::create_router;
