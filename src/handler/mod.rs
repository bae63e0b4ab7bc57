//! Request handler module
//!
//! Routes requests to the prediction and health endpoints.

mod health;
mod predict;
pub mod router;

pub use router::handle_request;
