//! HTTP protocol layer module
//!
//! Response builders shared by the handlers, decoupled from prediction logic.

pub mod response;

pub use response::{
    build_404_response, build_405_response, build_options_response, error_response,
    finalize_response, json_response, strip_body,
};
