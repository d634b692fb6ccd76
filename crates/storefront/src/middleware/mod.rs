//! Middleware for the storefront.

pub mod request_id;
pub mod session;
pub mod visitor;

pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use session::create_session_layer;
pub use visitor::Visitor;
