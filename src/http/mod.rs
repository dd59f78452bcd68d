//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers)
//!     → request.rs (assign x-request-id)
//!     → middleware/gatekeeper.rs (scope, CORS, rate limit)
//!     → server.rs proxy_handler (forward to the content app)
//!     → response.rs (gate rejections as JSON)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use response::GateRejection;
pub use server::{HttpServer, ServerError};
