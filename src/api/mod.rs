//! Memo HTTP API.
//!
//! `GET /` health, `POST /generate_memo` memo generation and `GET /schemas`
//! schema listing, behind CORS and request logging.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::memo_api_router;
pub use server::{start_memo_api_server, MemoApiServer, MemoApiSession, ServerError};
pub use types::ApiContext;
