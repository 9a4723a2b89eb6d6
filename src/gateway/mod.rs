//! HTTP gateway
//!
//! Receives change batches from the delta notifier and exposes the flush
//! trigger for the scheduler.

mod handler;
mod server;
mod types;

pub use handler::{app_router, AppState};
pub use server::{build_state, serve, shutdown_signal};
pub use types::{ApiError, ApiErrorDetail, HealthResponse};
