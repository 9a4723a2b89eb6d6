//! Notification module: relevance decisions and the batch pipeline

pub mod decision;
pub mod engine;

pub use decision::{decide, Decision, Transition};
pub use engine::{BatchReport, NotificationEngine};
