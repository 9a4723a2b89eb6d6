//! Digest module: rendering notifications and flushing batched outboxes

pub mod flush;
pub mod render;

pub use flush::{DigestFlusher, FlushReport};
pub use render::{DigestContent, DigestRenderer, HtmlDigestRenderer};
