pub mod cache;
pub mod classify;
pub mod dom;
pub mod extract;
pub mod metadata;
pub mod patterns;

pub use cache::{content_hash, ContentCache};
pub use extract::Extractor;
