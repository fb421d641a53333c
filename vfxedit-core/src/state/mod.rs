//! Everything an open document is made of, and the helpers that edit it.

pub mod clipboard;
pub mod document;
pub mod graph;

pub use document::DocumentInfo;
