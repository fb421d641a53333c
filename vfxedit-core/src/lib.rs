//! Core of the visual-effect container editor: the chunk codec, the typed scalar layer,
//! the node/selector graph, and the command queue that mediates every change to an open document.

pub mod commands;
pub mod field;
pub mod id;
pub mod io;
pub mod queue;
pub mod repositories;
pub mod settings;
pub mod state;
pub mod vfx;

pub use id::DocumentID;
