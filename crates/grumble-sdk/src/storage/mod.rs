//! Storage module - on-device persistence for the food list
//!
//! One component lives here: the file-backed local mirror. It is not a
//! database; the whole list is one structured document rewritten in
//! full on every mutation, matching the size and access pattern of the
//! data (one user's food log).

pub mod mirror;

pub use mirror::LocalMirrorStore;
