//! FocusQuest library crate — re-exports all modules for integration testing.
//!
//! The binary crate (`main.rs`) is the actual entry point. This library
//! crate exposes the same modules so that `tests/` integration tests can
//! import game types, systems, and resources directly.

pub mod shared;
pub mod timer;
pub mod encounters;
pub mod tasks;
pub mod loot;
pub mod character;
pub mod inventory;
pub mod data;
pub mod save;
