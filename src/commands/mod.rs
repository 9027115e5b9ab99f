//! Builders for the common command vocabulary.
//!
//! Every builder is a plain function returning a [`Command`](crate::command::Command). Builders
//! that carry application values take the value codec and serialize while building, so a command
//! that exists has already been fully rendered apart from its scalars.

pub mod hashes;
pub mod keys;
pub mod lists;
pub mod server;
pub mod sorted_sets;
pub mod strings;

pub use lists::InsertPosition;
pub use sorted_sets::Aggregate;
pub use strings::{Expiry, SetCondition, SetOptions};
