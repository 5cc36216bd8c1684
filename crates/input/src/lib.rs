//! Terminal key handling for catris.

pub mod map;

pub use catris_types as types;

pub use map::{handle_key_event, should_quit};
