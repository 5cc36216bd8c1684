//! Terminal front end for catris.
//!
//! Games render themselves into styled rows; this crate places those rows
//! in a framebuffer and flushes the framebuffer to the terminal with
//! crossterm, sending only the cells that changed since the last frame.

pub mod fb;
pub mod play_view;
pub mod renderer;

pub use catris_core as core;
pub use catris_types as types;

pub use fb::FrameBuffer;
pub use play_view::{PlaySnapshot, PlayView, Viewport};
pub use renderer::{encode_diff_into, encode_full_into, TerminalRenderer};
