//! catris (workspace facade crate).
//!
//! Re-exports the workspace crates under one roof so the binary, the
//! integration tests and the benchmarks can use `catris::{core, engine, ..}`.

pub use catris_core as core;
pub use catris_engine as engine;
pub use catris_input as input;
pub use catris_term as term;
pub use catris_types as types;
