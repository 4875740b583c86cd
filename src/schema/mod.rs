//! Raw trial payload schema
//!
//! This module defines the flat key/value layout in which test sessions are
//! recorded, and typed accessors over it. Everything downstream of the
//! validator works on canonical types only.

mod payload;

pub use payload::*;
