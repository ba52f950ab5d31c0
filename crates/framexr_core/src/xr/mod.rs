//! OpenXR interop layer.
//!
//! This module owns the boundary to the native runtime: looking up extension
//! entry points by name, binding them to typed signatures, and interpreting
//! result codes. Feature facades build on it; nothing here knows about
//! individual features.

pub use openxr_sys as sys;

pub mod binding;
pub mod functions;
pub mod host;
pub mod observer;
pub mod resolver;
pub mod result;
pub mod session;
