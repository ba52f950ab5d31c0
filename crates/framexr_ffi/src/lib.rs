//! C ABI the host engine plugin links against.
//!
//! All exported symbols live in [`api`]; this crate holds no logic of its own
//! beyond marshalling and the process-wide runtime slot.

pub mod api;
