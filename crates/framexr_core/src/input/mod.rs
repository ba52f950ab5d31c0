//! Controller interaction profiles.

pub mod controller_profile;
