//! Secret backend implementations

pub mod memory;

#[cfg(feature = "onepassword")]
pub mod onepassword;
