//! # Wavebound Common
//!
//! Shared types for the Wavebound workspace.
//!
//! This crate provides foundational types used by the simulation core and the
//! engine binary:
//! - Generational handles (EnemyHandle, SlotKey) and run IDs
//! - World bounds and angle helpers
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::out_of_range("combat.combo_timeout", 0.0_f32, "> 0");
        assert_eq!(
            err.to_string(),
            "combat.combo_timeout out of range: 0 (expected > 0)"
        );

        let wrapped: WaveboundError = err.into();
        assert!(wrapped.to_string().starts_with("Config error:"));
    }

    #[test]
    fn test_handle_in_prelude() {
        let key = SlotKey::new(1, 2);
        let handle = EnemyHandle::from_key(key);
        assert_eq!(handle.key(), key);
    }
}
