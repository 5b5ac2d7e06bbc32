//! Session domain.
//!
//! - [`key::SessionKey`]: hour-bucketed identifier derived from a prefix and a [`clock::Clock`]
//! - [`record::SessionRecord`]: append-only list of [`record::Turn`]s for one key

pub mod clock;
pub mod key;
pub mod record;
