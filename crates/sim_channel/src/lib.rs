pub mod config;
pub mod delivery;
pub mod position;
#[cfg(feature = "test-helpers")]
pub mod test_helpers;
