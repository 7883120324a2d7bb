//! App API key lifecycle.

mod key_manager;

pub use key_manager::{KeyLifecycleManager, KeyPolicy};
