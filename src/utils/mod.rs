//! Utility functions for gatekey

pub mod extract;
pub mod url;

pub use self::extract::*;
pub use self::url::*;
