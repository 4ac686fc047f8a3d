//! Authentication primitives.
//!
//! - [`token`] -- HS256 bearer-token verification.

pub mod token;
