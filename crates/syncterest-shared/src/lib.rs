//! # syncterest-shared
//!
//! Types shared by every Syncterest crate: entity identifiers, the JSON
//! wire protocol spoken on realtime channels, topic naming conventions,
//! form validation schemas, and the clock abstraction used to make
//! throttle/expiry logic deterministic under test.

pub mod constants;
pub mod protocol;
pub mod time;
pub mod topics;
pub mod types;
pub mod validation;
