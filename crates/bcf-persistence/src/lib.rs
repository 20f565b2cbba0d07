//! Record persistence for the 46BC relay.
//!
//! Writes evaluation records and trip events as daily JSON Lines files for
//! consumption by any downstream display or analysis tool.

pub mod error;
pub mod writer;

pub use error::{PersistenceError, PersistenceResult};
pub use writer::JsonLinesWriter;
