//! Detective-notebook layer over `cluedo-core`.
//!
//! A [`Session`] pairs the knowledge base with our own seat and translates
//! whole table events (a suggestion going around the table, a card shown to
//! us in private) into the facts and constraints the engine consumes.

pub mod session;

pub use session::{ResponseRecord, Session, Suggestion, TurnError, TurnReport};
