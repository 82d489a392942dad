//! hbnb: a single-process, line-oriented object manager.
//!
//! An interactive shell creates, inspects, mutates, and destroys typed
//! domain entities and mirrors them to a flat JSON document between
//! sessions. Three layers:
//!
//! - [`models`]: entity lifecycle (identity, timestamps, attributes) and
//!   the kind registry.
//! - [`storage`]: the canonical in-memory object table and its durable
//!   JSON mirror.
//! - [`console`]: the read-dispatch-respond command loop.

pub mod console;
pub mod models;
pub mod storage;
