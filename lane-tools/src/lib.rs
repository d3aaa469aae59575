//! Tool registration and the reference tools shipped with the lane.
//!
//! The registry maps tool identifiers to implementations so the runner can
//! dispatch requests by `tool_id`. The [`reference`] tools are deterministic
//! stubs: they format and echo their inputs without touching storage.

#![warn(missing_docs, clippy::pedantic)]

pub mod reference;
pub mod registry;
