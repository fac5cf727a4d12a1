//! Staff-side client for the residence management backend.
//!
//! DESIGN
//! ======
//! The backend owns every record. This crate keeps a typed REST client
//! (`api`) plus one state holder per screen (`screens`) that fetches, derives
//! display values and, after any mutation, refetches instead of patching
//! local state. `period` and `notice` are the small shared helpers every
//! screen leans on.

pub mod api;
pub mod config;
pub mod notice;
pub mod period;
pub mod screens;

#[cfg(test)]
pub(crate) mod test_helpers;
