//! Entity lifecycle checks built on the manager client

mod entity;
mod verifier;

pub use entity::{EntityKind, Operation};
pub use verifier::{listing_contains, LifecyclePlan, LifecycleReport, LifecycleVerifier, Step};
