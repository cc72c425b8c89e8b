//! Interaction tooling layered on the scene registries.

pub mod gestures;
