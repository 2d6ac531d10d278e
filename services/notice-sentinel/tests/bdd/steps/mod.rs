//! BDD step definitions for notice sentinel service

pub mod lifecycle_steps;
