//! Cucumber world, step definitions and run hooks for the streamprobe suite.

pub mod hooks;
pub mod steps;
pub mod world;
