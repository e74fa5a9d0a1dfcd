//! CLI command implementations.

pub mod check;
pub mod common;
pub mod controllers;
pub mod info;
pub mod operators;
pub mod process;
