//! Domain specific structures, implementations, and logic

mod batch;

pub mod event;

pub use batch::*;
