//! Runtime harness to execute modules and their background jobs

mod heart;
mod jobs;
mod module;

pub use heart::*;
pub use jobs::*;
pub use module::*;
