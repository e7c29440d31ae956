//! Runnable modules each bundling a core component with an HTTP surface and a unified configuration

pub mod options;

pub mod analyzer;
pub mod receiver;
pub mod storage;

mod http;
