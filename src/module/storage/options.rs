use crate::constants::{DEFAULT_RETAINED_READINGS, PORT_STORAGE};
use crate::module::options::{ConsumerOptions, LogOptions};
use structopt::StructOpt;

/// Options for the storage module
#[derive(Debug, StructOpt)]
pub struct Options {
    /// Port on which statistics are served
    #[structopt(short, long, env = "STORAGE_PORT", default_value = PORT_STORAGE)]
    pub port: u16,

    /// Number of most recent readings kept for queries and deduplication
    #[structopt(long, env = "STORAGE_RETAIN", default_value = DEFAULT_RETAINED_READINGS)]
    pub retain: usize,

    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub log: LogOptions,

    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub consumer: ConsumerOptions,
}
