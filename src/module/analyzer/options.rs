use crate::constants::PORT_ANALYZER;
use crate::module::options::{LogOptions, ReplayOptions};
use structopt::StructOpt;

/// Options for the analyzer module
#[derive(Debug, StructOpt)]
pub struct Options {
    /// Port on which queries are answered
    #[structopt(short, long, env = "ANALYZER_PORT", default_value = PORT_ANALYZER)]
    pub port: u16,

    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub log: LogOptions,

    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub replay: ReplayOptions,
}
