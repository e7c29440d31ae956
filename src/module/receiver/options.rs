use crate::constants::PORT_RECEIVER;
use crate::module::options::LogOptions;
use structopt::StructOpt;

/// Options for the receiver module
#[derive(Debug, StructOpt)]
pub struct Options {
    /// Port on which batches are accepted
    #[structopt(short, long, env = "RECEIVER_PORT", default_value = PORT_RECEIVER)]
    pub port: u16,

    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub log: LogOptions,
}
