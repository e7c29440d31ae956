use anyhow::{bail, Result};
use fireline::harness::ModuleRunner;
use fireline::module::{analyzer, receiver, storage};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(about = "Event-streaming backbone for wildfire sensor readings.")]
struct MainOptions {
    /// Log level, scopable to different modules
    ///
    /// Levels: trace, debug, info, warn, error
    #[structopt(
        short,
        long,
        global = true,
        env = "RUST_LOG",
        default_value = "warn,fireline=info",
        value_name = "level"
    )]
    log: String,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Accepts reading batches over HTTP and appends them to the event log
    Receiver(receiver::Options),
    /// Aggregates the event log as a member of a consumer group
    Storage(storage::Options),
    /// Answers queries by replaying the event log
    Analyzer(analyzer::Options),
}

#[tokio::main]
async fn main() -> Result<()> {
    let main_options = MainOptions::from_args();

    pretty_env_logger::formatted_timed_builder()
        .parse_filters(&main_options.log)
        .init();

    log::info!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let runner = ModuleRunner::default();

    let success = match main_options.cmd {
        Command::Receiver(options) => runner.run(receiver::Receiver::new(options)).await,
        Command::Storage(options) => runner.run(storage::Storage::new(options)).await,
        Command::Analyzer(options) => runner.run(analyzer::Analyzer::new(options)).await,
    };

    if !success {
        bail!("module terminated with an error");
    }

    Ok(())
}
