use anyhow::Result;
use clap::Parser;
use icemon::config::{self, Args, ABOUT};
use icemon::logging::init_logging;
use tracing::info;

fn main() -> Result<()> {
    let args = Args::parse();
    if args.about {
        println!("{ABOUT}");
        return Ok(());
    }

    // Config problems are reported before the terminal is taken over.
    let config = config::load(&args)?;
    init_logging(config.log_file.as_deref());
    info!(mode = ?config.mode, anonymize = config.anonymize, "icemon_start");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(icemon::app::run(config))
}
