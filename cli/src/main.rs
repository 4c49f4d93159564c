mod commands;
mod terminal;

use commands::{CommandLine, Commands, scan};
use portr_common::config::Config;
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init_logging(commands.verbose, commands.quiet)?;

    let cfg = Config {
        no_banner: commands.no_banner,
        redact: commands.redact,
        quiet: commands.quiet,
    };
    print::banner(cfg.no_banner, cfg.quiet);

    match commands.command {
        Commands::Scan(args) => {
            print::header("starting scanner", cfg.quiet);
            scan::scan(args, &cfg).await
        }
    }
}
