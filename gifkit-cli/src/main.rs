//! gifkit command-line interface.
//!
//! ```text
//! gifkit info animation.gif --json
//! gifkit explode animation.gif -o frames/
//! gifkit assemble a.png b.png c.png -o out.gif --delay-ms 100 --loop 0
//! ```

use clap::{Parser, Subcommand};
use console::style;

mod commands;

use commands::{CmdAssemble, CmdExplode, CmdInfo};

#[derive(Parser, Debug)]
#[command(name = "gifkit")]
#[command(version)]
#[command(about = "Inspect, explode and assemble GIF animations")]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a summary of a GIF file.
    Info(CmdInfo),
    /// Decode every frame of a GIF file to PNG.
    Explode(CmdExplode),
    /// Encode a sequence of images into a GIF file.
    Assemble(CmdAssemble),
}

fn main() {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let result = match &cli.command {
        Command::Info(cmd) => cmd.run(),
        Command::Explode(cmd) => cmd.run(),
        Command::Assemble(cmd) => cmd.run(),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}
