use crate::demo::{run_decode, run_encode, run_report, DecodeArgs, EncodeArgs, ReportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use synastry::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Open Synastry",
    about = "Serve and inspect synastry compatibility reports from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Build or read shareable report links
    Link {
        #[command(subcommand)]
        command: LinkCommand,
    },
    /// Fetch the report behind a shared link and print it
    Report(ReportArgs),
}

#[derive(Subcommand, Debug)]
enum LinkCommand {
    /// Encode a request file into a `q` link parameter
    Encode(EncodeArgs),
    /// Decode a `q` link parameter back into its request
    Decode(DecodeArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Link {
            command: LinkCommand::Encode(args),
        } => run_encode(args),
        Command::Link {
            command: LinkCommand::Decode(args),
        } => run_decode(args),
        Command::Report(args) => run_report(args).await,
    }
}
