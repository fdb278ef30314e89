use crate::commands::{run_candidate_list, run_candidate_show, run_evaluate, EvaluateArgs};
use crate::server;
use candidate_flagging::error::AppError;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Candidate Flagging Service",
    about = "Evaluate practice-ready candidates and review their eligibility flags",
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
    /// Evaluate a candidate JSON file and print its flags
    Evaluate(EvaluateArgs),
    /// Inspect stored candidate records
    Candidates {
        #[command(subcommand)]
        command: CandidateCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CandidateCommand {
    /// List every stored candidate with its verdict
    List(StoreArgs),
    /// Show one stored candidate and all of its flags
    Show {
        /// Candidate identifier
        candidate_id: String,
        #[command(flatten)]
        store: StoreArgs,
    },
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the configured candidate data file
    #[arg(long)]
    pub(crate) data_file: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct StoreArgs {
    /// Candidate data file (defaults to APP_DATA_FILE)
    #[arg(long)]
    pub(crate) data_file: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Evaluate(args) => run_evaluate(args).await,
        Command::Candidates {
            command: CandidateCommand::List(args),
        } => run_candidate_list(args),
        Command::Candidates {
            command: CandidateCommand::Show {
                candidate_id,
                store,
            },
        } => run_candidate_show(&candidate_id, store),
    }
}
