mod commands;
mod helpers;

use clap::Parser;
use mg5_core::domain::Mg5Error;
use std::path::PathBuf;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let diagnostic = error.as_mg5_error();
            eprintln!("{}", diagnostic.diagnostic_line());
            diagnostic.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("mg5helper".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            helpers::init_logging(cli.global.log_level);
            dispatch_parsed(cli.global, cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "mg5helper",
    version,
    about = "Drive MadGraph5_aMC@NLO: generate process directories, launch runs, scrape results"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Args, Debug, Clone)]
pub(crate) struct GlobalArgs {
    /// Path to the mg5_aMC executable (overrides config and search roots)
    #[arg(long, global = true, value_name = "PATH")]
    pub(crate) mg5_bin: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, global = true, value_name = "FILE")]
    pub(crate) config: Option<PathBuf>,

    /// Log level (overrides MG5HELPER_LOG)
    #[arg(long, global = true, value_enum)]
    pub(crate) log_level: Option<helpers::LogLevel>,

    /// Do not relay MG5 output to the terminal
    #[arg(long, short, global = true)]
    pub(crate) quiet: bool,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Generate a process directory with `output`
    Output(commands::OutputArgs),
    /// Launch a run in an existing process directory
    Launch(commands::LaunchArgs),
    /// Extract the run summary from a captured MG5 log
    Parse(commands::ParseArgs),
    /// Print the resolved mg5_aMC executable
    Locate,
}

fn dispatch_parsed(global: GlobalArgs, command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Output(args) => commands::run_output_command(&global, args),
        CliCommand::Launch(args) => commands::run_launch_command(&global, args),
        CliCommand::Parse(args) => commands::run_parse_command(args),
        CliCommand::Locate => commands::run_locate_command(&global),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(Mg5Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_mg5_error(&self) -> Mg5Error {
        match self {
            Self::Usage(message) => {
                Mg5Error::input_validation("INPUT.CLI_USAGE", message.trim_end().to_string())
            }
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => Mg5Error::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
