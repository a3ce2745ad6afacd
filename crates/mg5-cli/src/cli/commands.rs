use super::helpers::*;
use super::{CliError, GlobalArgs};
use mg5_core::domain::{DEFAULT_LAUNCH_OPTIONS, DEFAULT_MODEL, LastStep, Mg5Error};
use mg5_core::modules::locate::SearchPathLocator;
use mg5_core::modules::{
    ExecutableLocator, OutputSink, StdoutSink, TracingSink, parse_run_result,
};
use mg5_core::{LaunchRequest, OutputRequest, OutputStatus, Session};
use std::path::PathBuf;

#[derive(clap::Args)]
pub(super) struct OutputArgs {
    /// Process directory to create, relative to the working directory
    directory: PathBuf,

    /// Process definition; repeat for `add process`
    #[arg(short = 'p', long = "process", required = true)]
    processes: Vec<String>,

    /// Model imported before generating
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Extra MG5 command placed between `import model` and `generate`
    #[arg(short = 'e', long = "extra")]
    extra_lines: Vec<String>,

    /// Replace an existing directory without asking
    #[arg(long, conflicts_with = "keep")]
    force: bool,

    /// Keep an existing directory without asking
    #[arg(long)]
    keep: bool,

    /// Print the MG5 script instead of running it
    #[arg(long)]
    dry_run: bool,
}

#[derive(clap::Args)]
pub(super) struct LaunchArgs {
    /// Process directory produced by `output`
    directory: PathBuf,

    /// Run name passed as `--name`
    #[arg(long)]
    name: Option<String>,

    /// Last step of the run
    #[arg(long, value_parser = parse_laststep)]
    laststep: Option<LastStep>,

    /// Raw options appended to the launch line
    #[arg(long, default_value = DEFAULT_LAUNCH_OPTIONS, allow_hyphen_values = true)]
    options: String,

    /// Card to place before launching, as CARD=PATH (e.g. run=cards/run.dat)
    #[arg(long = "card", value_name = "CARD=PATH")]
    cards: Vec<String>,

    /// Template substitution for a --card, as CARD.KEY=VALUE
    #[arg(long = "set", value_name = "CARD.KEY=VALUE")]
    values: Vec<String>,

    /// Use every `<prefix>_<card>_card.dat` next to this prefix
    #[arg(long)]
    card_prefix: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Print the MG5 script instead of running it
    #[arg(long)]
    dry_run: bool,

    /// Exit successfully even when MG5 printed no results summary
    #[arg(long)]
    allow_empty: bool,
}

#[derive(clap::Args)]
pub(super) struct ParseArgs {
    /// Captured MG5 stdout
    log: PathBuf,

    /// Process directory the log belongs to, used to report the event directory
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

fn parse_laststep(raw: &str) -> Result<LastStep, String> {
    raw.parse::<LastStep>()
        .map_err(|error| error.message().to_string())
}

pub(super) fn run_output_command(global: &GlobalArgs, args: OutputArgs) -> Result<i32, CliError> {
    let mut request = OutputRequest::new(args.processes, args.directory)
        .with_model(args.model)
        .with_extra_lines(args.extra_lines);
    if args.force {
        request = request.with_force(true);
    } else if args.keep {
        request = request.with_force(false);
    }

    if args.dry_run {
        println!("{}", request.to_script().map_err(CliError::Compute)?);
        return Ok(0);
    }

    let session = open_session(global, !global.quiet)?;
    let handle = session.output(&request).map_err(CliError::Compute)?;
    match handle.status() {
        OutputStatus::Generated => println!("Generated {}", handle.resolved().display()),
        OutputStatus::Kept => println!("Kept existing {}", handle.resolved().display()),
    }
    Ok(0)
}

pub(super) fn run_launch_command(global: &GlobalArgs, args: LaunchArgs) -> Result<i32, CliError> {
    let mut request = LaunchRequest::new(args.directory).with_options(args.options);
    if let Some(name) = args.name {
        request = request.with_run_name(name);
    }
    if let Some(laststep) = args.laststep {
        request = request.with_laststep(laststep);
    }

    let script = request.to_script().map_err(CliError::Compute)?;
    if args.dry_run {
        println!("{script}");
        return Ok(0);
    }

    // JSON output owns stdout; MG5 chatter is demoted to debug logs.
    let session = open_session(global, !global.quiet && !args.json)?;
    let cards = collect_cards(
        &session.config().work_dir,
        args.card_prefix.as_deref(),
        &args.cards,
        &args.values,
    )?;
    let result = session.launch(&request, &cards).map_err(CliError::Compute)?;

    print_result(&result, args.json)?;
    if !result.has_summary() && !args.allow_empty {
        return Err(CliError::Compute(
            Mg5Error::computation(
                "RUN.NO_SUMMARY",
                format!(
                    "no results summary found for launch in '{}'",
                    request.directory.display()
                ),
            )
            .with_command(script),
        ));
    }
    Ok(0)
}

pub(super) fn run_parse_command(args: ParseArgs) -> Result<i32, CliError> {
    let lines = read_log_lines(&args.log)?;
    let mut result = parse_run_result(&lines).map_err(CliError::Compute)?;
    if let Some(output_dir) = args.output_dir {
        result = result.with_output_dir(output_dir);
    }
    print_result(&result, args.json)?;
    Ok(0)
}

pub(super) fn run_locate_command(global: &GlobalArgs) -> Result<i32, CliError> {
    let config = load_config(global)?;
    let executable = SearchPathLocator::from_config(&config)
        .locate()
        .map_err(CliError::Compute)?;
    println!("{}", executable.display());
    Ok(0)
}

fn open_session(global: &GlobalArgs, relay: bool) -> Result<Session, CliError> {
    let config = load_config(global)?;
    Session::with_sink(config, sink_for(relay)).map_err(CliError::Compute)
}

fn sink_for(relay: bool) -> Box<dyn OutputSink> {
    if relay {
        Box::new(StdoutSink)
    } else {
        Box::new(TracingSink)
    }
}
