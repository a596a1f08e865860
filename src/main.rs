use batch_invoker::{
    app::{self, AppConfig},
    config::{self, BatchConfig},
    BatchError, Layout,
};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "invoke",
    author,
    version,
    about = "Run an analysis script over the data files of a folder",
    arg_required_else_help = true
)]
struct Cli {
    /// Script to run (suffix added when missing)
    script: String,

    /// Reference file passed ahead of the data files
    reference: Option<String>,

    /// Folder holding the data files (default: this directory)
    #[arg(conflicts_with = "folder_opt")]
    folder: Option<String>,

    /// Folder, when no reference file is given
    #[arg(long = "folder", value_name = "DIR")]
    folder_opt: Option<String>,

    #[arg(long)]
    ext: Option<String>,

    #[arg(long, num_args = 1..)]
    exclude: Option<Vec<String>>,

    /// created | modified
    #[arg(long)]
    policy: Option<String>,

    /// batch | each
    #[arg(long)]
    mode: Option<String>,

    /// Run inside the folder with bare file names (stages the script)
    #[arg(long)]
    in_folder: bool,

    /// Pass `<folder>/` as the first argument
    #[arg(long)]
    folder_prefix: bool,

    /// e.g. Rscript
    #[arg(long)]
    interpreter: Option<String>,

    #[arg(long)]
    keep_script: bool,

    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the plan without running anything
    #[arg(long)]
    dry_run: bool,

    #[arg(long, requires = "dry_run")]
    json: bool,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn build_config(cli: Cli) -> Result<AppConfig, BatchError> {
    let cwd = std::env::current_dir()
        .map_err(|e| BatchError::config(format!("working directory: {e}")))?;

    let mut batch: BatchConfig = config::load_layered(cli.config.as_deref(), &cwd)?;
    if let Some(ext) = cli.ext {
        batch.extension = ext;
    }
    if let Some(exclude) = cli.exclude {
        batch.exclude = exclude.into_iter().collect();
    }
    if let Some(p) = cli.policy.as_deref() {
        batch.policy = config::parse_policy(p)?;
    }
    if let Some(m) = cli.mode.as_deref() {
        batch.mode = config::parse_mode(m)?;
    }
    if cli.in_folder {
        batch.layout = Layout::InFolder;
    }
    if cli.folder_prefix {
        batch.folder_prefix = true;
    }
    if cli.interpreter.is_some() {
        batch.interpreter = cli.interpreter;
    }
    if cli.keep_script {
        batch.keep_script = true;
    }

    if cli.script.trim().is_empty() {
        return Err(BatchError::config("script name is empty"));
    }

    Ok(AppConfig {
        cwd,
        script: cli.script,
        reference: cli.reference,
        folder: cli.folder.or(cli.folder_opt),
        dry_run: cli.dry_run,
        json: cli.json,
        batch,
    })
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
    let code = err
        .downcast_ref::<BatchError>()
        .map(BatchError::exit_code)
        .unwrap_or(1);
    u8::try_from(code).unwrap_or(1)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    let result = build_config(cli)
        .map_err(anyhow::Error::from)
        .and_then(|cfg| app::run(&cfg));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}
