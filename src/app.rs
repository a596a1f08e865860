use crate::config::BatchConfig;
use crate::error::BatchError;
use crate::fs_scan;
use crate::plan::{build_invocation, ensure_suffix, file_arguments, folder_prefix, with_reference};
use crate::runner::{self, StagedScript};
use crate::types::{FileEntry, Folder, InvocationPlan, Layout, RunMode, TimestampPolicy};

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

pub struct AppConfig {
    /// caller's working directory; never changed
    pub cwd: PathBuf,
    pub script: String,
    pub reference: Option<String>,
    pub folder: Option<String>,

    pub dry_run: bool,
    pub json: bool,

    pub batch: BatchConfig,
}

/// Everything one run will do, before anything is launched.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub folder: String,
    pub directory: PathBuf,
    pub policy: TimestampPolicy,
    pub mode: RunMode,
    pub layout: Layout,
    pub files: Vec<ReportedFile>,
    pub invocations: Vec<InvocationPlan>,
}

#[derive(Debug, Serialize)]
pub struct ReportedFile {
    pub path: String,
    pub timestamp_unix_ms: i64,
    pub timestamp: String,
}

/* =========================
   Helpers
   ========================= */

fn local_time(ms: i64) -> Option<OffsetDateTime> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetDateTime::from_unix_timestamp_nanos(ms as i128 * 1_000_000)
        .ok()
        .map(|t| t.to_offset(offset))
}

fn rfc3339(ms: i64) -> String {
    local_time(ms)
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_else(|| format!("{ms}ms"))
}

fn short_time(ms: i64) -> String {
    let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    local_time(ms)
        .and_then(|t| t.format(fmt).ok())
        .unwrap_or_else(|| format!("{ms}ms"))
}

/// Joined: child runs where `<folder>/<name>` resolves, script stays in cwd.
/// InFolder: child runs in the folder against the staged copy.
fn locate(plan: InvocationPlan, folder: &Folder, layout: Layout, cwd: &Path) -> InvocationPlan {
    match layout {
        Layout::Joined => plan.rooted_at(cwd).in_dir(&folder.base),
        Layout::InFolder => {
            let dir = folder.dir();
            let mut plan = plan;
            if let Some(name) = Path::new(&plan.program_path).file_name() {
                plan.program_path = name.to_string_lossy().to_string();
            }
            plan.rooted_at(&dir).in_dir(dir)
        }
    }
}

fn build_plans(cfg: &AppConfig, folder: &Folder, ordered: Vec<String>) -> Vec<InvocationPlan> {
    let b = &cfg.batch;
    let prefix = b.folder_prefix.then(|| folder_prefix(folder));

    let groups: Vec<Vec<String>> = match b.mode {
        RunMode::Batch => vec![ordered],
        RunMode::Each => ordered.into_iter().map(|f| vec![f]).collect(),
    };

    groups
        .into_iter()
        .map(|names| {
            let files = with_reference(
                file_arguments(folder, b.layout, names),
                cfg.reference.as_deref(),
                &b.reference_suffix,
            );
            let mut plan = build_invocation(&cfg.script, &b.script_suffix, prefix.as_deref(), files);
            if let Some(interp) = &b.interpreter {
                plan = plan.with_interpreter(interp.clone());
            }
            locate(plan, folder, b.layout, &cfg.cwd)
        })
        .collect()
}

/// Resolve, select, order and build; no process is started.
pub fn prepare(cfg: &AppConfig) -> Result<RunReport> {
    let folder = fs_scan::resolve_folder(cfg.folder.as_deref(), &cfg.cwd)?;
    let directory = folder.dir();
    log::info!("folder={} dir={}", folder.name, directory.display());

    let b = &cfg.batch;
    let entries: Vec<FileEntry> =
        fs_scan::select_files(&directory, &b.extension, &b.exclude, b.policy)?;
    log::info!("selected {} file(s) matching {}", entries.len(), b.extension);
    if entries.is_empty() {
        log::warn!(
            "no {} files in {}; invoking anyway",
            b.extension,
            directory.display()
        );
    }

    let stamps: HashMap<String, i64> = entries
        .iter()
        .map(|e| (e.path.clone(), e.timestamp_unix_ms))
        .collect();
    let ordered = fs_scan::order_files(entries);

    let files = ordered
        .iter()
        .map(|p| {
            let ms = stamps.get(p).copied().unwrap_or_default();
            ReportedFile {
                path: p.clone(),
                timestamp_unix_ms: ms,
                timestamp: rfc3339(ms),
            }
        })
        .collect();

    let invocations = build_plans(cfg, &folder, ordered);

    Ok(RunReport {
        folder: folder.name,
        directory,
        policy: b.policy,
        mode: b.mode,
        layout: b.layout,
        files,
        invocations,
    })
}

pub fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("=== RUN PLAN ===");
    println!("Folder  : {} ({})", report.folder, report.directory.display());
    println!("Policy  : {:?}", report.policy);
    println!("Mode    : {:?}", report.mode);
    println!("Layout  : {:?}", report.layout);
    println!("Files   :");
    for f in &report.files {
        println!("  - {} ({})", f.path, short_time(f.timestamp_unix_ms));
    }
    println!("\n=== INVOCATIONS ===");
    for p in &report.invocations {
        let dir = p
            .working_dir
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| ".".to_string());
        println!("  [{}] {}", dir, p.command_line().join(" "));
    }
    Ok(())
}

fn stage_if_needed(cfg: &AppConfig, report: &RunReport) -> Result<Option<StagedScript>> {
    if cfg.batch.layout != Layout::InFolder {
        return Ok(None);
    }
    let script = cfg.cwd.join(ensure_suffix(&cfg.script, &cfg.batch.script_suffix));
    Ok(runner::stage_script(&script, &report.directory)?)
}

/* =========================
   Run
   ========================= */

pub fn run(cfg: &AppConfig) -> Result<()> {
    let report = prepare(cfg)?;

    if cfg.dry_run {
        return print_report(&report, cfg.json);
    }

    let staged = stage_if_needed(cfg, &report)?;

    for plan in &report.invocations {
        log::info!("Analyzing {}.", plan.working_arguments.join(" "));

        match runner::invoke(plan) {
            Ok(res) => {
                let mut out = std::io::stdout().lock();
                out.write_all(&res.captured_output)?;
                out.flush()?;
            }
            Err(e) => {
                if let BatchError::Execution { output, .. } = &e {
                    let mut err = std::io::stderr().lock();
                    let _ = err.write_all(output);
                    let _ = err.flush();
                }
                return Err(e.into());
            }
        }
    }

    log::info!("Done.");

    if let Some(staged) = staged {
        if cfg.batch.keep_script {
            log::info!("keeping staged script {}", staged.path().display());
        } else {
            staged.remove();
        }
    }

    Ok(())
}
