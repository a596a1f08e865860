use crate::error::{BatchError, Result};
use crate::types::{ExecutionResult, InvocationPlan};
use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

/// Run the plan to completion; stdout and stderr share one pipe.
pub fn invoke(plan: &InvocationPlan) -> Result<ExecutionResult> {
    let (program, mut cmd) = match &plan.interpreter {
        Some(interp) => {
            let mut c = Command::new(interp);
            c.arg(&plan.program_path);
            (interp.clone(), c)
        }
        None => (plan.program_path.clone(), Command::new(&plan.program_path)),
    };
    cmd.args(&plan.working_arguments);
    if let Some(dir) = &plan.working_dir {
        cmd.current_dir(dir);
    }

    log::debug!("exec: {:?}", plan.command_line());

    let launch_err = |source: io::Error| BatchError::Launch {
        program: program.clone(),
        source,
    };

    let (mut reader, writer) = io::pipe().map_err(launch_err)?;
    let writer_err = writer.try_clone().map_err(launch_err)?;
    cmd.stdin(Stdio::null())
        .stdout(Stdio::from(writer))
        .stderr(Stdio::from(writer_err));

    let mut child = cmd.spawn().map_err(launch_err)?;
    // the Command still owns both write ends; EOF never comes until it is gone
    drop(cmd);

    let mut captured_output = Vec::new();
    reader.read_to_end(&mut captured_output).map_err(launch_err)?;
    let status = child.wait().map_err(launch_err)?;

    match status.code() {
        Some(0) => Ok(ExecutionResult {
            exit_code: 0,
            captured_output,
        }),
        code => Err(BatchError::Execution {
            program: plan.program_path.clone(),
            exit_code: code,
            output: captured_output,
        }),
    }
}

/// A script copied into the data folder for this run.
#[derive(Debug)]
pub struct StagedScript {
    path: PathBuf,
}

impl StagedScript {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Best effort; a leftover copy only gets logged.
    pub fn remove(self) {
        match fs::remove_file(&self.path) {
            Ok(()) => log::debug!("removed staged script {}", self.path.display()),
            Err(e) => log::warn!(
                "could not remove staged script {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// Copy `script` into `folder` unless a file of that name is already there.
pub fn stage_script(script: &Path, folder: &Path) -> Result<Option<StagedScript>> {
    let name = script
        .file_name()
        .ok_or_else(|| BatchError::config(format!("bad script path {}", script.display())))?;
    let target = folder.join(name);

    if target.exists() {
        log::debug!("script already present in {}", folder.display());
        return Ok(None);
    }

    fs::copy(script, &target).map_err(|source| BatchError::Launch {
        program: script.display().to_string(),
        source,
    })?;
    log::info!("staged {} -> {}", script.display(), target.display());

    Ok(Some(StagedScript { path: target }))
}
