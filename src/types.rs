use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// one invocation with every selected file
    #[default]
    Batch,
    /// one invocation per file, stop at the first failure
    Each,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampPolicy {
    Created,
    #[default]
    Modified,
}

/// Where the child runs and how file arguments are spelled.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// child runs in the folder's base dir, files are `<folder>/<name>`
    #[default]
    Joined,
    /// child runs inside the folder, files are bare names, script is staged
    InFolder,
}

/// Folder argument plus the directory it is relative to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Folder {
    pub name: String,
    pub base: PathBuf,
}

impl Folder {
    pub fn dir(&self) -> PathBuf {
        self.base.join(&self.name)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    /// name as listed in the folder
    pub path: String,

    /// creation or modification time in ms, per policy
    pub timestamp_unix_ms: i64,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct InvocationPlan {
    pub program_path: String,
    pub working_arguments: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

impl InvocationPlan {
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = Some(interpreter.into());
        self
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Anchor a relative program path at the directory holding the script.
    pub fn rooted_at(mut self, script_dir: &Path) -> Self {
        if Path::new(&self.program_path).is_relative() {
            self.program_path = script_dir
                .join(&self.program_path)
                .to_string_lossy()
                .to_string();
        }
        self
    }

    /// Full command line for logs and dry runs.
    pub fn command_line(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.working_arguments.len() + 2);
        if let Some(interp) = &self.interpreter {
            out.push(interp.clone());
        }
        out.push(self.program_path.clone());
        out.extend(self.working_arguments.iter().cloned());
        out
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub captured_output: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> InvocationPlan {
        InvocationPlan {
            program_path: "script.R".to_string(),
            working_arguments: vec!["a.txt".to_string()],
            interpreter: None,
            working_dir: None,
        }
    }

    #[test]
    fn rooted_at_only_touches_relative_paths() {
        let p = plan().rooted_at(Path::new("/srv/scripts"));
        assert_eq!(
            PathBuf::from(&p.program_path),
            Path::new("/srv/scripts").join("script.R")
        );

        let again = p.clone().rooted_at(Path::new("/elsewhere"));
        assert_eq!(again.program_path, p.program_path);
    }

    #[test]
    fn command_line_puts_interpreter_first() {
        let p = plan().with_interpreter("Rscript");
        assert_eq!(p.command_line(), vec!["Rscript", "script.R", "a.txt"]);
        assert_eq!(plan().command_line(), vec!["script.R", "a.txt"]);
    }

    #[test]
    fn folder_dir_joins_base_and_name() {
        let f = Folder {
            name: "run1".to_string(),
            base: PathBuf::from("/data"),
        };
        assert_eq!(f.dir(), PathBuf::from("/data/run1"));
    }
}
