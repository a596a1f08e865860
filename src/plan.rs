use crate::types::{Folder, InvocationPlan, Layout};

/// Append `suffix` unless `name` already ends with it. Idempotent.
pub fn ensure_suffix(name: &str, suffix: &str) -> String {
    if name.ends_with(suffix) {
        name.to_string()
    } else {
        format!("{name}{suffix}")
    }
}

/// Put the reference file (e.g. a height file) ahead of the data files.
pub fn with_reference(
    ordered_paths: Vec<String>,
    reference_name: Option<&str>,
    reference_suffix: &str,
) -> Vec<String> {
    let Some(reference) = reference_name else {
        return ordered_paths;
    };

    let mut out = Vec::with_capacity(ordered_paths.len() + 1);
    out.push(ensure_suffix(reference, reference_suffix));
    out.extend(ordered_paths);
    out
}

pub fn build_invocation(
    program_name: &str,
    script_suffix: &str,
    folder_prefix: Option<&str>,
    files: Vec<String>,
) -> InvocationPlan {
    let mut working_arguments = Vec::with_capacity(files.len() + 1);
    if let Some(prefix) = folder_prefix {
        working_arguments.push(prefix.to_string());
    }
    working_arguments.extend(files);

    InvocationPlan {
        program_path: ensure_suffix(program_name, script_suffix),
        working_arguments,
        interpreter: None,
        working_dir: None,
    }
}

/// `run1` -> `run1/`
pub fn folder_prefix(folder: &Folder) -> String {
    ensure_suffix(&folder.name, "/")
}

/// Spell file names the way the child will see them from its working dir.
pub fn file_arguments(folder: &Folder, layout: Layout, names: Vec<String>) -> Vec<String> {
    match layout {
        Layout::InFolder => names,
        Layout::Joined => {
            let prefix = folder_prefix(folder);
            names.into_iter().map(|n| format!("{prefix}{n}")).collect()
        }
    }
}
