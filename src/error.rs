use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("cannot launch {program}: OS error({code}): {source}", code = .source.raw_os_error().unwrap_or(-1))]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed ({})", describe_exit(.exit_code))]
    Execution {
        program: String,
        exit_code: Option<i32>,
        output: Vec<u8>,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit status {c}"),
        None => "terminated by signal".to_string(),
    }
}

impl BatchError {
    pub fn config(msg: impl Into<String>) -> Self {
        BatchError::Configuration(msg.into())
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            BatchError::Configuration(_) => 2,
            BatchError::Launch { .. } => 127,
            BatchError::Execution { exit_code, .. } => match exit_code {
                Some(c) if *c != 0 => *c,
                _ => 1,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, BatchError>;
