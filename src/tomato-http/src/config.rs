use std::path::PathBuf;
use std::str::FromStr;

use hyper::StatusCode;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "tomato-http",
    about = "HTTP service classifying tomato leaf diseases with TensorFlow"
)]
pub struct ServerArgs {
    #[structopt(
        long,
        env = "TOMATO_MODEL_DIR",
        parse(from_os_str),
        help = "Export directory of the TensorFlow SavedModel"
    )]
    pub model_dir: PathBuf,

    #[structopt(long, env = "TOMATO_HOST", default_value = "localhost")]
    pub host: String,

    #[structopt(long, env = "TOMATO_PORT", default_value = "8000")]
    pub port: u16,

    #[structopt(
        long,
        env = "TOMATO_MAX_UPLOAD_BYTES",
        default_value = "16777216",
        help = "Largest accepted multipart body"
    )]
    pub max_upload_bytes: u64,

    #[structopt(
        long,
        env = "TOMATO_ERROR_STATUS",
        default_value = "compat",
        possible_values = &["compat", "strict"],
        help = "HTTP status for failed predictions: `compat` always answers 200, `strict` uses 4xx/5xx"
    )]
    pub error_status: ErrorStatus,
}

/// Status code policy for per-request failures. The body is the same opaque
/// error object either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStatus {
    Compat,
    Strict,
}

impl ErrorStatus {
    /// Status to send for a failure that `strict` would report as `status`.
    pub fn status(self, status: StatusCode) -> StatusCode {
        match self {
            ErrorStatus::Compat => StatusCode::OK,
            ErrorStatus::Strict => status,
        }
    }
}

impl FromStr for ErrorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compat" => Ok(ErrorStatus::Compat),
            "strict" => Ok(ErrorStatus::Strict),
            other => Err(format!("unknown error status policy '{}'", other)),
        }
    }
}
