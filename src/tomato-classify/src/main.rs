use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;
use structopt::StructOpt;
use tomato_serve::{
    ErrorResponse, Prediction, PredictionResult, Predictor, RawUpload, StageTimings, TfClassifier,
};

#[derive(StructOpt, Debug)]
#[structopt(
    name = "tomato-classify",
    about = "CLI app to classify tomato leaf images with TensorFlow"
)]
struct CmdArgs {
    #[structopt(
        long,
        env = "TOMATO_MODEL_DIR",
        parse(from_os_str),
        help = "Export directory of TensorFlow SavedModel"
    )]
    model_dir: PathBuf,

    #[structopt(long, help = "Include per-stage timings in the output")]
    timings: bool,

    #[structopt(parse(from_os_str), required = true, help = "Images to classify")]
    images: Vec<PathBuf>,
}

/// One output line per image.
#[derive(Serialize)]
struct Report<'a> {
    file: String,

    #[serde(flatten)]
    result: &'a PredictionResult,

    #[serde(skip_serializing_if = "Option::is_none")]
    timings: Option<StageTimings>,
}

fn classify_file(predictor: &Predictor, path: &Path) -> Result<Prediction, Box<dyn Error>> {
    let upload = RawUpload {
        data: fs::read(path)?,
        content_type: None,
        file_name: Some(path.display().to_string()),
    };

    Ok(predictor.predict(&upload)?)
}

fn render(path: &Path, prediction: &Prediction, with_timings: bool) -> serde_json::Result<String> {
    serde_json::to_string(&Report {
        file: path.display().to_string(),
        result: &prediction.result,
        timings: if with_timings {
            Some(prediction.timings)
        } else {
            None
        },
    })
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = CmdArgs::from_args();

    let classifier = TfClassifier::load(&args.model_dir)?;
    let predictor = Predictor::new(Arc::new(classifier));

    let mut failures = 0;

    for path in &args.images {
        match classify_file(&predictor, path) {
            Ok(prediction) => println!("{}", render(path, &prediction, args.timings)?),
            Err(err) => {
                warn!("{}: {}", path.display(), err);
                failures += 1;
                println!("{}", serde_json::to_string(&ErrorResponse::default())?);
            }
        }
    }

    info!(
        "Classified {} of {} images",
        args.images.len() - failures,
        args.images.len()
    );

    if failures > 0 {
        return Err(format!(
            "{} of {} images could not be classified",
            failures,
            args.images.len()
        )
        .into());
    }

    Ok(())
}
