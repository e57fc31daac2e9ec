use std::collections::HashMap;
use std::path::Path;

use log::info;
use tensorflow::{
    Graph, SavedModelBundle, Session, SessionOptions, SessionRunArgs, Status, Tensor, TensorInfo,
};

use crate::error::{Error, Result};
use crate::manifest::ModelManifest;
use crate::preprocess::{InputSpec, InputTensor};
use crate::timer::Timer;

/// Per-class scores produced by a classifier, in vocabulary order.
pub type Distribution = Vec<f32>;

/// A loaded image classifier.
///
/// Implementations must be pure: the same tensor always yields the same
/// distribution and no state changes between calls.
pub trait Classifier: Send + Sync {
    /// Geometry and range the model was trained with.
    fn input_spec(&self) -> InputSpec;

    fn infer(&self, tensor: &InputTensor) -> Result<Distribution>;
}

/// Graph endpoint resolved from a SignatureDef.
#[derive(Debug, Clone)]
struct Endpoint {
    op: String,
    index: i32,
}

/// Classifier backed by a TensorFlow SavedModel exported with the `serve` tag.
///
/// Loaded once at start-up and shared by reference. TensorFlow documents
/// `TF_SessionRun` as safe to call concurrently on one session, so `infer`
/// takes `&self` and callers need no lock.
pub struct TfClassifier {
    /// TensorFlow model graph
    graph: Graph,

    /// TensorFlow session
    session: Session,

    input: Endpoint,
    output: Endpoint,
    spec: InputSpec,
}

impl TfClassifier {
    pub fn load(model_dir: &Path) -> Result<Self> {
        if !model_dir.is_dir() {
            return Err(Error::ModelLoad(format!(
                "model directory {} does not exist",
                model_dir.display()
            )));
        }

        let manifest = ModelManifest::load_or_default(model_dir)?;

        let mut t = Timer::new_start("Loading session");

        let mut graph = Graph::new();
        let bundle =
            SavedModelBundle::load(&SessionOptions::new(), &["serve"], &mut graph, model_dir)
                .map_err(load_error)?;

        let (input, output) = {
            let signature = bundle
                .meta_graph_def()
                .get_signature(&manifest.signature)
                .map_err(load_error)?;

            (
                resolve(signature.inputs(), manifest.input.as_deref(), "input")?,
                resolve(signature.outputs(), manifest.output.as_deref(), "output")?,
            )
        };

        // Fail now rather than on the first request.
        graph
            .operation_by_name_required(&input.op)
            .map_err(load_error)?;
        graph
            .operation_by_name_required(&output.op)
            .map_err(load_error)?;

        t.stop();

        info!(
            "Loaded model from {} (feed {}:{}, fetch {}:{})",
            model_dir.display(),
            input.op,
            input.index,
            output.op,
            output.index
        );

        Ok(TfClassifier {
            graph,
            session: bundle.session,
            input,
            output,
            spec: manifest.input_spec(),
        })
    }
}

impl Classifier for TfClassifier {
    fn input_spec(&self) -> InputSpec {
        self.spec
    }

    fn infer(&self, tensor: &InputTensor) -> Result<Distribution> {
        let input = Tensor::new(tensor.dims())
            .with_values(tensor.as_slice())
            .map_err(inference_error)?;

        let mut args = SessionRunArgs::new();

        args.add_feed(
            &self
                .graph
                .operation_by_name_required(&self.input.op)
                .map_err(inference_error)?,
            self.input.index,
            &input,
        );

        let result = args.request_fetch(
            &self
                .graph
                .operation_by_name_required(&self.output.op)
                .map_err(inference_error)?,
            self.output.index,
        );

        self.session.run(&mut args).map_err(inference_error)?;
        let output: Tensor<f32> = args.fetch(result).map_err(inference_error)?;

        Ok(output.to_vec())
    }
}

/// Pick the signature entry named `key`, or the only entry when no key is given.
fn resolve(
    entries: &HashMap<String, TensorInfo>,
    key: Option<&str>,
    kind: &str,
) -> Result<Endpoint> {
    let info = match key {
        Some(key) => entries.get(key).ok_or_else(|| {
            Error::ModelLoad(format!("signature has no {} named '{}'", kind, key))
        })?,
        None if entries.len() == 1 => entries.values().next().ok_or_else(|| {
            Error::ModelLoad(format!("signature has no {}", kind))
        })?,
        None => {
            let mut keys: Vec<_> = entries.keys().collect();
            keys.sort();
            return Err(Error::ModelLoad(format!(
                "signature has {} {}s {:?}, name one in {}",
                entries.len(),
                kind,
                keys,
                crate::manifest::MANIFEST_FILE
            )));
        }
    };

    Ok(Endpoint {
        op: info.name().name.clone(),
        index: info.name().index,
    })
}

fn load_error(status: Status) -> Error {
    Error::ModelLoad(status.to_string())
}

fn inference_error(status: Status) -> Error {
    Error::Inference(status.to_string())
}
