use std::fs;
use std::path::Path;

use log::info;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::labels;
use crate::preprocess::{InputSpec, PixelRange};

/// File name of the manifest inside a model directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Description shipped next to a SavedModel so preprocessing can follow the
/// artifact instead of being hard-coded.
///
/// ```json
/// {
///     "input_size": [256, 256],
///     "pixel_range": "0-255",
///     "labels": ["Bacterial Spot", "Early Blight", "Healthy", "Late Blight", "Southern Blight"],
///     "signature": "serving_default"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelManifest {
    /// `[width, height]` of the model input.
    pub input_size: [u32; 2],

    pub pixel_range: PixelRange,

    /// Class names in output order. Must match the built-in vocabulary.
    pub labels: Option<Vec<String>>,

    /// SignatureDef to serve.
    pub signature: String,

    /// Signature input key; the only input is used when absent.
    pub input: Option<String>,

    /// Signature output key; the only output is used when absent.
    pub output: Option<String>,
}

impl Default for ModelManifest {
    fn default() -> Self {
        let spec = InputSpec::default();
        ModelManifest {
            input_size: [spec.width, spec.height],
            pixel_range: spec.range,
            labels: None,
            signature: "serving_default".to_owned(),
            input: None,
            output: None,
        }
    }
}

impl ModelManifest {
    /// Read `manifest.json` from `model_dir`, falling back to defaults when
    /// the directory has none.
    pub fn load_or_default(model_dir: &Path) -> Result<Self> {
        let path = model_dir.join(MANIFEST_FILE);

        if !path.exists() {
            info!(
                "No {} in {}, using default input spec",
                MANIFEST_FILE,
                model_dir.display()
            );
            return Ok(ModelManifest::default());
        }

        let json = fs::read_to_string(&path)
            .map_err(|e| Error::ModelLoad(format!("{}: {}", path.display(), e)))?;

        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let manifest: ModelManifest = serde_json::from_str(json)
            .map_err(|e| Error::ModelLoad(format!("invalid {}: {}", MANIFEST_FILE, e)))?;

        manifest.validate()?;

        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        let [width, height] = self.input_size;
        if width == 0 || height == 0 {
            return Err(Error::ModelLoad(format!(
                "invalid input size {}x{}",
                width, height
            )));
        }

        if let Some(ref names) = self.labels {
            if !names.iter().map(String::as_str).eq(labels::class_names()) {
                return Err(Error::ModelLoad(format!(
                    "model labels {:?} do not match vocabulary {:?}",
                    names,
                    labels::class_names().collect::<Vec<_>>()
                )));
            }
        }

        Ok(())
    }

    pub fn input_spec(&self) -> InputSpec {
        InputSpec {
            width: self.input_size[0],
            height: self.input_size[1],
            range: self.pixel_range,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_manifest_uses_defaults() {
        let manifest = ModelManifest::from_json("{}").unwrap();

        assert_eq!(manifest, ModelManifest::default());
        assert_eq!(manifest.input_spec(), InputSpec::default());
    }

    #[test]
    fn full_manifest() {
        let manifest = ModelManifest::from_json(
            r#"{
                "input_size": [224, 200],
                "pixel_range": "0-1",
                "labels": ["Bacterial Spot", "Early Blight", "Healthy", "Late Blight", "Southern Blight"],
                "signature": "predict",
                "input": "image",
                "output": "scores"
            }"#,
        )
        .unwrap();

        let spec = manifest.input_spec();
        assert_eq!((spec.width, spec.height), (224, 200));
        assert_eq!(spec.range, PixelRange::Unit);
        assert_eq!(manifest.signature, "predict");
        assert_eq!(manifest.input.as_deref(), Some("image"));
    }

    #[test]
    fn reordered_labels_are_rejected() {
        let err = ModelManifest::from_json(
            r#"{"labels": ["Early Blight", "Bacterial Spot", "Healthy", "Late Blight", "Southern Blight"]}"#,
        )
        .unwrap_err();

        assert!(matches!(err, Error::ModelLoad(_)));
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(ModelManifest::from_json(r#"{"pixel_range": "0-65535"}"#).is_err());
        assert!(ModelManifest::from_json(r#"{"input_size": [0, 256]}"#).is_err());
        assert!(ModelManifest::from_json(r#"{"resize": "crop"}"#).is_err());
    }

    #[test]
    fn missing_manifest_file_falls_back() {
        let dir = std::env::temp_dir();
        let manifest = ModelManifest::load_or_default(&dir.join("tomato-serve-no-such-model")).unwrap();

        assert_eq!(manifest, ModelManifest::default());
    }
}
