//! Tract backend implementation for salient-object segmentation
//!
//! Runs U²-Net style ONNX models with Tract, a pure Rust inference engine.
//! The model is loaded on first use and then shared by all requests; a
//! failed load leaves the backend uninitialized so the next request retries.

use crate::config::ModelConfig;
use crate::error::{BgRemovalError, Result};
use crate::inference::SegmentationBackend;
use crate::utils::{ImagePreprocessor, PreprocessingConfig};
use image::{DynamicImage, GenericImageView, RgbaImage};
use ndarray::Array2;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use tract_onnx::prelude::*;

/// Type alias for the complex Tract model type to reduce complexity warnings
type TractModel = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

// Use instant crate for cross-platform time compatibility
use instant::{Duration, Instant};

/// Tract backend for running segmentation models using pure Rust inference
#[derive(Debug)]
pub struct TractBackend {
    model_path: Option<PathBuf>,
    preprocessing: PreprocessingConfig,
    model: OnceLock<TractModel>,
    init_lock: Mutex<()>,
}

impl TractBackend {
    /// Create a new uninitialized Tract backend
    #[must_use]
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            model_path: config.path.clone(),
            preprocessing: PreprocessingConfig::with_input_size(config.input_size),
            model: OnceLock::new(),
            init_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn model_path(&self) -> Option<&std::path::Path> {
        self.model_path.as_deref()
    }

    /// Load, optimize and plan the model
    fn load_model(&self) -> Result<TractModel> {
        let path = self.model_path.as_ref().ok_or_else(|| {
            BgRemovalError::model("No segmentation model configured (set MODEL_PATH)")
        })?;
        if !path.is_file() {
            return Err(BgRemovalError::model(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        let size = self.preprocessing.input_size as usize;
        tracing::info!(
            model_path = %path.display(),
            input_size = size,
            "🚀 Loading segmentation model with Tract"
        );

        onnx()
            .model_for_path(path)
            .map_err(|e| BgRemovalError::model(format!("Failed to load ONNX model: {e}")))?
            .with_input_fact(0, f32::fact([1, 3, size, size]).into())
            .map_err(|e| BgRemovalError::model(format!("Failed to set model input shape: {e}")))?
            .into_optimized()
            .map_err(|e| BgRemovalError::model(format!("Failed to optimize model: {e}")))?
            .into_runnable()
            .map_err(|e| BgRemovalError::model(format!("Failed to create runnable model: {e}")))
    }

    /// Run the model and return the first output plane as a 2D saliency map
    fn infer(&self, model: &TractModel, image: &DynamicImage) -> Result<Array2<f32>> {
        let input = ImagePreprocessor::preprocess_for_inference(image, &self.preprocessing)?;
        let data = input
            .as_slice()
            .ok_or_else(|| BgRemovalError::internal("Input tensor is not contiguous"))?;

        let tensor = Tensor::from_shape(input.shape(), data).map_err(|e| {
            BgRemovalError::segmentation_stage_error("input", &e.to_string(), None)
        })?;

        let outputs = model.run(tvec![tensor.into()]).map_err(|e| {
            BgRemovalError::segmentation_stage_error("inference", &e.to_string(), None)
        })?;

        let output = outputs
            .first()
            .ok_or_else(|| BgRemovalError::segmentation("Model produced no outputs"))?;
        let shape = output.shape().to_vec();
        let values = output.as_slice::<f32>().map_err(|e| {
            BgRemovalError::segmentation_stage_error("output", &e.to_string(), None)
        })?;

        let (rows, cols) = match shape.as_slice() {
            [.., rows, cols] => (*rows, *cols),
            _ => {
                return Err(BgRemovalError::segmentation(format!(
                    "Expected at least 2D output tensor, got shape {shape:?}"
                )))
            },
        };
        let plane = values.get(..rows * cols).ok_or_else(|| {
            BgRemovalError::segmentation(format!("Output tensor {shape:?} is truncated"))
        })?;

        Array2::from_shape_vec((rows, cols), plane.to_vec())
            .map_err(|e| BgRemovalError::segmentation(format!("Failed to reshape output: {e}")))
    }
}

impl SegmentationBackend for TractBackend {
    fn initialize(&self) -> Result<Option<Duration>> {
        if self.model.get().is_some() {
            return Ok(None);
        }

        let _guard = self
            .init_lock
            .lock()
            .map_err(|_| BgRemovalError::internal("Model initialization lock poisoned"))?;
        if self.model.get().is_some() {
            return Ok(None);
        }

        let start = Instant::now();
        let model = self.load_model()?;
        if self.model.set(model).is_err() {
            return Ok(None);
        }

        let elapsed = start.elapsed();
        tracing::info!(
            load_ms = elapsed.as_millis() as u64,
            "✅ Tract backend initialized"
        );
        Ok(Some(elapsed))
    }

    fn segment(&self, image: DynamicImage) -> Result<RgbaImage> {
        self.initialize()?;
        let model = self
            .model
            .get()
            .ok_or_else(|| BgRemovalError::model("Tract model not initialized"))?;

        let (width, height) = image.dimensions();
        let span = tracing::debug_span!("inference", backend = "tract", width, height);
        let _enter = span.enter();

        let start = Instant::now();
        let saliency = self.infer(model, &image)?;
        let mask = ImagePreprocessor::saliency_to_mask(&saliency, width, height)?;
        let output = ImagePreprocessor::apply_mask(&image, &mask)?;

        tracing::debug!(
            inference_ms = start.elapsed().as_millis() as u64,
            "Tract inference completed"
        );
        Ok(output)
    }

    fn name(&self) -> &str {
        "tract"
    }

    fn is_initialized(&self) -> bool {
        self.model.get().is_some()
    }
}
