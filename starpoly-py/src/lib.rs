//! Python bindings for the starpoly segmentation library.
//!
//! This module exposes the high-level starpoly API to Python via PyO3.

use numpy::ndarray::{Array2, Array3};
use numpy::{
    IntoPyArray, PyArray2, PyArray3, PyReadonlyArray2, PyReadonlyArray3, PyUntypedArrayMethods,
};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use starpoly::{
    FrameResult, ImageView, LabelImage, OutputMode, PolygonRecord, Prediction, RayView,
    SegmentConfig as RustSegmentConfig, Segmenter as RustSegmenter, StackView, StarPolyError,
};

type FrameOutput<'py> = (Option<Bound<'py, PyArray2<u32>>>, Vec<Polygon>);
type StackOutput<'py> = (Option<Bound<'py, PyArray3<u32>>>, Vec<Polygon>);

/// Convert a StarPolyError to a Python exception.
fn to_py_err(err: StarPolyError) -> PyErr {
    PyRuntimeError::new_err(err.to_string())
}

fn parse_output(output: &str) -> PyResult<OutputMode> {
    match output.to_lowercase().as_str() {
        "label_image" | "labels" => Ok(OutputMode::LabelImage),
        "polygons" => Ok(OutputMode::Polygons),
        "both" => Ok(OutputMode::Both),
        _ => Err(PyValueError::new_err(
            "output must be 'label_image', 'polygons' or 'both'",
        )),
    }
}

fn output_name(output: OutputMode) -> &'static str {
    match output {
        OutputMode::LabelImage => "label_image",
        OutputMode::Polygons => "polygons",
        OutputMode::Both => "both",
    }
}

/// An accepted polygon.
#[pyclass]
#[derive(Clone)]
pub struct Polygon {
    /// 1-based id; equals the label value of the object.
    #[pyo3(get)]
    pub id: u32,
    /// Frame index for stacks, None for single images.
    #[pyo3(get)]
    pub frame: Option<usize>,
    /// Probability at the origin pixel.
    #[pyo3(get)]
    pub score: f32,
    /// Origin column.
    #[pyo3(get)]
    pub x: usize,
    /// Origin row.
    #[pyo3(get)]
    pub y: usize,
    /// Vertices as (x, y) pairs in angular order.
    #[pyo3(get)]
    pub vertices: Vec<(f64, f64)>,
}

#[pymethods]
impl Polygon {
    fn __repr__(&self) -> String {
        format!(
            "Polygon(id={}, x={}, y={}, score={:.4}, n_vertices={})",
            self.id,
            self.x,
            self.y,
            self.score,
            self.vertices.len()
        )
    }
}

impl From<&PolygonRecord> for Polygon {
    fn from(p: &PolygonRecord) -> Self {
        Self {
            id: p.id,
            frame: p.frame,
            score: p.score,
            x: p.origin[0],
            y: p.origin[1],
            vertices: p.vertices.iter().map(|v| (v[0], v[1])).collect(),
        }
    }
}

/// Segmentation parameters.
#[pyclass]
#[derive(Clone)]
pub struct SegmentConfig {
    inner: RustSegmentConfig,
}

#[pymethods]
impl SegmentConfig {
    /// Create a new SegmentConfig.
    ///
    /// Args:
    ///     n_rays: Rays per pixel (default: 32)
    ///     prob_thresh: Minimum object probability (default: 0.55)
    ///     nms_thresh: IoU at which overlapping polygons are suppressed (default: 0.4)
    ///     exclude_border: Border exclusion margin in pixels, 0 disables (default: 2)
    ///     output: "label_image", "polygons" or "both" (default: "both")
    ///     parallel: Enable parallel execution (default: False)
    #[new]
    #[pyo3(signature = (
        n_rays = 32,
        prob_thresh = 0.55,
        nms_thresh = 0.4,
        exclude_border = 2,
        output = "both",
        parallel = false
    ))]
    fn new(
        n_rays: usize,
        prob_thresh: f32,
        nms_thresh: f32,
        exclude_border: usize,
        output: &str,
        parallel: bool,
    ) -> PyResult<Self> {
        let inner = RustSegmentConfig {
            n_rays,
            prob_thresh,
            nms_thresh,
            exclude_border,
            output: parse_output(output)?,
            parallel,
        };
        inner.validate().map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Validate the configuration.
    fn validate(&self) -> PyResult<()> {
        self.inner.validate().map_err(to_py_err)
    }

    #[getter]
    fn n_rays(&self) -> usize {
        self.inner.n_rays
    }

    fn __repr__(&self) -> String {
        format!(
            "SegmentConfig(n_rays={}, prob_thresh={}, nms_thresh={}, exclude_border={}, output='{}', parallel={})",
            self.inner.n_rays,
            self.inner.prob_thresh,
            self.inner.nms_thresh,
            self.inner.exclude_border,
            output_name(self.inner.output),
            self.inner.parallel
        )
    }
}

fn labels_to_py<'py>(py: Python<'py>, labels: LabelImage) -> PyResult<Bound<'py, PyArray2<u32>>> {
    let shape = (labels.height(), labels.width());
    let array = Array2::from_shape_vec(shape, labels.into_vec())
        .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
    Ok(array.into_pyarray(py))
}

fn frame_to_py(py: Python<'_>, result: FrameResult) -> PyResult<FrameOutput<'_>> {
    let polygons = result.polygons.iter().map(Polygon::from).collect();
    let labels = result.labels.map(|l| labels_to_py(py, l)).transpose()?;
    Ok((labels, polygons))
}

/// Segmenter holding a validated configuration.
#[pyclass]
pub struct Segmenter {
    inner: RustSegmenter,
}

#[pymethods]
impl Segmenter {
    /// Create a segmenter.
    ///
    /// Args:
    ///     config: SegmentConfig (default: SegmentConfig())
    #[new]
    #[pyo3(signature = (config = None))]
    fn new(config: Option<SegmentConfig>) -> PyResult<Self> {
        let cfg = config.map(|c| c.inner).unwrap_or_default();
        let inner = RustSegmenter::new(cfg).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Segment one image.
    ///
    /// Args:
    ///     prob: 2D float32 array (height x width)
    ///     dist: 3D float32 array (height x width x n_rays)
    ///
    /// Returns:
    ///     (labels or None, list of Polygon)
    fn segment<'py>(
        &self,
        py: Python<'py>,
        prob: PyReadonlyArray2<'py, f32>,
        dist: PyReadonlyArray3<'py, f32>,
    ) -> PyResult<FrameOutput<'py>> {
        let prob_shape = prob.shape();
        let dist_shape = dist.shape();
        let prob_view = ImageView::from_slice(prob.as_slice()?, prob_shape[1], prob_shape[0])
            .map_err(to_py_err)?;
        let dist_view = RayView::new(dist.as_slice()?, dist_shape[1], dist_shape[0], dist_shape[2])
            .map_err(to_py_err)?;
        let result = self
            .inner
            .segment_frame(prob_view, dist_view)
            .map_err(to_py_err)?;
        frame_to_py(py, result)
    }

    /// Segment a combined network output.
    ///
    /// Args:
    ///     prediction: 3D float32 array (height x width x (1 + n_rays)),
    ///         probability in channel 0
    fn segment_prediction<'py>(
        &self,
        py: Python<'py>,
        prediction: PyReadonlyArray3<'py, f32>,
    ) -> PyResult<FrameOutput<'py>> {
        let shape = prediction.shape();
        let pred = Prediction::split(prediction.as_slice()?, shape[1], shape[0], shape[2])
            .map_err(to_py_err)?;
        let result = self
            .inner
            .segment_frame(pred.prob(), pred.dist())
            .map_err(to_py_err)?;
        frame_to_py(py, result)
    }

    /// Segment a timelapse.
    ///
    /// Args:
    ///     prob: 3D float32 array (frames x height x width)
    ///     dist: 3D float32 array (height x width x (frames * n_rays))
    ///
    /// Returns:
    ///     (labels (frames x height x width) or None, list of Polygon)
    fn segment_stack<'py>(
        &self,
        py: Python<'py>,
        prob: PyReadonlyArray3<'py, f32>,
        dist: PyReadonlyArray3<'py, f32>,
    ) -> PyResult<StackOutput<'py>> {
        let prob_shape = prob.shape();
        let dist_shape = dist.shape();
        let prob_view = StackView::new(prob.as_slice()?, prob_shape[2], prob_shape[1], prob_shape[0])
            .map_err(to_py_err)?;
        let dist_view = RayView::new(dist.as_slice()?, dist_shape[1], dist_shape[0], dist_shape[2])
            .map_err(to_py_err)?;
        let result = self
            .inner
            .segment_stack(prob_view, dist_view)
            .map_err(to_py_err)?;

        let polygons = result.polygons().map(Polygon::from).collect();
        let labels = match result.label_stack().map_err(to_py_err)? {
            Some(stack) => {
                let shape = (stack.len(), stack.height(), stack.width());
                let array = Array3::from_shape_vec(shape, stack.to_vec().map_err(to_py_err)?)
                    .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
                Some(array.into_pyarray(py))
            }
            None => None,
        };
        Ok((labels, polygons))
    }

    #[getter]
    fn config(&self) -> SegmentConfig {
        SegmentConfig {
            inner: self.inner.config().clone(),
        }
    }

    fn __repr__(&self) -> String {
        format!("Segmenter(n_rays={})", self.inner.config().n_rays)
    }
}

/// Convenience function to segment one image.
///
/// Args:
///     prob: 2D float32 array (height x width)
///     dist: 3D float32 array (height x width x n_rays)
///     prob_thresh: Minimum object probability (default: 0.55)
///     nms_thresh: IoU at which overlapping polygons are suppressed (default: 0.4)
///     exclude_border: Border exclusion margin in pixels (default: 2)
///     output: "label_image", "polygons" or "both" (default: "both")
///     parallel: Enable parallel execution (default: False)
///
/// Returns:
///     (labels or None, list of Polygon)
#[pyfunction]
#[pyo3(signature = (
    prob,
    dist,
    prob_thresh = 0.55,
    nms_thresh = 0.4,
    exclude_border = 2,
    output = "both",
    parallel = false
))]
#[allow(clippy::too_many_arguments)]
fn segment<'py>(
    py: Python<'py>,
    prob: PyReadonlyArray2<'py, f32>,
    dist: PyReadonlyArray3<'py, f32>,
    prob_thresh: f32,
    nms_thresh: f32,
    exclude_border: usize,
    output: &str,
    parallel: bool,
) -> PyResult<FrameOutput<'py>> {
    let config = RustSegmentConfig {
        n_rays: dist.shape()[2],
        prob_thresh,
        nms_thresh,
        exclude_border,
        output: parse_output(output)?,
        parallel,
    };
    let segmenter = Segmenter {
        inner: RustSegmenter::new(config).map_err(to_py_err)?,
    };
    segmenter.segment(py, prob, dist)
}

/// Load a probability map from an 8- or 16-bit grayscale image, scaled to [0, 1].
#[pyfunction]
fn load_probability<'py>(py: Python<'py>, path: &str) -> PyResult<Bound<'py, PyArray2<f32>>> {
    let img = starpoly::io::load_prob_image(path).map_err(to_py_err)?;
    let shape = (img.height(), img.width());
    let array = Array2::from_shape_vec(shape, img.into_vec())
        .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
    Ok(array.into_pyarray(py))
}

/// Save a label array (height x width, uint32) as a 16-bit grayscale image.
#[pyfunction]
fn save_labels(labels: PyReadonlyArray2<'_, u32>, path: &str) -> PyResult<()> {
    let shape = labels.shape();
    let view = ImageView::from_slice(labels.as_slice()?, shape[1], shape[0]).map_err(to_py_err)?;
    starpoly::io::save_labels(view, path).map_err(to_py_err)
}

/// Python module for starpoly segmentation.
#[pymodule]
fn _starpoly(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Polygon>()?;
    m.add_class::<SegmentConfig>()?;
    m.add_class::<Segmenter>()?;
    m.add_function(wrap_pyfunction!(segment, m)?)?;
    m.add_function(wrap_pyfunction!(load_probability, m)?)?;
    m.add_function(wrap_pyfunction!(save_labels, m)?)?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
