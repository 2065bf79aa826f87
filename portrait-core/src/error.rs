use std::fmt;

use thiserror::Error;

/// Why a run found nothing to enhance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissKind {
    /// The face detector returned no face.
    NoFace,
    /// The landmarker returned nothing, or too few points for a contour.
    NoLandmarks,
    /// The padded face region has zero area after clamping.
    EmptyRegion,
    /// A mask the pipeline depends on has no included pixel.
    EmptyMask,
}

impl MissKind {
    /// Advisory text suitable for a status line.
    pub fn advice(self) -> &'static str {
        match self {
            MissKind::NoFace => "No face was found. Try a photo with a clearly visible face.",
            MissKind::NoLandmarks => "Facial features could not be located.",
            MissKind::EmptyRegion => "The detected face region is empty.",
            MissKind::EmptyMask => "No usable face area was found.",
        }
    }
}

impl fmt::Display for MissKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MissKind::NoFace => "no face detected",
            MissKind::NoLandmarks => "no landmarks",
            MissKind::EmptyRegion => "empty face region",
            MissKind::EmptyMask => "empty mask",
        })
    }
}

/// Failures raised by the mask, blend and upscale operations.
///
/// Mask operations fail fast with these; `enhance_portrait` turns every one of
/// them into a status next to an unmodified image.
#[derive(Debug, Error)]
pub enum EnhanceError {
    #[error("shape mismatch in {op}: {detail}")]
    ShapeMismatch { op: &'static str, detail: String },
    #[error("detection miss: {0}")]
    DetectionMiss(MissKind),
    #[error("inference failed during {stage}")]
    InferenceFailure {
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("contour needs at least 3 points, got {got}")]
    InsufficientPoints { got: usize },
    #[error("run cancelled")]
    Cancelled,
}

impl EnhanceError {
    pub(crate) fn dims(op: &'static str, expected: (u32, u32), actual: (u32, u32)) -> Self {
        EnhanceError::ShapeMismatch {
            op,
            detail: format!(
                "expected {}x{}, got {}x{}",
                expected.0, expected.1, actual.0, actual.1
            ),
        }
    }

    pub(crate) fn inference(stage: &'static str, source: anyhow::Error) -> Self {
        EnhanceError::InferenceFailure { stage, source }
    }
}

pub type Result<T, E = EnhanceError> = std::result::Result<T, E>;

/// Fail with [`EnhanceError::ShapeMismatch`] unless both sizes agree.
pub(crate) fn ensure_same_dims(
    op: &'static str,
    expected: (u32, u32),
    actual: (u32, u32),
) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(EnhanceError::dims(op, expected, actual))
    }
}
