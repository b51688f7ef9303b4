use thiserror::Error;

use crate::assets::AssetKind;
use crate::segment::SegmentId;

/// Failures the scene reports to its observer. None of them stop the frame
/// loop; `NonFiniteState` additionally forces a chain rebuild.
#[derive(Debug, Error)]
pub enum LanyardError {
    #[error("non-finite state on segment {segment:?}")]
    NonFiniteState { segment: SegmentId },
    #[error("degenerate pointer ray: {0}")]
    DegenerateRay(&'static str),
    #[error("failed to load {kind:?} texture: {reason}")]
    AssetLoad { kind: AssetKind, reason: String },
    #[error("rigid body for segment {0:?} is missing")]
    MissingBody(SegmentId),
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
    #[error("invalid config value `{field}`: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },
}

impl LanyardError {
    /// Whether the chain has to be rebuilt before the next frame.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            LanyardError::NonFiniteState { .. } | LanyardError::MissingBody(_)
        )
    }
}
