use serde::{Deserialize, Serialize};

use crate::error::LanyardError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    Rope,
    CardFront,
    CardBack,
}

impl AssetKind {
    pub const ALL: [AssetKind; 3] = [AssetKind::Rope, AssetKind::CardFront, AssetKind::CardBack];

    /// Rope texture tiles along the band; card faces clamp at their edges.
    pub fn wrap(self) -> WrapMode {
        match self {
            AssetKind::Rope => WrapMode::Repeat,
            AssetKind::CardFront | AssetKind::CardBack => WrapMode::ClampToEdge,
        }
    }

    fn index(self) -> usize {
        match self {
            AssetKind::Rope => 0,
            AssetKind::CardFront => 1,
            AssetKind::CardBack => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WrapMode {
    Repeat,
    ClampToEdge,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetStatus {
    Pending,
    Loaded,
    Failed(String),
}

/// Load status of the three textures. A failed texture only degrades
/// drawing; the simulation never waits on it.
#[derive(Clone, Debug)]
pub struct Assets {
    status: [AssetStatus; 3],
}

impl Default for Assets {
    fn default() -> Self {
        Self::new()
    }
}

impl Assets {
    pub fn new() -> Self {
        Self {
            status: [AssetStatus::Pending, AssetStatus::Pending, AssetStatus::Pending],
        }
    }

    pub fn status(&self, kind: AssetKind) -> &AssetStatus {
        &self.status[kind.index()]
    }

    pub fn is_loaded(&self, kind: AssetKind) -> bool {
        self.status(kind) == &AssetStatus::Loaded
    }

    pub fn mark_loaded(&mut self, kind: AssetKind) {
        log::info!("texture {kind:?} loaded");
        self.status[kind.index()] = AssetStatus::Loaded;
    }

    /// Record a failure and hand back the error for the caller's handler.
    pub fn mark_failed(&mut self, kind: AssetKind, reason: impl Into<String>) -> LanyardError {
        let reason = reason.into();
        self.status[kind.index()] = AssetStatus::Failed(reason.clone());
        LanyardError::AssetLoad { kind, reason }
    }

    pub fn all_settled(&self) -> bool {
        self.status.iter().all(|s| *s != AssetStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_modes() {
        assert_eq!(AssetKind::Rope.wrap(), WrapMode::Repeat);
        assert_eq!(AssetKind::CardFront.wrap(), WrapMode::ClampToEdge);
        assert_eq!(AssetKind::CardBack.wrap(), WrapMode::ClampToEdge);
    }

    #[test]
    fn failure_is_reported_not_fatal() {
        let mut assets = Assets::new();
        assets.mark_loaded(AssetKind::Rope);
        let err = assets.mark_failed(AssetKind::CardBack, "404");
        assert!(matches!(err, LanyardError::AssetLoad { kind: AssetKind::CardBack, .. }));
        assert!(!err.is_corruption());
        assert!(assets.is_loaded(AssetKind::Rope));
        assert!(!assets.all_settled());
        assets.mark_loaded(AssetKind::CardFront);
        assert!(assets.all_settled());
    }
}
