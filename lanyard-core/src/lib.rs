//! Platform-independent core of the lanyard: a rope of rigid segments hung
//! from a fixed anchor with a draggable card on the end.
//!
//! [`Scene`] drives everything once per rendered frame and hands back a
//! [`FrameOutput`] for whatever is drawing it.

pub mod assets;
pub mod camera;
pub mod chain;
pub mod config;
pub mod curve;
pub mod drag;
pub mod entrance;
pub mod error;
pub mod scene;
pub mod segment;
pub mod spline;

pub use assets::{AssetKind, AssetStatus, Assets, WrapMode};
pub use camera::Camera;
pub use chain::PhysicsChain;
pub use config::LanyardConfig;
pub use curve::CurveRenderer;
pub use drag::{DragController, DragState};
pub use entrance::{AnimationState, EntranceAnimator, EntranceFrame, ease_out_bounce};
pub use error::LanyardError;
pub use scene::{CardTransform, CursorHint, FrameObserver, FrameOutput, LogObserver, NoOpObserver, Scene};
pub use segment::{MotionMode, SegmentId};
pub use spline::ChordalSpline;

pub use rapier3d::na;
