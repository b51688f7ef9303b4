use serde::{Deserialize, Serialize};

/// One rigid body of the lanyard, ordered from the fixed anchor to the card.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentId {
    Anchor,
    J1,
    J2,
    J3,
    Card,
}

impl SegmentId {
    pub const ALL: [SegmentId; 5] = [
        SegmentId::Anchor,
        SegmentId::J1,
        SegmentId::J2,
        SegmentId::J3,
        SegmentId::Card,
    ];

    /// Internal joints that get a smoothed position for the rope curve.
    pub const SMOOTHED: [SegmentId; 2] = [SegmentId::J1, SegmentId::J2];

    pub fn index(self) -> usize {
        match self {
            SegmentId::Anchor => 0,
            SegmentId::J1 => 1,
            SegmentId::J2 => 2,
            SegmentId::J3 => 3,
            SegmentId::Card => 4,
        }
    }

    /// The segment this one hangs from, `None` for the anchor.
    pub fn parent(self) -> Option<SegmentId> {
        match self {
            SegmentId::Anchor => None,
            other => Some(SegmentId::ALL[other.index() - 1]),
        }
    }
}

/// How the solver drives a body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionMode {
    /// Integrated from forces and joint impulses.
    Dynamic,
    /// Moved by scripted position targets, still collidable.
    Kinematic,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_order() {
        for (i, id) in SegmentId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
        assert_eq!(SegmentId::Anchor.parent(), None);
        assert_eq!(SegmentId::J1.parent(), Some(SegmentId::Anchor));
        assert_eq!(SegmentId::Card.parent(), Some(SegmentId::J3));
    }
}
