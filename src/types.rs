//! Core types for spark-tree.
//!
//! Frame event markers, the frame phase table, and node lifecycle states.

use serde::{Deserialize, Serialize};

use crate::engine::Tree;

// =============================================================================
// Node State
// =============================================================================

/// Lifecycle state of a [`Node`](crate::Node).
///
/// Transitions only move forward:
///
/// ```text
/// Building → Mounted → QueuedForDeletion → Freed
///     └─────────┴──────────────┴──────────────┘ (free from any state)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NodeState {
    /// Constructed and possibly attached, not yet mounted.
    #[default]
    Building,
    /// Mount hooks have run; the node receives frame events.
    Mounted,
    /// `queue_free` was called; the node is freed at the next flush.
    QueuedForDeletion,
    /// Terminal. A freed node is never reused.
    Freed,
}

impl NodeState {
    /// Whether frame events are delivered to a node in this state.
    pub fn receives_events(self) -> bool {
        matches!(self, NodeState::Mounted | NodeState::QueuedForDeletion)
    }
}

// =============================================================================
// Frame Events
// =============================================================================

/// Start of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct First;

/// Before the update phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PreUpdate;

/// Main update phase. Carries the frame's delta time in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Update {
    pub delta: f32,
}

/// After the update phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PostUpdate;

/// Before drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PreDraw;

/// Drawing phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Draw;

/// After drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PostDraw;

/// End of a frame, right before the deferred flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Last;

// =============================================================================
// Phases
// =============================================================================

/// One frame phase. Each variant maps to exactly one event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    First,
    PreUpdate,
    Update,
    PostUpdate,
    PreDraw,
    Draw,
    PostDraw,
    Last,
}

impl Phase {
    /// Canonical per-frame order.
    pub const ORDER: [Phase; 8] = [
        Phase::First,
        Phase::PreUpdate,
        Phase::Update,
        Phase::PostUpdate,
        Phase::PreDraw,
        Phase::Draw,
        Phase::PostDraw,
        Phase::Last,
    ];

    /// The flag for this phase in a [`Phases`] set.
    pub fn flag(self) -> Phases {
        match self {
            Phase::First => Phases::FIRST,
            Phase::PreUpdate => Phases::PRE_UPDATE,
            Phase::Update => Phases::UPDATE,
            Phase::PostUpdate => Phases::POST_UPDATE,
            Phase::PreDraw => Phases::PRE_DRAW,
            Phase::Draw => Phases::DRAW,
            Phase::PostDraw => Phases::POST_DRAW,
            Phase::Last => Phases::LAST,
        }
    }

    /// Dispatch this phase's event through the whole tree.
    ///
    /// `delta` is only carried by [`Update`].
    pub fn dispatch(self, tree: &Tree, delta: f32) {
        match self {
            Phase::First => tree.call(&First),
            Phase::PreUpdate => tree.call(&PreUpdate),
            Phase::Update => tree.call(&Update { delta }),
            Phase::PostUpdate => tree.call(&PostUpdate),
            Phase::PreDraw => tree.call(&PreDraw),
            Phase::Draw => tree.call(&Draw),
            Phase::PostDraw => tree.call(&PostDraw),
            Phase::Last => tree.call(&Last),
        }
    }
}

bitflags::bitflags! {
    /// A set of frame phases.
    ///
    /// Serialized in bitflags' text form: `"FIRST | UPDATE | LAST"`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Phases: u8 {
        const FIRST = 1 << 0;
        const PRE_UPDATE = 1 << 1;
        const UPDATE = 1 << 2;
        const POST_UPDATE = 1 << 3;
        const PRE_DRAW = 1 << 4;
        const DRAW = 1 << 5;
        const POST_DRAW = 1 << 6;
        const LAST = 1 << 7;

        const UPDATE_PHASES = Self::PRE_UPDATE.bits() | Self::UPDATE.bits() | Self::POST_UPDATE.bits();
        const DRAW_PHASES = Self::PRE_DRAW.bits() | Self::DRAW.bits() | Self::POST_DRAW.bits();
    }
}

impl Default for Phases {
    fn default() -> Self {
        Phases::all()
    }
}

impl Phases {
    /// Enabled phases in canonical order.
    pub fn ordered(self) -> impl Iterator<Item = Phase> {
        Phase::ORDER
            .into_iter()
            .filter(move |phase| self.contains(phase.flag()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_follows_canonical_order() {
        let phases = Phases::LAST | Phases::FIRST | Phases::UPDATE;
        let ordered: Vec<Phase> = phases.ordered().collect();
        assert_eq!(ordered, vec![Phase::First, Phase::Update, Phase::Last]);
    }

    #[test]
    fn test_default_is_every_phase() {
        assert_eq!(Phases::default().ordered().count(), 8);
        assert!(Phases::default().contains(Phases::UPDATE_PHASES | Phases::DRAW_PHASES));
    }

    #[test]
    fn test_event_states() {
        assert!(!NodeState::Building.receives_events());
        assert!(NodeState::Mounted.receives_events());
        assert!(NodeState::QueuedForDeletion.receives_events());
        assert!(!NodeState::Freed.receives_events());
    }
}
