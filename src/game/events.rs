//! Events emitted by a simulation tick
//!
//! The sync layer turns these into peer messages; a client turns them into
//! sounds and effects.

use crate::game::state::Slot;
use crate::game::systems::combat::AttackKind;

/// Why a pickup left the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    Offscreen,
    Eaten,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    JumpStarted {
        fighter: Slot,
    },
    AttackStarted {
        fighter: Slot,
        kind: AttackKind,
    },
    /// A swing connected. Health is the target's after damage.
    HitLanded {
        attacker: Slot,
        target: Slot,
        kind: AttackKind,
        damage: i32,
        target_health: i32,
        target_dead: bool,
    },
    Died {
        fighter: Slot,
    },
    Won {
        fighter: Slot,
    },
    MouseEaten {
        fighter: Slot,
        heal_amount: i32,
    },
    /// The pending heal of a finished meal was applied
    Healed {
        fighter: Slot,
        health: i32,
    },
    MouseSpawned {
        from_right: bool,
    },
    MouseRemoved {
        reason: RemovalReason,
    },
}

/// Events produced by one tick; rarely more than a handful
pub type EventBuffer = smallvec::SmallVec<[GameEvent; 8]>;
