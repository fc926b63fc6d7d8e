//! Match result resolution
//!
//! Decides the winner once a fighter is down.

use crate::game::events::{EventBuffer, GameEvent, RemovalReason};
use crate::game::state::{AnimCode, Fighter, Pickup, Slot};
use crate::game::systems::{combat, pickup};

/// Outcome of a finished match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult {
    pub winner: Slot,
    pub loser: Slot,
    /// Winner's health at the moment of victory
    pub winner_health: i32,
}

/// Current result, if the match is decided
pub fn determine_result(fighters: &[Fighter; 2]) -> Option<MatchResult> {
    let winner = fighters.iter().find(|f| f.winner)?;
    Some(MatchResult {
        winner: winner.slot,
        loser: winner.slot.other(),
        winner_health: winner.health,
    })
}

/// Crown the survivor once the other fighter is dead. Idempotent: `Won`
/// fires only on the tick a winner is first set, and at most one winner
/// ever exists. A live pickup goes to the new winner straight away.
pub fn resolve_winner(
    fighters: &mut [Fighter; 2],
    live_pickup: &mut Option<Pickup>,
    events: &mut EventBuffer,
) -> Option<Slot> {
    if fighters.iter().any(|f| f.winner) {
        return None;
    }

    let survivor = [Slot::P1, Slot::P2].into_iter().find(|slot| {
        let me = &fighters[slot.index()];
        let other = &fighters[slot.other().index()];
        other.dead && !me.dead
    })?;

    let winner = &mut fighters[survivor.index()];
    winner.winner = true;
    winner.anim = AnimCode::Victory;
    events.push(GameEvent::Won { fighter: survivor });

    if live_pickup.is_some() && !winner.is_eating() {
        combat::eat_pickup(winner, events);
        pickup::remove(live_pickup, RemovalReason::Eaten, events);
    }

    Some(survivor)
}
