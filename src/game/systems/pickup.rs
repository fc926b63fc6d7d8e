use rand::Rng;

use crate::game::constants::pickup::SPAWN_CHANCE;
use crate::game::events::{EventBuffer, GameEvent, RemovalReason};
use crate::game::state::{Fighter, Pickup};

/// Roll the per-tick spawn chance. Returns the side to spawn from.
pub fn roll_spawn<R: Rng + ?Sized>(rng: &mut R) -> Option<bool> {
    if rng.gen_bool(SPAWN_CHANCE) {
        Some(rng.gen_bool(0.5))
    } else {
        None
    }
}

/// Place a new pickup unless one is already live
pub fn spawn(slot: &mut Option<Pickup>, from_right: bool, events: &mut EventBuffer) -> bool {
    if slot.is_some() {
        return false;
    }
    *slot = Some(Pickup::spawn(from_right));
    events.push(GameEvent::MouseSpawned { from_right });
    true
}

/// Move the live pickup one tick, dropping it once off-bounds.
/// Returns true if it was removed.
pub fn advance(slot: &mut Option<Pickup>, events: &mut EventBuffer) -> bool {
    let Some(pickup) = slot.as_mut() else {
        return false;
    };
    if pickup.advance() {
        remove(slot, RemovalReason::Offscreen, events);
        return true;
    }
    false
}

/// Drop the live pickup; emits `MouseRemoved` only if one was live
pub fn remove(slot: &mut Option<Pickup>, reason: RemovalReason, events: &mut EventBuffer) {
    if slot.take().is_some() {
        events.push(GameEvent::MouseRemoved { reason });
    }
}

/// Whether the live pickup touches `fighter` and the fighter can eat it
pub fn reachable_by(slot: &Option<Pickup>, fighter: &Fighter) -> bool {
    match slot {
        Some(pickup) => !fighter.dead && !fighter.is_eating() && pickup.touches(fighter),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::Slot;
    use crate::util::vec2::Vec2;
    use rand::rngs::mock::StepRng;

    #[test]
    fn test_roll_spawn() {
        assert_eq!(roll_spawn(&mut StepRng::new(u64::MAX, 0)), None);
        // Always-true source spawns from the right
        assert_eq!(roll_spawn(&mut StepRng::new(0, 0)), Some(true));
    }

    #[test]
    fn test_spawn_only_one() {
        let mut slot = None;
        let mut events = EventBuffer::new();
        assert!(spawn(&mut slot, false, &mut events));
        assert!(!spawn(&mut slot, true, &mut events));
        assert_eq!(events.len(), 1);
        assert_eq!(slot.as_ref().map(|p| p.position.x), Some(-20.0));
    }

    #[test]
    fn test_offscreen_removed_once() {
        let mut slot = None;
        let mut events = EventBuffer::new();
        spawn(&mut slot, true, &mut events);

        let mut removed = 0;
        for _ in 0..1000 {
            if advance(&mut slot, &mut events) {
                removed += 1;
            }
        }
        assert_eq!(removed, 1);
        assert!(slot.is_none());
        let notices = events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    GameEvent::MouseRemoved {
                        reason: RemovalReason::Offscreen
                    }
                )
            })
            .count();
        assert_eq!(notices, 1);
    }

    #[test]
    fn test_reachable_by() {
        let mut slot = Some(Pickup::spawn(false));
        let mut f = Fighter::new(Slot::P1);
        assert!(!reachable_by(&slot, &f));

        if let Some(p) = slot.as_mut() {
            p.position = Vec2::new(f.position.x + 5.0, 420.0);
        }
        assert!(reachable_by(&slot, &f));

        f.eating = 10;
        assert!(!reachable_by(&slot, &f));
        assert!(!reachable_by(&None, &f));
    }
}
