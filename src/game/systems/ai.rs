use rand::Rng;

use crate::game::constants::ai::*;
use crate::game::constants::fighter::MOVE_SPEED;
use crate::game::events::EventBuffer;
use crate::game::state::{Facing, Fighter};
use crate::game::systems::combat::{self, AttackKind};

/// Preferred horizontal distance to the target
pub fn optimal_distance(health: i32) -> f32 {
    if health > WOUNDED_HEALTH {
        OPTIMAL_DISTANCE
    } else {
        WOUNDED_DISTANCE
    }
}

/// One AI decision for `fighter` against `target`.
/// Physics is not applied here; the caller integrates afterwards.
pub fn control<R: Rng + ?Sized>(
    fighter: &mut Fighter,
    target: &mut Fighter,
    rng: &mut R,
    events: &mut EventBuffer,
) {
    if fighter.dead || fighter.winner {
        return;
    }
    if combat::check_terminal(fighter, events) {
        return;
    }

    let dist_x = target.position.x - fighter.position.x;
    let dist_y = target.position.y - fighter.position.y;

    combat::tick_animation(fighter);

    if rng.gen_bool(REACTION_CHANCE) {
        let optimal = optimal_distance(fighter.health);
        let toward = Facing::toward(dist_x);

        let dx = if dist_x.abs() > optimal {
            fighter.facing = toward;
            toward.sign() * MOVE_SPEED
        } else if dist_x.abs() < optimal - RETREAT_BAND {
            fighter.facing = toward.flipped();
            toward.flipped().sign() * MOVE_SPEED
        } else {
            0.0
        };
        combat::step(fighter, dx);

        if fighter.on_ground && dist_y < -JUMP_THRESHOLD {
            combat::jump(fighter, events);
        }

        if fighter.attack_cooldown == 0 && dist_x.abs() < ATTACK_RANGE {
            let kind = if rng.gen_bool(HEAVY_CHANCE) {
                AttackKind::Heavy
            } else {
                AttackKind::Light
            };
            combat::perform_attack(fighter, target, kind, events);
        }
    } else {
        combat::step(fighter, 0.0);
    }

    fighter.attack_cooldown = fighter.attack_cooldown.saturating_sub(1);
    fighter.hurt_timer = fighter.hurt_timer.saturating_sub(1);
}
