use serde::{Deserialize, Serialize};

use crate::game::constants::{attack, fighter as fc, pickup};
use crate::game::events::{EventBuffer, GameEvent};
use crate::game::input::FighterInput;
use crate::game::state::{AnimCode, Facing, Fighter};
use crate::game::systems::physics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackKind {
    Light,
    Heavy,
}

/// Damage, reach and cooldown of one attack
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackSpec {
    pub damage: i32,
    pub reach: f32,
    pub cooldown: u32,
}

impl AttackKind {
    pub fn spec(self) -> AttackSpec {
        match self {
            AttackKind::Light => AttackSpec {
                damage: attack::LIGHT_DAMAGE,
                reach: attack::LIGHT_REACH,
                cooldown: attack::LIGHT_COOLDOWN,
            },
            AttackKind::Heavy => AttackSpec {
                damage: attack::HEAVY_DAMAGE,
                reach: attack::HEAVY_REACH,
                cooldown: attack::HEAVY_COOLDOWN,
            },
        }
    }
}

/// Start a swing and resolve it against `target` in the same tick.
/// Returns true if the swing connected.
pub fn perform_attack(
    attacker: &mut Fighter,
    target: &mut Fighter,
    kind: AttackKind,
    events: &mut EventBuffer,
) -> bool {
    let spec = kind.spec();
    attacker.anim = AnimCode::Attack;
    attacker.anim_timer = attack::LOCK_TICKS;
    attacker.attack_cooldown = spec.cooldown;
    events.push(GameEvent::AttackStarted {
        fighter: attacker.slot,
        kind,
    });

    if target.dead || !attacker.hitbox(spec.reach).overlaps(&target.hurtbox()) {
        return false;
    }

    target.hurt_timer = fc::HURT_TICKS;
    target.anim = AnimCode::Hurt;
    target.position.x += attacker.facing.sign() * fc::KNOCKBACK;
    let killed = target.take_damage(spec.damage);

    events.push(GameEvent::HitLanded {
        attacker: attacker.slot,
        target: target.slot,
        kind,
        damage: spec.damage,
        target_health: target.health,
        target_dead: target.dead,
    });
    if killed {
        events.push(GameEvent::Died {
            fighter: target.slot,
        });
    }
    true
}

/// Start a jump if grounded
pub fn jump(fighter: &mut Fighter, events: &mut EventBuffer) -> bool {
    if !fighter.on_ground {
        return false;
    }
    fighter.velocity.y = fc::JUMP_VELOCITY;
    fighter.anim = AnimCode::Jump;
    fighter.anim_timer = fc::JUMP_ANIM_TICKS;
    events.push(GameEvent::JumpStarted {
        fighter: fighter.slot,
    });
    true
}

/// Horizontal step for this tick
pub fn step(fighter: &mut Fighter, dx: f32) {
    fighter.velocity.x = dx;
    fighter.position.x += dx;
}

/// Terminal check; emits `Died` on the transition tick
pub fn check_terminal(fighter: &mut Fighter, events: &mut EventBuffer) -> bool {
    if fighter.check_terminal() {
        events.push(GameEvent::Died {
            fighter: fighter.slot,
        });
    }
    fighter.dead
}

/// Advance the eating lock by one tick. Applies the pending heal when the
/// lock runs out. A fighter that died mid-meal loses the heal.
pub fn advance_eating(fighter: &mut Fighter, events: &mut EventBuffer) {
    if fighter.eating == 0 {
        return;
    }
    if fighter.dead {
        fighter.eating = 0;
        fighter.pending_heal = 0;
        fighter.anim = AnimCode::Dead;
        return;
    }

    fighter.anim = if fighter.eating > pickup::EAT_TICKS / 2 {
        AnimCode::EatingStart
    } else {
        AnimCode::EatingEnd
    };
    fighter.eating -= 1;

    if fighter.eating == 0 && fighter.pending_heal > 0 {
        fighter.set_health(fighter.health + fighter.pending_heal);
        fighter.pending_heal = 0;
        events.push(GameEvent::Healed {
            fighter: fighter.slot,
            health: fighter.health,
        });
    }
}

/// Start eating a pickup. Returns the heal that will be applied when the
/// lock ends, or `None` if the fighter cannot eat right now.
pub fn eat_pickup(fighter: &mut Fighter, events: &mut EventBuffer) -> Option<i32> {
    if fighter.dead || fighter.is_eating() {
        return None;
    }
    let heal_amount = (fc::MAX_HEALTH - fighter.health) / 2;
    fighter.eating = pickup::EAT_TICKS;
    fighter.pending_heal = heal_amount;
    events.push(GameEvent::MouseEaten {
        fighter: fighter.slot,
        heal_amount,
    });
    Some(heal_amount)
}

/// Decrement the animation lock, or fall back to idle once it has run out
pub(crate) fn tick_animation(fighter: &mut Fighter) {
    if fighter.anim_timer > 0 {
        fighter.anim_timer -= 1;
    } else if fighter.hurt_timer == 0 && !fighter.winner {
        fighter.anim = AnimCode::Idle;
    }
}

/// Apply buttons: left then right, jump, then light before heavy
fn apply_input(
    fighter: &mut Fighter,
    opponent: &mut Fighter,
    input: &FighterInput,
    events: &mut EventBuffer,
) {
    let mut dx = 0.0;
    if input.left {
        dx = -fc::MOVE_SPEED;
        fighter.facing = Facing::Left;
    }
    if input.right {
        dx = fc::MOVE_SPEED;
        fighter.facing = Facing::Right;
    }
    if input.jump {
        jump(fighter, events);
    }
    step(fighter, dx);

    if fighter.attack_cooldown == 0 {
        if input.light {
            perform_attack(fighter, opponent, AttackKind::Light, events);
        } else if input.heavy {
            perform_attack(fighter, opponent, AttackKind::Heavy, events);
        }
    }
}

/// Full tick for an input-driven fighter
pub fn update_controlled(
    fighter: &mut Fighter,
    opponent: &mut Fighter,
    input: &FighterInput,
    events: &mut EventBuffer,
) {
    if fighter.is_eating() {
        advance_eating(fighter, events);
        return;
    }
    if fighter.dead || check_terminal(fighter, events) {
        return;
    }

    fighter.attack_cooldown = fighter.attack_cooldown.saturating_sub(1);
    fighter.hurt_timer = fighter.hurt_timer.saturating_sub(1);
    tick_animation(fighter);

    if !fighter.winner {
        apply_input(fighter, opponent, input, events);
    }
    physics::update(fighter);
    check_terminal(fighter, events);
}
