//! Game state definitions and structures
//!
//! Contains the two fighters, the mouse pickup, and the session mode.

use serde::{Deserialize, Serialize};

use crate::game::constants::{attack, fighter, physics, pickup};
use crate::net::protocol::{Role, RoomCode};
use crate::util::vec2::{Rect, Vec2};

/// Which of the two fighters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    P1,
    P2,
}

impl Slot {
    pub fn other(self) -> Slot {
        match self {
            Slot::P1 => Slot::P2,
            Slot::P2 => Slot::P1,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Slot::P1 => 0,
            Slot::P2 => 1,
        }
    }
}

/// Horizontal facing; the sign is used for hitbox and knockback offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }

    pub fn flipped(self) -> Facing {
        match self {
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }

    /// Facing that points along `dx`; zero counts as right
    pub fn toward(dx: f32) -> Facing {
        if dx < 0.0 {
            Facing::Left
        } else {
            Facing::Right
        }
    }
}

/// Discrete animation state. Discriminants are the sprite-sheet frame indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum AnimCode {
    Idle = 0,
    Attack = 1,
    Jump = 2,
    Hurt = 3,
    Dead = 4,
    Victory = 5,
    /// Pickup sprite, never used by a fighter
    Mouse = 6,
    EatingStart = 7,
    EatingEnd = 8,
}

/// A combatant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fighter {
    pub slot: Slot,
    /// Top-left corner of the hurtbox
    pub position: Vec2,
    /// `x` is the last horizontal step, `y` the integrated vertical velocity
    pub velocity: Vec2,
    pub health: i32,
    pub facing: Facing,
    pub anim: AnimCode,
    pub on_ground: bool,
    pub attack_cooldown: u32,
    /// Remaining ticks before the animation may fall back to idle
    pub anim_timer: u32,
    pub hurt_timer: u32,
    /// Remaining eating lock; nonzero means the fighter cannot act
    pub eating: u32,
    pub pending_heal: i32,
    pub dead: bool,
    pub winner: bool,
}

impl Fighter {
    /// Fresh fighter at its slot's spawn point
    pub fn new(slot: Slot) -> Self {
        let (position, facing) = match slot {
            Slot::P1 => (fighter::P1_SPAWN, Facing::Right),
            Slot::P2 => (fighter::P2_SPAWN, Facing::Left),
        };
        Self {
            slot,
            position,
            velocity: Vec2::ZERO,
            health: fighter::MAX_HEALTH,
            facing,
            anim: AnimCode::Idle,
            on_ground: false,
            attack_cooldown: 0,
            anim_timer: 0,
            hurt_timer: 0,
            eating: 0,
            pending_heal: 0,
            dead: false,
            winner: false,
        }
    }

    pub fn hurtbox(&self) -> Rect {
        Rect::at(self.position, fighter::WIDTH, fighter::HEIGHT)
    }

    /// Hitbox of a swing with the given reach, in front of the fighter
    pub fn hitbox(&self, reach: f32) -> Rect {
        Rect::new(
            self.position.x + self.facing.sign() * reach / 2.0 - reach / 2.0,
            self.position.y + attack::HITBOX_Y_OFFSET,
            reach,
            attack::HITBOX_HEIGHT,
        )
    }

    #[inline]
    pub fn is_eating(&self) -> bool {
        self.eating > 0
    }

    /// Set health, clamped to the valid range
    pub fn set_health(&mut self, health: i32) {
        self.health = health.clamp(0, fighter::MAX_HEALTH);
    }

    /// Transition to dead if health is exhausted.
    /// Returns true only on the tick the transition happens.
    pub fn check_terminal(&mut self) -> bool {
        if self.dead || self.health > 0 {
            return false;
        }
        self.health = 0;
        self.mark_dead();
        true
    }

    /// Set the terminal dead state; never cleared until a session reset
    pub fn mark_dead(&mut self) {
        self.dead = true;
        self.anim = AnimCode::Dead;
    }

    /// Apply damage, clamping at zero. Returns true if this killed the fighter.
    pub fn take_damage(&mut self, damage: i32) -> bool {
        self.set_health(self.health - damage);
        self.check_terminal()
    }

    /// Keep the hurtbox inside the arena horizontally
    pub fn clamp_to_arena(&mut self) {
        self.position.x = self
            .position
            .x
            .clamp(0.0, physics::ARENA_WIDTH - fighter::WIDTH);
    }
}

/// The mouse pickup. At most one is live per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pickup {
    pub position: Vec2,
    /// Direction of travel
    pub direction: Facing,
}

impl Pickup {
    /// Spawn just off one edge, running toward the other
    pub fn spawn(from_right: bool) -> Self {
        let (x, direction) = if from_right {
            (physics::ARENA_WIDTH + pickup::EDGE_MARGIN, Facing::Left)
        } else {
            (-pickup::EDGE_MARGIN, Facing::Right)
        };
        Self {
            position: Vec2::new(x, physics::GROUND_Y - pickup::SIZE),
            direction,
        }
    }

    pub fn hitbox(&self) -> Rect {
        Rect::at(self.position, pickup::SIZE, pickup::SIZE)
    }

    /// Move one tick. Returns true once the pickup has left the arena.
    pub fn advance(&mut self) -> bool {
        self.position.x += self.direction.sign() * pickup::SPEED;
        self.is_off_bounds()
    }

    pub fn is_off_bounds(&self) -> bool {
        self.position.x + pickup::SIZE < -pickup::EDGE_MARGIN
            || self.position.x > physics::ARENA_WIDTH + pickup::EDGE_MARGIN
    }

    pub fn touches(&self, fighter: &Fighter) -> bool {
        self.hitbox().overlaps(&fighter.hurtbox())
    }
}

/// Session game mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameMode {
    /// No match running
    Menu,
    /// Player one against the AI
    LocalSingle,
    /// Two players on one keyboard
    LocalTwoPlayer,
    /// Networked match; `role` decides which fighter is locally owned
    Online { role: Role, room_code: RoomCode },
}

impl GameMode {
    /// Role in an online match
    pub fn role(&self) -> Option<Role> {
        match self {
            GameMode::Online { role, .. } => Some(*role),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fighter_spawns() {
        let p1 = Fighter::new(Slot::P1);
        let p2 = Fighter::new(Slot::P2);
        assert_eq!(p1.position, fighter::P1_SPAWN);
        assert_eq!(p1.facing, Facing::Right);
        assert_eq!(p2.position, fighter::P2_SPAWN);
        assert_eq!(p2.facing, Facing::Left);
        assert_eq!(p1.health, 200);
        assert!(!p1.dead && !p1.winner);
    }

    #[test]
    fn test_take_damage_clamps_and_kills() {
        let mut f = Fighter::new(Slot::P1);
        assert!(!f.take_damage(10));
        assert_eq!(f.health, 190);

        f.health = 5;
        assert!(f.take_damage(25));
        assert_eq!(f.health, 0);
        assert!(f.dead);
        assert_eq!(f.anim, AnimCode::Dead);

        // Already dead: no second transition
        assert!(!f.take_damage(25));
        assert_eq!(f.health, 0);
    }

    #[test]
    fn test_set_health_clamps() {
        let mut f = Fighter::new(Slot::P1);
        f.set_health(500);
        assert_eq!(f.health, 200);
        f.set_health(-3);
        assert_eq!(f.health, 0);
    }

    #[test]
    fn test_hitbox_in_front() {
        let mut f = Fighter::new(Slot::P1);
        f.position = Vec2::new(100.0, 300.0);

        f.facing = Facing::Right;
        let hb = f.hitbox(50.0);
        assert_eq!(hb, Rect::new(100.0, 320.0, 50.0, 40.0));

        f.facing = Facing::Left;
        let hb = f.hitbox(50.0);
        assert_eq!(hb, Rect::new(50.0, 320.0, 50.0, 40.0));
    }

    #[test]
    fn test_clamp_to_arena() {
        let mut f = Fighter::new(Slot::P1);
        f.position.x = -40.0;
        f.clamp_to_arena();
        assert_eq!(f.position.x, 0.0);
        f.position.x = 10_000.0;
        f.clamp_to_arena();
        assert_eq!(f.position.x, 870.0);
    }

    #[test]
    fn test_pickup_spawn_sides() {
        let left = Pickup::spawn(false);
        assert_eq!(left.position.x, -20.0);
        assert_eq!(left.direction, Facing::Right);
        assert_eq!(left.position.y, 420.0);

        let right = Pickup::spawn(true);
        assert_eq!(right.position.x, 920.0);
        assert_eq!(right.direction, Facing::Left);
    }

    #[test]
    fn test_pickup_leaves_left_edge() {
        let mut p = Pickup::spawn(true);
        let mut ticks = 0;
        while !p.advance() {
            ticks += 1;
            assert!(ticks < 1000, "pickup never left the arena");
        }
        assert!(p.position.x + pickup::SIZE < -pickup::EDGE_MARGIN);
    }

    #[test]
    fn test_slot_other() {
        assert_eq!(Slot::P1.other(), Slot::P2);
        assert_eq!(Slot::P2.other().index(), 0);
    }

    #[test]
    fn test_facing_helpers() {
        assert_eq!(Facing::toward(-3.0), Facing::Left);
        assert_eq!(Facing::toward(3.0), Facing::Right);
        assert_eq!(Facing::Left.flipped(), Facing::Right);
        assert_eq!(Facing::Left.sign(), -1.0);
    }
}
