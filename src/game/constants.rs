/// Arena and integration constants. All timers count fixed ticks, not seconds.
pub mod physics {
    /// Simulation tick rate in Hz
    pub const TICK_RATE: u32 = 60;
    /// Tick duration in milliseconds
    pub const TICK_DURATION_MS: u64 = 1000 / TICK_RATE as u64;
    /// Downward acceleration added to vertical velocity every tick
    pub const GRAVITY: f32 = 0.8;
    /// Arena width
    pub const ARENA_WIDTH: f32 = 900.0;
    /// Surface of the ground platform
    pub const GROUND_Y: f32 = 440.0;
    /// How far below a platform surface the previous foot position may be
    /// and still count as landing from above
    pub const LANDING_TOLERANCE: f32 = 5.0;
}

/// Fighter body and movement constants
pub mod fighter {
    use crate::util::vec2::Vec2;

    pub const MAX_HEALTH: i32 = 200;
    /// Hurtbox width
    pub const WIDTH: f32 = 30.0;
    /// Hurtbox height
    pub const HEIGHT: f32 = 80.0;
    /// Horizontal step per tick while a direction is held
    pub const MOVE_SPEED: f32 = 5.0;
    /// Vertical velocity applied on jump (negative is up)
    pub const JUMP_VELOCITY: f32 = -15.0;
    /// Animation lock after a jump
    pub const JUMP_ANIM_TICKS: u32 = 15;
    /// Hurt stun after being hit
    pub const HURT_TICKS: u32 = 18;
    /// Displacement applied to a fighter that gets hit
    pub const KNOCKBACK: f32 = 10.0;

    /// Player one spawn (top-left of hurtbox)
    pub const P1_SPAWN: Vec2 = Vec2::new(150.0, super::physics::GROUND_Y - HEIGHT);
    /// Player two spawn (top-left of hurtbox)
    pub const P2_SPAWN: Vec2 = Vec2::new(
        super::physics::ARENA_WIDTH - 180.0,
        super::physics::GROUND_Y - HEIGHT,
    );
}

/// Attack tuning
pub mod attack {
    /// Vertical offset of the hitbox from the attacker's top edge
    pub const HITBOX_Y_OFFSET: f32 = 20.0;
    /// Hitbox height
    pub const HITBOX_HEIGHT: f32 = 40.0;
    /// Attack animation lock, shared by both attacks
    pub const LOCK_TICKS: u32 = 7;

    pub const LIGHT_DAMAGE: i32 = 10;
    pub const LIGHT_REACH: f32 = 50.0;
    pub const LIGHT_COOLDOWN: u32 = 15;

    pub const HEAVY_DAMAGE: i32 = 25;
    pub const HEAVY_REACH: f32 = 40.0;
    pub const HEAVY_COOLDOWN: u32 = 35;
}

/// Mouse pickup constants
pub mod pickup {
    /// Horizontal speed per tick
    pub const SPEED: f32 = 3.0;
    /// Pickup box side length
    pub const SIZE: f32 = 20.0;
    /// Spawn offset beyond the arena edge, and despawn margin
    pub const EDGE_MARGIN: f32 = 20.0;
    /// Per-tick spawn probability while the arena is quiet
    pub const SPAWN_CHANCE: f64 = 0.001;
    /// Length of the eating lock
    pub const EAT_TICKS: u32 = 60;
}

/// AI opponent constants
pub mod ai {
    /// Probability that the AI acts on a given tick
    pub const REACTION_CHANCE: f64 = 0.7;
    /// Preferred horizontal distance while healthy
    pub const OPTIMAL_DISTANCE: f32 = 60.0;
    /// Preferred horizontal distance once wounded
    pub const WOUNDED_DISTANCE: f32 = 100.0;
    /// At or below this health the AI keeps more distance
    pub const WOUNDED_HEALTH: i32 = 50;
    /// Width of the "in range" band below the preferred distance
    pub const RETREAT_BAND: f32 = 30.0;
    /// Jump when the target is this far above
    pub const JUMP_THRESHOLD: f32 = 40.0;
    /// Horizontal range inside which the AI swings
    pub const ATTACK_RANGE: f32 = 80.0;
    /// Probability of choosing the heavy attack
    pub const HEAVY_CHANCE: f64 = 0.6;
}

/// Networking constants
pub mod net {
    /// Maximum framed message size
    pub const MAX_MESSAGE_SIZE: usize = 65536;
    /// Minimum interval between outbound snapshots: one per tick
    pub const SNAPSHOT_INTERVAL_MS: u64 = super::physics::TICK_DURATION_MS;
    /// Room code length
    pub const ROOM_CODE_LEN: usize = 6;
    /// Room code alphabet
    pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    /// Attempts at generating a fresh room code before giving up
    pub const ROOM_CODE_ATTEMPTS: usize = 8;
    /// Connections silent for longer than this are dropped
    pub const IDLE_TIMEOUT_SECS: u64 = 60;
    /// How often the relay looks for idle connections
    pub const IDLE_SWEEP_SECS: u64 = 10;
}

/// Static level geometry
pub mod level {
    use super::physics::{ARENA_WIDTH, GROUND_Y};
    use crate::util::vec2::Rect;

    /// One-sided platforms, ground first
    pub const PLATFORMS: [Rect; 6] = [
        Rect::new(0.0, GROUND_Y, ARENA_WIDTH, 20.0),
        Rect::new(150.0, 380.0, 120.0, 20.0),
        Rect::new(400.0, 320.0, 120.0, 20.0),
        Rect::new(650.0, 260.0, 120.0, 20.0),
        Rect::new(250.0, 200.0, 120.0, 20.0),
        Rect::new(550.0, 140.0, 120.0, 20.0),
    ];
}
