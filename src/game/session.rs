//! Match session and fixed-step tick
//!
//! A session owns both fighters and the pickup. `tick` advances the whole
//! match by one step; in online play only the locally owned fighter is
//! driven, the other one is left to inbound snapshots.

use rand::Rng;
use tracing::debug;

use crate::game::events::{EventBuffer, RemovalReason};
use crate::game::input::Controls;
use crate::game::match_result::{self, MatchResult};
use crate::game::state::{Fighter, GameMode, Pickup, Slot};
use crate::game::systems::{ai, combat, physics, pickup};
use crate::net::protocol::{Role, RoomCode};

/// What happened during one tick
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Tick number after advancing; zero if nothing ran
    pub tick: u64,
    pub events: EventBuffer,
}

#[derive(Debug, Clone)]
pub struct Session {
    mode: GameMode,
    fighters: [Fighter; 2],
    pickup: Option<Pickup>,
    tick: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// New session sitting in the menu
    pub fn new() -> Self {
        Self {
            mode: GameMode::Menu,
            fighters: [Fighter::new(Slot::P1), Fighter::new(Slot::P2)],
            pickup: None,
            tick: 0,
        }
    }

    pub fn start_local_single(&mut self) {
        self.enter(GameMode::LocalSingle);
    }

    pub fn start_local_two_player(&mut self) {
        self.enter(GameMode::LocalTwoPlayer);
    }

    pub fn start_online(&mut self, role: Role, room_code: RoomCode) {
        self.enter(GameMode::Online { role, room_code });
    }

    /// Back to the menu
    pub fn restart(&mut self) {
        self.enter(GameMode::Menu);
    }

    /// The link to the peer is gone; drop the match
    pub fn terminate(&mut self) {
        if self.is_running() {
            debug!(mode = ?self.mode, tick = self.tick, "Session terminated");
        }
        self.enter(GameMode::Menu);
    }

    fn enter(&mut self, mode: GameMode) {
        debug!(?mode, "Entering game mode");
        self.fighters = [Fighter::new(Slot::P1), Fighter::new(Slot::P2)];
        self.pickup = None;
        self.tick = 0;
        self.mode = mode;
    }

    pub fn mode(&self) -> &GameMode {
        &self.mode
    }

    pub fn is_running(&self) -> bool {
        self.mode != GameMode::Menu
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn fighter(&self, slot: Slot) -> &Fighter {
        &self.fighters[slot.index()]
    }

    pub fn fighter_mut(&mut self, slot: Slot) -> &mut Fighter {
        &mut self.fighters[slot.index()]
    }

    pub fn fighters(&self) -> &[Fighter; 2] {
        &self.fighters
    }

    pub fn pickup(&self) -> Option<&Pickup> {
        self.pickup.as_ref()
    }

    /// Live pickup slot, for mirroring a remote hazard
    pub fn pickup_mut(&mut self) -> &mut Option<Pickup> {
        &mut self.pickup
    }

    /// Fighter driven by this machine in online play
    pub fn local_slot(&self) -> Option<Slot> {
        self.mode.role().map(Role::slot)
    }

    /// Fighter driven by the remote peer in online play
    pub fn mirrored_slot(&self) -> Option<Slot> {
        self.local_slot().map(Slot::other)
    }

    pub fn result(&self) -> Option<MatchResult> {
        match_result::determine_result(&self.fighters)
    }

    fn anyone_eating(&self) -> bool {
        self.fighters.iter().any(Fighter::is_eating)
    }

    fn anyone_won(&self) -> bool {
        self.fighters.iter().any(|f| f.winner)
    }

    /// Mutable access to both fighters, `first` then the other one
    fn pair_mut(&mut self, first: Slot) -> (&mut Fighter, &mut Fighter) {
        let [p1, p2] = &mut self.fighters;
        match first {
            Slot::P1 => (p1, p2),
            Slot::P2 => (p2, p1),
        }
    }

    /// Advance the match by one fixed step
    pub fn tick<R: Rng + ?Sized>(&mut self, controls: &Controls, rng: &mut R) -> TickReport {
        let mut events = EventBuffer::new();
        if !self.is_running() {
            return TickReport { tick: 0, events };
        }
        self.tick += 1;

        if self.anyone_eating() {
            // Everybody else is frozen while a meal is in progress
            for fighter in self.fighters.iter_mut().filter(|f| f.is_eating()) {
                combat::advance_eating(fighter, &mut events);
            }
        } else {
            self.update_fighters(controls, rng, &mut events);
        }

        match_result::resolve_winner(&mut self.fighters, &mut self.pickup, &mut events);
        self.update_hazard(rng, &mut events);

        for fighter in self.fighters.iter_mut() {
            fighter.clamp_to_arena();
        }

        TickReport {
            tick: self.tick,
            events,
        }
    }

    fn update_fighters<R: Rng + ?Sized>(
        &mut self,
        controls: &Controls,
        rng: &mut R,
        events: &mut EventBuffer,
    ) {
        match self.mode.clone() {
            GameMode::Menu => {}
            GameMode::LocalSingle => {
                let (p1, p2) = self.pair_mut(Slot::P1);
                combat::update_controlled(p1, p2, &controls.p1, events);
                ai::control(p2, p1, rng, events);
                physics::update(p2);
            }
            GameMode::LocalTwoPlayer => {
                let (p1, p2) = self.pair_mut(Slot::P1);
                combat::update_controlled(p1, p2, &controls.p1, events);
                combat::update_controlled(p2, p1, &controls.p2, events);
            }
            GameMode::Online { role, .. } => {
                let input = match role.slot() {
                    Slot::P1 => controls.p1,
                    Slot::P2 => controls.p2,
                };
                let (local, mirrored) = self.pair_mut(role.slot());
                combat::update_controlled(local, mirrored, &input, events);
                physics::update(mirrored);
            }
        }
    }

    fn update_hazard<R: Rng + ?Sized>(&mut self, rng: &mut R, events: &mut EventBuffer) {
        let may_spawn = match self.mode.role() {
            Some(role) => role == Role::Host,
            None => true,
        };
        if may_spawn && self.pickup.is_none() && !self.anyone_eating() && !self.anyone_won() {
            if let Some(from_right) = pickup::roll_spawn(rng) {
                pickup::spawn(&mut self.pickup, from_right, events);
            }
        }

        if pickup::advance(&mut self.pickup, events) {
            return;
        }

        for slot in self.consumption_order() {
            let fighter = &mut self.fighters[slot.index()];
            if pickup::reachable_by(&self.pickup, fighter) {
                combat::eat_pickup(fighter, events);
                pickup::remove(&mut self.pickup, RemovalReason::Eaten, events);
                break;
            }
        }
    }

    /// Which fighters may pick up the hazard this tick, in priority order.
    /// Online, only the host decides for the mirrored fighter.
    fn consumption_order(&self) -> Vec<Slot> {
        match self.mode.role() {
            Some(Role::Host) => vec![Slot::P1, Slot::P2],
            Some(Role::Guest) => vec![Slot::P2],
            None => vec![Slot::P1, Slot::P2],
        }
    }
}
