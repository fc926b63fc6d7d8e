//! Peer-to-peer state sync for online matches
//!
//! Each peer simulates only the fighter it owns and mirrors the other one.
//! Pose travels in throttled `GameUpdate` snapshots. Health never does:
//! the peer that lands a hit reports the victim's new health with
//! `OpponentHealthUpdate`, and a peer that heals reports it with
//! `MyHealthUpdate`. Lost messages are not recovered, so the transport must
//! be reliable and ordered.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::game::events::GameEvent;
use crate::game::session::{Session, TickReport};
use crate::game::state::{Pickup, Slot};
use crate::net::protocol::{
    ClientMessage, FighterSnapshot, PeerMessage, Role, RoomCode, RoomCodeError, RoomErrorReason,
    ServerMessage,
};

/// Errors surfaced to the player. None of them is retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Room not found")]
    RoomNotFound,
    #[error("Room is full")]
    RoomFull,
    #[error("Failed to connect to server")]
    ConnectionFailed,
    #[error("Other player disconnected")]
    PeerDisconnected,
    #[error("Invalid room code: {0}")]
    InvalidRoomCode(#[from] RoomCodeError),
}

impl From<RoomErrorReason> for SessionError {
    fn from(reason: RoomErrorReason) -> Self {
        match reason {
            RoomErrorReason::NotFound => SessionError::RoomNotFound,
            RoomErrorReason::Full => SessionError::RoomFull,
            RoomErrorReason::Unavailable => SessionError::ConnectionFailed,
        }
    }
}

/// Rate limiter for outbound snapshots, driven by the caller's clock.
/// The first call always passes; later calls pass once `interval` has
/// elapsed since the last one that passed.
#[derive(Debug, Clone)]
pub struct SendThrottle {
    interval: Duration,
    last_sent: Option<Duration>,
}

impl SendThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_sent: None,
        }
    }

    pub fn ready(&mut self, now: Duration) -> bool {
        match self.last_sent {
            Some(last) if now.saturating_sub(last) < self.interval => false,
            _ => {
                self.last_sent = Some(now);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last_sent = None;
    }
}

/// Outbound/inbound merge rules for one side of an online match
#[derive(Debug, Clone)]
pub struct PeerSync {
    role: Role,
    throttle: SendThrottle,
}

impl PeerSync {
    pub fn new(role: Role, config: &SyncConfig) -> Self {
        Self {
            role,
            throttle: SendThrottle::new(config.snapshot_interval),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    fn local(&self) -> Slot {
        self.role.slot()
    }

    fn mirrored(&self) -> Slot {
        self.role.slot().other()
    }

    fn is_host(&self) -> bool {
        self.role == Role::Host
    }

    /// Messages to send after a tick. Health and hazard notices go out
    /// immediately; the pose snapshot only when the throttle allows.
    pub fn outbound(
        &mut self,
        session: &Session,
        report: &TickReport,
        now: Duration,
    ) -> Vec<PeerMessage> {
        let mut out = Vec::new();
        if session.local_slot() != Some(self.local()) {
            return out;
        }

        for event in &report.events {
            match *event {
                GameEvent::HitLanded {
                    attacker,
                    target_health,
                    target_dead,
                    ..
                } if attacker == self.local() => {
                    out.push(PeerMessage::OpponentHealthUpdate {
                        health: target_health,
                        dead: target_dead,
                    });
                }
                GameEvent::Healed { fighter, health } if fighter == self.local() => {
                    out.push(PeerMessage::MyHealthUpdate {
                        health,
                        dead: session.fighter(fighter).dead,
                    });
                }
                GameEvent::MouseSpawned { from_right } if self.is_host() => {
                    out.push(PeerMessage::MouseSpawned { from_right });
                }
                GameEvent::MouseEaten { fighter, .. } if fighter == self.local() => {
                    out.push(PeerMessage::MouseEaten {
                        eater_role: self.role,
                    });
                }
                GameEvent::MouseRemoved { .. } if self.is_host() => {
                    out.push(PeerMessage::MouseRemoved);
                }
                _ => {}
            }
        }

        if self.throttle.ready(now) {
            out.push(PeerMessage::GameUpdate(FighterSnapshot::from_fighter(
                session.fighter(self.local()),
            )));
        }

        if self.is_host() {
            if let Some(pickup) = session.pickup() {
                out.push(PeerMessage::MouseUpdate {
                    x: pickup.position.x,
                    y: pickup.position.y,
                });
            }
        }

        out
    }

    /// Merge one inbound peer message into the local session
    pub fn apply(&mut self, session: &mut Session, message: PeerMessage) {
        if session.local_slot() != Some(self.local()) {
            debug!(?message, "Dropping peer message outside an online match");
            return;
        }

        match message {
            PeerMessage::GameUpdate(snapshot) => self.apply_snapshot(session, &snapshot),
            PeerMessage::OpponentHealthUpdate { health, dead } => {
                let me = session.fighter_mut(self.local());
                debug!(role = %self.role, from = me.health, to = health, "Own health set by peer");
                me.set_health(health);
                if dead && !me.dead {
                    me.mark_dead();
                }
            }
            PeerMessage::MyHealthUpdate { health, dead } => {
                let opponent = session.fighter_mut(self.mirrored());
                debug!(
                    role = %self.role,
                    from = opponent.health,
                    to = health,
                    "Opponent health set by peer"
                );
                opponent.set_health(health);
                if dead && !opponent.dead {
                    opponent.mark_dead();
                }
            }
            PeerMessage::MouseSpawned { from_right } => {
                if !self.is_host() {
                    *session.pickup_mut() = Some(Pickup::spawn(from_right));
                }
            }
            PeerMessage::MouseUpdate { x, y } => {
                if !self.is_host() {
                    if let Some(pickup) = session.pickup_mut().as_mut() {
                        pickup.position.x = x;
                        pickup.position.y = y;
                    }
                }
            }
            PeerMessage::MouseRemoved => {
                if !self.is_host() {
                    *session.pickup_mut() = None;
                }
            }
            PeerMessage::MouseEaten { eater_role } => {
                debug!(role = %self.role, eater = %eater_role, "Peer ate the mouse");
                *session.pickup_mut() = None;
            }
        }
    }

    /// Overwrite the mirrored pose. Health is not part of a snapshot, and
    /// terminal flags only ever go from false to true.
    fn apply_snapshot(&self, session: &mut Session, snapshot: &FighterSnapshot) {
        let local_won = session.fighter(self.local()).winner;
        let opponent = session.fighter_mut(self.mirrored());

        opponent.position.x = snapshot.x;
        opponent.position.y = snapshot.y;
        opponent.anim = snapshot.anim;
        opponent.facing = snapshot.facing;
        opponent.eating = snapshot.eating;
        opponent.dead |= snapshot.dead;
        if snapshot.winner && !local_won {
            opponent.winner = true;
        }
    }
}

/// Where a client is in the room handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    /// Waiting for the registry to answer a create or join
    AwaitingRoom,
    /// Seated, waiting for the second player
    Waiting { role: Role, room_code: RoomCode },
    Playing { role: Role, room_code: RoomCode },
    Closed,
}

/// Client side of the registry conversation. Produces messages to send
/// and drives the session's online lifecycle from registry replies.
#[derive(Debug, Clone)]
pub struct PeerLink {
    state: LinkState,
    config: SyncConfig,
    sync: Option<PeerSync>,
}

impl PeerLink {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            state: LinkState::Idle,
            config,
            sync: None,
        }
    }

    pub fn state(&self) -> &LinkState {
        &self.state
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, LinkState::Playing { .. })
    }

    pub fn create_room(&mut self) -> ClientMessage {
        self.state = LinkState::AwaitingRoom;
        ClientMessage::CreateRoom
    }

    /// Validate a typed code before it is sent anywhere
    pub fn join_room(&mut self, input: &str) -> Result<ClientMessage, SessionError> {
        let code = RoomCode::parse(input)?;
        self.state = LinkState::AwaitingRoom;
        Ok(ClientMessage::JoinRoom {
            room_code: code.to_string(),
        })
    }

    /// Handle one registry message
    pub fn handle(
        &mut self,
        session: &mut Session,
        message: ServerMessage,
    ) -> Result<(), SessionError> {
        match message {
            ServerMessage::RoomCreated { room_code, role }
            | ServerMessage::RoomJoined { room_code, role } => {
                if self.state != LinkState::AwaitingRoom {
                    warn!(%room_code, "Unexpected room assignment in state {:?}", self.state);
                    return Ok(());
                }
                info!(%room_code, %role, "Seated in room");
                self.state = LinkState::Waiting { role, room_code };
            }
            ServerMessage::RoomError { reason } => {
                info!(%reason, "Room request refused");
                self.state = LinkState::Idle;
                return Err(reason.into());
            }
            ServerMessage::PlayerJoined => {
                info!("Opponent joined");
            }
            ServerMessage::GameStart => {
                let LinkState::Waiting { role, room_code } = self.state.clone() else {
                    warn!("GameStart in state {:?}", self.state);
                    return Ok(());
                };
                session.start_online(role, room_code);
                self.sync = Some(PeerSync::new(role, &self.config));
                self.state = LinkState::Playing { role, room_code };
            }
            ServerMessage::Peer(peer) => match (&self.state, self.sync.as_mut()) {
                (LinkState::Playing { .. }, Some(sync)) => sync.apply(session, peer),
                _ => debug!("Ignoring peer message while not playing"),
            },
            ServerMessage::PlayerDisconnected => {
                info!("Opponent disconnected");
                self.close(session);
                return Err(SessionError::PeerDisconnected);
            }
        }
        Ok(())
    }

    /// Outbound messages for a finished tick, wrapped for the registry
    pub fn outbound(
        &mut self,
        session: &Session,
        report: &TickReport,
        now: Duration,
    ) -> Vec<ClientMessage> {
        match (&self.state, self.sync.as_mut()) {
            (LinkState::Playing { .. }, Some(sync)) => sync
                .outbound(session, report, now)
                .into_iter()
                .map(ClientMessage::Peer)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// The transport failed or was never established
    pub fn connection_failed(&mut self, session: &mut Session) -> SessionError {
        warn!("Connection to registry lost");
        self.close(session);
        SessionError::ConnectionFailed
    }

    fn close(&mut self, session: &mut Session) {
        session.terminate();
        self.sync = None;
        self.state = LinkState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::fighter as fc;
    use crate::game::constants::physics::TICK_DURATION_MS;
    use crate::game::input::{Controls, FighterInput};
    use crate::game::state::{AnimCode, Facing};
    use crate::util::vec2::Vec2;
    use rand::rngs::mock::StepRng;

    fn code() -> RoomCode {
        RoomCode::parse("ROOM42").unwrap()
    }

    fn quiet() -> StepRng {
        StepRng::new(u64::MAX, 0)
    }

    fn online(role: Role) -> (Session, PeerSync) {
        let mut session = Session::new();
        session.start_online(role, code());
        (session, PeerSync::new(role, &SyncConfig::default()))
    }

    fn snapshot(dead: bool, winner: bool) -> FighterSnapshot {
        FighterSnapshot {
            x: 400.0,
            y: 300.0,
            anim: AnimCode::Jump,
            facing: Facing::Right,
            dead,
            winner,
            eating: 0,
        }
    }

    #[test]
    fn test_throttle_coalesces() {
        let mut throttle = SendThrottle::new(Duration::from_millis(16));
        assert!(throttle.ready(Duration::from_millis(0)));
        assert!(!throttle.ready(Duration::from_millis(5)));
        assert!(!throttle.ready(Duration::from_millis(15)));
        assert!(throttle.ready(Duration::from_millis(16)));
        assert!(!throttle.ready(Duration::from_millis(20)));
        throttle.reset();
        assert!(throttle.ready(Duration::from_millis(21)));
    }

    #[test]
    fn test_snapshot_overwrites_pose_not_health() {
        let (mut session, mut sync) = online(Role::Host);
        session.fighter_mut(Slot::P2).health = 140;

        sync.apply(&mut session, PeerMessage::GameUpdate(snapshot(false, false)));
        let p2 = session.fighter(Slot::P2);
        assert_eq!(p2.position, Vec2::new(400.0, 300.0));
        assert_eq!(p2.anim, AnimCode::Jump);
        assert_eq!(p2.facing, Facing::Right);
        assert_eq!(p2.health, 140);
        // Own fighter untouched
        assert_eq!(session.fighter(Slot::P1), &crate::game::state::Fighter::new(Slot::P1));
    }

    #[test]
    fn test_snapshot_flags_are_monotonic() {
        let (mut session, mut sync) = online(Role::Guest);
        sync.apply(&mut session, PeerMessage::GameUpdate(snapshot(true, false)));
        assert!(session.fighter(Slot::P1).dead);
        sync.apply(&mut session, PeerMessage::GameUpdate(snapshot(false, false)));
        assert!(session.fighter(Slot::P1).dead);
    }

    #[test]
    fn test_snapshot_winner_ignored_when_local_won() {
        let (mut session, mut sync) = online(Role::Host);
        session.fighter_mut(Slot::P1).winner = true;
        sync.apply(&mut session, PeerMessage::GameUpdate(snapshot(false, true)));
        assert!(!session.fighter(Slot::P2).winner);
    }

    #[test]
    fn test_opponent_health_update_sets_own_fighter() {
        let (mut session, mut sync) = online(Role::Host);
        sync.apply(
            &mut session,
            PeerMessage::OpponentHealthUpdate {
                health: 120,
                dead: false,
            },
        );
        assert_eq!(session.fighter(Slot::P1).health, 120);
        assert_eq!(session.fighter(Slot::P2).health, 200);

        sync.apply(
            &mut session,
            PeerMessage::OpponentHealthUpdate {
                health: 0,
                dead: true,
            },
        );
        let p1 = session.fighter(Slot::P1);
        assert!(p1.dead);
        assert_eq!(p1.anim, AnimCode::Dead);
    }

    #[test]
    fn test_my_health_update_sets_mirrored_fighter() {
        let (mut session, mut sync) = online(Role::Guest);
        session.fighter_mut(Slot::P1).health = 100;
        sync.apply(
            &mut session,
            PeerMessage::MyHealthUpdate {
                health: 150,
                dead: false,
            },
        );
        assert_eq!(session.fighter(Slot::P1).health, 150);
        assert_eq!(session.fighter(Slot::P2).health, 200);
    }

    #[test]
    fn test_my_health_update_dead_shows_dead_anim() {
        let (mut session, mut sync) = online(Role::Host);
        sync.apply(
            &mut session,
            PeerMessage::MyHealthUpdate {
                health: 0,
                dead: true,
            },
        );
        let p2 = session.fighter(Slot::P2);
        assert!(p2.dead);
        assert_eq!(p2.anim, AnimCode::Dead);
        assert!(!session.fighter(Slot::P1).dead);
    }

    #[test]
    fn test_guest_mirrors_mouse_and_host_ignores() {
        let (mut guest, mut guest_sync) = online(Role::Guest);
        guest_sync.apply(&mut guest, PeerMessage::MouseSpawned { from_right: true });
        guest_sync.apply(&mut guest, PeerMessage::MouseUpdate { x: 500.0, y: 420.0 });
        assert_eq!(guest.pickup().map(|p| p.position.x), Some(500.0));
        guest_sync.apply(&mut guest, PeerMessage::MouseRemoved);
        assert!(guest.pickup().is_none());

        // Position updates without a live pickup are ignored
        guest_sync.apply(&mut guest, PeerMessage::MouseUpdate { x: 1.0, y: 1.0 });
        assert!(guest.pickup().is_none());

        let (mut host, mut host_sync) = online(Role::Host);
        host_sync.apply(&mut host, PeerMessage::MouseSpawned { from_right: false });
        assert!(host.pickup().is_none());
    }

    #[test]
    fn test_mouse_eaten_clears_either_side() {
        let (mut host, mut sync) = online(Role::Host);
        *host.pickup_mut() = Some(Pickup::spawn(false));
        sync.apply(
            &mut host,
            PeerMessage::MouseEaten {
                eater_role: Role::Guest,
            },
        );
        assert!(host.pickup().is_none());
    }

    #[test]
    fn test_outbound_hit_reports_victim_health() {
        let (mut session, mut sync) = online(Role::Host);
        session.fighter_mut(Slot::P1).position = Vec2::new(300.0, fc::P1_SPAWN.y);
        session.fighter_mut(Slot::P2).position = Vec2::new(335.0, fc::P2_SPAWN.y);
        let light = FighterInput {
            light: true,
            ..Default::default()
        };
        let report = session.tick(&Controls::single(light), &mut quiet());
        let out = sync.outbound(&session, &report, Duration::ZERO);

        assert_eq!(
            out[0],
            PeerMessage::OpponentHealthUpdate {
                health: 190,
                dead: false
            }
        );
        assert!(matches!(out[1], PeerMessage::GameUpdate(_)));

        // Snapshot is throttled on the next tick within the interval
        let report = session.tick(&Controls::default(), &mut quiet());
        let out = sync.outbound(&session, &report, Duration::from_millis(4));
        assert!(out.is_empty());
    }

    #[test]
    fn test_outbound_heal_and_mouse_messages() {
        let (mut session, mut sync) = online(Role::Host);
        let p1_x = session.fighter(Slot::P1).position.x;
        session.fighter_mut(Slot::P1).health = 150;
        *session.pickup_mut() = Some(Pickup {
            position: Vec2::new(p1_x + 10.0, 420.0),
            direction: Facing::Left,
        });

        let report = session.tick(&Controls::default(), &mut quiet());
        let out = sync.outbound(&session, &report, Duration::ZERO);
        assert!(out.contains(&PeerMessage::MouseEaten {
            eater_role: Role::Host
        }));
        assert!(out.contains(&PeerMessage::MouseRemoved));

        let mut healed = Vec::new();
        for i in 1..=60u64 {
            let report = session.tick(&Controls::default(), &mut quiet());
            let now = Duration::from_millis(i * TICK_DURATION_MS);
            healed.extend(sync.outbound(&session, &report, now));
        }
        assert!(healed.contains(&PeerMessage::MyHealthUpdate {
            health: 175,
            dead: false
        }));
    }

    #[test]
    fn test_guest_does_not_announce_host_hazard() {
        let (mut session, mut sync) = online(Role::Guest);
        *session.pickup_mut() = Some(Pickup::spawn(true));
        let report = session.tick(&Controls::default(), &mut quiet());
        let out = sync.outbound(&session, &report, Duration::ZERO);
        assert!(out
            .iter()
            .all(|m| !matches!(m, PeerMessage::MouseUpdate { .. } | PeerMessage::MouseRemoved)));
    }

    #[test]
    fn test_link_join_flow() {
        let mut session = Session::new();
        let mut link = PeerLink::new(SyncConfig::default());

        assert_eq!(
            link.join_room("bad"),
            Err(SessionError::InvalidRoomCode(RoomCodeError::Length(3)))
        );
        assert_eq!(link.state(), &LinkState::Idle);

        let msg = link.join_room(" room42 ").unwrap();
        assert_eq!(
            msg,
            ClientMessage::JoinRoom {
                room_code: "ROOM42".into()
            }
        );

        link.handle(
            &mut session,
            ServerMessage::RoomJoined {
                room_code: code(),
                role: Role::Guest,
            },
        )
        .unwrap();
        assert!(!session.is_running());

        link.handle(&mut session, ServerMessage::GameStart).unwrap();
        assert!(link.is_playing());
        assert_eq!(session.local_slot(), Some(Slot::P2));

        let err = link
            .handle(&mut session, ServerMessage::PlayerDisconnected)
            .unwrap_err();
        assert_eq!(err, SessionError::PeerDisconnected);
        assert_eq!(link.state(), &LinkState::Closed);
        assert!(!session.is_running());
    }

    #[test]
    fn test_link_room_errors() {
        let mut session = Session::new();
        let mut link = PeerLink::new(SyncConfig::default());
        link.create_room();
        let err = link
            .handle(
                &mut session,
                ServerMessage::RoomError {
                    reason: RoomErrorReason::Full,
                },
            )
            .unwrap_err();
        assert_eq!(err, SessionError::RoomFull);
        assert_eq!(err.to_string(), "Room is full");
        assert_eq!(link.state(), &LinkState::Idle);
        assert_eq!(
            SessionError::from(RoomErrorReason::NotFound),
            SessionError::RoomNotFound
        );
    }

    #[test]
    fn test_link_ignores_peer_messages_before_start() {
        let mut session = Session::new();
        let mut link = PeerLink::new(SyncConfig::default());
        link.create_room();
        link.handle(
            &mut session,
            ServerMessage::Peer(PeerMessage::OpponentHealthUpdate {
                health: 1,
                dead: false,
            }),
        )
        .unwrap();
        assert_eq!(session.fighter(Slot::P1).health, 200);

        let report = session.tick(&Controls::default(), &mut quiet());
        assert!(link.outbound(&session, &report, Duration::ZERO).is_empty());
    }

    #[test]
    fn test_connection_failed_closes() {
        let mut session = Session::new();
        session.start_local_single();
        let mut link = PeerLink::new(SyncConfig::default());
        assert_eq!(link.connection_failed(&mut session), SessionError::ConnectionFailed);
        assert_eq!(link.state(), &LinkState::Closed);
        assert!(!session.is_running());
    }
}
