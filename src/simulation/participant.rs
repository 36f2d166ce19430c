//! Per-participant kinematic, radio and audit state.
//!
//! Every [`Participant`] guards its whole state with one reader/writer lock.
//! Reads (position, liveness, snapshots, log copies) take the shared side;
//! position packets, transmission changes, log appends and the liveness
//! expiry take the exclusive side. No method holds the lock across a call
//! into another participant.

use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use serde::Deserialize;
use std::time::Duration;

use super::clock::Clock;
use super::propagation::{PropagationParameters, calculate_effective_distance};
use super::types::{ParticipantId, Position3D, TransmitPath, VehicleDescriptor};

/// A participant expires after this many update budgets without a packet.
pub const LIVENESS_TIMEOUT_FACTOR: u32 = 5;

/// Largest accepted distance between the global frame and the participant's frame.
pub const MAX_FRAME_LAG: u64 = 1;

/// Which radio types a participant can operate right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct RadioCapabilities {
    #[serde(default)]
    pub short_wave: bool,
    #[serde(default)]
    pub long_range: bool,
    /// Diver (underwater, direct-duplex) radio.
    #[serde(default)]
    pub underwater: bool,
}

/// A position update as delivered by the transport layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PositionPacket {
    pub position: Position3D,
    #[serde(default)]
    pub view_direction: Position3D,
    #[serde(default)]
    pub velocity: Position3D,
    #[serde(default)]
    pub can_speak: bool,
    #[serde(default)]
    pub capabilities: RadioCapabilities,
    /// The packet describes the local client itself. Only then are the
    /// capability flags reliable.
    #[serde(default)]
    pub is_self: bool,
    #[serde(default)]
    pub transmit_path: TransmitPath,
    #[serde(default)]
    pub transmitting_frequency: String,
    #[serde(default)]
    pub vehicle: VehicleDescriptor,
    #[serde(default)]
    pub terrain_interception: f32,
    #[serde(default)]
    pub object_interception: bool,
    #[serde(default = "default_voice_volume")]
    pub voice_volume: f32,
    #[serde(default)]
    pub is_spectating: bool,
    #[serde(default)]
    pub is_enemy_to_player: bool,
}

fn default_voice_volume() -> f32 {
    1.0
}

/// What a participant is currently sending on.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Transmission {
    pub path: TransmitPath,
    pub frequency: String,
    /// Radio range in meters; 0 while not transmitting.
    pub range: f32,
}

impl Transmission {
    pub fn is_active(&self) -> bool {
        self.range > 0.0
    }
}

/// Append-only audit trail of corrections applied to a participant.
#[derive(Debug, Clone, Default)]
pub struct ModificationLog {
    entries: Vec<String>,
}

impl ModificationLog {
    pub fn push(&mut self, entry: String) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

#[derive(Debug, Clone)]
struct ParticipantState {
    position: Position3D,
    view_direction: Position3D,
    velocity: Position3D,
    last_update: Duration,
    /// `None` until the first packet, and again after a liveness timeout.
    data_frame: Option<u64>,
    capabilities: RadioCapabilities,
    transmission: Transmission,
    vehicle: VehicleDescriptor,
    terrain_interception: f32,
    object_interception: bool,
    can_speak: bool,
    is_spectating: bool,
    is_enemy_to_player: bool,
    voice_volume: f32,
    modifications: ModificationLog,
}

impl ParticipantState {
    fn extrapolated_position(&self, now: Duration) -> Position3D {
        if self.velocity.is_null() {
            return self.position;
        }
        let elapsed = now.saturating_sub(self.last_update).as_secs_f32();
        self.position + self.velocity * elapsed
    }
}

/// Copy of a participant's state with the position extrapolated to "now".
#[derive(Debug, Clone)]
pub struct ParticipantSnapshot {
    pub id: ParticipantId,
    pub position: Position3D,
    pub view_direction: Position3D,
    pub velocity: Position3D,
    pub data_frame: Option<u64>,
    pub capabilities: RadioCapabilities,
    pub transmission: Transmission,
    pub vehicle: VehicleDescriptor,
    pub terrain_interception: f32,
    pub object_interception: bool,
    pub can_speak: bool,
    pub is_spectating: bool,
    pub is_enemy_to_player: bool,
    pub voice_volume: f32,
}

impl ParticipantSnapshot {
    /// Submerged and without a short-wave radio that works there (i.e. not
    /// inside a vehicle).
    pub fn is_submerged_without_short_wave(&self) -> bool {
        self.position.height() < 0.0 && !self.capabilities.short_wave
    }
}

/// One session member.
#[derive(Debug)]
pub struct Participant {
    id: ParticipantId,
    state: RwLock<ParticipantState>,
}

impl Participant {
    pub fn new(id: ParticipantId) -> Self {
        Self {
            id,
            state: RwLock::new(ParticipantState {
                position: Position3D::default(),
                view_direction: Position3D::default(),
                velocity: Position3D::default(),
                last_update: Duration::ZERO,
                data_frame: None,
                capabilities: RadioCapabilities::default(),
                transmission: Transmission::default(),
                vehicle: VehicleDescriptor::default(),
                terrain_interception: 0.0,
                object_interception: false,
                can_speak: false,
                is_spectating: false,
                is_enemy_to_player: false,
                voice_volume: 1.0,
                modifications: ModificationLog::default(),
            }),
        }
    }

    pub fn id(&self) -> ParticipantId {
        self.id
    }

    /// Absorb a position packet and stamp it with the current time and frame.
    ///
    /// Capability flags are taken from the packet only when it describes the
    /// local client (`is_self`). A packet that says "not transmitting" also
    /// drops the range to zero.
    pub fn update_from_packet(&self, packet: &PositionPacket, clock: &dyn Clock) {
        let now = clock.now();
        let frame = clock.current_frame();
        let mut state = self.state.write();

        state.position = packet.position;
        state.view_direction = packet.view_direction;
        state.velocity = packet.velocity;
        state.can_speak = packet.can_speak;
        if packet.is_self {
            state.capabilities = packet.capabilities;
        }
        state.vehicle = packet.vehicle.clone();
        state.terrain_interception = packet.terrain_interception;
        state.voice_volume = packet.voice_volume;
        state.object_interception = packet.object_interception;
        state.is_spectating = packet.is_spectating;
        state.is_enemy_to_player = packet.is_enemy_to_player;
        state.transmission.path = packet.transmit_path;
        if packet.transmit_path == TransmitPath::None {
            state.transmission.range = 0.0;
        } else {
            state.transmission.frequency.clone_from(&packet.transmitting_frequency);
        }

        state.last_update = now;
        state.data_frame = Some(frame);
    }

    /// Start sending on `path` / `frequency` with the given radio range.
    pub fn begin_transmission(&self, path: TransmitPath, frequency: impl Into<String>, range: f32) {
        let mut state = self.state.write();
        state.transmission = Transmission {
            path,
            frequency: frequency.into(),
            range: if path == TransmitPath::None { 0.0 } else { range.max(0.0) },
        };
    }

    pub fn end_transmission(&self) {
        let mut state = self.state.write();
        state.transmission.path = TransmitPath::None;
        state.transmission.range = 0.0;
    }

    /// Dead-reckoned position: last reported position moved along the last
    /// reported velocity (m/s) for the time since that report.
    pub fn current_position(&self, clock: &dyn Clock) -> Position3D {
        let now = clock.now();
        self.state.read().extrapolated_position(now)
    }

    /// Whether the participant is still being updated.
    ///
    /// Dead if the last packet is older than `LIVENESS_TIMEOUT_FACTOR` update
    /// budgets, or if its frame drifted more than `MAX_FRAME_LAG` away from
    /// the global frame. Either condition invalidates the data frame, so
    /// later calls return `false` without re-checking until the next packet.
    pub fn is_alive(&self, clock: &dyn Clock, update_timeout: Duration) -> bool {
        let state = self.state.upgradable_read();
        let Some(frame) = state.data_frame else {
            return false;
        };

        let stale = clock.now().saturating_sub(state.last_update) > update_timeout * LIVENESS_TIMEOUT_FACTOR;
        let desynced = clock.current_frame().abs_diff(frame) > MAX_FRAME_LAG;
        if !stale && !desynced {
            return true;
        }

        log::debug!("participant {} expired (stale: {}, frame {} vs {})", self.id, stale, frame, clock.current_frame());
        let mut state = RwLockUpgradableReadGuard::upgrade(state);
        state.data_frame = None;
        false
    }

    pub fn data_frame(&self) -> Option<u64> {
        self.state.read().data_frame
    }

    /// Effective distance from this participant (listening) to `speaker`.
    ///
    /// The two positions are read one after the other, never under both
    /// locks at once.
    pub fn effective_distance_to(&self, speaker: &Participant, clock: &dyn Clock, params: &PropagationParameters) -> f32 {
        let mine = self.current_position(clock);
        let (theirs, terrain) = {
            let now = clock.now();
            let state = speaker.state.read();
            (state.extrapolated_position(now), state.terrain_interception)
        };
        calculate_effective_distance(mine.distance_to(&theirs), terrain, params)
    }

    pub fn capabilities(&self) -> RadioCapabilities {
        self.state.read().capabilities
    }

    pub fn transmission(&self) -> Transmission {
        self.state.read().transmission.clone()
    }

    pub fn vehicle(&self) -> VehicleDescriptor {
        self.state.read().vehicle.clone()
    }

    pub fn add_modification_log(&self, entry: impl Into<String>) {
        self.state.write().modifications.push(entry.into());
    }

    /// Copy of the audit trail, oldest first.
    pub fn modification_log(&self) -> Vec<String> {
        self.state.read().modifications.entries().to_vec()
    }

    /// Consistent copy of the whole state taken under one shared lock.
    pub fn snapshot(&self, clock: &dyn Clock) -> ParticipantSnapshot {
        let now = clock.now();
        let state = self.state.read();
        ParticipantSnapshot {
            id: self.id,
            position: state.extrapolated_position(now),
            view_direction: state.view_direction,
            velocity: state.velocity,
            data_frame: state.data_frame,
            capabilities: state.capabilities,
            transmission: state.transmission.clone(),
            vehicle: state.vehicle.clone(),
            terrain_interception: state.terrain_interception,
            object_interception: state.object_interception,
            can_speak: state.can_speak,
            is_spectating: state.is_spectating,
            is_enemy_to_player: state.is_enemy_to_player,
            voice_volume: state.voice_volume,
        }
    }
}
