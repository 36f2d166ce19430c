//! Frequency registry: what each listener has tuned, and the radio speakers in the world.
//!
//! The engine only talks to the [`FrequencyRegistry`] trait. [`FrequencyTable`]
//! is the in-memory implementation, guarded by a single reader/writer lock
//! that is held for one lookup or copy at a time.

use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

use super::clock::Clock;
use super::participant::Participant;
use super::types::{ParticipantId, Position3D, RadioKind, StereoMode, VehicleDescriptor};

/// A frequency tuned on one of a listener's radios.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FrequencyEntry {
    pub frequency: String,
    /// Classname of the radio the frequency is tuned on.
    pub radio_classname: String,
    pub volume: f32,
    #[serde(default)]
    pub stereo_mode: StereoMode,
}

/// Where a radio speaker is.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpeakerPlacement {
    /// Placed on the ground (or in a vehicle) at a fixed world position.
    Fixed { position: Position3D },
    /// Worn by its owner, e.g. a backpack radio with the speaker turned on.
    Carried,
}

/// A radio whose loudspeaker plays a frequency out into the world.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpeakerEntry {
    pub frequency: String,
    /// Participant owning the radio. Held by id, so a departed owner does not
    /// keep anything alive.
    #[serde(default)]
    pub owner: Option<ParticipantId>,
    pub placement: SpeakerPlacement,
    pub volume: f32,
    #[serde(default)]
    pub wave_z: f32,
    #[serde(default)]
    pub vehicle: VehicleDescriptor,
    pub radio_id: String,
}

impl SpeakerEntry {
    /// World position of the speaker, or `None` when it cannot be known.
    pub fn resolve_position(&self, owner: Option<&Participant>, clock: &dyn Clock) -> Option<Position3D> {
        let position = match &self.placement {
            SpeakerPlacement::Fixed { position } => *position,
            SpeakerPlacement::Carried => owner?.current_position(clock),
        };
        (!position.is_null()).then_some(position)
    }
}

/// Frequency tables and speaker set consumed by the reachability engine.
pub trait FrequencyRegistry: Send + Sync {
    /// Frequencies `listener` has tuned on radios of the given kind.
    fn tuned_frequencies(&self, listener: ParticipantId, radio: RadioKind) -> HashSet<String>;

    fn is_tuned(&self, listener: ParticipantId, radio: RadioKind, frequency: &str) -> bool {
        self.tuned_frequencies(listener, radio).contains(frequency)
    }

    fn entry_for(&self, listener: ParticipantId, radio: RadioKind, frequency: &str) -> Option<FrequencyEntry>;

    fn speakers_on_frequency(&self, frequency: &str) -> Vec<SpeakerEntry>;

    /// Classname of the radio `listener` is currently sending with, if any.
    fn current_transmitting_radio(&self, listener: ParticipantId) -> Option<String>;
}

#[derive(Debug, Default)]
struct ListenerRadios {
    long_range: HashMap<String, FrequencyEntry>,
    short_wave: HashMap<String, FrequencyEntry>,
    transmitting_radio: Option<String>,
}

impl ListenerRadios {
    fn table(&self, radio: RadioKind) -> &HashMap<String, FrequencyEntry> {
        match radio {
            RadioKind::LongRange => &self.long_range,
            RadioKind::ShortWave => &self.short_wave,
        }
    }

    fn table_mut(&mut self, radio: RadioKind) -> &mut HashMap<String, FrequencyEntry> {
        match radio {
            RadioKind::LongRange => &mut self.long_range,
            RadioKind::ShortWave => &mut self.short_wave,
        }
    }
}

#[derive(Debug, Default)]
struct FrequencyTableState {
    listeners: HashMap<ParticipantId, ListenerRadios>,
    speakers: Vec<SpeakerEntry>,
}

/// In-memory [`FrequencyRegistry`].
#[derive(Debug, Default)]
pub struct FrequencyTable {
    state: RwLock<FrequencyTableState>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tune `entry.frequency` on one of `listener`'s radios, replacing any
    /// previous entry for the same frequency and radio kind.
    pub fn tune(&self, listener: ParticipantId, radio: RadioKind, entry: FrequencyEntry) {
        let mut state = self.state.write();
        let radios = state.listeners.entry(listener).or_default();
        radios.table_mut(radio).insert(entry.frequency.clone(), entry);
    }

    pub fn untune(&self, listener: ParticipantId, radio: RadioKind, frequency: &str) -> Option<FrequencyEntry> {
        let mut state = self.state.write();
        state.listeners.get_mut(&listener)?.table_mut(radio).remove(frequency)
    }

    pub fn set_transmitting_radio(&self, listener: ParticipantId, radio_classname: Option<String>) {
        let mut state = self.state.write();
        state.listeners.entry(listener).or_default().transmitting_radio = radio_classname;
    }

    pub fn add_speaker(&self, speaker: SpeakerEntry) {
        self.state.write().speakers.push(speaker);
    }

    /// Remove every speaker entry of the given radio; returns how many were removed.
    pub fn remove_speaker(&self, radio_id: &str) -> usize {
        let mut state = self.state.write();
        let before = state.speakers.len();
        state.speakers.retain(|s| s.radio_id != radio_id);
        before - state.speakers.len()
    }

    /// Forget everything tuned by a listener that left the session.
    pub fn forget_listener(&self, listener: ParticipantId) {
        self.state.write().listeners.remove(&listener);
    }
}

impl FrequencyRegistry for FrequencyTable {
    fn tuned_frequencies(&self, listener: ParticipantId, radio: RadioKind) -> HashSet<String> {
        let state = self.state.read();
        state
            .listeners
            .get(&listener)
            .map(|radios| radios.table(radio).keys().cloned().collect())
            .unwrap_or_default()
    }

    fn is_tuned(&self, listener: ParticipantId, radio: RadioKind, frequency: &str) -> bool {
        let state = self.state.read();
        state.listeners.get(&listener).is_some_and(|radios| radios.table(radio).contains_key(frequency))
    }

    fn entry_for(&self, listener: ParticipantId, radio: RadioKind, frequency: &str) -> Option<FrequencyEntry> {
        let state = self.state.read();
        state.listeners.get(&listener)?.table(radio).get(frequency).cloned()
    }

    fn speakers_on_frequency(&self, frequency: &str) -> Vec<SpeakerEntry> {
        let state = self.state.read();
        state.speakers.iter().filter(|s| s.frequency == frequency).cloned().collect()
    }

    fn current_transmitting_radio(&self, listener: ParticipantId) -> Option<String> {
        let state = self.state.read();
        state.listeners.get(&listener)?.transmitting_radio.clone()
    }
}
