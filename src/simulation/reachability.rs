//! Reachability engine: can a listener hear a speaker, and how.
//!
//! For one (listener, speaker) pair the engine evaluates:
//! - vehicle intercom (range independent)
//! - the listener's own radios ("local radio"), with underwater rescaling and
//!   relay rescue
//! - radio speakers placed in the world on the speaker's frequency
//!
//! and returns every path that succeeds, in that order. All negative outcomes
//! (out of range, wrong frequency, half-duplex conflict, ...) look the same to
//! the caller: no entry.
//!
//! ## Locking
//!
//! Each participant is read through a snapshot taken under its own shared
//! lock, one participant at a time. Registry lookups copy what they need and
//! release the registry lock before any distance math or relay search.

use std::sync::Arc;

use super::clock::Clock;
use super::frequency::FrequencyRegistry;
use super::participant::{Participant, ParticipantSnapshot};
use super::propagation::{calculate_effective_distance, relay_within_underwater_range, underwater_adjusted_distance};
use super::relay::{RelayConnection, RelayConnectivity};
use super::roster::Roster;
use super::types::{ListenedInfo, ParticipantId, RadioKind, ReceivePath, StereoMode, TangentOverrides, TransmitPath};
use crate::control::{ConfigurationStore, EngineConfig, Setting};

/// Source id of entries heard on the listener's own radios.
pub const LOCAL_RADIO_ID: &str = "local_radio";
/// Source id of intercom entries.
pub const INTERCOM_ID: &str = "intercom";
const INTERCOM_VOLUME: f32 = 7.0;
const LOCAL_RADIO_WAVE_Z: f32 = 1.0;

/// Everything one speaker is heard over by one listener.
#[derive(Debug, Clone)]
pub struct SpeakerRoute {
    pub speaker: ParticipantId,
    pub heard: Vec<ListenedInfo>,
}

/// Stateless query object over the session's shared services.
pub struct ReachabilityEngine<'a> {
    config: &'a EngineConfig,
    frequencies: &'a dyn FrequencyRegistry,
    relays: &'a dyn RelayConnectivity,
    roster: &'a Roster,
    clock: &'a dyn Clock,
}

impl<'a> ReachabilityEngine<'a> {
    pub fn new(config: &'a EngineConfig, frequencies: &'a dyn FrequencyRegistry, relays: &'a dyn RelayConnectivity, roster: &'a Roster, clock: &'a dyn Clock) -> Self {
        Self {
            config,
            frequencies,
            relays,
            roster,
            clock,
        }
    }

    /// Can `listener` hear `speaker` on one of the listener's own radios?
    ///
    /// Long-range is matched before short-wave; when both would work only the
    /// long-range entry is produced. `relay` is the connection found for this
    /// pair (if any); it may rescue a submerged path and is passed through on
    /// the result.
    pub fn is_over_local_radio(&self, listener: Option<&Participant>, speaker: &Participant, overrides: TangentOverrides, relay: Option<&RelayConnection>) -> Option<ListenedInfo> {
        let listener = listener?;
        let me = listener.snapshot(self.clock);
        let sender = speaker.snapshot(self.clock);

        let receiver_underwater = me.is_submerged_without_short_wave();
        let sender_underwater = sender.is_submerged_without_short_wave();

        let over = local_transmit_path(&sender, overrides, sender_underwater)?;
        let frequency = sender.transmission.frequency.as_str();

        let on_long_range = self.frequencies.is_tuned(me.id, RadioKind::LongRange, frequency);
        let on_short_wave = self.frequencies.is_tuned(me.id, RadioKind::ShortWave, frequency);
        if !on_long_range && !on_short_wave {
            log::trace!("{} -> {}: frequency {:?} not tuned", sender.id, me.id, frequency);
            return None;
        }

        let range = sender.transmission.range;
        let params = &self.config.propagation;
        let mut effective = calculate_effective_distance(me.position.distance_to(&sender.position), sender.terrain_interception, params);

        if receiver_underwater || sender_underwater {
            let underwater = me.position.distance_underwater(&sender.position);
            effective = underwater_adjusted_distance(effective, underwater, range, params);

            if effective > range {
                if let Some(relay) = relay {
                    let antenna = relay.antenna_position();
                    let total = sender.position.distance_to(&antenna);
                    let submerged = sender.position.distance_underwater(&antenna);
                    if relay_within_underwater_range(total, submerged, range, params) {
                        log::debug!("{} -> {}: underwater path rescued by antenna {}", sender.id, me.id, relay.antenna().antenna_id);
                        effective = 0.0;
                    }
                }
            }
        }

        if effective > range {
            log::trace!("{} -> {}: out of range ({:.1} > {:.1})", sender.id, me.id, effective, range);
            return None;
        }

        let full_duplex = self.config.flag(Setting::FullDuplex);
        let transmitting_radio = if full_duplex { None } else { self.frequencies.current_transmitting_radio(me.id) };

        let (on, entry) = if on_long_range && me.capabilities.long_range {
            (ReceivePath::LongRange, self.frequencies.entry_for(me.id, RadioKind::LongRange, frequency)?)
        } else if on_short_wave && me.capabilities.short_wave {
            (ReceivePath::ShortWave, self.frequencies.entry_for(me.id, RadioKind::ShortWave, frequency)?)
        } else {
            return None;
        };

        if transmitting_radio.as_deref() == Some(entry.radio_classname.as_str()) {
            log::trace!("{} -> {}: {} is transmitting (half duplex)", sender.id, me.id, entry.radio_classname);
            return None;
        }

        Some(ListenedInfo {
            over,
            on,
            volume: entry.volume,
            stereo_mode: entry.stereo_mode,
            radio_id: LOCAL_RADIO_ID.to_string(),
            position_override: None,
            wave_z: LOCAL_RADIO_WAVE_Z,
            vehicle: me.vehicle,
            relay: relay.cloned(),
        })
    }

    /// Every path over which `listener` hears `speaker`: intercom, local radio
    /// and ground speakers, in that order.
    ///
    /// Pure query; calling it twice on unchanged state gives the same result.
    pub fn is_over_radio(&self, listener: Option<&Participant>, speaker: &Participant, overrides: TangentOverrides) -> Vec<ListenedInfo> {
        let mut result = Vec::new();
        let Some(listener) = listener else {
            return result;
        };

        let sender = speaker.snapshot(self.clock);
        let my_vehicle = listener.vehicle();

        if self.config.flag(Setting::IntercomEnabled) && sender.transmission.path == TransmitPath::None && sender.vehicle.shares_intercom_with(&my_vehicle) {
            result.push(ListenedInfo {
                over: TransmitPath::ShortWave,
                on: ReceivePath::Intercom,
                volume: INTERCOM_VOLUME,
                stereo_mode: StereoMode::Stereo,
                radio_id: INTERCOM_ID.to_string(),
                position_override: None,
                wave_z: 0.0,
                vehicle: sender.vehicle.clone(),
                relay: None,
            });
        }

        let range = sender.transmission.range;
        if range == 0.0 {
            return result;
        }

        let listener_position = listener.current_position(self.clock);
        let is_self = listener.id() == speaker.id();
        let relay = if is_self { None } else { self.relays.find_connection(&sender.position, range, &listener_position) };

        if !is_self {
            if let Some(local) = self.is_over_local_radio(Some(listener), speaker, overrides, relay.as_ref()) {
                result.push(local);
            }
        }

        // Plain effective distance: no underwater adjustment on this gate.
        if self.config.speaker_scan_distance_gate {
            let effective = calculate_effective_distance(listener_position.distance_to(&sender.position), sender.terrain_interception, &self.config.propagation);
            if effective > range && relay.is_none() {
                return result;
            }
        }

        let tangent = sender.transmission.path;
        let short_wave_keyed = tangent == TransmitPath::ShortWave || overrides.short_wave;
        let long_range_keyed = tangent == TransmitPath::LongRange || overrides.long_range;
        if !((sender.capabilities.short_wave && short_wave_keyed) || (sender.capabilities.long_range && long_range_keyed)) {
            return result;
        }
        let over = if short_wave_keyed { TransmitPath::ShortWave } else { TransmitPath::LongRange };

        for entry in self.frequencies.speakers_on_frequency(&sender.transmission.frequency) {
            // The speaker's own backpack is busy transmitting, and would double the voice.
            if entry.owner == Some(speaker.id()) {
                continue;
            }
            let owner = entry.owner.and_then(|id| self.roster.get(id));
            let Some(position) = entry.resolve_position(owner.as_deref(), self.clock) else {
                continue;
            };
            if position.height() < 0.0 {
                continue;
            }
            result.push(ListenedInfo {
                over,
                on: ReceivePath::Ground,
                volume: entry.volume,
                stereo_mode: StereoMode::Stereo,
                radio_id: entry.radio_id,
                position_override: Some(position),
                wave_z: entry.wave_z,
                vehicle: entry.vehicle,
                relay: relay.clone(),
            });
        }

        result
    }

    /// One routing pass for `listener`: every live participant it hears, by id.
    ///
    /// Participants that stopped updating are skipped (and marked dead).
    pub fn route_for_listener(&self, listener: ParticipantId, overrides: TangentOverrides) -> Vec<SpeakerRoute> {
        let Some(listener) = self.roster.get(listener) else {
            return Vec::new();
        };
        let timeout = self.config.position_update_timeout();

        self.roster
            .participants()
            .into_iter()
            .filter(|speaker| speaker.is_alive(self.clock, timeout))
            .filter_map(|speaker: Arc<Participant>| {
                let heard = self.is_over_radio(Some(&*listener), &speaker, overrides);
                (!heard.is_empty()).then(|| SpeakerRoute { speaker: speaker.id(), heard })
            })
            .collect()
    }
}

/// Path the speaker is sending over as seen by a local radio, or `None` if it
/// is not sending on anything eligible.
fn local_transmit_path(sender: &ParticipantSnapshot, overrides: TangentOverrides, sender_underwater: bool) -> Option<TransmitPath> {
    let tangent = sender.transmission.path;
    let caps = sender.capabilities;
    let short_wave_keyed = matches!(tangent, TransmitPath::ShortWave | TransmitPath::Underwater) || overrides.short_wave || (overrides.underwater && sender_underwater);

    if short_wave_keyed && (caps.short_wave || caps.underwater) {
        Some(if sender_underwater { TransmitPath::Underwater } else { TransmitPath::ShortWave })
    } else if (tangent == TransmitPath::LongRange || overrides.long_range) && caps.long_range {
        Some(TransmitPath::LongRange)
    } else {
        None
    }
}
