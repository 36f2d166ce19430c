//! Scene loading, parsing, and validation logic.
//!
//! A scene is a JSON snapshot of a voice session: the participants with their
//! last position packet, what each of them has tuned, the radio speakers
//! placed in the world, and the antennas and terrain used for relaying.
//! [`Scene::build_runtime`] turns it into the shared state the reachability
//! engine runs against.

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::simulation::clock::Clock;
use crate::simulation::frequency::{FrequencyEntry, FrequencyTable, SpeakerEntry, SpeakerPlacement};
use crate::simulation::participant::PositionPacket;
use crate::simulation::relay::{Antenna, AntennaNetwork};
use crate::simulation::roster::Roster;
use crate::simulation::types::{Obstacle, ParticipantId, Position3D, RadioKind, TransmitPath};

/// Error type for scene loading failures.
#[derive(Debug, thiserror::Error)]
pub enum SceneLoadError {
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Radio the participant is keying at scene start.
#[derive(Debug, Clone, Deserialize)]
pub struct TransmissionSpec {
    pub path: TransmitPath,
    pub frequency: String,
    /// Radio range in meters.
    pub range: f32,
}

/// One participant of the scene.
#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantSpec {
    pub id: ParticipantId,
    /// Last position packet received from this participant.
    #[serde(flatten)]
    pub packet: PositionPacket,
    #[serde(default)]
    pub transmission: Option<TransmissionSpec>,
    /// Frequencies tuned on long-range sets.
    #[serde(default)]
    pub long_range: Vec<FrequencyEntry>,
    /// Frequencies tuned on short-wave sets.
    #[serde(default)]
    pub short_wave: Vec<FrequencyEntry>,
    /// Classname of the radio currently sending, for the half-duplex check.
    #[serde(default)]
    pub transmitting_radio: Option<String>,
    #[serde(default)]
    pub modifications: Vec<String>,
}

impl ParticipantSpec {
    /// Position packet for this participant at `position`.
    ///
    /// Path and frequency come from the `transmission` block when present, so
    /// replaying the packet never clears a transmission the scene started.
    /// Scene files are authoritative, so the packet is marked self-authoritative.
    pub fn packet_at(&self, position: Position3D) -> PositionPacket {
        let (transmit_path, transmitting_frequency) = match &self.transmission {
            Some(tx) => (tx.path, tx.frequency.clone()),
            None => (self.packet.transmit_path, self.packet.transmitting_frequency.clone()),
        };
        PositionPacket {
            position,
            is_self: true,
            transmit_path,
            transmitting_frequency,
            ..self.packet.clone()
        }
    }

    fn tuned_entries(&self) -> impl Iterator<Item = (RadioKind, &FrequencyEntry)> {
        self.long_range
            .iter()
            .map(|e| (RadioKind::LongRange, e))
            .chain(self.short_wave.iter().map(|e| (RadioKind::ShortWave, e)))
    }
}

/// Root structure representing the entire scene.
#[derive(Debug, Clone, Deserialize)]
pub struct Scene {
    pub participants: Vec<ParticipantSpec>,
    /// Radio speakers playing a frequency into the world.
    #[serde(default)]
    pub speakers: Vec<SpeakerEntry>,
    #[serde(default)]
    pub antennas: Vec<Antenna>,
    /// Terrain blocking antenna line of sight.
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
}

/// Shared state built from a scene.
#[derive(Debug)]
pub struct SceneRuntime {
    pub roster: Roster,
    pub frequencies: FrequencyTable,
    pub relays: AntennaNetwork,
}

impl Scene {
    /// Populate a roster, frequency table and antenna network from the scene.
    ///
    /// Every participant is stamped with the clock's current time and frame.
    /// Capability flags are applied for every participant (see
    /// [`ParticipantSpec::packet_at`]).
    pub fn build_runtime(&self, clock: &dyn Clock) -> SceneRuntime {
        let roster = Roster::new();
        let frequencies = FrequencyTable::new();

        for spec in &self.participants {
            let participant = roster.join(spec.id);
            participant.update_from_packet(&spec.packet_at(spec.packet.position), clock);

            if let Some(tx) = &spec.transmission {
                participant.begin_transmission(tx.path, tx.frequency.clone(), tx.range);
            }
            for entry in &spec.modifications {
                participant.add_modification_log(entry.clone());
            }
            for (radio, entry) in spec.tuned_entries() {
                frequencies.tune(spec.id, radio, entry.clone());
            }
            if spec.transmitting_radio.is_some() {
                frequencies.set_transmitting_radio(spec.id, spec.transmitting_radio.clone());
            }
        }

        for speaker in &self.speakers {
            frequencies.add_speaker(speaker.clone());
        }

        let relays = AntennaNetwork::new(self.antennas.clone(), self.obstacles.clone());
        log::debug!(
            "Scene runtime built: {} participants, {} speakers, {} antennas",
            roster.len(),
            self.speakers.len(),
            self.antennas.len()
        );

        SceneRuntime { roster, frequencies, relays }
    }
}

/// Load and parse a scene from a file.
///
/// # Parameters
///
/// * `path` - Path to the scene JSON file
///
/// # Returns
///
/// Parsed and validated Scene or an error.
pub fn load_scene(path: &Path) -> Result<Scene, SceneLoadError> {
    let data = fs::read_to_string(path).map_err(|source| SceneLoadError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let scene: Scene = serde_json::from_str(&data)?;

    if let Err(msg) = validate_scene(&scene) {
        log::error!("Scene {} rejected: {}", path.display(), msg);
        return Err(SceneLoadError::Validation(msg));
    }

    log::info!("Loaded scene {} ({} participants)", path.display(), scene.participants.len());
    Ok(scene)
}

fn check_position(what: &str, position: &Position3D) -> Result<(), String> {
    if !position.is_finite() {
        return Err(format!("{} has non-finite coordinates ({}, {}, {})", what, position.x, position.y, position.z));
    }
    Ok(())
}

/// Validate scene contents.
///
/// # Returns
///
/// `Ok(())` if validation passes, `Err(String)` with error description otherwise.
pub fn validate_scene(scene: &Scene) -> Result<(), String> {
    const MAX_PARTICIPANTS: usize = 10000;

    // Check participant count
    if scene.participants.is_empty() {
        return Err("Scene must contain at least one participant".to_string());
    }
    if scene.participants.len() > MAX_PARTICIPANTS {
        return Err(format!(
            "Participant count {} exceeds maximum of {}",
            scene.participants.len(),
            MAX_PARTICIPANTS
        ));
    }

    // Check for duplicate participant IDs
    let mut ids = HashSet::new();
    for spec in &scene.participants {
        if !ids.insert(spec.id) {
            return Err(format!("Duplicate participant id found: {}", spec.id));
        }
    }

    let mut known_frequencies = HashSet::new();

    // Validate each participant
    for spec in &scene.participants {
        check_position(&format!("Participant {} position", spec.id), &spec.packet.position)?;
        check_position(&format!("Participant {} velocity", spec.id), &spec.packet.velocity)?;

        if !spec.packet.terrain_interception.is_finite() || spec.packet.terrain_interception < 0.0 {
            return Err(format!(
                "Participant {} terrain_interception {} must be non-negative",
                spec.id, spec.packet.terrain_interception
            ));
        }

        if let Some(tx) = &spec.transmission {
            if !tx.range.is_finite() || tx.range < 0.0 {
                return Err(format!("Participant {} transmission range {} must be non-negative", spec.id, tx.range));
            }
            if tx.path != TransmitPath::None && tx.frequency.is_empty() {
                return Err(format!("Participant {} transmits without a frequency", spec.id));
            }
            known_frequencies.insert(tx.frequency.as_str());
        }

        for (radio, entry) in spec.tuned_entries() {
            if entry.frequency.is_empty() {
                return Err(format!("Participant {} has an empty {:?} frequency", spec.id, radio));
            }
            if entry.radio_classname.is_empty() {
                return Err(format!(
                    "Participant {} frequency {} is missing its radio classname",
                    spec.id, entry.frequency
                ));
            }
            if !entry.volume.is_finite() || entry.volume < 0.0 {
                return Err(format!(
                    "Participant {} frequency {} volume {} must be non-negative",
                    spec.id, entry.frequency, entry.volume
                ));
            }
            known_frequencies.insert(entry.frequency.as_str());
        }
    }

    // Validate speakers
    for (idx, speaker) in scene.speakers.iter().enumerate() {
        if speaker.frequency.is_empty() {
            return Err(format!("Speaker {} ({}) has no frequency", idx, speaker.radio_id));
        }
        if !speaker.volume.is_finite() || speaker.volume < 0.0 {
            return Err(format!("Speaker {} ({}) volume {} must be non-negative", idx, speaker.radio_id, speaker.volume));
        }
        if let Some(owner) = speaker.owner {
            if !ids.contains(&owner) {
                return Err(format!("Speaker {} ({}) references unknown owner {}", idx, speaker.radio_id, owner));
            }
        }
        match &speaker.placement {
            SpeakerPlacement::Carried if speaker.owner.is_none() => {
                return Err(format!("Speaker {} ({}) is carried but has no owner", idx, speaker.radio_id));
            }
            SpeakerPlacement::Fixed { position } => {
                check_position(&format!("Speaker {} ({})", idx, speaker.radio_id), position)?;
            }
            SpeakerPlacement::Carried => {}
        }
        if !known_frequencies.contains(speaker.frequency.as_str()) {
            log::warn!(
                "Speaker {} ({}) plays frequency {} that nobody tunes or transmits on",
                idx,
                speaker.radio_id,
                speaker.frequency
            );
        }
    }

    // Validate antennas
    let mut antenna_ids = HashSet::new();
    for antenna in &scene.antennas {
        if !antenna_ids.insert(antenna.antenna_id) {
            return Err(format!("Duplicate antenna_id found: {}", antenna.antenna_id));
        }
        check_position(&format!("Antenna {}", antenna.antenna_id), &antenna.position)?;
        if !antenna.link_range.is_finite() || antenna.link_range <= 0.0 {
            return Err(format!("Antenna {} link_range {} must be positive", antenna.antenna_id, antenna.link_range));
        }
    }

    // Validate obstacles
    for (idx, obstacle) in scene.obstacles.iter().enumerate() {
        match obstacle {
            Obstacle::Rectangle { area } => {
                if area.top_left.x >= area.bottom_right.x || area.top_left.y >= area.bottom_right.y {
                    return Err(format!(
                        "Obstacle {} (rectangle) has invalid geometry: top-left ({}, {}) must be strictly less than bottom-right ({}, {})",
                        idx, area.top_left.x, area.top_left.y, area.bottom_right.x, area.bottom_right.y
                    ));
                }
            }
            Obstacle::Circle { area } => {
                if !area.radius.is_finite() || area.radius <= 0.0 {
                    return Err(format!("Obstacle {} (circle) has non-positive radius", idx));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::EngineConfig;
    use crate::simulation::clock::ManualClock;
    use crate::simulation::reachability::ReachabilityEngine;
    use crate::simulation::types::{ReceivePath, TangentOverrides};
    use std::io::Write;

    const HARBOR: &str = r#"{
        "participants": [
            {
                "id": 1,
                "position": { "x": 0.0, "y": 0.0, "z": 2.0 },
                "capabilities": { "short_wave": true, "long_range": true },
                "long_range": [
                    { "frequency": "50.1", "radio_classname": "rt1523g", "volume": 0.8, "stereo_mode": "left" }
                ]
            },
            {
                "id": 2,
                "position": { "x": 500.0, "y": 0.0, "z": 2.0 },
                "capabilities": { "short_wave": true, "long_range": true },
                "transmit_path": "long_range",
                "transmitting_frequency": "50.1",
                "transmission": { "path": "long_range", "frequency": "50.1", "range": 1000.0 },
                "modifications": ["range set by scenario"]
            }
        ],
        "speakers": [
            {
                "frequency": "50.1",
                "placement": { "type": "fixed", "position": { "x": 10.0, "y": 10.0, "z": 1.0 } },
                "volume": 4.0,
                "radio_id": "pier_radio"
            }
        ],
        "antennas": [
            { "antenna_id": 1, "position": { "x": 250.0, "y": 0.0, "z": 30.0 }, "link_range": 2000.0 }
        ],
        "obstacles": [
            { "type": "circle", "center_position": { "x": 5000.0, "y": 5000.0 }, "radius": 100.0 }
        ]
    }"#;

    fn write_scene(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn parse(content: &str) -> Scene {
        serde_json::from_str(content).unwrap()
    }

    #[test]
    fn harbor_scene_loads_and_routes() {
        let file = write_scene(HARBOR);
        let scene = load_scene(file.path()).unwrap();
        assert_eq!(scene.participants.len(), 2);

        let clock = ManualClock::new();
        let runtime = scene.build_runtime(&clock);
        assert_eq!(runtime.roster.ids(), vec![ParticipantId(1), ParticipantId(2)]);
        let speaker = runtime.roster.get(ParticipantId(2)).unwrap();
        assert_eq!(speaker.modification_log(), vec!["range set by scenario".to_string()]);

        let config = EngineConfig {
            full_duplex: true,
            ..EngineConfig::default()
        };
        let engine = ReachabilityEngine::new(&config, &runtime.frequencies, &runtime.relays, &runtime.roster, &clock);
        let routes = engine.route_for_listener(ParticipantId(1), TangentOverrides::NONE);
        assert_eq!(routes.len(), 1);
        let heard: Vec<_> = routes[0].heard.iter().map(|e| (e.on, e.radio_id.as_str())).collect();
        assert_eq!(heard, vec![(ReceivePath::LongRange, "local_radio"), (ReceivePath::Ground, "pier_radio")]);
        assert_eq!(routes[0].heard[0].volume, 0.8);
    }

    #[test]
    fn replayed_packets_keep_transmission_frequency() {
        let scene = parse(
            r#"{ "participants": [
                {
                    "id": 1,
                    "position": { "x": 0.0, "y": 0.0, "z": 2.0 },
                    "capabilities": { "long_range": true },
                    "long_range": [ { "frequency": "50.1", "radio_classname": "rt1523g", "volume": 0.8 } ]
                },
                {
                    "id": 2,
                    "position": { "x": 300.0, "y": 0.0, "z": 2.0 },
                    "capabilities": { "long_range": true },
                    "transmission": { "path": "long_range", "frequency": "50.1", "range": 1000.0 }
                }
            ] }"#,
        );
        let clock = ManualClock::new();
        let runtime = scene.build_runtime(&clock);
        let config = EngineConfig {
            full_duplex: true,
            ..EngineConfig::default()
        };
        let engine = ReachabilityEngine::new(&config, &runtime.frequencies, &runtime.relays, &runtime.roster, &clock);
        assert_eq!(engine.route_for_listener(ParticipantId(1), TangentOverrides::NONE).len(), 1);

        // Next frame: everyone reports a moved position.
        clock.advance_frame();
        for spec in &scene.participants {
            let packet = spec.packet_at(spec.packet.position + Position3D::new(1.5, -0.5, 0.0));
            runtime.roster.get(spec.id).unwrap().update_from_packet(&packet, &clock);
        }

        let speaker = runtime.roster.get(ParticipantId(2)).unwrap().transmission();
        assert_eq!(speaker.path, TransmitPath::LongRange);
        assert_eq!(speaker.frequency, "50.1");
        assert_eq!(speaker.range, 1000.0);
        let routes = engine.route_for_listener(ParticipantId(1), TangentOverrides::NONE);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].heard[0].on, ReceivePath::LongRange);

        let silent = scene.participants[0].packet_at(Position3D::new(1.0, 1.0, 1.0));
        assert_eq!(silent.transmit_path, TransmitPath::None);
        assert!(silent.is_self);
    }

    #[test]
    fn missing_and_malformed_files_are_reported() {
        assert!(matches!(load_scene(Path::new("/nonexistent/scene.json")), Err(SceneLoadError::FileRead { .. })));

        let file = write_scene("{ \"participants\": [ ");
        assert!(matches!(load_scene(file.path()), Err(SceneLoadError::Parse(_))));

        let file = write_scene("{ \"participants\": [] }");
        assert!(matches!(load_scene(file.path()), Err(SceneLoadError::Validation(_))));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let scene = parse(
            r#"{ "participants": [
                { "id": 3, "position": { "x": 0.0, "y": 0.0, "z": 0.0 } },
                { "id": 3, "position": { "x": 1.0, "y": 0.0, "z": 0.0 } }
            ] }"#,
        );
        let err = validate_scene(&scene).unwrap_err();
        assert!(err.contains("Duplicate participant id"));
    }

    #[test]
    fn speakers_must_reference_known_owners() {
        let mut scene = parse(HARBOR);
        scene.speakers.push(SpeakerEntry {
            frequency: "50.1".to_string(),
            owner: Some(ParticipantId(42)),
            placement: SpeakerPlacement::Carried,
            volume: 1.0,
            wave_z: 0.0,
            vehicle: Default::default(),
            radio_id: "ghost".to_string(),
        });
        assert!(validate_scene(&scene).unwrap_err().contains("unknown owner"));

        scene.speakers.last_mut().unwrap().owner = None;
        assert!(validate_scene(&scene).unwrap_err().contains("no owner"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut scene = parse(HARBOR);
        scene.participants[1].transmission.as_mut().unwrap().range = -1.0;
        assert!(validate_scene(&scene).unwrap_err().contains("range"));

        let mut scene = parse(HARBOR);
        scene.participants[0].long_range[0].radio_classname.clear();
        assert!(validate_scene(&scene).unwrap_err().contains("radio classname"));

        let mut scene = parse(HARBOR);
        scene.antennas[0].link_range = 0.0;
        assert!(validate_scene(&scene).unwrap_err().contains("link_range"));

        let mut scene = parse(HARBOR);
        scene.participants[0].packet.position.x = f32::NAN;
        assert!(validate_scene(&scene).unwrap_err().contains("non-finite"));
    }
}
