//! Reachability simulation core module.
//!
//! This module provides the shared-state model of a live voice session and
//! the engine that decides who hears whom. It integrates:
//! - Per-participant kinematic and radio state behind reader/writer locks
//! - Effective-distance and underwater propagation math
//! - Frequency tables and world-placed radio speakers
//! - Antenna relay connectivity with line-of-sight obstacle checks
//!
//! ## Module Organization
//!
//! - `types`: Core data structures (positions, paths, vehicle descriptors, `ListenedInfo`)
//! - `clock`: Time and simulation-frame sources
//! - `participant`: Kinematic state, liveness and transmission of one participant
//! - `roster`: Participant arena keyed by id
//! - `propagation`: Effective distance and underwater rescaling
//! - `frequency`: Frequency registry trait and in-memory table
//! - `relay`: Relay connectivity trait and antenna network
//! - `geometry`: Line-of-sight and submerged-segment calculations
//! - `reachability`: The per-pair audibility decision and routing passes
//!
//! ## Public API
//!
//! The main entry point is [`ReachabilityEngine`], built over a roster, a
//! frequency registry, a relay service, a clock and an engine configuration.

pub mod clock;
pub mod frequency;
pub mod geometry;
pub mod participant;
pub mod propagation;
pub mod reachability;
pub mod relay;
pub mod roster;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use frequency::{FrequencyEntry, FrequencyRegistry, FrequencyTable, SpeakerEntry, SpeakerPlacement};
pub use participant::{Participant, ParticipantSnapshot, PositionPacket, RadioCapabilities};
pub use propagation::PropagationParameters;
pub use reachability::{ReachabilityEngine, SpeakerRoute};
pub use relay::{Antenna, AntennaNetwork, NoRelays, RelayConnection, RelayConnectivity};
pub use roster::Roster;
pub use types::{ListenedInfo, ParticipantId, Position3D, ReceivePath, TangentOverrides, TransmitPath};
