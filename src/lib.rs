//! Radio reachability engine for live voice sessions.
//!
//! Decides, for every listener/speaker pair, whether and how the listener
//! hears the speaker: on its own radios, over vehicle intercom, or through
//! radio speakers placed in the world, optionally bridged by antenna relays.

pub mod common;
pub mod control;
pub mod simulation;

pub use control::{ConfigError, ConfigurationStore, EngineConfig, Setting};
pub use simulation::{ListenedInfo, Participant, ParticipantId, ReachabilityEngine, Roster};
