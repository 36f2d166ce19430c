//! Radio propagation calculations.
//!
//! Contains helpers for:
//! - Effective distance: raw distance plus a terrain-interception penalty,
//!   scaled by a global receiving multiplier
//! - Underwater rescaling of the submerged share of a path
//! - The relay "rescue" check for submerged speakers
//!
//! Units:
//! - Distance: meters
//! - Terrain interception: unitless obstruction amount reported by the game

use serde::{Deserialize, Serialize};

/// Distance over which the proportional terrain penalty reaches one full coefficient.
pub const TERRAIN_PENALTY_REFERENCE_DISTANCE: f32 = 2000.0;

/// Constants of the propagation model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PropagationParameters {
    /// Meters of penalty per unit of terrain interception.
    pub terrain_interception_coefficient: f32,

    /// Global multiplier applied to every effective distance (balance knob).
    ///
    /// Values above 1.0 shrink every radio's practical range.
    pub receiving_distance_multiplier: f32,

    /// Range of a diver radio in meters. The submerged share of a path is
    /// stretched by `range / diver_radio_reference_distance`.
    pub diver_radio_reference_distance: f32,
}

impl Default for PropagationParameters {
    fn default() -> Self {
        Self {
            terrain_interception_coefficient: 7.0,
            receiving_distance_multiplier: 1.0,
            diver_radio_reference_distance: 70.0,
        }
    }
}

/// Effective distance of a path of raw length `distance` whose speaker reports
/// `terrain_interception`.
///
/// # Formula
///
/// ```text
/// penalty = t * c
/// result  = (d + penalty + penalty * d / 2000) * multiplier
/// ```
///
/// Only the speaker's obstruction is used, so the result is not symmetric in
/// the two participants.
pub fn calculate_effective_distance(distance: f32, terrain_interception: f32, params: &PropagationParameters) -> f32 {
    let penalty = terrain_interception * params.terrain_interception_coefficient;
    let result = distance + penalty + penalty * distance / TERRAIN_PENALTY_REFERENCE_DISTANCE;
    result * params.receiving_distance_multiplier
}

/// Stretch the submerged share of a path.
///
/// `effective_distance` is the whole path, `underwater_distance` the part of it
/// below sea level. Only the submerged share is rescaled by
/// `range / diver_radio_reference_distance`; the rest is kept as is.
pub fn underwater_adjusted_distance(effective_distance: f32, underwater_distance: f32, range: f32, params: &PropagationParameters) -> f32 {
    underwater_distance * (range / params.diver_radio_reference_distance) + (effective_distance - underwater_distance)
}

/// Whether a relay node is close enough to a submerged speaker to carry the
/// transmission on: the speaker-to-relay path, underwater-adjusted, must be
/// strictly shorter than `range`.
pub fn relay_within_underwater_range(total_distance: f32, underwater_distance: f32, range: f32, params: &PropagationParameters) -> bool {
    underwater_adjusted_distance(total_distance, underwater_distance, range, params) < range
}
