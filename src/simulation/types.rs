//! Type definitions for the reachability model.
//!
//! Contains the data structures shared across the simulation:
//! - World positions and vector arithmetic (`Position3D`)
//! - Transmit/receive path and stereo enums
//! - Vehicle/intercom descriptors
//! - The audibility entry (`ListenedInfo`) handed to the audio mixer

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};

use super::relay::RelayConnection;

/// Stable identity of a session member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u32);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// World position (or velocity) in meters. `z` is height above sea level,
/// so anything below zero is submerged.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position3D {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Height above sea level.
    pub fn height(&self) -> f32 {
        self.z
    }

    /// True for the origin. The origin doubles as the "unknown position"
    /// marker for speakers and as the "not moving" marker for velocities.
    pub fn is_null(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance_to(&self, other: &Position3D) -> f32 {
        (*self - *other).length()
    }

    /// Length of the straight segment `self -> other` that lies below sea level.
    pub fn distance_underwater(&self, other: &Position3D) -> f32 {
        super::geometry::submerged_segment_length(self, other)
    }
}

impl Add for Position3D {
    type Output = Position3D;

    fn add(self, rhs: Position3D) -> Position3D {
        Position3D::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Position3D {
    type Output = Position3D;

    fn sub(self, rhs: Position3D) -> Position3D {
        Position3D::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Position3D {
    type Output = Position3D;

    fn mul(self, rhs: f32) -> Position3D {
        Position3D::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Point on the map plane (x/y of a world position).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    pub x: f32,
    pub y: f32,
}

impl From<&Position3D> for MapPoint {
    fn from(p: &Position3D) -> Self {
        MapPoint { x: p.x, y: p.y }
    }
}

/// Rectangle footprint with two corners.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RectArea {
    #[serde(rename = "top-left-position")]
    pub top_left: MapPoint,
    #[serde(rename = "bottom-right-position")]
    pub bottom_right: MapPoint,
}

/// Circle footprint defined by its center.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircleArea {
    #[serde(rename = "center_position")]
    pub center: MapPoint,
    pub radius: f32,
}

/// Terrain features that block antenna-to-antenna line of sight. Footprints
/// are infinite in height.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Obstacle {
    #[serde(rename = "rectangle")]
    Rectangle {
        #[serde(flatten)]
        area: RectArea,
    },
    #[serde(rename = "circle")]
    Circle {
        #[serde(flatten)]
        area: CircleArea,
    },
}

/// Radio path a participant is transmitting over ("tangent" pressed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransmitPath {
    /// Not transmitting; only direct speech.
    #[default]
    None,
    ShortWave,
    LongRange,
    /// Short-wave transmission from a submerged speaker (diver radio).
    Underwater,
}

/// Path on which a listener hears a speaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceivePath {
    ShortWave,
    LongRange,
    Intercom,
    /// A radio speaker placed on the ground or carried as a backpack speaker.
    Ground,
}

/// Radio type a frequency is tuned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RadioKind {
    ShortWave,
    LongRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StereoMode {
    #[default]
    Stereo,
    Left,
    Right,
}

/// Vehicle a participant sits in, and the intercom channel of their seat.
///
/// `vehicle_name == None` means "on foot"; `intercom_slot == None` means the
/// seat has no intercom.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VehicleDescriptor {
    #[serde(default)]
    pub vehicle_name: Option<String>,
    #[serde(default)]
    pub intercom_slot: Option<i32>,
}

impl VehicleDescriptor {
    pub fn on_foot() -> Self {
        Self::default()
    }

    pub fn seated(vehicle_name: impl Into<String>, intercom_slot: Option<i32>) -> Self {
        Self {
            vehicle_name: Some(vehicle_name.into()),
            intercom_slot,
        }
    }

    /// Both in the same named vehicle and on the same intercom channel.
    pub fn shares_intercom_with(&self, other: &VehicleDescriptor) -> bool {
        match (&self.vehicle_name, &other.vehicle_name, self.intercom_slot, other.intercom_slot) {
            (Some(mine), Some(theirs), Some(my_slot), Some(their_slot)) => mine == theirs && my_slot == their_slot,
            _ => false,
        }
    }
}

/// Caller overrides that force a path to be evaluated regardless of what the
/// speaker claims to be transmitting on (debug / always-on modes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TangentOverrides {
    pub short_wave: bool,
    pub long_range: bool,
    /// Forces the short-wave path for a submerged speaker.
    pub underwater: bool,
}

impl TangentOverrides {
    pub const NONE: TangentOverrides = TangentOverrides {
        short_wave: false,
        long_range: false,
        underwater: false,
    };
}

/// One way a listener hears a speaker. Consumed by the audio mixer.
#[derive(Debug, Clone, PartialEq)]
pub struct ListenedInfo {
    /// Path the speaker transmits over.
    pub over: TransmitPath,
    /// Path the listener receives on.
    pub on: ReceivePath,
    pub volume: f32,
    pub stereo_mode: StereoMode,
    /// Source identifier (`"local_radio"`, `"intercom"` or a speaker radio id).
    pub radio_id: String,
    /// Where the sound originates, when it is not the speaker's own body.
    pub position_override: Option<Position3D>,
    pub wave_z: f32,
    pub vehicle: VehicleDescriptor,
    /// Relay the signal travelled over, for downstream cost shaping.
    pub relay: Option<RelayConnection>,
}
