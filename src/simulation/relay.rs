//! Relay ("antenna") connectivity.
//!
//! The engine asks a [`RelayConnectivity`] service whether some chain of
//! antennas bridges two positions. [`AntennaNetwork`] answers with a
//! fewest-hops search over antennas that see each other on the map.

use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::VecDeque;

use super::geometry::is_intersect;
use super::types::{MapPoint, Obstacle, Position3D};

/// Connection loss added per antenna-to-antenna hop.
const HOP_LOSS: f32 = 0.1;
/// Share of the connection loss caused by the distance to the entry antenna.
const ENTRY_LOSS_WEIGHT: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Antenna {
    pub antenna_id: u32,
    pub position: Position3D,
    /// How far this antenna reaches other antennas and receivers.
    pub link_range: f32,
}

/// A relay path between two positions.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConnection {
    antenna: Antenna,
    connection_loss: f32,
}

impl RelayConnection {
    pub fn new(antenna: Antenna, connection_loss: f32) -> Self {
        Self {
            antenna,
            connection_loss: connection_loss.clamp(0.0, 1.0),
        }
    }

    /// Antenna the transmission enters the relay chain through.
    pub fn antenna(&self) -> &Antenna {
        &self.antenna
    }

    pub fn antenna_position(&self) -> Position3D {
        self.antenna.position
    }

    /// 0.0 is a perfect link, 1.0 barely usable.
    pub fn connection_loss(&self) -> f32 {
        self.connection_loss
    }
}

pub trait RelayConnectivity: Send + Sync {
    /// Relay path from `from` (reaching at most `max_range`) to `to`, if any.
    fn find_connection(&self, from: &Position3D, max_range: f32, to: &Position3D) -> Option<RelayConnection>;
}

/// Connectivity service for sessions without antennas.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRelays;

impl RelayConnectivity for NoRelays {
    fn find_connection(&self, _from: &Position3D, _max_range: f32, _to: &Position3D) -> Option<RelayConnection> {
        None
    }
}

/// Antennas placed in the world plus the terrain that blocks them.
#[derive(Debug, Default)]
pub struct AntennaNetwork {
    antennas: RwLock<Vec<Antenna>>,
    obstacles: Vec<Obstacle>,
}

impl AntennaNetwork {
    pub fn new(antennas: Vec<Antenna>, obstacles: Vec<Obstacle>) -> Self {
        Self {
            antennas: RwLock::new(antennas),
            obstacles,
        }
    }

    pub fn add_antenna(&self, antenna: Antenna) {
        self.antennas.write().push(antenna);
    }

    pub fn remove_antenna(&self, antenna_id: u32) -> bool {
        let mut antennas = self.antennas.write();
        let before = antennas.len();
        antennas.retain(|a| a.antenna_id != antenna_id);
        antennas.len() != before
    }

    fn in_sight(&self, a: &Position3D, b: &Position3D) -> bool {
        !is_intersect(&MapPoint::from(a), &MapPoint::from(b), &self.obstacles)
    }
}

impl RelayConnectivity for AntennaNetwork {
    fn find_connection(&self, from: &Position3D, max_range: f32, to: &Position3D) -> Option<RelayConnection> {
        let antennas = self.antennas.read().clone();
        if antennas.is_empty() || max_range <= 0.0 {
            return None;
        }

        // Entry antennas, nearest first so ties resolve towards the cheapest entry.
        let mut entries: Vec<(usize, f32)> = antennas
            .iter()
            .enumerate()
            .map(|(i, a)| (i, from.distance_to(&a.position)))
            .filter(|&(i, d)| d <= max_range && self.in_sight(from, &antennas[i].position))
            .collect();
        entries.sort_by(|a, b| a.1.total_cmp(&b.1));

        // Multi-source BFS: (antenna, entry antenna, hops).
        let mut visited = vec![false; antennas.len()];
        let mut queue: VecDeque<(usize, usize, u32)> = VecDeque::new();
        for &(i, _) in &entries {
            visited[i] = true;
            queue.push_back((i, i, 0));
        }

        while let Some((current, entry, hops)) = queue.pop_front() {
            let node = &antennas[current];
            if node.position.distance_to(to) <= node.link_range && self.in_sight(&node.position, to) {
                let entry_distance = from.distance_to(&antennas[entry].position);
                let loss = ENTRY_LOSS_WEIGHT * (entry_distance / max_range) + HOP_LOSS * hops as f32;
                log::trace!("relay via antenna {} ({} hops, loss {:.2})", antennas[entry].antenna_id, hops, loss);
                return Some(RelayConnection::new(antennas[entry].clone(), loss));
            }
            for (next, other) in antennas.iter().enumerate() {
                if visited[next] {
                    continue;
                }
                let reach = node.link_range.min(other.link_range);
                if node.position.distance_to(&other.position) <= reach && self.in_sight(&node.position, &other.position) {
                    visited[next] = true;
                    queue.push_back((next, entry, hops + 1));
                }
            }
        }
        None
    }
}
