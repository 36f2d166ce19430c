//! Arena of session participants keyed by id.
//!
//! Other parts of the model (speaker entries, routing passes) refer to
//! participants by id and resolve them here, so a departed participant simply
//! resolves to `None`.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::participant::Participant;
use super::types::ParticipantId;

#[derive(Debug, Default)]
pub struct Roster {
    participants: RwLock<HashMap<ParticipantId, Arc<Participant>>>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a participant, returning the existing handle if the id already joined.
    pub fn join(&self, id: ParticipantId) -> Arc<Participant> {
        let mut participants = self.participants.write();
        Arc::clone(participants.entry(id).or_insert_with(|| {
            log::debug!("participant {} joined", id);
            Arc::new(Participant::new(id))
        }))
    }

    pub fn leave(&self, id: ParticipantId) -> Option<Arc<Participant>> {
        let removed = self.participants.write().remove(&id);
        if removed.is_some() {
            log::debug!("participant {} left", id);
        }
        removed
    }

    pub fn get(&self, id: ParticipantId) -> Option<Arc<Participant>> {
        self.participants.read().get(&id).cloned()
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> Vec<ParticipantId> {
        let mut ids: Vec<_> = self.participants.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Handles of all participants, ordered by id. The roster lock is released
    /// before the caller touches any participant.
    pub fn participants(&self) -> Vec<Arc<Participant>> {
        let mut all: Vec<_> = self.participants.read().values().cloned().collect();
        all.sort_unstable_by_key(|p| p.id());
        all
    }

    pub fn len(&self) -> usize {
        self.participants.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.read().is_empty()
    }
}
