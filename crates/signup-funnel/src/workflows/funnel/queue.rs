use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{WaitlistEntry, WaitlistEntryId, WaitlistStatus};

/// One ranked `pending` applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueSlot {
    pub id: WaitlistEntryId,
    pub position: u32,
    pub priority_score: u8,
    pub created_at: DateTime<Utc>,
}

/// Positions for the `pending` set, best first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueRanking {
    pub slots: Vec<QueueSlot>,
}

impl QueueRanking {
    pub fn position_of(&self, id: &WaitlistEntryId) -> Option<u32> {
        self.slots
            .iter()
            .find(|slot| &slot.id == id)
            .map(|slot| slot.position)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Copies of `entries` with `position` set for pending entries and cleared otherwise.
    pub fn annotate(&self, entries: &[WaitlistEntry]) -> Vec<WaitlistEntry> {
        let positions: HashMap<&WaitlistEntryId, u32> = self
            .slots
            .iter()
            .map(|slot| (&slot.id, slot.position))
            .collect();

        entries
            .iter()
            .map(|entry| {
                let mut ranked = entry.clone();
                ranked.position = match entry.status {
                    WaitlistStatus::Pending => positions.get(&entry.id).copied(),
                    _ => None,
                };
                ranked
            })
            .collect()
    }
}

/// Full recomputation: `pending` entries ordered by score descending, then `created_at`
/// ascending, then id so equal inputs always produce the same order.
pub fn rank(entries: &[WaitlistEntry]) -> QueueRanking {
    let mut pending: Vec<&WaitlistEntry> = entries
        .iter()
        .filter(|entry| entry.status == WaitlistStatus::Pending)
        .collect();

    pending.sort_by(|a, b| {
        b.priority_score
            .cmp(&a.priority_score)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });

    let slots = pending
        .into_iter()
        .enumerate()
        .map(|(index, entry)| QueueSlot {
            id: entry.id.clone(),
            position: index as u32 + 1,
            priority_score: entry.priority_score,
            created_at: entry.created_at,
        })
        .collect();

    QueueRanking { slots }
}

type RankKey = (WaitlistEntryId, WaitlistStatus, u8, DateTime<Utc>);

/// Memoises the last ranking keyed by every ranking input. Any change to an entry's id,
/// status, score, or creation time forces a full recomputation.
#[derive(Debug, Default)]
pub struct QueueRanker {
    cache: Mutex<Option<(Vec<RankKey>, Arc<QueueRanking>)>>,
}

impl QueueRanker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rank(&self, entries: &[WaitlistEntry]) -> Arc<QueueRanking> {
        let keys = rank_keys(entries);
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some((cached, ranking)) = cache.as_ref() {
            if *cached == keys {
                return Arc::clone(ranking);
            }
        }

        let ranking = Arc::new(rank(entries));
        *cache = Some((keys, Arc::clone(&ranking)));
        ranking
    }

    /// Drops the memoised ranking; the next call recomputes from scratch.
    pub fn invalidate(&self) {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *cache = None;
    }
}

fn rank_keys(entries: &[WaitlistEntry]) -> Vec<RankKey> {
    let mut keys: Vec<RankKey> = entries
        .iter()
        .map(|entry| {
            (
                entry.id.clone(),
                entry.status,
                entry.priority_score,
                entry.created_at,
            )
        })
        .collect();
    keys.sort_by(|a, b| a.0.cmp(&b.0));
    keys
}
