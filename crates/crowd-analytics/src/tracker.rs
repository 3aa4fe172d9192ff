//! Greedy nearest-centroid identity tracking.
//!
//! Tracks are matched in their live order; each one claims the nearest unused
//! centroid that is strictly closer than `max_distance`. Ties go to the
//! centroid that comes first in input order. Unmatched tracks are dropped
//! immediately and unclaimed centroids open new tracks. Identifiers increase
//! monotonically and are never reused, even after every track is lost.

use common::Centroid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_MAX_DISTANCE: f64 = 50.0;

pub type TrackId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub track_id: TrackId,
    pub last_centroid: Centroid,
}

#[derive(Debug, Clone)]
pub struct IdentityTracker {
    max_distance: f64,
    tracks: Vec<Track>,
    next_id: TrackId,
}

impl IdentityTracker {
    pub fn new(max_distance: f64) -> Self {
        Self {
            max_distance,
            tracks: Vec::new(),
            next_id: 1,
        }
    }

    /// Live tracks in matching order
    pub fn live_tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Identifier the next new track will receive
    pub fn next_id(&self) -> TrackId {
        self.next_id
    }

    fn allocate_id(&mut self) -> TrackId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Associate this frame's centroids with the live tracks.
    ///
    /// Returns the new live set as `track_id -> centroid`.
    pub fn track(&mut self, centroids: &[Centroid]) -> BTreeMap<TrackId, Centroid> {
        if centroids.is_empty() {
            self.tracks.clear();
            return BTreeMap::new();
        }

        let mut updated = Vec::with_capacity(centroids.len());

        if self.tracks.is_empty() {
            for &centroid in centroids {
                updated.push(Track {
                    track_id: self.allocate_id(),
                    last_centroid: centroid,
                });
            }
            self.tracks = updated;
            return self.snapshot();
        }

        let mut used = vec![false; centroids.len()];

        for track in &self.tracks {
            let mut best_distance = self.max_distance;
            let mut best_idx = None;

            for (idx, centroid) in centroids.iter().enumerate() {
                if used[idx] {
                    continue;
                }

                let distance = track.last_centroid.distance(centroid);
                if distance < best_distance {
                    best_distance = distance;
                    best_idx = Some(idx);
                }
            }

            match best_idx {
                Some(idx) => {
                    used[idx] = true;
                    updated.push(Track {
                        track_id: track.track_id,
                        last_centroid: centroids[idx],
                    });
                }
                None => {
                    tracing::trace!(track_id = track.track_id, "Track lost");
                }
            }
        }

        for (idx, &centroid) in centroids.iter().enumerate() {
            if !used[idx] {
                updated.push(Track {
                    track_id: self.allocate_id(),
                    last_centroid: centroid,
                });
            }
        }

        self.tracks = updated;
        self.snapshot()
    }

    fn snapshot(&self) -> BTreeMap<TrackId, Centroid> {
        self.tracks
            .iter()
            .map(|t| (t.track_id, t.last_centroid))
            .collect()
    }
}

impl Default for IdentityTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DISTANCE)
    }
}
