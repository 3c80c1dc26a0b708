//! Test helpers: an in-memory `PositionProvider` over 2-D points.
//!
//! Kept behind the default-on `test-helpers` feature so downstream hosts can
//! drive the delivery models in their own tests without standing up a real
//! topology store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::position::{NodeIndex, PositionProvider, Positions};

/// Fixed 2-D topology with per-node enabled flags and Euclidean distance.
pub struct StubPositions {
    points: Vec<(f64, f64)>,
    enabled: Vec<AtomicBool>,
}

impl StubPositions {
    /// Build from explicit coordinates; every node starts enabled.
    pub fn from_points(points: Vec<(f64, f64)>) -> Self {
        let enabled = points.iter().map(|_| AtomicBool::new(true)).collect();
        Self { points, enabled }
    }

    /// `count` nodes all at the origin (pairwise distance 0).
    pub fn colocated(count: usize) -> Self {
        Self::from_points(vec![(0.0, 0.0); count])
    }

    /// `count` nodes on the x-axis, `spacing` apart.
    pub fn line(count: usize, spacing: f64) -> Self {
        Self::from_points((0..count).map(|i| (i as f64 * spacing, 0.0)).collect())
    }

    /// Toggle a node's enabled flag; visible to concurrent senders.
    pub fn set_enabled(&self, index: NodeIndex, enabled: bool) {
        self.enabled[index].store(enabled, Ordering::Relaxed);
    }

    /// Wrap into the handle shape `DeliveryModel::initialize` expects.
    pub fn into_positions(self) -> Positions {
        Arc::new(self)
    }
}

impl PositionProvider for StubPositions {
    fn capacity(&self) -> usize {
        self.points.len()
    }

    fn enabled(&self) -> Vec<NodeIndex> {
        (0..self.points.len())
            .filter(|&i| self.enabled[i].load(Ordering::Relaxed))
            .collect()
    }

    fn is_enabled(&self, index: NodeIndex) -> bool {
        index < self.points.len() && self.enabled[index].load(Ordering::Relaxed)
    }

    fn distance(&self, a: NodeIndex, b: NodeIndex) -> f64 {
        let (ax, ay) = self.points[a];
        let (bx, by) = self.points[b];
        let (dx, dy) = (ax - bx, ay - by);
        (dx * dx + dy * dy).sqrt()
    }
}
