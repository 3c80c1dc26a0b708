//! Spatial-query capability consumed by every delivery model.
//!
//! The simulator owns node positions and the "enabled" lifecycle; delivery
//! models only ever see this narrow interface, so they stay testable against
//! a stub topology (see `test_helpers`).

use std::sync::Arc;

/// Node index: stable integer identifier in `[0, capacity)`.
/// Whether a slot is currently enabled is a time-varying property owned by
/// the provider, not by the delivery models.
pub type NodeIndex = usize;

/// Spatial queries over the simulated topology.
///
/// Implementations must be callable from many transmission events at once;
/// `distance` is symmetric and non-negative, but the metric itself is opaque
/// to the delivery models.
pub trait PositionProvider: Send + Sync {
    /// Total number of node slots in the simulation.
    fn capacity(&self) -> usize;

    /// Ordered sequence of the currently enabled node indices.
    fn enabled(&self) -> Vec<NodeIndex>;

    /// Whether `index` is currently enabled.
    fn is_enabled(&self, index: NodeIndex) -> bool;

    /// Distance between two nodes.
    fn distance(&self, a: NodeIndex, b: NodeIndex) -> f64;
}

/// Shared handle passed to `DeliveryModel::initialize`.
pub type Positions = Arc<dyn PositionProvider>;
