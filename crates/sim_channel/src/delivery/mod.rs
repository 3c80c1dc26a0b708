//! Delivery models: interchangeable wireless-channel strategies.
//!
//! A delivery model decides, per simulated transmission, whether a frame is
//! received. The family shares one contract:
//!
//! - **PassThrough**: every frame between enabled nodes arrives.
//! - **DistanceBased**: loss grows with distance, no interference.
//! - **CsmaCa**: near-802.11 ad-hoc model with contention, backoff and
//!   interference accounting.

pub mod csma_ca;
pub mod distance_based;
pub mod pass_through;

pub use csma_ca::CsmaCa;
pub use distance_based::DistanceBased;
pub use pass_through::PassThrough;

use crate::config::{ConfigError, ConfigTree};
use crate::position::{NodeIndex, Positions};

/// Strategy deciding the outcome of simulated radio transmissions.
///
/// Lifecycle: `configure` once, then `initialize` once, then any number of
/// concurrent `send_unicast`/`send_broadcast` calls. Non-delivery is an
/// ordinary outcome (`false` or an empty recipient prefix), never an error.
pub trait DeliveryModel: Send + Sync {
    /// Human-readable description of the parameters this model reads from the
    /// configuration tree.
    fn parameters_help(&self) -> &'static str;

    /// Read and validate parameters. Must be called before `initialize`.
    fn configure(&mut self, config: &ConfigTree) -> Result<(), ConfigError>;

    /// Bind the spatial-query capability and allocate per-node state.
    fn initialize(&mut self, positions: Positions);

    /// Simulate one unicast transmission of `size_bytes` of payload.
    /// Returns whether the frame was delivered.
    fn send_unicast(&self, source: NodeIndex, destination: NodeIndex, size_bytes: usize) -> bool;

    /// Simulate one broadcast transmission, writing recipient indices into the
    /// caller's reusable buffer and returning the used prefix.
    ///
    /// `buffer` must have room for every potential recipient (i.e. at least
    /// `capacity()` entries).
    fn send_broadcast<'a>(
        &self,
        source: NodeIndex,
        size_bytes: usize,
        buffer: &'a mut [NodeIndex],
    ) -> &'a [NodeIndex];
}

/// The delivery-model variants, constructible by stable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryModelKind {
    PassThrough,
    DistanceBased,
    CsmaCa,
}

impl DeliveryModelKind {
    /// Resolve a stable string key to a variant.
    ///
    /// The numbered "September" aliases are legacy registry names kept so
    /// hosts with old config files still resolve.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "PassThrough" | "September0th" => Some(Self::PassThrough),
            "DistanceBased" | "September1st" => Some(Self::DistanceBased),
            "CSMA/CA" | "September2nd" => Some(Self::CsmaCa),
            _ => None,
        }
    }

    /// Construct a fresh, unconfigured model of this variant.
    pub fn create(self) -> Box<dyn DeliveryModel> {
        match self {
            Self::PassThrough => Box::new(PassThrough::new()),
            Self::DistanceBased => Box::new(DistanceBased::new()),
            Self::CsmaCa => Box::new(CsmaCa::new()),
        }
    }
}
