//! Distance-attenuated delivery model without interference.
//!
//! Applies a loss probability of `(d/D)^4` to each frame, where `d` is the
//! distance between the endpoints and `D` the maximum transmission range.
//! Below `0.8 × D` delivery is certain.

use std::sync::Mutex;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{ConfigError, ConfigTree};
use crate::delivery::DeliveryModel;
use crate::position::{NodeIndex, Positions};

const MODEL: &str = "DistanceBased";

pub struct DistanceBased {
    positions: Option<Positions>,
    no_delivery_distance: f64,
    rng: Mutex<StdRng>,
}

impl Default for DistanceBased {
    fn default() -> Self {
        Self::new()
    }
}

impl DistanceBased {
    pub fn new() -> Self {
        Self {
            positions: None,
            no_delivery_distance: 0.0,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic variant for reproducible simulations and tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            positions: None,
            no_delivery_distance: 0.0,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn positions(&self) -> &Positions {
        self.positions
            .as_ref()
            .expect("DistanceBased: send called before initialize")
    }

    fn rand_f64(&self) -> f64 {
        self.rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .gen()
    }

    fn is_to_be_delivered(&self, a: NodeIndex, b: NodeIndex) -> bool {
        let positions = self.positions();
        if !(positions.is_enabled(a) && positions.is_enabled(b)) {
            return false;
        }
        let dist = positions.distance(a, b);
        if dist < self.no_delivery_distance * 0.8 {
            return true;
        }
        // Loss formula applied as-is beyond the certainty band; at or past the
        // range it yields a draw that (almost) never succeeds.
        self.rand_f64() > (dist / self.no_delivery_distance).powi(4)
    }
}

impl DeliveryModel for DistanceBased {
    fn parameters_help(&self) -> &'static str {
        "DistanceBased delivers frames based only on the distance between nodes. It applies \
         a loss probability of (d/D)^4 to each frame, where d is the distance between the \
         two nodes and D is the maximum communication range. It does not consider \
         interference.\n\
         \n\
         \"transmission_range\": float, required;\n\
         \u{20}                     Maximum transmission range, i.e., the lowest distance\n\
         \u{20}                     where frame delivery ratio reaches zero.\n"
    }

    fn configure(&mut self, config: &ConfigTree) -> Result<(), ConfigError> {
        let raw = config
            .leaf_with_suffix("transmission_range")
            .ok_or(ConfigError::MissingParameter {
                model: MODEL,
                name: "transmission_range",
            })?;
        self.no_delivery_distance =
            raw.parse::<f64>()
                .map_err(|_| ConfigError::InvalidParameters {
                    model: MODEL,
                    names: vec!["transmission_range".into()],
                })?;
        debug!("DistanceBased: transmission_range={}", self.no_delivery_distance);
        Ok(())
    }

    fn initialize(&mut self, positions: Positions) {
        debug!(
            "DistanceBased: initialized, capacity={}",
            positions.capacity()
        );
        self.positions = Some(positions);
    }

    fn send_unicast(&self, source: NodeIndex, destination: NodeIndex, _size_bytes: usize) -> bool {
        self.is_to_be_delivered(source, destination)
    }

    fn send_broadcast<'a>(
        &self,
        source: NodeIndex,
        _size_bytes: usize,
        buffer: &'a mut [NodeIndex],
    ) -> &'a [NodeIndex] {
        let mut count = 0;
        for i in self.positions().enabled() {
            if i != source && self.is_to_be_delivered(source, i) {
                buffer[count] = i;
                count += 1;
            }
        }
        &buffer[..count]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::StubPositions;

    fn model_with_range(range: f64, stub: StubPositions, seed: u64) -> DistanceBased {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut model = DistanceBased::with_seed(seed);
        model
            .configure(&ConfigTree::new().with_leaf("/c/transmission_range", range.to_string()))
            .expect("valid range");
        model.initialize(stub.into_positions());
        model
    }

    #[test]
    fn missing_range_is_reported() {
        let mut model = DistanceBased::new();
        let err = model.configure(&ConfigTree::new()).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingParameter {
                model: "DistanceBased",
                name: "transmission_range",
            }
        );
    }

    #[test]
    fn unparsable_range_is_reported() {
        let mut model = DistanceBased::new();
        let err = model
            .configure(&ConfigTree::new().with_leaf("/c/transmission_range", "wide"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameters { .. }));
    }

    #[test]
    fn certain_delivery_below_eight_tenths_of_range() {
        // Nodes 70 apart with range 100: inside the certainty band.
        let model = model_with_range(100.0, StubPositions::line(2, 70.0), 7);
        for _ in 0..100 {
            assert!(model.send_unicast(0, 1, 100));
        }
    }

    #[test]
    fn success_rate_converges_to_loss_formula() {
        // d = 90, D = 100: success probability 1 - 0.9^4 = 0.3439.
        let model = model_with_range(100.0, StubPositions::line(2, 90.0), 11);
        let trials = 10_000;
        let delivered = (0..trials)
            .filter(|_| model.send_unicast(0, 1, 100))
            .count();
        let rate = delivered as f64 / trials as f64;
        let expected = 1.0 - 0.9_f64.powi(4);
        assert!(
            (rate - expected).abs() < 0.02,
            "rate {rate} expected near {expected}"
        );
    }

    #[test]
    fn disabled_endpoint_fails_in_either_direction() {
        let stub = StubPositions::line(2, 10.0);
        stub.set_enabled(1, false);
        let model = model_with_range(100.0, stub, 3);
        assert!(!model.send_unicast(0, 1, 100));
        assert!(!model.send_unicast(1, 0, 100));
    }

    #[test]
    fn broadcast_filters_per_recipient() {
        // Node 1 at 50 (certain), node 2 at 100 (at range: success needs
        // a draw above 1.0, which gen() cannot produce).
        let model = model_with_range(100.0, StubPositions::line(3, 50.0), 5);
        let mut buffer = [0usize; 3];
        for _ in 0..50 {
            let recipients = model.send_broadcast(0, 100, &mut buffer);
            assert_eq!(recipients, &[1]);
        }
    }

    #[test]
    fn broadcast_from_disabled_source_is_empty() {
        let stub = StubPositions::line(3, 10.0);
        stub.set_enabled(0, false);
        let model = model_with_range(100.0, stub, 9);
        let mut buffer = [0usize; 3];
        assert!(model.send_broadcast(0, 100, &mut buffer).is_empty());
    }
}
