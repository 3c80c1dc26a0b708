//! Near-802.11 CSMA/CA delivery model.
//!
//! Combines three layers per transmission:
//!
//! - **MAC contention**: DIFS + expected backoff + frame time must clear the
//!   source's occupancy bucket; unicast retries with an exponentially growing
//!   contention window.
//! - **Channel occupancy**: one leaky bucket per node, measured in
//!   nanoseconds of air time, drained continuously on background threads.
//! - **PHY propagation**: probabilistic delivery from distance and receiver
//!   congestion, plus probabilistic interference bookings on bystanders.

pub mod bucket;
pub mod phy;

use std::sync::Mutex;
use std::time::Duration;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{ConfigError, ConfigTree};
use crate::delivery::DeliveryModel;
use crate::position::{NodeIndex, Positions};
use bucket::LeakyBucket;
use phy::PhyProfile;

const MODEL: &str = "CSMA/CA";

/// Occupancy bucket sizing: 50 ms of air time capacity, drained by 1 ms of
/// air time every wall-clock millisecond.
const BUCKET_CAPACITY_NS: i64 = 50_000_000;
const DRAIN_INTERVAL: Duration = Duration::from_millis(1);
const DRAIN_SIZE_NS: i64 = 1_000_000;

/// MAC data frame header overhead, bytes.
const DATA_HEADER_BYTES: usize = 34;
/// MAC ACK frame size, bytes.
const ACK_BYTES: usize = 14;

pub struct CsmaCa {
    transmission_range: f64,
    interference_range: f64,
    /// Bits per nanosecond, converted from the configured Mbps.
    data_rate: f64,
    max_ucast_attempts: u32,
    phy: Option<&'static PhyProfile>,
    difs: Duration,

    positions: Option<Positions>,
    buckets: Vec<LeakyBucket>,
    rng: Mutex<StdRng>,
}

impl Default for CsmaCa {
    fn default() -> Self {
        Self::new()
    }
}

impl CsmaCa {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic variant for reproducible simulations and tests.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            transmission_range: 0.0,
            interference_range: 0.0,
            data_rate: 0.0,
            max_ucast_attempts: 0,
            phy: None,
            difs: Duration::ZERO,
            positions: None,
            buckets: Vec::new(),
            rng: Mutex::new(rng),
        }
    }

    fn positions(&self) -> &Positions {
        self.positions
            .as_ref()
            .expect("CSMA/CA: send called before initialize")
    }

    fn phy(&self) -> &'static PhyProfile {
        self.phy.expect("CSMA/CA: send called before configure")
    }

    fn rand_f64(&self) -> f64 {
        self.rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .gen()
    }

    /// Expected backoff for a contention window: slot × cw / 2, the mean of a
    /// uniform [0, cw) draw. Deterministic on purpose, so repeated attempts
    /// account expected cost instead of sampled jitter.
    fn backoff(&self, cw: u32) -> Duration {
        self.phy().slot * cw / 2
    }

    fn nanos_for_bytes(&self, bytes: usize) -> i64 {
        ((bytes * 8) as f64 / self.data_rate) as i64
    }

    /// On-air time of a data frame including MAC header, nanoseconds.
    fn data_frame_nanos(&self, payload_bytes: usize) -> i64 {
        self.nanos_for_bytes(payload_bytes + DATA_HEADER_BYTES)
    }

    /// SIFS plus the ACK frame's on-air time, nanoseconds.
    fn ack_frame_nanos(&self) -> i64 {
        self.phy().sifs.as_nanos() as i64 + self.nanos_for_bytes(ACK_BYTES)
    }

    /// Probability that a frame survives the air and the receiver's
    /// congestion. Unclamped: usage outside [0, 1] leaks through the
    /// congestion factor, and distance beyond range turns the result
    /// negative, which the caller's draw treats as never-succeeds.
    fn deliver_rate(&self, destination: NodeIndex, dist: f64) -> f64 {
        let usage = self.buckets[destination].usage();
        let congestion = (1.0 - usage) * 0.1 + 0.9;
        congestion * (1.0 - (dist / self.transmission_range).powi(3))
    }

    /// One unicast attempt at contention window `cw`. Interference bookings
    /// made along the way stick even when the attempt fails.
    fn attempt_unicast(
        &self,
        source: NodeIndex,
        destination: NodeIndex,
        cw: u32,
        frame_nanos: i64,
        ack_nanos: i64,
    ) -> bool {
        let positions = self.positions();

        let claim = self.difs.as_nanos() as i64 + self.backoff(cw).as_nanos() as i64 + frame_nanos;
        if !self.buckets[source].fill(claim) {
            return false;
        }

        let dist = positions.distance(source, destination);

        // The data frame is in the air: bystanders near the source see
        // interference whether or not delivery eventually succeeds. The
        // source is already accounted; the destination is handled below.
        for i in positions.enabled() {
            if i == source || i == destination {
                continue;
            }
            let d = positions.distance(source, i);
            if self.rand_f64() < 1.0 - (d / self.interference_range).powi(6) {
                self.buckets[i].fill(frame_nanos);
            }
        }

        // Fading and congestion at the receiver.
        if self.rand_f64() > self.deliver_rate(destination, dist) {
            return false;
        }

        // Data frame, then the ACK, must both clear the destination's budget.
        if !self.buckets[destination].fill(frame_nanos) {
            return false;
        }
        if !self.buckets[destination].fill(ack_nanos) {
            return false;
        }

        // The ACK is in the air: everyone but the destination, the source
        // included, sees interference from it.
        for i in positions.enabled() {
            if i == destination {
                continue;
            }
            let d = positions.distance(destination, i);
            if self.rand_f64() < 1.0 - (d / self.interference_range).powi(6) {
                self.buckets[i].fill(ack_nanos);
            }
        }

        true
    }

    #[cfg(test)]
    fn bucket_usage(&self, index: NodeIndex) -> f64 {
        self.buckets[index].usage()
    }
}

/// Binary-exponential contention-window growth: doubles (minus one) after a
/// failed attempt while there is still room below the cap, then holds.
fn next_contention_window(cw: u32, cw_max: u32) -> u32 {
    if cw <= cw_max / 2 {
        cw * 2 - 1
    } else {
        cw
    }
}

impl DeliveryModel for CsmaCa {
    fn parameters_help(&self) -> &'static str {
        "CSMA/CA mimics the CSMA/CA process of 802.11, delivering frames based on a \
         near-802.11 ad-hoc model that considers distance between nodes, medium \
         contention and interference.\n\
         \n\
         \"transmission_range\": float, required;\n\
         \u{20}                     Maximum transmission range, i.e., the lowest distance\n\
         \u{20}                     where frame delivery ratio reaches zero.\n\
         \"interference_range\": float, required;\n\
         \u{20}                     Maximum interference range, normally slightly larger\n\
         \u{20}                     than 2x transmission range.\n\
         \"mac_protocol\":       string, required;\n\
         \u{20}                     One of: 802.11a, 802.11g, 802.11p10MHz, 802.11p20MHz.\n\
         \"max_ucast_attempts\": int, required;\n\
         \u{20}                     Maximum number of MAC-layer transmissions attempted\n\
         \u{20}                     for the same unicast frame.\n\
         \"data_rate_mbps\":     float, required;\n\
         \u{20}                     MAC data rate in Mbps.\n"
    }

    fn configure(&mut self, config: &ConfigTree) -> Result<(), ConfigError> {
        self.transmission_range = config
            .leaf_with_suffix("transmission_range")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0.0);
        self.interference_range = config
            .leaf_with_suffix("interference_range")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0.0);
        self.phy = config
            .leaf_with_suffix("mac_protocol")
            .and_then(PhyProfile::for_protocol);
        self.max_ucast_attempts = config
            .leaf_with_suffix("max_ucast_attempts")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0);
        self.data_rate = config
            .leaf_with_suffix("data_rate_mbps")
            .and_then(|raw| raw.parse::<f64>().ok())
            .map(|mbps| mbps * 1024.0 * 1024.0 * 1e-9)
            .unwrap_or(0.0);

        // Missing, unparsable and out-of-domain parameters all land in one
        // aggregated report.
        let mut invalid: Vec<String> = Vec::new();
        if self.transmission_range <= 0.0 {
            invalid.push("transmission_range".into());
        }
        if self.interference_range <= 0.0 {
            invalid.push("interference_range".into());
        }
        if self.phy.is_none() {
            invalid.push("mac_protocol".into());
        }
        if self.max_ucast_attempts == 0 {
            invalid.push("max_ucast_attempts".into());
        }
        if self.data_rate <= 0.0 {
            invalid.push("data_rate_mbps".into());
        }
        if !invalid.is_empty() {
            return Err(ConfigError::InvalidParameters {
                model: MODEL,
                names: invalid,
            });
        }

        self.difs = self.phy().difs();
        debug!(
            "CSMA/CA: configured range={} interference={} difs={:?} attempts={} rate={:.6}b/ns",
            self.transmission_range,
            self.interference_range,
            self.difs,
            self.max_ucast_attempts,
            self.data_rate,
        );
        Ok(())
    }

    fn initialize(&mut self, positions: Positions) {
        self.buckets = (0..positions.capacity())
            .map(|_| LeakyBucket::new(BUCKET_CAPACITY_NS, DRAIN_INTERVAL, DRAIN_SIZE_NS))
            .collect();
        for bucket in &self.buckets {
            bucket.start();
        }
        info!(
            "CSMA/CA: started {} channel-occupancy buckets",
            self.buckets.len()
        );
        self.positions = Some(positions);
    }

    fn send_unicast(&self, source: NodeIndex, destination: NodeIndex, size_bytes: usize) -> bool {
        let positions = self.positions();
        if !(positions.is_enabled(source) && positions.is_enabled(destination)) {
            return false;
        }

        let frame_nanos = self.data_frame_nanos(size_bytes);
        let ack_nanos = self.ack_frame_nanos();
        let phy = self.phy();

        let mut cw = phy.cw_min;
        for _ in 0..self.max_ucast_attempts {
            if self.attempt_unicast(source, destination, cw, frame_nanos, ack_nanos) {
                return true;
            }
            cw = next_contention_window(cw, phy.cw_max);
        }
        false
    }

    fn send_broadcast<'a>(
        &self,
        source: NodeIndex,
        size_bytes: usize,
        buffer: &'a mut [NodeIndex],
    ) -> &'a [NodeIndex] {
        let positions = self.positions();
        if !positions.is_enabled(source) {
            return &buffer[..0];
        }

        let frame_nanos = self.data_frame_nanos(size_bytes);

        let claim =
            self.difs.as_nanos() as i64 + self.backoff(self.phy().cw_min).as_nanos() as i64 + frame_nanos;
        if !self.buckets[source].fill(claim) {
            return &buffer[..0];
        }

        let mut count = 0;
        for i in positions.enabled() {
            let dist = positions.distance(source, i);
            if dist < self.transmission_range {
                // Fading and congestion at this receiver.
                if self.rand_f64() > self.deliver_rate(i, dist) {
                    continue;
                }
                // Rejected by the receiver's budget means not delivered here.
                if !self.buckets[i].fill(frame_nanos) {
                    continue;
                }
                buffer[count] = i;
                count += 1;
            } else if dist < self.interference_range {
                // Out of communication range but still occupying the channel.
                // Unconditional, unlike the probabilistic booking on the
                // unicast path.
                self.buckets[i].fill(frame_nanos);
            }
        }
        &buffer[..count]
    }
}
