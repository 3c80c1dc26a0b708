//! Fixed PHY-layer timing profiles for the supported MAC protocols.
//!
//! Profiles are keyed by OFDM channel width; the public names map onto them:
//! 802.11a and 802.11g share OFDM20, 802.11p comes in 10 MHz (OFDM10) and
//! 20 MHz (OFDM20) flavors.

use std::time::Duration;

/// Immutable PHY timing constants, selected once at configure time.
#[derive(Debug)]
pub struct PhyProfile {
    pub slot: Duration,
    pub sifs: Duration,
    /// Contention-window bounds, in slots.
    pub cw_min: u32,
    pub cw_max: u32,
}

impl PhyProfile {
    /// DCF interframe space: derived, not stored.
    pub fn difs(&self) -> Duration {
        self.sifs + 2 * self.slot
    }

    /// Look up the profile for a `mac_protocol` configuration value.
    pub fn for_protocol(name: &str) -> Option<&'static PhyProfile> {
        match name {
            "802.11a" | "802.11g" | "802.11p20MHz" => Some(&OFDM20),
            "802.11p10MHz" => Some(&OFDM10),
            _ => None,
        }
    }
}

static OFDM20: PhyProfile = PhyProfile {
    slot: Duration::from_micros(9),
    sifs: Duration::from_micros(16),
    cw_min: 15,
    cw_max: 1023,
};

static OFDM10: PhyProfile = PhyProfile {
    slot: Duration::from_micros(13),
    sifs: Duration::from_micros(32),
    cw_min: 15,
    cw_max: 1023,
};
