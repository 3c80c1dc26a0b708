//! Lossless delivery model: every frame between enabled nodes arrives.

use log::debug;

use crate::config::{ConfigError, ConfigTree};
use crate::delivery::DeliveryModel;
use crate::position::{NodeIndex, Positions};

/// Delivers every frame as long as both endpoints are enabled. Useful as a
/// baseline and for tests that exercise the simulator above the channel.
#[derive(Default)]
pub struct PassThrough {
    positions: Option<Positions>,
}

impl PassThrough {
    pub fn new() -> Self {
        Self::default()
    }

    fn positions(&self) -> &Positions {
        self.positions
            .as_ref()
            .expect("PassThrough: send called before initialize")
    }

    fn is_to_be_delivered(&self, a: NodeIndex, b: NodeIndex) -> bool {
        let positions = self.positions();
        positions.is_enabled(a) && positions.is_enabled(b)
    }
}

impl DeliveryModel for PassThrough {
    fn parameters_help(&self) -> &'static str {
        "PassThrough delivers every frame as long as the source and destination are enabled. \
         It reads no parameters."
    }

    fn configure(&mut self, _config: &ConfigTree) -> Result<(), ConfigError> {
        Ok(())
    }

    fn initialize(&mut self, positions: Positions) {
        debug!("PassThrough: initialized, capacity={}", positions.capacity());
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
        let positions = self.positions();
        if !positions.is_enabled(source) {
            return &buffer[..0];
        }
        let mut count = 0;
        for i in positions.enabled() {
            if i != source {
                buffer[count] = i;
                count += 1;
            }
        }
        &buffer[..count]
    }
}
