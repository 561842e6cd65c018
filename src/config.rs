// Copyright (c) 2022 Weird Constructor <weirdconstructor@gmail.com>
// This file is a part of synfx-dsp-expr. Released under GPL-3.0-or-later.
// See README.md and COPYING for details.

use crate::delay::DEFAULT_MIN_DELAY_CAPACITY;

/// Settings shared by [crate::EquationProcessor] and [crate::engine::EquationEngine].
///
///```
/// use synfx_dsp_expr::EngineConfig;
///
/// let config = EngineConfig::default()
///     .sample_rate(48000.0)
///     .max_delay_samples(48000);
/// assert_eq!(config.min_delay_capacity, 1024);
///```
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Sample rate in Hz used until the host sets one. Bound to `fs` and `Fs`.
    pub sample_rate: f64,
    /// Every delay line holds at least this many samples.
    pub min_delay_capacity: usize,
    /// Equations with a longer `z^-n` term are rejected at compile time.
    pub max_delay_samples: usize,
    /// Number of pending messages between the engine and its backend.
    pub ring_buffer_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            min_delay_capacity: DEFAULT_MIN_DELAY_CAPACITY,
            // 10 seconds at 192kHz
            max_delay_samples: 1_920_000,
            ring_buffer_size: 128,
        }
    }
}

impl EngineConfig {
    pub fn sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn min_delay_capacity(mut self, capacity: usize) -> Self {
        self.min_delay_capacity = capacity.max(1);
        self
    }

    pub fn max_delay_samples(mut self, samples: usize) -> Self {
        self.max_delay_samples = samples;
        self
    }

    pub fn ring_buffer_size(mut self, size: usize) -> Self {
        self.ring_buffer_size = size.max(1);
        self
    }
}
