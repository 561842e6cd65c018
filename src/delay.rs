// Copyright (c) 2022 Weird Constructor <weirdconstructor@gmail.com>
// This file is a part of synfx-dsp-expr. Released under GPL-3.0-or-later.
// See README.md and COPYING for details.

use std::collections::HashMap;

/// Minimum capacity of a delay line created by the [DelayLineRegistry].
pub const DEFAULT_MIN_DELAY_CAPACITY: usize = 1024;

/// A fixed size circular buffer that hands out the sample written
/// a number of samples ago.
///
/// The buffer starts out zeroed, so reading further back than has been
/// written yields `0.0`.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f64>,
    write_idx: usize,
}

impl DelayLine {
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        Self { buffer: vec![0.0; capacity.max(1)], write_idx: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Reads the sample written `delay_samples` calls to [DelayLine::push] ago,
    /// without writing anything. `delay_samples` is clamped to `capacity - 1`.
    /// A delay of 0 refers to the sample that is about to be overwritten,
    /// which is why [DelayLine::process] special cases it.
    #[inline]
    pub fn tap(&self, delay_samples: usize) -> f64 {
        let len = self.buffer.len();
        let delay = delay_samples.min(len - 1);
        self.buffer[(self.write_idx + len - delay) % len]
    }

    /// Writes `input` at the cursor and advances it.
    #[inline]
    pub fn push(&mut self, input: f64) {
        self.buffer[self.write_idx] = input;
        self.write_idx = (self.write_idx + 1) % self.buffer.len();
    }

    /// Reads the sample from `delay_samples` ago, then stores `input`.
    ///
    /// A delay of 0 returns `input` itself.
    #[inline]
    pub fn process(&mut self, input: f64, delay_samples: usize) -> f64 {
        let out = if delay_samples == 0 { input } else { self.tap(delay_samples) };
        self.push(input);
        out
    }

    /// Zeroes the buffer and moves the cursor back to the start.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_idx = 0;
    }

    /// Exchanges history and cursor with `other` without copying samples.
    /// Returns false and leaves both lines untouched if the capacities differ.
    pub fn swap_state(&mut self, other: &mut DelayLine) -> bool {
        if other.buffer.len() != self.buffer.len() {
            return false;
        }
        std::mem::swap(&mut self.buffer, &mut other.buffer);
        std::mem::swap(&mut self.write_idx, &mut other.write_idx);
        true
    }
}

/// Owns one [DelayLine] per distinct delay amount.
///
/// Lines are created on first request. To keep allocations away from the
/// audio thread, [DelayLineRegistry::prepare] is called with all amounts an
/// equation can reference before it is handed over, after that
/// [DelayLineRegistry::get_or_create] is a pure lookup.
#[derive(Debug, Clone)]
pub struct DelayLineRegistry {
    lines: HashMap<usize, DelayLine>,
    min_capacity: usize,
}

impl DelayLineRegistry {
    pub fn new(min_capacity: usize) -> Self {
        Self { lines: HashMap::new(), min_capacity }
    }

    fn capacity_for(&self, amount: usize) -> usize {
        (amount + 1).max(self.min_capacity)
    }

    /// Creates the lines for all `amounts` that don't have one yet.
    pub fn prepare(&mut self, amounts: &[usize]) {
        for amount in amounts.iter() {
            self.get_or_create(*amount);
        }
    }

    #[inline]
    pub fn get_or_create(&mut self, amount: usize) -> &mut DelayLine {
        let capacity = self.capacity_for(amount);
        self.lines.entry(amount).or_insert_with(|| DelayLine::new(capacity))
    }

    pub fn get(&self, amount: usize) -> Option<&DelayLine> {
        self.lines.get(&amount)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Stores `input` in every line.
    #[inline]
    pub fn push_all(&mut self, input: f64) {
        for line in self.lines.values_mut() {
            line.push(input);
        }
    }

    pub fn clear(&mut self) {
        for line in self.lines.values_mut() {
            line.clear();
        }
    }

    /// Takes over the history of all lines that `previous` has for the
    /// same delay amount. The lines are swapped, so `previous` is left
    /// with this registry's former (usually silent) buffers.
    pub fn adopt_state(&mut self, previous: &mut DelayLineRegistry) {
        for (amount, line) in self.lines.iter_mut() {
            if let Some(prev_line) = previous.lines.get_mut(amount) {
                line.swap_state(prev_line);
            }
        }
    }
}

impl Default for DelayLineRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_DELAY_CAPACITY)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn check_delay_line_impulse() {
        let mut dl = DelayLine::new(8);
        let out: Vec<f64> =
            [1.0, 0.0, 0.0, 0.0, 0.0].iter().map(|x| dl.process(*x, 3)).collect();
        assert_eq!(out, vec![0.0, 0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn check_delay_line_zero_delay() {
        let mut dl = DelayLine::new(4);
        assert_eq!(dl.process(0.7, 0), 0.7);
        assert_eq!(dl.process(0.2, 1), 0.7);
    }

    #[test]
    fn check_delay_line_wrapping_and_clamp() {
        let mut dl = DelayLine::new(4);
        for i in 0..6 {
            dl.push(i as f64);
        }
        assert_eq!(dl.tap(1), 5.0);
        assert_eq!(dl.tap(3), 3.0);
        // Clamped to capacity - 1:
        assert_eq!(dl.tap(100), 3.0);
    }

    #[test]
    fn check_delay_line_clear() {
        let mut dl = DelayLine::new(10);
        dl.push(0.5);
        dl.clear();
        assert_eq!(dl.tap(1), 0.0);
        assert_eq!(dl.process(1.0, 1), 0.0);
        assert_eq!(dl.tap(1), 1.0);
    }

    #[test]
    fn check_registry_capacity() {
        let mut reg = DelayLineRegistry::default();
        reg.prepare(&[1, 5000, 1]);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.get(1).map(|l| l.capacity()), Some(1024));
        assert_eq!(reg.get(5000).map(|l| l.capacity()), Some(5001));
        assert!(reg.get(2).is_none());
    }

    #[test]
    fn check_registry_adopt_state() {
        let mut old = DelayLineRegistry::new(4);
        old.prepare(&[1, 2]);
        old.push_all(0.25);

        let mut new = DelayLineRegistry::new(4);
        new.prepare(&[2, 3]);
        new.adopt_state(&mut old);

        assert_eq!(new.get_or_create(2).tap(1), 0.25);
        assert_eq!(new.get_or_create(3).tap(1), 0.0);
        assert_eq!(old.get_or_create(2).tap(1), 0.0);
        assert_eq!(old.get_or_create(1).tap(1), 0.25);
    }

    #[test]
    fn check_delay_line_swap_state() {
        let mut a = DelayLine::new(1_000_000);
        let mut b = DelayLine::new(1_000_000);
        a.push(0.5);
        a.push(0.25);
        let a_ptr = a.buffer.as_ptr();

        assert!(b.swap_state(&mut a));
        // The allocation moves over, no samples are copied:
        assert_eq!(b.buffer.as_ptr(), a_ptr);
        assert_eq!(b.tap(1), 0.25);
        assert_eq!(b.tap(2), 0.5);
        assert_eq!(a.tap(1), 0.0);

        let mut c = DelayLine::new(8);
        assert!(!c.swap_state(&mut b));
        assert_eq!(b.tap(1), 0.25);
    }
}
