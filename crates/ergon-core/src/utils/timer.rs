// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A small wall-clock stopwatch for timing dispatch and readback paths.

use std::time::{Duration, Instant};

/// Measures elapsed wall-clock time from its creation or last restart.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    /// Starts a new stopwatch.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Resets the reference point to now.
    pub fn restart(&mut self) {
        self.start = Instant::now();
    }

    /// Elapsed time since the reference point.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Elapsed time in fractional milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_is_monotonic() {
        let watch = Stopwatch::new();
        let first = watch.elapsed();
        let second = watch.elapsed();
        assert!(second >= first);
        assert!(watch.elapsed_ms() >= 0.0);
    }
}
