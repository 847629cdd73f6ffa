// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Forward-pass profiling metrics.
//!
//! Collected only when `RuntimeConfig::enable_profiling` is set; the
//! latest pass is available through `Context::last_metrics`.

use std::time::Duration;

use nnb_format::FunctionType;

use crate::BindingSource;

/// Timing of a single function node.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FunctionMetrics {
    /// Position in the function table.
    pub index: usize,
    pub function_type: FunctionType,
    /// Implementation that ran.
    pub source: BindingSource,
    /// Wall time of the execute routine.
    pub duration: Duration,
}

/// Metrics for one complete forward pass.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ForwardMetrics {
    /// Wall time of the whole pass.
    pub total_duration: Duration,
    /// Per-function timings, in execution order.
    pub functions: Vec<FunctionMetrics>,
}

impl ForwardMetrics {
    /// Creates an empty metrics container.
    pub fn new(num_functions: usize) -> Self {
        Self {
            total_duration: Duration::ZERO,
            functions: Vec::with_capacity(num_functions),
        }
    }

    /// Records one function's execution.
    pub fn record_function(
        &mut self,
        index: usize,
        function_type: FunctionType,
        source: BindingSource,
        duration: Duration,
    ) {
        self.functions.push(FunctionMetrics {
            index,
            function_type,
            source,
            duration,
        });
    }

    /// Finalises metrics with the pass's wall-clock time.
    pub fn finalise(&mut self, total: Duration) {
        self.total_duration = total;
    }

    /// Sum of the per-function execute times.
    pub fn compute_duration(&self) -> Duration {
        self.functions.iter().map(|f| f.duration).sum()
    }

    /// The slowest function, if any ran.
    pub fn slowest(&self) -> Option<&FunctionMetrics> {
        self.functions.iter().max_by_key(|f| f.duration)
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        let slowest = self
            .slowest()
            .map(|f| {
                format!(
                    ", slowest [{}] {} {:.3}ms",
                    f.index,
                    f.function_type,
                    f.duration.as_secs_f64() * 1000.0
                )
            })
            .unwrap_or_default();
        format!(
            "Forward: {:.3}ms total, {} functions, {:.3}ms in execute routines{}",
            self.total_duration.as_secs_f64() * 1000.0,
            self.functions.len(),
            self.compute_duration().as_secs_f64() * 1000.0,
            slowest,
        )
    }
}
