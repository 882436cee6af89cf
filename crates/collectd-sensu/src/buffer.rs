// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::value_list::MeasurementLine;

/// Outcome of an [`MeasurementBuffer::enqueue`] call.
#[derive(Debug, PartialEq, Eq)]
pub enum FlushDecision {
    /// Thresholds not reached, nothing to deliver.
    Hold,
    /// The caller now owns this batch and must hand it to the flusher.
    Flush(Vec<MeasurementLine>),
}

#[derive(Debug)]
struct BufferState {
    pending: Vec<MeasurementLine>,
    last_flush_time: i64,
}

/// Pending measurement lines shared by every write caller.
///
/// A batch is cut when the flush interval has elapsed or the size threshold
/// is reached, and there is something to send. The pending vector is swapped
/// out under the lock so delivery happens without holding it; every line ends
/// up in exactly one batch.
#[derive(Debug)]
pub struct MeasurementBuffer {
    state: Mutex<BufferState>,
    flush_interval_secs: i64,
    flush_max_measurements: usize,
}

impl MeasurementBuffer {
    pub fn new(flush_interval_secs: u64, flush_max_measurements: usize) -> Self {
        Self::with_last_flush(flush_interval_secs, flush_max_measurements, now())
    }

    pub fn with_last_flush(
        flush_interval_secs: u64,
        flush_max_measurements: usize,
        last_flush_time: i64,
    ) -> Self {
        Self {
            state: Mutex::new(BufferState {
                pending: Vec::new(),
                last_flush_time,
            }),
            flush_interval_secs: i64::try_from(flush_interval_secs).unwrap_or(i64::MAX),
            flush_max_measurements,
        }
    }

    pub fn enqueue(&self, lines: Vec<MeasurementLine>) -> FlushDecision {
        self.enqueue_at(lines, now())
    }

    /// Appends `lines` and decides on a flush as of `now` (epoch seconds).
    pub fn enqueue_at(&self, lines: Vec<MeasurementLine>, now: i64) -> FlushDecision {
        let mut state = self.lock();
        state.pending.extend(lines);

        let elapsed = now.saturating_sub(state.last_flush_time);
        let size = state.pending.len();
        let due = elapsed >= self.flush_interval_secs || size >= self.flush_max_measurements;
        if !due || size == 0 {
            return FlushDecision::Hold;
        }

        state.last_flush_time = now;
        FlushDecision::Flush(std::mem::take(&mut state.pending))
    }

    /// Takes everything pending regardless of thresholds.
    pub fn drain(&self) -> Vec<MeasurementLine> {
        let mut state = self.lock();
        state.last_flush_time = now();
        std::mem::take(&mut state.pending)
    }

    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock cannot leave the vector half-updated.
    fn lock(&self) -> MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Wall clock epoch seconds. A backwards jump only delays the next timed flush.
pub fn now() -> i64 {
    std::time::UNIX_EPOCH
        .elapsed()
        .map(|elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
