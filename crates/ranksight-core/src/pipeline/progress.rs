//! Progress tracking types for evaluation runs.
//!
//! These types provide structured progress information that can be used
//! to drive a progress bar, log milestones, or estimate remaining time.

use crate::search::types::QueryId;
use std::time::Instant;

/// Progress of a run over a list of queries.
#[derive(Debug, Clone, PartialEq)]
pub struct RunProgress {
    /// Queries finished so far (including failed ones)
    pub completed: usize,
    /// Total queries in this run
    pub total: usize,
    /// Queries that failed so far
    pub errors: usize,
    /// Time elapsed since start (milliseconds)
    pub elapsed_ms: u64,
    /// Query that was just finished
    pub current: Option<QueryId>,
}

impl RunProgress {
    /// Creates a new progress instance.
    pub fn new(completed: usize, total: usize, errors: usize, elapsed_ms: u64) -> Self {
        Self {
            completed,
            total,
            errors,
            elapsed_ms,
            current: None,
        }
    }

    /// Sets the query that was just finished.
    pub fn with_current(mut self, query_id: QueryId) -> Self {
        self.current = Some(query_id);
        self
    }

    /// Returns the completion percentage (0.0 to 100.0).
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.completed as f64 / self.total as f64) * 100.0
        }
    }

    /// Returns true if every query has been processed.
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }

    /// Returns estimated time remaining in milliseconds, if computable.
    pub fn estimated_remaining_ms(&self) -> Option<u64> {
        if self.completed == 0 || self.completed >= self.total {
            return None;
        }
        let remaining = self.total - self.completed;
        let ms_per_query = self.elapsed_ms / self.completed as u64;
        Some(remaining as u64 * ms_per_query)
    }
}

/// Helper for tracking elapsed time during a run.
pub struct ProgressTimer {
    start: Instant,
}

impl ProgressTimer {
    /// Creates a new timer starting now.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Returns elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for ProgressTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent() {
        let progress = RunProgress::new(25, 100, 0, 1000);
        assert!((progress.percent_complete() - 25.0).abs() < 0.01);
        assert!(!progress.is_complete());

        let progress = RunProgress::new(100, 100, 3, 2000);
        assert!(progress.is_complete());
    }

    #[test]
    fn test_progress_empty() {
        let progress = RunProgress::new(0, 0, 0, 0);
        assert!((progress.percent_complete() - 0.0).abs() < 0.01);
        assert!(progress.is_complete());
        assert_eq!(progress.estimated_remaining_ms(), None);
    }

    #[test]
    fn test_estimated_remaining() {
        // 20 queries in 1000ms = 50ms/query, 80 remaining = 4000ms
        let progress = RunProgress::new(20, 100, 0, 1000);
        assert_eq!(progress.estimated_remaining_ms(), Some(4000));
    }

    #[test]
    fn test_with_current() {
        let progress = RunProgress::new(1, 2, 0, 5).with_current(QueryId::from_u64(9));
        assert_eq!(progress.current, Some(QueryId::from_u64(9)));
    }
}
