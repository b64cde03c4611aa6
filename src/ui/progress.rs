//! Progress indicators for task execution
//!
//! Uses `linya` for allocation-free, concurrency-optimized progress bars.
//! Tasks of one wave finish on different worker threads, so the bar is shared behind a mutex.

use linya::{Bar, Progress};
use std::sync::{Arc, Mutex};

/// Thread-safe progress bar counting finished tasks
#[derive(Clone)]
pub struct BuildProgress {
  progress: Arc<Mutex<Progress>>,
  bar: Arc<Bar>,
}

impl BuildProgress {
  /// Create a new progress bar with a label and total
  pub fn new(total: usize, label: impl Into<String>) -> Self {
    let mut progress = Progress::new();
    let bar = progress.bar(total, label.into());
    Self {
      progress: Arc::new(Mutex::new(progress)),
      bar: Arc::new(bar),
    }
  }

  /// Increment by 1 (thread-safe); a poisoned lock only loses the redraw
  pub fn inc(&self) {
    if let Ok(mut progress) = self.progress.lock() {
      progress.inc_and_draw(&self.bar, 1);
    }
  }
}
