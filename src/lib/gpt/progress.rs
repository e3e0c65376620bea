use alloc::string::String;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use spin::Mutex;

/// Receiver for progress updates from long reads.
///
/// Methods take `&self` so one monitor can be shared with a UI thread.
pub trait ProgressMonitor {
    /// `fraction` is clamped to `[0, 1]`.
    fn update_total_progress(&self, fraction: f64, message: &str);
    fn update_current_file(&self, name: &str);
    fn set_data_size(&self, total: u64);
    fn add_data_progress(&self, bytes: u64);
    fn signal_cancel(&self);
    fn cancel_signaled(&self) -> bool;
    /// Acknowledges that the reader stopped because of a cancel request.
    fn confirm_cancel(&self);
}

/// Ignores every update and never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressMonitor for NullProgress {
    fn update_total_progress(&self, _fraction: f64, _message: &str) {}
    fn update_current_file(&self, _name: &str) {}
    fn set_data_size(&self, _total: u64) {}
    fn add_data_progress(&self, _bytes: u64) {}
    fn signal_cancel(&self) {}
    fn cancel_signaled(&self) -> bool {
        false
    }
    fn confirm_cancel(&self) {}
}

/// Records the latest state of every update.
#[derive(Debug, Default)]
pub struct ProgressState {
    fraction_bits: AtomicU64,
    data_size: AtomicU64,
    data_done: AtomicU64,
    cancel_requested: AtomicBool,
    cancel_confirmed: AtomicBool,
    message: Mutex<String>,
    current_file: Mutex<String>,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fraction(&self) -> f64 {
        f64::from_bits(self.fraction_bits.load(Ordering::Acquire))
    }

    pub fn message(&self) -> String {
        self.message.lock().clone()
    }

    pub fn current_file(&self) -> String {
        self.current_file.lock().clone()
    }

    pub fn data_size(&self) -> u64 {
        self.data_size.load(Ordering::Acquire)
    }

    pub fn data_done(&self) -> u64 {
        self.data_done.load(Ordering::Acquire)
    }

    pub fn cancel_confirmed(&self) -> bool {
        self.cancel_confirmed.load(Ordering::Acquire)
    }
}

impl ProgressMonitor for ProgressState {
    fn update_total_progress(&self, fraction: f64, message: &str) {
        // NaN clamps to zero.
        let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
        self.fraction_bits.store(fraction.to_bits(), Ordering::Release);
        let mut m = self.message.lock();
        m.clear();
        m.push_str(message);
    }

    fn update_current_file(&self, name: &str) {
        let mut f = self.current_file.lock();
        f.clear();
        f.push_str(name);
    }

    fn set_data_size(&self, total: u64) {
        self.data_size.store(total, Ordering::Release);
    }

    fn add_data_progress(&self, bytes: u64) {
        self.data_done.fetch_add(bytes, Ordering::AcqRel);
    }

    fn signal_cancel(&self) {
        self.cancel_requested.store(true, Ordering::Release);
    }

    fn cancel_signaled(&self) -> bool {
        self.cancel_requested.load(Ordering::Acquire)
    }

    fn confirm_cancel(&self) {
        self.cancel_confirmed.store(true, Ordering::Release);
    }
}
