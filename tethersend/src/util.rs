use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};

const STOP_SIGNAL_POLL: Duration = Duration::from_millis(50);

/// Sleep `duration`, waking up early if stop signal is raised. Return false
/// when interrupted.
pub fn sleep_unless_stopped(duration: Duration, stop_signal: &AtomicBool) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if stop_signal.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(STOP_SIGNAL_POLL.min(deadline - now));
    }
}
