use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use chrono::NaiveDateTime;

/// Starts the 1 Hz tick thread driving the evaluator.
///
/// The wall clock is read at tick time, not ahead of it, so a delayed
/// wakeup cannot make the handler see a stale instant. A panicking
/// handler is contained and the loop keeps ticking; nothing in the
/// engine may stop the clock short of the shutdown flag.
pub(crate) fn start_tick_loop<F>(shutdown: Arc<AtomicBool>, mut tick: F) -> JoinHandle<()>
where
    F: FnMut(NaiveDateTime) + Send + 'static,
{
    thread::spawn(move || {
        while !shutdown.load(Ordering::Relaxed) {
            let now = chrono::Local::now().naive_local();
            if panic::catch_unwind(AssertUnwindSafe(|| tick(now))).is_err() {
                log::error!("tick handler panicked; clock continues");
            }
            thread::sleep(Duration::from_secs(1));
        }
    })
}
