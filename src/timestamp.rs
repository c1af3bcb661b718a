//! Process-wide monotonic, lexicographically-comparable timestamp source.
//!
//! The core treats `created`/`recorded` as opaque strings that compare correctly with
//! `<`/`>`. This module is the concrete implementation of that contract: nanoseconds
//! since the Unix epoch, zero-padded to a fixed width, with an in-process counter that
//! bumps past the last emitted value whenever the wall clock doesn't strictly advance.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// Width of the zero-padded decimal representation; wide enough for `u64::MAX` nanos.
const WIDTH: usize = 20;

static LAST: AtomicU64 = AtomicU64::new(0);

/// Produces a new timestamp, strictly greater (as a string) than any previously produced
/// one in this process, even when called twice within the same clock tick.
pub fn now() -> String {
    let mut observed = wall_clock_nanos();
    loop {
        let last = LAST.load(Ordering::SeqCst);
        let next = if observed <= last { last + 1 } else { observed };
        match LAST.compare_exchange_weak(last, next, Ordering::SeqCst, Ordering::SeqCst) {
            Ok(_) => return format!("{next:0width$}", width = WIDTH),
            Err(_) => observed = wall_clock_nanos(),
        }
    }
}

fn wall_clock_nanos() -> u64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(0).max(0) as u64
}
