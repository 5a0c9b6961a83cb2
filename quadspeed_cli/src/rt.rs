//! Real-time setup for the capture path (Linux SCHED_FIFO + mlockall).
//!
//! Applied once, before the capture thread is spawned, so the thread inherits
//! the scheduling policy and priority. Once it runs, the calling thread, which
//! goes on to run the estimator, steps one level below so it can never hold
//! edge capture off. Every failure is a warning: the meter still works without
//! real-time guarantees, it just sees more jitter.

use crate::cli::RtLock;

/// Lock memory and switch the calling thread to SCHED_FIFO at the capture
/// priority. Returns that priority when it was applied.
#[cfg(target_os = "linux")]
pub fn setup_rt_once(prio: Option<i32>, lock: RtLock) -> Option<i32> {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<Option<i32>> = OnceLock::new();

    *RT_ONCE.get_or_init(|| {
        match lock_memory(lock) {
            Ok(()) => tracing::info!(?lock, "memory locked"),
            Err(err) => tracing::warn!(error = %err, "mlockall failed"),
        }
        let (min, max) = fifo_range();
        let (capture, _) = fifo_priorities(prio, min, max);
        match set_fifo_priority(capture) {
            Ok(()) => {
                tracing::info!(priority = capture, "SCHED_FIFO enabled");
                Some(capture)
            }
            Err(err) => {
                tracing::warn!(error = %err, "SCHED_FIFO not applied");
                None
            }
        }
    })
}

/// Drop the calling thread one FIFO level below the capture thread.
#[cfg(target_os = "linux")]
pub fn lower_estimator_priority(capture: i32) {
    let (min, max) = fifo_range();
    let (capture, estimator) = fifo_priorities(Some(capture), min, max);
    match set_fifo_priority(estimator) {
        Ok(()) => tracing::info!(
            capture_priority = capture,
            estimator_priority = estimator,
            "real-time priorities applied"
        ),
        Err(err) => tracing::warn!(error = %err, "estimator priority not lowered"),
    }
}

#[cfg(not(target_os = "linux"))]
pub fn setup_rt_once(_prio: Option<i32>, _lock: RtLock) -> Option<i32> {
    tracing::warn!("real-time mode is only supported on Linux; continuing without it");
    None
}

#[cfg(not(target_os = "linux"))]
pub fn lower_estimator_priority(_capture: i32) {}

#[cfg(target_os = "linux")]
fn lock_memory(lock: RtLock) -> eyre::Result<()> {
    use libc::{MCL_CURRENT, MCL_FUTURE, mlockall};

    let flags = match lock {
        RtLock::None => return Ok(()),
        RtLock::Current => MCL_CURRENT,
        RtLock::All => MCL_CURRENT | MCL_FUTURE,
    };
    // SAFETY: mlockall takes no pointers.
    if unsafe { mlockall(flags) } == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    let retryable = matches!(err.raw_os_error(), Some(c) if c == libc::EPERM || c == libc::ENOMEM);

    // all -> current is worth one retry
    if matches!(lock, RtLock::All) && retryable {
        // SAFETY: as above.
        if unsafe { mlockall(MCL_CURRENT) } == 0 {
            tracing::warn!(error = %err, "mlockall(current|future) failed, locked current pages only");
            return Ok(());
        }
    }

    let mut msg = format!("{err}");
    if retryable {
        if let Some(limit) = memlock_limit() {
            msg.push_str(&format!("; {limit}"));
        }
        msg.push_str("; needs CAP_IPC_LOCK (or root) and a sufficient 'ulimit -l'");
    }
    Err(eyre::eyre!(msg))
}

#[cfg(target_os = "linux")]
fn memlock_limit() -> Option<String> {
    let mut rlim = std::mem::MaybeUninit::<libc::rlimit>::uninit();
    // SAFETY: getrlimit writes a full rlimit on success.
    let r = unsafe {
        if libc::getrlimit(libc::RLIMIT_MEMLOCK, rlim.as_mut_ptr()) != 0 {
            return None;
        }
        rlim.assume_init()
    };
    if r.rlim_cur == libc::RLIM_INFINITY {
        Some("memlock limit: unlimited".to_string())
    } else {
        Some(format!("memlock limit: {} KiB", r.rlim_cur / 1024))
    }
}

/// SCHED_FIFO priority bounds, `1..=99` when the query fails.
#[cfg(target_os = "linux")]
fn fifo_range() -> (i32, i32) {
    use libc::{SCHED_FIFO, sched_get_priority_max, sched_get_priority_min};

    // SAFETY: plain queries without pointers.
    let (min, max) = unsafe { (sched_get_priority_min(SCHED_FIFO), sched_get_priority_max(SCHED_FIFO)) };
    if min < 0 || max < 0 { (1, 99) } else { (min, max) }
}

/// `(capture, estimator)` priorities. The request (default: the maximum) is
/// clamped to leave room for the estimator one level below it.
#[cfg(target_os = "linux")]
fn fifo_priorities(requested: Option<i32>, min: i32, max: i32) -> (i32, i32) {
    let floor = min.saturating_add(1).min(max);
    let capture = requested.unwrap_or(max).clamp(floor, max);
    (capture, (capture - 1).max(min))
}

/// Switch the calling thread to SCHED_FIFO at `priority`.
#[cfg(target_os = "linux")]
fn set_fifo_priority(priority: i32) -> eyre::Result<()> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` outlives the call; pid 0 is the calling thread.
    let rc = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if rc == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::EPERM) {
        // SAFETY: geteuid cannot fail.
        let euid = unsafe { libc::geteuid() };
        eyre::bail!(
            "{err}; SCHED_FIFO needs CAP_SYS_NICE or root (euid {euid}); try 'sudo setcap cap_sys_nice=ep <binary>'"
        );
    }
    Err(eyre::eyre!(err))
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    #[test]
    fn capture_outranks_estimator() {
        assert_eq!(fifo_priorities(None, 1, 99), (99, 98));
        assert_eq!(fifo_priorities(Some(50), 1, 99), (50, 49));
    }

    #[test]
    fn lowest_request_leaves_room_below() {
        assert_eq!(fifo_priorities(Some(1), 1, 99), (2, 1));
        assert_eq!(fifo_priorities(Some(-3), 1, 99), (2, 1));
    }

    #[test]
    fn request_above_range_is_clamped() {
        assert_eq!(fifo_priorities(Some(500), 1, 99), (99, 98));
    }
}
