//! A cheap monotonic nanosecond clock: `clock_gettime`'s `CLOCK_MONOTONIC`
//! on Linux, a cached `mach_timebase_info` conversion of `mach_absolute_time`
//! on macOS. Every component that timestamps arrivals
//! (the extractor's `SlotHeader::arrival_timestamp_ns`, the reset
//! coordinator's events, the recorder/player's scheduling) shares this one
//! primitive rather than each calling `std::time::Instant` independently.

#[cfg(target_os = "linux")]
pub fn now_ns() -> u64 {
    let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
    unsafe {
        libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
    }
    ts.tv_sec as u64 * 1_000_000_000 + ts.tv_nsec as u64
}

#[cfg(target_os = "macos")]
pub fn now_ns() -> u64 {
    use std::sync::OnceLock;

    static TIMEBASE: OnceLock<mach2::mach_time::mach_timebase_info> = OnceLock::new();
    let info = TIMEBASE.get_or_init(|| {
        let mut info = mach2::mach_time::mach_timebase_info { numer: 0, denom: 0 };
        unsafe {
            mach2::mach_time::mach_timebase_info(&mut info);
        }
        info
    });

    let ticks = unsafe { mach2::mach_time::mach_absolute_time() };
    ticks * info.numer as u64 / info.denom as u64
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub fn now_ns() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_monotonic_across_two_calls() {
        let a = now_ns();
        let b = now_ns();
        assert!(b >= a);
    }
}
