//! Poll cadence per snapshot kind.

use std::time::Duration;

use crate::types::SnapshotKind;

/// Delay before the out-of-band poll that follows a manual action.
pub const REFRESH_DEBOUNCE: Duration = Duration::from_millis(300);

const MAX_BACKOFF_DOUBLINGS: u32 = 3;
const MAX_INTERVAL_MS: u64 = 60_000;

/// `(kind, visible ms, hidden ms, backs off)`; `Unauthorized` is absent and
/// therefore halts polling.
const INTERVALS: &[(SnapshotKind, u64, u64, bool)] = &[
    (SnapshotKind::Playing, 2_000, 10_000, false),
    (SnapshotKind::Paused, 5_000, 15_000, false),
    (SnapshotKind::Idle, 10_000, 30_000, true),
    (SnapshotKind::NoDevice, 15_000, 30_000, true),
    (SnapshotKind::Error, 10_000, 30_000, true),
];

/// Delay until the next poll, or `None` when polling must stop until a new
/// authorization succeeds.
///
/// `streak` counts how many consecutive ticks before this one produced the
/// same kind; quiet kinds double their base per repeat, capped at one minute.
pub fn next_interval(kind: SnapshotKind, visible: bool, streak: u32) -> Option<Duration> {
    let &(_, shown, hidden, backs_off) = INTERVALS.iter().find(|(k, ..)| *k == kind)?;
    let base = if visible { shown } else { hidden };
    let ms = if backs_off {
        (base << streak.min(MAX_BACKOFF_DOUBLINGS)).min(MAX_INTERVAL_MS.max(base))
    } else {
        base
    };
    Some(Duration::from_millis(ms))
}
