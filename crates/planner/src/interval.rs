use chmask_contracts::Window;
use chrono::{NaiveDateTime, TimeDelta};

/// Splits `[start, end)` into contiguous windows of `window_minutes`, the last one
/// clipped to `end`. An empty or inverted range yields no windows.
pub fn plan(start: NaiveDateTime, end: NaiveDateTime, window_minutes: u32) -> Vec<Window> {
    if start >= end || window_minutes == 0 {
        return Vec::new();
    }

    let step = TimeDelta::minutes(i64::from(window_minutes));
    let mut windows = Vec::new();
    let mut cursor = start;

    while cursor < end {
        let next = cursor
            .checked_add_signed(step)
            .map_or(end, |next| next.min(end));
        windows.push(Window {
            start: cursor,
            end: next,
        });
        cursor = next;
    }

    windows
}
