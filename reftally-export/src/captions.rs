//! Caption track rendering
//!
//! Reconstructs what a scoreboard overlay would have shown while the log
//! was being recorded. TOTAL tracks the running total, SPLIT the
//! plus/minus pair; REALTIME re-derives per-click deltas and coalesces
//! rapid-fire clicks into burst captions.

use chrono::{Duration, NaiveDateTime};
use clap::ValueEnum;

use crate::loader::TimelineEvent;

/// Caption rendering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CaptionMode {
    /// Running total after every change
    Total,
    /// Plus/minus split after every change
    Split,
    /// Burst-clustered per-click deltas
    Realtime,
}

impl CaptionMode {
    /// Upper-case tag used in artifact file names
    pub fn label(&self) -> &'static str {
        match self {
            CaptionMode::Total => "TOTAL",
            CaptionMode::Split => "SPLIT",
            CaptionMode::Realtime => "REALTIME",
        }
    }
}

/// How long a caption stays up when nothing replaces it sooner
const DISPLAY_HOLD_MS: i64 = 1_000;

/// Clicks closer together than this merge into one burst
const BURST_WINDOW_MS: i64 = 300;

struct Caption {
    start: NaiveDateTime,
    end: NaiveDateTime,
    text: String,
}

/// Render one pair's caption document
///
/// Offsets are relative to the pair's first event, even when that event
/// produced no caption. Empty input yields an empty document.
pub fn render_captions(events: &[TimelineEvent], mode: CaptionMode) -> String {
    let Some(first) = events.first() else {
        return String::new();
    };
    let entries = match mode {
        CaptionMode::Total => change_captions(events, |e| e.total, |e| e.total.to_string()),
        CaptionMode::Split => change_captions(
            events,
            |e| (e.plus, e.minus),
            |e| format!("+{} / -{}", e.plus, e.minus),
        ),
        CaptionMode::Realtime => burst_captions(events),
    };
    assemble(&entries, first.dt)
}

/// Emit one caption per change of the compare value
///
/// Each caption holds for one second; when the next change lands inside
/// that hold, the previous caption's end is pulled up to the change time
/// so entries neither gap nor overlap.
fn change_captions<K, V, T>(events: &[TimelineEvent], key: K, text: T) -> Vec<Caption>
where
    K: Fn(&TimelineEvent) -> V,
    V: PartialEq,
    T: Fn(&TimelineEvent) -> String,
{
    let mut entries: Vec<Caption> = Vec::new();
    let mut prev: Option<V> = None;
    for event in events {
        let current = key(event);
        if prev.as_ref() == Some(&current) {
            continue;
        }
        if let Some(last) = entries.last_mut() {
            if event.dt - last.start < Duration::milliseconds(DISPLAY_HOLD_MS) {
                last.end = event.dt;
            }
        }
        entries.push(Caption {
            start: event.dt,
            end: event.dt + Duration::milliseconds(DISPLAY_HOLD_MS),
            text: text(event),
        });
        prev = Some(current);
    }
    entries
}

struct Burst {
    start: NaiveDateTime,
    last: NaiveDateTime,
    plus: i32,
    minus: i32,
}

impl Burst {
    fn close(self) -> Caption {
        let mut parts = Vec::new();
        if self.plus > 0 {
            parts.push(format!("+{}", self.plus));
        }
        if self.minus > 0 {
            parts.push(format!("-{}", self.minus));
        }
        Caption {
            start: self.start,
            end: self.last + Duration::milliseconds(DISPLAY_HOLD_MS),
            text: parts.join(" "),
        }
    }
}

/// Cluster per-event deltas into visible bursts
///
/// Deltas are re-derived against a rolling baseline of the cumulative
/// counters. A capture that starts mid-session (first event already
/// carrying counters beyond one click) seeds the baseline instead of
/// producing one giant opening caption. Zero-delta events advance the
/// baseline but leave burst state untouched.
fn burst_captions(events: &[TimelineEvent]) -> Vec<Caption> {
    let mut entries = Vec::new();
    let Some(first) = events.first() else {
        return entries;
    };
    let (mut base_plus, mut base_minus) = if first.plus.abs() > 1 || first.minus.abs() > 1 {
        (first.plus, first.minus)
    } else {
        (0, 0)
    };

    let mut open: Option<Burst> = None;
    for event in events {
        let delta_plus = event.plus - base_plus;
        let delta_minus = event.minus - base_minus;
        base_plus = event.plus;
        base_minus = event.minus;
        if delta_plus == 0 && delta_minus == 0 {
            continue;
        }

        match open.take() {
            Some(mut burst)
                if event.dt - burst.last < Duration::milliseconds(BURST_WINDOW_MS) =>
            {
                burst.plus += delta_plus;
                burst.minus += delta_minus;
                burst.last = event.dt;
                open = Some(burst);
            }
            finished => {
                if let Some(finished) = finished {
                    entries.push(finished.close());
                }
                open = Some(Burst {
                    start: event.dt,
                    last: event.dt,
                    plus: delta_plus,
                    minus: delta_minus,
                });
            }
        }
    }
    if let Some(finished) = open {
        entries.push(finished.close());
    }
    entries
}

/// Number surviving entries sequentially and assemble SubRip blocks
///
/// Entries with empty text (a burst netting to nothing) are dropped and
/// do not consume a block number.
fn assemble(entries: &[Caption], base: NaiveDateTime) -> String {
    let mut blocks: Vec<String> = Vec::new();
    for entry in entries {
        if entry.text.is_empty() {
            continue;
        }
        blocks.push(format!(
            "{}\n{} --> {}\n{}\n",
            blocks.len() + 1,
            format_srt_time(entry.start - base),
            format_srt_time(entry.end - base),
            entry.text
        ));
    }
    blocks.join("\n")
}

/// `HH:MM:SS,mmm` with whole seconds floored and the millisecond remainder
fn format_srt_time(offset: Duration) -> String {
    let total_seconds = offset.num_seconds();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    let millis = offset.num_milliseconds() % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}
