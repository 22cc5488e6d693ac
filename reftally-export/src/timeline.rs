//! Plain-log rendering

use crate::loader::TimelineEvent;

/// Tab-separated relative-time log, one line per event
///
/// Line shape is `{seconds}\t{plus}\t{total}\t{minus}` with times relative
/// to the first event at millisecond precision. No header; empty input
/// yields an empty document.
pub fn render_plain_log(events: &[TimelineEvent]) -> String {
    let Some(first) = events.first() else {
        return String::new();
    };
    let mut lines = Vec::with_capacity(events.len());
    for event in events {
        let seconds = (event.dt - first.dt).num_milliseconds() as f64 / 1000.0;
        lines.push(format!(
            "{seconds:.3}\t{}\t{}\t{}",
            event.plus, event.total, event.minus
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn at(millis: i64, plus: i32, total: i32, minus: i32) -> TimelineEvent {
        let base = NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        TimelineEvent {
            dt: base + Duration::milliseconds(millis),
            plus,
            minus,
            total,
        }
    }

    #[test]
    fn one_line_per_event_with_relative_times() {
        let events = [at(0, 1, 1, 0), at(500, 2, 2, 0), at(1250, 3, 3, 0)];
        let rendered = render_plain_log(&events);
        assert_eq!(
            rendered,
            "0.000\t1\t1\t0\n0.500\t2\t2\t0\n1.250\t3\t3\t0"
        );
    }

    #[test]
    fn empty_timeline_renders_empty_document() {
        assert_eq!(render_plain_log(&[]), "");
    }
}
