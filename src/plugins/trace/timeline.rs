//! Performance timeline of marks and measures, in milliseconds since the
//! timeline was created.

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

pub const ENTRY_MARK: &str = "mark";
pub const ENTRY_MEASURE: &str = "measure";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceEntry {
    pub name: String,
    #[serde(rename = "startTime")]
    pub start_time: f64,
    pub duration: f64,
    #[serde(rename = "entryType")]
    pub entry_type: String,
    pub timestamp: i64,
}

#[derive(Debug)]
pub struct Timeline {
    init: Instant,
    entries: Vec<PerformanceEntry>,
}

impl Timeline {
    pub fn new() -> Self {
        Self {
            init: Instant::now(),
            entries: Vec::new(),
        }
    }

    /// Milliseconds elapsed since the timeline started.
    pub fn now(&self) -> f64 {
        self.init.elapsed().as_secs_f64() * 1000.0
    }

    fn push(&mut self, entry: PerformanceEntry) -> PerformanceEntry {
        self.entries.push(entry.clone());
        self.entries.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        entry
    }

    pub fn mark(&mut self, name: impl Into<String>) -> PerformanceEntry {
        let entry = PerformanceEntry {
            name: name.into(),
            start_time: self.now(),
            duration: 0.0,
            entry_type: ENTRY_MARK.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        };
        self.push(entry)
    }

    /// Record the span between the latest `start` mark (or the timeline
    /// origin) and the latest `end` mark (or now).
    pub fn measure(
        &mut self,
        name: impl Into<String>,
        start: &str,
        end: Option<&str>,
    ) -> PerformanceEntry {
        let start_mark = self.last_named(start).cloned();
        let start_time = start_mark.as_ref().map_or(0.0, |m| m.start_time);
        let timestamp = start_mark
            .as_ref()
            .map_or_else(|| chrono::Utc::now().timestamp_millis(), |m| m.timestamp);

        let end_time = end
            .and_then(|end| self.last_named(end))
            .map_or_else(|| self.now(), |m| m.start_time);

        let entry = PerformanceEntry {
            name: name.into(),
            start_time,
            duration: end_time - start_time,
            entry_type: ENTRY_MEASURE.into(),
            timestamp,
        };
        self.push(entry)
    }

    fn last_named(&self, name: &str) -> Option<&PerformanceEntry> {
        self.entries.iter().rev().find(|e| e.name == name)
    }

    pub fn entries(&self) -> &[PerformanceEntry] {
        &self.entries
    }

    pub fn entries_by_type(&self, entry_type: &str) -> Vec<&PerformanceEntry> {
        self.entries
            .iter()
            .filter(|e| e.entry_type == entry_type)
            .collect()
    }

    /// Turn every `start:x` / `end:x` mark pair into a `measure:x` entry,
    /// unless that measure already exists.
    pub fn add_measures(&mut self) {
        let marks: Vec<String> = self
            .entries_by_type(ENTRY_MARK)
            .into_iter()
            .map(|e| e.name.clone())
            .collect();
        let measures: Vec<String> = self
            .entries_by_type(ENTRY_MEASURE)
            .into_iter()
            .map(|e| e.name.clone())
            .collect();

        for mark in &marks {
            let Some(base) = mark.strip_prefix("start:") else {
                continue;
            };
            let end_name = format!("end:{base}");
            let measure_name = format!("measure:{base}");
            if marks.contains(&end_name) && !measures.contains(&measure_name) {
                self.measure(measure_name, mark, Some(&end_name));
            }
        }
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn marks_are_ordered_by_start_time() {
        let mut timeline = Timeline::new();
        timeline.mark("first");
        tokio::time::sleep(Duration::from_millis(10)).await;
        timeline.mark("second");

        let names: Vec<&str> = timeline.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert!(timeline.entries()[1].start_time >= 10.0);
    }

    #[tokio::test(start_paused = true)]
    async fn measure_spans_named_marks() {
        let mut timeline = Timeline::new();
        timeline.mark("start:db");
        tokio::time::sleep(Duration::from_millis(250)).await;
        timeline.mark("end:db");

        let measure = timeline.measure("measure:db", "start:db", Some("end:db"));
        assert_eq!(measure.entry_type, ENTRY_MEASURE);
        assert!((measure.duration - 250.0).abs() < 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn measure_without_marks_spans_from_origin_to_now() {
        let mut timeline = Timeline::new();
        tokio::time::sleep(Duration::from_millis(40)).await;
        let measure = timeline.measure("whole", "missing", None);
        assert_eq!(measure.start_time, 0.0);
        assert!((measure.duration - 40.0).abs() < 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn add_measures_pairs_start_and_end_once() {
        let mut timeline = Timeline::new();
        timeline.mark("start:foobar");
        tokio::time::sleep(Duration::from_millis(5)).await;
        timeline.mark("end:foobar");
        timeline.mark("start:dangling");

        timeline.add_measures();
        timeline.add_measures();

        let measures = timeline.entries_by_type(ENTRY_MEASURE);
        assert_eq!(measures.len(), 1);
        assert_eq!(measures[0].name, "measure:foobar");
        assert!(timeline.entries().iter().any(|e| e.name == "start:dangling"));
    }

    #[test]
    fn entry_serializes_with_camel_case_keys() {
        let entry = PerformanceEntry {
            name: "x".into(),
            start_time: 1.5,
            duration: 0.0,
            entry_type: ENTRY_MARK.into(),
            timestamp: 7,
        };
        let json = serde_json::to_value(entry).unwrap();
        assert_eq!(json["startTime"], 1.5);
        assert_eq!(json["entryType"], "mark");
    }
}
