//! Text rendering of a stats tree.

use super::{Counter, Stats};
use crate::platform::Platform;
use load_common::{format_clock, format_hms};
use regex::Regex;
use std::sync::OnceLock;

const HEADER: [&str; 21] = [
    "platform",
    "type",
    "name",
    "status",
    "start-time",
    "start-time-long",
    "finished-time",
    "finished-time-long",
    "duration",
    "duration-long",
    "process-duration",
    "process-duration-long",
    "read-duration",
    "read-duration-long",
    "write-duration",
    "write-duration-long",
    "user-duration",
    "user-duration-long",
    "cpu-duration",
    "cpu-duration-long",
    "children",
];

fn sequence_tag() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\(\d+/\d+\)) ").expect("valid sequence pattern"))
}

/// Renders a cascade's stats either as an indented display block per level or
/// as tab-separated records under a fixed header.
pub struct StatsPrinter<'a> {
    platform: &'a dyn Platform,
    single_line: bool,
}

impl<'a> StatsPrinter<'a> {
    pub fn new(platform: &'a dyn Platform, single_line: bool) -> Self {
        Self {
            platform,
            single_line,
        }
    }

    /// Render the whole tree rooted at a cascade record.
    pub fn render(&self, cascade: &Stats) -> Vec<String> {
        let mut lines = Vec::new();
        if self.single_line {
            lines.push(HEADER.join("\t"));
        }

        self.summary(&mut lines, cascade, None);
        for flow in cascade.children() {
            self.separator(&mut lines);
            self.summary(&mut lines, flow, None);

            for step in flow.children() {
                self.separator(&mut lines);
                let step_name = self.unique_name(step, flow.name());
                self.summary(&mut lines, step, Some(step_name));

                for node in step.children() {
                    self.separator(&mut lines);
                    // nodes are prefixed with the step's own name, not its unique one
                    let node_name = self.unique_name(node, step.name());
                    self.summary(&mut lines, node, Some(node_name));
                }
            }
        }
        lines
    }

    fn separator(&self, lines: &mut Vec<String>) {
        if !self.single_line {
            lines.push(String::new());
        }
    }

    fn unique_name(&self, stats: &Stats, parent: &str) -> String {
        let name = stats.name();
        if !self.single_line {
            return name.to_string();
        }
        match sequence_tag().find(name) {
            Some(tag) => format!("{} {}", parent, tag.as_str()),
            None => format!("{parent}{name}"),
        }
    }

    fn summary(&self, lines: &mut Vec<String>, stats: &Stats, name: Option<String>) {
        let name = name.unwrap_or_else(|| stats.name().to_string());
        let durations = Durations::of(self.platform, stats);

        if self.single_line {
            lines.push(
                [
                    self.platform.name().to_string(),
                    stats.kind().to_string(),
                    name,
                    stats.status().to_string(),
                    format_clock(stats.start_millis()),
                    stats.start_millis().to_string(),
                    format_clock(stats.finish_millis()),
                    stats.finish_millis().to_string(),
                    format_hms(durations.total),
                    durations.total.to_string(),
                    format_hms(durations.process),
                    durations.process.to_string(),
                    format_hms(durations.read),
                    durations.read.to_string(),
                    format_hms(durations.write),
                    durations.write.to_string(),
                    format_hms(durations.user),
                    durations.user.to_string(),
                    format_hms(durations.cpu),
                    durations.cpu.to_string(),
                    stats.children().len().to_string(),
                ]
                .join("\t"),
            );
            return;
        }

        lines.push(format!("{}: {}", stats.kind(), name));
        lines.push(format!("  finish status: {}", stats.status()));
        lines.push(format!("  start:    {}", format_clock(stats.start_millis())));
        lines.push(format!("  finished: {}", format_clock(stats.finish_millis())));
        lines.push(format!("  duration: {}", format_hms(durations.total)));
        lines.push(format!("  process duration: {}", format_hms(durations.process)));
        lines.push(format!("  read duration: {}", format_hms(durations.read)));
        lines.push(format!("  write duration: {}", format_hms(durations.write)));
        lines.push(format!("  user duration: {}", format_hms(durations.user)));
        if !stats.children().is_empty() {
            lines.push(format!("  num children: {}", stats.children().len()));
        }
    }
}

/// Whole seconds per duration column.
struct Durations {
    total: i64,
    process: i64,
    read: i64,
    write: i64,
    user: i64,
    cpu: i64,
}

impl Durations {
    fn of(platform: &dyn Platform, stats: &Stats) -> Self {
        let seconds = |millis: u64| (millis / 1000) as i64;
        let process = seconds(stats.counter(Counter::ProcessDuration));
        let read = seconds(stats.counter(Counter::ReadDuration));
        let write = seconds(stats.counter(Counter::WriteDuration));
        Self {
            total: seconds(stats.duration_millis()),
            process,
            read,
            write,
            user: process - read - write,
            cpu: seconds(platform.cpu_millis(stats)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::LocalPlatform;
    use crate::stats::{StatsKind, Status};

    fn cascade() -> Stats {
        let mut map = Stats::new(StatsKind::Node, "(1/2) map");
        map.add_counter(Counter::ProcessDuration, 125_000);
        map.add_counter(Counter::ReadDuration, 4_000);
        map.add_counter(Counter::WriteDuration, 1_000);
        map.mark_started_at(1_000);
        map.mark_finished_at(Status::Successful, 126_000);
        let mut reduce = Stats::new(StatsKind::Node, "(2/2) reduce");
        reduce.mark_started_at(1_000);
        reduce.mark_finished_at(Status::Successful, 2_000);

        let mut step = Stats::new(StatsKind::Step, "(1/1) count-sort");
        step.push_child(map);
        step.push_child(reduce);
        step.mark_started_at(1_000);
        step.mark_finished_at(Status::Successful, 126_000);

        let mut flow = Stats::new(StatsKind::Flow, "count-sort");
        flow.push_child(step);
        flow.mark_started_at(1_000);
        flow.mark_finished_at(Status::Successful, 126_000);

        let mut cascade = Stats::new(StatsKind::Cascade, "load");
        cascade.push_child(flow);
        cascade.mark_started_at(1_000);
        cascade.mark_finished_at(Status::Successful, 126_000);
        cascade.roll_up();
        cascade
    }

    #[test]
    fn test_single_line_records() {
        let platform = LocalPlatform::with_capacity(2);
        let lines = StatsPrinter::new(&platform, true).render(&cascade());

        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0].split('\t').count(), 21);
        assert!(lines[0].starts_with("platform\ttype\tname\tstatus"));

        let cascade: Vec<&str> = lines[1].split('\t').collect();
        assert_eq!(cascade.len(), 21);
        assert_eq!(&cascade[..4], &["local", "Cascade", "load", "SUCCESSFUL"]);
        assert_eq!(cascade[5], "1000");
        assert_eq!(cascade[8], "0:02:05");
        assert_eq!(cascade[9], "125");
        assert_eq!(cascade[16], "0:02:00");
        assert_eq!(cascade[17], "120");
        assert_eq!(cascade[19], "0");
        assert_eq!(cascade[20], "1");

        let step: Vec<&str> = lines[3].split('\t').collect();
        assert_eq!(step[1], "Step");
        assert_eq!(step[2], "count-sort (1/1) ");

        let map: Vec<&str> = lines[4].split('\t').collect();
        assert_eq!(map[2], "(1/1) count-sort (1/2) ");
        let reduce: Vec<&str> = lines[5].split('\t').collect();
        assert_eq!(reduce[2], "(1/1) count-sort (2/2) ");
        assert_eq!(reduce[20], "0");
    }

    #[test]
    fn test_untagged_names_are_prefixed() {
        let platform = LocalPlatform::with_capacity(1);
        let mut step = Stats::new(StatsKind::Step, "plain");
        step.push_child(Stats::new(StatsKind::Node, "node"));
        let mut flow = Stats::new(StatsKind::Flow, "copy");
        flow.push_child(step);
        let mut cascade = Stats::new(StatsKind::Cascade, "load");
        cascade.push_child(flow);

        let lines = StatsPrinter::new(&platform, true).render(&cascade);
        assert_eq!(lines[3].split('\t').nth(2), Some("copyplain"));
        assert_eq!(lines[4].split('\t').nth(2), Some("plainnode"));
    }

    #[test]
    fn test_display_block() {
        let platform = LocalPlatform::with_capacity(2);
        let lines = StatsPrinter::new(&platform, false).render(&cascade());

        assert_eq!(lines[0], "Cascade: load");
        assert_eq!(lines[1], "  finish status: SUCCESSFUL");
        assert_eq!(lines[4], "  duration: 0:02:05");
        assert_eq!(lines[5], "  process duration: 0:02:05");
        assert_eq!(lines[6], "  read duration: 0:00:04");
        assert_eq!(lines[7], "  write duration: 0:00:01");
        assert_eq!(lines[8], "  user duration: 0:02:00");
        assert_eq!(lines[9], "  num children: 1");
        assert_eq!(lines[10], "");
        assert_eq!(lines[11], "Flow: count-sort");
        assert!(lines.contains(&"Step: (1/1) count-sort".to_string()));
        assert!(lines.contains(&"Node: (2/2) reduce".to_string()));
        // leaf nodes carry no child count
        assert_eq!(lines.last().map(String::as_str), Some("  user duration: 0:00:00"));
    }
}
