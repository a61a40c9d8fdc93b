/// Workflow bottleneck detection
///
/// Three independent checks over a repository's history:
/// - task types whose cycle time runs long
/// - open tasks that hold up a chain of dependents, and dependency cycles
/// - times of day where sessions are consistently unproductive

use crate::config::BottleneckConfig;
use crate::db::models::{Session, Task, TaskStatus, TaskType};
use crate::intelligence::context_detector::TimeOfDay;
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

// Blocked tasks without an estimate count as this many hours
const DEFAULT_BLOCKED_HOURS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BottleneckKind {
    CycleTime,
    Dependency,
    DependencyCycle,
    TimeOfDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Severity for an impact in hours lost
    pub fn from_impact(hours: f64) -> Self {
        if hours > 24.0 {
            Severity::Critical
        } else if hours > 8.0 {
            Severity::High
        } else if hours > 2.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bottleneck {
    pub kind: BottleneckKind,
    pub description: String,
    /// Estimated hours lost
    pub impact: f64,
    pub frequency: usize,
    pub severity: Severity,
    pub suggestions: Vec<String>,
    pub affected_tasks: Vec<String>,
    pub detected_at: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

pub struct BottleneckDetector {
    config: BottleneckConfig,
}

impl BottleneckDetector {
    pub fn new(config: BottleneckConfig) -> Self {
        Self { config }
    }

    /// All bottlenecks, largest impact first
    pub fn detect(&self, tasks: &[Task], sessions: &[Session], now: DateTime<Utc>) -> Vec<Bottleneck> {
        let mut bottlenecks = self.cycle_time_bottlenecks(tasks, now);
        bottlenecks.extend(self.dependency_bottlenecks(tasks, now));
        bottlenecks.extend(self.time_bottlenecks(sessions, now));

        bottlenecks.sort_by(|a, b| b.impact.total_cmp(&a.impact));
        bottlenecks
    }

    pub fn cycle_time_bottlenecks(&self, tasks: &[Task], now: DateTime<Utc>) -> Vec<Bottleneck> {
        let mut by_type: BTreeMap<TaskType, Vec<(&Task, f64)>> = BTreeMap::new();
        for task in tasks.iter().filter(|t| t.is_completed()) {
            if let Some(minutes) = task.duration_minutes().filter(|m| *m > 0.0) {
                by_type.entry(task.inferred_type()).or_default().push((task, minutes / 60.0));
            }
        }

        by_type
            .into_iter()
            .filter(|(_, samples)| samples.len() >= self.config.min_samples)
            .filter_map(|(task_type, samples)| {
                let count = samples.len();
                let avg_hours = samples.iter().map(|(_, h)| h).sum::<f64>() / count as f64;
                if avg_hours <= self.config.cycle_time_threshold_hours {
                    return None;
                }

                let impact = avg_hours * count as f64;
                Some(Bottleneck {
                    kind: BottleneckKind::CycleTime,
                    description: format!(
                        "Tasks of type '{}' take {:.1} hours on average",
                        task_type, avg_hours
                    ),
                    impact,
                    frequency: count,
                    severity: Severity::from_impact(impact),
                    suggestions: vec![
                        "Break down complex tasks into smaller subtasks".to_string(),
                        "Identify and eliminate blockers".to_string(),
                        "Consider automation opportunities".to_string(),
                    ],
                    affected_tasks: samples.iter().map(|(t, _)| t.id.clone()).collect(),
                    detected_at: now,
                    metadata: serde_json::json!({
                        "task_type": task_type.as_str(),
                        "avg_hours": avg_hours,
                    }),
                })
            })
            .collect()
    }

    /// Unfinished tasks that block at least `min_blocked_tasks` open tasks,
    /// directly or transitively, plus every dependency cycle
    pub fn dependency_bottlenecks(&self, tasks: &[Task], now: DateTime<Utc>) -> Vec<Bottleneck> {
        let by_id: HashMap<&str, &Task> = tasks.iter().map(|t| (t.id.as_str(), t)).collect();

        // blocker id -> tasks waiting on it
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for task in tasks {
            for dependency in &task.dependencies {
                if by_id.contains_key(dependency.as_str()) {
                    dependents
                        .entry(dependency.as_str())
                        .or_default()
                        .push(task.id.as_str());
                }
            }
        }

        let mut bottlenecks = Vec::new();

        for task in tasks.iter().filter(|t| is_open(t)) {
            let blocked: Vec<&Task> = reachable(task.id.as_str(), &dependents)
                .into_iter()
                .filter_map(|id| by_id.get(id).copied())
                .filter(|t| is_open(t))
                .collect();

            if blocked.is_empty() || blocked.len() < self.config.min_blocked_tasks {
                continue;
            }

            let impact: f64 = blocked.iter().map(|t| estimated_hours(t)).sum();
            bottlenecks.push(Bottleneck {
                kind: BottleneckKind::Dependency,
                description: format!("'{}' is blocking {} open tasks", task.content, blocked.len()),
                impact,
                frequency: blocked.len(),
                severity: Severity::from_impact(impact),
                suggestions: vec![
                    "Prioritize the blocking task".to_string(),
                    "Split out the parts other tasks actually depend on".to_string(),
                ],
                affected_tasks: blocked.iter().map(|t| t.id.clone()).collect(),
                detected_at: now,
                metadata: serde_json::json!({
                    "blocking_task": task.id,
                    "blocked": blocked.len(),
                }),
            });
        }

        for cycle in find_cycles(tasks, &by_id) {
            let impact: f64 = cycle
                .iter()
                .filter_map(|id| by_id.get(id.as_str()))
                .map(|t| estimated_hours(t))
                .sum();

            bottlenecks.push(Bottleneck {
                kind: BottleneckKind::DependencyCycle,
                description: format!("{} tasks depend on each other in a cycle", cycle.len()),
                impact,
                frequency: cycle.len(),
                severity: Severity::Critical,
                suggestions: vec!["Remove one dependency to break the cycle".to_string()],
                affected_tasks: cycle.clone(),
                detected_at: now,
                metadata: serde_json::json!({ "cycle": cycle }),
            });
        }

        bottlenecks
    }

    /// Times of day whose sessions average below the productivity threshold
    pub fn time_bottlenecks(&self, sessions: &[Session], now: DateTime<Utc>) -> Vec<Bottleneck> {
        let mut slots: BTreeMap<u8, (TimeOfDay, Vec<&Session>)> = BTreeMap::new();
        for session in sessions {
            let time_of_day = TimeOfDay::from_hour(session.start_time.hour());
            slots
                .entry(slot_order(time_of_day))
                .or_insert_with(|| (time_of_day, Vec::new()))
                .1
                .push(session);
        }

        slots
            .into_values()
            .filter(|(_, group)| group.len() >= self.config.min_samples)
            .filter_map(|(time_of_day, group)| {
                let count = group.len() as f64;
                let avg = group.iter().map(|s| s.productivity_score).sum::<f64>() / count;
                if avg >= self.config.low_productivity_threshold {
                    return None;
                }

                let hours: f64 = group.iter().map(|s| s.duration_hours().max(0.0)).sum();
                let impact = hours * (1.0 - avg.clamp(0.0, 1.0));

                Some(Bottleneck {
                    kind: BottleneckKind::TimeOfDay,
                    description: format!(
                        "Sessions in the {} average {:.0}% productivity",
                        time_of_day,
                        avg * 100.0
                    ),
                    impact,
                    frequency: group.len(),
                    severity: Severity::from_impact(impact),
                    suggestions: vec![
                        format!("Schedule routine work for the {}", time_of_day),
                        "Move focused work to your most productive hours".to_string(),
                    ],
                    affected_tasks: Vec::new(),
                    detected_at: now,
                    metadata: serde_json::json!({
                        "time_of_day": time_of_day,
                        "avg_productivity": avg,
                        "sessions": group.len(),
                    }),
                })
            })
            .collect()
    }
}

fn is_open(task: &Task) -> bool {
    !matches!(task.status, TaskStatus::Completed | TaskStatus::Cancelled)
}

fn estimated_hours(task: &Task) -> f64 {
    task.estimated_mins
        .map(|m| m as f64 / 60.0)
        .unwrap_or(DEFAULT_BLOCKED_HOURS)
}

fn slot_order(time_of_day: TimeOfDay) -> u8 {
    match time_of_day {
        TimeOfDay::Morning => 0,
        TimeOfDay::Afternoon => 1,
        TimeOfDay::Evening => 2,
        TimeOfDay::Night => 3,
    }
}

/// Every task reachable from `start` through `edges`, excluding `start`
fn reachable<'a>(start: &'a str, edges: &HashMap<&'a str, Vec<&'a str>>) -> Vec<&'a str> {
    let mut seen: HashSet<&str> = HashSet::from([start]);
    let mut queue: VecDeque<&str> = VecDeque::from([start]);
    let mut found = Vec::new();

    while let Some(current) = queue.pop_front() {
        for &next in edges.get(current).into_iter().flatten() {
            if seen.insert(next) {
                found.push(next);
                queue.push_back(next);
            }
        }
    }

    found
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Dependency cycles, each reported once as the ids on the cycle
fn find_cycles(tasks: &[Task], by_id: &HashMap<&str, &Task>) -> Vec<Vec<String>> {
    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut reported: HashSet<Vec<String>> = HashSet::new();
    let mut cycles = Vec::new();

    for task in tasks {
        if marks.contains_key(task.id.as_str()) {
            continue;
        }

        // Iterative DFS: (node, index of the next dependency to visit)
        let mut stack: Vec<(&str, usize)> = vec![(task.id.as_str(), 0)];
        let mut path: Vec<&str> = vec![task.id.as_str()];
        marks.insert(task.id.as_str(), Mark::Visiting);

        while let Some((node, next)) = stack.last_mut() {
            let dependencies = by_id.get(*node).map(|t| t.dependencies.as_slice()).unwrap_or(&[]);

            let Some(dependency) = dependencies.get(*next) else {
                marks.insert(*node, Mark::Done);
                stack.pop();
                path.pop();
                continue;
            };
            *next += 1;

            let Some(target) = by_id.get(dependency.as_str()).map(|t| t.id.as_str()) else {
                continue;
            };

            match marks.get(target) {
                Some(Mark::Visiting) => {
                    let start = path.iter().position(|id| *id == target).unwrap_or(0);
                    let cycle: Vec<String> = path[start..].iter().map(|id| id.to_string()).collect();
                    let mut key = cycle.clone();
                    key.sort();
                    if reported.insert(key) {
                        cycles.push(cycle);
                    }
                }
                Some(Mark::Done) => {}
                None => {
                    marks.insert(target, Mark::Visiting);
                    stack.push((target, 0));
                    path.push(target);
                }
            }
        }
    }

    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn completed(content: &str, task_type: TaskType, minutes: u32) -> Task {
        let mut task = Task::new("acme/api", content);
        task.task_type = Some(task_type);
        task.status = TaskStatus::Completed;
        task.actual_mins = Some(minutes);
        task
    }

    fn open(id: &str, dependencies: &[&str]) -> Task {
        let mut task = Task::new("acme/api", format!("task {}", id));
        task.id = id.to_string();
        task.dependencies = dependencies.iter().map(|d| d.to_string()).collect();
        task
    }

    fn detector() -> BottleneckDetector {
        BottleneckDetector::new(BottleneckConfig::default())
    }

    #[test]
    fn test_severity_bands() {
        assert_eq!(Severity::from_impact(1.0), Severity::Low);
        assert_eq!(Severity::from_impact(3.0), Severity::Medium);
        assert_eq!(Severity::from_impact(9.0), Severity::High);
        assert_eq!(Severity::from_impact(25.0), Severity::Critical);
    }

    #[test]
    fn test_slow_task_type_flagged() {
        let tasks = vec![
            completed("review a", TaskType::Review, 240),
            completed("review b", TaskType::Review, 180),
            completed("review c", TaskType::Review, 300),
            completed("fix a", TaskType::Bugfix, 30),
            completed("fix b", TaskType::Bugfix, 30),
            completed("fix c", TaskType::Bugfix, 30),
        ];

        let found = detector().cycle_time_bottlenecks(&tasks, base());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, BottleneckKind::CycleTime);
        assert!((found[0].impact - 12.0).abs() < 1e-9);
        assert_eq!(found[0].severity, Severity::High);
        assert_eq!(found[0].affected_tasks.len(), 3);
    }

    #[test]
    fn test_too_few_samples_not_flagged() {
        let tasks = vec![
            completed("review a", TaskType::Review, 600),
            completed("review b", TaskType::Review, 600),
        ];
        assert!(detector().cycle_time_bottlenecks(&tasks, base()).is_empty());
    }

    #[test]
    fn test_transitive_blocker() {
        // a blocks b, b blocks c and d
        let mut tasks = vec![open("a", &[]), open("b", &["a"]), open("c", &["b"]), open("d", &["b"])];
        tasks[2].estimated_mins = Some(120);

        let found = detector().dependency_bottlenecks(&tasks, base());
        let a = found
            .iter()
            .find(|b| b.metadata["blocking_task"] == "a")
            .expect("a is a bottleneck");
        assert_eq!(a.frequency, 3);
        // b and d default to an hour, c is estimated at two
        assert!((a.impact - 4.0).abs() < 1e-9);

        let b = found.iter().find(|b| b.metadata["blocking_task"] == "b").expect("b too");
        assert_eq!(b.frequency, 2);
        assert!(found.iter().all(|b| b.kind == BottleneckKind::Dependency));
    }

    #[test]
    fn test_finished_blocker_ignored() {
        let mut tasks = vec![open("a", &[]), open("b", &["a"]), open("c", &["a"])];
        tasks[0].status = TaskStatus::Completed;
        assert!(detector().dependency_bottlenecks(&tasks, base()).is_empty());
    }

    #[test]
    fn test_dependency_cycle_reported_once() {
        let tasks = vec![open("a", &["c"]), open("b", &["a"]), open("c", &["b"]), open("d", &[])];

        let cycles: Vec<Bottleneck> = detector()
            .dependency_bottlenecks(&tasks, base())
            .into_iter()
            .filter(|b| b.kind == BottleneckKind::DependencyCycle)
            .collect();

        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].severity, Severity::Critical);
        let mut members = cycles[0].affected_tasks.clone();
        members.sort();
        assert_eq!(members, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let tasks = vec![open("a", &["a"])];
        let found = detector().dependency_bottlenecks(&tasks, base());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, BottleneckKind::DependencyCycle);
    }

    #[test]
    fn test_unproductive_evenings() {
        let mut sessions = Vec::new();
        for day in 0..3 {
            let mut evening = Session::new("acme/api", base() + Duration::days(day) + Duration::hours(10), 0.2);
            evening.duration_mins = 120.0;
            sessions.push(evening);
            let mut morning = Session::new("acme/api", base() + Duration::days(day), 0.9);
            morning.duration_mins = 120.0;
            sessions.push(morning);
        }

        let found = detector().time_bottlenecks(&sessions, base());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, BottleneckKind::TimeOfDay);
        assert_eq!(found[0].metadata["time_of_day"], "evening");
        // six hours at 20% productivity
        assert!((found[0].impact - 4.8).abs() < 1e-9);
    }

    #[test]
    fn test_detect_sorts_by_impact() {
        let tasks = vec![
            completed("review a", TaskType::Review, 600),
            completed("review b", TaskType::Review, 600),
            completed("review c", TaskType::Review, 600),
            open("x", &[]),
            open("y", &["x"]),
            open("z", &["x"]),
        ];

        let found = detector().detect(&tasks, &[], base());
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].kind, BottleneckKind::CycleTime);
        assert!(found[0].impact >= found[1].impact);
    }

    #[test]
    fn test_empty_history() {
        assert!(detector().detect(&[], &[], base()).is_empty());
    }
}
