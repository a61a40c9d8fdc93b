/// Workflow detection
///
/// Tasks are grouped by the kind of project they belong to. For each big enough
/// group, the task types in the order they first show up are its workflow.

use crate::db::models::{Priority, Task};
use crate::intelligence::keywords;
use crate::intelligence::pattern::{DurationStats, PatternStep, PatternType, TaskPattern};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

// Keywords kept per workflow phase
const MAX_PHASE_KEYWORDS: usize = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ProjectKind {
    Bugfix,
    Feature,
    Refactor,
    Testing,
    General,
}

impl ProjectKind {
    pub fn infer(task: &Task) -> ProjectKind {
        let content = task.content.to_lowercase();

        if content.contains("bug") || content.contains("fix") {
            ProjectKind::Bugfix
        } else if content.contains("feature") || content.contains("add") {
            ProjectKind::Feature
        } else if content.contains("refactor") || content.contains("improve") {
            ProjectKind::Refactor
        } else if content.contains("test") {
            ProjectKind::Testing
        } else {
            ProjectKind::General
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectKind::Bugfix => "bugfix",
            ProjectKind::Feature => "feature",
            ProjectKind::Refactor => "refactor",
            ProjectKind::Testing => "testing",
            ProjectKind::General => "general",
        }
    }
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub fn group_by_kind(tasks: &[Task]) -> BTreeMap<ProjectKind, Vec<&Task>> {
    let mut groups: BTreeMap<ProjectKind, Vec<&Task>> = BTreeMap::new();
    for task in tasks {
        groups.entry(ProjectKind::infer(task)).or_default().push(task);
    }
    groups
}

/// Build one workflow pattern from a group of tasks of the same kind
pub fn analyze_group(
    repository: &str,
    kind: ProjectKind,
    group: &[&Task],
    total_tasks: usize,
) -> Option<TaskPattern> {
    if group.is_empty() {
        return None;
    }

    let mut ordered: Vec<&Task> = group.to_vec();
    ordered.sort_by_key(|t| t.created_at);

    // Distinct phases in order of first appearance
    let mut phases: Vec<PatternStep> = Vec::new();
    let mut index: HashMap<_, usize> = HashMap::new();
    let mut counts: Vec<usize> = Vec::new();
    let mut priorities: Vec<BTreeMap<Priority, usize>> = Vec::new();

    for task in &ordered {
        let task_type = task.inferred_type();
        let slot = *index.entry(task_type).or_insert_with(|| {
            phases.push(PatternStep {
                order: phases.len(),
                task_type,
                keywords: Vec::new(),
                duration: DurationStats::new(),
                priority: task.priority,
                tags: Vec::new(),
                probability: 0.0,
            });
            counts.push(0);
            priorities.push(BTreeMap::new());
            phases.len() - 1
        });

        let step = &mut phases[slot];
        counts[slot] += 1;
        *priorities[slot].entry(task.priority).or_default() += 1;
        if let Some(minutes) = task.duration_minutes() {
            step.duration.add_sample(minutes);
        }
        if step.keywords.len() < MAX_PHASE_KEYWORDS {
            keywords::merge(&mut step.keywords, &keywords::extract(&task.content));
            step.keywords.truncate(MAX_PHASE_KEYWORDS);
        }
        keywords::merge(&mut step.tags, &task.tags);
    }

    let group_size = ordered.len() as f64;
    for (slot, step) in phases.iter_mut().enumerate() {
        step.probability = counts[slot] as f64 / group_size;
        // Most common priority wins, higher on ties
        if let Some((priority, _)) = priorities[slot].iter().max_by_key(|(p, n)| (**n, **p)) {
            step.priority = *priority;
        }
    }

    let completed = ordered.iter().filter(|t| t.is_completed()).count();
    let first_seen = ordered.first().map(|t| t.created_at)?;
    let last_seen = ordered.iter().map(|t| t.updated_at).max().unwrap_or(first_seen);

    let mut pattern = TaskPattern::new(
        format!("workflow:{}", kind),
        PatternType::Workflow,
        repository,
        phases,
        first_seen,
    );
    pattern.last_seen = last_seen;
    pattern.project_type = Some(kind.to_string());
    pattern.name = format!("{} workflow", kind);
    pattern.description = format!(
        "{} workflow: {}",
        kind,
        pattern
            .sequence
            .iter()
            .map(|s| s.task_type.to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    );
    pattern.occurrences = u32::try_from(ordered.len()).unwrap_or(u32::MAX);
    pattern.success_rate = completed as f64 / group_size;
    pattern.frequency = if total_tasks == 0 {
        0.0
    } else {
        (group_size / total_tasks as f64).clamp(0.0, 1.0)
    };
    pattern.calculate_confidence();
    pattern.metadata = serde_json::json!({
        "project_kind": kind.as_str(),
        "tasks": ordered.len(),
        "completed": completed,
    });

    Some(pattern)
}

/// One workflow pattern per project kind with at least `min_tasks` tasks
pub fn detect(repository: &str, tasks: &[Task], min_tasks: usize) -> Vec<TaskPattern> {
    group_by_kind(tasks)
        .into_iter()
        .filter(|(_, group)| group.len() >= min_tasks)
        .filter_map(|(kind, group)| analyze_group(repository, kind, &group, tasks.len()))
        .collect()
}
