/// Context detection for suggestion ranking
///
/// Works out what the current moment looks like: time of day, day of week,
/// whether we're inside working hours and how stressed the task list looks.

use crate::db::models::{Priority, Session, Task};
use crate::intelligence::pattern::TaskPattern;
use crate::intelligence::suggestion::{StressIndicator, WorkContext};
use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

// Open tasks at or above this count are a stress signal on their own
const OVERLOAD_TASK_COUNT: usize = 8;

/// Time of day categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,   // 6am - 12pm
    Afternoon, // 12pm - 6pm
    Evening,   // 6pm - 10pm
    Night,     // 10pm - 6am
}

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => TimeOfDay::Morning,
            12..=17 => TimeOfDay::Afternoon,
            18..=21 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }
}

/// Day of week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub fn is_weekend(&self) -> bool {
        matches!(self, DayOfWeek::Saturday | DayOfWeek::Sunday)
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

/// A user's working day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl WorkingHours {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Inclusive on both ends; a start after the end wraps past midnight
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start <= self.end {
            time >= self.start && time <= self.end
        } else {
            time >= self.start || time <= self.end
        }
    }
}

/// Context detector
pub struct ContextDetector;

impl ContextDetector {
    /// Build a work context for `repository` as seen at `now`
    ///
    /// Time-of-day and day-of-week come from `now` in its own timezone, so pass
    /// `chrono::Local::now()` for the user's wall clock.
    pub fn detect<Tz: TimeZone>(
        repository: &str,
        now: DateTime<Tz>,
        current_tasks: Vec<Task>,
        recent_tasks: Vec<Task>,
        session: Option<Session>,
        active_patterns: Vec<TaskPattern>,
    ) -> WorkContext {
        let mut context = WorkContext::at(repository, now);

        if let Some(session) = &session {
            context.productivity_score = session.productivity_score.clamp(0.0, 1.0);
            context.focus_level = session.focus_score.clamp(0.0, 1.0);
            context.energy_level = Self::estimate_energy(session);
            context.goals = session.goals.iter().filter(|g| !g.completed).cloned().collect();
        }

        context.stress_indicators = Self::stress_indicators(&current_tasks, context.now);
        context.current_tasks = current_tasks;
        context.recent_tasks = recent_tasks;
        context.current_session = session;
        context.active_patterns = active_patterns;
        context
    }

    /// Energy drains over a long session
    pub fn estimate_energy(session: &Session) -> f64 {
        let hours = session.duration_hours().max(0.0);
        (1.0 - hours / 6.0).clamp(0.1, 1.0)
    }

    /// Signals that the task list is getting on top of someone
    pub fn stress_indicators(open_tasks: &[Task], now: DateTime<Utc>) -> Vec<StressIndicator> {
        let mut indicators = Vec::new();

        let stale_urgent = open_tasks
            .iter()
            .filter(|t| !t.is_completed() && t.priority >= Priority::High)
            .filter(|t| now - t.created_at > Duration::hours(24))
            .count();
        if stale_urgent > 0 {
            indicators.push(StressIndicator {
                kind: "overdue_tasks".to_string(),
                severity: (0.5 + 0.1 * stale_urgent as f64).min(1.0),
                description: format!("{} high-priority tasks open for over a day", stale_urgent),
                detected_at: now,
            });
        }

        if open_tasks.len() >= OVERLOAD_TASK_COUNT {
            indicators.push(StressIndicator {
                kind: "overload".to_string(),
                severity: (open_tasks.len() as f64 / (2 * OVERLOAD_TASK_COUNT) as f64).min(1.0),
                description: format!("{} tasks in flight", open_tasks.len()),
                detected_at: now,
            });
        }

        indicators
    }

    pub fn time_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> TimeOfDay {
        TimeOfDay::from_hour(now.hour())
    }

    pub fn day_of_week<Tz: TimeZone>(now: &DateTime<Tz>) -> DayOfWeek {
        now.weekday().into()
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeOfDay::Morning => write!(f, "morning"),
            TimeOfDay::Afternoon => write!(f, "afternoon"),
            TimeOfDay::Evening => write!(f, "evening"),
            TimeOfDay::Night => write!(f, "night"),
        }
    }
}

impl std::fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DayOfWeek::Monday => write!(f, "Monday"),
            DayOfWeek::Tuesday => write!(f, "Tuesday"),
            DayOfWeek::Wednesday => write!(f, "Wednesday"),
            DayOfWeek::Thursday => write!(f, "Thursday"),
            DayOfWeek::Friday => write!(f, "Friday"),
            DayOfWeek::Saturday => write!(f, "Saturday"),
            DayOfWeek::Sunday => write!(f, "Sunday"),
        }
    }
}
