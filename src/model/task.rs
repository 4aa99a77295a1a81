//! Tasks and their validation rules

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Longest accepted task title, in characters, after trimming
pub const MAX_TITLE_CHARS: usize = 100;

/// Longest accepted task description, in characters, after trimming
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// Unique identifier for a task
pub type TaskId = String;

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

/// A to-do item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields supplied by the caller when creating a task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
}

impl TaskInput {
    pub fn new(title: impl Into<String>, priority: Priority) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            priority,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Partial update applied by `update_task`; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub completed: Option<bool>,
}

impl Task {
    /// Build a validated task from caller input
    pub fn from_input(input: TaskInput, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        let title = validate_title(&input.title)?;
        let description = validate_description(&input.description)?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            title,
            description,
            priority: input.priority,
            completed: false,
            created_at: now,
            updated_at: None,
        })
    }

    /// Apply a patch, validating any text fields it changes
    pub fn apply(&mut self, update: &TaskUpdate, now: DateTime<Utc>) -> Result<(), ValidationError> {
        let title = update.title.as_deref().map(validate_title).transpose()?;
        let description = update
            .description
            .as_deref()
            .map(validate_description)
            .transpose()?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(completed) = update.completed {
            self.completed = completed;
        }
        self.updated_at = Some(now);
        Ok(())
    }

    /// Flip completion
    pub fn toggle(&mut self, now: DateTime<Utc>) {
        self.completed = !self.completed;
        self.updated_at = Some(now);
    }
}

fn validate_title(title: &str) -> Result<String, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(ValidationError::TitleTooLong {
            max: MAX_TITLE_CHARS,
        });
    }
    Ok(title.to_string())
}

fn validate_description(description: &str) -> Result<String, ValidationError> {
    let description = description.trim();
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(ValidationError::DescriptionTooLong {
            max: MAX_DESCRIPTION_CHARS,
        });
    }
    Ok(description.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_task_from_input_trims() {
        let input = TaskInput::new("  Buy milk  ", Priority::High).with_description(" 2L ");
        let task = Task::from_input(input, now()).unwrap();
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.description, "2L");
        assert!(!task.completed);
        assert!(task.updated_at.is_none());
    }

    #[test]
    fn test_blank_titles_rejected() {
        for title in ["", "   ", "\t\n"] {
            let err = Task::from_input(TaskInput::new(title, Priority::Low), now()).unwrap_err();
            assert_eq!(err, ValidationError::EmptyTitle);
        }
    }

    #[test]
    fn test_length_limits() {
        let long_title = "x".repeat(MAX_TITLE_CHARS + 1);
        assert!(matches!(
            Task::from_input(TaskInput::new(long_title, Priority::Low), now()),
            Err(ValidationError::TitleTooLong { .. })
        ));

        let exact_title = "é".repeat(MAX_TITLE_CHARS);
        assert!(Task::from_input(TaskInput::new(exact_title, Priority::Low), now()).is_ok());

        let input = TaskInput::new("ok", Priority::Low)
            .with_description("y".repeat(MAX_DESCRIPTION_CHARS + 1));
        assert!(matches!(
            Task::from_input(input, now()),
            Err(ValidationError::DescriptionTooLong { .. })
        ));
    }

    #[test]
    fn test_apply_rejects_blank_title_without_partial_write() {
        let mut task = Task::from_input(TaskInput::new("Write report", Priority::Low), now()).unwrap();
        let update = TaskUpdate {
            title: Some("  ".to_string()),
            priority: Some(Priority::High),
            ..Default::default()
        };

        assert!(task.apply(&update, now()).is_err());
        assert_eq!(task.title, "Write report");
        assert_eq!(task.priority, Priority::Low);
    }

    #[test]
    fn test_priority_serialization() {
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
        let parsed: Priority = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(parsed, Priority::Low);
    }
}
