//! Pattern metadata: name, category, priority

use serde::{Deserialize, Serialize};

const ANTI_PATTERN_DESCRIPTION: &str = "An AntiPattern is a literary form that describes a commonly occurring solution to a problem that generates decidedly negative consequences. The AntiPattern may be the result of a manager or developer not knowing any better, not having sufficient knowledge or experience in solving a particular type of problem, or having applied a perfectly good pattern in the wrong context.";

const DESIGN_PATTERN_DESCRIPTION: &str = "In software engineering, a design pattern is a general repeatable solution to a commonly occurring problem in software design. A design pattern isn't a finished design that can be transformed directly into code. It is a description or template for how to solve a problem that can be used in many different situations.";

/// Priority of a pattern warning
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum Priority {
    Info,
    #[default]
    Minor,
    Major,
    Critical,
    Blocker,
}

impl Priority {
    pub const ALL: [Priority; 5] = [
        Priority::Info,
        Priority::Minor,
        Priority::Major,
        Priority::Critical,
        Priority::Blocker,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Info => "Info",
            Priority::Minor => "Minor",
            Priority::Major => "Major",
            Priority::Critical => "Critical",
            Priority::Blocker => "Blocker",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    /// Case-sensitive, as written in pattern documents
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("Priority value '{}' is invalid!", s))
    }
}

/// Description shown for a pattern category
pub fn category_description(category: &str) -> &'static str {
    match category {
        "AntiPattern" => ANTI_PATTERN_DESCRIPTION,
        "DesignPattern" => DESIGN_PATTERN_DESCRIPTION,
        _ => "Custom Patterns",
    }
}

/// Metadata carried by a NodeType condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternMeta {
    /// Pattern name; empty for nested conditions
    pub name: String,
    pub display_name: String,
    pub category: String,
    pub description: String,
    pub priority: Priority,
    /// Role name without the write-to-graph marker
    pub role: String,
}

impl Default for PatternMeta {
    fn default() -> Self {
        Self {
            name: String::new(),
            display_name: String::new(),
            category: "AntiPattern".to_string(),
            description: String::new(),
            priority: Priority::Minor,
            role: String::new(),
        }
    }
}

impl PatternMeta {
    pub fn new(name: &str, role: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: name.to_string(),
            role: role.to_string(),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_display_name(mut self, display_name: &str) -> Self {
        self.display_name = display_name.to_string();
        self
    }

    /// Name of the warning emitted on a match
    pub fn warning_name(&self) -> String {
        format!("{}_warning", self.name)
    }

    /// Warning text emitted on a match
    pub fn warning_text(&self) -> String {
        format!("Found '{}' pattern!", self.name)
    }

    pub fn category_description(&self) -> &'static str {
        category_description(&self.category)
    }
}
