//! Data model — filter rules, ingested records and paged views

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ═══════════════════════════════════════════════════════════════════════════════
// RULES
// ═══════════════════════════════════════════════════════════════════════════════

/// Server-side filter rule as known by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Remote-assigned identifier
    pub id: String,

    /// Filter expression
    pub value: String,

    /// Optional label echoed back on matching records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// Rule submitted for creation (the remote assigns the id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRule {
    /// Filter expression
    pub value: String,

    /// Optional label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl NewRule {
    /// Create an untagged rule
    pub fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
            tag: None,
        }
    }

    /// Attach a tag
    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tag = Some(tag.to_string());
        self
    }
}

impl From<&Rule> for NewRule {
    fn from(rule: &Rule) -> Self {
        Self {
            value: rule.value.clone(),
            tag: rule.tag.clone(),
        }
    }
}

/// Create/delete tallies reported by the remote
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSummary {
    #[serde(default)]
    pub created: u32,
    #[serde(default)]
    pub not_created: u32,
    #[serde(default)]
    pub valid: u32,
    #[serde(default)]
    pub invalid: u32,
    #[serde(default)]
    pub deleted: u32,
    #[serde(default)]
    pub not_deleted: u32,
}

/// Metadata block of a rule response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMeta {
    /// Server timestamp of the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent: Option<String>,

    /// Number of rules in `data`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_count: Option<u32>,

    /// Present on create/delete responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<RuleSummary>,
}

/// Ordered rule collection as returned by the rules endpoint.
///
/// A missing `data` field means the remote has no rules; it deserializes to
/// an empty set rather than an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub data: Vec<Rule>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RuleMeta>,

    /// Per-rule problems reported alongside a (partially) successful request
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Value>,
}

impl RuleSet {
    /// Wrap a list of rules
    pub fn from_rules(rules: Vec<Rule>) -> Self {
        Self {
            data: rules,
            ..Default::default()
        }
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Ids of all rules, in order
    pub fn ids(&self) -> Vec<String> {
        self.data.iter().map(|r| r.id.clone()).collect()
    }

    /// Summary tallies, if the remote sent any
    pub fn summary(&self) -> Option<&RuleSummary> {
        self.meta.as_ref().and_then(|m| m.summary.as_ref())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT RECORDS
// ═══════════════════════════════════════════════════════════════════════════════

/// One ingested stream line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonic insertion sequence, assigned by the store
    pub id: u64,

    /// Verbatim line as received
    pub raw: String,

    /// Wall-clock time the line was read
    pub received_at: DateTime<Utc>,
}

/// Projection of an [`EventRecord`] served by paged queries.
///
/// Fields are pulled leniently out of the raw JSON; anything missing or
/// unparsable is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventView {
    pub id: u64,
    pub received_at: DateTime<Utc>,
    pub tweet_id: Option<String>,
    pub text: Option<String>,
    pub author_id: Option<String>,
    pub created_at: Option<String>,
}

impl EventView {
    /// Project a stored record
    pub fn project(record: &EventRecord) -> Self {
        let parsed: Option<Value> = serde_json::from_str(&record.raw).ok();
        let data = parsed.as_ref().and_then(|v| v.get("data"));
        let field = |name: &str| {
            data.and_then(|d| d.get(name))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };

        Self {
            id: record.id,
            received_at: record.received_at,
            tweet_id: field("id"),
            text: field("text"),
            author_id: field("author_id"),
            created_at: field("created_at"),
        }
    }
}

impl From<&EventRecord> for EventView {
    fn from(record: &EventRecord) -> Self {
        Self::project(record)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PAGING
// ═══════════════════════════════════════════════════════════════════════════════

/// One page of a descending-by-time listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page_index: u64,
    pub page_size: usize,
    pub total_elements: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Build a page, deriving the page count from the totals
    pub fn new(content: Vec<T>, page_index: u64, page_size: usize, total_elements: usize) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            total_elements.div_ceil(page_size)
        };
        Self {
            content,
            page_index,
            page_size,
            total_elements,
            total_pages,
        }
    }

    /// Whether a following page exists
    pub fn has_next(&self) -> bool {
        (self.page_index as usize + 1) < self.total_pages
    }

    /// Map the content, keeping paging metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page_index: self.page_index,
            page_size: self.page_size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}
