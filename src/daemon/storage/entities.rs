use std::{collections::BTreeMap, fmt::Display, sync::Arc};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Classification of a domain and of the time spent on it.
///
/// On disk and on the wire a category is a tri-state flag: `true` is productive, `false` is
/// unproductive and `null` (or a missing field) is neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Category {
    Productive,
    Unproductive,
    #[default]
    Neutral,
}

impl Category {
    pub fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            Some(true) => Category::Productive,
            Some(false) => Category::Unproductive,
            None => Category::Neutral,
        }
    }

    pub fn as_flag(self) -> Option<bool> {
        match self {
            Category::Productive => Some(true),
            Category::Unproductive => Some(false),
            Category::Neutral => None,
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Productive => write!(f, "Productive"),
            Category::Unproductive => write!(f, "Unproductive"),
            Category::Neutral => write!(f, "Neutral"),
        }
    }
}

impl Serialize for Category {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.as_flag().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<bool>::deserialize(deserializer).map(Category::from_flag)
    }
}

/// Time attributed to one domain within a day. The classification is pinned when the domain
/// first shows up that day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DomainUsage {
    #[serde(default)]
    pub time: u64,
    #[serde(rename = "productive", default)]
    pub classification: Category,
}

/// Accumulated counters for one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DailyAggregate {
    #[serde(default)]
    pub productive: u64,
    #[serde(default)]
    pub unproductive: u64,
    #[serde(default)]
    pub neutral: u64,
    #[serde(default)]
    pub domains: BTreeMap<String, DomainUsage>,
}

/// Daily aggregates keyed by `YYYY-MM-DD`. Ordered keys keep dates sorted.
pub type TimeData = BTreeMap<String, DailyAggregate>;

/// Elapsed time attributed to one domain, emitted when a session closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Increment {
    pub domain: Arc<str>,
    pub category: Category,
    pub seconds: u64,
}

/// Per-category totals of one day, as shown by the weekly report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: String,
    pub productive: u64,
    pub unproductive: u64,
    pub neutral: u64,
}
