//! Merge rules shared by the local store and the aggregation service.

use chrono::NaiveDate;

use crate::utils::time::date_to_key;

use super::entities::{Category, DailyAggregate, DaySummary, DomainUsage, TimeData};

/// Number of recorded dates returned by the weekly report.
pub const WEEKLY_REPORT_DAYS: usize = 7;

impl DailyAggregate {
    /// Adds `seconds` to `domain` and to the counter of the domain's stored category.
    ///
    /// A domain seen for the first time today is pinned to `category`. Later increments keep
    /// the pinned category even if they were classified differently, which keeps the category
    /// counters equal to the sum of domain times. Returns the category that was charged.
    pub fn apply(&mut self, domain: &str, seconds: u64, category: Category) -> Category {
        let usage = self
            .domains
            .entry(domain.to_owned())
            .or_insert_with(|| DomainUsage {
                time: 0,
                classification: category,
            });
        usage.time = usage.time.saturating_add(seconds);
        let stored = usage.classification;

        let counter = self.counter_mut(stored);
        *counter = counter.saturating_add(seconds);
        stored
    }

    pub fn total(&self, category: Category) -> u64 {
        match category {
            Category::Productive => self.productive,
            Category::Unproductive => self.unproductive,
            Category::Neutral => self.neutral,
        }
    }

    fn counter_mut(&mut self, category: Category) -> &mut u64 {
        match category {
            Category::Productive => &mut self.productive,
            Category::Unproductive => &mut self.unproductive,
            Category::Neutral => &mut self.neutral,
        }
    }

    pub fn category_sum(&self) -> u64 {
        self.productive + self.unproductive + self.neutral
    }

    pub fn domain_sum(&self) -> u64 {
        self.domains.values().map(|usage| usage.time).sum()
    }

    /// Domains sorted by time spent, longest first.
    pub fn top_domains(&self, limit: usize) -> Vec<(&str, &DomainUsage)> {
        let mut domains = self
            .domains
            .iter()
            .map(|(domain, usage)| (domain.as_str(), usage))
            .collect::<Vec<_>>();
        domains.sort_by(|a, b| b.1.time.cmp(&a.1.time).then_with(|| a.0.cmp(b.0)));
        domains.truncate(limit);
        domains
    }
}

/// Merges an increment into the aggregate of `date`, creating the day when needed.
pub fn merge_into(
    time_data: &mut TimeData,
    date: NaiveDate,
    domain: &str,
    seconds: u64,
    category: Category,
) -> Category {
    time_data
        .entry(date_to_key(date))
        .or_default()
        .apply(domain, seconds, category)
}

/// Totals of the last [WEEKLY_REPORT_DAYS] recorded dates, oldest first. Dates are compared
/// as strings, which matches calendar order for `YYYY-MM-DD` keys.
pub fn weekly_report(time_data: &TimeData) -> Vec<DaySummary> {
    let skip = time_data.len().saturating_sub(WEEKLY_REPORT_DAYS);
    time_data
        .iter()
        .skip(skip)
        .map(|(date, day)| DaySummary {
            date: date.clone(),
            productive: day.productive,
            unproductive: day.unproductive,
            neutral: day.neutral,
        })
        .collect()
}
