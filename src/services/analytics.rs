//! Compliance analytics over the violation history.
//!
//! Every figure is derived from the violation and worker collections for
//! a reporting period ending at "now". The computation itself is pure;
//! [`AnalyticsService`] only fetches the inputs and reads the clock.

use crate::db::models::{PpeType, Violation, ViolationStatus, Worker};
use crate::db::repositories::SafetyDataSource;
use crate::utils::clock::{months_before, start_of_day};
use crate::utils::Clock;
use anyhow::Result;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Number of workers reported in the top violators list
pub const TOP_VIOLATORS_LIMIT: usize = 5;

/// Departments at or above this compliance are called out as a positive trend
pub const EXEMPLARY_COMPLIANCE: u8 = 95;

/// Reporting period, always ending at "now"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    #[default]
    Week,
    Month,
    Year,
}

impl Period {
    /// Start of the current reporting window
    pub fn cutoff(&self, now: DateTime<FixedOffset>) -> DateTime<Utc> {
        match self {
            Self::Day => start_of_day(now),
            Self::Week => (now - Duration::days(7)).with_timezone(&Utc),
            Self::Month => months_before(now, 1),
            Self::Year => months_before(now, 12),
        }
    }

    /// Start of the window immediately preceding the current one
    pub fn previous_cutoff(&self, now: DateTime<FixedOffset>) -> DateTime<Utc> {
        match self {
            Self::Day => start_of_day(now) - Duration::days(1),
            Self::Week => (now - Duration::days(14)).with_timezone(&Utc),
            Self::Month => months_before(now, 2),
            Self::Year => months_before(now, 24),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PpeBreakdown {
    #[serde(rename = "type")]
    pub ppe_type: PpeType,
    pub label: String,
    pub count: usize,
    /// Share of all missing-PPE tallies in the period
    pub percentage: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopViolator {
    pub worker_id: i64,
    /// `None` when the worker has been deleted
    pub worker: Option<Worker>,
    pub violation_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentCompliance {
    pub name: String,
    pub total_workers: usize,
    pub violations: usize,
    /// `None` when the department has no workers
    pub compliance: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub period: Period,
    /// `None` when there are no workers to measure
    pub overall_compliance: Option<u8>,
    pub total_violations: usize,
    pub total_workers: usize,
    /// Mean hours from detection to resolution, `None` without resolved violations
    pub avg_resolution_time: Option<f64>,
    pub total_fines: f64,
    pub ppe_breakdown: Vec<PpeBreakdown>,
    pub top_violators: Vec<TopViolator>,
    pub department_compliance: Vec<DepartmentCompliance>,
    pub positive_trends: Vec<String>,
    pub improvement_areas: Vec<String>,
}

/// Percentage of `total_workers` without a violation, clamped to 0..=100
pub fn compliance_rate(total_workers: usize, violations: usize) -> Option<u8> {
    if total_workers == 0 {
        return None;
    }
    let compliant = total_workers.saturating_sub(violations) as f64;
    Some((compliant / total_workers as f64 * 100.0).round() as u8)
}

/// Most frequent violators, ties broken by who appears first in `violations`
pub fn top_violators(violations: &[&Violation], workers: &[Worker], limit: usize) -> Vec<TopViolator> {
    let mut counts: Vec<(i64, usize)> = Vec::new();
    let mut slots: HashMap<i64, usize> = HashMap::new();

    for violation in violations {
        match slots.get(&violation.worker_id) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                slots.insert(violation.worker_id, counts.len());
                counts.push((violation.worker_id, 1));
            }
        }
    }

    // stable: equal counts stay in first-seen order
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(limit);

    counts
        .into_iter()
        .map(|(worker_id, violation_count)| TopViolator {
            worker_id,
            worker: workers.iter().find(|w| w.id == worker_id).cloned(),
            violation_count,
        })
        .collect()
}

/// Compliance of one department against the given violations
pub fn department_compliance_for(
    name: &str,
    workers: &[Worker],
    violations: &[&Violation],
) -> DepartmentCompliance {
    let members: HashSet<i64> = workers
        .iter()
        .filter(|w| w.department == name)
        .map(|w| w.id)
        .collect();
    let dept_violations = violations
        .iter()
        .filter(|v| members.contains(&v.worker_id))
        .count();

    DepartmentCompliance {
        name: name.to_string(),
        total_workers: members.len(),
        violations: dept_violations,
        compliance: compliance_rate(members.len(), dept_violations),
    }
}

/// Compliance per department, in first-seen worker order
pub fn department_compliance(workers: &[Worker], violations: &[&Violation]) -> Vec<DepartmentCompliance> {
    let mut departments: Vec<&str> = Vec::new();
    for worker in workers {
        if !departments.contains(&worker.department.as_str()) {
            departments.push(&worker.department);
        }
    }

    departments
        .into_iter()
        .map(|name| department_compliance_for(name, workers, violations))
        .collect()
}

fn ppe_tallies(violations: &[&Violation]) -> BTreeMap<PpeType, usize> {
    let mut tallies: BTreeMap<PpeType, usize> = PpeType::ALL.into_iter().map(|p| (p, 0)).collect();
    for violation in violations {
        for ppe in &violation.missing_ppe {
            *tallies.entry(*ppe).or_default() += 1;
        }
    }
    tallies
}

/// Missing-PPE counts per category, in category order
pub fn ppe_breakdown(violations: &[&Violation]) -> Vec<PpeBreakdown> {
    let tallies = ppe_tallies(violations);
    let total: usize = tallies.values().sum();

    tallies
        .into_iter()
        .map(|(ppe_type, count)| PpeBreakdown {
            ppe_type,
            label: ppe_type.label().to_string(),
            count,
            percentage: if total == 0 {
                0
            } else {
                (count as f64 / total as f64 * 100.0).round() as u8
            },
        })
        .collect()
}

/// Mean detection-to-resolution time in hours, to one decimal
pub fn average_resolution_hours(violations: &[&Violation]) -> Option<f64> {
    let durations: Vec<i64> = violations
        .iter()
        .filter(|v| v.status == ViolationStatus::Resolved)
        .filter_map(|v| v.resolved_at.map(|at| (at - v.timestamp).num_seconds().max(0)))
        .collect();

    if durations.is_empty() {
        return None;
    }

    let mean_secs = durations.iter().sum::<i64>() as f64 / durations.len() as f64;
    Some((mean_secs / 360.0).round() / 10.0)
}

/// Narratives comparing the current window with the previous one
pub fn trends(
    current: &[&Violation],
    previous: &[&Violation],
    departments: &[DepartmentCompliance],
) -> (Vec<String>, Vec<String>) {
    let mut positive = Vec::new();
    let mut improvement = Vec::new();

    let now_tallies = ppe_tallies(current);
    let before_tallies = ppe_tallies(previous);

    for ppe in PpeType::ALL {
        let now = now_tallies.get(&ppe).copied().unwrap_or(0);
        let before = before_tallies.get(&ppe).copied().unwrap_or(0);

        if now < before {
            let drop = ((before - now) as f64 / before as f64 * 100.0).round();
            positive.push(format!(
                "{} violations decreased by {}% compared to the previous period",
                ppe.label(),
                drop
            ));
        } else if now > before && before == 0 {
            improvement.push(format!(
                "{} violations rose from none to {} compared to the previous period",
                ppe.label(),
                now
            ));
        } else if now > before {
            let rise = ((now - before) as f64 / before as f64 * 100.0).round();
            improvement.push(format!(
                "{} violations increased by {}% compared to the previous period",
                ppe.label(),
                rise
            ));
        }
    }

    for dept in departments {
        if let Some(compliance) = dept.compliance.filter(|c| *c >= EXEMPLARY_COMPLIANCE) {
            positive.push(format!(
                "{} department achieved {}% compliance rate",
                dept.name, compliance
            ));
        }
    }

    (positive, improvement)
}

/// Aggregate the violation history for `period` as of `now`
pub fn summarize(
    period: Period,
    violations: &[Violation],
    workers: &[Worker],
    now: DateTime<FixedOffset>,
) -> AnalyticsSummary {
    let cutoff = period.cutoff(now);
    let previous_cutoff = period.previous_cutoff(now);

    let current: Vec<&Violation> = violations.iter().filter(|v| v.timestamp >= cutoff).collect();
    let previous: Vec<&Violation> = violations
        .iter()
        .filter(|v| v.timestamp >= previous_cutoff && v.timestamp < cutoff)
        .collect();

    let departments = department_compliance(workers, &current);
    let (positive_trends, improvement_areas) = trends(&current, &previous, &departments);

    debug!(
        "Summarizing {:?}: {} violations since {}, {} in the previous window",
        period,
        current.len(),
        cutoff,
        previous.len()
    );

    AnalyticsSummary {
        period,
        overall_compliance: compliance_rate(workers.len(), current.len()),
        total_violations: current.len(),
        total_workers: workers.len(),
        avg_resolution_time: average_resolution_hours(&current),
        total_fines: current.iter().map(|v| v.fine_amount).sum(),
        ppe_breakdown: ppe_breakdown(&current),
        top_violators: top_violators(&current, workers, TOP_VIOLATORS_LIMIT),
        department_compliance: departments,
        positive_trends,
        improvement_areas,
    }
}

/// Serves analytics summaries from a data source
pub struct AnalyticsService {
    source: Arc<dyn SafetyDataSource>,
    clock: Arc<dyn Clock>,
}

impl AnalyticsService {
    pub fn new(source: Arc<dyn SafetyDataSource>, clock: Arc<dyn Clock>) -> Self {
        Self { source, clock }
    }

    pub async fn get_analytics(&self, period: Period) -> Result<AnalyticsSummary> {
        let (violations, workers) =
            tokio::try_join!(self.source.list_violations(), self.source.list_workers())?;
        Ok(summarize(period, &violations, &workers, self.clock.now()))
    }
}
