use crate::db::models::{PpeType, ViolationStatus, ViolationWithWorker};
use crate::utils::clock::{months_before, start_of_day};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};

/// Relative time window for the violations list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateRange {
    #[default]
    All,
    Today,
    Week,
    Month,
}

impl DateRange {
    /// Earliest timestamp kept by this range, `None` for no bound
    pub fn cutoff(&self, now: DateTime<FixedOffset>) -> Option<DateTime<Utc>> {
        match self {
            Self::All => None,
            Self::Today => Some(start_of_day(now)),
            Self::Week => Some((now - Duration::days(7)).with_timezone(&Utc)),
            Self::Month => Some(months_before(now, 1)),
        }
    }
}

/// User-selected narrowing of the violations list.
///
/// Empty strings in query parameters mean "no filter".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationFilter {
    /// Matched against worker full name or employee id, case-insensitively
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub ppe: Option<PpeType>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub status: Option<ViolationStatus>,
    #[serde(default, deserialize_with = "empty_as_default")]
    pub date_range: DateRange,
}

/// One resolved condition of a [`ViolationFilter`]
#[derive(Debug, Clone, PartialEq)]
pub enum ViolationPredicate {
    /// Lower-cased needle
    Search(String),
    Ppe(PpeType),
    Status(ViolationStatus),
    Since(DateTime<Utc>),
}

impl ViolationPredicate {
    pub fn matches(&self, item: &ViolationWithWorker) -> bool {
        match self {
            Self::Search(needle) => item.worker.as_ref().map_or(false, |worker| {
                worker.full_name.to_lowercase().contains(needle)
                    || worker.employee_id.to_lowercase().contains(needle)
            }),
            Self::Ppe(ppe) => item.violation.is_missing(*ppe),
            Self::Status(status) => item.violation.status == *status,
            Self::Since(cutoff) => item.violation.timestamp >= *cutoff,
        }
    }
}

impl ViolationFilter {
    /// Resolve the filter against `now` into independent predicates
    pub fn predicates(&self, now: DateTime<FixedOffset>) -> Vec<ViolationPredicate> {
        let mut predicates = Vec::new();

        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            predicates.push(ViolationPredicate::Search(search.to_lowercase()));
        }
        if let Some(ppe) = self.ppe {
            predicates.push(ViolationPredicate::Ppe(ppe));
        }
        if let Some(status) = self.status {
            predicates.push(ViolationPredicate::Status(status));
        }
        if let Some(cutoff) = self.date_range.cutoff(now) {
            predicates.push(ViolationPredicate::Since(cutoff));
        }

        predicates
    }

    pub fn is_empty(&self) -> bool {
        self.search.as_deref().map_or(true, str::is_empty)
            && self.ppe.is_none()
            && self.status.is_none()
            && self.date_range == DateRange::All
    }

    /// Violations matching every condition, in their original order
    pub fn apply(
        &self,
        violations: &[ViolationWithWorker],
        now: DateTime<FixedOffset>,
    ) -> Vec<ViolationWithWorker> {
        apply_predicates(violations, &self.predicates(now))
    }
}

/// Keep the items satisfying all `predicates`
pub fn apply_predicates(
    violations: &[ViolationWithWorker],
    predicates: &[ViolationPredicate],
) -> Vec<ViolationWithWorker> {
    violations
        .iter()
        .filter(|item| predicates.iter().all(|p| p.matches(item)))
        .cloned()
        .collect()
}

fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.is_empty() => Ok(None),
        Some(raw) => T::deserialize(serde::de::value::StringDeserializer::<D::Error>::new(raw))
            .map(Some),
    }
}

fn empty_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    empty_as_none(deserializer).map(Option::unwrap_or_default)
}
