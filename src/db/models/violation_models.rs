use super::{require_non_empty, require_non_negative, Record, Worker};
use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Protective equipment categories tracked by the detectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PpeType {
    Helmet,
    Jacket,
    Shoes,
}

impl PpeType {
    /// Every category, in reporting order
    pub const ALL: [PpeType; 3] = [PpeType::Helmet, PpeType::Jacket, PpeType::Shoes];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Helmet => "helmet",
            Self::Jacket => "jacket",
            Self::Shoes => "shoes",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Helmet => "Safety Helmet",
            Self::Jacket => "Safety Jacket",
            Self::Shoes => "Safety Shoes",
        }
    }
}

impl Display for PpeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PpeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PpeType::ALL
            .into_iter()
            .find(|ppe| ppe.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::NotFound(format!("PPE type not found: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationStatus {
    #[default]
    Pending,
    Resolved,
}

/// A detected PPE violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    #[serde(rename = "Id")]
    pub id: i64,
    pub worker_id: i64,
    pub camera_id: i64,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "missingPPE")]
    pub missing_ppe: Vec<PpeType>,
    #[serde(default)]
    pub status: ViolationStatus,
    pub fine_amount: f64,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Violation {
    pub fn is_missing(&self, ppe: PpeType) -> bool {
        self.missing_ppe.contains(&ppe)
    }

    pub fn is_pending(&self) -> bool {
        self.status == ViolationStatus::Pending
    }

    /// Move to `status`, keeping `resolved_at` in step with it
    pub fn set_status(&mut self, status: ViolationStatus, now: DateTime<Utc>) {
        match status {
            ViolationStatus::Resolved if self.status != ViolationStatus::Resolved => {
                self.resolved_at = Some(now);
            }
            ViolationStatus::Pending => self.resolved_at = None,
            ViolationStatus::Resolved => {}
        }
        self.status = status;
    }
}

impl Record for Violation {
    const KIND: &'static str = "Violation";

    fn id(&self) -> i64 {
        self.id
    }
}

/// Violation joined with the worker it references.
///
/// `worker` is `None` when the referenced worker no longer exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationWithWorker {
    #[serde(flatten)]
    pub violation: Violation,
    pub worker: Option<Worker>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewViolation {
    pub worker_id: i64,
    pub camera_id: i64,
    #[serde(rename = "missingPPE")]
    pub missing_ppe: Vec<PpeType>,
    /// Priced from the PPE configuration when absent
    #[serde(default)]
    pub fine_amount: Option<f64>,
    #[serde(default)]
    pub location: String,
    /// Detection time; defaults to the time of creation
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: ViolationStatus,
}

impl NewViolation {
    pub fn validate(&self) -> Result<(), Error> {
        validate_missing_ppe(&self.missing_ppe)?;
        if let Some(fine_amount) = self.fine_amount {
            require_non_negative("fineAmount", fine_amount)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationUpdate {
    pub status: Option<ViolationStatus>,
    #[serde(rename = "missingPPE")]
    pub missing_ppe: Option<Vec<PpeType>>,
    pub fine_amount: Option<f64>,
    pub location: Option<String>,
}

impl ViolationUpdate {
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(missing_ppe) = &self.missing_ppe {
            validate_missing_ppe(missing_ppe)?;
        }
        if let Some(fine_amount) = self.fine_amount {
            require_non_negative("fineAmount", fine_amount)?;
        }
        if let Some(location) = &self.location {
            require_non_empty("location", location)?;
        }
        Ok(())
    }

    pub fn apply(self, violation: &mut Violation, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            violation.set_status(status, now);
        }
        if let Some(missing_ppe) = self.missing_ppe {
            violation.missing_ppe = dedup_ppe(missing_ppe);
        }
        if let Some(fine_amount) = self.fine_amount {
            violation.fine_amount = fine_amount;
        }
        if let Some(location) = self.location {
            violation.location = location;
        }
    }
}

fn validate_missing_ppe(missing_ppe: &[PpeType]) -> Result<(), Error> {
    if missing_ppe.is_empty() {
        return Err(Error::Validation(
            "missingPPE must name at least one category".to_string(),
        ));
    }
    Ok(())
}

/// Drop repeated categories, keeping first occurrences in order
pub fn dedup_ppe(missing_ppe: Vec<PpeType>) -> Vec<PpeType> {
    let mut seen = Vec::with_capacity(missing_ppe.len());
    for ppe in missing_ppe {
        if !seen.contains(&ppe) {
            seen.push(ppe);
        }
    }
    seen
}
