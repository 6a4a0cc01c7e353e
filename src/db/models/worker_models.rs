use super::{require_non_empty, Record};
use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Worker profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Worker {
    #[serde(rename = "Id")]
    pub id: i64,
    pub full_name: String,
    pub username: String,
    pub employee_id: String,
    pub department: String,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Record for Worker {
    const KIND: &'static str = "Worker";

    fn id(&self) -> i64 {
        self.id
    }
}

/// Payload for registering a worker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorker {
    pub full_name: String,
    pub username: String,
    pub employee_id: String,
    pub department: String,
    #[serde(default)]
    pub profile_image: Option<String>,
}

impl NewWorker {
    pub fn validate(&self) -> Result<(), Error> {
        require_non_empty("fullName", &self.full_name)?;
        require_non_empty("username", &self.username)?;
        require_non_empty("employeeId", &self.employee_id)?;
        require_non_empty("department", &self.department)
    }

    pub fn into_worker(self, id: i64, created_at: DateTime<Utc>) -> Worker {
        Worker {
            id,
            full_name: self.full_name,
            username: self.username,
            employee_id: self.employee_id,
            department: self.department,
            profile_image: self.profile_image,
            created_at: Some(created_at),
        }
    }
}

/// Partial worker update; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerUpdate {
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub employee_id: Option<String>,
    pub department: Option<String>,
    pub profile_image: Option<String>,
}

impl WorkerUpdate {
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(full_name) = &self.full_name {
            require_non_empty("fullName", full_name)?;
        }
        if let Some(username) = &self.username {
            require_non_empty("username", username)?;
        }
        if let Some(employee_id) = &self.employee_id {
            require_non_empty("employeeId", employee_id)?;
        }
        if let Some(department) = &self.department {
            require_non_empty("department", department)?;
        }
        Ok(())
    }

    pub fn apply(self, worker: &mut Worker) {
        if let Some(full_name) = self.full_name {
            worker.full_name = full_name;
        }
        if let Some(username) = self.username {
            worker.username = username;
        }
        if let Some(employee_id) = self.employee_id {
            worker.employee_id = employee_id;
        }
        if let Some(department) = self.department {
            worker.department = department;
        }
        if let Some(profile_image) = self.profile_image {
            worker.profile_image = Some(profile_image);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_field_names() {
        let worker: Worker = serde_json::from_str(
            r#"{
                "Id": 7,
                "fullName": "Ana Ruiz",
                "username": "aruiz",
                "employeeId": "EMP007",
                "department": "Welding",
                "profileImage": "https://example.com/a.jpg"
            }"#,
        )
        .unwrap();

        assert_eq!(worker.id, 7);
        assert_eq!(worker.employee_id, "EMP007");
        assert!(worker.created_at.is_none());
    }

    #[test]
    fn test_blank_update_field_rejected() {
        let update = WorkerUpdate {
            department: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(matches!(update.validate(), Err(Error::Validation(_))));
    }
}
