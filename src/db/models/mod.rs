use crate::error::Error;

pub mod camera_models;
pub mod settings_models;
pub mod violation_models;
pub mod worker_models;

pub use camera_models::{Camera, CameraUpdate, NewCamera};
pub use settings_models::{PpeConfig, PpeConfigUpdate, SystemSettings, VideoQuality};
pub use violation_models::{
    NewViolation, PpeType, Violation, ViolationStatus, ViolationUpdate, ViolationWithWorker,
};
pub use worker_models::{NewWorker, Worker, WorkerUpdate};

/// A row of an in-memory collection, keyed by an integer identifier
pub trait Record: Clone + Send + Sync + 'static {
    /// Human readable collection name used in error messages
    const KIND: &'static str;

    fn id(&self) -> i64;
}

pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

pub(crate) fn require_non_negative(field: &str, value: f64) -> Result<(), Error> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::Validation(format!(
            "{} must be a non-negative amount, got {}",
            field, value
        )));
    }
    Ok(())
}
