use super::{require_non_negative, PpeType};
use crate::error::Error;
use serde::{Deserialize, Serialize};

/// Detection and fine settings for one PPE category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PpeConfig {
    #[serde(rename = "type")]
    pub ppe_type: PpeType,
    pub fine_amount: f64,
    pub is_mandatory: bool,
    /// Minimum detector confidence, 0.0 to 1.0
    pub detection_threshold: f64,
}

impl PpeConfig {
    /// Factory configuration for a category
    pub fn default_for(ppe_type: PpeType) -> Self {
        let (fine_amount, detection_threshold) = match ppe_type {
            PpeType::Helmet => (50.0, 0.85),
            PpeType::Jacket => (35.0, 0.80),
            PpeType::Shoes => (25.0, 0.75),
        };
        Self {
            ppe_type,
            fine_amount,
            is_mandatory: true,
            detection_threshold,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PpeConfigUpdate {
    pub fine_amount: Option<f64>,
    pub is_mandatory: Option<bool>,
    pub detection_threshold: Option<f64>,
}

impl PpeConfigUpdate {
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(fine_amount) = self.fine_amount {
            require_non_negative("fineAmount", fine_amount)?;
        }
        if let Some(threshold) = self.detection_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(Error::Validation(format!(
                    "detectionThreshold must be between 0.0 and 1.0, got {}",
                    threshold
                )));
            }
        }
        Ok(())
    }

    pub fn apply(self, config: &mut PpeConfig) {
        if let Some(fine_amount) = self.fine_amount {
            config.fine_amount = fine_amount;
        }
        if let Some(is_mandatory) = self.is_mandatory {
            config.is_mandatory = is_mandatory;
        }
        if let Some(threshold) = self.detection_threshold {
            config.detection_threshold = threshold;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoQuality {
    Low,
    Medium,
    High,
}

/// Site-wide monitoring settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSettings {
    /// Seconds between detection passes
    pub detection_interval: u32,
    /// Seconds an alert stays on screen
    pub alert_timeout: u32,
    pub video_quality: VideoQuality,
    /// Days footage is retained
    pub storage_retention: u32,
    pub email_notifications: bool,
    pub sms_alerts: bool,
    pub push_notifications: bool,
}

impl SystemSettings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.detection_interval == 0 {
            return Err(Error::Validation(
                "detectionInterval must be at least one second".to_string(),
            ));
        }
        if self.storage_retention == 0 {
            return Err(Error::Validation(
                "storageRetention must be at least one day".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            detection_interval: 5,
            alert_timeout: 30,
            video_quality: VideoQuality::High,
            storage_retention: 30,
            email_notifications: true,
            sms_alerts: true,
            push_notifications: true,
        }
    }
}
