use super::{require_non_empty, Record};
use crate::error::Error;
use serde::{Deserialize, Serialize};

/// Camera model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Camera {
    #[serde(rename = "Id")]
    pub id: i64,
    pub name: String,
    pub zone: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub stream_url: String,
}

fn default_active() -> bool {
    true
}

impl Record for Camera {
    const KIND: &'static str = "Camera";

    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCamera {
    pub name: String,
    pub zone: String,
    #[serde(default)]
    pub stream_url: String,
    /// New cameras come online unless stated otherwise
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl NewCamera {
    pub fn validate(&self) -> Result<(), Error> {
        require_non_empty("name", &self.name)?;
        require_non_empty("zone", &self.zone)
    }

    pub fn into_camera(self, id: i64) -> Camera {
        Camera {
            id,
            name: self.name,
            zone: self.zone,
            is_active: self.is_active.unwrap_or(true),
            stream_url: self.stream_url,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraUpdate {
    pub name: Option<String>,
    pub zone: Option<String>,
    pub is_active: Option<bool>,
    pub stream_url: Option<String>,
}

impl CameraUpdate {
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(name) = &self.name {
            require_non_empty("name", name)?;
        }
        if let Some(zone) = &self.zone {
            require_non_empty("zone", zone)?;
        }
        Ok(())
    }

    pub fn apply(self, camera: &mut Camera) {
        if let Some(name) = self.name {
            camera.name = name;
        }
        if let Some(zone) = self.zone {
            camera.zone = zone;
        }
        if let Some(is_active) = self.is_active {
            camera.is_active = is_active;
        }
        if let Some(stream_url) = self.stream_url {
            camera.stream_url = stream_url;
        }
    }
}
