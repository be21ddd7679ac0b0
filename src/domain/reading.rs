use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Role a device plays in the site energy balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceRole {
    Generation,
    Consumption,
    Other,
}

impl DeviceRole {
    /// Classify a stored device type (`solar`, `wind`, `load`, ...)
    pub fn from_device_type(device_type: &str) -> Self {
        match device_type.trim().to_ascii_lowercase().as_str() {
            "solar" | "wind" => Self::Generation,
            "load" | "home" => Self::Consumption,
            _ => Self::Other,
        }
    }
}

/// A monitored site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    pub name: String,
    /// IANA timezone identifier, e.g. "Europe/Stockholm"
    pub timezone: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl Site {
    /// Parsed timezone; `None` when the stored identifier is unknown
    pub fn tz(&self) -> Option<Tz> {
        self.timezone.parse::<Tz>().ok()
    }
}

/// A device installed at a site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub site_id: String,
    pub device_type: String,
    /// Nameplate capacity in kW
    pub capacity_kw: f64,
}

impl Device {
    pub fn role(&self) -> DeviceRole {
        DeviceRole::from_device_type(&self.device_type)
    }
}

/// A power reading as stored, before the device role is resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub power_kw: f64,
}

/// A power reading with its device role resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalReading {
    pub device_id: String,
    pub device_role: DeviceRole,
    pub timestamp: DateTime<Utc>,
    pub power_kw: f64,
}
