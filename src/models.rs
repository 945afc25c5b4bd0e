use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sqlx::FromRow;

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub fcm_token: Option<String>,
    pub full_name: String,
    pub birthdate: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub full_name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub user: UserSummary,
    pub tokens: TokenPair,
}

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub birthdate: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

// ============================================================================
// Body stats
// ============================================================================

/// User-entered tape measurements, in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BodyStatField {
    Waist,
    Neck,
    Chest,
    RightArm,
    LeftArm,
    RightForearm,
    LeftForearm,
    Shoulders,
    Hips,
    RightThigh,
    LeftThigh,
    RightCalve,
    LeftCalve,
}

impl BodyStatField {
    pub const ALL: [BodyStatField; 13] = [
        BodyStatField::Waist,
        BodyStatField::Neck,
        BodyStatField::Chest,
        BodyStatField::RightArm,
        BodyStatField::LeftArm,
        BodyStatField::RightForearm,
        BodyStatField::LeftForearm,
        BodyStatField::Shoulders,
        BodyStatField::Hips,
        BodyStatField::RightThigh,
        BodyStatField::LeftThigh,
        BodyStatField::RightCalve,
        BodyStatField::LeftCalve,
    ];

    /// Column name in `body_stats`, also the JSON key.
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyStatField::Waist => "waist",
            BodyStatField::Neck => "neck",
            BodyStatField::Chest => "chest",
            BodyStatField::RightArm => "right_arm",
            BodyStatField::LeftArm => "left_arm",
            BodyStatField::RightForearm => "right_forearm",
            BodyStatField::LeftForearm => "left_forearm",
            BodyStatField::Shoulders => "shoulders",
            BodyStatField::Hips => "hips",
            BodyStatField::RightThigh => "right_thigh",
            BodyStatField::LeftThigh => "left_thigh",
            BodyStatField::RightCalve => "right_calve",
            BodyStatField::LeftCalve => "left_calve",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == s)
    }
}

impl std::fmt::Display for BodyStatField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Anything that has a history chart: a tape measurement or a
/// device-sourced value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryField {
    Measurement(BodyStatField),
    Weight,
    Height,
    Bmi,
}

impl HistoryField {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryField::Measurement(field) => field.as_str(),
            HistoryField::Weight => "weight",
            HistoryField::Height => "height",
            HistoryField::Bmi => "bmi",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "weight" => Some(HistoryField::Weight),
            "height" => Some(HistoryField::Height),
            "bmi" => Some(HistoryField::Bmi),
            other => BodyStatField::parse(other).map(HistoryField::Measurement),
        }
    }

    pub fn valid_names() -> Vec<&'static str> {
        BodyStatField::ALL
            .iter()
            .map(|f| f.as_str())
            .chain(["weight", "height", "bmi"])
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryPeriod {
    #[default]
    Month,
    Year,
    All,
}

impl HistoryPeriod {
    pub const ALL: [HistoryPeriod; 3] = [HistoryPeriod::Month, HistoryPeriod::Year, HistoryPeriod::All];

    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryPeriod::Month => "month",
            HistoryPeriod::Year => "year",
            HistoryPeriod::All => "all",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BodyStats {
    pub id: String,
    #[serde(skip_serializing)]
    pub user_id: String,
    pub record_date: String,
    pub waist: Option<f64>,
    pub neck: Option<f64>,
    pub chest: Option<f64>,
    pub right_arm: Option<f64>,
    pub left_arm: Option<f64>,
    pub right_forearm: Option<f64>,
    pub left_forearm: Option<f64>,
    pub shoulders: Option<f64>,
    pub hips: Option<f64>,
    pub right_thigh: Option<f64>,
    pub left_thigh: Option<f64>,
    pub right_calve: Option<f64>,
    pub left_calve: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

impl BodyStats {
    pub fn get(&self, field: BodyStatField) -> Option<f64> {
        match field {
            BodyStatField::Waist => self.waist,
            BodyStatField::Neck => self.neck,
            BodyStatField::Chest => self.chest,
            BodyStatField::RightArm => self.right_arm,
            BodyStatField::LeftArm => self.left_arm,
            BodyStatField::RightForearm => self.right_forearm,
            BodyStatField::LeftForearm => self.left_forearm,
            BodyStatField::Shoulders => self.shoulders,
            BodyStatField::Hips => self.hips,
            BodyStatField::RightThigh => self.right_thigh,
            BodyStatField::LeftThigh => self.left_thigh,
            BodyStatField::RightCalve => self.right_calve,
            BodyStatField::LeftCalve => self.left_calve,
        }
    }
}

/// Fields supplied in a body-stats update. `None` clears the stored value;
/// fields not listed are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BodyStatsUpdate {
    pub values: Vec<(BodyStatField, Option<f64>)>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct HistoryItem {
    pub record_date: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LatestValue {
    pub value: Option<f64>,
    pub record_date: Option<String>,
}

// ============================================================================
// Health samples
// ============================================================================

/// Categories of device health data that can be relayed to the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PermissionName {
    Weight,
    Height,
    BodyFat,
    BodyWaterMass,
    BoneMass,
    LeanBodyMass,
    BasalMetabolicRate,
}

impl PermissionName {
    pub const ALL: [PermissionName; 7] = [
        PermissionName::Weight,
        PermissionName::Height,
        PermissionName::BodyFat,
        PermissionName::BodyWaterMass,
        PermissionName::BoneMass,
        PermissionName::LeanBodyMass,
        PermissionName::BasalMetabolicRate,
    ];

    /// Route segment and stored discriminator.
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionName::Weight => "Weight",
            PermissionName::Height => "Height",
            PermissionName::BodyFat => "BodyFat",
            PermissionName::BodyWaterMass => "BodyWaterMass",
            PermissionName::BoneMass => "BoneMass",
            PermissionName::LeanBodyMass => "LeanBodyMass",
            PermissionName::BasalMetabolicRate => "BasalMetabolicRate",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }

    /// Snake-case name used by the mobile client for its data types.
    pub fn slug(&self) -> &'static str {
        match self {
            PermissionName::Weight => "weight",
            PermissionName::Height => "height",
            PermissionName::BodyFat => "body_fat",
            PermissionName::BodyWaterMass => "body_water_mass",
            PermissionName::BoneMass => "bone_mass",
            PermissionName::LeanBodyMass => "lean_body_mass",
            PermissionName::BasalMetabolicRate => "basal_metabolic_rate",
        }
    }

    pub fn from_slug(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.slug() == s)
    }

    /// JSON key carrying the measured value for this data type.
    pub fn value_field(&self) -> &'static str {
        match self {
            PermissionName::Weight => "weight",
            PermissionName::Height => "height",
            PermissionName::BodyFat => "percentage",
            PermissionName::BodyWaterMass | PermissionName::BoneMass | PermissionName::LeanBodyMass => "mass",
            PermissionName::BasalMetabolicRate => "basalMetabolicRate",
        }
    }

    pub fn max_value(&self) -> Option<f64> {
        match self {
            PermissionName::BodyFat => Some(100.0),
            _ => None,
        }
    }
}

impl std::fmt::Display for PermissionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A device-sourced sample, identified by the vendor-assigned `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthItem {
    pub id: String,
    pub data_origin: String,
    /// Epoch milliseconds.
    pub time: i64,
    pub value: f64,
}

impl HealthItem {
    pub fn to_json(&self, permission: PermissionName) -> Value {
        let mut map = Map::new();
        map.insert("id".into(), json!(self.id));
        map.insert("dataOrigin".into(), json!(self.data_origin));
        map.insert("time".into(), json!(self.time));
        map.insert(permission.value_field().into(), json!(self.value));
        Value::Object(map)
    }

    /// Lenient parse used when reading exported records. Request bodies go
    /// through `validation::health_batch` instead.
    pub fn from_json(value: &Value, permission: PermissionName) -> Option<Self> {
        Some(Self {
            id: value.get("id")?.as_str()?.to_string(),
            data_origin: value.get("dataOrigin")?.as_str()?.to_string(),
            time: value.get("time")?.as_i64()?,
            value: value.get(permission.value_field())?.as_f64()?,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct HealthSample {
    pub permission: String,
    pub id: String,
    pub user_id: String,
    pub data_origin: String,
    pub time: i64,
    pub value: f64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct HealthBatch {
    pub permission: PermissionName,
    pub items: Vec<HealthItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreResult {
    pub inserted: usize,
    pub skipped: Vec<String>,
}

// ============================================================================
// Weather
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherReport {
    pub city: String,
    pub weather: String,
    pub temperature: String,
    pub icon: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_field_parse() {
        assert_eq!(HistoryField::parse("bmi"), Some(HistoryField::Bmi));
        assert_eq!(
            HistoryField::parse("right_calve"),
            Some(HistoryField::Measurement(BodyStatField::RightCalve))
        );
        assert_eq!(HistoryField::parse("right_shoulder"), None);
        assert_eq!(HistoryField::valid_names().len(), 16);
    }

    #[test]
    fn test_permission_names() {
        for permission in PermissionName::ALL {
            assert_eq!(PermissionName::parse(permission.as_str()), Some(permission));
            assert_eq!(PermissionName::from_slug(permission.slug()), Some(permission));
        }
        assert_eq!(PermissionName::BoneMass.value_field(), "mass");
        assert_eq!(PermissionName::BodyFat.max_value(), Some(100.0));
        assert_eq!(PermissionName::parse("HeartRate"), None);
    }

    #[test]
    fn test_health_item_json_uses_permission_field() {
        let item = HealthItem {
            id: "c0a80101-0000-4000-8000-000000000001".into(),
            data_origin: "com.example.scale".into(),
            time: 1_700_000_000_000,
            value: 1650.0,
        };
        let json = item.to_json(PermissionName::BasalMetabolicRate);
        assert_eq!(json["basalMetabolicRate"], 1650.0);
        assert_eq!(json["dataOrigin"], "com.example.scale");

        let parsed = HealthItem::from_json(&json, PermissionName::BasalMetabolicRate).unwrap();
        assert_eq!(parsed, item);
        assert!(HealthItem::from_json(&json, PermissionName::Weight).is_none());
    }
}
