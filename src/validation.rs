//! Request validators.
//!
//! Each validator inspects the raw JSON body and either returns the typed
//! request or every violation it found, keyed by field path. Paths into
//! arrays use the element index (`data.0.id`).

use crate::error::AppError;
use crate::models::{
    BodyStatField, BodyStatsUpdate, Coordinates, HealthBatch, HealthItem, HistoryField,
    HistoryPeriod, LoginRequest, PasswordChange, PermissionName, ProfileUpdate,
};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::collections::HashSet;

const MIN_PASSWORD_LEN: usize = 6;
const MAX_MEASUREMENT: f64 = 500.0;
/// Largest integer a JSON client can represent exactly (2^53 - 1).
const MAX_SAFE_NUMBER: f64 = 9_007_199_254_740_991.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    entries: Vec<(String, Vec<String>)>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let field = field.into();
        let message = message.into();
        match self.entries.iter_mut().find(|(f, _)| *f == field) {
            Some((_, messages)) => messages.push(message),
            None => self.entries.push((field, vec![message])),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn messages_for(&self, field: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, messages)| messages.as_slice())
            .unwrap_or(&[])
    }

    /// First message, plus a count of the others.
    pub fn summary(&self) -> String {
        let messages: Vec<&String> = self.entries.iter().flat_map(|(_, m)| m).collect();
        match messages.split_first() {
            None => "Validation failed".to_string(),
            Some((first, [])) => first.to_string(),
            Some((first, rest)) => format!(
                "{} (and {} more error{})",
                first,
                rest.len(),
                if rest.len() > 1 { "s" } else { "" }
            ),
        }
    }

    pub fn fields(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(field, messages)| (field.clone(), Value::from(messages.clone())))
            .collect();
        Value::Object(map)
    }

    fn finish<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.summary())
    }
}

impl std::error::Error for ValidationErrors {}

// ============================================================================
// Helpers
// ============================================================================

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn object<'a>(
    value: &'a Value,
    path: &str,
    errors: &mut ValidationErrors,
) -> Option<&'a Map<String, Value>> {
    match value.as_object() {
        Some(map) => Some(map),
        None => {
            let field = if path.is_empty() { "body" } else { path };
            errors.add(field, format!("{} must be of type object", field));
            None
        }
    }
}

fn deny_unknown(
    map: &Map<String, Value>,
    allowed: &[&str],
    prefix: &str,
    errors: &mut ValidationErrors,
) {
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            let path = join(prefix, key);
            errors.add(path.clone(), format!("{} is not allowed", path));
        }
    }
}

fn required_string(
    map: &Map<String, Value>,
    key: &str,
    prefix: &str,
    label: &str,
    errors: &mut ValidationErrors,
) -> Option<String> {
    let path = join(prefix, key);
    match map.get(key) {
        None | Some(Value::Null) => {
            errors.add(path, format!("{} is required", label));
            None
        }
        Some(Value::String(s)) if s.is_empty() => {
            errors.add(path, format!("{} cannot be empty", label));
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.add(path, format!("{} must be a string", label));
            None
        }
    }
}

/// Numbers may arrive as JSON numbers or numeric strings.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels
            .iter()
            .all(|l| !l.is_empty() && l.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'))
}

fn is_vendor_guid(id: &str) -> bool {
    uuid::Uuid::parse_str(id)
        .map(|uuid| matches!(uuid.get_version_num(), 1 | 3 | 4 | 5))
        .unwrap_or(false)
}

// ============================================================================
// Auth
// ============================================================================

pub fn login(body: &Value) -> Result<LoginRequest, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let Some(map) = object(body, "", &mut errors) else {
        return Err(errors);
    };
    deny_unknown(map, &["email", "password"], "", &mut errors);

    let email = required_string(map, "email", "", "Email", &mut errors);
    if let Some(email) = &email {
        if !is_valid_email(email) {
            errors.add("email", "Invalid email format");
        }
    }

    let password = required_string(map, "password", "", "Password", &mut errors);
    if let Some(password) = &password {
        if password.chars().count() < MIN_PASSWORD_LEN {
            errors.add("password", "Password must be at least 6 characters");
        }
    }

    match (email, password) {
        (Some(email), Some(password)) => errors.finish(LoginRequest { email, password }),
        _ => Err(errors),
    }
}

fn single_token(body: &Value, key: &str, label: &str) -> Result<String, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let Some(map) = object(body, "", &mut errors) else {
        return Err(errors);
    };
    deny_unknown(map, &[key], "", &mut errors);
    match required_string(map, key, "", label, &mut errors) {
        Some(token) => errors.finish(token),
        None => Err(errors),
    }
}

pub fn refresh_token(body: &Value) -> Result<String, ValidationErrors> {
    single_token(body, "refreshToken", "Refresh token")
}

pub fn fcm_token(body: &Value) -> Result<String, ValidationErrors> {
    single_token(body, "fcmToken", "FCM token")
}

pub fn profile(body: &Value, today: NaiveDate) -> Result<ProfileUpdate, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let Some(map) = object(body, "", &mut errors) else {
        return Err(errors);
    };
    deny_unknown(map, &["full_name", "email", "birthdate"], "", &mut errors);

    let mut update = ProfileUpdate::default();

    match map.get("full_name") {
        None => {}
        Some(Value::String(name)) => {
            let len = name.chars().count();
            if len < 2 {
                errors.add("full_name", "Full name must be at least 2 characters");
            } else if len > 100 {
                errors.add("full_name", "Full name cannot exceed 100 characters");
            } else {
                update.full_name = Some(name.clone());
            }
        }
        Some(_) => errors.add("full_name", "Full name must be a string"),
    }

    match map.get("email") {
        None => {}
        Some(Value::String(email)) if is_valid_email(email) => update.email = Some(email.clone()),
        Some(_) => errors.add("email", "Invalid email format"),
    }

    match map.get("birthdate") {
        None => {}
        Some(Value::String(raw)) => {
            // Accept a plain date or the date part of an ISO timestamp.
            let date_part = raw.get(..10).unwrap_or(raw);
            match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
                Ok(date) if date > today => {
                    errors.add("birthdate", "Birthdate cannot be in the future")
                }
                Ok(date) => update.birthdate = Some(date),
                Err(_) => errors.add("birthdate", "Invalid date format"),
            }
        }
        Some(_) => errors.add("birthdate", "Invalid date format"),
    }

    if !["full_name", "email", "birthdate"]
        .iter()
        .any(|key| map.contains_key(*key))
    {
        errors.add("body", "At least one field is required");
    }

    errors.finish(update)
}

pub fn password_change(body: &Value) -> Result<PasswordChange, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let Some(map) = object(body, "", &mut errors) else {
        return Err(errors);
    };
    deny_unknown(
        map,
        &["current_password", "new_password", "password_confirmation"],
        "",
        &mut errors,
    );

    let current = required_string(map, "current_password", "", "Current password", &mut errors);
    let new = required_string(map, "new_password", "", "New password", &mut errors);
    if let Some(new) = &new {
        if new.chars().count() < MIN_PASSWORD_LEN {
            errors.add("new_password", "New password must be at least 6 characters");
        }
    }
    let confirmation = required_string(
        map,
        "password_confirmation",
        "",
        "Password confirmation",
        &mut errors,
    );
    if let (Some(new), Some(confirmation)) = (&new, &confirmation) {
        if new != confirmation {
            errors.add("password_confirmation", "Password confirmation does not match");
        }
    }

    match (current, new) {
        (Some(current_password), Some(new_password)) => errors.finish(PasswordChange {
            current_password,
            new_password,
        }),
        _ => Err(errors),
    }
}

// ============================================================================
// Body stats
// ============================================================================

pub fn body_stats(body: &Value) -> Result<BodyStatsUpdate, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let Some(map) = object(body, "", &mut errors) else {
        return Err(errors);
    };
    let allowed: Vec<&str> = BodyStatField::ALL.iter().map(|f| f.as_str()).collect();
    deny_unknown(map, &allowed, "", &mut errors);

    let mut update = BodyStatsUpdate::default();
    for field in BodyStatField::ALL {
        let Some(raw) = map.get(field.as_str()) else {
            continue;
        };
        if raw.is_null() {
            update.values.push((field, None));
            continue;
        }
        match as_number(raw) {
            None => errors.add(field.as_str(), "Must be a number"),
            Some(n) if n < 0.0 => errors.add(field.as_str(), "Value must be at least 0"),
            Some(n) if n > MAX_MEASUREMENT => {
                errors.add(field.as_str(), "Value cannot exceed 500")
            }
            Some(n) => update.values.push((field, Some(n))),
        }
    }

    if map.is_empty() {
        errors.add("body", "At least one field is required");
    }

    errors.finish(update)
}

/// Path and query parameters of the history endpoint. Bad values are a
/// plain 400, not a field-level 422.
pub fn history_params(
    field: &str,
    period: Option<&str>,
) -> Result<(HistoryField, HistoryPeriod), AppError> {
    let field = HistoryField::parse(field).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Invalid field. Must be one of: {}",
            HistoryField::valid_names().join(", ")
        ))
    })?;

    let period = match period {
        None => HistoryPeriod::default(),
        Some(p) => HistoryPeriod::parse(p).ok_or_else(|| {
            let names: Vec<&str> = HistoryPeriod::ALL.iter().map(|p| p.as_str()).collect();
            AppError::BadRequest(format!(
                "Invalid period. Must be one of: {}",
                names.join(", ")
            ))
        })?,
    };

    Ok((field, period))
}

// ============================================================================
// Health ingestion
// ============================================================================

pub fn health_batch(permission: &str, body: &Value) -> Result<HealthBatch, ValidationErrors> {
    let Some(permission) = PermissionName::parse(permission) else {
        let names: Vec<&str> = PermissionName::ALL.iter().map(|p| p.as_str()).collect();
        return Err(ValidationErrors::single(
            "PERMISSION_NAME",
            format!("PERMISSION_NAME must be one of [{}]", names.join(", ")),
        ));
    };

    let mut errors = ValidationErrors::new();
    let Some(map) = object(body, "", &mut errors) else {
        return Err(errors);
    };
    deny_unknown(map, &["data"], "", &mut errors);

    let entries = match map.get("data") {
        None | Some(Value::Null) => {
            errors.add("data", "data is required");
            return Err(errors);
        }
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            errors.add("data", "data must be an array");
            return Err(errors);
        }
    };
    if entries.is_empty() {
        errors.add("data", "data must contain at least 1 items");
        return Err(errors);
    }

    let value_field = permission.value_field();
    let allowed = ["id", "dataOrigin", "time", value_field];
    let mut seen = HashSet::new();
    let mut items = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let prefix = format!("data.{}", index);
        let Some(item) = object(entry, &prefix, &mut errors) else {
            continue;
        };
        deny_unknown(item, &allowed, &prefix, &mut errors);

        let id_path = join(&prefix, "id");
        let id = required_string(item, "id", &prefix, &id_path, &mut errors);
        let id = id.filter(|id| {
            let valid = is_vendor_guid(id);
            if !valid {
                errors.add(id_path.clone(), format!("{} must be a valid GUID", id_path));
            }
            valid
        });
        if let Some(id) = &id {
            if !seen.insert(id.clone()) {
                errors.add(prefix.clone(), format!("{} contains a duplicate value", prefix));
            }
        }

        let origin_path = join(&prefix, "dataOrigin");
        let data_origin = required_string(item, "dataOrigin", &prefix, &origin_path, &mut errors);

        let time_path = join(&prefix, "time");
        let time = match item.get("time") {
            None | Some(Value::Null) => {
                errors.add(time_path.clone(), format!("{} is required", time_path));
                None
            }
            Some(raw) => match as_number(raw) {
                None => {
                    errors.add(time_path.clone(), format!("{} must be a number", time_path));
                    None
                }
                Some(t) if t.abs() > MAX_SAFE_NUMBER => {
                    errors.add(time_path.clone(), format!("{} must be a safe number", time_path));
                    None
                }
                Some(t) if t.fract() != 0.0 => {
                    errors.add(time_path.clone(), format!("{} must be an integer", time_path));
                    None
                }
                Some(t) if t < 0.0 => {
                    errors.add(
                        time_path.clone(),
                        format!("{} must be greater than or equal to 0", time_path),
                    );
                    None
                }
                Some(t) => Some(t as i64),
            },
        };

        let value_path = join(&prefix, value_field);
        let value = match item.get(value_field) {
            None | Some(Value::Null) => {
                errors.add(value_path.clone(), format!("{} is required", value_path));
                None
            }
            Some(raw) => match as_number(raw) {
                None => {
                    errors.add(value_path.clone(), format!("{} must be a number", value_path));
                    None
                }
                Some(v) if v.abs() > MAX_SAFE_NUMBER => {
                    errors.add(value_path.clone(), format!("{} must be a safe number", value_path));
                    None
                }
                Some(v) if v < 0.0 => {
                    errors.add(
                        value_path.clone(),
                        format!("{} must be greater than or equal to 0", value_path),
                    );
                    None
                }
                Some(v) if permission.max_value().is_some_and(|max| v > max) => {
                    errors.add(
                        value_path.clone(),
                        format!(
                            "{} must be less than or equal to {}",
                            value_path,
                            permission.max_value().unwrap_or_default()
                        ),
                    );
                    None
                }
                Some(v) => Some(v),
            },
        };

        if let (Some(id), Some(data_origin), Some(time), Some(value)) =
            (id, data_origin, time, value)
        {
            items.push(HealthItem {
                id,
                data_origin,
                time,
                value,
            });
        }
    }

    errors.finish(HealthBatch { permission, items })
}

// ============================================================================
// Weather
// ============================================================================

pub fn coordinates(body: &Value) -> Result<Coordinates, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let Some(map) = object(body, "", &mut errors) else {
        return Err(errors);
    };
    deny_unknown(map, &["lat", "lon"], "", &mut errors);

    let lat = bounded_coordinate(map, "lat", "Latitude", 90.0, &mut errors);
    let lon = bounded_coordinate(map, "lon", "Longitude", 180.0, &mut errors);

    match (lat, lon) {
        (Some(lat), Some(lon)) => errors.finish(Coordinates { lat, lon }),
        _ => Err(errors),
    }
}

fn bounded_coordinate(
    map: &Map<String, Value>,
    key: &str,
    label: &str,
    bound: f64,
    errors: &mut ValidationErrors,
) -> Option<f64> {
    match map.get(key) {
        None => {
            errors.add(key, format!("{} is required", label));
            None
        }
        Some(raw) => match as_number(raw) {
            None => {
                errors.add(key, format!("{} must be a number", label));
                None
            }
            Some(n) if n < -bound || n > bound => {
                errors.add(
                    key,
                    format!("{} must be between -{} and {}", label, bound, bound),
                );
                None
            }
            Some(n) => Some(n),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
    }

    #[test]
    fn test_summary_counts_remaining_errors() {
        let mut errors = ValidationErrors::new();
        assert_eq!(errors.summary(), "Validation failed");
        errors.add("email", "Email is required");
        assert_eq!(errors.summary(), "Email is required");
        errors.add("password", "Password is required");
        assert_eq!(errors.summary(), "Email is required (and 1 more error)");
        errors.add("password", "Another");
        assert_eq!(errors.summary(), "Email is required (and 2 more errors)");
        assert_eq!(errors.messages_for("password").len(), 2);
        assert_eq!(errors.fields()["email"][0], "Email is required");
    }

    #[test]
    fn test_login_collects_all_errors() {
        let errors = login(&json!({"email": "nope", "password": "123"})).unwrap_err();
        assert_eq!(errors.messages_for("email"), ["Invalid email format"]);
        assert_eq!(
            errors.messages_for("password"),
            ["Password must be at least 6 characters"]
        );

        let errors = login(&json!({"password": ""})).unwrap_err();
        assert_eq!(errors.messages_for("email"), ["Email is required"]);
        assert_eq!(errors.messages_for("password"), ["Password cannot be empty"]);

        let ok = login(&json!({"email": "ana@example.com", "password": "secret1"})).unwrap();
        assert_eq!(ok.email, "ana@example.com");
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let errors = refresh_token(&json!({"refreshToken": "abc", "extra": 1})).unwrap_err();
        assert_eq!(errors.messages_for("extra"), ["extra is not allowed"]);
        assert_eq!(refresh_token(&json!({"refreshToken": "abc"})).unwrap(), "abc");
    }

    #[test]
    fn test_email_format() {
        assert!(is_valid_email("a.b@mail.example.org"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("a@@example.com"));
    }

    #[test]
    fn test_profile_rules() {
        let errors = profile(&json!({}), today()).unwrap_err();
        assert_eq!(errors.messages_for("body"), ["At least one field is required"]);

        let errors = profile(&json!({"birthdate": "2030-01-01"}), today()).unwrap_err();
        assert_eq!(errors.messages_for("birthdate"), ["Birthdate cannot be in the future"]);

        let errors = profile(&json!({"full_name": "A"}), today()).unwrap_err();
        assert_eq!(
            errors.messages_for("full_name"),
            ["Full name must be at least 2 characters"]
        );

        let update = profile(&json!({"birthdate": "1990-04-02T00:00:00Z"}), today()).unwrap();
        assert_eq!(update.birthdate, NaiveDate::from_ymd_opt(1990, 4, 2));
    }

    #[test]
    fn test_password_confirmation_must_match() {
        let errors = password_change(&json!({
            "current_password": "old-secret",
            "new_password": "new-secret",
            "password_confirmation": "other",
        }))
        .unwrap_err();
        assert_eq!(
            errors.messages_for("password_confirmation"),
            ["Password confirmation does not match"]
        );
    }

    #[test]
    fn test_body_stats_update() {
        let update = body_stats(&json!({"waist": 81.5, "neck": null, "hips": "99"})).unwrap();
        assert_eq!(
            update.values,
            vec![
                (BodyStatField::Waist, Some(81.5)),
                (BodyStatField::Neck, None),
                (BodyStatField::Hips, Some(99.0)),
            ]
        );

        let errors = body_stats(&json!({"waist": 501, "chest": -1, "neck": "x"})).unwrap_err();
        assert_eq!(errors.messages_for("waist"), ["Value cannot exceed 500"]);
        assert_eq!(errors.messages_for("chest"), ["Value must be at least 0"]);
        assert_eq!(errors.messages_for("neck"), ["Must be a number"]);

        let errors = body_stats(&json!({})).unwrap_err();
        assert_eq!(errors.messages_for("body"), ["At least one field is required"]);

        let errors = body_stats(&json!({"right_shoulder": 40})).unwrap_err();
        assert_eq!(
            errors.messages_for("right_shoulder"),
            ["right_shoulder is not allowed"]
        );
    }

    #[test]
    fn test_history_params() {
        let (field, period) = history_params("bmi", None).unwrap();
        assert_eq!(field, HistoryField::Bmi);
        assert_eq!(period, HistoryPeriod::Month);

        assert!(matches!(
            history_params("weight", Some("decade")),
            Err(AppError::BadRequest(msg)) if msg == "Invalid period. Must be one of: month, year, all"
        ));
        assert!(matches!(
            history_params("ankle", Some("all")),
            Err(AppError::BadRequest(msg)) if msg.starts_with("Invalid field. Must be one of: waist")
        ));
    }

    #[test]
    fn test_health_batch_valid() {
        let batch = health_batch(
            "BodyFat",
            &json!({"data": [{
                "id": "7d444840-9dc0-11d1-b245-5ffdce74fad2",
                "dataOrigin": "com.example.scale",
                "time": 1_700_000_000_000_i64,
                "percentage": 21.4,
            }]}),
        )
        .unwrap();
        assert_eq!(batch.permission, PermissionName::BodyFat);
        assert_eq!(batch.items.len(), 1);
        assert_eq!(batch.items[0].value, 21.4);
    }

    #[test]
    fn test_health_batch_item_errors() {
        let id = "6f1c2a4e-8b7d-4c3a-9e2f-1a2b3c4d5e6f";
        let errors = health_batch(
            "BodyFat",
            &json!({"data": [
                {"id": id, "dataOrigin": "x", "time": 1, "percentage": 101},
                {"id": id, "dataOrigin": "", "time": -5, "percentage": 10},
                {"id": "not-a-guid", "dataOrigin": "x", "time": 1.5, "weight": 10},
            ]}),
        )
        .unwrap_err();

        assert_eq!(
            errors.messages_for("data.0.percentage"),
            ["data.0.percentage must be less than or equal to 100"]
        );
        assert_eq!(errors.messages_for("data.1"), ["data.1 contains a duplicate value"]);
        assert_eq!(errors.messages_for("data.1.dataOrigin"), ["data.1.dataOrigin cannot be empty"]);
        assert_eq!(
            errors.messages_for("data.1.time"),
            ["data.1.time must be greater than or equal to 0"]
        );
        assert_eq!(errors.messages_for("data.2.id"), ["data.2.id must be a valid GUID"]);
        assert_eq!(errors.messages_for("data.2.time"), ["data.2.time must be an integer"]);
        assert_eq!(errors.messages_for("data.2.weight"), ["data.2.weight is not allowed"]);
        assert_eq!(errors.messages_for("data.2.percentage"), ["data.2.percentage is required"]);
    }

    #[test]
    fn test_health_batch_rejects_unsafe_numbers() {
        let errors = health_batch(
            "Weight",
            &json!({"data": [
                {"id": "7d444840-9dc0-11d1-b245-5ffdce74fad2", "dataOrigin": "x", "time": 1e20, "weight": 80},
                {"id": "6f1c2a4e-8b7d-4c3a-9e2f-1a2b3c4d5e6f", "dataOrigin": "x", "time": 1, "weight": 1e300},
            ]}),
        )
        .unwrap_err();

        assert_eq!(errors.messages_for("data.0.time"), ["data.0.time must be a safe number"]);
        assert_eq!(errors.messages_for("data.1.weight"), ["data.1.weight must be a safe number"]);

        let batch = health_batch(
            "Weight",
            &json!({"data": [{
                "id": "7d444840-9dc0-11d1-b245-5ffdce74fad2",
                "dataOrigin": "x",
                "time": 9_007_199_254_740_991_i64,
                "weight": 80,
            }]}),
        )
        .unwrap();
        assert_eq!(batch.items[0].time, 9_007_199_254_740_991);
    }

    #[test]
    fn test_health_batch_rejects_unknown_permission_and_empty_data() {
        let errors = health_batch("HeartRate", &json!({"data": []})).unwrap_err();
        assert!(errors.messages_for("PERMISSION_NAME")[0].starts_with("PERMISSION_NAME must be one of"));

        let errors = health_batch("Weight", &json!({"data": []})).unwrap_err();
        assert_eq!(errors.messages_for("data"), ["data must contain at least 1 items"]);

        let errors = health_batch("Weight", &json!({})).unwrap_err();
        assert_eq!(errors.messages_for("data"), ["data is required"]);
    }

    #[test]
    fn test_coordinates() {
        let coords = coordinates(&json!({"lat": 48.85, "lon": 2.35})).unwrap();
        assert_eq!(coords, Coordinates { lat: 48.85, lon: 2.35 });

        let errors = coordinates(&json!({"lat": 91, "lon": "east"})).unwrap_err();
        assert_eq!(errors.messages_for("lat"), ["Latitude must be between -90 and 90"]);
        assert_eq!(errors.messages_for("lon"), ["Longitude must be a number"]);

        let errors = coordinates(&json!({})).unwrap_err();
        assert_eq!(errors.summary(), "Latitude is required (and 1 more error)");
    }
}
