//! Strict request-body validation.
//!
//! Bodies are read as raw JSON objects so that every problem is reported
//! per field (`{"name": ["This field is required."]}`) instead of failing on
//! the first serde error. Unknown keys are rejected. String values have
//! surrounding whitespace trimmed before any other check.

use cafe_core::{CAFE_IMAGE_MAX_LEN, CAFE_LOCATION_MAX_LEN, CAFE_NAME_MAX_LEN};
use serde_json::{Map, Value};

use crate::error::FieldErrors;

pub const REQUIRED: &str = "This field is required.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const NOT_BLANK: &str = "This field may not be blank.";
pub const NOT_A_STRING: &str = "Not a valid string.";
pub const NOT_A_BOOLEAN: &str = "Must be a valid boolean.";
pub const UNKNOWN_FIELD: &str = "This field is not allowed.";
pub const UNIQUE_CAFE: &str = "The fields name, city must make a unique set.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const INVALID_USERNAME: &str =
    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";
pub const PASSWORD_MISMATCH: &str = "The two password fields didn't match.";
pub const USERNAME_TAKEN: &str = "A user with that username already exists.";

pub const USERNAME_MAX_LEN: usize = 150;
pub const EMAIL_MAX_LEN: usize = 254;
const CITY_NAME_MAX_LEN: usize = 100;

fn max_len_message(max: usize) -> String {
    format!("Ensure this field has no more than {max} characters.")
}

/// Checks a city name taken from the URL, which is stored as-is when the
/// city is created on first use.
pub fn check_path_city(city: &str) -> Result<(), FieldErrors> {
    if city.trim().is_empty() {
        return Err(FieldErrors::single("city", NOT_BLANK));
    }
    if city.chars().count() > CITY_NAME_MAX_LEN {
        return Err(FieldErrors::single("city", max_len_message(CITY_NAME_MAX_LEN)));
    }
    Ok(())
}

/// Which fields must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadMode {
    /// POST and PUT: `name` and `location` are required.
    Full,
    /// PATCH: every field is optional.
    Partial,
}

/// A validated cafe body. Absent keys are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CafeInput {
    pub name: Option<String>,
    pub location: Option<String>,
    /// `Some(None)` when the body sets `image` to null or "".
    pub image: Option<Option<String>>,
    pub approved: Option<bool>,
    /// Target city name; a cafe write may move the cafe there.
    pub city: Option<String>,
}

const CAFE_FIELDS: &[&str] = &["name", "location", "image", "approved", "city"];

/// Validated `POST /register/` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

const REGISTER_FIELDS: &[&str] = &["username", "email", "password1", "password2"];

/// Reads fields out of a JSON object, collecting errors as it goes.
struct Reader<'a> {
    map: &'a Map<String, Value>,
    errors: FieldErrors,
}

impl<'a> Reader<'a> {
    fn new(body: &'a Value, allowed: &[&str]) -> Result<Self, FieldErrors> {
        let Some(map) = body.as_object() else {
            return Err(FieldErrors::single(
                FieldErrors::NON_FIELD,
                format!(
                    "Invalid data. Expected a dictionary, but got {}.",
                    json_kind(body)
                ),
            ));
        };
        let mut errors = FieldErrors::new();
        for key in map.keys().filter(|k| !allowed.contains(&k.as_str())) {
            errors.add(key.as_str(), UNKNOWN_FIELD);
        }
        Ok(Self { map, errors })
    }

    /// A non-blank string of at most `max` characters. Missing keys are
    /// reported only when `required`.
    fn string(&mut self, key: &str, max: usize, required: bool) -> Option<String> {
        match self.map.get(key) {
            None => {
                if required {
                    self.errors.add(key, REQUIRED);
                }
                None
            }
            Some(Value::Null) => {
                self.errors.add(key, NOT_NULL);
                None
            }
            Some(Value::String(s)) => {
                let s = s.trim();
                if s.is_empty() {
                    self.errors.add(key, NOT_BLANK);
                    None
                } else if s.chars().count() > max {
                    self.errors.add(key, max_len_message(max));
                    None
                } else {
                    Some(s.to_string())
                }
            }
            Some(_) => {
                self.errors.add(key, NOT_A_STRING);
                None
            }
        }
    }

    /// Like [`Reader::string`] but null and "" clear the value.
    fn nullable_string(&mut self, key: &str, max: usize) -> Option<Option<String>> {
        match self.map.get(key) {
            None => None,
            Some(Value::Null) => Some(None),
            Some(Value::String(s)) if s.trim().is_empty() => Some(None),
            Some(_) => self.string(key, max, false).map(Some),
        }
    }

    fn boolean(&mut self, key: &str) -> Option<bool> {
        match self.map.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::Null => {
                self.errors.add(key, NOT_NULL);
                None
            }
            _ => {
                self.errors.add(key, NOT_A_BOOLEAN);
                None
            }
        }
    }

    /// A string taken verbatim (passwords are not trimmed).
    fn raw_string(&mut self, key: &str) -> Option<String> {
        match self.map.get(key) {
            None => {
                self.errors.add(key, REQUIRED);
                None
            }
            Some(Value::String(s)) if s.is_empty() => {
                self.errors.add(key, NOT_BLANK);
                None
            }
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) => {
                self.errors.add(key, NOT_NULL);
                None
            }
            Some(_) => {
                self.errors.add(key, NOT_A_STRING);
                None
            }
        }
    }

    fn finish<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self.errors)
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Validates a cafe body.
///
/// # Errors
///
/// Returns every field problem found, including unknown keys.
pub fn parse_cafe(body: &Value, mode: PayloadMode) -> Result<CafeInput, FieldErrors> {
    let mut reader = Reader::new(body, CAFE_FIELDS)?;
    let required = mode == PayloadMode::Full;
    let input = CafeInput {
        name: reader.string("name", CAFE_NAME_MAX_LEN, required),
        location: reader.string("location", CAFE_LOCATION_MAX_LEN, required),
        image: reader.nullable_string("image", CAFE_IMAGE_MAX_LEN),
        approved: reader.boolean("approved"),
        city: reader.string("city", CITY_NAME_MAX_LEN, false),
    };
    reader.finish(input)
}

/// Validates a registration body. Password strength problems are reported
/// on `password1`, a mismatch on `password2`.
///
/// # Errors
///
/// Returns every field problem found, including unknown keys.
pub fn parse_registration(body: &Value) -> Result<Registration, FieldErrors> {
    let mut reader = Reader::new(body, REGISTER_FIELDS)?;

    let username = reader.string("username", USERNAME_MAX_LEN, true);
    if let Some(name) = &username {
        if !is_valid_username(name) {
            reader.errors.add("username", INVALID_USERNAME);
        }
    }

    let email = reader.string("email", EMAIL_MAX_LEN, true);
    if let Some(email) = &email {
        if !is_valid_email(email) {
            reader.errors.add("email", INVALID_EMAIL);
        }
    }

    let password1 = reader.raw_string("password1");
    let password2 = reader.raw_string("password2");
    if let Some(password) = &password1 {
        for problem in cafe_auth::password_problems(password) {
            reader.errors.add("password1", problem);
        }
        if password2.as_ref().is_some_and(|p| p != password) {
            reader.errors.add("password2", PASSWORD_MISMATCH);
        }
    }

    match (username, email, password1) {
        (Some(username), Some(email), Some(password)) => reader.finish(Registration {
            username,
            email,
            password,
        }),
        _ => Err(reader.errors),
    }
}

fn is_valid_username(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

/// Exactly one `@` with a non-empty local part and a dotted domain.
fn is_valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && !email.chars().any(char::is_whitespace)
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_city_limits() {
        assert!(check_path_city("Test City").is_ok());
        assert!(check_path_city(&"ż".repeat(CITY_NAME_MAX_LEN)).is_ok());

        let errors = check_path_city(&"x".repeat(CITY_NAME_MAX_LEN + 1)).unwrap_err();
        assert_eq!(
            errors.get("city"),
            Some(&[max_len_message(CITY_NAME_MAX_LEN)][..])
        );
        assert_eq!(
            check_path_city("   ").unwrap_err().get("city"),
            Some(&[NOT_BLANK.to_string()][..])
        );
    }

    #[test]
    fn test_full_cafe_payload() {
        let input = parse_cafe(
            &json!({"name": " Test Cafe ", "location": "Main St", "image": null, "approved": false}),
            PayloadMode::Full,
        )
        .unwrap();
        assert_eq!(input.name.as_deref(), Some("Test Cafe"));
        assert_eq!(input.location.as_deref(), Some("Main St"));
        assert_eq!(input.image, Some(None));
        assert_eq!(input.approved, Some(false));
        assert_eq!(input.city, None);
    }

    #[test]
    fn test_missing_required_fields() {
        let errors = parse_cafe(&json!({}), PayloadMode::Full).unwrap_err();
        assert_eq!(errors.get("name"), Some(&[REQUIRED.to_string()][..]));
        assert_eq!(errors.get("location"), Some(&[REQUIRED.to_string()][..]));

        // Partial bodies may omit anything.
        let input = parse_cafe(&json!({}), PayloadMode::Partial).unwrap();
        assert_eq!(input, CafeInput::default());
    }

    #[test]
    fn test_unknown_fields_and_types() {
        let errors = parse_cafe(
            &json!({"name": 3, "location": "", "approved": "yes", "owner": "bob"}),
            PayloadMode::Partial,
        )
        .unwrap_err();
        assert_eq!(errors.get("name"), Some(&[NOT_A_STRING.to_string()][..]));
        assert_eq!(errors.get("location"), Some(&[NOT_BLANK.to_string()][..]));
        assert_eq!(errors.get("approved"), Some(&[NOT_A_BOOLEAN.to_string()][..]));
        assert_eq!(errors.get("owner"), Some(&[UNKNOWN_FIELD.to_string()][..]));
    }

    #[test]
    fn test_length_limits_count_characters() {
        let ok = "é".repeat(CAFE_NAME_MAX_LEN);
        let input = parse_cafe(&json!({"name": ok}), PayloadMode::Partial).unwrap();
        assert_eq!(input.name.unwrap().chars().count(), CAFE_NAME_MAX_LEN);

        let too_long = "x".repeat(CAFE_NAME_MAX_LEN + 1);
        let errors = parse_cafe(&json!({"name": too_long}), PayloadMode::Partial).unwrap_err();
        assert_eq!(
            errors.get("name").unwrap()[0],
            "Ensure this field has no more than 16 characters."
        );
    }

    #[test]
    fn test_non_object_body() {
        let errors = parse_cafe(&json!(["name"]), PayloadMode::Full).unwrap_err();
        assert_eq!(
            errors.get(FieldErrors::NON_FIELD).unwrap()[0],
            "Invalid data. Expected a dictionary, but got list."
        );
    }

    #[test]
    fn test_registration() {
        let reg = parse_registration(&json!({
            "username": "alice",
            "email": "alice@example.com",
            "password1": "wonderland",
            "password2": "wonderland",
        }))
        .unwrap();
        assert_eq!(reg.username, "alice");
        assert_eq!(reg.password, "wonderland");
    }

    #[test]
    fn test_registration_errors() {
        let errors = parse_registration(&json!({
            "username": "al ice",
            "email": "alice@@example.com",
            "password1": "12345",
            "password2": "54321",
        }))
        .unwrap_err();
        assert_eq!(errors.get("username").unwrap()[0], INVALID_USERNAME);
        assert_eq!(errors.get("email").unwrap()[0], INVALID_EMAIL);
        assert_eq!(errors.get("password1").unwrap().len(), 2);
        assert_eq!(errors.get("password2").unwrap()[0], PASSWORD_MISMATCH);

        let errors = parse_registration(&json!({"username": "bob"})).unwrap_err();
        assert!(errors.get("email").is_some());
        assert!(errors.get("password1").is_some());
        assert!(errors.get("password2").is_some());
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a@.co"));
        assert!(!is_valid_email("a b@c.co"));
    }
}
