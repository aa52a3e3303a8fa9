use std::fmt;

use serde::{Deserialize, Serialize};

/// Snapshot of an account as returned by the authentication API.
///
/// Replaced wholesale on login; never patched in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    #[serde(alias = "nome")]
    pub name: String,
    pub email: String,
    #[serde(default, alias = "telefone")]
    pub phone: Option<String>,
    #[serde(default, alias = "is_superuser")]
    pub is_administrator: bool,
    #[serde(default)]
    pub is_staff: bool,
}

impl UserRecord {
    pub fn display_name(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }
}

/// New-account request body for `POST /register/`.
#[derive(Clone, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub is_administrator: bool,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("password", &"<redacted>")
            .field("is_administrator", &self.is_administrator)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_with_legacy_field_names() {
        let json = r#"{"id": 7, "nome": "Carlos Lima", "email": "carlos@x.com", "telefone": "11 99999-0000", "is_staff": true, "is_superuser": true}"#;
        let user: UserRecord = serde_json::from_str(json).expect("legacy user");
        assert_eq!(user.name, "Carlos Lima");
        assert_eq!(user.phone.as_deref(), Some("11 99999-0000"));
        assert!(user.is_administrator);
        assert!(user.is_staff);
    }

    #[test]
    fn test_parse_user_defaults() {
        let json = r#"{"id": 1, "name": "Ana", "email": "a@x.com"}"#;
        let user: UserRecord = serde_json::from_str(json).expect("minimal user");
        assert!(!user.is_administrator);
        assert_eq!(user.phone, None);
        assert_eq!(user.display_name(), "Ana <a@x.com>");
    }

    #[test]
    fn test_registration_debug_hides_password() {
        let registration = Registration {
            name: "Ana".into(),
            email: "a@x.com".into(),
            phone: None,
            password: "hunter2".into(),
            is_administrator: false,
        };
        let debug = format!("{:?}", registration);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
