use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::settings::UserSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub settings: UserSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// New account stamped with the current time.
    pub fn new(email: impl Into<String>, name: impl Into<String>, password_hash: String, settings: UserSettings) -> Self {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: email.into(),
            name: name.into(),
            password_hash,
            settings,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Claims carried by a short-lived access token. Unknown fields are refused
/// so a refresh token never validates as an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessClaims {
    pub user_id: Uuid,
    pub exp: i64,
}

/// Claims carried by a refresh token. `jti` identifies the persisted row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub jti: Uuid,
    pub user_id: Uuid,
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedAccess {
    pub claims: AccessClaims,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRefresh {
    pub claims: RefreshClaims,
    pub token: String,
}

/// A signed token string together with the user it was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub value: String,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    pub access: Token,
    pub refresh: Token,
}

/// Persisted form of a refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&SignedRefresh> for RefreshRecord {
    fn from(refresh: &SignedRefresh) -> Self {
        let now = Utc::now();
        RefreshRecord {
            id: refresh.claims.jti,
            user_id: refresh.claims.user_id,
            token: refresh.token.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Profile fields taken from a verified Google ID token.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GoogleIdentity {
    pub email: String,
    pub name: String,
    pub picture: String,
}

/// Not validated: every failed sign-in reports the same slug.
#[derive(Debug, Clone, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignUpRequest {
    #[serde(default)]
    #[validate(email(code = "email"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 5, code = "length"))]
    pub password: String,
    #[serde(default)]
    #[validate(length(min = 1, code = "length"))]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshRequest {
    #[serde(default)]
    #[validate(length(min = 1, code = "length"))]
    pub refresh: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleSignInRequest {
    #[serde(default)]
    pub credential: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SettingsPayload {
    #[serde(default)]
    #[validate(length(min = 1, code = "length"))]
    pub currency: String,
    #[serde(default)]
    #[validate(length(min = 1, code = "length"))]
    pub first_day_of_week: String,
    #[serde(default)]
    #[validate(length(min = 1, code = "length"))]
    pub profile_picture_url: String,
}

impl From<&UserSettings> for SettingsPayload {
    fn from(settings: &UserSettings) -> Self {
        SettingsPayload {
            currency: settings.currency.to_string(),
            first_day_of_week: settings.first_day_of_week.to_string(),
            profile_picture_url: settings.profile_picture_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPairResponse {
    pub access: String,
    pub refresh: String,
}

impl From<LoginResponse> for TokenPairResponse {
    fn from(tokens: LoginResponse) -> Self {
        TokenPairResponse {
            access: tokens.access.value,
            refresh: tokens.refresh.value,
        }
    }
}

/// Public projection of a user; never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub uuid: Uuid,
    pub email: String,
    pub name: String,
    pub settings: SettingsPayload,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse {
            uuid: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            settings: SettingsPayload::from(&user.settings),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{Currency, Weekday};

    #[test]
    fn user_response_hides_password_hash() {
        let user = User::new(
            "a@b.com",
            "A",
            "$2b$12$secret".to_string(),
            UserSettings::new(Currency::Gel, Weekday::Sun, "https://pic"),
        );
        let body = serde_json::to_value(UserResponse::from(&user)).unwrap();

        assert_eq!(body["email"], "a@b.com");
        assert_eq!(body["settings"]["currency"], "GEL");
        assert_eq!(body["settings"]["first_day_of_week"], "SUN");
        assert!(body.get("password_hash").is_none());
        assert!(!body.to_string().contains("secret"));
    }

    #[test]
    fn sign_up_validation_rules() {
        let ok = SignUpRequest {
            email: "a@b.com".into(),
            password: "abcde".into(),
            name: "A".into(),
        };
        assert!(ok.validate().is_ok());

        let short = SignUpRequest { password: "abcd".into(), ..ok.clone() };
        let errors = short.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));

        let bad_email = SignUpRequest { email: "not-an-email".into(), ..ok };
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn refresh_record_takes_identity_from_claims() {
        let signed = SignedRefresh {
            claims: RefreshClaims { jti: Uuid::new_v4(), user_id: Uuid::new_v4(), exp: 0 },
            token: "raw".into(),
        };
        let record = RefreshRecord::from(&signed);
        assert_eq!(record.id, signed.claims.jti);
        assert_eq!(record.user_id, signed.claims.user_id);
        assert_eq!(record.token, "raw");
    }
}
