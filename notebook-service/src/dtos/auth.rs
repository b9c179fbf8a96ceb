use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::SanitizedUser;
use crate::services::SessionView;

/// Registration payload; field-by-field validation happens in the handler so
/// each rule surfaces the same message the sign-up form shows.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub recaptcha_token: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub user: SanitizedUser,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username or email
    #[validate(length(min = 1, message = "Identifier is required"))]
    pub identifier: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Empty fields surface as the issuance flow's own `Missing params` answer,
/// so no field rules here.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpRequest {
    pub email: String,
    pub bot_score_token: String,
}

#[derive(Debug, Serialize)]
pub struct SendOtpResponse {
    pub ok: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

/// Issued-session payload shared by the password and code sign-in flows.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub ok: bool,
    pub token: String,
    pub session: SessionView,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}
