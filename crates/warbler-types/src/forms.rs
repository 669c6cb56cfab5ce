use serde::Deserialize;

/// Payloads posted by the server-rendered forms. Browsers may send extra
/// fields (the signup form round-trips through login in places), so none of
/// these reject unknown keys.

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageForm {
    pub text: String,
}
