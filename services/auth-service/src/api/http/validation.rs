//! 请求体与字段校验
//!
//! 校验在进入编排服务之前完成，失败时返回全部字段错误。
//! 缺失字段按空串处理，以便给出字段级错误而不是反序列化失败。

use secrecy::Secret;
use serde::Deserialize;

use crate::application::{Credentials, Registration};
use crate::domain::value_objects::Email;
use crate::error::FieldError;

const MIN_NAME_CHARS: usize = 2;
const MIN_PASSWORD_CHARS: usize = 6;
const MIN_TOKEN_CHARS: usize = 10;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VerifyRequest {
    pub token: String,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn check_email(raw: String, errors: &mut Vec<FieldError>) -> Option<Email> {
    match Email::new(raw) {
        Ok(email) => Some(email),
        Err(_) => {
            errors.push(FieldError::new("email", "Invalid email format"));
            None
        }
    }
}

impl RegisterRequest {
    pub fn validate(self) -> Result<Registration, Vec<FieldError>> {
        let mut errors = Vec::new();

        if char_len(&self.name) < MIN_NAME_CHARS {
            errors.push(FieldError::new(
                "name",
                "Name must be at least 2 characters long",
            ));
        }
        let email = check_email(self.email, &mut errors);
        if char_len(&self.password) < MIN_PASSWORD_CHARS {
            errors.push(FieldError::new(
                "password",
                "Password must be at least 6 characters long",
            ));
        }

        match email {
            Some(email) if errors.is_empty() => Ok(Registration {
                name: self.name,
                email,
                password: Secret::new(self.password),
            }),
            _ => Err(errors),
        }
    }
}

impl LoginRequest {
    pub fn validate(self) -> Result<Credentials, Vec<FieldError>> {
        let mut errors = Vec::new();

        let email = check_email(self.email, &mut errors);
        if self.password.is_empty() {
            errors.push(FieldError::new("password", "Password is required"));
        }

        match email {
            Some(email) if errors.is_empty() => Ok(Credentials {
                email,
                password: Secret::new(self.password),
            }),
            _ => Err(errors),
        }
    }
}

impl RefreshRequest {
    pub fn validate(self) -> Result<String, Vec<FieldError>> {
        if char_len(&self.refresh_token) < MIN_TOKEN_CHARS {
            return Err(vec![FieldError::new(
                "refreshToken",
                "Refresh token is required",
            )]);
        }
        Ok(self.refresh_token)
    }
}

impl VerifyRequest {
    pub fn validate(self) -> Result<String, Vec<FieldError>> {
        if char_len(&self.token) < MIN_TOKEN_CHARS {
            return Err(vec![FieldError::new("token", "Token is required")]);
        }
        Ok(self.token)
    }
}
