// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interpretation of OA server replies.
//!
//! The vendor signals failure in several loosely-typed ways: a non-200
//! status, `status: false` with a natural-language `msg`, or a workflow
//! `code` other than `SUCCESS`. [`classify`] maps each reply onto done,
//! retry (re-authenticate and replay) or fail.

use serde_json::Value;

use crate::error::OaError;

/// Vendor message texts the client reacts to. These are the vendor's own
/// strings and change when the vendor changes them.
pub mod vendor_msg {
    /// App secret could not be decrypted with the app's key pair.
    pub const DECRYPT_FAILED: &str = "secret解密失败,请检查加密内容.";
    /// Prefix of "authentication info wrong".
    pub const AUTH_INFO_ERROR: &str = "认证信息错误";
    /// Prefix of "token missing or expired". Retried.
    pub const TOKEN_EXPIRED: &str = "token不存在或者超时";
    /// "Login session timed out". Retried.
    pub const SESSION_TIMEOUT: &str = "登录信息超时";
}

pub const SUCCESS_CODE: &str = "SUCCESS";

pub const HINT_PUBLIC_KEY: &str = "app public key likely invalid";
pub const HINT_SECRET: &str = "app secret likely invalid";
pub const HINT_TOKEN: &str = "app token missing or expired";
pub const HINT_LICENSE: &str = "license may be expired";

/// What the caller wants back from a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Json,
    Text,
}

/// A successful reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Json(Value),
    Text(String),
}

impl Reply {
    pub fn into_json(self) -> Result<Value, OaError> {
        match self {
            Self::Json(v) => Ok(v),
            Self::Text(body) => {
                serde_json::from_str(&body).map_err(|_| OaError::Protocol { body })
            }
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Json(v) => v.to_string(),
            Self::Text(body) => body,
        }
    }
}

/// Result of interpreting one dispatch.
#[derive(Debug)]
pub enum Outcome {
    Done(Reply),
    /// Transient: fetch a new token and dispatch again.
    Retry(OaError),
    Fail(OaError),
}

pub fn classify(status: u16, body: String, expect: Expect) -> Outcome {
    if status != 200 {
        return Outcome::Retry(OaError::Transport { status, body });
    }
    if expect == Expect::Text {
        return Outcome::Done(Reply::Text(body));
    }
    let value: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(_) => return Outcome::Fail(OaError::Protocol { body }),
    };
    interpret(value, body)
}

fn interpret(value: Value, raw: String) -> Outcome {
    let Some(obj) = value.as_object() else {
        return Outcome::Done(Reply::Json(value));
    };

    // A missing `status` counts as success.
    let status_ok = obj.get("status").map(is_truthy).unwrap_or(true);
    if !status_ok {
        let msg = obj.get("msg").and_then(Value::as_str).unwrap_or_default();
        if obj.get("code").is_some_and(is_minus_one) {
            let hint = if msg == vendor_msg::DECRYPT_FAILED {
                HINT_PUBLIC_KEY
            } else if msg.starts_with(vendor_msg::AUTH_INFO_ERROR) {
                HINT_SECRET
            } else if msg.starts_with(vendor_msg::TOKEN_EXPIRED) {
                return Outcome::Retry(OaError::Vendor { message: msg.to_owned(), hint: HINT_TOKEN });
            } else {
                HINT_LICENSE
            };
            return Outcome::Fail(OaError::Vendor { message: msg.to_owned(), hint });
        }
        if msg == vendor_msg::SESSION_TIMEOUT {
            return Outcome::Retry(OaError::SessionTimeout { body: raw });
        }
        return Outcome::Fail(OaError::Rejected { body: raw });
    }

    if let Some(code) = obj.get("code").filter(|c| is_truthy(c)) {
        if code.as_str() != Some(SUCCESS_CODE) {
            let code = match code {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let detail = match obj.get("errMsg") {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            };
            return Outcome::Fail(OaError::Workflow { code, detail });
        }
    }

    Outcome::Done(Reply::Json(value))
}

/// Loose truthiness: the vendor mixes `true`, `"1"` and `1` for success.
pub fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn is_minus_one(v: &Value) -> bool {
    v.as_i64() == Some(-1) || v.as_f64() == Some(-1.0)
}

#[cfg(test)]
#[path = "reply_tests.rs"]
mod tests;
