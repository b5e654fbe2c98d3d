// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OA session client: app token lifecycle, user impersonation and the
//! authenticated request loop.
//!
//! Every authenticated call carries `appid`, the shared app `token` and the
//! encrypted `userid` of the impersonated user. When the vendor rejects the
//! token (or the status is not 200) the session fetches a new token and
//! replays the call, at most [`MAX_RETRIES`] times per call.

use std::fmt;
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::codec::PublicKey;
use crate::config::OaConfig;
use crate::directory::UserDirectory;
use crate::error::OaError;
use crate::reply::{self, Expect, Outcome, Reply};
use crate::token_store::TokenStore;

pub const TOKEN_PATH: &str = "/api/ec/dev/auth/applytoken";
pub const ACCOUNT_INFO_PATH: &str = "/api/hrm/login/getAccountList";
pub const SSO_TOKEN_PATH: &str = "/ssologin/getToken";
pub const UPLOAD_PATH: &str = "/api/doc/upload/uploadFile2Doc";

/// Lifetime requested for new app tokens (3 hours).
pub const DEFAULT_TOKEN_EXPIRY_SECS: u64 = 10800;

/// Re-authentications allowed within one call. The call is dispatched at
/// most `MAX_RETRIES + 1` times.
pub const MAX_RETRIES: u32 = 8;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

const REGISTER_FIRST: &str = "register a user before calling this";

const APPID: &str = "appid";
const TOKEN: &str = "token";
const USERID: &str = "userid";
const SECRET: &str = "secret";
const TIME: &str = "time";

/// Profile returned by the vendor's account-info endpoint for the
/// impersonated user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProfile {
    #[serde(rename = "userid", default, deserialize_with = "lenient_string")]
    pub user_id: String,
    #[serde(rename = "username", default, deserialize_with = "lenient_string")]
    pub user_name: String,
    #[serde(rename = "deptid", default, deserialize_with = "lenient_string")]
    pub dept_id: String,
    #[serde(rename = "deptname", default, deserialize_with = "lenient_string")]
    pub dept_name: String,
    #[serde(rename = "subcompanyid", default, deserialize_with = "lenient_string")]
    pub subcompany_id: String,
    #[serde(rename = "subcompanyname", default, deserialize_with = "lenient_string")]
    pub subcompany_name: String,
}

/// The vendor sends ids as numbers in some places and strings in others.
fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// File attached to a multipart request.
#[derive(Debug, Clone)]
pub struct Upload {
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// One call through the authenticated request loop.
#[derive(Debug, Clone)]
pub struct OaRequest {
    method: Method,
    path: String,
    params: Vec<(String, String)>,
    headers: Option<HeaderMap>,
    expect: Expect,
    upload: Option<Upload>,
}

impl OaRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Vec::new(),
            headers: None,
            expect: Expect::Json,
            upload: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Query parameter for GET, form field for POST.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn params<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.params.extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Send these headers instead of the impersonation headers.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Return the body as text instead of parsing JSON.
    pub fn text(mut self) -> Self {
        self.expect = Expect::Text;
        self
    }

    pub fn upload(mut self, upload: Upload) -> Self {
        self.upload = Some(upload);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// The user currently impersonated by a session.
#[derive(Clone)]
struct Impersonation {
    user_id: String,
    credential: String,
    login_id: Option<String>,
}

enum TokenFetch {
    Issued(String),
    Transient(OaError),
}

/// Stateful client for one request context.
///
/// Sessions are cheap to create and meant to be discarded after the
/// inbound request that created them; only the token store is shared.
pub struct OaSession {
    base_url: String,
    app_id: String,
    app_secret: String,
    sso_app_id: Option<String>,
    key: PublicKey,
    token: Option<String>,
    user: Option<Impersonation>,
    profile: Option<AccountProfile>,
    tokens: Arc<dyn TokenStore>,
    directory: Option<Arc<dyn UserDirectory>>,
    http: reqwest::Client,
}

impl OaSession {
    /// Build a session. Parses the public key and encrypts the app secret;
    /// performs no network I/O.
    pub fn new(config: &OaConfig, tokens: Arc<dyn TokenStore>) -> Result<Self, OaError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()?;
        Self::with_client(config, tokens, http)
    }

    /// Like [`OaSession::new`], reusing `http` and its connection pool.
    pub fn with_client(
        config: &OaConfig,
        tokens: Arc<dyn TokenStore>,
        http: reqwest::Client,
    ) -> Result<Self, OaError> {
        let key = PublicKey::parse(&config.app_spk)?;
        let app_secret = key.encrypt(&config.app_secret)?;
        Ok(Self {
            base_url: config.base_url().to_owned(),
            app_id: config.app_id.clone(),
            app_secret,
            sso_app_id: config.sso_app_id().map(str::to_owned),
            key,
            token: tokens.get(),
            user: None,
            profile: None,
            tokens,
            directory: None,
            http,
        })
    }

    #[must_use]
    pub fn with_directory(mut self, directory: Arc<dyn UserDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Plaintext id of the impersonated user.
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.user_id.as_str())
    }

    /// Work code of the impersonated user, when registered by work code.
    pub fn login_id(&self) -> Option<&str> {
        self.user.as_ref().and_then(|u| u.login_id.as_deref())
    }

    pub fn sso_enabled(&self) -> bool {
        self.sso_app_id.is_some()
    }

    /// Account profile of the registered user. `None` until registration
    /// has completed.
    pub fn profile(&self) -> Option<&AccountProfile> {
        self.profile.as_ref()
    }

    /// Impersonate `user_id` for every following call.
    ///
    /// Re-registering the current user is a no-op.
    pub async fn register_user(&mut self, user_id: impl fmt::Display) -> Result<(), OaError> {
        let user_id = user_id.to_string();
        if self.profile.is_some() && self.user_id() == Some(user_id.as_str()) {
            return Ok(());
        }

        if self.token.is_none() {
            self.acquire_token(DEFAULT_TOKEN_EXPIRY_SECS).await?;
        }
        let credential = self.key.encrypt(&user_id)?;

        // The new user only takes over once its profile is in hand.
        let previous_user = self.user.replace(Impersonation { user_id, credential, login_id: None });
        let previous_profile = self.profile.take();
        match self.fetch_profile().await {
            Ok(profile) => {
                info!(user = %profile.user_id, dept = %profile.dept_id, "registered OA user");
                self.profile = Some(profile);
                Ok(())
            }
            Err(e) => {
                self.user = previous_user;
                self.profile = previous_profile;
                Err(e)
            }
        }
    }

    /// Resolve `work_code` through the user directory, then register.
    pub async fn register_user_by_work_code(&mut self, work_code: &str) -> Result<(), OaError> {
        let directory = self
            .directory
            .clone()
            .ok_or_else(|| OaError::usage("no user directory configured for work-code lookup"))?;
        let found = directory
            .find_by_work_code(work_code)
            .await?
            .ok_or_else(|| OaError::NotFound(format!("no OA user with work code {work_code}")))?;
        self.register_user(found.id).await?;
        if let Some(user) = self.user.as_mut() {
            user.login_id = Some(work_code.to_owned());
        }
        Ok(())
    }

    /// OA user ids for `work_codes`, e.g. to address forward recipients.
    /// Unknown codes are left out.
    pub async fn resolve_work_codes(
        &self,
        work_codes: &[String],
    ) -> Result<Vec<(i64, String)>, OaError> {
        let directory = self
            .directory
            .as_ref()
            .ok_or_else(|| OaError::usage("no user directory configured for work-code lookup"))?;
        directory.find_many_by_work_codes(work_codes).await
    }

    async fn fetch_profile(&mut self) -> Result<AccountProfile, OaError> {
        let value = self.get_json(OaRequest::get(ACCOUNT_INFO_PATH)).await?;
        let data = value.get("data").cloned().ok_or_else(|| OaError::Protocol {
            body: value.to_string(),
        })?;
        serde_json::from_value(data).map_err(|_| OaError::Protocol { body: value.to_string() })
    }

    /// Fetch a new app token, store it on the session and in the shared store.
    ///
    /// Sent with app credentials only and never retried.
    pub async fn acquire_token(&mut self, expiry_secs: u64) -> Result<String, OaError> {
        match self.fetch_token(expiry_secs).await? {
            TokenFetch::Issued(token) => Ok(token),
            TokenFetch::Transient(e) => Err(e),
        }
    }

    /// One token-endpoint round trip. Transient failures come back as
    /// [`TokenFetch::Transient`] so the retry loop can spend a retry on them;
    /// fatal replies are errors.
    async fn fetch_token(&mut self, expiry_secs: u64) -> Result<TokenFetch, OaError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        headers.insert(APPID, header_value(&self.app_id)?);
        headers.insert(SECRET, header_value(&self.app_secret)?);
        headers.insert(TIME, header_value(&expiry_secs.to_string())?);

        let req = OaRequest::post(TOKEN_PATH);
        let value = match self.dispatch(&req, &headers).await? {
            Outcome::Done(reply) => reply.into_json()?,
            Outcome::Retry(e) => return Ok(TokenFetch::Transient(e)),
            Outcome::Fail(e) => return Err(e),
        };
        let token = value
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| OaError::Protocol { body: value.to_string() })?
            .to_owned();

        self.token = Some(token.clone());
        self.tokens.set(&token);
        info!(expiry_secs, "acquired OA app token");
        Ok(TokenFetch::Issued(token))
    }

    fn impersonation_headers(&self) -> Result<HeaderMap, OaError> {
        let user = self.user.as_ref().ok_or_else(|| OaError::usage(REGISTER_FIRST))?;
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        headers.insert(APPID, header_value(&self.app_id)?);
        headers.insert(TOKEN, header_value(self.token.as_deref().unwrap_or_default())?);
        headers.insert(USERID, header_value(&user.credential)?);
        Ok(headers)
    }

    /// Send `req` through the retry loop.
    ///
    /// Transient failures (non-200, expired token, timed-out session) fetch a
    /// fresh token and replay the call. Once the retry budget is spent the
    /// error that triggered the last retry is returned.
    pub async fn request(&mut self, req: OaRequest) -> Result<Reply, OaError> {
        let mut headers = match &req.headers {
            Some(h) => h.clone(),
            None => self.impersonation_headers()?,
        };

        let mut retries = 0u32;
        loop {
            let trigger = match self.dispatch(&req, &headers).await? {
                Outcome::Done(reply) => return Ok(reply),
                Outcome::Fail(e) => return Err(e),
                Outcome::Retry(e) => e,
            };
            // Transient token-endpoint failures draw on the same budget.
            loop {
                if retries >= MAX_RETRIES {
                    warn!(path = %req.path, retries, err = %trigger, "OA retry budget exhausted");
                    return Err(trigger);
                }
                retries += 1;
                debug!(path = %req.path, attempt = retries, err = %trigger, "re-authenticating");
                match self.fetch_token(DEFAULT_TOKEN_EXPIRY_SECS).await? {
                    TokenFetch::Issued(token) => {
                        headers.insert(TOKEN, header_value(&token)?);
                        break;
                    }
                    TokenFetch::Transient(e) => {
                        debug!(attempt = retries, err = %e, "OA token fetch failed");
                    }
                }
            }
        }
    }

    /// One HTTP round trip, classified.
    async fn dispatch(&self, req: &OaRequest, headers: &HeaderMap) -> Result<Outcome, OaError> {
        let url = format!("{}{}", self.base_url, req.path);
        let builder = if req.method == Method::GET {
            self.http.get(&url).query(&req.params)
        } else {
            let builder = self.http.request(req.method.clone(), &url);
            match &req.upload {
                Some(upload) => builder.multipart(multipart_form(&req.params, upload)),
                None => builder.form(&req.params),
            }
        };

        let resp = builder.headers(headers.clone()).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        debug!(path = %req.path, status, "OA response");
        Ok(reply::classify(status, body, req.expect))
    }

    pub async fn get_json(&mut self, req: OaRequest) -> Result<Value, OaError> {
        self.request(req).await?.into_json()
    }

    pub async fn post_json(&mut self, req: OaRequest) -> Result<Value, OaError> {
        self.get_json(req).await
    }

    pub async fn post_text(&mut self, req: OaRequest) -> Result<String, OaError> {
        Ok(self.request(req.text()).await?.into_text())
    }

    /// One-time SSO login token for `login_id`.
    pub async fn sso_token(&mut self, login_id: &str) -> Result<String, OaError> {
        let app_id =
            self.sso_app_id.clone().ok_or_else(|| OaError::usage("OA SSO app id is not configured"))?;
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        let req = OaRequest::post(SSO_TOKEN_PATH)
            .param("appid", app_id)
            .param("loginid", login_id)
            .headers(headers);
        Ok(self.post_text(req).await?.trim().to_owned())
    }

    /// Upload a file into an OA document category; returns the file id.
    pub async fn upload_file(
        &mut self,
        category_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, OaError> {
        let mut headers = self.impersonation_headers()?;
        headers.remove(CONTENT_TYPE);
        let req = OaRequest::post(UPLOAD_PATH)
            .param("category", category_id)
            .param("name", file_name)
            .headers(headers)
            .upload(Upload { field: "file".to_owned(), file_name: file_name.to_owned(), bytes });
        let value = self.post_json(req).await?;
        match value.pointer("/data/fileid") {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => Err(OaError::Protocol { body: value.to_string() }),
        }
    }
}

/// Forms are consumed on send, so each attempt builds its own.
fn multipart_form(params: &[(String, String)], upload: &Upload) -> Form {
    let mut form = Form::new();
    for (k, v) in params {
        form = form.text(k.clone(), v.clone());
    }
    let part = Part::bytes(upload.bytes.clone()).file_name(upload.file_name.clone());
    form.part(upload.field.clone(), part)
}

fn header_value(value: &str) -> Result<HeaderValue, OaError> {
    HeaderValue::from_str(value)
        .map_err(|_| OaError::usage("credential contains characters not allowed in a header"))
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
