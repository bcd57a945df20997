//! Fluent request builder for the panel API.
//!
//! # Design
//! `IspRequest` is an owned value: every chained call consumes the builder
//! and hands back the updated one, so two steps of a chain never share
//! mutable state. A chain ends in one of three ways:
//!
//! - `build` prunes the parameters and produces an `HttpRequest`;
//! - `parse` turns the matching `HttpResponse` into a normalized answer;
//! - `send` does both around a `Transport`.
//!
//! The admin credentials are fixed at construction. They only ever leave
//! the builder inside the `authinfo` query parameter, and the URL is never
//! logged.

use serde_json::Value;
use tracing::{debug, warn};

use crate::answer::check_answer;
use crate::config::{AdminCredentials, PanelConfig, DEFAULT_LANG};
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::normalize::normalize;
use crate::params::{ParamStore, Params};

/// Value of the `out` query parameter.
pub const OUTPUT_FORMAT: &str = "sjson";

/// How `IspRequest::auth` fills `authinfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Use the configured admin credentials.
    Admin,
    /// Use the login and password passed alongside.
    User,
    /// Anything else. Sends an empty `authinfo`, which pruning removes.
    Other(String),
}

impl From<&str> for AuthMode {
    fn from(mode: &str) -> Self {
        match mode {
            "admin" => AuthMode::Admin,
            "user" => AuthMode::User,
            other => AuthMode::Other(other.to_string()),
        }
    }
}

/// Builder for a single panel request.
#[derive(Debug, Clone)]
pub struct IspRequest {
    path: String,
    service: String,
    lang: String,
    params: ParamStore,
    admin: AdminCredentials,
}

impl IspRequest {
    /// A builder with no path or service yet and the default language.
    pub fn new(admin: AdminCredentials) -> Self {
        Self {
            path: String::new(),
            service: String::new(),
            lang: DEFAULT_LANG.to_string(),
            params: ParamStore::new(),
            admin,
        }
    }

    /// A builder preset with the configured path, service and language.
    pub fn from_config(config: &PanelConfig) -> Self {
        Self::new(config.admin.clone())
            .path(&config.path)
            .service(&config.service)
            .lang(&config.lang)
    }

    /// Site root with scheme, without a trailing slash. Not escaped.
    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    /// Panel product to address (`billmgr`, `ispmgr`, `vmmgr`, ...). Not escaped.
    pub fn service(mut self, service: &str) -> Self {
        self.service = service.to_string();
        self
    }

    /// Output language (`ru`, `en`).
    pub fn lang(mut self, lang: &str) -> Self {
        self.lang = lang.to_string();
        self
    }

    /// Merge `params` into the request, optionally naming the remote `func`.
    pub fn request<I, K, V>(mut self, params: I, func: Option<&str>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.params.merge(params, func);
        self
    }

    /// Set `authinfo` for the request.
    ///
    /// `User` mode fails with `InvalidAuthArguments` unless both `login` and
    /// `password` are given. Unknown modes are accepted and leave
    /// `authinfo` empty.
    pub fn auth(
        self,
        mode: impl Into<AuthMode>,
        login: Option<&str>,
        password: Option<&str>,
    ) -> Result<Self, ApiError> {
        let authinfo = match mode.into() {
            AuthMode::Admin => self.admin.authinfo(),
            AuthMode::User => match (login, password) {
                (Some(login), Some(password)) => format!("{login}:{password}"),
                _ => return Err(ApiError::InvalidAuthArguments),
            },
            AuthMode::Other(mode) => {
                debug!(%mode, "unknown auth mode, authinfo left empty");
                String::new()
            }
        };
        Ok(self.request([("authinfo", authinfo)], None))
    }

    /// Act as the account `name` (the panel's `su` parameter).
    ///
    /// Whether the authenticated caller may do so is decided by the panel.
    #[doc(alias = "su")]
    pub fn impersonate(self, name: &str) -> Self {
        self.request([("su", name)], None)
    }

    /// Drop every pending parameter and use `params` instead.
    pub(crate) fn replace_params(mut self, params: Params) -> Self {
        self.params.replace(params);
        self
    }

    /// Pending parameters, `authinfo` included in clear.
    pub(crate) fn params(&self) -> &ParamStore {
        &self.params
    }

    /// `{path}/{service}`, the endpoint every query is appended to.
    pub fn endpoint(&self) -> String {
        format!("{}/{}", self.path, self.service)
    }

    /// Prune empty parameters and produce the outgoing request.
    ///
    /// Pruning is kept: after this call `params()` shows what was sent.
    pub fn build(&mut self) -> Result<HttpRequest, ApiError> {
        if !self.params.is_valid() {
            debug!(service = %self.service, "nothing left to send after pruning");
            return Err(ApiError::EmptyRequest);
        }

        let url = format!(
            "{}?out={OUTPUT_FORMAT}&lang={}&{}",
            self.endpoint(),
            self.lang,
            self.params.to_query()
        );
        debug!(
            service = %self.service,
            func = self.params.get_str("func").unwrap_or_default(),
            lang = %self.lang,
            "built panel request"
        );
        Ok(HttpRequest { url })
    }

    /// Decode, normalize and check the answer to this request.
    ///
    /// The `sok` check ignores parameters that pruning drops, so the result
    /// is the same whether or not `build` ran first. An answer that fails
    /// the check is dropped.
    pub fn parse(&self, response: HttpResponse) -> Result<Value, ApiError> {
        if response.status != 200 {
            return Err(ApiError::TransportFailure(format!("HTTP {}", response.status)));
        }
        if response.body.is_empty() {
            return Err(ApiError::TransportFailure("empty response body".to_string()));
        }

        let decoded: Value =
            serde_json::from_slice(&response.body).map_err(|e| ApiError::DecodeFailure(e.to_string()))?;
        if !(decoded.is_object() || decoded.is_array()) {
            return Err(ApiError::DecodeFailure("answer root is not a mapping or sequence".to_string()));
        }

        let answer = normalize(&decoded);
        if let Err(err) = check_answer(&answer, self.params.survives_pruning("sok")) {
            warn!(
                service = %self.service,
                func = self.params.get_str("func").unwrap_or_default(),
                error = %err,
                "panel answer rejected"
            );
            return Err(err);
        }
        Ok(answer)
    }

    /// Build the request, fetch it through `transport` and parse the answer.
    pub fn send<T: Transport + ?Sized>(mut self, transport: &T) -> Result<Value, ApiError> {
        let request = self.build()?;
        let response = transport.get(&request)?;
        self.parse(response)
    }
}
