//! BILLmanager entity builders.
//!
//! # Design
//! `BillAccount` and `BillProfile` wrap an `IspRequest` instead of extending
//! it. Each pins the service to `billmgr` at construction and forwards the
//! chain methods it needs (`auth`, `impersonate`, `send`, ...) to the inner
//! builder. The add/edit/get convention is the free function
//! `action_params`, shared by both entities.
//!
//! An entity operation replaces the pending parameter set, so call `auth`
//! after it, not before.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{AuthMode, IspRequest};
use crate::config::PanelConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, Transport};
use crate::params::Params;

/// Service name of BILLmanager.
pub const BILLMGR: &str = "billmgr";

const ACCOUNT_FUNC: &str = "account.edit";
const ACCOUNT_SEARCH_FUNC: &str = "user";
const PROFILE_EDIT_FUNC: &str = "profile.edit";
const PROFILE_ADD_FUNC: &str = "profile.add.profiledata";

/// Kind of action performed on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Edit,
    Get,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Edit => "edit",
            Operation::Get => "get",
        }
    }

    /// Create and update operations must be confirmed by the panel.
    pub fn is_mutation(self) -> bool {
        matches!(self, Operation::Add | Operation::Edit)
    }

    fn requires_elid(self) -> bool {
        matches!(self, Operation::Edit | Operation::Get)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(Operation::Add),
            "edit" => Ok(Operation::Edit),
            "get" => Ok(Operation::Get),
            other => Err(ApiError::UnknownOperation(other.to_string())),
        }
    }
}

/// Parameters for performing `op` through the panel function `func`.
///
/// Mutations get `sok=ok` so the answer is checked for `doc.ok`. Keys in
/// `params` override both `sok` and `func`.
pub fn action_params(func: &str, op: Operation, params: Params) -> Params {
    let mut all = Params::new();
    if op.is_mutation() {
        all.insert("sok".to_string(), Value::from("ok"));
    }
    all.insert("func".to_string(), Value::from(func));
    all.extend(params);
    all
}

/// `params` with `elid` in front, or `MissingElementId` when `op` needs one
/// and none was given.
fn with_elid(op: Operation, params: Params, elid: Option<&str>) -> Result<Params, ApiError> {
    if !op.requires_elid() {
        return Ok(params);
    }
    let elid = elid.ok_or_else(|| ApiError::MissingElementId(op.to_string()))?;
    Ok(prepend("elid", elid, params))
}

fn prepend(key: &str, value: &str, params: Params) -> Params {
    let mut all = Params::new();
    all.insert(key.to_string(), Value::from(value));
    all.extend(params);
    all
}

/// Chain methods forwarded to the wrapped `IspRequest` at `self.<field path>`.
macro_rules! forward_request {
    ($($field:ident).+) => {
        /// See [`IspRequest::path`].
        pub fn path(mut self, path: &str) -> Self {
            self.$($field).+ = self.$($field).+.path(path);
            self
        }

        /// See [`IspRequest::lang`].
        pub fn lang(mut self, lang: &str) -> Self {
            self.$($field).+ = self.$($field).+.lang(lang);
            self
        }

        /// See [`IspRequest::auth`].
        pub fn auth(
            mut self,
            mode: impl Into<AuthMode>,
            login: Option<&str>,
            password: Option<&str>,
        ) -> Result<Self, ApiError> {
            self.$($field).+ = self.$($field).+.auth(mode, login, password)?;
            Ok(self)
        }

        /// See [`IspRequest::impersonate`].
        pub fn impersonate(mut self, name: &str) -> Self {
            self.$($field).+ = self.$($field).+.impersonate(name);
            self
        }

        /// See [`IspRequest::build`].
        pub fn build(&mut self) -> Result<HttpRequest, ApiError> {
            self.$($field).+.build()
        }

        /// See [`IspRequest::send`].
        pub fn send<T: Transport + ?Sized>(self, transport: &T) -> Result<Value, ApiError> {
            self.$($field).+.send(transport)
        }

        /// The wrapped builder as it stands.
        pub fn as_request(&self) -> &IspRequest {
            &self.$($field).+
        }

        /// Give up the entity view and keep building the raw request.
        pub fn into_request(self) -> IspRequest {
            self.$($field).+
        }
    };
}

/// Account operations in BILLmanager.
#[derive(Debug, Clone)]
pub struct BillAccount {
    request: IspRequest,
}

impl BillAccount {
    pub fn new(request: IspRequest) -> Self {
        Self {
            request: request.service(BILLMGR),
        }
    }

    pub fn from_config(config: &PanelConfig) -> Self {
        Self::new(IspRequest::from_config(config))
    }

    forward_request!(request);

    /// Prepare an account operation.
    ///
    /// `Edit` and `Get` need the account id in `elid`. `Add` turns on the
    /// new-account notification unless `params` says otherwise.
    pub fn account(mut self, op: Operation, params: Params, elid: Option<&str>) -> Result<Self, ApiError> {
        let params = with_elid(op, params, elid)?;
        let params = if op == Operation::Add {
            prepend("notify", "on", params)
        } else {
            params
        };
        self.request = self.request.replace_params(action_params(ACCOUNT_FUNC, op, params));
        Ok(self)
    }

    /// Find the accounts registered with `email`, as admin.
    ///
    /// Returns the entries of `doc.elem`. A single element that the panel
    /// rendered as a mapping yields one entry per member.
    pub fn account_get_by_email<T: Transport + ?Sized>(self, email: &str, transport: &T) -> Result<Vec<Value>, ApiError> {
        let answer = self
            .request
            .request([("filter", "on"), ("email", email)], Some(ACCOUNT_SEARCH_FUNC))
            .auth(AuthMode::Admin, None, None)?
            .send(transport)?;

        let elem = answer
            .get("doc")
            .and_then(|doc| doc.get("elem"))
            .filter(|elem| !elem.is_null())
            .ok_or(ApiError::MissingField("doc.elem"))?;

        Ok(match elem {
            Value::Array(items) => items.clone(),
            Value::Object(map) => map.values().cloned().collect(),
            scalar => vec![scalar.clone()],
        })
    }
}

/// Payer profile operations in BILLmanager.
///
/// Holds a `BillAccount`, so account operations stay reachable through
/// `into_account`.
#[derive(Debug, Clone)]
pub struct BillProfile {
    account: BillAccount,
}

impl BillProfile {
    pub fn new(request: IspRequest) -> Self {
        Self {
            account: BillAccount::new(request),
        }
    }

    pub fn from_config(config: &PanelConfig) -> Self {
        Self::new(IspRequest::from_config(config))
    }

    forward_request!(account.request);

    /// Prepare a profile operation. `Edit` and `Get` need the profile id.
    pub fn profile(mut self, op: Operation, params: Params, elid: Option<&str>) -> Result<Self, ApiError> {
        let params = with_elid(op, params, elid)?;
        let func = match op {
            Operation::Add => PROFILE_ADD_FUNC,
            Operation::Edit | Operation::Get => PROFILE_EDIT_FUNC,
        };
        self.account.request = self.account.request.replace_params(action_params(func, op, params));
        Ok(self)
    }

    pub fn into_account(self) -> BillAccount {
        self.account
    }
}

impl From<BillAccount> for BillProfile {
    fn from(account: BillAccount) -> Self {
        Self { account }
    }
}
