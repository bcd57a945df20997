//! In-memory stand-in for a BILLmanager endpoint.
//!
//! Serves `GET /{service}` with the query-string protocol of the real panel
//! and answers in `sjson`: text nodes under `"$"`, attributes under
//! `"$name"`, errors under `doc.error` and confirmations under `doc.ok`.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const SERVICE: &str = "billmgr";
pub const DEFAULT_ADMIN_LOGIN: &str = "root";
pub const DEFAULT_ADMIN_PASSWORD: &str = "secret";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    pub id: u64,
    pub email: String,
    pub name: String,
    pub password: String,
    pub notify: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Profile {
    pub id: u64,
    pub name: String,
}

#[derive(Default)]
pub struct Store {
    pub accounts: Vec<Account>,
    pub profiles: Vec<Profile>,
    /// One-time login keys by username.
    pub keys: HashMap<String, String>,
    next_id: u64,
}

impl Store {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

pub struct Panel {
    admin_authinfo: String,
    pub store: RwLock<Store>,
}

pub type Db = Arc<Panel>;

pub fn app() -> Router {
    app_with_admin(DEFAULT_ADMIN_LOGIN, DEFAULT_ADMIN_PASSWORD)
}

pub fn app_with_admin(login: &str, password: &str) -> Router {
    router(Arc::new(Panel {
        admin_authinfo: format!("{login}:{password}"),
        store: RwLock::new(Store::default()),
    }))
}

pub fn router(db: Db) -> Router {
    Router::new().route("/{service}", get(dispatch)).with_state(db)
}

pub async fn run(listener: TcpListener, app: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, app).await
}

type Args = HashMap<String, String>;

async fn dispatch(
    State(db): State<Db>,
    Path(service): Path<String>,
    Query(query): Query<Args>,
) -> Response {
    if service != SERVICE {
        return (StatusCode::NOT_FOUND, "unknown service").into_response();
    }
    if query.get("out").map(String::as_str) != Some("sjson") {
        return (StatusCode::OK, "<doc/>").into_response();
    }

    let lang = query.get("lang").cloned().unwrap_or_else(|| "ru".to_string());
    let func = query.get("func").cloned().unwrap_or_default();
    tracing::info!(%service, %func, %lang, "panel call");

    let mut store = db.store.write().await;
    let caller = match authorize(&db.admin_authinfo, &store, &query) {
        Some(caller) => caller,
        None => return answer(&lang, error_doc("auth", "Authorization failed")),
    };

    let body = match func.as_str() {
        "whoami" => Ok(whoami(&caller, &query)),
        "user" => Ok(find_users(&store, &query)),
        "account.edit" => account_edit(&mut store, &query),
        "profile.add.profiledata" => profile_add(&mut store, &query),
        "profile.edit" => profile_edit(&mut store, &query),
        "auth" => new_session(&store, &query),
        "session.newkey" => new_key(&mut store, &query),
        _ => Err(("missing", "Unknown function")),
    };

    match body {
        Ok(body) => answer(&lang, body),
        Err((kind, msg)) => answer(&lang, error_doc(kind, msg)),
    }
}

enum Caller {
    Admin,
    User(String),
}

/// Admin credentials, or an account's `email:password`.
fn authorize(admin_authinfo: &str, store: &Store, query: &Args) -> Option<Caller> {
    let authinfo = query.get("authinfo")?;
    if authinfo == admin_authinfo {
        return Some(Caller::Admin);
    }
    let (login, password) = authinfo.split_once(':')?;
    store
        .accounts
        .iter()
        .find(|a| a.email == login && a.password == password)
        .map(|a| Caller::User(a.email.clone()))
}

fn text(value: impl Into<String>) -> Value {
    json!({ "$": value.into() })
}

fn answer(lang: &str, body: Map<String, Value>) -> Response {
    let mut doc = Map::new();
    doc.insert("$lang".to_string(), Value::from(lang));
    doc.extend(body);
    Json(json!({ "doc": doc })).into_response()
}

fn error_doc(kind: &str, msg: &str) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("error".to_string(), json!({ "$type": kind, "msg": text(msg) }));
    body
}

fn ok_doc(id: u64) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("ok".to_string(), text(""));
    body.insert("id".to_string(), text(id.to_string()));
    body
}

fn whoami(caller: &Caller, query: &Args) -> Map<String, Value> {
    let name = match (caller, query.get("su")) {
        (Caller::Admin, Some(su)) => su.clone(),
        (Caller::Admin, None) => DEFAULT_ADMIN_LOGIN.to_string(),
        (Caller::User(email), _) => email.clone(),
    };
    let mut body = Map::new();
    body.insert("user".to_string(), text(name));
    body
}

fn account_elem(account: &Account) -> Value {
    json!({
        "id": text(account.id.to_string()),
        "email": text(&account.email),
        "name": text(&account.name),
    })
}

/// Empty result sets carry no `elem` at all, like the real panel.
fn find_users(store: &Store, query: &Args) -> Map<String, Value> {
    let filter = query.get("filter").map(String::as_str) == Some("on");
    let elems: Vec<Value> = store
        .accounts
        .iter()
        .filter(|a| !filter || query.get("email") == Some(&a.email))
        .map(account_elem)
        .collect();

    let mut body = Map::new();
    if !elems.is_empty() {
        body.insert("elem".to_string(), Value::Array(elems));
    }
    body
}

type Handled = Result<Map<String, Value>, (&'static str, &'static str)>;

fn elid(query: &Args) -> Result<u64, (&'static str, &'static str)> {
    query
        .get("elid")
        .and_then(|id| id.parse().ok())
        .ok_or(("missing", "Element id is required"))
}

fn account_edit(store: &mut Store, query: &Args) -> Handled {
    let confirm = query.contains_key("sok");

    if !query.contains_key("elid") {
        if !confirm {
            return Err(("missing", "Element id is required"));
        }
        let email = query.get("email").ok_or(("value", "Email is required"))?;
        let id = store.next_id();
        store.accounts.push(Account {
            id,
            email: email.clone(),
            name: query.get("name").cloned().unwrap_or_default(),
            password: query.get("passwd").cloned().unwrap_or_default(),
            notify: query.get("notify").map(String::as_str) == Some("on"),
        });
        return Ok(ok_doc(id));
    }

    let id = elid(query)?;
    let account = store
        .accounts
        .iter_mut()
        .find(|a| a.id == id)
        .ok_or(("missing", "No such account"))?;

    if confirm {
        if let Some(name) = query.get("name") {
            account.name = name.clone();
        }
        if let Some(email) = query.get("email") {
            account.email = email.clone();
        }
        return Ok(ok_doc(id));
    }

    let mut body = Map::new();
    body.insert("elid".to_string(), text(id.to_string()));
    body.insert("email".to_string(), text(&account.email));
    body.insert("name".to_string(), text(&account.name));
    Ok(body)
}

fn profile_add(store: &mut Store, query: &Args) -> Handled {
    if !query.contains_key("sok") {
        return Err(("missing", "Confirmation is required"));
    }
    let name = query.get("name").ok_or(("value", "Name is required"))?;
    let id = store.next_id();
    store.profiles.push(Profile { id, name: name.clone() });
    Ok(ok_doc(id))
}

fn profile_edit(store: &mut Store, query: &Args) -> Handled {
    let id = elid(query)?;
    let profile = store
        .profiles
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or(("missing", "No such profile"))?;

    if query.contains_key("sok") {
        if let Some(name) = query.get("name") {
            profile.name = name.clone();
        }
        return Ok(ok_doc(id));
    }

    let mut body = Map::new();
    body.insert("elid".to_string(), text(id.to_string()));
    body.insert("name".to_string(), text(&profile.name));
    Ok(body)
}

fn new_session(store: &Store, query: &Args) -> Handled {
    let username = query.get("username").ok_or(("value", "Username is required"))?;
    let password = query.get("password").ok_or(("value", "Password is required"))?;
    if !store
        .accounts
        .iter()
        .any(|a| &a.email == username && &a.password == password)
    {
        return Err(("auth", "Invalid username or password"));
    }

    let session = Uuid::new_v4().simple().to_string();
    let mut body = Map::new();
    body.insert("auth".to_string(), json!({ "$id": &session, "$": &session }));
    Ok(body)
}

fn new_key(store: &mut Store, query: &Args) -> Handled {
    let username = query.get("username").ok_or(("value", "Username is required"))?;
    let key = query.get("key").ok_or(("value", "Key is required"))?;
    if !store.accounts.iter().any(|a| &a.email == username) {
        return Err(("missing", "No such user"));
    }
    store.keys.insert(username.clone(), key.clone());

    let mut body = Map::new();
    body.insert("ok".to_string(), text(""));
    Ok(body)
}
