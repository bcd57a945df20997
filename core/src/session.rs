//! Panel sessions and login redirects.
//!
//! These calls are complete on their own: the ones that talk to the panel
//! send immediately, and the redirect helpers only compute where the host
//! should send the browser. Issuing the redirect is the host's job.

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;
use tracing::debug;
use url::form_urlencoded;

use crate::client::{AuthMode, IspRequest};
use crate::config::PanelConfig;
use crate::error::ApiError;
use crate::http::Transport;

/// Characters a login key is drawn from.
pub const KEY_ALPHABET: &str = "abcdefghijklmnoprstyuwz1234567890";

const KEY_OFFSET: usize = 4;
const KEY_LEN: usize = 16;

/// A location the host should redirect the browser to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
}

impl fmt::Display for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location)
    }
}

/// Authentication operations against a panel service.
#[derive(Debug, Clone)]
pub struct Session {
    request: IspRequest,
}

impl Session {
    pub fn new(request: IspRequest) -> Self {
        Self { request }
    }

    pub fn from_config(config: &PanelConfig) -> Self {
        Self::new(IspRequest::from_config(config))
    }

    /// Open a session for `login` and return the panel's answer, which
    /// carries the session id under `doc.auth`.
    pub fn new_session<T: Transport + ?Sized>(self, login: &str, password: &str, transport: &T) -> Result<Value, ApiError> {
        self.request
            .request([("username", login), ("password", password)], Some("auth"))
            .auth(AuthMode::Admin, None, None)?
            .send(transport)
    }

    /// Where to send a browser that already holds session `auth_id`,
    /// opening `form`.
    pub fn redirect(&self, auth_id: &str, form: &str) -> Redirect {
        Redirect {
            location: format!("{}?auth={auth_id}&startform={form}", self.request.endpoint()),
        }
    }

    /// Register a one-time key for `login` and return the key-login redirect.
    ///
    /// With `form`, the panel opens that form after logging in.
    pub fn auth_connect<T: Transport + ?Sized>(
        self,
        login: &str,
        form: Option<&str>,
        transport: &T,
    ) -> Result<Redirect, ApiError> {
        self.auth_connect_with_rng(login, form, transport, &mut rand::rng())
    }

    /// `auth_connect` drawing the key from `rng`.
    pub fn auth_connect_with_rng<T, R>(
        self,
        login: &str,
        form: Option<&str>,
        transport: &T,
        rng: &mut R,
    ) -> Result<Redirect, ApiError>
    where
        T: Transport + ?Sized,
        R: Rng + ?Sized,
    {
        let key = generate_key(rng);
        let endpoint = self.request.endpoint();

        self.request
            .request([("username", login), ("key", key.as_str())], Some("session.newkey"))
            .auth(AuthMode::Admin, None, None)?
            .send(transport)?;
        debug!(%login, "login key registered");

        let redirect = form
            .map(|form| {
                let encoded: String = form_urlencoded::byte_serialize(format!("startform={form}").as_bytes()).collect();
                format!("&redirect={encoded}")
            })
            .unwrap_or_default();

        Ok(Redirect {
            location: format!("{endpoint}?func=auth&username={login}&key={key}&checkcookie=no{redirect}"),
        })
    }
}

/// A shuffled slice of `KEY_ALPHABET`.
pub fn generate_key<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut chars: Vec<char> = KEY_ALPHABET.chars().collect();
    chars.shuffle(rng);
    chars[KEY_OFFSET..KEY_OFFSET + KEY_LEN].iter().collect()
}
