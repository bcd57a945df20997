//! Client core for the ISPsystem panel API (BILLmanager and friends).
//!
//! # Overview
//! Builds panel requests through a fluent, owned builder, sends them as
//! plain GETs and normalizes the `sjson` answers so callers can read them by
//! predictable keys.
//!
//! # Design
//! - `IspRequest` accumulates parameters, authentication and impersonation,
//!   and serializes them into the query string.
//! - `build` / `parse` keep the I/O boundary explicit (host-does-IO);
//!   `send` composes them around any `Transport`, `UreqTransport` included.
//! - `normalize` rewrites `$` and empty keys into plain ones without
//!   touching its input.
//! - `check_answer` turns `doc.error` and a missing `doc.ok` into errors.
//! - `BillAccount`, `BillProfile` and `Session` are thin entity builders
//!   composed over `IspRequest`.

pub mod answer;
pub mod billing;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod normalize;
pub mod params;
pub mod session;

pub use answer::check_answer;
pub use billing::{action_params, BillAccount, BillProfile, Operation, BILLMGR};
pub use client::{AuthMode, IspRequest, OUTPUT_FORMAT};
pub use config::{AdminCredentials, PanelConfig};
pub use error::ApiError;
pub use http::{HttpRequest, HttpResponse, Transport, UreqTransport};
pub use normalize::normalize;
pub use params::{ParamStore, Params};
pub use session::{Redirect, Session};
