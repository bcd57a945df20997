//! Error types for the panel API client.
//!
//! # Design
//! Every stage of a request chain reports failure through `ApiError` instead
//! of a falsy sentinel. The first six variants map one-to-one onto the stages
//! of `IspRequest::send`; the rest belong to configuration and the entity
//! builders layered on top.

use thiserror::Error;

/// Errors returned while building, sending, or interpreting a panel request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// `user` authentication was requested without both login and password.
    #[error("user authentication requires both login and password")]
    InvalidAuthArguments,

    /// Every parameter was pruned as empty, so nothing would be sent.
    #[error("request has no non-empty parameters")]
    EmptyRequest,

    /// The transport did not yield a response body. Network errors,
    /// non-200 statuses and empty bodies all land here.
    #[error("transport failed: {0}")]
    TransportFailure(String),

    /// The response body was not decodable JSON, or its root was a scalar.
    #[error("response could not be decoded: {0}")]
    DecodeFailure(String),

    /// The panel answered with `doc.error`. Carries the `msg` text of the
    /// error node, or the whole node serialized when it has no message.
    #[error("panel reported an error: {0}")]
    ApplicationError(String),

    /// A create/update request (`sok` set) came back without `doc.ok`.
    #[error("operation was not confirmed by the panel")]
    OperationNotConfirmed,

    /// An `edit` or `get` entity operation was requested without an element id.
    #[error("operation `{0}` requires an element id")]
    MissingElementId(String),

    /// An operation name other than `add`, `edit` or `get`.
    #[error("unknown operation `{0}`")]
    UnknownOperation(String),

    /// A successful answer lacked a node the caller depends on.
    #[error("response is missing `{0}`")]
    MissingField(&'static str),

    /// Required configuration was absent.
    #[error("configuration error: {0}")]
    Config(String),
}
