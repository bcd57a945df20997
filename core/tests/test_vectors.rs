//! Check request building and answer normalization against the JSON test
//! vectors stored in `test-vectors/`.
//!
//! Comparing parsed JSON (not raw strings) keeps the normalization cases
//! independent of formatting.

use ispapi_core::{normalize, AdminCredentials, ApiError, IspRequest};
use serde_json::Value;

#[test]
fn normalize_test_vectors() {
    let raw = include_str!("../../test-vectors/normalize.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let out = normalize(&case["input"]);
        assert_eq!(out, case["expected"], "{name}: normalized");
        assert_eq!(normalize(&out), out, "{name}: idempotent");
    }
}

#[test]
fn request_test_vectors() {
    let raw = include_str!("../../test-vectors/request.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();

        let mut req = IspRequest::new(AdminCredentials::default())
            .path(case["path"].as_str().unwrap())
            .service(case["service"].as_str().unwrap());
        if let Some(lang) = case["lang"].as_str() {
            req = req.lang(lang);
        }
        let params = case["params"].as_object().unwrap().clone();
        req = req.request(params, case["func"].as_str());

        match case["expected_error"].as_str() {
            Some("EmptyRequest") => {
                let err = req.build().unwrap_err();
                assert!(matches!(err, ApiError::EmptyRequest), "{name}: error");
            }
            Some(other) => panic!("{name}: unknown expected error {other}"),
            None => {
                let http = req.build().unwrap();
                assert_eq!(http.url, case["expected_url"].as_str().unwrap(), "{name}: url");
            }
        }
    }
}
