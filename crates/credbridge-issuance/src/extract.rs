//! # Credential Field Extraction
//!
//! Issuers and wallets do not agree on payload shape, so each logical value
//! is recovered by trying a fixed, ordered list of locations. The first
//! non-empty match wins. Null, missing, and blank strings are absent.
//!
//! Every function here is total: malformed input yields `None`, never a
//! panic.

use credbridge_core::normalize_did;
use serde_json::Value;

/// Walk a path of object keys.
pub(crate) fn at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

/// JavaScript-style truthiness: null, `false`, `0`, and blank strings are
/// falsy.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// The first truthy candidate.
pub(crate) fn first_truthy<'a>(
    candidates: impl IntoIterator<Item = Option<&'a Value>>,
) -> Option<&'a Value> {
    candidates.into_iter().flatten().find(|v| truthy(v))
}

fn non_blank_string(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Locate the credential object inside a payload: `vc`, then `credential`,
/// then `data.credential`, then the first of `data.credentials`.
pub fn resolve_credential(payload: &Value) -> Option<&Value> {
    first_truthy([
        payload.get("vc"),
        payload.get("credential"),
        at(payload, &["data", "credential"]),
        at(payload, &["data", "credentials"])
            .and_then(Value::as_array)
            .and_then(|list| list.first()),
    ])
}

/// Ordered DID candidates, normalized as they are pushed.
#[derive(Default)]
struct DidCandidates(Option<String>);

impl DidCandidates {
    fn push(&mut self, value: Option<&Value>) {
        if self.0.is_none() {
            self.0 = value.and_then(normalize_did);
        }
    }

    fn found(&self) -> bool {
        self.0.is_some()
    }

    fn into_inner(self) -> Option<String> {
        self.0
    }
}

fn inspect_credential_subject(candidates: &mut DidCandidates, credential: Option<&Value>) {
    let Some(credential) = credential else {
        return;
    };
    for key in ["subjectID", "subjectId", "subjectDid", "subjectDID", "subject"] {
        candidates.push(credential.get(key));
    }

    let subject = credential
        .get("credentialSubject")
        .filter(|v| !v.is_null())
        .or_else(|| credential.get("subject"));
    match subject {
        Some(Value::Array(entries)) => {
            for entry in entries.iter().filter(|e| e.is_object()) {
                candidates.push(entry.get("id"));
                candidates.push(entry.get("identifier"));
            }
        }
        Some(object @ Value::Object(_)) => {
            candidates.push(object.get("id"));
            candidates.push(object.get("identifier"));
            candidates.push(object.get("subjectID"));
        }
        _ => {}
    }
}

/// Recover the credential subject's DID.
///
/// Order: the given credential, `payload.credential`, `payload.vc`; then
/// payload-level `did`, `subjectID`, `subjectDid`; then `data.subjectID`,
/// `data.subjectDid`, `data.subject`; then each of `data.credentials`.
/// Within a credential: `subjectID`, `subjectId`, `subjectDid`,
/// `subjectDID`, string `subject`, then the `credentialSubject` (or
/// `subject`) object's `id`, `identifier`, `subjectID`, or for a list, each
/// element's `id` and `identifier`.
pub fn extract_subject_did(payload: &Value, credential: Option<&Value>) -> Option<String> {
    let mut candidates = DidCandidates::default();

    inspect_credential_subject(&mut candidates, credential);
    inspect_credential_subject(&mut candidates, payload.get("credential"));
    inspect_credential_subject(&mut candidates, payload.get("vc"));

    candidates.push(payload.get("did"));
    candidates.push(payload.get("subjectID"));
    candidates.push(payload.get("subjectDid"));
    candidates.push(at(payload, &["data", "subjectID"]));
    candidates.push(at(payload, &["data", "subjectDid"]));
    candidates.push(at(payload, &["data", "subject"]));

    if !candidates.found() {
        if let Some(list) = at(payload, &["data", "credentials"]).and_then(Value::as_array) {
            for credential in list {
                inspect_credential_subject(&mut candidates, Some(credential));
            }
        }
    }

    candidates.into_inner()
}

/// Recover the issuer's display name (or identifier when no name is given).
///
/// The first present of `credential.issuer`, `payload.issuer`,
/// `payload.data.issuer`, `payload.data.profileID`. A string is returned
/// as-is; an object yields its `id`, then its `name`.
pub fn extract_issuer_name(payload: &Value, credential: Option<&Value>) -> Option<String> {
    [
        credential.and_then(|c| c.get("issuer")),
        payload.get("issuer"),
        at(payload, &["data", "issuer"]),
        at(payload, &["data", "profileID"]),
    ]
    .into_iter()
    .flatten()
    .find_map(|raw| match raw {
        Value::String(_) => non_blank_string(raw),
        Value::Object(_) => raw
            .get("id")
            .and_then(non_blank_string)
            .or_else(|| raw.get("name").and_then(non_blank_string)),
        _ => None,
    })
}

fn inspect_issuer_object(candidates: &mut DidCandidates, issuer: Option<&Value>) {
    let Some(issuer @ Value::Object(_)) = issuer else {
        return;
    };
    for key in ["id", "did", "DID", "issuerDid", "issuerDID"] {
        candidates.push(issuer.get(key));
    }
}

/// Recover the issuer's DID.
///
/// Credential-level `issuerDid`, `issuerDID`, `issuer.did`, `issuer.DID`,
/// `issuerId`, `issuerID`, then the credential's issuer object; then the
/// payload's and `data`'s `issuerDid`, `issuerDID`, `issuerId`, `issuerID`;
/// then the payload's issuer object and finally `data.issuer`.
pub fn extract_issuer_did(payload: &Value, credential: Option<&Value>) -> Option<String> {
    let mut candidates = DidCandidates::default();

    if let Some(credential) = credential {
        candidates.push(credential.get("issuerDid"));
        candidates.push(credential.get("issuerDID"));
        candidates.push(at(credential, &["issuer", "did"]));
        candidates.push(at(credential, &["issuer", "DID"]));
        candidates.push(credential.get("issuerId"));
        candidates.push(credential.get("issuerID"));
        inspect_issuer_object(&mut candidates, credential.get("issuer"));
    }

    for scope in [Some(payload), payload.get("data")].into_iter().flatten() {
        for key in ["issuerDid", "issuerDID", "issuerId", "issuerID"] {
            candidates.push(scope.get(key));
        }
    }

    inspect_issuer_object(&mut candidates, payload.get("issuer"));
    inspect_issuer_object(&mut candidates, at(payload, &["data", "issuer"]));

    candidates.into_inner()
}

/// Recover the credential identifier: `credential.id`, then each payload's
/// `data.credentialIDs` (its first element when a list).
pub fn extract_credential_id(credential: Option<&Value>, payloads: &[&Value]) -> Option<String> {
    if let Some(id) = credential.and_then(|c| c.get("id")).and_then(non_blank_string) {
        return Some(id);
    }
    payloads.iter().find_map(|payload| {
        match at(payload, &["data", "credentialIDs"])? {
            Value::Array(ids) => ids.first().and_then(non_blank_string),
            other => non_blank_string(other),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolve_credential_prefers_vc() {
        let payload = json!({
            "vc": { "id": "vc" },
            "credential": { "id": "credential" },
        });
        assert_eq!(resolve_credential(&payload).unwrap()["id"], "vc");
    }

    #[test]
    fn resolve_credential_falls_through_to_data_credentials() {
        let payload = json!({ "data": { "credentials": [{ "id": "first" }, { "id": "second" }] } });
        assert_eq!(resolve_credential(&payload).unwrap()["id"], "first");
        assert!(resolve_credential(&json!({ "data": { "credentials": [] } })).is_none());
        assert!(resolve_credential(&json!({ "vc": null, "credential": "" })).is_none());
    }

    #[test]
    fn subject_did_from_credential_subject_object() {
        let credential = json!({ "credentialSubject": { "id": "did:example:alice" } });
        assert_eq!(
            extract_subject_did(&json!({}), Some(&credential)).as_deref(),
            Some("example:alice")
        );
    }

    #[test]
    fn subject_did_from_credential_subject_list() {
        let credential = json!({
            "credentialSubject": [{ "name": "no id" }, { "identifier": "DID:example:bob" }]
        });
        assert_eq!(
            extract_subject_did(&json!({}), Some(&credential)).as_deref(),
            Some("example:bob")
        );
    }

    #[test]
    fn subject_did_credential_fields_beat_payload_fields() {
        let payload = json!({ "did": "payload-level", "vc": { "subjectId": "from-vc" } });
        assert_eq!(
            extract_subject_did(&payload, None).as_deref(),
            Some("from-vc")
        );
    }

    #[test]
    fn subject_did_from_data_and_credentials_list() {
        let payload = json!({ "data": { "subject": "  did:example:carol  " } });
        assert_eq!(
            extract_subject_did(&payload, None).as_deref(),
            Some("example:carol")
        );

        let payload = json!({
            "data": { "credentials": [{ "types": [] }, { "subjectID": "example:dave" }] }
        });
        assert_eq!(
            extract_subject_did(&payload, None).as_deref(),
            Some("example:dave")
        );
    }

    #[test]
    fn subject_did_skips_blank_and_non_string_candidates() {
        let payload = json!({
            "subjectID": "   ",
            "subjectDid": 42,
            "data": { "subjectID": "example:erin" }
        });
        assert_eq!(
            extract_subject_did(&payload, None).as_deref(),
            Some("example:erin")
        );
        assert!(extract_subject_did(&json!({}), None).is_none());
        assert!(extract_subject_did(&json!([1, 2]), None).is_none());
        assert!(extract_subject_did(&Value::Null, Some(&json!("scalar"))).is_none());
    }

    #[test]
    fn issuer_name_string_or_object() {
        assert_eq!(
            extract_issuer_name(&json!({ "issuer": "Acme" }), None).as_deref(),
            Some("Acme")
        );
        let credential = json!({ "issuer": { "name": "Acme Corp" } });
        assert_eq!(
            extract_issuer_name(&json!({ "issuer": "ignored" }), Some(&credential)).as_deref(),
            Some("Acme Corp")
        );
        let credential = json!({ "issuer": { "id": "did:acme", "name": "Acme Corp" } });
        assert_eq!(
            extract_issuer_name(&json!({}), Some(&credential)).as_deref(),
            Some("did:acme")
        );
        assert_eq!(
            extract_issuer_name(&json!({ "data": { "profileID": "profile-7" } }), None).as_deref(),
            Some("profile-7")
        );
        assert!(extract_issuer_name(&json!({}), None).is_none());
    }

    #[test]
    fn issuer_did_order() {
        let credential = json!({ "issuer": { "id": "did:example:obj" }, "issuerID": "DID:example:flat" });
        assert_eq!(
            extract_issuer_did(&json!({}), Some(&credential)).as_deref(),
            Some("example:flat")
        );

        let payload = json!({
            "issuer": { "did": "did:example:payload-obj" },
            "data": { "issuerId": "did:example:data" }
        });
        assert_eq!(
            extract_issuer_did(&payload, None).as_deref(),
            Some("example:data")
        );

        let payload = json!({ "data": { "issuer": { "issuerDID": "example:nested" } } });
        assert_eq!(
            extract_issuer_did(&payload, None).as_deref(),
            Some("example:nested")
        );
        assert!(extract_issuer_did(&json!({ "issuer": "string issuer" }), None).is_none());
    }

    #[test]
    fn credential_id_sources() {
        let credential = json!({ "id": "urn:cred:1" });
        assert_eq!(
            extract_credential_id(Some(&credential), &[]).as_deref(),
            Some("urn:cred:1")
        );

        let payload = json!({ "data": { "credentialIDs": ["urn:cred:2", "urn:cred:3"] } });
        assert_eq!(
            extract_credential_id(None, &[&json!({}), &payload]).as_deref(),
            Some("urn:cred:2")
        );

        let payload = json!({ "data": { "credentialIDs": "urn:cred:4" } });
        assert_eq!(
            extract_credential_id(Some(&json!({})), &[&payload]).as_deref(),
            Some("urn:cred:4")
        );
        assert!(extract_credential_id(None, &[&json!({})]).is_none());
    }

    #[test]
    fn truthiness_matches_webhook_expectations() {
        assert!(!truthy(&json!(null)));
        assert!(!truthy(&json!(false)));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!(" ")));
        assert!(truthy(&json!("x")));
        assert!(truthy(&json!({})));
        assert!(truthy(&json!([])));
    }
}
