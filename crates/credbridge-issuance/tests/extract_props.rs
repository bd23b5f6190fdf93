//! # Extraction Properties
//!
//! Payload shapes are not under the bridge's control, so the extractors
//! must be total over arbitrary JSON and every DID they return must already
//! be normalized.

use credbridge_issuance::extract::{
    extract_credential_id, extract_issuer_did, extract_issuer_name, extract_subject_did,
    resolve_credential,
};
use credbridge_issuance::metadata::MetadataBuilder;
use proptest::prelude::*;
use serde_json::{json, Map, Value};

const KEYS: &[&str] = &[
    "vc",
    "credential",
    "credentials",
    "data",
    "did",
    "subject",
    "subjectID",
    "subjectDid",
    "credentialSubject",
    "id",
    "identifier",
    "issuer",
    "issuerDid",
    "issuerID",
    "name",
    "profileID",
    "credentialIDs",
    "metadata",
];

fn arb_payload() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        "( |did:|DID:|Did:)?[x-z0-9]{0,6}(:[a-z0-9]{1,6})? ?".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec((prop::sample::select(KEYS), inner), 0..6).prop_map(|pairs| {
                let mut map = Map::new();
                for (k, v) in pairs {
                    map.insert(k.to_string(), v);
                }
                Value::Object(map)
            }),
        ]
    })
}

fn assert_normalized(did: &Option<String>) -> Result<(), TestCaseError> {
    if let Some(did) = did {
        prop_assert!(!did.is_empty());
        prop_assert_eq!(did.trim(), did.as_str());
        let head = did.get(..4).unwrap_or("");
        prop_assert!(!head.eq_ignore_ascii_case("did:"), "unstripped prefix in {}", did);
    }
    Ok(())
}

proptest! {
    #[test]
    fn extractors_are_total_and_normalize(payload in arb_payload()) {
        let credential = resolve_credential(&payload);
        assert_normalized(&extract_subject_did(&payload, credential))?;
        assert_normalized(&extract_issuer_did(&payload, credential))?;
        let _ = extract_issuer_name(&payload, credential);
        let _ = extract_credential_id(credential, &[&payload]);
    }

    #[test]
    fn metadata_always_builds_an_object(raw in arb_payload()) {
        let mut builder = MetadataBuilder::from_raw(Some(&raw));
        builder.ensure_str("txnid", Some("T"));
        let built = builder.build();
        prop_assert!(built.is_object());
        prop_assert!(built.get("txnid").is_some());
    }
}
