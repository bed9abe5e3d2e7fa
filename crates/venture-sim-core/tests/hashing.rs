// crates/venture-sim-core/tests/hashing.rs
// ============================================================================
// Module: Canonical Hashing Tests
// Description: Verifies RFC 8785 canonical JSON hashing behavior.
// ============================================================================
//! ## Overview
//! Ensures canonical JSON hashing is deterministic across key ordering and
//! numeric representation, rejects non-finite floats, and produces known
//! digests for golden inputs.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use venture_sim_core::HashAlgorithm;
use venture_sim_core::hashing::HashDigest;
use venture_sim_core::hashing::HashError;
use venture_sim_core::hashing::canonical_json_bytes;
use venture_sim_core::hashing::decode_hex;
use venture_sim_core::hashing::hash_bytes;
use venture_sim_core::hashing::hash_canonical_json;

#[test]
fn canonical_hash_is_order_independent_for_maps() {
    let mut map_a = Map::new();
    map_a.insert("b".to_string(), json!(2));
    map_a.insert("a".to_string(), json!(1));

    let mut map_b = Map::new();
    map_b.insert("a".to_string(), json!(1));
    map_b.insert("b".to_string(), json!(2));

    let hash_a =
        hash_canonical_json(HashAlgorithm::Sha256, &Value::Object(map_a)).expect("hash a");
    let hash_b =
        hash_canonical_json(HashAlgorithm::Sha256, &Value::Object(map_b)).expect("hash b");

    assert_eq!(hash_a, hash_b);
}

#[test]
fn canonical_hash_normalizes_numeric_representation() {
    let hash_float = hash_canonical_json(HashAlgorithm::Sha256, &json!(1.0)).expect("hash float");
    let hash_int = hash_canonical_json(HashAlgorithm::Sha256, &json!(1)).expect("hash int");
    assert_eq!(hash_float, hash_int);
}

#[derive(Serialize)]
struct FloatWrapper {
    value: f64,
}

#[test]
fn canonical_hash_rejects_nan() {
    let value = FloatWrapper {
        value: f64::NAN,
    };
    let err = hash_canonical_json(HashAlgorithm::Sha256, &value).unwrap_err();
    assert!(matches!(err, HashError::Canonicalization(_)));
}

#[test]
fn canonical_hash_rejects_infinity() {
    let value = FloatWrapper {
        value: f64::INFINITY,
    };
    let err = hash_canonical_json(HashAlgorithm::Sha256, &value).unwrap_err();
    assert!(matches!(err, HashError::Canonicalization(_)));
}

#[test]
fn canonical_bytes_sort_struct_keys() {
    #[derive(Serialize)]
    struct Unordered {
        zebra: u32,
        apple: u32,
    }
    let bytes = canonical_json_bytes(&Unordered {
        zebra: 1,
        apple: 2,
    })
    .expect("canonical bytes");
    let text = String::from_utf8(bytes).expect("utf8");
    assert_eq!(text, r#"{"apple":2,"zebra":1}"#);
}

// ============================================================================
// SECTION: Golden SHA-256 Tests
// ============================================================================

#[test]
fn golden_hash_empty_object() {
    // SHA-256 of "{}"
    let digest = hash_canonical_json(HashAlgorithm::Sha256, &json!({})).expect("hash");
    assert_eq!(
        digest.value,
        "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
    );
    assert_eq!(digest.algorithm, HashAlgorithm::Sha256);
}

#[test]
fn golden_hash_empty_array() {
    // SHA-256 of "[]"
    let digest = hash_canonical_json(HashAlgorithm::Sha256, &json!([])).expect("hash");
    assert_eq!(
        digest.value,
        "4f53cda18c2baa0c0354bb5f9a3ecbe5ed12ab4d8e11ba873c2f11161202b945"
    );
}

#[test]
fn golden_hash_bytes_direct() {
    // SHA-256 of "test"
    let digest = hash_bytes(HashAlgorithm::Sha256, b"test");
    assert_eq!(
        digest.value,
        "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
    );
}

#[test]
fn golden_hash_empty_bytes() {
    // SHA-256 of the empty input
    let digest = hash_bytes(HashAlgorithm::Sha256, b"");
    assert_eq!(
        digest.value,
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

// ============================================================================
// SECTION: Hex Round-Trips
// ============================================================================

#[test]
fn hash_digest_produces_lowercase_hex() {
    let digest = HashDigest::new(HashAlgorithm::Sha256, &[0xAB, 0xCD, 0xEF, 0x12]);
    assert_eq!(digest.value, "abcdef12");
    assert!(!digest.value.chars().any(char::is_uppercase));
}

#[test]
fn hex_round_trips() {
    let bytes = [0u8, 1, 127, 128, 255];
    let text = HashDigest::new(HashAlgorithm::Sha256, &bytes).value;
    assert_eq!(decode_hex(&text).expect("decode"), bytes.to_vec());
}

#[test]
fn hex_rejects_odd_length() {
    assert!(matches!(decode_hex("abc"), Err(HashError::InvalidHex { .. })));
}

#[test]
fn hex_rejects_non_hex_characters() {
    assert!(matches!(decode_hex("zz"), Err(HashError::InvalidHex { .. })));
}

#[test]
fn hash_consistency_across_calls() {
    let value = json!({"a": 1, "b": [1, 2, 3], "c": {"nested": true}});
    let first = hash_canonical_json(HashAlgorithm::Sha256, &value).expect("first");
    let second = hash_canonical_json(HashAlgorithm::Sha256, &value).expect("second");
    assert_eq!(first, second, "hash must be deterministic");
}
