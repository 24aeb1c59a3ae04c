use pubshare_crypto::{hash_password, verify_password, HashCost};

fn fast() -> HashCost {
    HashCost {
        memory_cost: 1024,
        time_cost: 1,
        parallelism: 1,
    }
}

#[test]
fn correct_password_verifies() {
    let hash = hash_password("secret", &fast()).unwrap();
    assert!(verify_password("secret", &hash));
}

#[test]
fn wrong_password_is_rejected() {
    let hash = hash_password("secret", &fast()).unwrap();
    assert!(!verify_password("Secret", &hash));
    assert!(!verify_password("", &hash));
}

#[test]
fn hashes_are_salted() {
    let h1 = hash_password("secret", &fast()).unwrap();
    let h2 = hash_password("secret", &fast()).unwrap();
    assert_ne!(h1, h2);
    assert!(verify_password("secret", &h1));
    assert!(verify_password("secret", &h2));
}

#[test]
fn hash_never_contains_plaintext() {
    let hash = hash_password("plaintext-password", &fast()).unwrap();
    assert!(!hash.contains("plaintext-password"));
}

#[test]
fn malformed_hash_never_matches() {
    assert!(!verify_password("secret", "not-a-hash"));
    assert!(!verify_password("secret", ""));
}

#[test]
fn verification_ignores_current_cost() {
    let cheap = hash_password("secret", &fast()).unwrap();
    let other = HashCost {
        memory_cost: 2048,
        time_cost: 2,
        parallelism: 1,
    };
    let dearer = hash_password("secret", &other).unwrap();
    assert!(verify_password("secret", &cheap));
    assert!(verify_password("secret", &dearer));
}

// ── HashCost ─────────────────────────────────────────────────────

#[test]
fn default_cost_is_owasp() {
    let cost = HashCost::default();
    assert_eq!(cost.memory_cost, 19 * 1024);
    assert_eq!(cost.time_cost, 2);
    assert_eq!(cost.parallelism, 1);
}

#[test]
fn cost_deserializes_partially() {
    let cost: HashCost = serde_json::from_str(r#"{"time_cost": 3}"#).unwrap();
    assert_eq!(cost.time_cost, 3);
    assert_eq!(cost.memory_cost, 19 * 1024);
}
