use factorylog::auth::{
    ATTEMPT_WINDOW_SECS, AttemptStore, AuthGate, AuthOutcome, MAX_FAILED_ATTEMPTS, MemoryAttempts,
};

const KEY: [u8; 32] = [7u8; 32];
const OTHER_KEY: [u8; 32] = [8u8; 32];

fn gate() -> AuthGate {
    AuthGate::in_memory(KEY, 3600)
}

fn test_token_shape() {
    println!("\n====== Testing session token shape ======");

    let gate = gate();
    let token = gate.issue_session();

    let parts: Vec<&str> = token.splitn(3, '.').collect();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], "v1");
    assert!(parts[1].parse::<u64>().is_ok());
    assert_eq!(parts[2].len(), 64); // hex-encoded 32-byte signature
    println!("✓ Token is v1.<expiry>.<signature>");
}

fn test_issue_and_validate() {
    println!("\n====== Testing issue/validate roundtrip ======");

    let gate = gate();
    let token = gate.issue_session();
    assert!(gate.validate_session(&token));
    println!("✓ Freshly issued token validates");

    assert!(!gate.validate_session("v1.123.deadbeef"));
    assert!(!gate.validate_session("not-a-token"));
    assert!(!gate.validate_session(""));
    println!("✓ Garbage tokens rejected");
}

fn test_tampering_rejected() {
    println!("\n====== Testing tamper detection ======");

    let gate = gate();
    let token = gate.issue_session();

    // Flip the last signature character
    let mut tampered = token.clone();
    let last = if tampered.ends_with('0') { '1' } else { '0' };
    tampered.pop();
    tampered.push(last);
    assert!(!gate.validate_session(&tampered));
    println!("✓ Modified signature rejected");

    // Extend the expiry while keeping the old signature
    let parts: Vec<&str> = token.splitn(3, '.').collect();
    let stretched = format!(
        "{}.{}.{}",
        parts[0],
        parts[1].parse::<u64>().unwrap() + 9999,
        parts[2]
    );
    assert!(!gate.validate_session(&stretched));
    println!("✓ Stretched expiry breaks the signature");

    let other = AuthGate::in_memory(OTHER_KEY, 3600);
    assert!(!other.validate_session(&token));
    println!("✓ Token signed under a different key rejected");
}

fn test_expiry_and_revocation() {
    println!("\n====== Testing expiry and revocation ======");

    // TTL of zero expires the token at issue time
    let gate = AuthGate::in_memory(KEY, 0);
    let token = gate.issue_session();
    assert!(!gate.validate_session(&token));
    println!("✓ Expired token rejected");

    let gate = AuthGate::in_memory(KEY, 3600);
    let token = gate.issue_session();
    assert!(gate.validate_session(&token));
    gate.revoke_session(&token);
    assert!(!gate.validate_session(&token));
    println!("✓ Revoked token rejected even with a valid signature");
}

fn test_password_attempts() {
    println!("\n====== Testing password attempts and lockout ======");

    let gate = gate();

    assert_eq!(
        gate.password_attempt("10.0.0.1", "secret", "secret"),
        AuthOutcome::Accepted
    );
    println!("✓ Correct password accepted");

    assert_eq!(
        gate.password_attempt("10.0.0.1", "wrong", "secret"),
        AuthOutcome::Rejected
    );
    println!("✓ Wrong password rejected");

    for _ in 0..MAX_FAILED_ATTEMPTS {
        gate.password_attempt("10.0.0.2", "wrong", "secret");
    }
    match gate.password_attempt("10.0.0.2", "secret", "secret") {
        AuthOutcome::RateLimited { retry_after_secs } => {
            assert!(retry_after_secs > 0 && retry_after_secs <= ATTEMPT_WINDOW_SECS);
            println!("✓ Locked out after {} failures, even with the right password", MAX_FAILED_ATTEMPTS);
        }
        other => panic!("expected lockout, got {:?}", other),
    }

    // A different client is unaffected
    assert_eq!(
        gate.password_attempt("10.0.0.3", "secret", "secret"),
        AuthOutcome::Accepted
    );
    println!("✓ Lockout is per client");

    // A success below the limit clears the counter
    for _ in 0..MAX_FAILED_ATTEMPTS - 1 {
        gate.password_attempt("10.0.0.4", "wrong", "secret");
    }
    assert_eq!(
        gate.password_attempt("10.0.0.4", "secret", "secret"),
        AuthOutcome::Accepted
    );
    assert_eq!(
        gate.password_attempt("10.0.0.4", "wrong", "secret"),
        AuthOutcome::Rejected
    );
    println!("✓ Success clears the failure counter");
}

fn test_attempt_window_expiry() {
    println!("\n====== Testing the attempt window ======");

    let attempts = MemoryAttempts::default();
    let start = 1_000u64;

    for _ in 0..MAX_FAILED_ATTEMPTS {
        attempts.record_failure("client", start);
    }
    let remaining = attempts.lockout_remaining("client", start + ATTEMPT_WINDOW_SECS - 1);
    assert_eq!(remaining, Some(1));
    println!("✓ Lockout remaining counts down inside the window");

    let remaining = attempts.lockout_remaining("client", start + ATTEMPT_WINDOW_SECS);
    assert_eq!(remaining, None);
    println!("✓ Window expiry lifts the lockout");

    attempts.record_failure("client", start + ATTEMPT_WINDOW_SECS);
    let remaining = attempts.lockout_remaining("client", start + ATTEMPT_WINDOW_SECS);
    assert_eq!(remaining, None);
    println!("✓ A failure after the window starts a fresh count");
}

fn main() {
    test_token_shape();
    test_issue_and_validate();
    test_tampering_rejected();
    test_expiry_and_revocation();
    test_password_attempts();
    test_attempt_window_expiry();

    println!("\nAll auth tests passed");
}
