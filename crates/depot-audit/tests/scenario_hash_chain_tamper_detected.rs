//! Audit hash chain integrity.
//!
//! GREEN when:
//! - Writing 5 events with hash_chain=true, then verifying, succeeds.
//! - Mutating line 3's payload in the file, then verifying, detects the break.
//! - Deleting a line breaks the chain at the next event.

use depot_audit::{verify_hash_chain, AuditWriter, VerifyResult};
use serde_json::json;
use uuid::Uuid;

fn temp_audit_path(suffix: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "depot_audit_test_{}_{}_{}",
        suffix,
        std::process::id(),
        Uuid::new_v4().as_simple()
    ))
}

fn write_five_events(path: &std::path::Path) {
    let mut writer = AuditWriter::new(path, true).unwrap();
    for i in 0..5 {
        writer
            .append(
                "MAIN",
                "stock",
                &format!("ADJUSTMENT_{i}"),
                json!({"index": i, "resource": "ammo/9mm", "delta_units": i}),
            )
            .unwrap();
    }
}

#[test]
fn untampered_chain_verifies_valid() {
    let path = temp_audit_path("untampered");
    write_five_events(&path);

    let result = verify_hash_chain(&path).unwrap();
    assert_eq!(result, VerifyResult::Valid { lines: 5 });

    let _ = std::fs::remove_file(&path);
}

#[test]
fn tampered_payload_detected() {
    let path = temp_audit_path("tampered");
    write_five_events(&path);

    // Tamper with line 3: modify the payload without recomputing hash_self.
    {
        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines: Vec<&str> = content.lines().collect();
        assert!(lines.len() >= 5);

        let mut ev: serde_json::Value = serde_json::from_str(lines[2]).unwrap();
        ev["payload"]["delta_units"] = json!(9999);
        let tampered_line = serde_json::to_string(&ev).unwrap();
        lines[2] = &tampered_line;
        std::fs::write(&path, lines.join("\n") + "\n").unwrap();
    }

    match verify_hash_chain(&path).unwrap() {
        VerifyResult::Broken { line, reason } => {
            assert_eq!(line, 3, "tamper should be detected at line 3: {reason}");
            assert!(reason.contains("hash_self mismatch"), "got: {reason}");
        }
        VerifyResult::Valid { lines } => {
            panic!("tampered chain should NOT verify as valid (got {lines} valid lines)");
        }
    }

    let _ = std::fs::remove_file(&path);
}

#[test]
fn deleted_line_detected() {
    let path = temp_audit_path("deleted");
    write_five_events(&path);

    // Delete line 3.
    {
        let content = std::fs::read_to_string(&path).unwrap();
        let kept: Vec<&str> = content
            .lines()
            .enumerate()
            .filter(|(i, _)| *i != 2)
            .map(|(_, l)| l)
            .collect();
        std::fs::write(&path, kept.join("\n") + "\n").unwrap();
    }

    match verify_hash_chain(&path).unwrap() {
        VerifyResult::Broken { line, reason } => {
            assert!(reason.contains("hash_prev mismatch"), "got: {reason}");
            assert!(line >= 3, "break should be at line 3 or later (was at {line})");
        }
        VerifyResult::Valid { lines } => {
            panic!("chain with deleted line should NOT verify as valid (got {lines} lines)");
        }
    }

    let _ = std::fs::remove_file(&path);
}

#[test]
fn empty_log_is_valid() {
    let path = temp_audit_path("empty");
    std::fs::write(&path, "").unwrap();

    assert_eq!(
        verify_hash_chain(&path).unwrap(),
        VerifyResult::Valid { lines: 0 }
    );

    let _ = std::fs::remove_file(&path);
}
