//! Integration tests for the jailed workspace resolver
//!
//! Verifies jail containment, the fail-safe fallback policy for the
//! persisted current-directory marker, and chunked output relay using
//! actual filesystem state under tempfile isolation.

use std::fs;

use shellgram::services::workspace::{ChangeDir, Workspace};
use shellgram::utils::format::chunk_str;
use tempfile::TempDir;

// ============================================================================
// Jail containment
// ============================================================================

#[test]
fn test_escaping_paths_resolve_to_root() {
    let temp = TempDir::new().unwrap();
    let ws = Workspace::open(temp.path(), 100).unwrap();

    // every path that canonicalizes outside the jail lands on the root
    for requested in ["..", "../../..", "/", "/etc", "~"] {
        match ws.change_dir(requested).unwrap() {
            ChangeDir::Changed { dir, .. } => {
                assert!(
                    dir == ws.root(),
                    "cd {} escaped to {}",
                    requested,
                    dir.display()
                );
            }
            ChangeDir::NotFound => panic!("cd {} should fall back to root", requested),
        }
    }
}

#[test]
fn test_symlink_escape_resolves_to_root() {
    let temp = TempDir::new().unwrap();
    let outside = temp.path().join("outside");
    fs::create_dir_all(&outside).unwrap();
    let ws = Workspace::open(&temp.path().join("base"), 100).unwrap();

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(&outside, ws.root().join("sneaky")).unwrap();
        match ws.change_dir("sneaky").unwrap() {
            ChangeDir::Changed { dir, .. } => assert_eq!(dir, ws.root()),
            ChangeDir::NotFound => panic!("symlink escape should fall back to root"),
        }
    }
}

#[test]
fn test_users_are_isolated() {
    let temp = TempDir::new().unwrap();
    let alice = Workspace::open(temp.path(), 1).unwrap();
    let bob = Workspace::open(temp.path(), 2).unwrap();

    fs::create_dir_all(alice.root().join("private")).unwrap();
    alice.change_dir("private").unwrap();

    // Bob's resolver never observes Alice's marker or directories
    assert_eq!(bob.current_dir(), bob.root().to_path_buf());
    assert_eq!(bob.change_dir("private").unwrap(), ChangeDir::NotFound);
    assert!(!bob.contains(&alice.root().join("private")));
}

// ============================================================================
// Current-directory marker round trip
// ============================================================================

#[test]
fn test_cd_round_trip_persists_until_changed() {
    let temp = TempDir::new().unwrap();
    let ws = Workspace::open(temp.path(), 7).unwrap();
    fs::create_dir_all(ws.root().join("sub/dir")).unwrap();

    ws.change_dir("sub/dir").unwrap();
    assert_eq!(ws.current_dir(), ws.root().join("sub/dir"));

    // a fresh resolver for the same user reads the same marker
    let again = Workspace::open(temp.path(), 7).unwrap();
    assert_eq!(again.current_dir(), ws.root().join("sub/dir"));

    again.change_dir("sub").unwrap();
    assert_eq!(ws.current_dir(), ws.root().join("sub"));
}

#[test]
fn test_marker_outside_jail_ignored_without_error() {
    let temp = TempDir::new().unwrap();
    let ws = Workspace::open(temp.path(), 7).unwrap();

    fs::write(ws.root().join(".cwd"), "/etc").unwrap();
    assert_eq!(ws.current_dir(), ws.root().to_path_buf());
}

#[test]
fn test_deleted_or_corrupted_marker_falls_back_to_root() {
    let temp = TempDir::new().unwrap();
    let ws = Workspace::open(temp.path(), 7).unwrap();
    fs::create_dir_all(ws.root().join("sub")).unwrap();
    ws.change_dir("sub").unwrap();

    fs::write(ws.root().join(".cwd"), "garbage\u{0}path").unwrap();
    assert_eq!(ws.current_dir(), ws.root().to_path_buf());

    fs::remove_file(ws.root().join(".cwd")).unwrap();
    assert_eq!(ws.current_dir(), ws.root().to_path_buf());
}

#[test]
fn test_failed_cd_does_not_mutate_marker() {
    let temp = TempDir::new().unwrap();
    let ws = Workspace::open(temp.path(), 7).unwrap();
    fs::create_dir_all(ws.root().join("keep")).unwrap();
    ws.change_dir("keep").unwrap();

    assert_eq!(ws.change_dir("missing").unwrap(), ChangeDir::NotFound);
    assert_eq!(ws.current_dir(), ws.root().join("keep"));
}

// ============================================================================
// Output chunking
// ============================================================================

#[test]
fn test_long_output_chunks_reassemble_exactly() {
    let output = (0..5000)
        .map(|i| format!("line {} with some command output\n", i))
        .collect::<String>();
    let chunks = chunk_str(&output, 3800);

    assert!(chunks.len() > 1);
    assert!(chunks.iter().all(|c| c.len() <= 3800));
    assert_eq!(chunks.concat(), output);
}

#[test]
fn test_multibyte_output_chunks_reassemble_exactly() {
    let output = "출력 라인 with mixed content —\n".repeat(800);
    let chunks = chunk_str(&output, 3800);
    assert_eq!(chunks.concat(), output);
}
