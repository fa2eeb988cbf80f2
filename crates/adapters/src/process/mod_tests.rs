// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn exit_status_success_requires_code_zero() {
    assert!(ExitStatus {
        code: Some(0),
        signal: None
    }
    .success());
    assert!(!ExitStatus {
        code: Some(1),
        signal: None
    }
    .success());
    assert!(!ExitStatus {
        code: None,
        signal: Some(9)
    }
    .success());
}

#[test]
fn child_env_injects_known_tags_and_prepends_path() {
    let base = vec![("PATH".to_string(), "/usr/bin".to_string())].into_iter();
    let overlay = HashMap::new();
    let env = child_env(base, &overlay, "w1", Path::new("/repo/wt1"));

    assert_eq!(env.get("AGENT_ID"), Some(&"w1".to_string()));
    assert_eq!(env.get("AGENT_ISOLATED"), Some(&"1".to_string()));
    assert_eq!(env.get("AGENT_WORKTREE"), Some(&"/repo/wt1".to_string()));
    assert_eq!(env.get("PATH"), Some(&"/repo/wt1:/usr/bin".to_string()));
}

#[test]
fn child_env_overlay_wins_over_base() {
    let base = vec![("FOO".to_string(), "base".to_string())].into_iter();
    let mut overlay = HashMap::new();
    overlay.insert("FOO".to_string(), "overlay".to_string());
    let env = child_env(base, &overlay, "w1", Path::new("/repo/wt1"));
    assert_eq!(env.get("FOO"), Some(&"overlay".to_string()));
}
