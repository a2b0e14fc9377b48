// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;

#[test]
fn test_vars_constants() {
    assert_eq!(vars::MOTIONCAM_CONFIG, "MOTIONCAM_CONFIG");
    assert_eq!(vars::MOTIONCAM_PASSWORD, "MOTIONCAM_PASSWORD");
    assert_eq!(vars::MOTIONCAM_RETAINED_DIR, "MOTIONCAM_RETAINED_DIR");
    assert_eq!(vars::XDG_RUNTIME_DIR, "XDG_RUNTIME_DIR");
    assert_eq!(vars::RUST_LOG, "RUST_LOG");
}

#[test]
fn test_retained_dir_set_and_unset() {
    std::env::set_var("MOTIONCAM_RETAINED_DIR", "/run/user/1000/cam");
    assert_eq!(retained_dir(), Some(PathBuf::from("/run/user/1000/cam")));
    std::env::remove_var("MOTIONCAM_RETAINED_DIR");
    assert!(retained_dir().is_none());
}
