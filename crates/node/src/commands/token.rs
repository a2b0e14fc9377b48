// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use mc_core::RetainedMemory;

use super::load_config;
use crate::credentials::{CredentialProvider, CredentialStore, HttpLoginTransport, LoginTransport};
use crate::node::retained;
use crate::Result;

/// Drops the retained token through the credential store. Returns whether
/// one was held.
pub fn forget_in<T, R>(store: &mut CredentialStore<T, R>) -> bool
where
    T: LoginTransport,
    R: RetainedMemory,
{
    let held = store.restore();
    store.invalidate();
    held
}

pub fn forget(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let mut store = CredentialStore::new(
        &config.credentials,
        HttpLoginTransport::new(config.auth_timeout())?,
        retained(&config),
    );
    if forget_in(&mut store) {
        println!("Token forgotten, the next wake logs in again");
    } else {
        println!("No token retained");
    }
    Ok(())
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
