//! Scoped SSH askpass helper.
//!
//! SSH cannot take a password on stdin for interactive sessions, so the
//! rescue shell points `SSH_ASKPASS` at a short-lived script that echoes the
//! rescue password. The script lives in its own temporary directory and is
//! removed on every exit path, including failures, via `Drop`.

use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::RobotError;

/// Temporary askpass script scoped to its owner's lifetime.
#[derive(Debug)]
pub struct AskPassHelper {
    // Held for its Drop impl, which removes the directory and the script.
    _dir: TempDir,
    script: PathBuf,
}

impl AskPassHelper {
    /// Materialises a mode-0700 `sh` script that prints `passwd`.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::Io`] when the directory or script cannot be
    /// created.
    pub fn new(passwd: &str) -> Result<Self, RobotError> {
        let dir = TempDir::new()?;
        let script = dir.path().join("askpass");
        let escaped = passwd.replace('\'', r"'\''");
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o700)
            .open(&script)?;
        file.write_all(format!("#!/bin/sh\necho -n '{escaped}'").as_bytes())?;
        Ok(Self { _dir: dir, script })
    }

    /// Path of the askpass script, valid until the helper is dropped.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.script
    }
}
