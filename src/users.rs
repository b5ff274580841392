// src/users.rs
//! Flat-file user directory (`name,email,password_hash`).
//!
//! All access goes through one mutex, so a registration's existence check
//! and its append are a single step and concurrent sign-ups of the same
//! email leave exactly one row.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::UserStoreError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct UserRow {
    name: String,
    email: String,
    password_hash: String,
}

/// Lowercase hex SHA-256 of the password.
pub fn hash_password(password: &str) -> String {
    use std::fmt::Write as _;
    let digest = Sha256::digest(password.as_bytes());
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

pub struct UserDirectory {
    path: PathBuf,
    lock: Mutex<()>,
}

impl UserDirectory {
    /// Opens (or creates, header only) the user file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, UserStoreError> {
        let path = path.into();
        if !path.exists() {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)?;
            }
            let mut w = csv::Writer::from_path(&path)?;
            w.write_record(["name", "email", "password_hash"])?;
            w.flush()?;
            tracing::info!(target: "users", path = %path.display(), "created user file");
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self, email: &str) -> Result<bool, UserStoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.rows()?.iter().any(|r| r.email == email))
    }

    /// Appends a new user. Returns `None` when the email is already taken.
    pub fn create(&self, name: &str, email: &str, password: &str) -> Result<Option<UserProfile>, UserStoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        if self.rows()?.iter().any(|r| r.email == email) {
            return Ok(None);
        }

        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut w = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        w.serialize(UserRow {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password),
        })?;
        w.flush()?;

        tracing::info!(target: "users", %email, "user registered");
        Ok(Some(UserProfile {
            name: name.to_string(),
            email: email.to_string(),
        }))
    }

    pub fn authenticate(&self, email: &str, password: &str) -> Result<Option<UserProfile>, UserStoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let hash = hash_password(password);
        Ok(self
            .rows()?
            .into_iter()
            .find(|r| r.email == email && r.password_hash == hash)
            .map(|r| UserProfile {
                name: r.name,
                email: r.email,
            }))
    }

    fn rows(&self) -> Result<Vec<UserRow>, UserStoreError> {
        let mut r = csv::Reader::from_path(&self.path)?;
        let mut out = Vec::new();
        for row in r.deserialize() {
            out.push(row?);
        }
        Ok(out)
    }
}
