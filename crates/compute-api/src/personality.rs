//! Personality files injected into a server at build time.
//!
//! Each file is read from the local disk and base64-encoded into the
//! `personality` array of a create or rebuild request.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use compute_core::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::Result;

/// Maximum number of personality files per request
pub const MAX_PERSONALITY_ITEMS: usize = 5;

/// Maximum length of the server-side path
pub const MAX_SERVER_PATH_LENGTH: usize = 255;

/// Maximum size of a single local file in bytes
pub const MAX_PERSONALITY_FILE_SIZE: u64 = 10240;

/// One file as sent to the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersonalityFile {
    /// Absolute path on the server
    pub path: String,
    /// Base64-encoded contents
    pub contents: String,
}

impl PersonalityFile {
    /// Encodes `contents` for `server_path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Personality`] if the path or the contents exceed the
    /// allowed sizes.
    pub fn new(server_path: impl Into<String>, contents: &[u8]) -> Result<Self> {
        let path = server_path.into();
        check_server_path(&path)?;
        if contents.len() as u64 > MAX_PERSONALITY_FILE_SIZE {
            return Err(too_large(&path));
        }
        Ok(Self {
            path,
            contents: STANDARD.encode(contents),
        })
    }

    /// Decodes the contents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the contents are not valid base64.
    pub fn decode(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(&self.contents)
            .map_err(|err| Error::Parse(format!("Invalid personality contents for {}: {err}", self.path)))
    }
}

/// Reads and encodes local files, given as `(local path, server path)` pairs.
///
/// # Errors
///
/// Returns [`Error::Personality`] if more than [`MAX_PERSONALITY_ITEMS`] files
/// are given, a server path is longer than [`MAX_SERVER_PATH_LENGTH`], a file
/// is larger than [`MAX_PERSONALITY_FILE_SIZE`] or cannot be read.
pub async fn load<P, S>(files: &[(P, S)]) -> Result<Vec<PersonalityFile>>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    if files.len() > MAX_PERSONALITY_ITEMS {
        return Err(Error::Personality(format!(
            "Personality files are limited to a total of {MAX_PERSONALITY_ITEMS} items"
        )));
    }

    let mut loaded = Vec::with_capacity(files.len());
    for (local, server_path) in files {
        let local = local.as_ref();
        let server_path = server_path.as_ref();
        check_server_path(server_path)?;

        let metadata = tokio::fs::metadata(local).await.map_err(|err| {
            Error::Personality(format!("Unable to read {}: {err}", local.display()))
        })?;
        if metadata.len() > MAX_PERSONALITY_FILE_SIZE {
            return Err(Error::Personality(format!(
                "Local file {} exceeds the maximum size of {MAX_PERSONALITY_FILE_SIZE} bytes",
                local.display()
            )));
        }

        let contents = tokio::fs::read(local).await.map_err(|err| {
            Error::Personality(format!("Unable to read {}: {err}", local.display()))
        })?;
        debug!(local = %local.display(), server = server_path, bytes = contents.len(), "loaded personality file");
        loaded.push(PersonalityFile::new(server_path, &contents)?);
    }

    Ok(loaded)
}

fn check_server_path(path: &str) -> Result<()> {
    if path.chars().count() > MAX_SERVER_PATH_LENGTH {
        return Err(Error::Personality(format!(
            "Server-side path of {path} exceeds the maximum length of {MAX_SERVER_PATH_LENGTH} characters"
        )));
    }
    Ok(())
}

fn too_large(path: &str) -> Error {
    Error::Personality(format!(
        "Contents for {path} exceed the maximum size of {MAX_PERSONALITY_FILE_SIZE} bytes"
    ))
}
