use std::path::Path;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use serde::{Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};

use crate::{
    errors::ShuffleError,
    types::{Bundle, BundleTableRow, TrackId},
};

pub fn generate_code_verifier() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(128)
        .map(char::from)
        .collect()
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Parses a list of track ids or `spotify:track:` URIs, failing on the first
/// invalid entry.
pub fn parse_track_ids<S: AsRef<str>>(raw: &[S]) -> Result<Vec<TrackId>, ShuffleError> {
    raw.iter().map(TrackId::new).collect()
}

pub fn bundle_table_rows(bundles: &[Bundle]) -> Vec<BundleTableRow> {
    let mut rows: Vec<BundleTableRow> = bundles
        .iter()
        .map(|b| BundleTableRow {
            id: b.id,
            intro: b.intro.to_string(),
            main: b.main.to_string(),
            strict: b.strict,
        })
        .collect();
    rows.sort_by_key(|r| r.id);
    rows
}

/// Reads a JSON document, `Ok(None)` when the file does not exist yet.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ShuffleError> {
    match async_fs::read_to_string(path).await {
        Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Writes a JSON document through a sibling temp file and a rename, so
/// readers never observe a half-written file.
pub async fn persist_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ShuffleError> {
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    async_fs::write(&tmp, json).await?;
    async_fs::rename(&tmp, path).await?;
    Ok(())
}
