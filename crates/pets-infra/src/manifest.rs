use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ManifestError;

#[derive(Debug, Deserialize)]
struct Manifest {
    metadata: Option<Metadata>,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    name: Option<String>,
}

/// Reads `metadata.name` out of a kubernetes manifest
pub fn read_manifest_name(path: &Path) -> Result<String, ManifestError> {
    let contents = fs::read_to_string(path).map_err(|err| ManifestError::Read {
        path: path.to_path_buf(),
        err,
    })?;
    let manifest: Manifest = serde_yaml::from_str(&contents).map_err(|err| ManifestError::Parse {
        path: path.to_path_buf(),
        err,
    })?;

    manifest
        .metadata
        .and_then(|metadata| metadata.name)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ManifestError::MissingName {
            path: path.to_path_buf(),
        })
}
