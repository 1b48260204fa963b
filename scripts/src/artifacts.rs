//! Loading of contract creation bytecode from compilation artifacts.
//!
//! Both hardhat (`artifacts/contracts/<File>.sol/<Name>.json`, `bytecode` is a
//! hex string) and foundry (`out/<File>.sol/<Name>.json`, `bytecode.object`)
//! layouts are understood.

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use alloy_primitives::Bytes;
use serde_json::Value;
use tracing::debug;

use crate::{
    constants::{ARTIFACT_EXTENSION, DEBUG_ARTIFACT_SUFFIX},
    errors::ScriptError,
};

/// A directory of compilation artifacts, searched recursively by contract name
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    /// The root of the artifacts tree
    root: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The creation bytecode of the named contract
    pub fn bytecode(&self, contract: &str) -> Result<Bytes, ScriptError> {
        let path = self.find(contract)?;
        debug!("loading {} bytecode from {}", contract, path.display());

        let contents =
            fs::read_to_string(&path).map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;
        let json: Value = serde_json::from_str(&contents)
            .map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;

        let bytecode_hex = match &json["bytecode"] {
            Value::String(s) => s.as_str(),
            Value::Object(obj) => obj.get("object").and_then(Value::as_str).unwrap_or_default(),
            _ => "",
        };

        let bytecode = Bytes::from_str(bytecode_hex)
            .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {}", contract, e)))?;
        if bytecode.is_empty() {
            return Err(ScriptError::ArtifactParsing(format!(
                "{} has no creation bytecode (abstract contract or interface?)",
                contract
            )));
        }

        Ok(bytecode)
    }

    /// Locate `<contract>.json` anywhere below the root
    fn find(&self, contract: &str) -> Result<PathBuf, ScriptError> {
        let file_name = format!("{}.{}", contract, ARTIFACT_EXTENSION);
        find_file(&self.root, &file_name)?.ok_or_else(|| {
            ScriptError::ArtifactParsing(format!(
                "no artifact named {} under {}",
                file_name,
                self.root.display()
            ))
        })
    }
}

/// Depth-first search for a file with the given name, skipping debug artifacts
fn find_file(dir: &Path, file_name: &str) -> Result<Option<PathBuf>, ScriptError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {}", dir.display(), e)))?;

    let mut subdirs = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?
            .path();
        if path.is_dir() {
            subdirs.push(path);
            continue;
        }

        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if name == file_name && !name.ends_with(DEBUG_ARTIFACT_SUFFIX) {
            return Ok(Some(path));
        }
    }

    subdirs.sort();
    for subdir in subdirs {
        if let Some(path) = find_file(&subdir, file_name)? {
            return Ok(Some(path));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: PathBuf, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_hardhat_layout() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path().join("contracts/Vault.sol/Vault.json"),
            r#"{"contractName": "Vault", "bytecode": "0x6080604052"}"#,
        );
        write(
            dir.path().join("contracts/Vault.sol/Vault.dbg.json"),
            r#"{"buildInfo": "../../build-info/abc.json"}"#,
        );

        let store = ArtifactStore::new(dir.path());
        assert_eq!(
            store.bytecode("Vault").unwrap(),
            Bytes::from_static(&[0x60, 0x80, 0x60, 0x40, 0x52])
        );
    }

    #[test]
    fn test_foundry_layout() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path().join("out/Pool.sol/Pool.json"),
            r#"{"bytecode": {"object": "0x6001", "linkReferences": {}}}"#,
        );

        let store = ArtifactStore::new(dir.path());
        assert_eq!(
            store.bytecode("Pool").unwrap(),
            Bytes::from_static(&[0x60, 0x01])
        );
    }

    #[test]
    fn test_interface_has_no_bytecode() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path().join("IPool.sol/IPool.json"),
            r#"{"bytecode": "0x"}"#,
        );

        let store = ArtifactStore::new(dir.path());
        assert!(matches!(
            store.bytecode("IPool"),
            Err(ScriptError::ArtifactParsing(_))
        ));
        assert!(matches!(
            store.bytecode("Missing"),
            Err(ScriptError::ArtifactParsing(_))
        ));
    }
}
