// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server configuration and catalog loading.

use rig_core::{StaticCatalog, TestCase, TestSuite};
use rig_engine::EngineConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid catalog: {0}")]
    Catalog(#[from] serde_json::Error),
}

/// `rigd` configuration, loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Directory for the store snapshot.
    pub data_dir: PathBuf,
    /// Optional JSON file seeding the in-memory artifact catalog.
    pub catalog_path: Option<PathBuf>,
    pub engine: EngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            data_dir: PathBuf::from("./data"),
            catalog_path: None,
            engine: EngineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from a TOML file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                Ok(toml::from_str(&raw)?)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("rig.snapshot")
    }
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    test_cases: Vec<TestCase>,
    #[serde(default)]
    test_suites: Vec<TestSuite>,
}

/// Build the artifact catalog, seeded from the configured JSON file
/// when present.
pub fn load_catalog(path: Option<&Path>) -> Result<StaticCatalog, ConfigError> {
    let catalog = StaticCatalog::new();
    let Some(path) = path else {
        return Ok(catalog);
    };
    let raw = std::fs::read_to_string(path)?;
    let file: CatalogFile = serde_json::from_str(&raw)?;
    let (cases, suites) = (file.test_cases.len(), file.test_suites.len());
    for case in file.test_cases {
        catalog.insert_case(case);
    }
    for suite in file.test_suites {
        catalog.insert_suite(suite);
    }
    tracing::info!(cases, suites, path = %path.display(), "artifact catalog loaded");
    Ok(catalog)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
