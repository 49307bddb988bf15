// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The App Locator (spec §4.2): resolves `(slug, app_number)` to a source
//! directory and, when present, a port binding. No synthetic port fallback —
//! absence is surfaced as an explicit `no_ports` error, never a guess.

use orch_core::{normalize, variants, Error, PortBinding};
use std::path::{Path, PathBuf};

/// What the locator found for one `(model, app_number)` pair.
#[derive(Debug, Clone)]
pub struct LocatedApp {
    pub source_dir: PathBuf,
    pub ports: Option<PortBinding>,
}

/// Resolves target apps against a directory tree. Implementations may read
/// variants of the canonical slug for tolerance but must never write under
/// anything but the canonical form.
pub trait AppLocator: Send + Sync {
    fn locate(&self, model: &str, app_number: u32) -> Result<LocatedApp, Error>;
}

/// Filesystem-backed locator: `<apps_root>/<slug-variant>/app<N>/`, with an
/// optional `ports.json` (`{"backend_port": u16, "frontend_port": u16}`)
/// inside that directory.
pub struct FilesystemLocator {
    apps_root: PathBuf,
}

impl FilesystemLocator {
    pub fn new(apps_root: impl Into<PathBuf>) -> Self {
        Self { apps_root: apps_root.into() }
    }

    fn candidate_dirs(&self, model: &str, app_number: u32) -> Vec<PathBuf> {
        let canonical = normalize(model);
        variants(&canonical)
            .into_iter()
            .map(|variant| self.apps_root.join(variant).join(format!("app{app_number}")))
            .collect()
    }

    fn read_ports(dir: &Path) -> Option<PortBinding> {
        let bytes = std::fs::read(dir.join("ports.json")).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

impl AppLocator for FilesystemLocator {
    fn locate(&self, model: &str, app_number: u32) -> Result<LocatedApp, Error> {
        let dir = self
            .candidate_dirs(model, app_number)
            .into_iter()
            .find(|dir| dir.is_dir())
            .ok_or_else(|| Error::not_found(format!("app does not exist: {model} app{app_number}")))?;

        Ok(LocatedApp { ports: Self::read_ports(&dir), source_dir: dir })
    }
}

#[cfg(test)]
#[path = "locator_tests.rs"]
mod tests;
