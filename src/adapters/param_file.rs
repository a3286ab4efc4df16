//! Parameter-set storage adapters.
//!
//! [`JsonParamFile`] keeps the set in one pretty-printed JSON file and
//! rewrites it whole on every save: the new contents go to a sibling temp
//! file that is then renamed over the existing one, so a crash mid-save leaves
//! the previous set intact.  [`MemoryParamStore`] is the in-process
//! backend for tests.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::app::ports::{ParamStore, StoreError};
use crate::params::HandParams;

pub struct JsonParamFile {
    path: PathBuf,
}

impl JsonParamFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ParamStore for JsonParamFile {
    fn load(&self) -> Result<HandParams, StoreError> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StoreError::NotFound,
            _ => StoreError::Io(format!("{}: {e}", self.path.display())),
        })?;
        let params = HandParams::from_json(&text)?;
        info!(
            "params: loaded {} joint(s) from {}",
            params.joint_count(),
            self.path.display()
        );
        Ok(params)
    }

    fn save(&mut self, params: &HandParams) -> Result<(), StoreError> {
        let text = params.to_json_pretty()?;
        let tmp = self.temp_path();
        std::fs::write(&tmp, text).map_err(|e| StoreError::Io(format!("{}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| StoreError::Io(format!("{}: {e}", self.path.display())))?;
        debug!("params: saved to {}", self.path.display());
        Ok(())
    }
}

/// In-memory store.  `fail_saves` makes every save fail with an I/O error.
#[derive(Debug, Clone, Default)]
pub struct MemoryParamStore {
    params: Option<HandParams>,
    saves: usize,
    pub fail_saves: bool,
}

impl MemoryParamStore {
    pub fn new(params: HandParams) -> Self {
        Self {
            params: Some(params),
            saves: 0,
            fail_saves: false,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Option<&HandParams> {
        self.params.as_ref()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl ParamStore for MemoryParamStore {
    fn load(&self) -> Result<HandParams, StoreError> {
        self.params.clone().ok_or(StoreError::NotFound)
    }

    fn save(&mut self, params: &HandParams) -> Result<(), StoreError> {
        if self.fail_saves {
            return Err(StoreError::Io("save disabled".into()));
        }
        self.params = Some(params.clone());
        self.saves += 1;
        Ok(())
    }
}
