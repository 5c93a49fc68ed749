//! Store initialization.
//!
//! `neo init` creates the `.matrix/` directory structure:
//!
//! ```text
//! .matrix/
//! ├── matrix.toml            # Models and gate overrides
//! ├── tickets/
//! │   ├── index.json         # Id counter, creation order, status cache
//! │   └── reservations.json  # File reservation table
//! └── construct/             # Generated pipeline plan
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::MatrixToml;
use crate::persist::{StoreLayout, WriteBatch};
use crate::reservation::ReservationTable;
use crate::ticket::TicketIndex;

/// Result of initializing a store.
#[derive(Debug)]
pub struct InitResult {
    /// Path to the store directory
    pub matrix_dir: PathBuf,
    /// Whether the directory was newly created (false if it already existed)
    pub created: bool,
    /// Documents written because they were missing
    pub written: Vec<PathBuf>,
}

/// Initialize a store at `matrix_dir`.
///
/// Running it again on an existing store only fills in missing pieces;
/// existing documents are never touched.
pub fn init_store(matrix_dir: &Path) -> Result<InitResult> {
    let created = !matrix_dir.exists();
    let layout = StoreLayout::new(matrix_dir);

    for dir in [layout.tickets_dir(), layout.construct_dir()] {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }

    let mut written = Vec::new();
    let mut batch = WriteBatch::new();
    if !layout.index_path().exists() {
        batch.stage(layout.index_path(), &TicketIndex::default())?;
        written.push(layout.index_path());
    }
    if !layout.reservations_path().exists() {
        batch.stage(layout.reservations_path(), &ReservationTable::default())?;
        written.push(layout.reservations_path());
    }
    batch.commit().context("Failed to write initial store documents")?;

    let config_path = layout.config_path();
    if !config_path.exists() {
        std::fs::write(&config_path, MatrixToml::template())
            .with_context(|| format!("Failed to create {}", config_path.display()))?;
        written.push(config_path);
    }

    Ok(InitResult {
        matrix_dir: matrix_dir.to_path_buf(),
        created,
        written,
    })
}

/// Whether a store exists at `matrix_dir`.
pub fn is_initialized(matrix_dir: &Path) -> bool {
    StoreLayout::new(matrix_dir).index_path().exists()
}
