//! Node and edge table export.
//!
//! Both tables are CSV. Each file is written to a sibling `<name>.tmp`,
//! flushed, synced to disk, then renamed over the destination, so readers
//! never observe a half-written table.
//!
//! Node table: `key,origin,resolved` followed by every observed field name in
//! sorted order; one row per node in creation order. Edge table:
//! `from_key,to_key`; one row per recorded edge, duplicates and dangling
//! targets included.

mod error;

pub use error::ExportError;

use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::graph::GraphStore;

/// Fixed leading columns of the node table.
pub const NODE_KEY_COLUMNS: [&str; 3] = ["key", "origin", "resolved"];

/// Header of the edge table.
pub const EDGE_COLUMNS: [&str; 2] = ["from_key", "to_key"];

/// Destination paths for the two tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    /// Node table path.
    pub nodes: PathBuf,
    /// Edge table path.
    pub edges: PathBuf,
}

impl ExportPaths {
    /// Creates export paths.
    #[must_use]
    pub fn new(nodes: impl Into<PathBuf>, edges: impl Into<PathBuf>) -> Self {
        Self {
            nodes: nodes.into(),
            edges: edges.into(),
        }
    }
}

/// What an export wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Node rows written.
    pub nodes_written: usize,
    /// Edge rows written.
    pub edges_written: usize,
    /// Node table header.
    pub columns: Vec<String>,
}

/// Returns the node table header for `store`.
///
/// Field names that collide with the fixed leading columns are dropped, with
/// a warning for each.
#[must_use]
pub fn node_columns(store: &GraphStore) -> Vec<String> {
    let mut columns: Vec<String> = NODE_KEY_COLUMNS
        .iter()
        .map(|column| (*column).to_string())
        .collect();
    for name in store.field_names() {
        if NODE_KEY_COLUMNS.contains(&name.as_str()) {
            warn!(field = %name, "field name shadows a fixed node column, dropped from export");
            continue;
        }
        columns.push(name.clone());
    }
    columns
}

/// Writes the node and edge tables for `store`.
///
/// # Errors
///
/// Returns [`ExportError`] if either table cannot be written. A table that
/// fails midway leaves any previous file at the destination untouched.
#[instrument(skip(store), fields(nodes = store.len(), edges = store.edges().len()))]
pub fn export_graph(store: &GraphStore, paths: &ExportPaths) -> Result<ExportSummary, ExportError> {
    let columns = node_columns(store);
    let nodes_written =
        write_atomically(&paths.nodes, |writer| write_nodes(store, &columns, writer))?;
    let edges_written = write_atomically(&paths.edges, |writer| write_edges(store, writer))?;

    info!(
        nodes_written,
        edges_written,
        nodes_path = %paths.nodes.display(),
        edges_path = %paths.edges.display(),
        "graph exported"
    );

    Ok(ExportSummary {
        nodes_written,
        edges_written,
        columns,
    })
}

fn write_nodes(
    store: &GraphStore,
    columns: &[String],
    writer: &mut csv::Writer<File>,
) -> Result<usize, csv::Error> {
    writer.write_record(columns)?;
    let field_columns = &columns[NODE_KEY_COLUMNS.len()..];

    let mut rows = 0;
    for node in store.nodes() {
        let resolved = if node.is_resolved() { "true" } else { "false" };
        let mut row = Vec::with_capacity(columns.len());
        row.push(node.key().as_str());
        row.push(node.origin().as_str());
        row.push(resolved);
        row.extend(field_columns.iter().map(|name| node.field(name).unwrap_or("")));
        writer.write_record(&row)?;
        rows += 1;
    }
    Ok(rows)
}

fn write_edges(store: &GraphStore, writer: &mut csv::Writer<File>) -> Result<usize, csv::Error> {
    writer.write_record(EDGE_COLUMNS)?;
    for edge in store.edges() {
        writer.write_record([edge.from.as_str(), edge.to.as_str()])?;
    }
    Ok(store.edges().len())
}

/// Runs `write` against a temporary sibling of `path`, then publishes it.
fn write_atomically<F>(path: &Path, write: F) -> Result<usize, ExportError>
where
    F: FnOnce(&mut csv::Writer<File>) -> Result<usize, csv::Error>,
{
    let tmp_path = temp_path_for(path)?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| ExportError::io(parent, e))?;
    }

    let result = write_and_sync(&tmp_path, write);
    match result {
        Ok(rows) => {
            fs::rename(&tmp_path, path).map_err(|e| {
                let _ = fs::remove_file(&tmp_path);
                ExportError::io(path, e)
            })?;
            debug!(path = %path.display(), rows, "table published");
            Ok(rows)
        }
        Err(error) => {
            let _ = fs::remove_file(&tmp_path);
            Err(error)
        }
    }
}

fn write_and_sync<F>(tmp_path: &Path, write: F) -> Result<usize, ExportError>
where
    F: FnOnce(&mut csv::Writer<File>) -> Result<usize, csv::Error>,
{
    let file = File::create(tmp_path).map_err(|e| ExportError::io(tmp_path, e))?;
    let mut writer = csv::Writer::from_writer(file);
    let rows = write(&mut writer).map_err(|e| ExportError::csv(tmp_path, e))?;
    writer.flush().map_err(|e| ExportError::io(tmp_path, e))?;
    let file = writer
        .into_inner()
        .map_err(|e| ExportError::io(tmp_path, e.into_error()))?;
    file.sync_all().map_err(|e| ExportError::io(tmp_path, e))?;
    Ok(rows)
}

fn temp_path_for(path: &Path) -> Result<PathBuf, ExportError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| ExportError::invalid_path(path))?;
    let mut tmp_name = OsString::from(file_name);
    tmp_name.push(".tmp");
    Ok(path.with_file_name(tmp_name))
}
