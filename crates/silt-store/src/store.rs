// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The append-only segment store.
//!
//! Two segment files (objects, edges) live under `<path>.segments/segments/`;
//! four text index side-files under `<path>.segments/indexes/` record
//! `key<TAB>offset` lines as frames land. [`SegmentStore::open`] rebuilds the
//! in-memory maps by a full forward scan of both segments; a torn trailing
//! record is truncated away so later appends extend a clean log.
//!
//! Point lookups are O(1) against the in-memory maps; type and edge scans
//! return records in insertion order. Sorting by creation time, when a caller
//! wants it, happens in the query path; segment offset is the ordering key,
//! not the wall clock.

use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::ident::{now_ms, ObjectId, ObjectRef, TypeId};
use crate::record::{EdgeRecord, ObjectRecord};
use crate::segment::{
    encode_edge_frame, encode_object_frame, scan_edge_segment, scan_object_segment,
};

/// Special path selecting the in-memory mode: all disk I/O is elided and the
/// store lives purely in its maps (and vanishes on `close`).
pub const MEMORY_PATH: &str = ":memory:";

/// Store configuration.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Database path, e.g. `state/main.db`, or [`MEMORY_PATH`].
    pub path: PathBuf,
}

impl StoreConfig {
    /// Builds a config for the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Builds the in-memory configuration.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MEMORY_PATH)
    }
}

struct DiskFiles {
    objects: File,
    edges: File,
    idx_objects_by_id: File,
    idx_objects_by_type: File,
    idx_edges_from: File,
    idx_edges_to: File,
}

#[derive(Clone, Debug)]
enum Staged {
    Object(ObjectRecord),
    Edge(EdgeRecord),
}

/// Append-only store of typed immutable objects and typed directed edges.
///
/// Single-writer: every mutation happens on the caller's stack. At most one
/// transaction may be open per handle.
pub struct SegmentStore {
    config: StoreConfig,
    in_memory: bool,
    is_open: bool,
    files: Option<DiskFiles>,
    objects_len: u64,
    edges_len: u64,

    objects: FxHashMap<ObjectRef, ObjectRecord>,
    latest: FxHashMap<ObjectId, u64>,
    by_type: FxHashMap<TypeId, Vec<ObjectRef>>,
    edges: Vec<EdgeRecord>,
    edges_from: FxHashMap<ObjectRef, Vec<usize>>,
    edges_to: FxHashMap<ObjectRef, Vec<usize>>,

    txn: Option<Vec<Staged>>,
}

impl SegmentStore {
    /// Creates a closed store handle for `config`. Call [`open`](Self::open)
    /// before use.
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        let in_memory = config.path.as_os_str() == MEMORY_PATH;
        Self {
            config,
            in_memory,
            is_open: false,
            files: None,
            objects_len: 0,
            edges_len: 0,
            objects: FxHashMap::default(),
            latest: FxHashMap::default(),
            by_type: FxHashMap::default(),
            edges: Vec::new(),
            edges_from: FxHashMap::default(),
            edges_to: FxHashMap::default(),
            txn: None,
        }
    }

    /// Convenience constructor for the in-memory mode.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(StoreConfig::in_memory())
    }

    fn root_dir(&self) -> PathBuf {
        let mut os = self.config.path.clone().into_os_string();
        os.push(".segments");
        PathBuf::from(os)
    }

    /// Opens the store, creating directories and segment files as needed and
    /// rebuilding the in-memory indexes by a full forward scan. Idempotent.
    pub fn open(&mut self) -> Result<(), StoreError> {
        if self.is_open {
            return Ok(());
        }
        self.clear_state();

        if self.in_memory {
            self.is_open = true;
            debug!("segment store opened in memory");
            return Ok(());
        }

        let root = self.root_dir();
        let segments_dir = root.join("segments");
        let indexes_dir = root.join("indexes");
        create_dir_all(&segments_dir)?;
        create_dir_all(&indexes_dir)?;

        let objects = open_append(&segments_dir.join("objects.seg"))?;
        let edges = open_append(&segments_dir.join("edges.seg"))?;

        let object_scan = {
            let mut cursor = &objects;
            cursor.seek(SeekFrom::Start(0))?;
            scan_object_segment(&mut BufReader::new(cursor))?
        };
        let edge_scan = {
            let mut cursor = &edges;
            cursor.seek(SeekFrom::Start(0))?;
            scan_edge_segment(&mut BufReader::new(cursor))?
        };

        // Drop any torn tail so future appends extend a clean log.
        objects.set_len(object_scan.valid_end)?;
        edges.set_len(edge_scan.valid_end)?;
        self.objects_len = object_scan.valid_end;
        self.edges_len = edge_scan.valid_end;

        self.files = Some(DiskFiles {
            objects,
            edges,
            idx_objects_by_id: open_append(&indexes_dir.join("objects_by_id.idx"))?,
            idx_objects_by_type: open_append(&indexes_dir.join("objects_by_type.idx"))?,
            idx_edges_from: open_append(&indexes_dir.join("edges_from.idx"))?,
            idx_edges_to: open_append(&indexes_dir.join("edges_to.idx"))?,
        });

        let object_count = object_scan.records.len();
        let edge_count = edge_scan.records.len();
        for (_, record) in object_scan.records {
            self.index_object(record)?;
        }
        for (_, record) in edge_scan.records {
            self.index_edge(record);
        }

        self.is_open = true;
        info!(
            path = %self.config.path.display(),
            objects = object_count,
            edges = edge_count,
            "segment store opened"
        );
        Ok(())
    }

    /// Flushes and releases file handles. In-memory stores forget their
    /// contents. Idempotent.
    pub fn close(&mut self) -> Result<(), StoreError> {
        if !self.is_open {
            return Ok(());
        }
        if let Some(files) = self.files.take() {
            files.objects.sync_all()?;
            files.edges.sync_all()?;
        }
        self.clear_state();
        self.is_open = false;
        debug!("segment store closed");
        Ok(())
    }

    fn clear_state(&mut self) {
        self.objects.clear();
        self.latest.clear();
        self.by_type.clear();
        self.edges.clear();
        self.edges_from.clear();
        self.edges_to.clear();
        self.objects_len = 0;
        self.edges_len = 0;
        self.files = None;
        self.txn = None;
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.is_open {
            Ok(())
        } else {
            Err(StoreError::NotOpen)
        }
    }

    // ── Transactions ────────────────────────────────────────────────

    /// Opens a transaction on this handle. Staged appends are invisible to
    /// reads until [`commit`](Self::commit).
    pub fn begin(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        if self.txn.is_some() {
            return Err(StoreError::TxnAlreadyOpen);
        }
        self.txn = Some(Vec::new());
        Ok(())
    }

    /// Replays staged appends in FIFO order. On a failing append the error
    /// is returned immediately; already-applied appends stay applied and the
    /// rest stay staged. The caller decides whether to `rollback`.
    pub fn commit(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        let staged = self.txn.take().ok_or(StoreError::TxnNotOpen)?;
        let count = staged.len();
        let mut queue = staged.into_iter();
        while let Some(item) = queue.next() {
            let applied = match &item {
                Staged::Object(record) => self.apply_object(record),
                Staged::Edge(record) => self.apply_edge(record),
            };
            if let Err(err) = applied {
                let mut remaining = vec![item];
                remaining.extend(queue);
                self.txn = Some(remaining);
                return Err(err);
            }
        }
        debug!(appends = count, "transaction committed");
        Ok(())
    }

    /// Discards all staged appends.
    pub fn rollback(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.txn.take().ok_or(StoreError::TxnNotOpen)?;
        Ok(())
    }

    // ── Objects ─────────────────────────────────────────────────────

    /// Appends a fresh object with a random id at version 1.
    pub fn create_object(
        &mut self,
        type_id: TypeId,
        definition_id: ObjectId,
        payload: Vec<u8>,
    ) -> Result<ObjectRecord, StoreError> {
        self.create_object_with_id(ObjectId::random(), type_id, definition_id, payload)
    }

    /// Appends an object with a caller-chosen id at version 1. Needed by
    /// registries that derive deterministic definition ids.
    pub fn create_object_with_id(
        &mut self,
        object_id: ObjectId,
        type_id: TypeId,
        definition_id: ObjectId,
        payload: Vec<u8>,
    ) -> Result<ObjectRecord, StoreError> {
        self.ensure_open()?;
        let record = ObjectRecord {
            object_ref: ObjectRef::new(object_id, 1),
            type_id,
            definition_id,
            payload,
            created_at_ms: now_ms(),
        };
        if self.objects.contains_key(&record.object_ref) || self.staged_object(record.object_ref) {
            return Err(StoreError::DuplicateObject {
                id: object_id,
                version: record.object_ref.version.0,
            });
        }
        if let Some(staged) = self.txn.as_mut() {
            staged.push(Staged::Object(record.clone()));
            return Ok(record);
        }
        self.apply_object(&record)?;
        Ok(record)
    }

    /// Returns the record at exactly this revision, if present.
    pub fn get_object(&self, object_ref: ObjectRef) -> Result<Option<ObjectRecord>, StoreError> {
        self.ensure_open()?;
        Ok(self.objects.get(&object_ref).cloned())
    }

    /// Returns the highest-version record for this id, if present.
    pub fn get_latest(&self, id: ObjectId) -> Result<Option<ObjectRecord>, StoreError> {
        self.ensure_open()?;
        let Some(version) = self.latest.get(&id) else {
            return Ok(None);
        };
        Ok(self.objects.get(&ObjectRef::new(id, *version)).cloned())
    }

    /// Returns all records of this type in insertion order.
    pub fn list_by_type(&self, type_id: TypeId) -> Result<Vec<ObjectRecord>, StoreError> {
        self.ensure_open()?;
        let refs = self.by_type.get(&type_id).map_or(&[][..], Vec::as_slice);
        Ok(refs
            .iter()
            .filter_map(|object_ref| self.objects.get(object_ref).cloned())
            .collect())
    }

    /// Number of committed object records.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    // ── Edges ───────────────────────────────────────────────────────

    /// Appends a directed edge. Endpoints are not validated against the
    /// object index: edges to arbitrary refs (including dangling ones) are
    /// accepted.
    pub fn add_edge(
        &mut self,
        from: ObjectRef,
        to: ObjectRef,
        name: impl Into<String>,
        role: impl Into<String>,
        props: Vec<u8>,
    ) -> Result<(), StoreError> {
        self.ensure_open()?;
        let record = EdgeRecord {
            from,
            to,
            name: name.into(),
            role: role.into(),
            props,
            created_at_ms: now_ms(),
        };
        if let Some(staged) = self.txn.as_mut() {
            staged.push(Staged::Edge(record));
            return Ok(());
        }
        self.apply_edge(&record)
    }

    /// Returns edges whose source matches `from`, optionally filtered by
    /// name and role, in insertion order.
    pub fn edges_from(
        &self,
        from: ObjectRef,
        name: Option<&str>,
        role: Option<&str>,
    ) -> Result<Vec<EdgeRecord>, StoreError> {
        self.ensure_open()?;
        Ok(self.filter_edges(self.edges_from.get(&from).map(Vec::as_slice), name, role))
    }

    /// Returns edges whose destination matches `to`, optionally filtered by
    /// name and role, in insertion order.
    pub fn edges_to(
        &self,
        to: ObjectRef,
        name: Option<&str>,
        role: Option<&str>,
    ) -> Result<Vec<EdgeRecord>, StoreError> {
        self.ensure_open()?;
        Ok(self.filter_edges(self.edges_to.get(&to).map(Vec::as_slice), name, role))
    }

    /// Number of committed edge records.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    // ── Internals ───────────────────────────────────────────────────

    fn staged_object(&self, object_ref: ObjectRef) -> bool {
        self.txn.as_ref().is_some_and(|staged| {
            staged.iter().any(|item| match item {
                Staged::Object(record) => record.object_ref == object_ref,
                Staged::Edge(_) => false,
            })
        })
    }

    fn filter_edges(
        &self,
        indices: Option<&[usize]>,
        name: Option<&str>,
        role: Option<&str>,
    ) -> Vec<EdgeRecord> {
        indices.map_or_else(Vec::new, |hits| {
            hits.iter()
                .filter_map(|index| self.edges.get(*index))
                .filter(|edge| name.is_none_or(|wanted| edge.name == wanted))
                .filter(|edge| role.is_none_or(|wanted| edge.role == wanted))
                .cloned()
                .collect()
        })
    }

    fn apply_object(&mut self, record: &ObjectRecord) -> Result<(), StoreError> {
        if self.objects.contains_key(&record.object_ref) {
            return Err(StoreError::DuplicateObject {
                id: record.object_ref.id,
                version: record.object_ref.version.0,
            });
        }
        if let Some(files) = self.files.as_mut() {
            let frame = encode_object_frame(record)?;
            files.objects.write_all(&frame)?;
            let offset = self.objects_len;
            let id_key = format!(
                "{}:{}",
                record.object_ref.id.to_hex(),
                record.object_ref.version.0
            );
            append_index_line(&mut files.idx_objects_by_id, &id_key, offset)?;
            let type_key = format!("{}:{}", record.type_id.0, id_key);
            append_index_line(&mut files.idx_objects_by_type, &type_key, offset)?;
            self.objects_len += frame.len() as u64;
        }
        self.index_object(record.clone())
    }

    fn index_object(&mut self, record: ObjectRecord) -> Result<(), StoreError> {
        let object_ref = record.object_ref;
        if self.objects.contains_key(&object_ref) {
            return Err(StoreError::DuplicateObject {
                id: object_ref.id,
                version: object_ref.version.0,
            });
        }
        self.by_type.entry(record.type_id).or_default().push(object_ref);
        let slot = self.latest.entry(object_ref.id).or_insert(0);
        if object_ref.version.0 > *slot {
            *slot = object_ref.version.0;
        }
        self.objects.insert(object_ref, record);
        Ok(())
    }

    fn apply_edge(&mut self, record: &EdgeRecord) -> Result<(), StoreError> {
        if let Some(files) = self.files.as_mut() {
            let frame = encode_edge_frame(record)?;
            files.edges.write_all(&frame)?;
            let offset = self.edges_len;
            let from_key = format!(
                "{}:{}:{}:{}:{}:{}",
                record.from.id.to_hex(),
                record.from.version.0,
                record.name,
                record.role,
                record.to.id.to_hex(),
                record.to.version.0
            );
            append_index_line(&mut files.idx_edges_from, &from_key, offset)?;
            let to_key = format!(
                "{}:{}:{}:{}:{}:{}",
                record.to.id.to_hex(),
                record.to.version.0,
                record.name,
                record.role,
                record.from.id.to_hex(),
                record.from.version.0
            );
            append_index_line(&mut files.idx_edges_to, &to_key, offset)?;
            self.edges_len += frame.len() as u64;
        }
        self.index_edge(record.clone());
        Ok(())
    }

    fn index_edge(&mut self, record: EdgeRecord) {
        let index = self.edges.len();
        self.edges_from.entry(record.from).or_default().push(index);
        self.edges_to.entry(record.to).or_default().push(index);
        self.edges.push(record);
    }
}

fn open_append(path: &Path) -> Result<File, StoreError> {
    Ok(OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)?)
}

fn append_index_line(file: &mut File, key: &str, offset: u64) -> Result<(), StoreError> {
    file.write_all(format!("{key}\t{offset}\n").as_bytes())?;
    Ok(())
}
