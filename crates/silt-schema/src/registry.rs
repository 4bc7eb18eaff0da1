// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The schema registry: definitions in, definitions out, evolution as edges.

use silt_store::{ObjectId, ObjectRecord, SegmentStore, TypeId};
use tracing::debug;

use crate::codec::{decode_definition, encode_definition, migration_hook_from_props};
use crate::error::SchemaError;
use crate::types::{
    DefinitionRecord, SupersedesLink, TypeDefinition, TypeSummary, TYPE_DEFINITION_TYPE,
};

/// Reflective schema registry over a borrowed store.
///
/// The registry owns no records; it interprets objects of the meta-type and
/// appends new ones. Registration writes the definition payload and, for a
/// superseding definition, `supersedes` / `migration_hook` edges from the
/// new definition's ref to the prior one's.
pub struct SchemaRegistry<'s> {
    store: &'s mut SegmentStore,
}

impl<'s> SchemaRegistry<'s> {
    /// Borrows a store for registry operations.
    pub fn new(store: &'s mut SegmentStore) -> Self {
        Self { store }
    }

    /// Registers a definition under a fresh random definition id.
    pub fn register_definition(
        &mut self,
        def: &TypeDefinition,
    ) -> Result<DefinitionRecord, SchemaError> {
        self.register_with(def, ObjectId::random())
    }

    /// Registers a definition under a caller-supplied id. Bootstrap derives
    /// definition ids deterministically from the TypeId and needs this.
    pub fn register_definition_with_id(
        &mut self,
        def: &TypeDefinition,
        definition_id: ObjectId,
    ) -> Result<DefinitionRecord, SchemaError> {
        self.register_with(def, definition_id)
    }

    fn register_with(
        &mut self,
        def: &TypeDefinition,
        definition_id: ObjectId,
    ) -> Result<DefinitionRecord, SchemaError> {
        if def.name.is_empty() {
            return Err(SchemaError::InvalidDefinition("definition name is empty".into()));
        }
        if def.type_id.0 == 0 {
            return Err(SchemaError::InvalidDefinition("type_id is zero".into()));
        }
        if def.migration_hook.is_some() && def.supersedes_definition_id.is_none() {
            return Err(SchemaError::InvalidDefinition(
                "migration_hook requires supersedes_definition_id".into(),
            ));
        }

        let prior = match def.supersedes_definition_id {
            Some(prior_id) => {
                let prior = self.store.get_latest(prior_id)?.ok_or_else(|| {
                    SchemaError::InvalidDefinition("supersedes definition not found".into())
                })?;
                Some(prior)
            }
            None => None,
        };

        let payload = encode_definition(def)?;
        let record = self.store.create_object_with_id(
            definition_id,
            TYPE_DEFINITION_TYPE,
            definition_id,
            payload,
        )?;

        if let Some(prior) = prior {
            self.store.add_edge(
                record.object_ref,
                prior.object_ref,
                "supersedes",
                "definition",
                Vec::new(),
            )?;
            if let Some(hook) = &def.migration_hook {
                let props = silt_store::cbor_kv("hook", hook)?;
                self.store.add_edge(
                    record.object_ref,
                    prior.object_ref,
                    "migration_hook",
                    "definition",
                    props,
                )?;
            }
        }

        debug!(
            type_id = %def.type_id,
            name = %def.name,
            version = def.version,
            "definition registered"
        );
        record_from_object(&record)
    }

    /// Returns the decoded definition stored under `id`, or `None`. An
    /// object at `id` that is not of the meta-type is
    /// [`SchemaError::NotADefinition`].
    pub fn get_definition_by_id(
        &self,
        id: ObjectId,
    ) -> Result<Option<DefinitionRecord>, SchemaError> {
        let Some(record) = self.store.get_latest(id)? else {
            return Ok(None);
        };
        if record.type_id != TYPE_DEFINITION_TYPE {
            return Err(SchemaError::NotADefinition);
        }
        record_from_object(&record).map(Some)
    }

    /// Returns the first stored definition for `type_id`, in insertion
    /// order, or `None`.
    pub fn get_definition_by_type(
        &self,
        type_id: TypeId,
    ) -> Result<Option<DefinitionRecord>, SchemaError> {
        for record in self.store.list_by_type(TYPE_DEFINITION_TYPE)? {
            let decoded = record_from_object(&record)?;
            if decoded.definition.type_id == type_id {
                return Ok(Some(decoded));
            }
        }
        Ok(None)
    }

    /// Returns the definition for `type_id` with the largest version, or
    /// `None`. Version ties resolve to the earliest insertion.
    pub fn get_latest_definition_by_type(
        &self,
        type_id: TypeId,
    ) -> Result<Option<DefinitionRecord>, SchemaError> {
        let mut latest: Option<DefinitionRecord> = None;
        for record in self.store.list_by_type(TYPE_DEFINITION_TYPE)? {
            let decoded = record_from_object(&record)?;
            if decoded.definition.type_id != type_id {
                continue;
            }
            let newer = latest
                .as_ref()
                .is_none_or(|seen| decoded.definition.version > seen.definition.version);
            if newer {
                latest = Some(decoded);
            }
        }
        Ok(latest)
    }

    /// Lists a summary of every stored definition, in insertion order.
    pub fn list_types(&self) -> Result<Vec<TypeSummary>, SchemaError> {
        let mut out = Vec::new();
        for record in self.store.list_by_type(TYPE_DEFINITION_TYPE)? {
            let decoded = record_from_object(&record)?;
            out.push(TypeSummary {
                type_id: decoded.definition.type_id,
                definition_id: decoded.object_ref.id,
                name: decoded.definition.name,
                namespace: decoded.definition.namespace,
                preferred_renderer: decoded.definition.preferred_renderer,
            });
        }
        Ok(out)
    }

    /// Walks `supersedes` edges backward from the definition at
    /// `definition_id`, collecting each prior definition and the migration
    /// hook recorded on its link.
    ///
    /// More than one outgoing `supersedes` edge, or more than one migration
    /// hook to the same prior, is [`SchemaError::CorruptChain`].
    pub fn list_supersedes_chain(
        &self,
        definition_id: ObjectId,
    ) -> Result<Vec<SupersedesLink>, SchemaError> {
        let mut current: ObjectRecord = self
            .store
            .get_latest(definition_id)?
            .ok_or(SchemaError::DefinitionNotFound)?;
        if current.type_id != TYPE_DEFINITION_TYPE {
            return Err(SchemaError::NotADefinition);
        }

        let mut chain = Vec::new();
        loop {
            let edges =
                self.store
                    .edges_from(current.object_ref, Some("supersedes"), Some("definition"))?;
            let Some(edge) = edges.first() else {
                break;
            };
            if edges.len() > 1 {
                return Err(SchemaError::CorruptChain(
                    "multiple supersedes edges found".into(),
                ));
            }

            let prior = self
                .store
                .get_object(edge.to)?
                .ok_or(SchemaError::DefinitionNotFound)?;
            if prior.type_id != TYPE_DEFINITION_TYPE {
                return Err(SchemaError::NotADefinition);
            }

            let mut link = SupersedesLink {
                prior: record_from_object(&prior)?,
                migration_hook: None,
            };
            let hook_edges = self.store.edges_from(
                current.object_ref,
                Some("migration_hook"),
                Some("definition"),
            )?;
            for hook_edge in hook_edges {
                if hook_edge.to != edge.to {
                    continue;
                }
                if link.migration_hook.is_some() {
                    return Err(SchemaError::CorruptChain(
                        "multiple migration hooks found".into(),
                    ));
                }
                link.migration_hook = migration_hook_from_props(&hook_edge.props)?;
            }

            chain.push(link);
            current = prior;
        }
        Ok(chain)
    }
}

fn record_from_object(record: &ObjectRecord) -> Result<DefinitionRecord, SchemaError> {
    Ok(DefinitionRecord {
        object_ref: record.object_ref,
        definition: decode_definition(&record.payload)?,
    })
}
