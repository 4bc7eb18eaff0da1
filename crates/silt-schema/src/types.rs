// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The definition model: what a stored type definition says.

use silt_store::{ObjectId, ObjectRef, TypeId};

/// The distinguished meta-type. Every object carrying this TypeId decodes as
/// a [`TypeDefinition`]; the constant is the registry's bootstrap anchor and
/// must never change.
pub const TYPE_DEFINITION_TYPE: TypeId = TypeId(0x5246_5243_5445_0001);

/// Whether an operation needs an instance to be invoked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationScope {
    /// Callable on the type itself, without an instance.
    Class,
    /// Requires an instance.
    Object,
}

/// One field of a defined type.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct FieldDefinition {
    /// Field name, unique within its definition.
    pub name: String,
    /// Type of the field's value.
    pub type_id: TypeId,
    /// Whether a payload must carry this field.
    pub required: bool,
    /// Optional default, as JSON text.
    pub default_json: Option<String>,
}

/// One parameter or output slot of an operation signature.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ParameterDefinition {
    /// Slot name.
    pub name: String,
    /// Type of the slot's value.
    pub type_id: TypeId,
    /// Optional parameters may only follow required ones.
    pub optional: bool,
}

/// An operation's parameter and output slots.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SignatureDefinition {
    /// Input parameters, required before optional.
    pub params: Vec<ParameterDefinition>,
    /// Output slots.
    pub outputs: Vec<ParameterDefinition>,
}

/// One operation of a defined type. Two operations may share a name when
/// their parameter-type tuples differ; dispatch disambiguates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationDefinition {
    /// Operation name.
    pub name: String,
    /// Class- or object-scoped.
    pub scope: OperationScope,
    /// Parameter and output slots.
    pub signature: SignatureDefinition,
}

/// A declared relationship to another type.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct RelationshipSpec {
    /// Role the related objects play.
    pub role: String,
    /// Cardinality label, e.g. `one` or `many`.
    pub cardinality: String,
    /// Name of the target type.
    pub target: String,
}

/// A complete type definition, as stored in a meta-type object payload.
///
/// `supersedes_definition_id` and `migration_hook` are registration inputs,
/// not payload fields: they become edges between definition objects and are
/// absent from records decoded back out of the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDefinition {
    /// The type this definition describes. Nonzero for user types.
    pub type_id: TypeId,
    /// Type name.
    pub name: String,
    /// Namespace the name lives in.
    pub namespace: String,
    /// Definition version; later registrations of the same TypeId win by
    /// the largest version.
    pub version: u64,
    /// Prior definition this one supersedes, if any.
    pub supersedes_definition_id: Option<ObjectId>,
    /// Migration hook label recorded on the supersedes link.
    pub migration_hook: Option<String>,
    /// Type parameters for parametric types, e.g. `["K", "V"]`.
    pub type_params: Vec<String>,
    /// Field layout.
    pub fields: Vec<FieldDefinition>,
    /// Declared operations.
    pub operations: Vec<OperationDefinition>,
    /// Declared relationships.
    pub relationships: Vec<RelationshipSpec>,
    /// Preferred renderer label for viewer routing, if any.
    pub preferred_renderer: Option<String>,
}

impl TypeDefinition {
    /// Builds a minimal definition at version 1.
    pub fn new(type_id: TypeId, name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            type_id,
            name: name.into(),
            namespace: namespace.into(),
            version: 1,
            supersedes_definition_id: None,
            migration_hook: None,
            type_params: Vec::new(),
            fields: Vec::new(),
            operations: Vec::new(),
            relationships: Vec::new(),
            preferred_renderer: None,
        }
    }
}

/// Compact listing entry for a stored definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeSummary {
    /// The defined type.
    pub type_id: TypeId,
    /// Id of the definition object.
    pub definition_id: ObjectId,
    /// Type name.
    pub name: String,
    /// Namespace.
    pub namespace: String,
    /// Preferred renderer label, if any.
    pub preferred_renderer: Option<String>,
}

/// A stored definition together with the object revision holding it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DefinitionRecord {
    /// The store object carrying the definition payload.
    pub object_ref: ObjectRef,
    /// The decoded definition.
    pub definition: TypeDefinition,
}

/// One step backward along a supersedes chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SupersedesLink {
    /// The prior definition.
    pub prior: DefinitionRecord,
    /// Migration hook recorded on the link, if any.
    pub migration_hook: Option<String>,
}
