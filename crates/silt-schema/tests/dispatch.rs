// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Dispatch suite: listing, overloads, inheritance, tie-breaking.
#![allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]

use silt_schema::{
    DispatchEngine, NoInheritance, OperationDefinition, OperationRegistry, OperationScope,
    ParameterDefinition, SchemaError, SchemaRegistry, SignatureDefinition, TypeDefinition,
};
use silt_store::{SegmentStore, TypeId};

const BASE: TypeId = TypeId(0xB00);
const DERIVED: TypeId = TypeId(0xD00);
const OVERLOADS: TypeId = TypeId(0x0F0);
const ARG_A: TypeId = TypeId(0x1001);
const ARG_B: TypeId = TypeId(0x1002);

fn op(name: &str, scope: OperationScope, params: &[(TypeId, bool)]) -> OperationDefinition {
    OperationDefinition {
        name: name.into(),
        scope,
        signature: SignatureDefinition {
            params: params
                .iter()
                .enumerate()
                .map(|(index, (type_id, optional))| ParameterDefinition {
                    name: format!("p{index}"),
                    type_id: *type_id,
                    optional: *optional,
                })
                .collect(),
            outputs: Vec::new(),
        },
    }
}

fn seed_registry(store: &mut SegmentStore) {
    let mut registry = SchemaRegistry::new(store);

    let mut base = TypeDefinition::new(BASE, "Base", "Demo");
    base.operations
        .push(op("op", OperationScope::Object, &[(ARG_A, false)]));
    base.operations
        .push(op("describe", OperationScope::Class, &[]));
    registry.register_definition(&base).unwrap();

    let mut derived = TypeDefinition::new(DERIVED, "Derived", "Demo");
    derived
        .operations
        .push(op("op", OperationScope::Object, &[(ARG_A, false)]));
    registry.register_definition(&derived).unwrap();

    let mut overloads = TypeDefinition::new(OVERLOADS, "Overloads", "Demo");
    overloads
        .operations
        .push(op("op", OperationScope::Object, &[(ARG_A, false)]));
    overloads
        .operations
        .push(op("op", OperationScope::Object, &[(ARG_B, false)]));
    registry.register_definition(&overloads).unwrap();
}

fn derived_to_base(type_id: TypeId) -> Vec<TypeId> {
    if type_id == DERIVED {
        vec![BASE]
    } else {
        Vec::new()
    }
}

fn open_seeded() -> SegmentStore {
    let mut store = SegmentStore::in_memory();
    store.open().unwrap();
    seed_registry(&mut store);
    store
}

#[test]
fn listing_includes_inherited_operations_in_bfs_order() {
    let mut store = open_seeded();
    let registry = SchemaRegistry::new(&mut store);
    let ops = OperationRegistry::new(&registry, derived_to_base)
        .list_operations(DERIVED, OperationScope::Object, true)
        .unwrap();
    assert_eq!(ops.len(), 2, "own op first, inherited second");

    let own_only = OperationRegistry::new(&registry, derived_to_base)
        .list_operations(DERIVED, OperationScope::Object, false)
        .unwrap();
    assert_eq!(own_only.len(), 1);

    let class_ops = OperationRegistry::new(&registry, derived_to_base)
        .list_operations(DERIVED, OperationScope::Class, true)
        .unwrap();
    assert_eq!(class_ops.len(), 1);
    assert_eq!(class_ops[0].name, "describe");
}

#[test]
fn unknown_type_fails_the_walk() {
    let mut store = open_seeded();
    let registry = SchemaRegistry::new(&mut store);
    assert!(matches!(
        OperationRegistry::new(&registry, NoInheritance).list_operations(
            TypeId(0xFFFF),
            OperationScope::Object,
            true
        ),
        Err(SchemaError::DefinitionNotFound)
    ));
}

#[test]
fn subtype_override_wins_by_depth() {
    let mut store = open_seeded();
    let registry = SchemaRegistry::new(&mut store);
    let engine = DispatchEngine::new(&registry, derived_to_base);
    let hit = engine
        .resolve(DERIVED, "op", OperationScope::Object, &[ARG_A], 1, true)
        .unwrap();
    assert_eq!(hit.owner_type, DERIVED);
    assert_eq!(hit.depth, 0);
}

#[test]
fn overloads_resolve_by_argument_type() {
    let mut store = open_seeded();
    let registry = SchemaRegistry::new(&mut store);
    let engine = DispatchEngine::new(&registry, NoInheritance);
    let hit = engine
        .resolve(OVERLOADS, "op", OperationScope::Object, &[ARG_B], 1, true)
        .unwrap();
    assert_eq!(hit.operation.signature.params[0].type_id, ARG_B);
}

#[test]
fn untyped_arguments_tie_across_overloads() {
    let mut store = open_seeded();
    let registry = SchemaRegistry::new(&mut store);
    let engine = DispatchEngine::new(&registry, NoInheritance);
    match engine.resolve(OVERLOADS, "op", OperationScope::Object, &[], 1, true) {
        Err(SchemaError::AmbiguousOperation(listing)) => {
            assert!(listing.contains("0x1001"));
            assert!(listing.contains("0x1002"));
        }
        other => panic!("expected ambiguity, got {other:?}"),
    }
}

#[test]
fn no_candidates_is_its_own_error() {
    let mut store = open_seeded();
    let registry = SchemaRegistry::new(&mut store);
    let engine = DispatchEngine::new(&registry, NoInheritance);
    assert!(matches!(
        engine.resolve(OVERLOADS, "missing", OperationScope::Object, &[], 0, true),
        Err(SchemaError::NoMatchingOperation)
    ));
    // Wrong scope also misses.
    assert!(matches!(
        engine.resolve(OVERLOADS, "op", OperationScope::Class, &[ARG_A], 1, true),
        Err(SchemaError::NoMatchingOperation)
    ));
}

#[test]
fn subtype_arguments_match_with_a_penalty() {
    let mut store = SegmentStore::in_memory();
    store.open().unwrap();
    {
        let mut registry = SchemaRegistry::new(&mut store);
        let mut sink = TypeDefinition::new(TypeId(0x51), "Sink", "Demo");
        sink.operations
            .push(op("accept", OperationScope::Object, &[(BASE, false)]));
        registry.register_definition(&sink).unwrap();
    }
    let registry = SchemaRegistry::new(&mut store);
    let engine = DispatchEngine::new(&registry, derived_to_base);
    // A Derived argument widens to the Base parameter.
    let hit = engine
        .resolve(TypeId(0x51), "accept", OperationScope::Object, &[DERIVED], 1, true)
        .unwrap();
    assert_eq!(hit.owner_type, TypeId(0x51));
    // An unrelated argument disqualifies.
    assert!(matches!(
        engine.resolve(TypeId(0x51), "accept", OperationScope::Object, &[ARG_B], 1, true),
        Err(SchemaError::NoMatchingOperation)
    ));
}

#[test]
fn exact_match_beats_optional_widening() {
    let mut store = SegmentStore::in_memory();
    store.open().unwrap();
    {
        let mut registry = SchemaRegistry::new(&mut store);
        let mut mixed = TypeDefinition::new(TypeId(0x52), "Mixed", "Demo");
        // One-arg exact overload and a two-arg overload with an optional tail.
        mixed
            .operations
            .push(op("go", OperationScope::Object, &[(ARG_A, false)]));
        mixed.operations.push(op(
            "go",
            OperationScope::Object,
            &[(ARG_A, false), (ARG_B, true)],
        ));
        registry.register_definition(&mixed).unwrap();
    }
    let registry = SchemaRegistry::new(&mut store);
    let engine = DispatchEngine::new(&registry, NoInheritance);
    let hit = engine
        .resolve(TypeId(0x52), "go", OperationScope::Object, &[ARG_A], 1, true)
        .unwrap();
    assert_eq!(hit.operation.signature.params.len(), 1, "no optional penalty");

    // Two supplied args only fit the longer overload.
    let hit = engine
        .resolve(
            TypeId(0x52),
            "go",
            OperationScope::Object,
            &[ARG_A, ARG_B],
            2,
            true,
        )
        .unwrap();
    assert_eq!(hit.operation.signature.params.len(), 2);
}

#[test]
fn resolution_is_deterministic() {
    let mut store = open_seeded();
    let registry = SchemaRegistry::new(&mut store);
    let engine = DispatchEngine::new(&registry, derived_to_base);
    let first = engine
        .resolve(DERIVED, "op", OperationScope::Object, &[ARG_A], 1, true)
        .unwrap();
    let second = engine
        .resolve(DERIVED, "op", OperationScope::Object, &[ARG_A], 1, true)
        .unwrap();
    assert_eq!(first, second);
}
