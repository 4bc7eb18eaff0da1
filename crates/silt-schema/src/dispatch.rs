// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Operation listing and overload resolution over an external inheritance
//! relation.
//!
//! The registry stores no inheritance itself; callers inject an
//! [`InheritanceResolver`] mapping a type to its direct bases. Listing and
//! dispatch both walk that relation breadth-first from the target type.
//!
//! Dispatch scoring ranks candidates by `(type_penalty, optional_penalty,
//! depth)` ascending: exact-type overloads beat widening-then-optional
//! matches, and subtype overrides beat parent definitions because depth is
//! the last tiebreaker.

use std::collections::{HashSet, VecDeque};
use std::fmt::Write as _;

use silt_store::TypeId;

use crate::error::SchemaError;
use crate::registry::SchemaRegistry;
use crate::types::{OperationDefinition, OperationScope};

/// Maps a type to its direct base types. Implemented for any
/// `Fn(TypeId) -> Vec<TypeId>` closure.
pub trait InheritanceResolver {
    /// Returns the direct bases of `type_id`, empty when it has none.
    fn bases(&self, type_id: TypeId) -> Vec<TypeId>;
}

impl<F> InheritanceResolver for F
where
    F: Fn(TypeId) -> Vec<TypeId>,
{
    fn bases(&self, type_id: TypeId) -> Vec<TypeId> {
        self(type_id)
    }
}

/// Resolver for flat type systems: every type has no bases.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoInheritance;

impl InheritanceResolver for NoInheritance {
    fn bases(&self, _type_id: TypeId) -> Vec<TypeId> {
        Vec::new()
    }
}

/// Lists operations of a type, optionally including inherited ones.
pub struct OperationRegistry<'r, 's, R> {
    registry: &'r SchemaRegistry<'s>,
    resolver: R,
}

impl<'r, 's, R: InheritanceResolver> OperationRegistry<'r, 's, R> {
    /// Couples a registry with an inheritance resolver.
    pub fn new(registry: &'r SchemaRegistry<'s>, resolver: R) -> Self {
        Self { registry, resolver }
    }

    /// Returns all operations of `type_id` matching `scope`, walking the
    /// inheritance relation breadth-first when `include_inherited` is set.
    /// Duplicate names across levels are all included; visibility policy is
    /// the caller's.
    pub fn list_operations(
        &self,
        type_id: TypeId,
        scope: OperationScope,
        include_inherited: bool,
    ) -> Result<Vec<OperationDefinition>, SchemaError> {
        let mut out = Vec::new();
        let mut queue = VecDeque::from([type_id]);
        let mut visited = HashSet::from([type_id.0]);

        while let Some(current) = queue.pop_front() {
            let record = self
                .registry
                .get_latest_definition_by_type(current)?
                .ok_or(SchemaError::DefinitionNotFound)?;
            out.extend(
                record
                    .definition
                    .operations
                    .into_iter()
                    .filter(|op| op.scope == scope),
            );
            if include_inherited {
                for base in self.resolver.bases(current) {
                    if visited.insert(base.0) {
                        queue.push_back(base);
                    }
                }
            }
        }
        Ok(out)
    }
}

/// The outcome of a successful dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchMatch {
    /// The selected operation.
    pub operation: OperationDefinition,
    /// The type whose definition declared it.
    pub owner_type: TypeId,
    /// BFS distance from the target type (0 = declared on the target).
    pub depth: usize,
}

struct Candidate {
    operation: OperationDefinition,
    owner: TypeId,
    depth: usize,
    type_penalty: usize,
    optional_penalty: usize,
}

impl Candidate {
    fn score(&self) -> (usize, usize, usize) {
        (self.type_penalty, self.optional_penalty, self.depth)
    }
}

fn matches_arity(op: &OperationDefinition, arg_count: usize) -> bool {
    let required = op
        .signature
        .params
        .iter()
        .filter(|param| !param.optional)
        .count();
    arg_count >= required && arg_count <= op.signature.params.len()
}

fn format_candidate(candidate: &Candidate) -> String {
    let mut out = String::new();
    let _ = write!(out, "{}(", candidate.operation.name);
    for (index, param) in candidate.operation.signature.params.iter().enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "0x{:x}", param.type_id.0);
        if param.optional {
            out.push('?');
        }
    }
    let _ = write!(out, ") owner=0x{:x}", candidate.owner.0);
    out
}

/// Resolves overloaded operation calls against stored definitions.
pub struct DispatchEngine<'r, 's, R> {
    registry: &'r SchemaRegistry<'s>,
    resolver: R,
}

impl<'r, 's, R: InheritanceResolver> DispatchEngine<'r, 's, R> {
    /// Couples a registry with an inheritance resolver.
    pub fn new(registry: &'r SchemaRegistry<'s>, resolver: R) -> Self {
        Self { registry, resolver }
    }

    fn is_subtype(&self, type_id: TypeId, base: TypeId) -> bool {
        let mut queue = VecDeque::from([type_id]);
        let mut visited = HashSet::from([type_id.0]);
        while let Some(current) = queue.pop_front() {
            for parent in self.resolver.bases(current) {
                if parent == base {
                    return true;
                }
                if visited.insert(parent.0) {
                    queue.push_back(parent);
                }
            }
        }
        false
    }

    /// Resolves a call of `name` on `target_type`.
    ///
    /// A candidate must match scope and name and admit `arg_count` between
    /// its required and total parameter counts. When `arg_types` is supplied
    /// with `arg_count` entries, each argument must match its parameter type
    /// exactly (no penalty) or be a subtype of it (+1 type penalty); any
    /// other mismatch disqualifies. The unique best candidate by
    /// `(type_penalty, optional_penalty, depth)` wins; ties are
    /// [`SchemaError::AmbiguousOperation`], no candidates at all
    /// [`SchemaError::NoMatchingOperation`].
    pub fn resolve(
        &self,
        target_type: TypeId,
        name: &str,
        scope: OperationScope,
        arg_types: &[TypeId],
        arg_count: usize,
        include_inherited: bool,
    ) -> Result<DispatchMatch, SchemaError> {
        let mut queue = VecDeque::from([(target_type, 0usize)]);
        let mut visited = HashSet::from([target_type.0]);
        let mut candidates: Vec<Candidate> = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            let record = self
                .registry
                .get_latest_definition_by_type(current)?
                .ok_or(SchemaError::DefinitionNotFound)?;

            for op in record.definition.operations {
                if op.scope != scope || op.name != name || !matches_arity(&op, arg_count) {
                    continue;
                }
                let mut candidate = Candidate {
                    optional_penalty: op.signature.params.len() - arg_count,
                    operation: op,
                    owner: current,
                    depth,
                    type_penalty: 0,
                };
                if !arg_types.is_empty() && arg_types.len() == arg_count {
                    let mut eligible = true;
                    for (arg_type, param) in arg_types
                        .iter()
                        .zip(candidate.operation.signature.params.iter())
                    {
                        if arg_type == &param.type_id {
                            continue;
                        }
                        if self.is_subtype(*arg_type, param.type_id) {
                            candidate.type_penalty += 1;
                            continue;
                        }
                        eligible = false;
                        break;
                    }
                    if !eligible {
                        continue;
                    }
                }
                candidates.push(candidate);
            }

            if include_inherited {
                for base in self.resolver.bases(current) {
                    if visited.insert(base.0) {
                        queue.push_back((base, depth + 1));
                    }
                }
            }
        }

        let Some(best_score) = candidates.iter().map(Candidate::score).min() else {
            return Err(SchemaError::NoMatchingOperation);
        };
        let mut ties: Vec<&Candidate> = candidates
            .iter()
            .filter(|candidate| candidate.score() == best_score)
            .collect();
        if ties.len() > 1 {
            let listing = ties
                .iter()
                .map(|candidate| format_candidate(candidate))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(SchemaError::AmbiguousOperation(listing));
        }
        // Exactly one tie at the minimum: the winner.
        let winner = ties.remove(0);
        Ok(DispatchMatch {
            operation: winner.operation.clone(),
            owner_type: winner.owner,
            depth: winner.depth,
        })
    }
}
