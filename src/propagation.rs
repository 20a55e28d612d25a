// Copyright 2025 Cowboy AI, LLC.

//! Annotation propagation and introduction
//!
//! Propagation attaches the annotations declared on a type or member to the
//! matching plan entity, following copy indirections and dropping denied
//! annotation types. Introduction decides which annotations of a mixin (or
//! of an overriding member) surface on the target, honoring opt-outs,
//! suppressions and single-use annotation types.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::annotations::{Annotation, AnnotationKind, AnnotationSource, CopyReference, EntityKind};
use crate::config::DefinitionBuilderConfig;
use crate::errors::{ConfigurationError, ConfigurationResult};
use crate::types::{TypeId, TypeIntrospector};

/// An annotation applied to a plan entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationDefinition {
    /// The annotation
    pub annotation: Annotation,
    /// Entity that declared it, which differs from the holder for copied annotations
    pub declared_on: AnnotationSource,
}

impl AnnotationDefinition {
    /// Annotation type of the applied annotation
    pub fn annotation_type(&self) -> Option<TypeId> {
        self.annotation.annotation_type()
    }
}

/// A plan entity that can hold applied annotations
pub trait Annotatable {
    /// Kind of the entity, checked against copy sources
    fn entity_kind(&self) -> EntityKind;

    /// Name used in diagnostics
    fn display_name(&self) -> &str;

    /// Annotations applied so far
    fn annotations(&self) -> &[AnnotationDefinition];

    /// Apply one more annotation
    fn add_annotation(&mut self, annotation: AnnotationDefinition);

    /// Whether an annotation of the given type is applied
    fn has_annotation(&self, annotation_type: TypeId) -> bool {
        carries(self.annotations(), annotation_type)
    }
}

/// Whether `annotations` contain one of the given annotation type
fn carries(annotations: &[AnnotationDefinition], annotation_type: TypeId) -> bool {
    annotations
        .iter()
        .any(|applied| applied.annotation_type() == Some(annotation_type))
}

/// A `Suppress` declaration of the target or of a mixin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Suppression {
    /// Type declaring the suppression
    pub suppressor: TypeId,
    /// Suppressed annotation type, including its subtypes
    pub annotation_type: TypeId,
}

/// An annotation that surfaced on the target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntroducedAnnotation {
    /// The introduced annotation
    pub annotation: AnnotationDefinition,
    /// Mixin type (or overrider's owner) the annotation came from
    pub source: TypeId,
}

/// An annotation removed by a suppression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressedAnnotation {
    /// The suppressed annotation
    pub annotation: AnnotationDefinition,
    /// Mixin type (or overrider's owner) the annotation came from
    pub source: TypeId,
    /// Type whose `Suppress` declaration removed it
    pub suppressor: TypeId,
}

/// An annotation that was not introduced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonIntroducedAnnotation {
    /// The annotation
    pub annotation: AnnotationDefinition,
    /// Mixin type (or overrider's owner) the annotation came from
    pub source: TypeId,
}

/// Introduction outcome of every candidate annotation for one entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationIntroductions {
    /// Annotations surfacing on the entity
    pub introduced: Vec<IntroducedAnnotation>,
    /// Annotations removed by suppressions
    pub suppressed: Vec<SuppressedAnnotation>,
    /// Annotations opted out or blocked by an existing single-use annotation
    pub non_introduced: Vec<NonIntroducedAnnotation>,
}

impl AnnotationIntroductions {
    /// Whether an annotation of the given type was introduced
    pub fn is_introduced(&self, annotation_type: TypeId) -> bool {
        self.introduced
            .iter()
            .any(|intro| intro.annotation.annotation_type() == Some(annotation_type))
    }

    /// Whether an annotation of the given type was suppressed
    pub fn is_suppressed(&self, annotation_type: TypeId) -> bool {
        self.suppressed
            .iter()
            .any(|s| s.annotation.annotation_type() == Some(annotation_type))
    }

    /// Whether an annotation of the given type was withheld
    pub fn is_non_introduced(&self, annotation_type: TypeId) -> bool {
        self.non_introduced
            .iter()
            .any(|n| n.annotation.annotation_type() == Some(annotation_type))
    }

    /// Whether nothing was considered for introduction
    pub fn is_empty(&self) -> bool {
        self.introduced.is_empty() && self.suppressed.is_empty() && self.non_introduced.is_empty()
    }
}

/// Candidate annotations of one introduction source
#[derive(Debug, Clone, Copy)]
pub struct IntroductionSource<'s> {
    /// Mixin type (or overrider's owner)
    pub owner: TypeId,
    /// Annotations applied to the source entity
    pub annotations: &'s [AnnotationDefinition],
    /// Annotation types the source opts out of introducing
    pub non_introduced: &'s [TypeId],
}

/// Applies declared annotations to plan entities
pub struct AnnotationPropagator<'a> {
    types: &'a dyn TypeIntrospector,
    config: &'a DefinitionBuilderConfig,
}

impl<'a> AnnotationPropagator<'a> {
    /// Create a propagator
    pub fn new(types: &'a dyn TypeIntrospector, config: &'a DefinitionBuilderConfig) -> Self {
        Self { types, config }
    }

    /// Apply the annotations declared on `source` to `target`
    pub fn apply(
        &self,
        target: &mut dyn Annotatable,
        source: AnnotationSource,
    ) -> ConfigurationResult<()> {
        // The source itself is in progress, so a copy leading back to it is skipped
        let mut copying = HashSet::from([source]);
        self.apply_from(target, source, &[], &mut copying)
    }

    fn apply_from(
        &self,
        target: &mut dyn Annotatable,
        source: AnnotationSource,
        filter: &[TypeId],
        copying: &mut HashSet<AnnotationSource>,
    ) -> ConfigurationResult<()> {
        for annotation in self.types.annotations(source) {
            match &annotation.kind {
                AnnotationKind::CopyAnnotations(reference) => {
                    let resolved = self.resolve_copy_reference(&*target, reference)?;
                    if !copying.insert(resolved) {
                        warn!(
                            "Skipping copy of annotations onto {}: {} is already being copied",
                            target.display_name(),
                            self.reference_name(reference)
                        );
                        continue;
                    }
                    let result = self.apply_from(target, resolved, &reference.filter, copying);
                    copying.remove(&resolved);
                    result?;
                }
                AnnotationKind::Custom {
                    annotation_type, ..
                } => {
                    if !self.passes_filter(*annotation_type, filter) {
                        continue;
                    }
                    let type_name = self.types.full_name(*annotation_type);
                    if self.config.is_denied(type_name) {
                        debug!(
                            "Not propagating denied annotation {} to {}",
                            type_name,
                            target.display_name()
                        );
                        continue;
                    }
                    target.add_annotation(AnnotationDefinition {
                        annotation: annotation.clone(),
                        declared_on: source,
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn passes_filter(&self, annotation_type: TypeId, filter: &[TypeId]) -> bool {
        filter.is_empty()
            || filter
                .iter()
                .any(|&allowed| self.types.is_assignable_from(allowed, annotation_type))
    }

    fn reference_name(&self, reference: &CopyReference) -> String {
        let type_name = self.types.full_name(reference.source_type);
        match &reference.member_name {
            Some(member) => format!("{type_name}.{member}"),
            None => type_name.to_string(),
        }
    }

    fn type_entity_kind(&self, ty: TypeId) -> EntityKind {
        if self.types.is_nested(ty) {
            EntityKind::NestedType
        } else {
            EntityKind::Type
        }
    }

    /// Entity referenced by a copy indirection
    ///
    /// Named references match declared members and nested types of the
    /// source type by simple name.
    pub fn resolve_copy_reference(
        &self,
        target: &dyn Annotatable,
        reference: &CopyReference,
    ) -> ConfigurationResult<AnnotationSource> {
        let (resolved, kind) = match &reference.member_name {
            None => (
                AnnotationSource::Type(reference.source_type),
                self.type_entity_kind(reference.source_type),
            ),
            Some(name) => {
                let members = self
                    .types
                    .declared_members(reference.source_type)
                    .into_iter()
                    .filter(|member| &member.name == name)
                    .map(|member| (AnnotationSource::Member(member.id), EntityKind::of_member(member.kind)));
                let nested = self
                    .types
                    .nested_types(reference.source_type)
                    .into_iter()
                    .filter(|&nested| simple_name(self.types.full_name(nested)) == name.as_str())
                    .map(|nested| (AnnotationSource::Type(nested), EntityKind::NestedType));
                let found: Vec<_> = members.chain(nested).collect();

                match found.as_slice() {
                    [] => {
                        return Err(ConfigurationError::UnknownCopyReference {
                            member: target.display_name().to_string(),
                            reference: self.reference_name(reference),
                        })
                    }
                    [single] => *single,
                    _ => {
                        return Err(ConfigurationError::AmbiguousCopyReference {
                            member: target.display_name().to_string(),
                            reference: self.reference_name(reference),
                        })
                    }
                }
            }
        };

        if !target.entity_kind().accepts(kind) {
            return Err(ConfigurationError::IncompatibleCopyReference {
                member: target.display_name().to_string(),
                reference: self.reference_name(reference),
                expected: target.entity_kind().to_string(),
                actual: kind.to_string(),
            });
        }
        Ok(resolved)
    }

    /// Decide which annotations of `source` surface on an entity
    ///
    /// `existing` are the annotations the entity already carries; earlier
    /// introductions recorded in `into` count as carried too.
    pub fn introduce(
        &self,
        into: &mut AnnotationIntroductions,
        existing: &[AnnotationDefinition],
        source: IntroductionSource<'_>,
        suppressions: &[Suppression],
    ) {
        for candidate in source.annotations {
            let Some(annotation_type) = candidate.annotation_type() else {
                continue;
            };

            if source
                .non_introduced
                .iter()
                .any(|&opted_out| self.types.is_assignable_from(opted_out, annotation_type))
            {
                into.non_introduced.push(NonIntroducedAnnotation {
                    annotation: candidate.clone(),
                    source: source.owner,
                });
                continue;
            }

            let suppressor = suppressions.iter().find(|suppression| {
                suppression.suppressor != source.owner
                    && self
                        .types
                        .is_assignable_from(suppression.annotation_type, annotation_type)
            });
            if let Some(suppression) = suppressor {
                debug!(
                    "{} suppresses {} from {}",
                    self.types.full_name(suppression.suppressor),
                    self.types.full_name(annotation_type),
                    self.types.full_name(source.owner)
                );
                into.suppressed.push(SuppressedAnnotation {
                    annotation: candidate.clone(),
                    source: source.owner,
                    suppressor: suppression.suppressor,
                });
                continue;
            }

            let already_carried =
                carries(existing, annotation_type) || into.is_introduced(annotation_type);
            if already_carried && !candidate.annotation.allows_multiple() {
                into.non_introduced.push(NonIntroducedAnnotation {
                    annotation: candidate.clone(),
                    source: source.owner,
                });
                continue;
            }

            into.introduced.push(IntroducedAnnotation {
                annotation: candidate.clone(),
                source: source.owner,
            });
        }
    }
}

fn simple_name(full_name: &str) -> &str {
    full_name.rsplit("::").next().unwrap_or(full_name)
}
