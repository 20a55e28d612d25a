// Copyright 2025 Cowboy AI, LLC.

//! Definition builder
//!
//! Drives the resolution pipeline for one class context:
//!
//! ```mermaid
//! graph TD
//!     A[target members] --> B[class annotations]
//!     B --> C[face requirements]
//!     C --> D[mixin definitions]
//!     D --> E[dependency ordering]
//!     E --> F[requirements and dependencies]
//!     F --> G[overrides per member kind]
//!     G --> H[annotation introductions]
//! ```

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info};

use super::{
    DeclaringEntity, MemberArena, MemberDefId, MemberDefinition, MixinDefinition, MixinId,
    RequirementKind, TargetClassDefinition,
};
use crate::annotations::{
    Annotation, AnnotationKind, AnnotationSource, DependencyKind, EntityKind, OverrideMarker,
};
use crate::config::DefinitionBuilderConfig;
use crate::context::{ClassContext, MixinEntry};
use crate::dependency_sort::MixinDependencySorter;
use crate::errors::{ConfigurationError, ConfigurationResult};
use crate::member_chain::MemberChain;
use crate::overrides::OverrideResolver;
use crate::propagation::{
    AnnotationDefinition, AnnotationIntroductions, AnnotationPropagator, IntroductionSource,
    Suppression,
};
use crate::types::{MemberInfo, MemberKind, Signature, TypeId, TypeIntrospector};

/// Builds composition plans from class contexts
///
/// The builder holds no state between builds; every call works on a fresh
/// plan and never touches the context it is given.
pub struct DefinitionBuilder<'a> {
    types: &'a dyn TypeIntrospector,
    config: DefinitionBuilderConfig,
}

impl<'a> DefinitionBuilder<'a> {
    /// Builder with the default configuration
    pub fn new(types: &'a dyn TypeIntrospector) -> Self {
        Self::with_config(types, DefinitionBuilderConfig::default())
    }

    /// Builder with an explicit configuration
    pub fn with_config(types: &'a dyn TypeIntrospector, config: DefinitionBuilderConfig) -> Self {
        Self { types, config }
    }

    /// Active configuration
    pub fn config(&self) -> &DefinitionBuilderConfig {
        &self.config
    }

    /// Type graph the builder resolves against
    pub fn types(&self) -> &'a dyn TypeIntrospector {
        self.types
    }

    /// Resolve `context` into a composition plan
    pub fn build(&self, context: &ClassContext) -> ConfigurationResult<TargetClassDefinition> {
        let ty = context.ty();
        let name = self.types.full_name(ty).to_string();
        if self.types.contains_generic_parameters(ty) {
            return Err(ConfigurationError::UnresolvedGenericTarget { target: name });
        }

        let propagator = AnnotationPropagator::new(self.types, &self.config);
        let mut definition =
            TargetClassDefinition::new(ty, name, self.entity_kind(ty), context.clone());

        for info in self.visible_members(ty) {
            let id = self.add_member(
                &mut definition.members,
                &propagator,
                info,
                DeclaringEntity::Target,
                ty,
            )?;
            definition.target_members.push(id);
        }

        propagator.apply(&mut definition, AnnotationSource::Type(ty))?;
        definition.suppressed_annotations = self
            .types
            .annotations(AnnotationSource::Type(ty))
            .iter()
            .filter_map(suppressed_type)
            .collect();

        for interface in context.complete_interfaces() {
            let interface_name = self.types.full_name(interface);
            definition.add_requirement(
                RequirementKind::Face,
                interface,
                interface_name,
                self.is_aggregator(interface),
            );
        }

        for (position, entry) in context.mixins().iter().enumerate() {
            let id = MixinId::new(position);
            let mixin = self.instantiate_mixin(&mut definition.members, &propagator, id, entry.clone())?;
            definition.mixins.push(mixin);
        }

        self.order_mixins(&mut definition)?;

        for id in definition.mixin_order.clone() {
            self.add_requirements(&mut definition, id)?;
        }

        for kind in MemberKind::ALL {
            self.resolve_overrides(&mut definition, kind)?;
        }

        self.introduce_class_annotations(&mut definition, &propagator);
        self.introduce_member_annotations(&mut definition, &propagator);

        info!(
            "Built definition for {} with {} mixin(s) and {} requirement(s)",
            definition.name,
            definition.mixins.len(),
            definition.requirements.len()
        );
        Ok(definition)
    }

    fn entity_kind(&self, ty: TypeId) -> EntityKind {
        if self.types.is_nested(ty) {
            EntityKind::NestedType
        } else {
            EntityKind::Type
        }
    }

    /// Members mixins can see, without members shadowed by a more derived override
    fn visible_members(&self, ty: TypeId) -> Vec<MemberInfo> {
        let mut groups: IndexMap<(MemberKind, String, Signature), Vec<MemberInfo>> = IndexMap::new();
        for member in self.types.members(ty) {
            if !member.is_visible_to_mixins() {
                continue;
            }
            groups
                .entry((member.kind, member.name.clone(), member.signature.clone()))
                .or_default()
                .push(member);
        }

        groups
            .into_values()
            .flat_map(|group| {
                MemberChain::new(self.types, group)
                    .non_overridden_members()
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn add_member(
        &self,
        arena: &mut MemberArena,
        propagator: &AnnotationPropagator<'_>,
        info: MemberInfo,
        entity: DeclaringEntity,
        entity_type: TypeId,
    ) -> ConfigurationResult<MemberDefId> {
        let source = AnnotationSource::Member(info.id);
        let marker = self
            .types
            .annotations(source)
            .iter()
            .find_map(Annotation::override_marker);
        let full_name = self.types.member_name(&info);
        let mut member =
            MemberDefinition::new(arena.next_id(), info, full_name, entity, entity_type, marker);
        propagator.apply(&mut member, source)?;
        Ok(arena.push(member))
    }

    fn instantiate_mixin(
        &self,
        arena: &mut MemberArena,
        propagator: &AnnotationPropagator<'_>,
        id: MixinId,
        entry: MixinEntry,
    ) -> ConfigurationResult<MixinDefinition> {
        let mixin_type = entry.mixin_type();
        let source = AnnotationSource::Type(mixin_type);
        let mut mixin = MixinDefinition::new(
            id,
            entry,
            self.types.full_name(mixin_type).to_string(),
            self.entity_kind(mixin_type),
        );
        propagator.apply(&mut mixin, source)?;

        for annotation in self.types.annotations(source) {
            match annotation.kind {
                AnnotationKind::Suppress(suppressed) => mixin.suppressed_annotations.push(suppressed),
                AnnotationKind::NonIntroduced(opted_out) => {
                    mixin.non_introduced_annotations.push(opted_out)
                }
                AnnotationKind::Requires {
                    dependency: DependencyKind::NextCall,
                    required,
                } if !required.is_root() => mixin.next_call_interfaces.push(required),
                _ => {}
            }
        }

        for info in self.visible_members(mixin_type) {
            let member = self.add_member(arena, propagator, info, DeclaringEntity::Mixin(id), mixin_type)?;
            mixin.members.push(member);
        }

        debug!(
            "Instantiated mixin {} with {} member(s)",
            mixin.name,
            mixin.members.len()
        );
        Ok(mixin)
    }

    fn order_mixins(&self, definition: &mut TargetClassDefinition) -> ConfigurationResult<()> {
        let sorter = MixinDependencySorter::new(self.types);
        let order: Vec<MixinId> = sorter
            .order(definition.ty, definition.mixins.iter().collect())?
            .into_iter()
            .map(|mixin| mixin.id)
            .collect();

        for (index, id) in order.iter().enumerate() {
            if let Some(mixin) = definition.mixins.get_mut(id.index()) {
                mixin.index = index;
            }
        }
        definition.mixin_order = order;
        Ok(())
    }

    fn is_aggregator(&self, ty: TypeId) -> bool {
        self.types.is_interface(ty)
            && self.types.declared_members(ty).is_empty()
            && !self.types.declared_interfaces(ty).is_empty()
    }

    fn add_requirements(
        &self,
        definition: &mut TargetClassDefinition,
        id: MixinId,
    ) -> ConfigurationResult<()> {
        let Some(mixin) = definition.mixins.get(id.index()) else {
            return Ok(());
        };
        let mixin_type = mixin.mixin_type();

        let mut declared: IndexSet<(DependencyKind, TypeId)> = IndexSet::new();
        for annotation in self.types.annotations(AnnotationSource::Type(mixin_type)) {
            if let AnnotationKind::Requires {
                dependency,
                required,
            } = annotation.kind
            {
                if !required.is_root() {
                    declared.insert((dependency, required));
                }
            }
        }

        let mut seen = declared.clone();
        for (kind, required) in declared {
            let needs_interface = matches!(kind, DependencyKind::Base | DependencyKind::NextCall);
            if needs_interface
                && self.config.validate_requirement_targets
                && !self.types.is_interface(required)
            {
                return Err(ConfigurationError::InvalidDependencyTarget {
                    mixin: self.types.full_name(mixin_type).to_string(),
                    dependency: self.types.full_name(required).to_string(),
                });
            }
            self.add_dependency_tree(definition, id, kind, required, None, &mut seen);
        }
        Ok(())
    }

    fn add_dependency_tree(
        &self,
        definition: &mut TargetClassDefinition,
        mixin: MixinId,
        kind: DependencyKind,
        required: TypeId,
        aggregator: Option<super::DependencyId>,
        seen: &mut IndexSet<(DependencyKind, TypeId)>,
    ) {
        let is_aggregator = self.is_aggregator(required);
        let requirement = definition.add_requirement(
            kind.into(),
            required,
            self.types.full_name(required),
            is_aggregator,
        );
        let dependency = definition.add_dependency(mixin, kind, requirement, aggregator);

        if is_aggregator {
            for child in self.types.declared_interfaces(required) {
                if seen.insert((kind, child)) {
                    self.add_dependency_tree(definition, mixin, kind, child, Some(dependency), seen);
                }
            }
        }
    }

    fn resolve_overrides(
        &self,
        definition: &mut TargetClassDefinition,
        kind: MemberKind,
    ) -> ConfigurationResult<()> {
        let pairs = {
            let of_kind = definition.members.iter().filter(|m| m.kind() == kind);
            let (target_members, mixin_members): (Vec<&MemberDefinition>, Vec<&MemberDefinition>) =
                of_kind.partition(|m| m.declaring_entity() == DeclaringEntity::Target);

            let mut pairs = Vec::new();

            let against_mixins = OverrideResolver::new(self.types, mixin_members.iter().copied());
            let target_overriders = target_members
                .iter()
                .copied()
                .filter(|m| matches!(m.override_marker(), Some(OverrideMarker::Mixin(_))));
            for pair in against_mixins.analyze(target_overriders) {
                pairs.push(pair?);
            }

            let against_target = OverrideResolver::new(self.types, target_members.iter().copied());
            let mixin_overriders = mixin_members
                .iter()
                .copied()
                .filter(|m| m.override_marker() == Some(OverrideMarker::Target));
            for pair in against_target.analyze(mixin_overriders) {
                pairs.push(pair?);
            }
            pairs
        };

        for (overrider, base) in pairs {
            definition.members.link(overrider, base);
        }
        Ok(())
    }

    fn suppressions(&self, definition: &TargetClassDefinition) -> Vec<Suppression> {
        let from_target = definition
            .suppressed_annotations
            .iter()
            .map(|&annotation_type| Suppression {
                suppressor: definition.ty,
                annotation_type,
            });
        let from_mixins = definition.mixins.iter().flat_map(|mixin| {
            mixin
                .suppressed_annotations
                .iter()
                .map(move |&annotation_type| Suppression {
                    suppressor: mixin.mixin_type(),
                    annotation_type,
                })
        });
        from_target.chain(from_mixins).collect()
    }

    fn introduce_class_annotations(
        &self,
        definition: &mut TargetClassDefinition,
        propagator: &AnnotationPropagator<'_>,
    ) {
        let suppressions = self.suppressions(definition);
        let mut carried: Vec<AnnotationDefinition> = definition.annotations.clone();

        for id in definition.mixin_order.clone() {
            let Some(mixin) = definition.mixins.get_mut(id.index()) else {
                continue;
            };
            let mut introductions = AnnotationIntroductions::default();
            propagator.introduce(
                &mut introductions,
                &carried,
                IntroductionSource {
                    owner: mixin.mixin_type(),
                    annotations: &mixin.annotations,
                    non_introduced: &mixin.non_introduced_annotations,
                },
                &suppressions,
            );

            carried.extend(introductions.introduced.iter().map(|i| i.annotation.clone()));
            merge_introductions(&mut definition.introductions, &introductions);
            mixin.introductions = introductions;
        }
    }

    fn introduce_member_annotations(
        &self,
        definition: &mut TargetClassDefinition,
        propagator: &AnnotationPropagator<'_>,
    ) {
        let suppressions = self.suppressions(definition);

        let overridden: Vec<MemberDefId> = definition
            .members
            .iter()
            .filter(|m| !m.overrides().is_empty())
            .map(MemberDefinition::id)
            .collect();

        for id in overridden {
            let introductions = {
                let Some(member) = definition.members.get(id) else {
                    continue;
                };
                let mut carried = member.annotations.clone();
                let mut introductions = AnnotationIntroductions::default();

                for overrider in member
                    .overrides()
                    .iter()
                    .filter_map(|&overrider| definition.members.get(overrider))
                {
                    let mut non_introduced: Vec<TypeId> = self
                        .types
                        .annotations(AnnotationSource::Member(overrider.info().id))
                        .iter()
                        .filter_map(|annotation| match annotation.kind {
                            AnnotationKind::NonIntroduced(opted_out) => Some(opted_out),
                            _ => None,
                        })
                        .collect();
                    if let DeclaringEntity::Mixin(owner) = overrider.declaring_entity() {
                        if let Some(mixin) = definition.mixins.get(owner.index()) {
                            non_introduced.extend(mixin.non_introduced_annotations.iter().copied());
                        }
                    }

                    let mut from_overrider = AnnotationIntroductions::default();
                    propagator.introduce(
                        &mut from_overrider,
                        &carried,
                        IntroductionSource {
                            owner: overrider.entity_type(),
                            annotations: &overrider.annotations,
                            non_introduced: &non_introduced,
                        },
                        &suppressions,
                    );
                    carried.extend(from_overrider.introduced.iter().map(|i| i.annotation.clone()));
                    merge_introductions(&mut introductions, &from_overrider);
                }
                introductions
            };

            if let Some(member) = definition.members.get_mut(id) {
                *member.introductions_mut() = introductions;
            }
        }
    }
}

fn suppressed_type(annotation: &Annotation) -> Option<TypeId> {
    match annotation.kind {
        AnnotationKind::Suppress(suppressed) => Some(suppressed),
        _ => None,
    }
}

fn merge_introductions(into: &mut AnnotationIntroductions, from: &AnnotationIntroductions) {
    into.introduced.extend(from.introduced.iter().cloned());
    into.suppressed.extend(from.suppressed.iter().cloned());
    into.non_introduced.extend(from.non_introduced.iter().cloned());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MemberDecl, MemberSlot, TypeDecl, TypeUniverse};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_open_generic_target_is_rejected_first() {
        let mut types = TypeUniverse::new();
        let def = types.declare(TypeDecl::class("app::Repo<>").generic_definition(1));
        let builder = DefinitionBuilder::new(&types);
        let err = builder.build(&ClassContext::empty(def)).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnresolvedGenericTarget {
                target: "app::Repo<>".to_string()
            }
        );
    }

    #[test]
    fn test_target_members_skip_private_and_shadowed_members() {
        let mut types = TypeUniverse::new();
        let base = types.declare(TypeDecl::class("app::Entity"));
        let target = types.declare(TypeDecl::class("app::Order").extends(base));
        types.add_member(base, MemberDecl::method("Save"));
        types.add_member(target, MemberDecl::method("Save").with_slot(MemberSlot::Override));
        types.add_member(
            target,
            MemberDecl::method("Secret").with_visibility(crate::types::Visibility::Private),
        );
        types.add_member(target, MemberDecl::property("Id"));

        let builder = DefinitionBuilder::new(&types);
        let definition = builder.build(&ClassContext::empty(target)).unwrap();
        let names: Vec<_> = definition.target_members().map(|m| m.full_name().to_string()).collect();
        assert_eq!(names, vec!["app::Order.Save", "app::Order.Id"]);
    }

    #[test]
    fn test_requirements_expand_aggregators() {
        let mut types = TypeUniverse::new();
        let target = types.declare(TypeDecl::class("app::Order"));
        let reader = types.declare(TypeDecl::interface("app::IReader"));
        let writer = types.declare(TypeDecl::interface("app::IWriter"));
        let store = types.declare(TypeDecl::interface("app::IStore").implements(reader).implements(writer));
        types.add_member(reader, MemberDecl::method("Read"));
        types.add_member(writer, MemberDecl::method("Write"));
        let mixin = types.declare(TypeDecl::class("app::CachingMixin"));
        types.annotate(
            AnnotationSource::Type(mixin),
            Annotation::requires(DependencyKind::NextCall, store),
        );
        types.annotate(
            AnnotationSource::Type(mixin),
            Annotation::requires(DependencyKind::Base, TypeId::ROOT),
        );

        let context = ClassContext::try_new(&types, target, [MixinEntry::used(mixin)], []).unwrap();
        let definition = DefinitionBuilder::new(&types).build(&context).unwrap();

        let aggregate = definition.requirement(RequirementKind::NextCall, store).unwrap();
        assert!(aggregate.is_aggregator());
        assert!(definition.requirement(RequirementKind::NextCall, reader).is_some());
        assert!(definition.requirement(RequirementKind::NextCall, writer).is_some());
        assert_eq!(definition.requirements().len(), 3);

        let mixin_definition = definition.mixin_by_type(mixin).unwrap();
        assert_eq!(mixin_definition.next_call_dependencies().len(), 1);
        let top = definition
            .dependency(mixin_definition.next_call_dependencies()[0])
            .unwrap();
        assert_eq!(top.aggregated().len(), 2);
        for &child in top.aggregated() {
            assert_eq!(definition.dependency(child).and_then(|d| d.aggregator()), Some(top.id()));
        }
    }

    #[test]
    fn test_base_dependency_on_class_is_rejected() {
        let mut types = TypeUniverse::new();
        let target = types.declare(TypeDecl::class("app::Order"));
        let concrete = types.declare(TypeDecl::class("app::Repository"));
        let mixin = types.declare(TypeDecl::class("app::CachingMixin"));
        types.annotate(
            AnnotationSource::Type(mixin),
            Annotation::requires(DependencyKind::Base, concrete),
        );
        let context = ClassContext::try_new(&types, target, [MixinEntry::used(mixin)], []).unwrap();

        let err = DefinitionBuilder::new(&types).build(&context).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::InvalidDependencyTarget {
                mixin: "app::CachingMixin".to_string(),
                dependency: "app::Repository".to_string(),
            }
        );

        let lenient = DefinitionBuilderConfig {
            validate_requirement_targets: false,
            ..DefinitionBuilderConfig::default()
        };
        let definition = DefinitionBuilder::with_config(&types, lenient)
            .build(&context)
            .unwrap();
        assert!(definition.requirement(RequirementKind::Base, concrete).is_some());
    }

    #[test]
    fn test_face_requirements_come_from_complete_interfaces() {
        let mut types = TypeUniverse::new();
        let target = types.declare(TypeDecl::class("app::Order"));
        let face = types.declare(TypeDecl::interface("app::IOrder"));
        let context = ClassContext::try_new(&types, target, [], [face]).unwrap();

        let definition = DefinitionBuilder::new(&types).build(&context).unwrap();
        let requirement = definition.requirement(RequirementKind::Face, face).unwrap();
        assert!(requirement.requiring_dependencies().is_empty());
        assert_eq!(requirement.name(), "app::IOrder");
    }
}
