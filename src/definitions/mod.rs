// Copyright 2025 Cowboy AI, LLC.

//! Composition plans
//!
//! A [`TargetClassDefinition`] is the immutable result of resolving one
//! class context: the ordered mixins, the members of the target and of every
//! mixin with their override links, the required types with the dependency
//! edges demanding them, and the annotations applied and introduced on each
//! entity. Cross references are integer handles into arenas owned by the
//! definition, so cyclic relations (overrides, aggregated dependencies) need
//! no shared ownership.

mod builder;
mod cache;

pub use builder::DefinitionBuilder;
pub use cache::DefinitionCache;

use serde::{Deserialize, Serialize};

use crate::annotations::{DependencyKind, EntityKind, OverrideMarker};
use crate::context::{ClassContext, MixinEntry};
use crate::dependency_sort::DependencyNode;
use crate::member_chain::ChainMember;
use crate::propagation::{Annotatable, AnnotationDefinition, AnnotationIntroductions};
use crate::types::{MemberInfo, MemberKind, MemberSlot, TypeId};

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Create a handle from an arena index
            pub fn new(index: usize) -> Self {
                Self(index as u32)
            }

            /// Arena index of this handle
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

arena_id!(
    /// Handle of a mixin definition, stable in declaration order
    MixinId
);
arena_id!(
    /// Handle of a member definition
    MemberDefId
);
arena_id!(
    /// Handle of a requirement definition
    RequirementId
);
arena_id!(
    /// Handle of a dependency definition
    DependencyId
);

/// Entity declaring a member of the plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclaringEntity {
    /// The target class (or one of its base classes)
    Target,
    /// A mixin (or one of its base classes)
    Mixin(MixinId),
}

/// A method, property or event of the target or of a mixin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDefinition {
    id: MemberDefId,
    info: MemberInfo,
    full_name: String,
    declaring_entity: DeclaringEntity,
    entity_type: TypeId,
    override_marker: Option<OverrideMarker>,
    base_as_member: Option<MemberDefId>,
    overrides: Vec<MemberDefId>,
    annotations: Vec<AnnotationDefinition>,
    introductions: AnnotationIntroductions,
}

impl MemberDefinition {
    /// Create an unlinked member definition
    ///
    /// `entity_type` is the target type or the mixin type owning the member.
    pub fn new(
        id: MemberDefId,
        info: MemberInfo,
        full_name: impl Into<String>,
        declaring_entity: DeclaringEntity,
        entity_type: TypeId,
        override_marker: Option<OverrideMarker>,
    ) -> Self {
        Self {
            id,
            info,
            full_name: full_name.into(),
            declaring_entity,
            entity_type,
            override_marker,
            base_as_member: None,
            overrides: Vec::new(),
            annotations: Vec::new(),
            introductions: AnnotationIntroductions::default(),
        }
    }

    /// Handle of this member
    pub fn id(&self) -> MemberDefId {
        self.id
    }

    /// Host metadata of the member
    pub fn info(&self) -> &MemberInfo {
        &self.info
    }

    /// Simple name
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// `Type.Member` display name
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Method, property or event
    pub fn kind(&self) -> MemberKind {
        self.info.kind
    }

    /// Target or mixin declaring the member
    pub fn declaring_entity(&self) -> DeclaringEntity {
        self.declaring_entity
    }

    /// Target type or mixin type owning the member
    pub fn entity_type(&self) -> TypeId {
        self.entity_type
    }

    /// Override marker declared on the member
    pub fn override_marker(&self) -> Option<OverrideMarker> {
        self.override_marker
    }

    /// The member this one overrides
    pub fn base_as_member(&self) -> Option<MemberDefId> {
        self.base_as_member
    }

    /// Members overriding this one
    pub fn overrides(&self) -> &[MemberDefId] {
        &self.overrides
    }

    /// Introductions received from overriders
    pub fn introductions(&self) -> &AnnotationIntroductions {
        &self.introductions
    }

    pub(crate) fn introductions_mut(&mut self) -> &mut AnnotationIntroductions {
        &mut self.introductions
    }
}

impl ChainMember for MemberDefinition {
    fn declaring_type(&self) -> TypeId {
        self.info.declaring_type
    }

    fn slot(&self) -> MemberSlot {
        self.info.slot
    }
}

impl Annotatable for MemberDefinition {
    fn entity_kind(&self) -> EntityKind {
        EntityKind::of_member(self.info.kind)
    }

    fn display_name(&self) -> &str {
        &self.full_name
    }

    fn annotations(&self) -> &[AnnotationDefinition] {
        &self.annotations
    }

    fn add_annotation(&mut self, annotation: AnnotationDefinition) {
        self.annotations.push(annotation);
    }
}

/// Member definitions of one plan, addressed by [`MemberDefId`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberArena {
    members: Vec<MemberDefinition>,
}

impl MemberArena {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle the next pushed member will receive
    pub fn next_id(&self) -> MemberDefId {
        MemberDefId::new(self.members.len())
    }

    /// Add a member; its handle must be [`MemberArena::next_id`]
    pub fn push(&mut self, member: MemberDefinition) -> MemberDefId {
        let id = member.id;
        debug_assert_eq!(id, self.next_id());
        self.members.push(member);
        id
    }

    /// Look up a member
    pub fn get(&self, id: MemberDefId) -> Option<&MemberDefinition> {
        self.members.get(id.index())
    }

    pub(crate) fn get_mut(&mut self, id: MemberDefId) -> Option<&mut MemberDefinition> {
        self.members.get_mut(id.index())
    }

    /// Record that `overrider` overrides `base`, in both directions
    pub fn link(&mut self, overrider: MemberDefId, base: MemberDefId) {
        if let Some(member) = self.members.get_mut(overrider.index()) {
            member.base_as_member = Some(base);
        }
        if let Some(member) = self.members.get_mut(base.index()) {
            if !member.overrides.contains(&overrider) {
                member.overrides.push(overrider);
            }
        }
    }

    /// Members in handle order
    pub fn iter(&self) -> impl Iterator<Item = &MemberDefinition> + '_ {
        self.members.iter()
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the arena is empty
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// One configured mixin inside a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixinDefinition {
    id: MixinId,
    entry: MixinEntry,
    name: String,
    entity_kind: EntityKind,
    index: usize,
    members: Vec<MemberDefId>,
    next_call_interfaces: Vec<TypeId>,
    base_dependencies: Vec<DependencyId>,
    next_call_dependencies: Vec<DependencyId>,
    target_call_dependencies: Vec<DependencyId>,
    suppressed_annotations: Vec<TypeId>,
    non_introduced_annotations: Vec<TypeId>,
    annotations: Vec<AnnotationDefinition>,
    introductions: AnnotationIntroductions,
}

impl MixinDefinition {
    pub(crate) fn new(id: MixinId, entry: MixinEntry, name: String, entity_kind: EntityKind) -> Self {
        Self {
            id,
            index: id.index(),
            entry,
            name,
            entity_kind,
            members: Vec::new(),
            next_call_interfaces: Vec::new(),
            base_dependencies: Vec::new(),
            next_call_dependencies: Vec::new(),
            target_call_dependencies: Vec::new(),
            suppressed_annotations: Vec::new(),
            non_introduced_annotations: Vec::new(),
            annotations: Vec::new(),
            introductions: AnnotationIntroductions::default(),
        }
    }

    /// Handle of this mixin, in declaration order
    pub fn id(&self) -> MixinId {
        self.id
    }

    /// Configuration entry the mixin was instantiated from
    pub fn entry(&self) -> &MixinEntry {
        &self.entry
    }

    /// The mixin type
    pub fn mixin_type(&self) -> TypeId {
        self.entry.mixin_type()
    }

    /// Full name of the mixin type
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position in the final mixin order
    pub fn index(&self) -> usize {
        self.index
    }

    /// Members contributed by the mixin
    pub fn members(&self) -> &[MemberDefId] {
        &self.members
    }

    /// Dependencies on the unmixed target
    pub fn base_dependencies(&self) -> &[DependencyId] {
        &self.base_dependencies
    }

    /// Dependencies on the next element of the chain
    pub fn next_call_dependencies(&self) -> &[DependencyId] {
        &self.next_call_dependencies
    }

    /// Dependencies on the composed target
    pub fn target_call_dependencies(&self) -> &[DependencyId] {
        &self.target_call_dependencies
    }

    /// Annotation types this mixin suppresses on other mixins
    pub fn suppressed_annotations(&self) -> &[TypeId] {
        &self.suppressed_annotations
    }

    /// Annotation types this mixin does not introduce
    pub fn non_introduced_annotations(&self) -> &[TypeId] {
        &self.non_introduced_annotations
    }

    /// Introductions this mixin makes onto the target
    pub fn introductions(&self) -> &AnnotationIntroductions {
        &self.introductions
    }

    fn dependencies_mut(&mut self, kind: DependencyKind) -> &mut Vec<DependencyId> {
        match kind {
            DependencyKind::Base => &mut self.base_dependencies,
            DependencyKind::NextCall => &mut self.next_call_dependencies,
            DependencyKind::TargetCall => &mut self.target_call_dependencies,
        }
    }
}

impl DependencyNode for MixinDefinition {
    fn mixin_type(&self) -> TypeId {
        self.entry.mixin_type()
    }

    fn explicit_dependencies(&self) -> Vec<TypeId> {
        self.entry.explicit_dependencies().collect()
    }

    fn next_call_dependencies(&self) -> Vec<TypeId> {
        self.next_call_interfaces.clone()
    }
}

impl Annotatable for MixinDefinition {
    fn entity_kind(&self) -> EntityKind {
        self.entity_kind
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn annotations(&self) -> &[AnnotationDefinition] {
        &self.annotations
    }

    fn add_annotation(&mut self, annotation: AnnotationDefinition) {
        self.annotations.push(annotation);
    }
}

/// What a required type is needed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RequirementKind {
    /// Interface the composed type must fully expose
    Face,
    /// Interface the unmixed target must provide
    Base,
    /// Interface the next element of the chain must provide
    NextCall,
    /// Type the composed target must be usable as
    TargetCall,
}

impl From<DependencyKind> for RequirementKind {
    fn from(kind: DependencyKind) -> Self {
        match kind {
            DependencyKind::Base => RequirementKind::Base,
            DependencyKind::NextCall => RequirementKind::NextCall,
            DependencyKind::TargetCall => RequirementKind::TargetCall,
        }
    }
}

/// One distinct required type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementDefinition {
    id: RequirementId,
    kind: RequirementKind,
    required_type: TypeId,
    name: String,
    is_aggregator: bool,
    requiring_dependencies: Vec<DependencyId>,
}

impl RequirementDefinition {
    /// Handle of this requirement
    pub fn id(&self) -> RequirementId {
        self.id
    }

    /// What the type is required for
    pub fn kind(&self) -> RequirementKind {
        self.kind
    }

    /// The required type
    pub fn required_type(&self) -> TypeId {
        self.required_type
    }

    /// Full name of the required type
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the requirement is satisfied through its base interfaces
    pub fn is_aggregator(&self) -> bool {
        self.is_aggregator
    }

    /// Every dependency edge demanding this requirement
    pub fn requiring_dependencies(&self) -> &[DependencyId] {
        &self.requiring_dependencies
    }
}

/// A dependency edge from a mixin to a requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDefinition {
    id: DependencyId,
    kind: DependencyKind,
    requirement: RequirementId,
    owning_mixin: MixinId,
    aggregator: Option<DependencyId>,
    aggregated: Vec<DependencyId>,
}

impl DependencyDefinition {
    /// Handle of this dependency
    pub fn id(&self) -> DependencyId {
        self.id
    }

    /// Base, next-call or target-call
    pub fn kind(&self) -> DependencyKind {
        self.kind
    }

    /// The requirement this edge points at
    pub fn requirement(&self) -> RequirementId {
        self.requirement
    }

    /// Mixin declaring the dependency
    pub fn owning_mixin(&self) -> MixinId {
        self.owning_mixin
    }

    /// Aggregating dependency this one was expanded from
    pub fn aggregator(&self) -> Option<DependencyId> {
        self.aggregator
    }

    /// Dependencies expanded from this one
    pub fn aggregated(&self) -> &[DependencyId] {
        &self.aggregated
    }
}

/// Immutable composition plan for one target type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetClassDefinition {
    ty: TypeId,
    name: String,
    entity_kind: EntityKind,
    context: ClassContext,
    target_members: Vec<MemberDefId>,
    members: MemberArena,
    mixins: Vec<MixinDefinition>,
    mixin_order: Vec<MixinId>,
    requirements: Vec<RequirementDefinition>,
    dependencies: Vec<DependencyDefinition>,
    suppressed_annotations: Vec<TypeId>,
    annotations: Vec<AnnotationDefinition>,
    introductions: AnnotationIntroductions,
}

impl TargetClassDefinition {
    pub(crate) fn new(ty: TypeId, name: String, entity_kind: EntityKind, context: ClassContext) -> Self {
        Self {
            ty,
            name,
            entity_kind,
            context,
            target_members: Vec::new(),
            members: MemberArena::new(),
            mixins: Vec::new(),
            mixin_order: Vec::new(),
            requirements: Vec::new(),
            dependencies: Vec::new(),
            suppressed_annotations: Vec::new(),
            annotations: Vec::new(),
            introductions: AnnotationIntroductions::default(),
        }
    }

    /// The target type
    pub fn ty(&self) -> TypeId {
        self.ty
    }

    /// Full name of the target type
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Context the plan was built from
    pub fn context(&self) -> &ClassContext {
        &self.context
    }

    /// Mixins in final order
    pub fn mixins(&self) -> impl Iterator<Item = &MixinDefinition> + '_ {
        self.mixin_order
            .iter()
            .filter_map(|id| self.mixins.get(id.index()))
    }

    /// Number of mixins
    pub fn mixin_count(&self) -> usize {
        self.mixins.len()
    }

    /// Look up a mixin by handle
    pub fn mixin(&self, id: MixinId) -> Option<&MixinDefinition> {
        self.mixins.get(id.index())
    }

    /// Look up a mixin by its type
    pub fn mixin_by_type(&self, mixin_type: TypeId) -> Option<&MixinDefinition> {
        self.mixins.iter().find(|m| m.mixin_type() == mixin_type)
    }

    /// All member definitions
    pub fn members(&self) -> &MemberArena {
        &self.members
    }

    /// Look up a member by handle
    pub fn member(&self, id: MemberDefId) -> Option<&MemberDefinition> {
        self.members.get(id)
    }

    /// Members of the target class visible to mixins
    pub fn target_members(&self) -> impl Iterator<Item = &MemberDefinition> + '_ {
        self.target_members
            .iter()
            .filter_map(|&id| self.members.get(id))
    }

    /// Target member with the given name and kind
    pub fn target_member(&self, kind: MemberKind, name: &str) -> Option<&MemberDefinition> {
        self.target_members()
            .find(|m| m.kind() == kind && m.name() == name)
    }

    /// Members contributed by a mixin
    pub fn mixin_members(&self, id: MixinId) -> impl Iterator<Item = &MemberDefinition> + '_ {
        self.mixin(id)
            .map(|m| m.members())
            .unwrap_or_default()
            .iter()
            .filter_map(|&member| self.members.get(member))
    }

    /// Required types
    pub fn requirements(&self) -> &[RequirementDefinition] {
        &self.requirements
    }

    /// Requirement of the given kind on `ty`
    pub fn requirement(&self, kind: RequirementKind, ty: TypeId) -> Option<&RequirementDefinition> {
        self.requirements
            .iter()
            .find(|r| r.kind == kind && r.required_type == ty)
    }

    /// Dependency edges
    pub fn dependencies(&self) -> &[DependencyDefinition] {
        &self.dependencies
    }

    /// Look up a dependency by handle
    pub fn dependency(&self, id: DependencyId) -> Option<&DependencyDefinition> {
        self.dependencies.get(id.index())
    }

    /// Annotation types the target suppresses on its mixins
    pub fn suppressed_annotations(&self) -> &[TypeId] {
        &self.suppressed_annotations
    }

    /// Introductions the mixins make onto the target
    pub fn introductions(&self) -> &AnnotationIntroductions {
        &self.introductions
    }

    fn add_requirement(&mut self, kind: RequirementKind, required_type: TypeId, name: &str, is_aggregator: bool) -> RequirementId {
        if let Some(existing) = self.requirement(kind, required_type) {
            return existing.id;
        }
        let id = RequirementId::new(self.requirements.len());
        self.requirements.push(RequirementDefinition {
            id,
            kind,
            required_type,
            name: name.to_string(),
            is_aggregator,
            requiring_dependencies: Vec::new(),
        });
        id
    }

    fn add_dependency(
        &mut self,
        owning_mixin: MixinId,
        kind: DependencyKind,
        requirement: RequirementId,
        aggregator: Option<DependencyId>,
    ) -> DependencyId {
        let id = DependencyId::new(self.dependencies.len());
        self.dependencies.push(DependencyDefinition {
            id,
            kind,
            requirement,
            owning_mixin,
            aggregator,
            aggregated: Vec::new(),
        });
        if let Some(requirement) = self.requirements.get_mut(requirement.index()) {
            requirement.requiring_dependencies.push(id);
        }
        match aggregator.and_then(|parent| self.dependencies.get_mut(parent.index())) {
            Some(parent) => parent.aggregated.push(id),
            None => {
                if let Some(mixin) = self.mixins.get_mut(owning_mixin.index()) {
                    mixin.dependencies_mut(kind).push(id);
                }
            }
        }
        id
    }
}

impl Annotatable for TargetClassDefinition {
    fn entity_kind(&self) -> EntityKind {
        self.entity_kind
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn annotations(&self) -> &[AnnotationDefinition] {
        &self.annotations
    }

    fn add_annotation(&mut self, annotation: AnnotationDefinition) {
        self.annotations.push(annotation);
    }
}
