//! # CIM Mixin
//!
//! Mixin composition and definition resolution for the Composable Information Machine.
//!
//! Given a target type and the mixins configured for it (directly, or
//! inherited through base types, interfaces and open generic definitions),
//! this crate produces one deterministic, validated composition plan:
//! - **Class Contexts**: Per-type mixin configuration and its inheritance
//! - **Dependency Ordering**: Clustered topological order of mixins, with cycle detection
//! - **Override Resolution**: Which member overrides which, across target and mixins
//! - **Member Chains**: Shadowing of same-signature members within one hierarchy
//! - **Annotation Propagation**: Copy indirection, deny rules, suppression and introduction
//! - **Definitions**: The immutable `TargetClassDefinition` graph handed to a weaver
//!
//! ## Design Principles
//!
//! 1. **Host Agnostic**: Type metadata is only reached through [`TypeIntrospector`]
//! 2. **Immutability**: Contexts and definitions are values; inheritance creates new ones
//! 3. **Determinism**: The same input always yields the same plan or the same error
//! 4. **Arena Handles**: Cross references are integer handles, never shared pointers
//! 5. **Build Once**: [`DefinitionCache`] memoizes plans per target type and context

#![warn(missing_docs)]

mod annotations;
mod config;
mod dependency_sort;
mod errors;
mod member_chain;
mod overrides;
mod propagation;
pub mod context;
pub mod definitions;
pub mod types;

pub use annotations::{
    Annotation, AnnotationKind, AnnotationSource, CopyReference, DependencyKind, EntityKind,
    OverrideMarker,
};
pub use config::DefinitionBuilderConfig;
pub use context::{
    ClassContext, ContextInheritanceResolver, ContextOrigin, MemberVisibility, MixinConfiguration,
    MixinEntry, MixinEntryCollection, MixinKind,
};
pub use definitions::{
    DeclaringEntity, DefinitionBuilder, DefinitionCache, DependencyDefinition, DependencyId,
    MemberArena, MemberDefId, MemberDefinition, MixinDefinition, MixinId, RequirementDefinition,
    RequirementId, RequirementKind, TargetClassDefinition,
};
pub use dependency_sort::{DependencyNode, MixinDependencySorter};
pub use errors::{ConfigurationError, ConfigurationResult};
pub use member_chain::{ChainMember, MemberChain};
pub use overrides::OverrideResolver;
pub use propagation::{
    Annotatable, AnnotationDefinition, AnnotationIntroductions, AnnotationPropagator,
    IntroducedAnnotation, IntroductionSource, NonIntroducedAnnotation, SuppressedAnnotation,
    Suppression,
};
pub use types::{
    generic_normalized, Ascription, MemberDecl, MemberId, MemberInfo, MemberKind, MemberSlot,
    Signature, TypeDecl, TypeId, TypeIntrospector, TypeKind, TypeUniverse, Visibility,
};
