// Copyright 2025 Cowboy AI, LLC.

//! Declarative annotations as tagged data
//!
//! Annotations attached to types and members are plain values. Ordinary
//! user annotations are [`AnnotationKind::Custom`]; every other kind belongs
//! to the engine's own vocabulary (override markers, copy indirections,
//! suppression, declared dependencies) and is consumed by the engine rather
//! than propagated.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{MemberId, MemberKind, TypeId};

/// An entity that can declare annotations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationSource {
    /// A type
    Type(TypeId),
    /// A member
    Member(MemberId),
}

/// Kind of an annotatable entity, used to check copy indirections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// A top-level type
    Type,
    /// A type declared inside another type
    NestedType,
    /// A method
    Method,
    /// A property
    Property,
    /// An event
    Event,
}

impl EntityKind {
    /// Kind of a member entity
    pub fn of_member(kind: MemberKind) -> Self {
        match kind {
            MemberKind::Method => EntityKind::Method,
            MemberKind::Property => EntityKind::Property,
            MemberKind::Event => EntityKind::Event,
        }
    }

    /// Nested and top-level types are interchangeable copy sources
    pub fn unified(self) -> Self {
        match self {
            EntityKind::NestedType => EntityKind::Type,
            other => other,
        }
    }

    /// Whether annotations of an entity of kind `other` may be copied onto this kind
    pub fn accepts(self, other: EntityKind) -> bool {
        self.unified() == other.unified()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Type => "type",
            EntityKind::NestedType => "nested type",
            EntityKind::Method => "method",
            EntityKind::Property => "property",
            EntityKind::Event => "event",
        };
        f.write_str(name)
    }
}

/// Which part of the composition a mixin dependency points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DependencyKind {
    /// The original, unmixed target
    Base,
    /// The next element of the composition chain
    NextCall,
    /// The fully composed target
    TargetCall,
}

/// Where a copy indirection takes its annotations from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyReference {
    /// Type declaring the referenced entity
    pub source_type: TypeId,
    /// Member or nested type name; `None` references the type itself
    pub member_name: Option<String>,
    /// Annotation types to copy; empty copies everything
    pub filter: Vec<TypeId>,
}

impl CopyReference {
    /// Reference the annotations of a type
    pub fn of_type(source_type: TypeId) -> Self {
        Self {
            source_type,
            member_name: None,
            filter: Vec::new(),
        }
    }

    /// Reference the annotations of a named member or nested type
    pub fn of_member(source_type: TypeId, member_name: impl Into<String>) -> Self {
        Self {
            source_type,
            member_name: Some(member_name.into()),
            filter: Vec::new(),
        }
    }

    /// Restrict copying to the given annotation types
    pub fn filtered(mut self, annotation_types: impl IntoIterator<Item = TypeId>) -> Self {
        self.filter = annotation_types.into_iter().collect();
        self
    }
}

/// Tagged annotation payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnotationKind {
    /// A user annotation, identified by its annotation type
    Custom {
        /// Annotation type
        annotation_type: TypeId,
        /// Constructor arguments and named values
        payload: serde_json::Value,
        /// Whether an entity may carry several instances of this type
        allow_multiple: bool,
    },
    /// Apply the annotations of another entity instead of this one
    CopyAnnotations(CopyReference),
    /// A mixin member overrides the target member with the same name and signature
    OverrideTarget,
    /// A target member overrides a mixin member
    OverrideMixin {
        /// Restrict the search to mixins ascribable to this type
        mixin: Option<TypeId>,
    },
    /// Suppress introduction of this annotation type from other mixins
    Suppress(TypeId),
    /// Do not introduce this annotation type from the declaring mixin
    NonIntroduced(TypeId),
    /// A dependency declared by a mixin
    Requires {
        /// Which part of the composition is required
        dependency: DependencyKind,
        /// The required type
        required: TypeId,
    },
}

/// Override direction of a member, read from its override marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverrideMarker {
    /// Mixin member overriding a target member
    Target,
    /// Target member overriding a mixin member, optionally restricted to one mixin type
    Mixin(Option<TypeId>),
}

/// One declared annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// What the annotation says
    pub kind: AnnotationKind,
    /// Whether the entity received it from a base declaration rather than declaring it
    pub inherited: bool,
}

impl Annotation {
    /// User annotation without payload
    pub fn custom(annotation_type: TypeId) -> Self {
        Self::from_kind(AnnotationKind::Custom {
            annotation_type,
            payload: serde_json::Value::Null,
            allow_multiple: false,
        })
    }

    /// Copy indirection
    pub fn copy_from(reference: CopyReference) -> Self {
        Self::from_kind(AnnotationKind::CopyAnnotations(reference))
    }

    /// Marker for a mixin member overriding a target member
    pub fn override_target() -> Self {
        Self::from_kind(AnnotationKind::OverrideTarget)
    }

    /// Marker for a target member overriding a mixin member
    pub fn override_mixin(mixin: Option<TypeId>) -> Self {
        Self::from_kind(AnnotationKind::OverrideMixin { mixin })
    }

    /// Suppression of an annotation type coming from other mixins
    pub fn suppress(annotation_type: TypeId) -> Self {
        Self::from_kind(AnnotationKind::Suppress(annotation_type))
    }

    /// Opt-out of introducing an annotation type
    pub fn non_introduced(annotation_type: TypeId) -> Self {
        Self::from_kind(AnnotationKind::NonIntroduced(annotation_type))
    }

    /// Declared mixin dependency
    pub fn requires(dependency: DependencyKind, required: TypeId) -> Self {
        Self::from_kind(AnnotationKind::Requires {
            dependency,
            required,
        })
    }

    fn from_kind(kind: AnnotationKind) -> Self {
        Self {
            kind,
            inherited: false,
        }
    }

    /// Attach a payload to a user annotation
    pub fn with_payload(mut self, value: serde_json::Value) -> Self {
        if let AnnotationKind::Custom { payload, .. } = &mut self.kind {
            *payload = value;
        }
        self
    }

    /// Allow several instances of a user annotation on one entity
    pub fn allowing_multiple(mut self) -> Self {
        if let AnnotationKind::Custom { allow_multiple, .. } = &mut self.kind {
            *allow_multiple = true;
        }
        self
    }

    /// Mark as received from a base declaration
    pub fn inherited(mut self) -> Self {
        self.inherited = true;
        self
    }

    /// Annotation type of a user annotation
    pub fn annotation_type(&self) -> Option<TypeId> {
        match &self.kind {
            AnnotationKind::Custom {
                annotation_type, ..
            } => Some(*annotation_type),
            _ => None,
        }
    }

    /// Whether several instances may coexist on one entity
    pub fn allows_multiple(&self) -> bool {
        matches!(
            self.kind,
            AnnotationKind::Custom {
                allow_multiple: true,
                ..
            }
        )
    }

    /// Whether the annotation belongs to the engine's own vocabulary
    pub fn is_engine_reserved(&self) -> bool {
        !matches!(self.kind, AnnotationKind::Custom { .. })
    }

    /// Override marker carried by this annotation
    pub fn override_marker(&self) -> Option<OverrideMarker> {
        match self.kind {
            AnnotationKind::OverrideTarget => Some(OverrideMarker::Target),
            AnnotationKind::OverrideMixin { mixin } => Some(OverrideMarker::Mixin(mixin)),
            _ => None,
        }
    }
}
