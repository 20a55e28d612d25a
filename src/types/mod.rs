// Copyright 2025 Cowboy AI, LLC.

//! Host type introspection
//!
//! The engine never inspects concrete types itself. Everything it needs to
//! know about the type graph (identity, assignability, generics, members,
//! declared annotations) is asked through the [`TypeIntrospector`]
//! capability. [`TypeUniverse`] is an arena-backed implementation for hosts
//! that describe their types statically.

mod members;
mod universe;

pub use members::{MemberDecl, MemberId, MemberInfo, MemberKind, MemberSlot, Signature, Visibility};
pub use universe::{TypeDecl, TypeKind, TypeUniverse};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::annotations::{Annotation, AnnotationSource};

/// Opaque handle identifying a type inside a type universe
///
/// Handles compare by identity. The universal root type always has index 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(u32);

impl TypeId {
    /// The universal root type every class derives from
    pub const ROOT: TypeId = TypeId(0);

    /// Create a handle from an arena index
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Arena index of this handle
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Whether this is the universal root type
    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Capability interface onto the host's type metadata
///
/// Implementations must be deterministic: enumeration order of interfaces,
/// members and annotations is part of the contract, since the engine uses it
/// to break ties.
pub trait TypeIntrospector: Send + Sync {
    /// Fully qualified display name of a type
    fn full_name(&self, ty: TypeId) -> &str;

    /// The universal root type
    fn root_type(&self) -> TypeId {
        TypeId::ROOT
    }

    /// Whether a value of `source` can be used where `target` is expected
    fn is_assignable_from(&self, target: TypeId, source: TypeId) -> bool;

    /// Whether the type is an interface
    fn is_interface(&self, ty: TypeId) -> bool;

    /// Whether the type is an open generic definition such as `Repo<>`
    fn is_generic_type_definition(&self, ty: TypeId) -> bool;

    /// Generic definition of a constructed generic, or the type itself for a definition
    fn generic_type_definition(&self, ty: TypeId) -> Option<TypeId>;

    /// Whether the type still has unbound generic parameters anywhere in it
    fn contains_generic_parameters(&self, ty: TypeId) -> bool;

    /// Direct base class
    fn base_type(&self, ty: TypeId) -> Option<TypeId>;

    /// Every interface implemented by the type, transitively
    fn interfaces(&self, ty: TypeId) -> Vec<TypeId>;

    /// Interfaces named directly in the type's declaration
    fn declared_interfaces(&self, ty: TypeId) -> Vec<TypeId>;

    /// Types declared inside the type
    fn nested_types(&self, ty: TypeId) -> Vec<TypeId>;

    /// Whether the type is declared inside another type
    fn is_nested(&self, ty: TypeId) -> bool;

    /// Members declared on the type and on all of its base types, base-most first
    fn members(&self, ty: TypeId) -> Vec<MemberInfo>;

    /// Members declared on the type itself
    fn declared_members(&self, ty: TypeId) -> Vec<MemberInfo>;

    /// Annotations declared on a type or member
    fn annotations(&self, source: AnnotationSource) -> Vec<Annotation>;

    /// Look up a member by handle
    fn member(&self, id: MemberId) -> Option<MemberInfo>;

    /// Whether the type is a constructed generic such as `Repo<Order>`
    fn is_constructed_generic(&self, ty: TypeId) -> bool {
        !self.is_generic_type_definition(ty) && self.generic_type_definition(ty).is_some()
    }

    /// Display name of a member, `Type.Member`
    fn member_name(&self, member: &MemberInfo) -> String {
        format!("{}.{}", self.full_name(member.declaring_type), member.name)
    }
}

/// Map a constructed generic to its open definition, leaving other types unchanged
pub fn generic_normalized(types: &dyn TypeIntrospector, ty: TypeId) -> TypeId {
    if types.is_constructed_generic(ty) {
        types.generic_type_definition(ty).unwrap_or(ty)
    } else {
        ty
    }
}

/// Override-aware relation between two types
///
/// Ascription generalizes subtyping so that an open generic definition is
/// related to each of its closed specializations in both directions. Two
/// different specializations of one definition are not related to each
/// other unless one derives from the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ascription {
    /// No relation
    Unrelated,
    /// Identical, or related through a shared generic definition
    Same,
    /// The type derives from (or implements) the ascribee
    Subtype,
}

impl Ascription {
    /// Relate `ty` to `ascribee`
    pub fn of(types: &dyn TypeIntrospector, ty: TypeId, ascribee: TypeId) -> Self {
        if same_or_generic(types, ty, ascribee) {
            return Ascription::Same;
        }

        let mut current = types.base_type(ty);
        while let Some(base) = current {
            if same_or_generic(types, base, ascribee) {
                return Ascription::Subtype;
            }
            current = types.base_type(base);
        }

        if types
            .interfaces(ty)
            .into_iter()
            .any(|iface| same_or_generic(types, iface, ascribee))
        {
            return Ascription::Subtype;
        }

        Ascription::Unrelated
    }

    /// Whether the two types are related at all
    pub fn is_related(self) -> bool {
        !matches!(self, Ascription::Unrelated)
    }
}

fn same_or_generic(types: &dyn TypeIntrospector, a: TypeId, b: TypeId) -> bool {
    if a == b {
        return true;
    }
    if types.is_generic_type_definition(b) && types.generic_type_definition(a) == Some(b) {
        return true;
    }
    types.is_generic_type_definition(a) && types.generic_type_definition(b) == Some(a)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generic_universe() -> (TypeUniverse, TypeId, TypeId, TypeId, TypeId, TypeId) {
        let mut types = TypeUniverse::new();
        let x = types.declare(TypeDecl::class("app::X"));
        let y = types.declare(TypeDecl::class("app::Y"));
        let def = types.declare(TypeDecl::class("app::G<>").generic_definition(1));
        let gx = types.declare(TypeDecl::class("app::G<X>").specialization_of(def, [x]));
        let gy = types.declare(TypeDecl::class("app::G<Y>").specialization_of(def, [y]));
        (types, x, y, def, gx, gy)
    }

    #[test]
    fn test_open_definition_is_same_as_specialization() {
        let (types, _, _, def, gx, _) = generic_universe();
        assert_eq!(Ascription::of(&types, gx, def), Ascription::Same);
        assert_eq!(Ascription::of(&types, def, gx), Ascription::Same);
    }

    #[test]
    fn test_sibling_specializations_are_unrelated() {
        let (types, x, _, _, gx, gy) = generic_universe();
        assert_eq!(Ascription::of(&types, gx, gy), Ascription::Unrelated);
        assert_eq!(Ascription::of(&types, gx, x), Ascription::Unrelated);
    }

    #[test]
    fn test_subtype_through_generic_base() {
        let mut types = TypeUniverse::new();
        let base_def = types.declare(TypeDecl::class("app::Base<>").generic_definition(1));
        let base_obj = types.declare(
            TypeDecl::class("app::Base<Object>").specialization_of(base_def, [TypeId::ROOT]),
        );
        let derived = types.declare(TypeDecl::class("app::Derived").extends(base_obj));

        assert_eq!(Ascription::of(&types, derived, base_def), Ascription::Subtype);
        assert_eq!(Ascription::of(&types, derived, base_obj), Ascription::Subtype);
        assert_eq!(Ascription::of(&types, base_def, derived), Ascription::Unrelated);
    }

    #[test]
    fn test_generic_normalized() {
        let (types, x, _, def, gx, _) = generic_universe();
        assert_eq!(generic_normalized(&types, gx), def);
        assert_eq!(generic_normalized(&types, def), def);
        assert_eq!(generic_normalized(&types, x), x);
    }
}
