// Copyright 2025 Cowboy AI, LLC.

//! Member metadata exposed by the host

use serde::{Deserialize, Serialize};

use super::TypeId;

/// Opaque handle identifying a member inside a type universe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberId(u32);

impl MemberId {
    /// Create a handle from an arena index
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Arena index of this handle
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kinds of members a mixin can contribute or override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MemberKind {
    /// A method
    Method,
    /// A property
    Property,
    /// An event
    Event,
}

impl MemberKind {
    /// All member kinds, in the order overrides are resolved
    pub const ALL: [MemberKind; 3] = [MemberKind::Method, MemberKind::Property, MemberKind::Event];

    /// Lower-case name used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            MemberKind::Method => "method",
            MemberKind::Property => "property",
            MemberKind::Event => "event",
        }
    }
}

/// Accessibility of a member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    /// Visible everywhere
    Public,
    /// Visible to derived types
    Protected,
    /// Visible to derived types and the declaring assembly
    ProtectedInternal,
    /// Visible inside the declaring assembly
    Internal,
    /// Visible to the declaring type only
    Private,
}

/// How a member participates in virtual dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberSlot {
    /// Statically bound
    NonVirtual,
    /// Introduces a virtual slot
    Virtual,
    /// Introduces a virtual slot without an implementation
    Abstract,
    /// Reuses the slot of a base member
    Override,
    /// Reuses the slot of a base member and closes it for further overrides
    Sealed,
    /// Introduces a fresh virtual slot that hides a base member of the same signature
    NewSlot,
}

impl MemberSlot {
    /// Whether a member in this slot may be overridden
    pub fn is_overridable(self) -> bool {
        matches!(
            self,
            MemberSlot::Virtual | MemberSlot::Abstract | MemberSlot::Override | MemberSlot::NewSlot
        )
    }

    /// Whether a member in this slot overrides the same-signature member of its base type
    pub fn reuses_base_slot(self) -> bool {
        matches!(self, MemberSlot::Override | MemberSlot::Sealed)
    }
}

/// Parameter and return types of a member
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Signature {
    /// Parameter types, in order
    pub parameters: Vec<TypeId>,
    /// Return (or property/event) type, `None` for no value
    pub return_type: Option<TypeId>,
}

impl Signature {
    /// Signature with the given parameters and no return value
    pub fn new(parameters: impl IntoIterator<Item = TypeId>) -> Self {
        Self {
            parameters: parameters.into_iter().collect(),
            return_type: None,
        }
    }

    /// Set the return type
    pub fn returning(mut self, ty: TypeId) -> Self {
        self.return_type = Some(ty);
        self
    }
}

/// A member as reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberInfo {
    /// Member handle
    pub id: MemberId,
    /// Simple member name
    pub name: String,
    /// Method, property or event
    pub kind: MemberKind,
    /// Parameter and return types
    pub signature: Signature,
    /// Type that declares the member
    pub declaring_type: TypeId,
    /// Accessibility
    pub visibility: Visibility,
    /// Virtual dispatch behavior
    pub slot: MemberSlot,
    /// Whether the member explicitly implements an interface member
    pub explicit_interface: bool,
}

impl MemberInfo {
    /// Whether mixins can see this member (public, protected, or explicit interface members)
    pub fn is_visible_to_mixins(&self) -> bool {
        self.explicit_interface
            || matches!(
                self.visibility,
                Visibility::Public | Visibility::Protected | Visibility::ProtectedInternal
            )
    }

    /// Whether the two members share kind, name and signature
    pub fn has_same_shape(&self, other: &MemberInfo) -> bool {
        self.kind == other.kind && self.name == other.name && self.signature == other.signature
    }
}

/// Declaration of a member, before it receives a handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDecl {
    /// Simple member name
    pub name: String,
    /// Method, property or event
    pub kind: MemberKind,
    /// Parameter and return types
    pub signature: Signature,
    /// Accessibility
    pub visibility: Visibility,
    /// Virtual dispatch behavior
    pub slot: MemberSlot,
    /// Whether the member explicitly implements an interface member
    pub explicit_interface: bool,
}

impl MemberDecl {
    fn new(name: impl Into<String>, kind: MemberKind) -> Self {
        Self {
            name: name.into(),
            kind,
            signature: Signature::default(),
            visibility: Visibility::Public,
            slot: MemberSlot::Virtual,
            explicit_interface: false,
        }
    }

    /// Public virtual method without parameters
    pub fn method(name: impl Into<String>) -> Self {
        Self::new(name, MemberKind::Method)
    }

    /// Public virtual property
    pub fn property(name: impl Into<String>) -> Self {
        Self::new(name, MemberKind::Property)
    }

    /// Public virtual event
    pub fn event(name: impl Into<String>) -> Self {
        Self::new(name, MemberKind::Event)
    }

    /// Set the signature
    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    /// Set the accessibility
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Set the virtual dispatch behavior
    pub fn with_slot(mut self, slot: MemberSlot) -> Self {
        self.slot = slot;
        self
    }

    /// Mark as an explicit interface implementation
    pub fn explicit_interface(mut self) -> Self {
        self.explicit_interface = true;
        self
    }
}
