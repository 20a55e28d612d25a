// Copyright 2025 Cowboy AI, LLC.

//! Arena-backed, statically declared type graph
//!
//! `TypeUniverse` lets hosts without runtime reflection describe the types
//! taking part in composition. Types and members receive integer handles in
//! declaration order; the root type is always handle 0.

use indexmap::IndexSet;
use std::collections::HashMap;

use super::members::{MemberDecl, MemberId, MemberInfo};
use super::{TypeId, TypeIntrospector};
use crate::annotations::{Annotation, AnnotationSource};

/// Shape of a declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// A class (or struct)
    Class,
    /// An interface
    Interface,
    /// An unbound generic parameter
    GenericParameter,
}

/// Declaration of a type, before it receives a handle
#[derive(Debug, Clone)]
pub struct TypeDecl {
    name: String,
    kind: TypeKind,
    base: Option<TypeId>,
    interfaces: Vec<TypeId>,
    generic_parameters: usize,
    specialization: Option<(TypeId, Vec<TypeId>)>,
    declaring_type: Option<TypeId>,
}

impl TypeDecl {
    fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            base: None,
            interfaces: Vec::new(),
            generic_parameters: 0,
            specialization: None,
            declaring_type: None,
        }
    }

    /// Declare a class deriving from the root type unless `extends` says otherwise
    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Class)
    }

    /// Declare an interface
    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Interface)
    }

    /// Declare an unbound generic parameter
    pub fn generic_parameter(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::GenericParameter)
    }

    /// Set the base class
    pub fn extends(mut self, base: TypeId) -> Self {
        self.base = Some(base);
        self
    }

    /// Add an implemented (or, for interfaces, inherited) interface
    pub fn implements(mut self, interface: TypeId) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Make this an open generic definition with `count` parameters
    pub fn generic_definition(mut self, count: usize) -> Self {
        self.generic_parameters = count;
        self
    }

    /// Make this a constructed generic of `definition`
    pub fn specialization_of(
        mut self,
        definition: TypeId,
        arguments: impl IntoIterator<Item = TypeId>,
    ) -> Self {
        self.specialization = Some((definition, arguments.into_iter().collect()));
        self
    }

    /// Declare the type inside `outer`
    pub fn nested_in(mut self, outer: TypeId) -> Self {
        self.declaring_type = Some(outer);
        self
    }
}

#[derive(Debug, Clone)]
struct TypeEntry {
    name: String,
    kind: TypeKind,
    base: Option<TypeId>,
    interfaces: Vec<TypeId>,
    generic_parameters: usize,
    generic_definition: Option<TypeId>,
    generic_arguments: Vec<TypeId>,
    declaring_type: Option<TypeId>,
    members: Vec<MemberId>,
    annotations: Vec<Annotation>,
}

/// In-memory type graph implementing [`TypeIntrospector`]
#[derive(Debug, Clone)]
pub struct TypeUniverse {
    types: Vec<TypeEntry>,
    members: Vec<MemberInfo>,
    member_annotations: Vec<Vec<Annotation>>,
    by_name: HashMap<String, TypeId>,
}

impl TypeUniverse {
    /// Create a universe containing only the root type `object`
    pub fn new() -> Self {
        let mut universe = Self {
            types: Vec::new(),
            members: Vec::new(),
            member_annotations: Vec::new(),
            by_name: HashMap::new(),
        };
        universe.push_type(TypeEntry {
            name: "object".to_string(),
            kind: TypeKind::Class,
            base: None,
            interfaces: Vec::new(),
            generic_parameters: 0,
            generic_definition: None,
            generic_arguments: Vec::new(),
            declaring_type: None,
            members: Vec::new(),
            annotations: Vec::new(),
        });
        universe
    }

    fn push_type(&mut self, entry: TypeEntry) -> TypeId {
        let id = TypeId::new(self.types.len() as u32);
        self.by_name.insert(entry.name.clone(), id);
        self.types.push(entry);
        id
    }

    /// Register a type and return its handle
    pub fn declare(&mut self, decl: TypeDecl) -> TypeId {
        let base = match decl.kind {
            TypeKind::Class => Some(decl.base.unwrap_or(TypeId::ROOT)),
            TypeKind::Interface | TypeKind::GenericParameter => None,
        };
        let (generic_definition, generic_arguments) = match decl.specialization {
            Some((definition, arguments)) => (Some(definition), arguments),
            None => (None, Vec::new()),
        };
        self.push_type(TypeEntry {
            name: decl.name,
            kind: decl.kind,
            base,
            interfaces: decl.interfaces,
            generic_parameters: decl.generic_parameters,
            generic_definition,
            generic_arguments,
            declaring_type: decl.declaring_type,
            members: Vec::new(),
            annotations: Vec::new(),
        })
    }

    /// Declare a member on `ty` and return its handle
    pub fn add_member(&mut self, ty: TypeId, decl: MemberDecl) -> MemberId {
        let id = MemberId::new(self.members.len() as u32);
        self.members.push(MemberInfo {
            id,
            name: decl.name,
            kind: decl.kind,
            signature: decl.signature,
            declaring_type: ty,
            visibility: decl.visibility,
            slot: decl.slot,
            explicit_interface: decl.explicit_interface,
        });
        self.member_annotations.push(Vec::new());
        self.types[ty.index()].members.push(id);
        id
    }

    /// Attach an annotation to a type or member
    pub fn annotate(&mut self, source: AnnotationSource, annotation: Annotation) {
        match source {
            AnnotationSource::Type(ty) => self.types[ty.index()].annotations.push(annotation),
            AnnotationSource::Member(member) => {
                self.member_annotations[member.index()].push(annotation)
            }
        }
    }

    /// Look up a type by its full name
    pub fn type_by_name(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// Kind of a declared type
    pub fn kind(&self, ty: TypeId) -> TypeKind {
        self.types[ty.index()].kind
    }

    /// Generic arguments of a constructed generic
    pub fn generic_arguments(&self, ty: TypeId) -> &[TypeId] {
        &self.types[ty.index()].generic_arguments
    }

    /// Number of declared types, including the root type
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    fn entry(&self, ty: TypeId) -> &TypeEntry {
        &self.types[ty.index()]
    }

    fn collect_interfaces(&self, ty: TypeId, into: &mut IndexSet<TypeId>) {
        let entry = self.entry(ty);
        for &iface in &entry.interfaces {
            if into.insert(iface) {
                self.collect_interfaces(iface, into);
            }
        }
        if let Some(base) = entry.base {
            self.collect_interfaces(base, into);
        }
    }
}

impl Default for TypeUniverse {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeIntrospector for TypeUniverse {
    fn full_name(&self, ty: TypeId) -> &str {
        &self.entry(ty).name
    }

    fn is_assignable_from(&self, target: TypeId, source: TypeId) -> bool {
        if target == source {
            return true;
        }
        if target.is_root() {
            return self.kind(source) != TypeKind::GenericParameter;
        }
        if self.is_interface(target) {
            return self.interfaces(source).contains(&target);
        }
        let mut current = self.entry(source).base;
        while let Some(base) = current {
            if base == target {
                return true;
            }
            current = self.entry(base).base;
        }
        false
    }

    fn is_interface(&self, ty: TypeId) -> bool {
        self.kind(ty) == TypeKind::Interface
    }

    fn is_generic_type_definition(&self, ty: TypeId) -> bool {
        self.entry(ty).generic_parameters > 0
    }

    fn generic_type_definition(&self, ty: TypeId) -> Option<TypeId> {
        if self.is_generic_type_definition(ty) {
            Some(ty)
        } else {
            self.entry(ty).generic_definition
        }
    }

    fn contains_generic_parameters(&self, ty: TypeId) -> bool {
        let entry = self.entry(ty);
        entry.kind == TypeKind::GenericParameter
            || entry.generic_parameters > 0
            || entry
                .generic_arguments
                .iter()
                .any(|&arg| self.contains_generic_parameters(arg))
    }

    fn base_type(&self, ty: TypeId) -> Option<TypeId> {
        self.entry(ty).base
    }

    fn interfaces(&self, ty: TypeId) -> Vec<TypeId> {
        let mut all = IndexSet::new();
        self.collect_interfaces(ty, &mut all);
        all.into_iter().collect()
    }

    fn declared_interfaces(&self, ty: TypeId) -> Vec<TypeId> {
        self.entry(ty).interfaces.clone()
    }

    fn nested_types(&self, ty: TypeId) -> Vec<TypeId> {
        self.types
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.declaring_type == Some(ty))
            .map(|(index, _)| TypeId::new(index as u32))
            .collect()
    }

    fn is_nested(&self, ty: TypeId) -> bool {
        self.entry(ty).declaring_type.is_some()
    }

    fn members(&self, ty: TypeId) -> Vec<MemberInfo> {
        let mut chain = vec![ty];
        let mut current = self.entry(ty).base;
        while let Some(base) = current {
            chain.push(base);
            current = self.entry(base).base;
        }
        chain
            .into_iter()
            .rev()
            .flat_map(|t| self.declared_members(t))
            .collect()
    }

    fn declared_members(&self, ty: TypeId) -> Vec<MemberInfo> {
        self.entry(ty)
            .members
            .iter()
            .map(|id| self.members[id.index()].clone())
            .collect()
    }

    fn annotations(&self, source: AnnotationSource) -> Vec<Annotation> {
        match source {
            AnnotationSource::Type(ty) => self.entry(ty).annotations.clone(),
            AnnotationSource::Member(member) => self
                .member_annotations
                .get(member.index())
                .cloned()
                .unwrap_or_default(),
        }
    }

    fn member(&self, id: MemberId) -> Option<MemberInfo> {
        self.members.get(id.index()).cloned()
    }
}
