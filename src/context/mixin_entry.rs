// Copyright 2025 Cowboy AI, LLC.

//! Mixin entries and the ordered collection holding them

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use crate::types::{generic_normalized, Ascription, TypeId, TypeIntrospector};

/// How a mixin relates to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MixinKind {
    /// The mixin extends the target's public surface
    Extending,
    /// The target merely uses the mixin as a dependency provider
    Used,
}

/// Exposure of members a mixin introduces into the composed type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MemberVisibility {
    /// Introduced members are only reachable through their interfaces
    #[default]
    Private,
    /// Introduced members become public members of the composed type
    Public,
}

/// One configured mixin of a class context
///
/// Equality and hashing ignore the order of the explicit dependencies.
/// Dependencies on the root type are always satisfied and never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixinEntry {
    kind: MixinKind,
    mixin_type: TypeId,
    visibility: MemberVisibility,
    explicit_dependencies: IndexSet<TypeId>,
}

impl MixinEntry {
    /// Create an entry without explicit dependencies
    pub fn new(kind: MixinKind, mixin_type: TypeId) -> Self {
        Self {
            kind,
            mixin_type,
            visibility: MemberVisibility::default(),
            explicit_dependencies: IndexSet::new(),
        }
    }

    /// Entry for a mixin extending the target
    pub fn extending(mixin_type: TypeId) -> Self {
        Self::new(MixinKind::Extending, mixin_type)
    }

    /// Entry for a mixin used by the target
    pub fn used(mixin_type: TypeId) -> Self {
        Self::new(MixinKind::Used, mixin_type)
    }

    /// Set the visibility of introduced members
    pub fn with_visibility(mut self, visibility: MemberVisibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Add an explicit dependency
    pub fn with_dependency(mut self, dependency: TypeId) -> Self {
        if !dependency.is_root() {
            self.explicit_dependencies.insert(dependency);
        }
        self
    }

    /// Add several explicit dependencies
    pub fn with_dependencies(self, dependencies: impl IntoIterator<Item = TypeId>) -> Self {
        dependencies
            .into_iter()
            .fold(self, |entry, dependency| entry.with_dependency(dependency))
    }

    /// Extending or used
    pub fn kind(&self) -> MixinKind {
        self.kind
    }

    /// The mixin type
    pub fn mixin_type(&self) -> TypeId {
        self.mixin_type
    }

    /// Visibility of introduced members
    pub fn visibility(&self) -> MemberVisibility {
        self.visibility
    }

    /// Explicit dependencies in declaration order
    pub fn explicit_dependencies(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.explicit_dependencies.iter().copied()
    }

    /// Whether the entry explicitly depends on `ty`
    pub fn depends_on(&self, ty: TypeId) -> bool {
        self.explicit_dependencies.contains(&ty)
    }
}

impl PartialEq for MixinEntry {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.mixin_type == other.mixin_type
            && self.visibility == other.visibility
            && self.explicit_dependencies == other.explicit_dependencies
    }
}

impl Eq for MixinEntry {}

impl Hash for MixinEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.mixin_type.hash(state);
        self.visibility.hash(state);
        let mut dependencies: Vec<_> = self.explicit_dependencies.iter().collect();
        dependencies.sort();
        dependencies.hash(state);
    }
}

/// Mixin entries keyed by mixin type
///
/// Enumeration follows insertion order, but equality does not depend on it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<MixinEntry>", into = "Vec<MixinEntry>")]
pub struct MixinEntryCollection {
    entries: IndexMap<TypeId, MixinEntry>,
}

impl MixinEntryCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry; returns `false` and leaves the collection unchanged when
    /// an entry for the same mixin type already exists
    pub fn add(&mut self, entry: MixinEntry) -> bool {
        if self.entries.contains_key(&entry.mixin_type) {
            return false;
        }
        self.entries.insert(entry.mixin_type, entry);
        true
    }

    /// Entry configured for exactly this mixin type
    pub fn get(&self, mixin_type: TypeId) -> Option<&MixinEntry> {
        self.entries.get(&mixin_type)
    }

    /// Whether an entry exists for exactly this mixin type
    pub fn contains(&self, mixin_type: TypeId) -> bool {
        self.entries.contains_key(&mixin_type)
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &MixinEntry> + '_ {
        self.entries.values()
    }

    /// Mixin types in insertion order
    pub fn mixin_types(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.entries.keys().copied()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any entry's mixin type is assignable to or from `ty`
    pub fn contains_assignable_mixin(&self, ty: TypeId, types: &dyn TypeIntrospector) -> bool {
        self.entries.keys().any(|&mixin| {
            types.is_assignable_from(ty, mixin) || types.is_assignable_from(mixin, ty)
        })
    }

    /// Entry that overrides `ty`: the same type, or a more specific one, where
    /// an open generic definition stands for all of its specializations
    pub fn override_for_mixin(
        &self,
        ty: TypeId,
        types: &dyn TypeIntrospector,
    ) -> Option<&MixinEntry> {
        let searched = generic_normalized(types, ty);
        self.entries
            .values()
            .find(|entry| Ascription::of(types, entry.mixin_type, searched).is_related())
    }

    /// Whether some entry overrides `ty`
    pub fn contains_override_for_mixin(&self, ty: TypeId, types: &dyn TypeIntrospector) -> bool {
        self.override_for_mixin(ty, types).is_some()
    }

    /// Union by mixin type identity; entries of `self` win
    pub fn union(&self, other: &MixinEntryCollection) -> MixinEntryCollection {
        let mut merged = self.clone();
        for entry in other.iter() {
            merged.add(entry.clone());
        }
        merged
    }
}

impl PartialEq for MixinEntryCollection {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for MixinEntryCollection {}

impl Hash for MixinEntryCollection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut keys: Vec<_> = self.entries.keys().collect();
        keys.sort();
        for key in keys {
            self.entries[key].hash(state);
        }
    }
}

impl From<Vec<MixinEntry>> for MixinEntryCollection {
    fn from(entries: Vec<MixinEntry>) -> Self {
        let mut collection = Self::new();
        for entry in entries {
            collection.add(entry);
        }
        collection
    }
}

impl From<MixinEntryCollection> for Vec<MixinEntry> {
    fn from(collection: MixinEntryCollection) -> Self {
        collection.entries.into_values().collect()
    }
}

impl<'a> IntoIterator for &'a MixinEntryCollection {
    type Item = &'a MixinEntry;
    type IntoIter = indexmap::map::Values<'a, TypeId, MixinEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}
