// Copyright 2025 Cowboy AI, LLC.

//! Linearization of same-signature members within one class hierarchy
//!
//! Members sharing a name and signature are kept in order of declaring-type
//! specificity: every member's declaring type is assignable from the
//! declaring types of all members after it. A member is overridden when its
//! successor reuses the base slot.

use crate::types::{MemberInfo, MemberSlot, TypeId, TypeIntrospector};

/// Something that sits in a member chain
pub trait ChainMember {
    /// Type that declares the member
    fn declaring_type(&self) -> TypeId;

    /// Virtual dispatch behavior of the member
    fn slot(&self) -> MemberSlot;
}

impl ChainMember for MemberInfo {
    fn declaring_type(&self) -> TypeId {
        self.declaring_type
    }

    fn slot(&self) -> MemberSlot {
        self.slot
    }
}

impl<M: ChainMember> ChainMember for &M {
    fn declaring_type(&self) -> TypeId {
        (**self).declaring_type()
    }

    fn slot(&self) -> MemberSlot {
        (**self).slot()
    }
}

/// Members ordered from least to most specific declaring type
#[derive(Debug, Clone)]
pub struct MemberChain<M> {
    members: Vec<M>,
}

impl<M: ChainMember> MemberChain<M> {
    /// Insert the members one at a time, each before the first member whose
    /// declaring type it is assignable from
    pub fn new(types: &dyn TypeIntrospector, members: impl IntoIterator<Item = M>) -> Self {
        let mut chain: Vec<M> = Vec::new();
        for member in members {
            let declaring = member.declaring_type();
            let position = chain
                .iter()
                .position(|existing| {
                    existing.declaring_type() != declaring
                        && types.is_assignable_from(declaring, existing.declaring_type())
                })
                .unwrap_or(chain.len());
            chain.insert(position, member);
        }
        Self { members: chain }
    }

    /// Members in chain order
    pub fn sorted_members(&self) -> impl Iterator<Item = &M> + '_ {
        self.members.iter()
    }

    /// Whether the member at `position` is overridden by its successor
    pub fn is_overridden_at(&self, position: usize) -> bool {
        self.members
            .get(position + 1)
            .is_some_and(|next| next.slot().reuses_base_slot())
    }

    /// Whether `member` is overridden by its successor
    ///
    /// Members are identified by their declaring type.
    pub fn is_overridden(&self, member: &M) -> bool {
        self.members
            .iter()
            .position(|m| m.declaring_type() == member.declaring_type())
            .is_some_and(|position| self.is_overridden_at(position))
    }

    /// Members that are not overridden, lazily
    pub fn non_overridden_members(&self) -> impl Iterator<Item = &M> + '_ {
        self.members
            .iter()
            .enumerate()
            .filter(|(position, _)| !self.is_overridden_at(*position))
            .map(|(_, member)| member)
    }

    /// Number of members in the chain
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the chain is empty
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
