// Copyright 2025 Cowboy AI, LLC.

//! Class context model
//!
//! Declarative, per-type composition configuration: which mixins apply to a
//! type, how they are exposed, and which interfaces the composed type must
//! expose completely. Contexts are value objects; inheritance produces new
//! contexts instead of mutating existing ones.

mod class_context;
mod configuration;
mod inheritance;
mod mixin_entry;

pub use class_context::{ClassContext, ContextOrigin};
pub use configuration::MixinConfiguration;
pub use inheritance::ContextInheritanceResolver;
pub use mixin_entry::{MemberVisibility, MixinEntry, MixinEntryCollection, MixinKind};
