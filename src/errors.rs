// Copyright 2025 Cowboy AI, LLC.

//! Error types for mixin configuration and definition building
//!
//! Every failure raised by the engine is a deterministic consequence of its
//! input: the same configuration always reproduces the same error. Errors
//! carry display names rather than raw type handles so that messages stay
//! meaningful outside the type universe that produced them.

use thiserror::Error;

/// Errors that can occur while merging class contexts or building definitions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// A configured mixin is less specific than one inherited from a base context
    #[error(
        "The class {target} inherits the mixin {inherited} from {base}, but it is explicitly configured for the less specific mixin {configured}"
    )]
    InheritanceConflict {
        /// Type whose context is being derived
        target: String,
        /// Mixin that would be inherited
        inherited: String,
        /// Type owning the base context
        base: String,
        /// Mixin the target configures itself
        configured: String,
    },

    /// Two entries of one collection share a mixin type
    #[error("The mixin {mixin} is configured more than once for {target}")]
    DuplicateMixin {
        /// Type owning the collection
        target: String,
        /// Mixin type that appears twice
        mixin: String,
    },

    /// A complete interface is not an interface
    #[error("{interface} cannot be a complete interface of {target}, it is not an interface")]
    InvalidCompleteInterface {
        /// Configured type
        target: String,
        /// Offending type
        interface: String,
    },

    /// Mixin dependencies cannot be linearized
    #[error("The mixins of {target} have circular dependencies: {}", cycle.join(", "))]
    CircularDependency {
        /// Type whose mixins are being ordered
        target: String,
        /// Exact set of mixins forming the cycle
        cycle: Vec<String>,
    },

    /// An override-marked member has no base member
    #[error("The member overridden by {overrider} could not be found")]
    OverrideTargetNotFound {
        /// Overriding member
        overrider: String,
    },

    /// An override-marked member matches several base members
    #[error("Ambiguous override: {overrider} could override any of {}", candidates.join(", "))]
    AmbiguousOverride {
        /// Overriding member
        overrider: String,
        /// Every matching candidate
        candidates: Vec<String>,
    },

    /// A base or next-call dependency does not name an interface
    #[error("The mixin {mixin} declares a dependency on {dependency}, which is not an interface")]
    InvalidDependencyTarget {
        /// Mixin declaring the dependency
        mixin: String,
        /// Required type
        dependency: String,
    },

    /// A copy indirection names nothing
    #[error("The annotation copy source {reference} referenced by {member} does not exist")]
    UnknownCopyReference {
        /// Entity carrying the indirection
        member: String,
        /// Textual source name of the indirection
        reference: String,
    },

    /// A copy indirection names more than one entity
    #[error("The annotation copy source {reference} referenced by {member} is ambiguous")]
    AmbiguousCopyReference {
        /// Entity carrying the indirection
        member: String,
        /// Textual source name of the indirection
        reference: String,
    },

    /// A copy indirection names an entity of another kind
    #[error(
        "The annotation copy source {reference} referenced by {member} is a {actual}, expected a {expected}"
    )]
    IncompatibleCopyReference {
        /// Entity carrying the indirection
        member: String,
        /// Textual source name of the indirection
        reference: String,
        /// Kind of the copying entity
        expected: String,
        /// Kind of the referenced entity
        actual: String,
    },

    /// The target type still has open generic parameters
    #[error("Cannot build a definition for {target}, it contains unresolved generic parameters")]
    UnresolvedGenericTarget {
        /// Target type
        target: String,
    },
}

/// Result type for configuration operations
pub type ConfigurationResult<T> = Result<T, ConfigurationError>;

impl ConfigurationError {
    /// Check if this error stems from context merging
    pub fn is_inheritance_error(&self) -> bool {
        matches!(
            self,
            ConfigurationError::InheritanceConflict { .. }
                | ConfigurationError::DuplicateMixin { .. }
                | ConfigurationError::InvalidCompleteInterface { .. }
        )
    }

    /// Check if this error stems from mixin dependencies
    pub fn is_dependency_error(&self) -> bool {
        matches!(
            self,
            ConfigurationError::CircularDependency { .. }
                | ConfigurationError::InvalidDependencyTarget { .. }
        )
    }

    /// Check if this error stems from override resolution
    pub fn is_override_error(&self) -> bool {
        matches!(
            self,
            ConfigurationError::OverrideTargetNotFound { .. }
                | ConfigurationError::AmbiguousOverride { .. }
        )
    }

    /// Check if this error stems from annotation copy indirections
    pub fn is_annotation_error(&self) -> bool {
        matches!(
            self,
            ConfigurationError::UnknownCopyReference { .. }
                | ConfigurationError::AmbiguousCopyReference { .. }
                | ConfigurationError::IncompatibleCopyReference { .. }
        )
    }
}
