//! Method descriptors and lifecycle method resolution.
//!
//! A component framework needs to find the concrete method that implements
//! a lifecycle callback (`activate`, `deactivate`, ...) somewhere in a
//! component type's inheritance chain. This crate provides the two pieces
//! of that mechanism:
//!
//! - [`MethodDescriptor`]: a compact textual description of a method, such as
//!   `activate`, `activate()` or `activate(java.util.Map, int[])`, with a
//!   parser and a renderer.
//! - [`resolver`]: the hierarchy walk that locates the first accessible
//!   member matching a descriptor, following the component-framework rules
//!   for public, protected, private and package-private members.
//!
//! The type system being searched is abstracted behind the
//! [`TypeHandle`]/[`MemberHandle`] traits. [`TypeRegistry`] is an in-memory
//! implementation of them, and [`CallbackConfig`] maps callback names to
//! descriptor preference lists.
//!
//! # Example
//!
//! ```rust,ignore
//! use methodloc::{MethodDescriptor, TypeRegistry};
//!
//! let registry = TypeRegistry::from_toml_str(MANIFEST)?;
//! let component = registry.lookup("com.acme.Component", Origin::default()).unwrap();
//! let activate = MethodDescriptor::parse("activate(Map)")?;
//! let method = activate.locate(&component, true);
//! ```

pub mod config;
pub mod descriptor;
pub mod introspect;
pub mod registry;
pub mod resolver;

pub use config::{CallbackConfig, ConfigError, ConfigResult};
pub use descriptor::MethodDescriptor;
pub use introspect::{MemberHandle, Modifiers, ParameterType, TypeHandle};
pub use registry::{
    MemberDef, MemberRef, Origin, RegistryError, RegistryResult, TypeDef, TypeId, TypeRef, TypeRegistry,
};
pub use resolver::{check_access, is_accessible, locate, locate_by_preference, matches, AccessDenial};

use thiserror::Error;

/// Errors raised while building descriptors or searching with them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MethodError {
    /// The text, or one parameter type entry of it, does not follow the
    /// descriptor grammar.
    #[error("malformed method descriptor: `{text}`")]
    MalformedDescriptor { text: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

/// Result type for descriptor and resolver operations.
pub type MethodResult<T> = Result<T, MethodError>;
