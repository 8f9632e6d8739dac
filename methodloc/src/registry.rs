//! In-memory type registry.
//!
//! Holds static type metadata (hierarchy, declared members, packages,
//! origins) and exposes it through the [`TypeHandle`]/[`MemberHandle`]
//! traits. Types are defined parent first, so every hierarchy in a
//! registry is acyclic.
//!
//! Registries can also be loaded from a TOML manifest:
//!
//! ```toml
//! [[types]]
//! name = "com.acme.Base"
//!
//! [[types.members]]
//! name = "activate"
//! modifiers = ["protected"]
//! params = ["java.util.Map"]
//!
//! [[types]]
//! name = "com.acme.Component"
//! extends = "com.acme.Base"
//! origin = 1
//! ```

use std::fmt;
use std::ptr;

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::introspect::{MemberHandle, Modifiers, ParameterType, TypeHandle};

/// Identity of the loader that defined a type.
///
/// Two types with the same name but different origins are different types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Deserialize)]
#[serde(transparent)]
pub struct Origin(pub u32);

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index of a type within its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("type `{name}` is already defined by origin {origin}")]
    Duplicate { name: String, origin: Origin },

    #[error("parent {0:?} is not defined in this registry")]
    UnknownParent(TypeId),

    #[error("type `{name}` extends `{parent}`, which is not defined before it")]
    UndefinedParent { name: String, parent: String },

    #[error("invalid registry manifest: {0}")]
    Manifest(#[from] toml::de::Error),
}

/// Registry result type.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Definition of a member declared by a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDef {
    name: String,
    parameter_types: Vec<ParameterType>,
    modifiers: Modifiers,
}

impl MemberDef {
    /// A package-private member without parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameter_types: Vec::new(),
            modifiers: Modifiers::empty(),
        }
    }

    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Appends a parameter.
    pub fn param(mut self, ty: ParameterType) -> Self {
        self.parameter_types.push(ty);
        self
    }

    /// Appends parameters given by canonical name.
    pub fn params<I, S>(mut self, canonical_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameter_types
            .extend(canonical_names.into_iter().map(ParameterType::from_canonical));
        self
    }
}

/// Definition of a type, handed to [`TypeRegistry::define`].
#[derive(Debug, Clone)]
pub struct TypeDef {
    name: String,
    package: Option<String>,
    origin: Origin,
    parent: Option<TypeId>,
    members: Vec<MemberDef>,
}

impl TypeDef {
    /// A root type from the default origin, in the package implied by its
    /// qualified name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package: None,
            origin: Origin::default(),
            parent: None,
            members: Vec::new(),
        }
    }

    /// Overrides the package derived from the name.
    pub fn package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn extends(mut self, parent: TypeId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Declares a member. Members keep their declaration order.
    pub fn member(mut self, member: MemberDef) -> Self {
        self.members.push(member);
        self
    }
}

#[derive(Debug)]
struct TypeData {
    name: String,
    package: String,
    origin: Origin,
    parent: Option<TypeId>,
    members: Vec<MemberDef>,
}

/// Static type metadata, searchable by the resolver.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: Vec<TypeData>,
    /// Types by qualified name, in definition order.
    by_name: IndexMap<String, Vec<TypeId>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a type to the registry.
    ///
    /// Fails if the parent is not defined yet or if a type with the same
    /// name was already defined by the same origin.
    pub fn define(&mut self, def: TypeDef) -> RegistryResult<TypeId> {
        if let Some(parent) = def.parent {
            if parent.index() >= self.types.len() {
                return Err(RegistryError::UnknownParent(parent));
            }
        }
        if self.find(&def.name, def.origin).is_some() {
            return Err(RegistryError::Duplicate {
                name: def.name,
                origin: def.origin,
            });
        }

        let id = TypeId(self.types.len() as u32);
        let package = def.package.unwrap_or_else(|| match def.name.rsplit_once('.') {
            Some((package, _)) => package.to_string(),
            None => String::new(),
        });
        debug!(
            name = %def.name,
            %package,
            origin = %def.origin,
            members = def.members.len(),
            "defined type"
        );

        self.by_name.entry(def.name.clone()).or_default().push(id);
        self.types.push(TypeData {
            name: def.name,
            package,
            origin: def.origin,
            parent: def.parent,
            members: def.members,
        });
        Ok(id)
    }

    /// Returns a handle to a defined type.
    pub fn get(&self, id: TypeId) -> Option<TypeRef<'_>> {
        (id.index() < self.types.len()).then_some(TypeRef { registry: self, id })
    }

    /// Finds the type with the given qualified name defined by `origin`.
    pub fn lookup(&self, name: &str, origin: Origin) -> Option<TypeRef<'_>> {
        self.find(name, origin).map(|id| TypeRef { registry: self, id })
    }

    /// Iterates over all types in definition order.
    pub fn types(&self) -> impl Iterator<Item = TypeRef<'_>> {
        (0..self.types.len()).map(move |index| TypeRef {
            registry: self,
            id: TypeId(index as u32),
        })
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn find(&self, name: &str, origin: Origin) -> Option<TypeId> {
        self.by_name
            .get(name)?
            .iter()
            .copied()
            .find(|id| self.types[id.index()].origin == origin)
    }

    fn data(&self, id: TypeId) -> &TypeData {
        &self.types[id.index()]
    }

    /// Builds a registry from a TOML manifest.
    ///
    /// Types must be listed parent first. `extends` names the type with
    /// that name from the same origin, or failing that the first type
    /// defined with that name.
    pub fn from_toml_str(text: &str) -> RegistryResult<Self> {
        let manifest: Manifest = toml::from_str(text)?;
        let mut registry = Self::new();

        for entry in manifest.types {
            let mut def = TypeDef::new(entry.name).origin(entry.origin);
            if let Some(package) = entry.package {
                def = def.package(package);
            }
            if let Some(parent) = entry.extends {
                let id = registry
                    .find(&parent, entry.origin)
                    .or_else(|| registry.by_name.get(&parent).and_then(|ids| ids.first().copied()))
                    .ok_or_else(|| RegistryError::UndefinedParent {
                        name: def.name.clone(),
                        parent: parent.clone(),
                    })?;
                def = def.extends(id);
            }
            for member in entry.members {
                let modifiers = member
                    .modifiers
                    .iter()
                    .fold(Modifiers::empty(), |acc, keyword| acc | keyword.flag());
                def = def.member(MemberDef::new(member.name).modifiers(modifiers).params(member.params));
            }
            registry.define(def)?;
        }

        debug!(types = registry.len(), "loaded registry manifest");
        Ok(registry)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    #[serde(default)]
    types: Vec<TypeEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TypeEntry {
    name: String,
    package: Option<String>,
    #[serde(default)]
    origin: Origin,
    extends: Option<String>,
    #[serde(default)]
    members: Vec<MemberEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MemberEntry {
    name: String,
    #[serde(default)]
    modifiers: Vec<ModifierKeyword>,
    #[serde(default)]
    params: Vec<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ModifierKeyword {
    Public,
    Protected,
    Private,
    Static,
    Abstract,
}

impl ModifierKeyword {
    fn flag(self) -> Modifiers {
        match self {
            ModifierKeyword::Public => Modifiers::PUBLIC,
            ModifierKeyword::Protected => Modifiers::PROTECTED,
            ModifierKeyword::Private => Modifiers::PRIVATE,
            ModifierKeyword::Static => Modifiers::STATIC,
            ModifierKeyword::Abstract => Modifiers::ABSTRACT,
        }
    }
}

/// Handle to a type in a [`TypeRegistry`].
#[derive(Clone, Copy)]
pub struct TypeRef<'r> {
    registry: &'r TypeRegistry,
    id: TypeId,
}

impl<'r> TypeRef<'r> {
    pub fn id(&self) -> TypeId {
        self.id
    }

    fn data(&self) -> &'r TypeData {
        self.registry.data(self.id)
    }
}

impl PartialEq for TypeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.registry, other.registry) && self.id == other.id
    }
}

impl Eq for TypeRef<'_> {}

impl fmt::Debug for TypeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data();
        write!(f, "TypeRef({}{})", data.name, data.origin)
    }
}

impl<'r> TypeHandle for TypeRef<'r> {
    type Member = MemberRef<'r>;
    type Members = Members<'r>;
    type Origin = Origin;

    fn name(&self) -> &str {
        &self.data().name
    }

    fn parent(&self) -> Option<Self> {
        self.data().parent.map(|id| TypeRef {
            registry: self.registry,
            id,
        })
    }

    fn declared_members(&self) -> Members<'r> {
        Members {
            owner: *self,
            next: 0,
        }
    }

    fn package(&self) -> &str {
        &self.data().package
    }

    fn origin(&self) -> Origin {
        self.data().origin
    }
}

/// Iterator over the members a registry type declares.
#[derive(Debug, Clone)]
pub struct Members<'r> {
    owner: TypeRef<'r>,
    next: usize,
}

impl<'r> Iterator for Members<'r> {
    type Item = MemberRef<'r>;

    fn next(&mut self) -> Option<MemberRef<'r>> {
        if self.next >= self.owner.data().members.len() {
            return None;
        }
        let member = MemberRef {
            owner: self.owner,
            index: self.next,
        };
        self.next += 1;
        Some(member)
    }
}

/// Handle to a member declared by a registry type.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MemberRef<'r> {
    owner: TypeRef<'r>,
    index: usize,
}

impl<'r> MemberRef<'r> {
    fn def(&self) -> &'r MemberDef {
        &self.owner.data().members[self.index]
    }
}

impl fmt::Debug for MemberRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let def = self.def();
        let params: Vec<&str> = def.parameter_types.iter().map(|ty| ty.canonical_name()).collect();
        write!(f, "MemberRef({}.{}({}))", self.owner.data().name, def.name, params.join(", "))
    }
}

impl<'r> MemberHandle for MemberRef<'r> {
    type Type = TypeRef<'r>;

    fn name(&self) -> &str {
        &self.def().name
    }

    fn parameter_types(&self) -> &[ParameterType] {
        &self.def().parameter_types
    }

    fn declaring_type(&self) -> TypeRef<'r> {
        self.owner
    }

    fn modifiers(&self) -> Modifiers {
        self.def().modifiers
    }
}
