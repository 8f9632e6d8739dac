//! Type introspection interface.
//!
//! The resolver never looks at a live type system directly. Anything that can
//! answer the questions below (a build-time type registry, a reflection
//! facility, a class file reader) can be searched for lifecycle methods.

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Access and kind modifiers of a member.
    ///
    /// A member with none of `PUBLIC`, `PROTECTED` and `PRIVATE` set has
    /// package-private (default) access.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const PUBLIC = 1 << 0;
        const PROTECTED = 1 << 1;
        const PRIVATE = 1 << 2;
        const STATIC = 1 << 3;
        const ABSTRACT = 1 << 4;
    }
}

impl Modifiers {
    /// Access flags; at most one of them is expected to be set.
    pub const ACCESS: Modifiers = Modifiers::PUBLIC
        .union(Modifiers::PROTECTED)
        .union(Modifiers::PRIVATE);

    /// Returns true if none of the access flags is set.
    pub fn is_package_private(self) -> bool {
        !self.intersects(Self::ACCESS)
    }

    /// Returns true for static or abstract members, which can never serve as
    /// lifecycle callbacks.
    pub fn is_static_or_abstract(self) -> bool {
        self.intersects(Modifiers::STATIC | Modifiers::ABSTRACT)
    }
}

/// Names of the primitive types, including `void`.
pub const PRIMITIVE_TYPE_NAMES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double", "void",
];

/// The type of one parameter of a member, as reported by introspection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterType {
    canonical_name: String,
    simple_name: String,
    primitive: bool,
}

impl ParameterType {
    /// Creates a parameter type from its parts.
    pub fn new(
        canonical_name: impl Into<String>,
        simple_name: impl Into<String>,
        primitive: bool,
    ) -> Self {
        Self {
            canonical_name: canonical_name.into(),
            simple_name: simple_name.into(),
            primitive,
        }
    }

    /// Creates a parameter type from a canonical name such as `int`,
    /// `java.lang.String` or `java.lang.String[]`.
    ///
    /// The simple name is the last dotted segment. Only the bare primitive
    /// names are primitive; arrays of primitives are not.
    pub fn from_canonical(canonical_name: impl Into<String>) -> Self {
        let canonical_name = canonical_name.into();
        let simple_name = match canonical_name.rsplit_once('.') {
            Some((_, last)) => last.to_string(),
            None => canonical_name.clone(),
        };
        let primitive = PRIMITIVE_TYPE_NAMES.contains(&canonical_name.as_str());
        Self {
            canonical_name,
            simple_name,
            primitive,
        }
    }

    /// The array type whose components are of this type.
    pub fn array_of(&self) -> Self {
        Self {
            canonical_name: format!("{}[]", self.canonical_name),
            simple_name: format!("{}[]", self.simple_name),
            primitive: false,
        }
    }

    /// Fully qualified name, e.g. `java.lang.String`.
    pub fn canonical_name(&self) -> &str {
        &self.canonical_name
    }

    /// Unqualified name, e.g. `String`.
    pub fn simple_name(&self) -> &str {
        &self.simple_name
    }

    pub fn is_primitive(&self) -> bool {
        self.primitive
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_name)
    }
}

/// A handle to a type in the introspected type system.
///
/// Equality must be type identity: two handles are equal iff they denote the
/// same type from the same origin.
pub trait TypeHandle: Clone + PartialEq + fmt::Debug {
    /// Handle to the members this type declares.
    type Member: MemberHandle<Type = Self>;
    /// Iterator over declared members, in declaration order.
    type Members: Iterator<Item = Self::Member>;
    /// Identity of whatever loaded or defined the type.
    type Origin: PartialEq + fmt::Debug;

    /// Qualified name of the type, used for diagnostics.
    fn name(&self) -> &str;

    /// The direct supertype, or `None` at the root of the hierarchy.
    fn parent(&self) -> Option<Self>;

    /// Members declared by this type itself, not inherited ones.
    fn declared_members(&self) -> Self::Members;

    /// Package (namespace) of the type; empty for the default package.
    fn package(&self) -> &str;

    /// Loader or origin identity of the type.
    fn origin(&self) -> Self::Origin;

    /// Returns true if `other` is this type or one of its subtypes.
    ///
    /// Implementations that override this must agree with the chain reported
    /// by [`TypeHandle::parent`].
    fn is_assignable_from(&self, other: &Self) -> bool {
        let mut current = Some(other.clone());
        while let Some(ty) = current {
            if ty == *self {
                return true;
            }
            current = ty.parent();
        }
        false
    }
}

/// A handle to a method-like member of a type.
pub trait MemberHandle: Clone + fmt::Debug {
    type Type: TypeHandle<Member = Self>;

    fn name(&self) -> &str;

    /// Parameter types in declaration order.
    fn parameter_types(&self) -> &[ParameterType];

    /// The type that physically declares this member.
    fn declaring_type(&self) -> Self::Type;

    fn modifiers(&self) -> Modifiers;
}
