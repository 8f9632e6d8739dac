//! Lifecycle method resolution.
//!
//! Locates the method a component framework should invoke for a callback.
//! Accessibility follows the component-framework rules for locating
//! component methods:
//!
//! 1. The declaring type must be the component type or one of its ancestors.
//! 2. Static and abstract methods are never candidates.
//! 3. Public and protected methods are accessible.
//! 4. Private methods are accessible only when declared by the component
//!    type itself, and only if the caller allows private methods.
//! 5. Package-private methods are accessible when declared by the component
//!    type, or by an ancestor such that every type from the component type up
//!    to that ancestor is in the same package and comes from the same origin.
//!
//! The search walks the component type and then its ancestors, scanning each
//! type's declared members in declaration order, and stops at the first
//! member that matches the descriptor and is accessible.

use thiserror::Error;
use tracing::{debug, trace};

use crate::descriptor::MethodDescriptor;
use crate::introspect::{MemberHandle, Modifiers, TypeHandle};
use crate::{MethodError, MethodResult};

/// Why a member is not accessible from a requesting type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessDenial {
    #[error("declaring type is not in the hierarchy of the requesting type")]
    NotInHierarchy,

    #[error("member is static or abstract")]
    StaticOrAbstract,

    #[error("private members were not requested")]
    PrivateNotAllowed,

    #[error("member is private to an ancestor")]
    PrivateInAncestor,

    #[error("hierarchy crosses a package or origin boundary")]
    PackageBoundary,
}

/// Returns true if `member` matches the descriptor's name and, when given,
/// its parameter types.
///
/// A parameter type name matches the canonical name of the parameter's type,
/// or its simple name if the type is not primitive.
pub fn matches<M: MemberHandle>(descriptor: &MethodDescriptor, member: &M) -> bool {
    if descriptor.name() != member.name() {
        return false;
    }
    let Some(expected) = descriptor.parameter_types() else {
        return true;
    };

    let actual = member.parameter_types();
    if expected.len() != actual.len() {
        return false;
    }

    expected.iter().zip(actual).all(|(name, ty)| {
        name == ty.canonical_name() || (!ty.is_primitive() && name == ty.simple_name())
    })
}

/// Checks whether `member` may serve as a callback of `requesting`.
///
/// `allow_private` admits private members declared by `requesting` itself;
/// private members of ancestors are never accessible.
pub fn check_access<T: TypeHandle>(
    requesting: &T,
    member: &T::Member,
    allow_private: bool,
) -> Result<(), AccessDenial> {
    let declaring = member.declaring_type();
    if !declaring.is_assignable_from(requesting) {
        return Err(AccessDenial::NotInHierarchy);
    }

    let modifiers = member.modifiers();
    if modifiers.is_static_or_abstract() {
        return Err(AccessDenial::StaticOrAbstract);
    }
    if modifiers.intersects(Modifiers::PUBLIC | Modifiers::PROTECTED) {
        return Ok(());
    }
    if modifiers.contains(Modifiers::PRIVATE) {
        return if declaring != *requesting {
            Err(AccessDenial::PrivateInAncestor)
        } else if !allow_private {
            Err(AccessDenial::PrivateNotAllowed)
        } else {
            Ok(())
        };
    }

    // Package-private from here on.
    let mut current = requesting.clone();
    while current != declaring {
        // Assignability guarantees the declaring type is an ancestor.
        let parent = current.parent();
        debug_assert!(
            parent.is_some(),
            "`{}` is not an ancestor of `{}`",
            declaring.name(),
            requesting.name()
        );
        let Some(parent) = parent else {
            return Err(AccessDenial::NotInHierarchy);
        };
        if current.origin() != parent.origin() || current.package() != parent.package() {
            return Err(AccessDenial::PackageBoundary);
        }
        current = parent;
    }
    Ok(())
}

/// Returns true if `member` may serve as a callback of `requesting`. See
/// [`check_access`].
pub fn is_accessible<T: TypeHandle>(requesting: &T, member: &T::Member, allow_private: bool) -> bool {
    check_access(requesting, member, allow_private).is_ok()
}

/// Finds the first accessible member matching `descriptor`, searching
/// `start` and then its ancestors.
pub fn locate<T: TypeHandle>(
    descriptor: &MethodDescriptor,
    start: &T,
    allow_private: bool,
) -> Option<T::Member> {
    let mut current = Some(start.clone());
    while let Some(ty) = current {
        for member in ty.declared_members() {
            if !matches(descriptor, &member) {
                continue;
            }
            match check_access(start, &member, allow_private) {
                Ok(()) => {
                    debug!(
                        %descriptor,
                        start = start.name(),
                        declared_in = ty.name(),
                        "located method"
                    );
                    return Some(member);
                }
                Err(denial) => {
                    trace!(%descriptor, declared_in = ty.name(), %denial, "skipping candidate");
                }
            }
        }
        current = ty.parent();
    }

    debug!(%descriptor, start = start.name(), "no accessible method");
    None
}

/// Tries each descriptor in turn and returns the first member found.
///
/// Fails if `descriptors` is empty; finding nothing is `Ok(None)`.
pub fn locate_by_preference<T: TypeHandle>(
    start: &T,
    allow_private: bool,
    descriptors: &[MethodDescriptor],
) -> MethodResult<Option<T::Member>> {
    if descriptors.is_empty() {
        return Err(MethodError::InvalidArgument(
            "at least one method descriptor must be specified",
        ));
    }
    Ok(descriptors
        .iter()
        .find_map(|descriptor| locate(descriptor, start, allow_private)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::ParameterType;
    use crate::registry::{MemberDef, Origin, TypeDef, TypeId, TypeRegistry};
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> MethodDescriptor {
        MethodDescriptor::parse(text).unwrap()
    }

    /// `p.A <- p.B <- p.C`, all from one package and origin.
    fn abc() -> (TypeRegistry, TypeId) {
        let mut registry = TypeRegistry::new();
        let a = registry
            .define(
                TypeDef::new("p.A")
                    .member(MemberDef::new("publicABC").modifiers(Modifiers::PUBLIC))
                    .member(MemberDef::new("protectedDifferentParams").modifiers(Modifiers::PROTECTED))
                    .member(MemberDef::new("packageA"))
                    .member(MemberDef::new("staticA").modifiers(Modifiers::PUBLIC | Modifiers::STATIC))
                    .member(MemberDef::new("abstractA").modifiers(Modifiers::PROTECTED | Modifiers::ABSTRACT)),
            )
            .unwrap();
        let b = registry
            .define(
                TypeDef::new("p.B")
                    .extends(a)
                    .member(MemberDef::new("privateB").modifiers(Modifiers::PRIVATE))
                    .member(
                        MemberDef::new("protectedB")
                            .modifiers(Modifiers::PROTECTED)
                            .param(ParameterType::from_canonical("int").array_of())
                            .param(ParameterType::from_canonical("java.lang.String").array_of()),
                    )
                    .member(MemberDef::new("publicABC").modifiers(Modifiers::PUBLIC)),
            )
            .unwrap();
        let c = registry
            .define(
                TypeDef::new("p.C")
                    .extends(b)
                    .member(MemberDef::new("privateC").modifiers(Modifiers::PRIVATE))
                    .member(
                        MemberDef::new("protectedDifferentParams")
                            .modifiers(Modifiers::PROTECTED)
                            .params(["int"]),
                    )
                    .member(MemberDef::new("publicABC").modifiers(Modifiers::PUBLIC)),
            )
            .unwrap();
        (registry, c)
    }

    fn member<'r>(registry: &'r TypeRegistry, ty: &str, name: &str) -> crate::MemberRef<'r> {
        registry
            .lookup(ty, Origin::default())
            .unwrap()
            .declared_members()
            .find(|m| m.name() == name)
            .unwrap()
    }

    fn string_region_matches() -> (TypeRegistry, TypeId) {
        let mut registry = TypeRegistry::new();
        let id = registry
            .define(
                TypeDef::new("java.lang.String").member(
                    MemberDef::new("regionMatches")
                        .modifiers(Modifiers::PUBLIC)
                        .params(["boolean", "int", "java.lang.String", "int", "int"]),
                ),
            )
            .unwrap();
        (registry, id)
    }

    #[test]
    fn test_matches_qualified_and_simple_names() {
        let (registry, id) = string_region_matches();
        let method = registry.get(id).unwrap().declared_members().next().unwrap();

        assert!(matches(&parse("regionMatches(boolean, int, java.lang.String, int, int)"), &method));
        assert!(matches(&parse("regionMatches(boolean, int, String, int, int)"), &method));
        assert!(matches(&parse("regionMatches"), &method));

        assert!(!matches(&parse("regionMatches(boolean, Integer, String, int, int)"), &method));
        assert!(!matches(&parse("regionMatches(boolean, int, String, int)"), &method));
        assert!(!matches(&parse("regionMatches()"), &method));
        assert!(!matches(&parse("regionmatches"), &method));
    }

    #[test]
    fn test_simple_name_ignored_for_primitives() {
        let mut registry = TypeRegistry::new();
        let id = registry
            .define(TypeDef::new("p.T").member(
                MemberDef::new("m").param(ParameterType::new("int", "Int", true)),
            ))
            .unwrap();
        let method = registry.get(id).unwrap().declared_members().next().unwrap();

        assert!(matches(&parse("m(int)"), &method));
        assert!(!matches(&parse("m(Int)"), &method));
    }

    #[test]
    fn test_matches_member_described_by_itself() {
        let (registry, id) = string_region_matches();
        let method = registry.get(id).unwrap().declared_members().next().unwrap();
        let descriptor = MethodDescriptor::from_member(&method);

        assert_eq!(descriptor.to_text(), "regionMatches(boolean, int, java.lang.String, int, int)");
        assert!(descriptor.matches(&method));
    }

    #[test]
    fn test_private_in_declaring_type_only() {
        let (registry, c) = abc();
        let c = registry.get(c).unwrap();

        let private_c = member(&registry, "p.C", "privateC");
        assert_eq!(check_access(&c, &private_c, true), Ok(()));
        assert_eq!(check_access(&c, &private_c, false), Err(AccessDenial::PrivateNotAllowed));

        let private_b = member(&registry, "p.B", "privateB");
        assert_eq!(check_access(&c, &private_b, true), Err(AccessDenial::PrivateInAncestor));
        assert_eq!(check_access(&c, &private_b, false), Err(AccessDenial::PrivateInAncestor));
    }

    #[test]
    fn test_static_and_abstract_excluded() {
        let (registry, c) = abc();
        let c = registry.get(c).unwrap();

        for name in ["staticA", "abstractA"] {
            let method = member(&registry, "p.A", name);
            assert_eq!(check_access(&c, &method, true), Err(AccessDenial::StaticOrAbstract));
        }
        assert_eq!(parse("staticA").locate(&c, true), None);
    }

    #[test]
    fn test_member_outside_hierarchy() {
        let (registry, _) = abc();
        let a = registry.lookup("p.A", Origin::default()).unwrap();
        let protected_b = member(&registry, "p.B", "protectedB");

        assert_eq!(check_access(&a, &protected_b, true), Err(AccessDenial::NotInHierarchy));
        assert!(!is_accessible(&a, &protected_b, true));
    }

    #[test]
    fn test_package_private_same_package() {
        let (registry, c) = abc();
        let c = registry.get(c).unwrap();
        let package_a = member(&registry, "p.A", "packageA");

        assert!(is_accessible(&c, &package_a, false));
        assert!(parse("packageA").locate(&c, false).is_some());
    }

    #[test]
    fn test_package_private_requires_same_package_along_chain() {
        let mut registry = TypeRegistry::new();
        let a = registry
            .define(TypeDef::new("p.A").member(MemberDef::new("init")))
            .unwrap();
        let b = registry.define(TypeDef::new("q.B").extends(a)).unwrap();
        let c = registry.define(TypeDef::new("p.C").extends(b)).unwrap();
        let d = registry
            .define(TypeDef::new("q.D").extends(b).member(MemberDef::new("init")))
            .unwrap();

        let c = registry.get(c).unwrap();
        let init = registry.get(a).unwrap().declared_members().next().unwrap();
        // Same package as the declaring type, but the chain passes through `q`.
        assert_eq!(check_access(&c, &init, true), Err(AccessDenial::PackageBoundary));
        assert_eq!(parse("init").locate(&c, true), None);

        let d = registry.get(d).unwrap();
        let own_init = d.declared_members().next().unwrap();
        assert_eq!(check_access(&d, &own_init, false), Ok(()));
    }

    #[test]
    fn test_package_private_requires_same_origin_along_chain() {
        let mut registry = TypeRegistry::new();
        let a = registry
            .define(TypeDef::new("p.A").member(MemberDef::new("init")))
            .unwrap();
        let b = registry
            .define(TypeDef::new("p.B").extends(a).origin(Origin(1)))
            .unwrap();

        let b = registry.get(b).unwrap();
        let init = registry.get(a).unwrap().declared_members().next().unwrap();
        assert_eq!(check_access(&b, &init, false), Err(AccessDenial::PackageBoundary));
    }

    #[test]
    fn test_locate_private() {
        let (registry, c) = abc();
        let c = registry.get(c).unwrap();

        assert_eq!(parse("privateC").locate(&c, true).unwrap().name(), "privateC");
        assert_eq!(parse("privateC").locate(&c, false), None);
        assert_eq!(parse("privateB").locate(&c, true), None);
        assert_eq!(parse("privateB").locate(&c, false), None);
    }

    #[test]
    fn test_locate_array_params() {
        let (registry, c) = abc();
        let c = registry.get(c).unwrap();

        for text in ["protectedB(int[], java.lang.String[])", "protectedB(int[], String[])"] {
            let method = parse(text).locate(&c, true).unwrap();
            assert_eq!(method.name(), "protectedB");
            assert_eq!(method.declaring_type().name(), "p.B");
        }
        assert_eq!(parse("protectedB(int, String[])").locate(&c, true), None);
    }

    #[test]
    fn test_locate_walks_to_nearest_matching_declaration() {
        let (registry, c) = abc();
        let c = registry.get(c).unwrap();

        let declared_in = |text: &str| {
            parse(text)
                .locate(&c, false)
                .map(|m| m.declaring_type().name().to_string())
        };
        assert_eq!(declared_in("protectedDifferentParams").as_deref(), Some("p.C"));
        assert_eq!(declared_in("protectedDifferentParams(int)").as_deref(), Some("p.C"));
        assert_eq!(declared_in("protectedDifferentParams()").as_deref(), Some("p.A"));
        assert_eq!(declared_in("publicABC").as_deref(), Some("p.C"));
        assert_eq!(declared_in("noSuchMethod"), None);
    }

    #[test]
    fn test_locate_from_ancestor_does_not_see_descendants() {
        let (registry, _) = abc();
        let b = registry.lookup("p.B", Origin::default()).unwrap();

        assert_eq!(parse("publicABC").locate(&b, false).unwrap().declaring_type(), b);
        assert_eq!(parse("protectedDifferentParams(int)").locate(&b, false), None);
    }

    #[test]
    fn test_locate_by_preference() {
        let (registry, c) = abc();
        let c = registry.get(c).unwrap();

        let found = locate_by_preference(
            &c,
            false,
            &[parse("missing"), parse("privateC"), parse("protectedDifferentParams()")],
        )
        .unwrap()
        .unwrap();
        assert_eq!(found.declaring_type().name(), "p.A");

        let found = locate_by_preference(&c, true, &[parse("missing"), parse("privateC")])
            .unwrap()
            .unwrap();
        assert_eq!(found.name(), "privateC");

        assert_eq!(locate_by_preference(&c, true, &[parse("missing")]), Ok(None));
    }

    #[test]
    fn test_locate_by_preference_requires_descriptors() {
        let (registry, c) = abc();
        let c = registry.get(c).unwrap();

        assert_eq!(
            locate_by_preference(&c, true, &[]),
            Err(MethodError::InvalidArgument(
                "at least one method descriptor must be specified"
            ))
        );
    }
}
