//! Method descriptors.
//!
//! A descriptor names a method and, optionally, the types of its parameters:
//!
//! ```text
//! descriptor     := methodName [ "(" [ paramType ("," paramType)* ] ")" ]
//! methodName     := (letter | "_") (letter | digit | "_")*
//! paramType      := WS* qualifiedName WS* ("[" WS* "]")? WS*
//! qualifiedName  := segment ("." segment)*
//! segment        := (letter | "_" | "$") (letter | digit | "_" | "$")*
//! ```
//!
//! `activate` leaves the parameters unspecified and matches any arity,
//! `activate()` matches only the no-argument form. Parameter types may be
//! written with their canonical (`java.lang.String`) or simple (`String`)
//! name.
//!
//! Rendering always emits parentheses, so a descriptor without parameter
//! information renders as `name()` and parses back as a descriptor with an
//! *empty* parameter list. The text form cannot tell "unspecified" from
//! "none"; only the in-memory value keeps that distinction.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::introspect::{MemberHandle, TypeHandle};
use crate::resolver;
use crate::{MethodError, MethodResult};

/// Whitespace admitted around parameter types.
const WS: &str = r"[\t\n\x0B\x0C\r ]";

const METHOD_NAME: &str = r"[\p{L}_][\p{L}\p{N}_]*";

const SEGMENT: &str = r"[\p{L}_$][\p{L}\p{N}_$]*";

fn is_grammar_space(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\x0B' | '\x0C' | '\r' | ' ')
}

/// A single parameter type, without surrounding whitespace.
fn param_type_regex() -> String {
    format!(r"(?:{SEGMENT}\.)*{SEGMENT}(?:{WS}*\[{WS}*\])?")
}

fn descriptor_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let param = format!("{WS}*{}{WS}*", param_type_regex());
        let expr = format!(
            r"\A(?P<name>{METHOD_NAME})(?P<params>\((?:(?:{param},)*{param})?\))?\z"
        );
        Regex::new(&expr).expect("descriptor grammar is a valid regex")
    })
}

fn param_type_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(r"\A{}\z", param_type_regex()))
            .expect("parameter type grammar is a valid regex")
    })
}

fn method_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(r"\A{METHOD_NAME}\z")).expect("method name grammar is a valid regex")
    })
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|&c| !is_grammar_space(c)).collect()
}

/// Describes a method by name and, optionally, parameter type names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct MethodDescriptor {
    name: String,
    /// `None` when the parameters are unspecified.
    parameter_types: Option<Vec<String>>,
}

impl MethodDescriptor {
    /// Parses the text form of a descriptor.
    ///
    /// The whole input must match the grammar; whitespace around parameter
    /// types is dropped.
    pub fn parse(text: &str) -> MethodResult<Self> {
        let captures = descriptor_pattern().captures(text).ok_or_else(|| {
            MethodError::MalformedDescriptor {
                text: text.to_string(),
            }
        })?;

        let name = captures["name"].to_string();
        let parameter_types = captures.name("params").map(|params| {
            let params = params.as_str();
            let inner = params[1..params.len() - 1].trim_matches(is_grammar_space);
            if inner.is_empty() {
                Vec::new()
            } else {
                inner.split(',').map(strip_whitespace).collect()
            }
        });

        Ok(Self {
            name,
            parameter_types,
        })
    }

    /// Builds a descriptor from a method name and optional parameter type
    /// names.
    ///
    /// With `None` the descriptor matches the first method with that name,
    /// whatever its parameters. Each type name must be a canonical or simple
    /// type name, optionally followed by `[]`.
    pub fn from_name_and_types<S: AsRef<str>>(
        name: &str,
        parameter_types: Option<&[S]>,
    ) -> MethodResult<Self> {
        if name.is_empty() {
            return Err(MethodError::InvalidArgument("method name must not be empty"));
        }
        if !method_name_pattern().is_match(name) {
            return Err(MethodError::MalformedDescriptor {
                text: name.to_string(),
            });
        }

        let parameter_types = parameter_types
            .map(|types| {
                types
                    .iter()
                    .map(|ty| {
                        let ty = ty.as_ref();
                        if param_type_pattern().is_match(ty) {
                            Ok(strip_whitespace(ty))
                        } else {
                            Err(MethodError::MalformedDescriptor {
                                text: ty.to_string(),
                            })
                        }
                    })
                    .collect::<MethodResult<Vec<_>>>()
            })
            .transpose()?;

        Ok(Self {
            name: name.to_string(),
            parameter_types,
        })
    }

    /// Descriptor matching any method called `name`.
    pub fn named(name: &str) -> MethodResult<Self> {
        Self::from_name_and_types::<&str>(name, None)
    }

    /// Descriptor matching `name` with exactly the given parameter types.
    pub fn with_parameters<S: AsRef<str>>(name: &str, parameter_types: &[S]) -> MethodResult<Self> {
        Self::from_name_and_types(name, Some(parameter_types))
    }

    /// Describes an existing member, listing its parameters by canonical
    /// name.
    pub fn from_member<M: MemberHandle>(member: &M) -> Self {
        Self {
            name: member.name().to_string(),
            parameter_types: Some(
                member
                    .parameter_types()
                    .iter()
                    .map(|ty| ty.canonical_name().to_string())
                    .collect(),
            ),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter type names, or `None` if the parameters are unspecified.
    pub fn parameter_types(&self) -> Option<&[String]> {
        self.parameter_types.as_deref()
    }

    /// Renders the descriptor as `name(T1, T2)`.
    ///
    /// Parentheses are always emitted, see the module docs for the
    /// consequence on round trips.
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// See [`resolver::matches`].
    pub fn matches<M: MemberHandle>(&self, member: &M) -> bool {
        resolver::matches(self, member)
    }

    /// See [`resolver::locate`].
    pub fn locate<T: TypeHandle>(&self, start: &T, allow_private: bool) -> Option<T::Member> {
        resolver::locate(self, start, allow_private)
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        if let Some(types) = &self.parameter_types {
            write!(f, "{}", types.join(", "))?;
        }
        write!(f, ")")
    }
}

impl FromStr for MethodDescriptor {
    type Err = MethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MethodDescriptor {
    type Error = MethodError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for MethodDescriptor {
    type Error = MethodError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}
