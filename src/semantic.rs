//! Semantic analysis module.
//!
//! Binds every name reference in a parsed unit to its declaration and infers
//! expression types where that is possible:
//! - [`scope`]: lookups over the source tree (local, member and method-context)
//! - [`resolver`]: the scope stack and the two resolution walks
//! - [`type_inference`]: literal and operator typing rules
//!
//! Resolution is best effort. References that cannot be bound are reported as
//! [`ResolveGap`]s and left unbound; they never stop the translation.

pub mod resolver;
pub mod scope;
pub mod type_inference;

#[cfg(test)]
mod tests_resolver;

pub use resolver::{GapKind, ResolveGap, Resolver, ScopeGuard, resolve_unit};
