//! Method resolution and dispatch for the Smelt optimizer.
//!
//! Reproduces the JVM specification's resolution, overriding and
//! invoke-special/virtual/interface dispatch rules over the interned symbol
//! graph, including the deliberately underspecified and error-producing
//! corners: every expected failure is a typed result value that a pass can
//! match on, never an exception.

#![forbid(unsafe_code)]

mod access;
mod builder;
mod cache;
mod dispatch;
mod resolver;
mod result;

pub use crate::access::{is_class_accessible, is_member_accessible, OptionalBool};
pub use crate::builder::ResolutionResultBuilder;
pub use crate::cache::ResolutionCache;
pub use crate::dispatch::{is_overriding, DispatchTarget};
pub use crate::resolver::MethodResolver;
pub use crate::result::{
    FailedResolution, MethodResolutionResult, MultipleResolutions, SingleResolution,
};
