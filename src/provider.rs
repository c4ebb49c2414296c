//! Provider-facing descriptors (data) and strategies (behavior).
//!
//! `descriptor` exposes validated metadata ([`ProviderDescriptor`]): HTTPS-only endpoints, the
//! grants the relay may use, the client authentication mode, and the scope delimiter used when
//! building authorization URLs. `strategy` defines [`ProviderStrategy`], the hook that maps
//! token endpoint failures into the relay's [`ProviderError`](crate::error::ProviderError)
//! taxonomy.

pub mod descriptor;
pub mod strategy;

pub use descriptor::*;
pub use strategy::*;
