//! Per-tenant storage isolation.
//!
//! Every operation reaches a store only through a [`store::StoreHandle`]
//! obtained from [`resolver::TenantContextResolver`] or
//! [`registry::StoreRegistry`].

pub mod capability;
pub mod principal;
pub mod registry;
pub mod resolver;
pub mod store;
