//! Business flows that span the store and the auth primitives.

pub mod auth;
