//! Data access for the API service

pub mod documents;
pub mod feedback;
pub mod subscriptions;
