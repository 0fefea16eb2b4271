//! Base repository trait for database operations.
//!
//! A repository is a data access layer for one postgres table. It provides
//! methods for creating, reading, updating, and listing entities with simple
//! filters. Entities are never hard-deleted in normal flow, so the trait
//! carries no delete operation; repositories that need one define it
//! themselves.

use crate::db::errors::Result;

/// Base repository trait providing common database operations.
///
/// Separate associated types for create requests, update requests, and
/// responses keep the wire DTOs out of the database layer.
#[async_trait::async_trait]
pub trait Repository {
    /// The request type for creating entities
    type CreateRequest;

    /// The request type for updating entities
    type UpdateRequest;

    /// The response/DTO type returned by operations
    type Response;

    /// The identifier type for lookups
    type Id: Send + Sync;

    /// The filter type for list operations
    type Filter: Send + Sync;

    /// Create a new entity
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response>;

    /// Get an entity by ID
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>>;

    /// List entities with filtering and pagination
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>>;

    /// Update an entity by ID
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response>;
}
