//! # graphql-relay-registry
//!
//! Builds dynamic GraphQL schemas out of described domain types.
//!
//! ## Features
//!
//! - **Type Registry** - domain types to object/input types, with per-class
//!   overrides and annotation-driven arguments, output types and fetchers
//! - **Relay Helpers** - Node interface, connections, client-mutation-id mutations
//! - **Cursor Pagination** - opaque offset cursors and page info
//!
//! ## Usage
//!
//! ```rust,ignore
//! use graphql_relay_registry::{Class, RelayWithTotal, TypeRegistry};
//!
//! let registry = TypeRegistry::builder().with_relay(RelayWithTotal).build();
//! let video = registry.lookup(Class::of::<Video>())?;
//! let schema = registry.register_types(Schema::build("Query", None, None));
//! ```

pub mod class;
pub mod types;
pub mod pagination;
pub mod validation;
pub mod fetchers;
pub mod relay;
pub mod builder;
pub mod registry;
pub mod mutation;
pub mod relay_helper;

pub use class::{Annotation, AnnotationKey, Class, ClassInfo, FieldInfo, FieldType, GraphQLClass, Scalar};
pub use pagination::{Connection, CursorCodec, Edge, JsonConnection, PageInfo, PaginationInput};
pub use validation::{FieldError, ValidationErrors, Validator};
pub use fetchers::{DataFetcherFactory, FieldOverrides, FieldResolver, Node, NodeFetcher, Override};
pub use relay::{DefaultRelay, MutationDefinition, Relay, RelayWithTotal};
pub use builder::TypeRegistryBuilder;
pub use registry::TypeRegistry;
pub use mutation::{MutationContext, MutationDataFetcher, MutationHandler};
pub use relay_helper::RelayHelper;

use thiserror::Error;

/// GraphQL errors
#[derive(Error, Debug)]
pub enum GraphQLError {
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Pagination error: {0}")]
    PaginationError(String),

    #[error("Invalid global id: {0}")]
    InvalidGlobalId(String),

    #[error("Type {0} is used both as an output and as an input type")]
    TypeConflict(String),

    #[error("Two different classes map to the type name {0}")]
    DuplicateTypeName(String),

    #[error("Relay is not configured but {0} is a connection")]
    RelayRequired(String),

    #[error("Field {0} cannot be part of an input type")]
    InvalidInputField(String),

    #[error("Node type {0} has no non-null ID field named id")]
    MissingNodeId(String),

    #[error("Unexpected parent value while resolving {0}")]
    UnexpectedParent(String),

    #[error("Property {0} is not a list")]
    NotAList(String),

    #[error("Invalid mutation input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("Mutation error: {0}")]
    MutationError(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for GraphQL operations
pub type Result<T> = std::result::Result<T, GraphQLError>;
