//! Relay type factories
//!
//! [`Relay`] builds the Node interface, the edge/connection/page-info types
//! and client-mutation-id mutations. The provided methods follow the stock
//! Relay conventions; [`RelayWithTotal`] swaps in a page-info type carrying
//! the size of the whole result set.

use crate::fetchers::{FieldResolver, NodeFetcher};
use crate::pagination::{CursorCodec, Edge, JsonConnection, PageInfo};
use crate::{types, GraphQLError};
use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, InputObject, InputValue, Interface, InterfaceField, Object,
    Type, TypeRef,
};
use async_graphql::Value;
use std::sync::Arc;
use tracing::trace;

pub const NODE: &str = "Node";
pub const PAGE_INFO: &str = "PageInfo";
pub const PAGE_INFO_WITH_TOTAL: &str = "PageInfoWithTotal";
pub const CLIENT_MUTATION_ID: &str = "clientMutationId";

/// Builds Relay schema types
pub trait Relay: Send + Sync {
    /// The `Node` interface every refetchable object implements
    fn node_interface(&self) -> Interface {
        Interface::new(NODE)
            .description("An object with an ID")
            .field(
                InterfaceField::new("id", TypeRef::named_nn(TypeRef::ID))
                    .description("The ID of an object"),
            )
    }

    /// `node(id: ID!): Node`, resolved through `fetcher`
    fn node_field(&self, fetcher: Arc<dyn NodeFetcher>) -> Field {
        Field::new("node", TypeRef::named(NODE), move |ctx| {
            let fetcher = fetcher.clone();
            FieldFuture::new(async move {
                let id = ctx.args.try_get("id")?.string()?.to_string();
                trace!(%id, "fetching node");
                Ok(fetcher
                    .fetch(&id)
                    .await?
                    .map(|node| FieldValue::owned_any(node.value).with_type(node.type_name)))
            })
        })
        .description("Fetches an object given its ID")
        .argument(InputValue::new("id", TypeRef::named_nn(TypeRef::ID)).description("The ID of an object"))
    }

    fn connection_field_arguments(&self) -> Vec<InputValue> {
        vec![
            InputValue::new("before", TypeRef::named(TypeRef::STRING)),
            InputValue::new("after", TypeRef::named(TypeRef::STRING)),
            InputValue::new("first", TypeRef::named(TypeRef::INT)),
            InputValue::new("last", TypeRef::named(TypeRef::INT)),
        ]
    }

    fn page_info_type_name(&self) -> &'static str {
        PAGE_INFO
    }

    fn edge_type_name(&self, name: &str) -> String {
        format!("{name}Edge")
    }

    fn connection_type_name(&self, name: &str) -> String {
        format!("{name}Connection")
    }

    fn page_info_type(&self) -> Object {
        page_info_object(PAGE_INFO)
    }

    /// `<name>Edge { node, cursor }` plus `edge_fields`
    fn edge_type(&self, name: &str, node_type: TypeRef, edge_fields: Vec<Field>) -> Object {
        let edge = Object::new(self.edge_type_name(name))
            .description("An edge in a connection.")
            .field(
                Field::new("node", node_type, |ctx| {
                    FieldFuture::new(async move {
                        let edge = parent::<Edge<serde_json::Value>>(&ctx)?;
                        Ok(Some(FieldValue::owned_any(edge.node.clone())))
                    })
                })
                .description("The item at the end of the edge"),
            )
            .field(
                Field::new("cursor", TypeRef::named_nn(TypeRef::STRING), |ctx| {
                    FieldFuture::new(async move {
                        let edge = parent::<Edge<serde_json::Value>>(&ctx)?;
                        Ok(Some(FieldValue::value(edge.cursor.clone())))
                    })
                })
                .description("cursor marks a unique position or index into the connection"),
            );
        edge_fields.into_iter().fold(edge, Object::field)
    }

    /// `<name>Connection { edges, pageInfo }` plus `connection_fields`
    fn connection_type(&self, name: &str, edge_type: &str, connection_fields: Vec<Field>) -> Object {
        let connection = Object::new(self.connection_type_name(name))
            .description("A connection to a list of items.")
            .field(
                Field::new("edges", TypeRef::named_list(edge_type), |ctx| {
                    FieldFuture::new(async move {
                        let connection = parent::<JsonConnection>(&ctx)?;
                        Ok(Some(FieldValue::list(
                            connection.edges.iter().cloned().map(FieldValue::owned_any),
                        )))
                    })
                })
                .description("a list of edges"),
            )
            .field(
                Field::new("pageInfo", TypeRef::named_nn(self.page_info_type_name()), |ctx| {
                    FieldFuture::new(async move {
                        let connection = parent::<JsonConnection>(&ctx)?;
                        Ok(Some(FieldValue::owned_any(connection.page_info.clone())))
                    })
                })
                .description("details about this specific page"),
            );
        connection_fields.into_iter().fold(connection, Object::field)
    }

    /// Input type, payload type and field of a mutation carrying a
    /// client-supplied `clientMutationId`
    fn mutation_with_client_mutation_id(
        &self,
        name: &str,
        field_name: &str,
        input_fields: Vec<InputValue>,
        output_fields: Vec<Field>,
        resolver: FieldResolver,
    ) -> MutationDefinition {
        let input_name = format!("{name}Input");
        let payload_name = format!("{name}Payload");

        let input = input_fields.into_iter().fold(
            InputObject::new(&input_name).field(InputValue::new(
                CLIENT_MUTATION_ID,
                TypeRef::named_nn(TypeRef::STRING),
            )),
            InputObject::field,
        );

        let client_mutation_id = Field::new(CLIENT_MUTATION_ID, TypeRef::named_nn(TypeRef::STRING), |ctx| {
            FieldFuture::new(async move {
                let payload = parent::<serde_json::Value>(&ctx)?;
                Ok(payload
                    .get(CLIENT_MUTATION_ID)
                    .and_then(|id| id.as_str())
                    .map(|id| FieldValue::value(id.to_string())))
            })
        });
        let payload = output_fields
            .into_iter()
            .fold(Object::new(&payload_name).field(client_mutation_id), Object::field);

        let field = Field::new(field_name, TypeRef::named(&payload_name), move |ctx| resolver(ctx))
            .argument(InputValue::new("input", TypeRef::named_nn(&input_name)));

        MutationDefinition {
            input,
            payload,
            field,
        }
    }
}

/// Everything a Relay mutation adds to a schema
pub struct MutationDefinition {
    pub input: InputObject,
    pub payload: Object,
    /// Field to attach to the mutation root
    pub field: Field,
}

impl MutationDefinition {
    /// Split into the root field and the types to register
    pub fn into_parts(self) -> (Field, Vec<Type>) {
        (self.field, vec![self.input.into(), self.payload.into()])
    }
}

/// The stock Relay conventions
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRelay;

impl Relay for DefaultRelay {}

/// Relay whose page info also reports the total number of elements
#[derive(Debug, Clone, Copy, Default)]
pub struct RelayWithTotal;

impl Relay for RelayWithTotal {
    fn page_info_type_name(&self) -> &'static str {
        PAGE_INFO_WITH_TOTAL
    }

    fn page_info_type(&self) -> Object {
        page_info_object(PAGE_INFO_WITH_TOTAL).field(
            Field::new("total", TypeRef::named(types::LONG), |ctx| {
                FieldFuture::new(async move {
                    let page_info = parent::<PageInfo>(&ctx)?;
                    Ok(Some(FieldValue::value(Value::Number(
                        (page_info.total_count as u64).into(),
                    ))))
                })
            })
            .description("Total number of elements in the connection."),
        )
    }
}

fn page_info_object(name: &str) -> Object {
    Object::new(name)
        .description("Information about pagination in a connection.")
        .field(
            Field::new("hasNextPage", TypeRef::named_nn(TypeRef::BOOLEAN), |ctx| {
                FieldFuture::new(async move {
                    let page_info = parent::<PageInfo>(&ctx)?;
                    Ok(Some(FieldValue::value(page_info.has_next_page)))
                })
            })
            .description("When paginating forwards, are there more items?"),
        )
        .field(
            Field::new("hasPreviousPage", TypeRef::named_nn(TypeRef::BOOLEAN), |ctx| {
                FieldFuture::new(async move {
                    let page_info = parent::<PageInfo>(&ctx)?;
                    Ok(Some(FieldValue::value(page_info.has_previous_page)))
                })
            })
            .description("When paginating backwards, are there more items?"),
        )
        .field(
            Field::new("startCursor", TypeRef::named(TypeRef::STRING), |ctx| {
                FieldFuture::new(async move {
                    let page_info = parent::<PageInfo>(&ctx)?;
                    Ok(page_info.start_cursor.clone().map(FieldValue::value))
                })
            })
            .description("When paginating backwards, the cursor to continue."),
        )
        .field(
            Field::new("endCursor", TypeRef::named(TypeRef::STRING), |ctx| {
                FieldFuture::new(async move {
                    let page_info = parent::<PageInfo>(&ctx)?;
                    Ok(page_info.end_cursor.clone().map(FieldValue::value))
                })
            })
            .description("When paginating forwards, the cursor to continue."),
        )
}

fn parent<'a, T: std::any::Any>(
    ctx: &async_graphql::dynamic::ResolverContext<'a>,
) -> async_graphql::Result<&'a T> {
    let value: &'a FieldValue<'a> = ctx.parent_value;
    value.downcast_ref::<T>().ok_or_else(|| {
        GraphQLError::UnexpectedParent(std::any::type_name::<T>().to_string()).into()
    })
}

/// Type name and id packed into a global object id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGlobalId {
    pub type_name: String,
    pub id: String,
}

/// Opaque id that is unique across all object types
pub fn to_global_id(type_name: &str, id: &str) -> String {
    CursorCodec::encode(&format!("{type_name}:{id}"))
}

pub fn from_global_id(global_id: &str) -> crate::Result<ResolvedGlobalId> {
    let decoded = CursorCodec::decode(global_id)
        .map_err(|_| GraphQLError::InvalidGlobalId(global_id.to_string()))?;
    let (type_name, id) = decoded
        .split_once(':')
        .ok_or_else(|| GraphQLError::InvalidGlobalId(global_id.to_string()))?;
    Ok(ResolvedGlobalId {
        type_name: type_name.to_string(),
        id: id.to_string(),
    })
}
