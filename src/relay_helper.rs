//! Relay artifacts assembled on top of a [`TypeRegistry`]

use crate::class::{uncapitalize, Class, FieldInfo, FieldType, GraphQLClass};
use crate::fetchers::{property_resolver, NodeFetcher};
use crate::mutation::{MutationDataFetcher, MutationHandler};
use crate::pagination::{self, Connection};
use crate::registry::TypeRegistry;
use crate::relay::{DefaultRelay, MutationDefinition, Relay};
use crate::validation::Validator;
use async_graphql::dynamic::{Field, InputValue, Interface, Object, SchemaBuilder, TypeRef};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Builds node, connection and mutation definitions for a registry
///
/// Uses the registry's relay when it has one, [`DefaultRelay`] otherwise.
pub struct RelayHelper {
    registry: Arc<TypeRegistry>,
    relay: Arc<dyn Relay>,
    node_fetcher: Arc<dyn NodeFetcher>,
}

impl RelayHelper {
    pub fn new(registry: Arc<TypeRegistry>, node_fetcher: Arc<dyn NodeFetcher>) -> Self {
        let relay: Arc<dyn Relay> = match registry.relay() {
            Some(relay) => relay.clone(),
            None => Arc::new(DefaultRelay),
        };
        Self {
            registry,
            relay,
            node_fetcher,
        }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn node_interface(&self) -> Interface {
        self.relay.node_interface()
    }

    pub fn node_field(&self) -> Field {
        self.relay.node_field(self.node_fetcher.clone())
    }

    pub fn connection_field_arguments() -> Vec<InputValue> {
        DefaultRelay.connection_field_arguments()
    }

    /// Relay mutation `field_name` taking an `I` and answering an `O`
    ///
    /// Both the input object field and the payload field are named after the
    /// output type, `Video` -> `video`.
    pub fn build_mutation<I, O>(
        &self,
        field_name: &str,
        validator: Option<Arc<dyn Validator<I>>>,
        handler: impl MutationHandler<I, O> + 'static,
    ) -> crate::Result<MutationDefinition>
    where
        I: GraphQLClass + DeserializeOwned + Send,
        O: GraphQLClass + Serialize + Send,
    {
        let input_class = Class::of::<I>();
        let output_class = Class::of::<O>();
        let output_name = uncapitalize(output_class.simple_name());

        let input_field = InputValue::new(&output_name, self.registry.lookup_input(input_class)?);

        let output_resolver = property_resolver(&FieldInfo::new(&output_name, FieldType::Object(output_class)));
        let output_field = Field::new(&output_name, self.registry.lookup(output_class)?, move |ctx| {
            output_resolver(ctx)
        });

        let fetcher = MutationDataFetcher::new(
            field_name,
            &output_name,
            input_class.simple_name(),
            validator,
            Arc::new(handler),
        );

        debug!(mutation = field_name, input = %input_class, output = %output_class, "building mutation");
        Ok(self.relay.mutation_with_client_mutation_id(
            input_class.simple_name(),
            field_name,
            vec![input_field],
            vec![output_field],
            fetcher.into_resolver(),
        ))
    }

    pub fn edge_type(name: &str, node_type: TypeRef, edge_fields: Vec<Field>) -> Object {
        DefaultRelay.edge_type(name, node_type, edge_fields)
    }

    /// Connection type of the default relay
    ///
    /// Its `pageInfo` field refers to `PageInfo`, which the registry only
    /// emits when it owns a [`DefaultRelay`] and has discovered a connection.
    /// Register [`DefaultRelay::page_info_type`](Relay::page_info_type)
    /// yourself otherwise.
    pub fn connection_type(name: &str, edge_type: &str, connection_fields: Vec<Field>) -> Object {
        DefaultRelay.connection_type(name, edge_type, connection_fields)
    }

    pub fn build_connection<T>(items: impl IntoIterator<Item = T>, start: usize, total_count: usize) -> Connection<T> {
        Connection::build(items, start, total_count)
    }

    pub fn create_cursor(offset: usize) -> String {
        pagination::create_cursor(offset)
    }

    pub fn offset_from_cursor(cursor: Option<&str>, default: usize) -> crate::Result<usize> {
        pagination::offset_from_cursor(cursor, default)
    }

    /// Emit the registry's types together with the `Node` interface of this
    /// helper's relay, which every node class implements
    pub fn register_types(&self, schema: SchemaBuilder) -> SchemaBuilder {
        self.registry.register_types_with_node(schema, &*self.relay)
    }
}
