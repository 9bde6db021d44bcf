//! Resolution of described domain types into GraphQL types
//!
//! `lookup` and `lookup_input` walk a class and everything reachable from
//! its fields, remember what they found and hand back a reference to the
//! type. `register_types` later emits every remembered type into a schema
//! builder, so the same class always maps to the same type name.

use crate::builder::{
    ArgumentsProviderMap, DataFetcherFactoryMap, OutputTypeMap, OverrideMap, TypeRegistryBuilder,
};
use crate::class::{Class, FieldInfo, FieldType, Scalar};
use crate::fetchers::{connection_resolver, property_resolver, FieldResolver};
use crate::relay::{DefaultRelay, Relay, NODE};
use crate::{types, GraphQLError};
use async_graphql::dynamic::{Field, InputObject, InputValue, Object, SchemaBuilder, TypeRef};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Clone, Default)]
struct Discovered {
    outputs: BTreeMap<&'static str, Class>,
    inputs: BTreeMap<&'static str, Class>,
    connections: BTreeMap<&'static str, Class>,
}

/// Maps domain classes to GraphQL types
pub struct TypeRegistry {
    overrides: OverrideMap,
    data_fetcher_factories: DataFetcherFactoryMap,
    arguments_providers: ArgumentsProviderMap,
    output_type_providers: OutputTypeMap,
    relay: Option<Arc<dyn Relay>>,
    discovered: Mutex<Discovered>,
}

impl TypeRegistry {
    pub(crate) fn new(
        overrides: OverrideMap,
        data_fetcher_factories: DataFetcherFactoryMap,
        arguments_providers: ArgumentsProviderMap,
        output_type_providers: OutputTypeMap,
        relay: Option<Arc<dyn Relay>>,
    ) -> Self {
        Self {
            overrides,
            data_fetcher_factories,
            arguments_providers,
            output_type_providers,
            relay,
            discovered: Mutex::new(Discovered::default()),
        }
    }

    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::new()
    }

    pub fn relay(&self) -> Option<&Arc<dyn Relay>> {
        self.relay.as_ref()
    }

    /// Output object type of `class`
    pub fn lookup(&self, class: Class) -> crate::Result<TypeRef> {
        self.discover(|registry, found| registry.discover_output(found, class))?;
        Ok(TypeRef::named(class.simple_name()))
    }

    /// Input object type of `class`
    pub fn lookup_input(&self, class: Class) -> crate::Result<TypeRef> {
        self.discover(|registry, found| registry.discover_input(found, class))?;
        Ok(TypeRef::named(class.simple_name()))
    }

    /// Connection type over `class`
    pub fn lookup_connection(&self, class: Class) -> crate::Result<TypeRef> {
        let relay = self
            .relay
            .as_ref()
            .ok_or_else(|| GraphQLError::RelayRequired(format!("connection of {class}")))?;
        self.discover(|registry, found| {
            registry.discover_connection(found, class, &format!("connection of {class}"))
        })?;
        Ok(TypeRef::named(relay.connection_type_name(class.simple_name())))
    }

    /// Pagination arguments of connection fields
    pub fn connection_field_arguments(&self) -> Vec<InputValue> {
        match &self.relay {
            Some(relay) => relay.connection_field_arguments(),
            None => DefaultRelay.connection_field_arguments(),
        }
    }

    pub fn output_type_names(&self) -> Vec<&'static str> {
        self.found().outputs.keys().copied().collect()
    }

    pub fn input_type_names(&self) -> Vec<&'static str> {
        self.found().inputs.keys().copied().collect()
    }

    /// Emit every type found so far, plus the custom scalars and, when a
    /// relay is configured, the `Node` interface and page-info type
    pub fn register_types(&self, schema: SchemaBuilder) -> SchemaBuilder {
        self.emit(schema, self.relay.as_deref())
    }

    /// Like [`register_types`](Self::register_types), with `node_relay`
    /// supplying the `Node` interface that node classes implement
    pub fn register_types_with_node(&self, schema: SchemaBuilder, node_relay: &dyn Relay) -> SchemaBuilder {
        self.emit(schema, Some(node_relay))
    }

    fn emit(&self, mut schema: SchemaBuilder, node_relay: Option<&dyn Relay>) -> SchemaBuilder {
        let found = self.found().clone();

        for scalar in types::custom_scalars() {
            schema = schema.register(scalar);
        }

        if let Some(relay) = node_relay {
            schema = schema.register(relay.node_interface());
        }

        if let Some(relay) = &self.relay {
            if !found.connections.is_empty() {
                schema = schema.register(relay.page_info_type());
            }
            for name in found.connections.keys() {
                let edge_name = relay.edge_type_name(name);
                schema = schema
                    .register(relay.edge_type(name, TypeRef::named(*name), Vec::new()))
                    .register(relay.connection_type(name, &edge_name, Vec::new()));
            }
        }

        for class in found.outputs.values() {
            debug!(%class, "registering output type");
            schema = schema.register(self.object_type(*class, node_relay.is_some()));
        }
        for class in found.inputs.values() {
            debug!(%class, "registering input type");
            schema = schema.register(self.input_object_type(*class));
        }
        schema
    }

    fn found(&self) -> MutexGuard<'_, Discovered> {
        self.discovered.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a discovery walk, keeping its findings only if it succeeds
    fn discover<F>(&self, walk: F) -> crate::Result<()>
    where
        F: FnOnce(&Self, &mut Discovered) -> crate::Result<()>,
    {
        let mut found = self.found();
        let mut next = found.clone();
        walk(self, &mut next)?;
        *found = next;
        Ok(())
    }

    fn discover_output(&self, found: &mut Discovered, class: Class) -> crate::Result<()> {
        let name = class.simple_name();
        match found.outputs.get(name) {
            Some(existing) if *existing == class => return Ok(()),
            Some(_) => return Err(GraphQLError::DuplicateTypeName(name.to_string())),
            None => {}
        }
        if found.inputs.contains_key(name) {
            return Err(GraphQLError::TypeConflict(name.to_string()));
        }

        debug!(%class, "discovered output type");
        found.outputs.insert(name, class);

        let info = class.info();
        if info.node {
            let has_id = info.get_field("id").is_some_and(|id| {
                id.non_null && matches!(id.ty, FieldType::Scalar(Scalar::Id))
            });
            if !has_id {
                return Err(GraphQLError::MissingNodeId(name.to_string()));
            }
        }

        for field in &info.fields {
            // a custom output type replaces the declared one entirely
            if self.has_output_type_provider(field) {
                continue;
            }
            self.discover_output_field(found, class, field, &field.ty)?;
        }
        Ok(())
    }

    fn discover_output_field(
        &self,
        found: &mut Discovered,
        class: Class,
        field: &FieldInfo,
        ty: &FieldType,
    ) -> crate::Result<()> {
        match ty {
            FieldType::Scalar(_) => Ok(()),
            FieldType::Object(target) => self.discover_output(found, *target),
            FieldType::List(inner) => self.discover_output_field(found, class, field, inner),
            FieldType::Connection(target) => {
                self.discover_connection(found, *target, &format!("{class}.{}", field.name))
            }
        }
    }

    fn discover_connection(&self, found: &mut Discovered, class: Class, origin: &str) -> crate::Result<()> {
        if self.relay.is_none() {
            return Err(GraphQLError::RelayRequired(origin.to_string()));
        }
        found.connections.insert(class.simple_name(), class);
        self.discover_output(found, class)
    }

    fn discover_input(&self, found: &mut Discovered, class: Class) -> crate::Result<()> {
        let name = class.simple_name();
        match found.inputs.get(name) {
            Some(existing) if *existing == class => return Ok(()),
            Some(_) => return Err(GraphQLError::DuplicateTypeName(name.to_string())),
            None => {}
        }
        if found.outputs.contains_key(name) {
            return Err(GraphQLError::TypeConflict(name.to_string()));
        }

        debug!(%class, "discovered input type");
        found.inputs.insert(name, class);

        for field in &class.info().fields {
            self.discover_input_field(found, class, field, &field.ty)?;
        }
        Ok(())
    }

    fn discover_input_field(
        &self,
        found: &mut Discovered,
        class: Class,
        field: &FieldInfo,
        ty: &FieldType,
    ) -> crate::Result<()> {
        match ty {
            FieldType::Scalar(_) => Ok(()),
            FieldType::Object(target) => self.discover_input(found, *target),
            FieldType::List(inner) => self.discover_input_field(found, class, field, inner),
            FieldType::Connection(_) => Err(GraphQLError::InvalidInputField(format!(
                "{class}.{}",
                field.name
            ))),
        }
    }

    fn has_output_type_provider(&self, field: &FieldInfo) -> bool {
        field
            .annotations
            .iter()
            .any(|annotation| self.output_type_providers.contains_key(&annotation.key()))
    }

    fn object_type(&self, class: Class, implements_node: bool) -> Object {
        let info = class.info();
        let mut object = Object::new(class.simple_name());
        if let Some(description) = &info.description {
            object = object.description(description);
        }
        if info.node && implements_node {
            object = object.implement(NODE);
        }
        for field in &info.fields {
            object = object.field(self.output_field(class, field));
        }
        object
    }

    fn output_field(&self, class: Class, field: &FieldInfo) -> Field {
        let resolver = self.field_resolver(class, field);
        let mut output = Field::new(field.name.as_str(), self.output_type(class, field), move |ctx| {
            resolver(ctx)
        });
        if let Some(description) = &field.description {
            output = output.description(description);
        }
        for argument in self.field_arguments(class, field) {
            output = output.argument(argument);
        }
        output
    }

    /// First annotation with a registered output type decides, the declared
    /// type otherwise
    fn output_type(&self, class: Class, field: &FieldInfo) -> TypeRef {
        field
            .annotations
            .iter()
            .find_map(|annotation| {
                self.output_type_providers
                    .get(&annotation.key())
                    .map(|provider| provider(field, &class, annotation))
            })
            .unwrap_or_else(|| self.declared_type(field))
    }

    fn declared_type(&self, field: &FieldInfo) -> TypeRef {
        let ty = self.type_ref(&field.ty);
        if field.non_null {
            TypeRef::NonNull(Box::new(ty))
        } else {
            ty
        }
    }

    fn type_ref(&self, ty: &FieldType) -> TypeRef {
        match ty {
            FieldType::Scalar(scalar) => TypeRef::named(scalar.type_name()),
            FieldType::Object(class) => TypeRef::named(class.simple_name()),
            FieldType::List(inner) => TypeRef::List(Box::new(self.type_ref(inner))),
            FieldType::Connection(class) => {
                let relay = self.relay.as_deref().unwrap_or(&DefaultRelay);
                TypeRef::named(relay.connection_type_name(class.simple_name()))
            }
        }
    }

    /// Connection arguments first, then whatever the field's annotations add
    fn field_arguments(&self, class: Class, field: &FieldInfo) -> Vec<InputValue> {
        let mut arguments = Vec::new();
        if let (FieldType::Connection(_), Some(relay)) = (&field.ty, &self.relay) {
            arguments.extend(relay.connection_field_arguments());
        }
        for annotation in &field.annotations {
            if let Some(provider) = self.arguments_providers.get(&annotation.key()) {
                arguments.extend(provider(field, &class, annotation));
            }
        }
        arguments
    }

    /// Override, then annotation data fetcher, then the default fetcher
    fn field_resolver(&self, class: Class, field: &FieldInfo) -> FieldResolver {
        let overridden = self
            .overrides
            .get(&class)
            .and_then(|overrides| overrides.iter().find_map(|o| o.resolver(&field.name)));
        if let Some(resolver) = overridden {
            return resolver;
        }

        let fetched = field.annotations.iter().find_map(|annotation| {
            self.data_fetcher_factories
                .get(&annotation.key())
                .and_then(|factory| factory.create(field, &class, annotation))
        });
        if let Some(resolver) = fetched {
            return resolver;
        }

        match field.ty {
            FieldType::Connection(_) => connection_resolver(field),
            _ => property_resolver(field),
        }
    }

    fn input_object_type(&self, class: Class) -> InputObject {
        let info = class.info();
        let mut input = InputObject::new(class.simple_name());
        if let Some(description) = &info.description {
            input = input.description(description);
        }
        for field in &info.fields {
            let mut value = InputValue::new(field.name.as_str(), self.declared_type(field));
            if let Some(description) = &field.description {
                value = value.description(description);
            }
            input = input.field(value);
        }
        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{Annotation, ClassInfo, GraphQLClass};
    use crate::fetchers::{resolver, FieldOverrides};
    use crate::relay::RelayWithTotal;
    use async_graphql::dynamic::{FieldFuture, FieldValue, Schema};
    use serde_json::{json, Value};

    /// Replaces a field's value with a fixed star rating
    struct Rated {
        stars: i64,
    }

    /// Adds a `length` argument that truncates a text field
    struct Excerpt;

    struct Video;

    impl GraphQLClass for Video {
        fn describe() -> ClassInfo {
            ClassInfo::new()
                .node()
                .field(FieldInfo::new("id", Scalar::Id.into()).non_null())
                .field(FieldInfo::new("title", Scalar::String.into()))
                .field(FieldInfo::new("summary", Scalar::String.into()).annotate(Excerpt))
                .field(FieldInfo::new("rating", FieldType::object::<Review>()).annotate(Rated { stars: 4 }))
                .field(FieldInfo::new("published", Scalar::DateTime.into()))
                .field(FieldInfo::new("tags", FieldType::list(FieldType::object::<Tag>())))
                .field(FieldInfo::new("comments", FieldType::connection::<Comment>()))
        }
    }

    struct Tag;

    impl GraphQLClass for Tag {
        fn describe() -> ClassInfo {
            ClassInfo::new().field(FieldInfo::new("name", Scalar::String.into()).non_null())
        }
    }

    struct Comment;

    impl GraphQLClass for Comment {
        fn describe() -> ClassInfo {
            ClassInfo::new()
                .field(FieldInfo::new("id", Scalar::Id.into()).non_null())
                .field(FieldInfo::new("body", Scalar::String.into()))
        }
    }

    /// Only reachable through a field whose output type is replaced
    struct Review;

    impl GraphQLClass for Review {
        fn describe() -> ClassInfo {
            ClassInfo::new().field(FieldInfo::new("text", Scalar::String.into()))
        }
    }

    struct NamelessNode;

    impl GraphQLClass for NamelessNode {
        fn describe() -> ClassInfo {
            ClassInfo::new().node().field(FieldInfo::new("id", Scalar::String.into()))
        }
    }

    struct Playlist;

    impl GraphQLClass for Playlist {
        fn describe() -> ClassInfo {
            ClassInfo::new().field(FieldInfo::new("videos", FieldType::connection::<Comment>()))
        }
    }

    mod other {
        use super::*;

        pub struct Tag;

        impl GraphQLClass for Tag {
            fn describe() -> ClassInfo {
                ClassInfo::new()
            }
        }
    }

    fn video() -> Value {
        json!({
            "id": "v1",
            "title": "Intro to Rust",
            "summary": "A gentle introduction",
            "published": "2024-03-01T10:00:00Z",
            "tags": [{ "name": "rust" }, { "name": "graphql" }],
            "comments": [
                { "id": "c1", "body": "first" },
                { "id": "c2", "body": "second" },
                { "id": "c3", "body": "third" }
            ]
        })
    }

    fn registry() -> TypeRegistry {
        TypeRegistry::builder()
            .with_relay(RelayWithTotal)
            .add_custom_field_output_type_func::<Rated, _>(|_, _, _| TypeRef::named_nn(TypeRef::INT))
            .add_custom_data_fetcher_factory::<Rated, _>(
                |_: &FieldInfo, _: &Class, annotation: &Annotation| {
                    let stars = annotation.downcast_ref::<Rated>()?.stars;
                    Some(resolver(move |_| {
                        FieldFuture::new(async move { Ok(Some(FieldValue::value(stars))) })
                    }))
                },
            )
            .add_custom_field_arguments_func::<Excerpt, _>(|_, _, _| {
                vec![InputValue::new("length", TypeRef::named(TypeRef::INT))]
            })
            .add_custom_data_fetcher_factory::<Excerpt, _>(
                |field: &FieldInfo, _: &Class, _: &Annotation| {
                    let name = field.name.clone();
                    Some(resolver(move |ctx| {
                        let name = name.clone();
                        FieldFuture::new(async move {
                            let parent = ctx
                                .parent_value
                                .downcast_ref::<Value>()
                                .ok_or("unexpected parent")?;
                            let text = parent.get(&name).and_then(Value::as_str).unwrap_or_default();
                            let length = match ctx.args.get("length") {
                                Some(length) => length.i64()? as usize,
                                None => text.len(),
                            };
                            Ok(Some(FieldValue::value(text.chars().take(length).collect::<String>())))
                        })
                    }))
                },
            )
            .build()
    }

    fn schema(registry: &TypeRegistry) -> Schema {
        let ty = registry.lookup(Class::of::<Video>()).unwrap();
        let query = Object::new("Query").field(Field::new("video", ty, |_| {
            FieldFuture::new(async move { Ok(Some(FieldValue::owned_any(video()))) })
        }));
        registry
            .register_types(Schema::build("Query", None, None))
            .register(query)
            .finish()
            .unwrap()
    }

    async fn run(schema: &Schema, query: &str) -> Value {
        let response = schema.execute(query).await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        response.data.into_json().unwrap()
    }

    #[test]
    fn test_lookup_walks_reachable_classes() {
        let registry = registry();
        let ty = registry.lookup(Class::of::<Video>()).unwrap();
        assert_eq!(ty.to_string(), "Video");
        // Review hides behind a replaced output type
        assert_eq!(registry.output_type_names(), vec!["Comment", "Tag", "Video"]);
        assert!(registry.input_type_names().is_empty());
    }

    #[test]
    fn test_lookup_connection() {
        let registry = registry();
        let ty = registry.lookup_connection(Class::of::<Comment>()).unwrap();
        assert_eq!(ty.to_string(), "CommentConnection");
        assert_eq!(registry.output_type_names(), vec!["Comment"]);
    }

    #[test]
    fn test_input_output_conflict() {
        let registry = registry();
        registry.lookup(Class::of::<Tag>()).unwrap();
        assert!(matches!(
            registry.lookup_input(Class::of::<Tag>()),
            Err(GraphQLError::TypeConflict(_))
        ));
    }

    #[test]
    fn test_duplicate_simple_name() {
        let registry = registry();
        registry.lookup(Class::of::<Tag>()).unwrap();
        assert!(matches!(
            registry.lookup(Class::of::<other::Tag>()),
            Err(GraphQLError::DuplicateTypeName(_))
        ));
    }

    #[test]
    fn test_connection_requires_relay() {
        let registry = TypeRegistry::builder().build();
        assert!(matches!(
            registry.lookup(Class::of::<Playlist>()),
            Err(GraphQLError::RelayRequired(_))
        ));
        // a failed walk leaves nothing behind
        assert!(registry.output_type_names().is_empty());
        assert!(matches!(
            registry.lookup_connection(Class::of::<Comment>()),
            Err(GraphQLError::RelayRequired(_))
        ));
    }

    #[test]
    fn test_connection_cannot_be_input() {
        let registry = registry();
        assert!(matches!(
            registry.lookup_input(Class::of::<Playlist>()),
            Err(GraphQLError::InvalidInputField(_))
        ));
    }

    #[test]
    fn test_node_requires_id() {
        let registry = registry();
        assert!(matches!(
            registry.lookup(Class::of::<NamelessNode>()),
            Err(GraphQLError::MissingNodeId(_))
        ));
        let registry = TypeRegistry::builder().build();
        assert!(matches!(
            registry.lookup(Class::of::<NamelessNode>()),
            Err(GraphQLError::MissingNodeId(_))
        ));
    }

    #[tokio::test]
    async fn test_default_fetchers() {
        let registry = registry();
        let data = run(
            &schema(&registry),
            "{ video { id title published tags { name } } }",
        )
        .await;
        assert_eq!(
            data,
            json!({
                "video": {
                    "id": "v1",
                    "title": "Intro to Rust",
                    "published": "2024-03-01T10:00:00Z",
                    "tags": [{ "name": "rust" }, { "name": "graphql" }]
                }
            })
        );
    }

    #[tokio::test]
    async fn test_annotation_handlers() {
        let registry = registry();
        let data = run(&schema(&registry), "{ video { rating summary(length: 8) } }").await;
        assert_eq!(data, json!({ "video": { "rating": 4, "summary": "A gentle" } }));
    }

    #[tokio::test]
    async fn test_connection_field() {
        let registry = registry();
        let data = run(
            &schema(&registry),
            "{ video { comments(last: 2) { edges { node { body } } pageInfo { hasPreviousPage hasNextPage total } } } }",
        )
        .await;
        assert_eq!(
            data,
            json!({
                "video": {
                    "comments": {
                        "edges": [{ "node": { "body": "second" } }, { "node": { "body": "third" } }],
                        "pageInfo": { "hasPreviousPage": true, "hasNextPage": false, "total": 3 }
                    }
                }
            })
        );
    }

    #[tokio::test]
    async fn test_first_override_wins() {
        let fixed = |value: &'static str| {
            FieldOverrides::new().field("title", move |_| {
                FieldFuture::new(async move { Ok(Some(FieldValue::value(value.to_string()))) })
            })
        };
        let registry = TypeRegistry::builder()
            .with_relay(RelayWithTotal)
            .add_override(Class::of::<Video>(), FieldOverrides::new())
            .add_override(Class::of::<Video>(), fixed("first"))
            .add_override(Class::of::<Video>(), fixed("second"))
            .build();
        let data = run(&schema(&registry), "{ video { title summary } }").await;
        assert_eq!(
            data,
            json!({ "video": { "title": "first", "summary": "A gentle introduction" } })
        );
    }
}
