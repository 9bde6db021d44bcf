//! Field resolvers and the collaborator traits the registry calls into
//!
//! Domain values travel through generated schemas as `serde_json::Value`.
//! Object fields keep the value opaque, scalar fields convert it into a
//! GraphQL value.

use crate::class::{Annotation, Class, FieldInfo, FieldType, GraphQLClass};
use crate::pagination::{Connection, PaginationInput};
use crate::GraphQLError;
use async_graphql::dynamic::{FieldFuture, FieldValue, ResolverContext};
use async_graphql::Value;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Shared resolver closure for a dynamic field
pub type FieldResolver = Arc<dyn for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync>;

/// Wrap a closure into a [`FieldResolver`]
pub fn resolver<F>(f: F) -> FieldResolver
where
    F: for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Builds the resolver of a field carrying a given annotation
pub trait DataFetcherFactory: Send + Sync {
    fn create(&self, field: &FieldInfo, class: &Class, annotation: &Annotation) -> Option<FieldResolver>;
}

impl<F> DataFetcherFactory for F
where
    F: Fn(&FieldInfo, &Class, &Annotation) -> Option<FieldResolver> + Send + Sync,
{
    fn create(&self, field: &FieldInfo, class: &Class, annotation: &Annotation) -> Option<FieldResolver> {
        self(field, class, annotation)
    }
}

/// Replaces the resolvers of some fields of a class
pub trait Override: Send + Sync {
    fn resolver(&self, field: &str) -> Option<FieldResolver>;
}

/// Override backed by a name -> resolver map
#[derive(Clone, Default)]
pub struct FieldOverrides {
    resolvers: HashMap<String, FieldResolver>,
}

impl FieldOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync + 'static,
    {
        self.resolvers.insert(name.into(), resolver(f));
        self
    }
}

impl Override for FieldOverrides {
    fn resolver(&self, field: &str) -> Option<FieldResolver> {
        self.resolvers.get(field).cloned()
    }
}

/// Resolves a field by reading the same-named property of its parent
pub fn property_resolver(field: &FieldInfo) -> FieldResolver {
    let name = field.name.clone();
    let ty = field.ty.clone();
    resolver(move |ctx| {
        let name = name.clone();
        let ty = ty.clone();
        FieldFuture::new(async move {
            let parent = ctx
                .parent_value
                .downcast_ref::<serde_json::Value>()
                .ok_or_else(|| GraphQLError::UnexpectedParent(name.clone()))?;
            trace!(field = %name, "resolving property");
            let value = parent.get(&name).cloned().unwrap_or(serde_json::Value::Null);
            json_to_field_value(&ty, value)
        })
    })
}

/// Pages the list stored in the parent's property according to the Relay
/// arguments of the field
pub fn connection_resolver(field: &FieldInfo) -> FieldResolver {
    let name = field.name.clone();
    resolver(move |ctx| {
        let name = name.clone();
        FieldFuture::new(async move {
            let parent = ctx
                .parent_value
                .downcast_ref::<serde_json::Value>()
                .ok_or_else(|| GraphQLError::UnexpectedParent(name.clone()))?;
            let items: &[serde_json::Value] = match parent.get(&name) {
                Some(serde_json::Value::Array(items)) => items.as_slice(),
                Some(serde_json::Value::Null) | None => &[],
                Some(_) => return Err(GraphQLError::NotAList(name.clone()).into()),
            };

            let paging = PaginationInput::from_args(&ctx.args)?;
            let window = paging.window(items.len())?;
            trace!(field = %name, start = window.start, end = window.end, "paging connection");
            let connection = Connection::build(items[window.clone()].to_vec(), window.start, items.len());
            Ok(Some(FieldValue::owned_any(connection)))
        })
    })
}

/// Convert a property value into the field value of a field of type `ty`
pub fn json_to_field_value<'a>(
    ty: &FieldType,
    value: serde_json::Value,
) -> async_graphql::Result<Option<FieldValue<'a>>> {
    if value.is_null() {
        return Ok(None);
    }
    match ty {
        FieldType::Scalar(_) => Ok(Some(FieldValue::value(Value::from_json(value)?))),
        FieldType::Object(_) => Ok(Some(FieldValue::owned_any(value))),
        FieldType::List(inner) => match value {
            serde_json::Value::Array(items) => {
                let values = items
                    .into_iter()
                    .map(|item| -> async_graphql::Result<FieldValue<'a>> {
                        Ok(json_to_field_value(inner, item)?.unwrap_or(FieldValue::NULL))
                    })
                    .collect::<async_graphql::Result<Vec<_>>>()?;
                Ok(Some(FieldValue::list(values)))
            }
            _ => Err("expected a list value".into()),
        },
        FieldType::Connection(_) => Err("connection fields are resolved by connection_resolver".into()),
    }
}

/// A node returned by a [`NodeFetcher`]
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Name of the concrete GraphQL object type
    pub type_name: String,
    pub value: serde_json::Value,
}

impl Node {
    pub fn new(type_name: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            type_name: type_name.into(),
            value,
        }
    }

    /// Serialize a described domain value into a node of its own type
    pub fn of<T: GraphQLClass + Serialize>(value: &T) -> crate::Result<Self> {
        Ok(Self::new(Class::of::<T>().simple_name(), serde_json::to_value(value)?))
    }
}

/// Looks up objects by id for the Relay `node` field
#[async_trait]
pub trait NodeFetcher: Send + Sync {
    async fn fetch(&self, id: &str) -> crate::Result<Option<Node>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{ClassInfo, Scalar};
    use serde_json::json;

    struct Tag;

    impl GraphQLClass for Tag {
        fn describe() -> ClassInfo {
            ClassInfo::new().field(FieldInfo::new("name", Scalar::String.into()))
        }
    }

    #[test]
    fn test_null_is_absent() {
        let value = json_to_field_value(&Scalar::Int.into(), serde_json::Value::Null).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_scalar_value() {
        let value = json_to_field_value(&Scalar::String.into(), json!("hello")).unwrap();
        assert!(value.is_some());
    }

    #[test]
    fn test_object_stays_opaque() {
        let value = json_to_field_value(&FieldType::object::<Tag>(), json!({ "name": "rust" }))
            .unwrap()
            .unwrap();
        assert_eq!(value.downcast_ref::<serde_json::Value>(), Some(&json!({ "name": "rust" })));
    }

    #[test]
    fn test_list_requires_array() {
        let ty = FieldType::list(Scalar::Int.into());
        assert!(json_to_field_value(&ty, json!([1, 2])).unwrap().is_some());
        assert!(json_to_field_value(&ty, json!(3)).is_err());
    }

    #[test]
    fn test_overrides_by_field_name() {
        let overrides = FieldOverrides::new().field("name", |_| {
            FieldFuture::new(async move { Ok(Some(FieldValue::value("overridden".to_string()))) })
        });
        assert!(overrides.resolver("name").is_some());
        assert!(overrides.resolver("other").is_none());
    }

    #[test]
    fn test_node_of() {
        #[derive(Serialize)]
        struct Video {
            id: String,
        }

        impl GraphQLClass for Video {
            fn describe() -> ClassInfo {
                ClassInfo::new()
            }
        }

        let node = Node::of(&Video { id: "v1".to_string() }).unwrap();
        assert_eq!(node, Node::new("Video", json!({ "id": "v1" })));
    }
}
