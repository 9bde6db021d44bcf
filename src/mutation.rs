//! Relay mutation execution
//!
//! A mutation field receives `input: { clientMutationId, <output>: {...} }`.
//! The nested object is deserialized into the handler's input type and
//! validated before the handler runs; the payload echoes the client id back.

use crate::fetchers::{resolver, FieldResolver};
use crate::relay::CLIENT_MUTATION_ID;
use crate::validation::{ValidationErrors, Validator};
use crate::GraphQLError;
use async_graphql::dynamic::{FieldFuture, FieldValue};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// What a handler knows about the mutation being run
#[derive(Debug, Clone, PartialEq)]
pub struct MutationContext {
    pub field_name: String,
    pub client_mutation_id: Option<String>,
}

/// Performs a mutation on validated input
#[async_trait]
pub trait MutationHandler<I, O>: Send + Sync {
    async fn mutate(&self, input: I, ctx: &MutationContext) -> crate::Result<O>;
}

/// Resolver of a Relay mutation field
pub struct MutationDataFetcher<I, O> {
    field_name: String,
    output_field: String,
    input_type: String,
    validator: Option<Arc<dyn Validator<I>>>,
    handler: Arc<dyn MutationHandler<I, O>>,
}

impl<I, O> MutationDataFetcher<I, O>
where
    I: DeserializeOwned + Send + 'static,
    O: Serialize + Send + 'static,
{
    pub fn new(
        field_name: impl Into<String>,
        output_field: impl Into<String>,
        input_type: impl Into<String>,
        validator: Option<Arc<dyn Validator<I>>>,
        handler: Arc<dyn MutationHandler<I, O>>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            output_field: output_field.into(),
            input_type: input_type.into(),
            validator,
            handler,
        }
    }

    /// Run the mutation for the value of the `input` argument and build the
    /// payload object
    pub async fn execute(&self, input: Value) -> crate::Result<Value> {
        let client_mutation_id = input
            .get(CLIENT_MUTATION_ID)
            .and_then(Value::as_str)
            .map(str::to_string);
        let raw = input.get(&self.output_field).cloned().unwrap_or(Value::Null);
        let target: I = serde_json::from_value(raw)
            .map_err(|e| GraphQLError::InvalidInput(format!("{}: {e}", self.input_type)))?;

        if let Some(validator) = &self.validator {
            let mut errors = ValidationErrors::new(self.input_type.clone());
            validator.validate(&target, &mut errors);
            if errors.has_errors() {
                warn!(mutation = %self.field_name, %errors, "mutation input rejected");
                return Err(GraphQLError::Validation(errors));
            }
        }

        let ctx = MutationContext {
            field_name: self.field_name.clone(),
            client_mutation_id,
        };
        debug!(mutation = %self.field_name, client_mutation_id = ?ctx.client_mutation_id, "running mutation");
        let output = self.handler.mutate(target, &ctx).await?;

        let mut payload = Map::new();
        payload.insert(
            CLIENT_MUTATION_ID.to_string(),
            ctx.client_mutation_id.map(Value::String).unwrap_or(Value::Null),
        );
        payload.insert(self.output_field.clone(), serde_json::to_value(output)?);
        Ok(Value::Object(payload))
    }

    pub fn into_resolver(self) -> FieldResolver {
        let fetcher = Arc::new(self);
        resolver(move |ctx| {
            let fetcher = fetcher.clone();
            FieldFuture::new(async move {
                let input = ctx
                    .args
                    .as_index_map()
                    .get("input")
                    .cloned()
                    .ok_or_else(|| GraphQLError::InvalidInput("missing input argument".to_string()))?
                    .into_json()?;
                let payload = fetcher.execute(input).await?;
                Ok(Some(FieldValue::owned_any(payload)))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct VideoMtn {
        title: String,
    }

    #[derive(Debug, Serialize)]
    struct Video {
        id: String,
        title: String,
    }

    struct CreateVideo;

    #[async_trait]
    impl MutationHandler<VideoMtn, Video> for CreateVideo {
        async fn mutate(&self, input: VideoMtn, ctx: &MutationContext) -> crate::Result<Video> {
            if input.title == "boom" {
                return Err(GraphQLError::MutationError("storage unavailable".to_string()));
            }
            Ok(Video {
                id: format!("{}-1", ctx.field_name),
                title: input.title,
            })
        }
    }

    fn fetcher(validator: Option<Arc<dyn Validator<VideoMtn>>>) -> MutationDataFetcher<VideoMtn, Video> {
        MutationDataFetcher::new("createVideo", "video", "VideoMtn", validator, Arc::new(CreateVideo))
    }

    fn not_blank() -> Arc<dyn Validator<VideoMtn>> {
        Arc::new(|mtn: &VideoMtn, errors: &mut ValidationErrors| {
            if mtn.title.is_empty() {
                errors.reject_value("title", "NotBlank", "must not be blank");
            }
        })
    }

    #[tokio::test]
    async fn test_payload_echoes_client_mutation_id() {
        let payload = fetcher(None)
            .execute(json!({ "clientMutationId": "m1", "video": { "title": "Intro" } }))
            .await
            .unwrap();
        assert_eq!(
            payload,
            json!({
                "clientMutationId": "m1",
                "video": { "id": "createVideo-1", "title": "Intro" }
            })
        );
    }

    #[tokio::test]
    async fn test_validation_stops_mutation() {
        let result = fetcher(Some(not_blank()))
            .execute(json!({ "clientMutationId": "m1", "video": { "title": "" } }))
            .await;
        match result {
            Err(GraphQLError::Validation(errors)) => {
                assert_eq!(errors.object_name, "VideoMtn");
                assert_eq!(errors.field_errors("title").count(), 1);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_input_object() {
        let result = fetcher(None).execute(json!({ "clientMutationId": "m1" })).await;
        assert!(matches!(result, Err(GraphQLError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_handler_error_propagates() {
        let result = fetcher(Some(not_blank()))
            .execute(json!({ "clientMutationId": "m1", "video": { "title": "boom" } }))
            .await;
        assert!(matches!(result, Err(GraphQLError::MutationError(_))));
    }
}
