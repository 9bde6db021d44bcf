//! Fluent configuration of a [`TypeRegistry`]

use crate::class::{Annotation, AnnotationKey, Class, FieldInfo};
use crate::fetchers::{DataFetcherFactory, Override};
use crate::registry::TypeRegistry;
use crate::relay::Relay;
use async_graphql::dynamic::{InputValue, TypeRef};
use std::collections::HashMap;
use std::sync::Arc;

/// Computes extra arguments for a field carrying an annotation
pub type ArgumentsProvider = Arc<dyn Fn(&FieldInfo, &Class, &Annotation) -> Vec<InputValue> + Send + Sync>;

/// Computes the output type of a field carrying an annotation
pub type OutputTypeProvider = Arc<dyn Fn(&FieldInfo, &Class, &Annotation) -> TypeRef + Send + Sync>;

pub type OverrideMap = HashMap<Class, Vec<Arc<dyn Override>>>;
pub type ArgumentsProviderMap = HashMap<AnnotationKey, ArgumentsProvider>;
pub type OutputTypeMap = HashMap<AnnotationKey, OutputTypeProvider>;
pub type DataFetcherFactoryMap = HashMap<AnnotationKey, Arc<dyn DataFetcherFactory>>;

/// Collects overrides, annotation handlers and the relay of a registry
///
/// The `with_*` methods replace a whole map. The `add_*` methods keep the
/// first handler registered for an annotation; overrides accumulate per class
/// in insertion order.
#[derive(Default)]
pub struct TypeRegistryBuilder {
    overrides: OverrideMap,
    arguments_providers: ArgumentsProviderMap,
    output_type_providers: OutputTypeMap,
    data_fetcher_factories: DataFetcherFactoryMap,
    relay: Option<Arc<dyn Relay>>,
}

impl TypeRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_relay(mut self, relay: impl Relay + 'static) -> Self {
        self.relay = Some(Arc::new(relay));
        self
    }

    pub fn with_overrides(mut self, overrides: OverrideMap) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_annotation_to_arguments_provider_map(mut self, map: ArgumentsProviderMap) -> Self {
        self.arguments_providers = map;
        self
    }

    pub fn with_annotation_to_output_type_map(mut self, map: OutputTypeMap) -> Self {
        self.output_type_providers = map;
        self
    }

    pub fn with_annotation_to_data_fetcher_factory_map(mut self, map: DataFetcherFactoryMap) -> Self {
        self.data_fetcher_factories = map;
        self
    }

    pub fn add_custom_field_arguments_func<A, F>(mut self, f: F) -> Self
    where
        A: 'static,
        F: Fn(&FieldInfo, &Class, &Annotation) -> Vec<InputValue> + Send + Sync + 'static,
    {
        let provider: ArgumentsProvider = Arc::new(f);
        self.arguments_providers
            .entry(AnnotationKey::of::<A>())
            .or_insert(provider);
        self
    }

    pub fn add_custom_field_output_type_func<A, F>(mut self, f: F) -> Self
    where
        A: 'static,
        F: Fn(&FieldInfo, &Class, &Annotation) -> TypeRef + Send + Sync + 'static,
    {
        let provider: OutputTypeProvider = Arc::new(f);
        self.output_type_providers
            .entry(AnnotationKey::of::<A>())
            .or_insert(provider);
        self
    }

    pub fn add_custom_data_fetcher_factory<A, F>(mut self, factory: F) -> Self
    where
        A: 'static,
        F: DataFetcherFactory + 'static,
    {
        let factory: Arc<dyn DataFetcherFactory> = Arc::new(factory);
        self.data_fetcher_factories
            .entry(AnnotationKey::of::<A>())
            .or_insert(factory);
        self
    }

    pub fn add_override(mut self, class: Class, override_object: impl Override + 'static) -> Self {
        self.overrides
            .entry(class)
            .or_default()
            .push(Arc::new(override_object));
        self
    }

    pub fn build(self) -> TypeRegistry {
        TypeRegistry::new(
            self.overrides,
            self.data_fetcher_factories,
            self.arguments_providers,
            self.output_type_providers,
            self.relay,
        )
    }
}
