//! Self-description of domain types
//!
//! The registry never inspects Rust types directly. Each domain type
//! implements [`GraphQLClass`] and hands back a [`ClassInfo`] listing its
//! fields, their declared types and the annotations attached to them.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A domain type that can be turned into GraphQL types by the registry
pub trait GraphQLClass: 'static {
    /// Describe the fields of this type
    fn describe() -> ClassInfo;
}

/// Handle to a described domain type
#[derive(Clone, Copy)]
pub struct Class {
    id: TypeId,
    name: &'static str,
    describe: fn() -> ClassInfo,
}

impl Class {
    pub fn of<T: GraphQLClass>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: simple_name(std::any::type_name::<T>()),
            describe: T::describe,
        }
    }

    /// Type name without module path or generic parameters
    pub fn simple_name(&self) -> &'static str {
        self.name
    }

    pub fn info(&self) -> ClassInfo {
        (self.describe)()
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Class {}

impl Hash for Class {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Class").field(&self.name).finish()
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

fn simple_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Lower-case the first character, `VideoMtn` -> `videoMtn`
pub fn uncapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Fields and metadata of a domain type
#[derive(Clone, Debug, Default)]
pub struct ClassInfo {
    pub description: Option<String>,
    /// Implements the Relay `Node` interface
    pub node: bool,
    pub fields: Vec<FieldInfo>,
}

impl ClassInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn node(mut self) -> Self {
        self.node = true;
        self
    }

    pub fn field(mut self, field: FieldInfo) -> Self {
        self.fields.push(field);
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A single field (or getter) of a domain type
#[derive(Clone, Debug)]
pub struct FieldInfo {
    pub name: String,
    pub ty: FieldType,
    pub non_null: bool,
    pub description: Option<String>,
    pub annotations: Vec<Annotation>,
}

impl FieldInfo {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            non_null: false,
            description: None,
            annotations: Vec::new(),
        }
    }

    pub fn non_null(mut self) -> Self {
        self.non_null = true;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn annotate<A: Any + Send + Sync>(mut self, annotation: A) -> Self {
        self.annotations.push(Annotation::new(annotation));
        self
    }

    /// First annotation of type `A` on this field
    pub fn annotation<A: Any>(&self) -> Option<&A> {
        self.annotations.iter().find_map(|a| a.downcast_ref::<A>())
    }
}

/// Declared type of a field
#[derive(Clone, Debug)]
pub enum FieldType {
    Scalar(Scalar),
    Object(Class),
    List(Box<FieldType>),
    /// Relay connection over the given node type
    Connection(Class),
}

impl FieldType {
    pub fn object<T: GraphQLClass>() -> Self {
        FieldType::Object(Class::of::<T>())
    }

    pub fn list(inner: FieldType) -> Self {
        FieldType::List(Box::new(inner))
    }

    pub fn connection<T: GraphQLClass>() -> Self {
        FieldType::Connection(Class::of::<T>())
    }
}

impl From<Scalar> for FieldType {
    fn from(scalar: Scalar) -> Self {
        FieldType::Scalar(scalar)
    }
}

/// Scalar types a field can be declared with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scalar {
    Id,
    String,
    Int,
    Long,
    Float,
    Boolean,
    DateTime,
}

impl Scalar {
    pub fn type_name(self) -> &'static str {
        match self {
            Scalar::Id => "ID",
            Scalar::String => "String",
            Scalar::Int => "Int",
            Scalar::Long => crate::types::LONG,
            Scalar::Float => "Float",
            Scalar::Boolean => "Boolean",
            Scalar::DateTime => crate::types::DATE_TIME,
        }
    }
}

/// Identity of an annotation type, used as the key of the handler maps
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AnnotationKey {
    id: TypeId,
    name: &'static str,
}

impl AnnotationKey {
    pub fn of<A: Any>() -> Self {
        Self {
            id: TypeId::of::<A>(),
            name: simple_name(std::any::type_name::<A>()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// An annotation instance attached to a field
#[derive(Clone)]
pub struct Annotation {
    key: AnnotationKey,
    value: Arc<dyn Any + Send + Sync>,
}

impl Annotation {
    pub fn new<A: Any + Send + Sync>(value: A) -> Self {
        Self {
            key: AnnotationKey::of::<A>(),
            value: Arc::new(value),
        }
    }

    pub fn key(&self) -> AnnotationKey {
        self.key
    }

    pub fn downcast_ref<A: Any>(&self) -> Option<&A> {
        self.value.downcast_ref::<A>()
    }
}

impl fmt::Debug for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.key.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod domain {
        pub struct Video;
        pub struct Wrapper<T>(pub T);
    }

    #[derive(Debug, PartialEq)]
    struct Paged {
        size: u32,
    }

    impl GraphQLClass for domain::Video {
        fn describe() -> ClassInfo {
            ClassInfo::new()
                .node()
                .field(FieldInfo::new("id", Scalar::Id.into()).non_null())
                .field(FieldInfo::new("title", Scalar::String.into()).annotate(Paged { size: 5 }))
        }
    }

    impl GraphQLClass for domain::Wrapper<domain::Video> {
        fn describe() -> ClassInfo {
            ClassInfo::new()
        }
    }

    #[test]
    fn test_simple_name_strips_path_and_generics() {
        assert_eq!(Class::of::<domain::Video>().simple_name(), "Video");
        assert_eq!(Class::of::<domain::Wrapper<domain::Video>>().simple_name(), "Wrapper");
    }

    #[test]
    fn test_class_identity() {
        assert_eq!(Class::of::<domain::Video>(), Class::of::<domain::Video>());
        assert_ne!(Class::of::<domain::Video>(), Class::of::<domain::Wrapper<domain::Video>>());
    }

    #[test]
    fn test_annotation_lookup() {
        let info = Class::of::<domain::Video>().info();
        let title = info.get_field("title").unwrap();
        assert_eq!(title.annotation::<Paged>(), Some(&Paged { size: 5 }));
        assert_eq!(title.annotations[0].key(), AnnotationKey::of::<Paged>());
        assert_eq!(title.annotations[0].key().name(), "Paged");
        assert!(info.get_field("id").unwrap().annotation::<Paged>().is_none());
    }

    #[test]
    fn test_uncapitalize() {
        assert_eq!(uncapitalize("VideoMtn"), "videoMtn");
        assert_eq!(uncapitalize("x"), "x");
        assert_eq!(uncapitalize(""), "");
    }
}
