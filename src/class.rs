//! Class model - immutable view of a parsed binary class
//!
//! A `ClassInfo` carries everything the graph and the remapper need:
//! - `name`, `super_name`, `interfaces`: the inheritance edges
//! - `fields`, `methods`: members keyed by name + descriptor
//! - `signature`, `annotations`: metadata holding further type references
//! - `properties`: host-tool side-table, never part of identity
//!
//! Classes are built once with [`ClassInfoBuilder`] and shared as `Arc<ClassInfo>`.
//! Updating a class means building a new one (see [`ClassInfo::to_builder`]).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Access flag bits, as laid out in the class-file format.
pub mod access {
    pub const PUBLIC: u32 = 0x0001;
    pub const PRIVATE: u32 = 0x0002;
    pub const PROTECTED: u32 = 0x0004;
    pub const STATIC: u32 = 0x0008;
    pub const FINAL: u32 = 0x0010;
    pub const SUPER: u32 = 0x0020;
    pub const INTERFACE: u32 = 0x0200;
    pub const ABSTRACT: u32 = 0x0400;
    pub const SYNTHETIC: u32 = 0x1000;
    pub const ANNOTATION: u32 = 0x2000;
    pub const ENUM: u32 = 0x4000;
    pub const MODULE: u32 = 0x8000;
}

/// A field declared by a class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldMember {
    pub name: String,
    pub descriptor: String,
    #[serde(default)]
    pub access: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl FieldMember {
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            access: 0,
            signature: None,
        }
    }

    pub fn with_access(mut self, access: u32) -> Self {
        self.access = access;
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }
}

/// A local variable table entry of a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalVariable {
    pub name: String,
    pub descriptor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Local slot index
    pub index: u16,
}

impl LocalVariable {
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>, index: u16) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            signature: None,
            index,
        }
    }
}

/// A method declared by a class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodMember {
    pub name: String,
    pub descriptor: String,
    #[serde(default)]
    pub access: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<LocalVariable>,
}

impl MethodMember {
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            access: 0,
            signature: None,
            variables: Vec::new(),
        }
    }

    pub fn with_access(mut self, access: u32) -> Self {
        self.access = access;
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn with_variable(mut self, variable: LocalVariable) -> Self {
        self.variables.push(variable);
        self
    }

    pub fn is_static(&self) -> bool {
        self.access & access::STATIC != 0
    }

    pub fn is_private(&self) -> bool {
        self.access & access::PRIVATE != 0
    }

    /// Constructors and static initializers are never renamed
    pub fn is_initializer(&self) -> bool {
        self.name == "<init>" || self.name == "<clinit>"
    }
}

/// Value of an annotation element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AnnotationValue {
    /// Primitive or string constant, kept in its textual form
    Literal { value: String },
    /// Enum constant: type descriptor + constant name
    Enum { descriptor: String, constant: String },
    /// Class literal, as a type descriptor
    Class { descriptor: String },
    /// Nested annotation
    Annotation { annotation: AnnotationInfo },
    Array { values: Vec<AnnotationValue> },
}

/// A named annotation element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnotationElement {
    pub name: String,
    pub value: AnnotationValue,
}

/// An annotation applied to a class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnotationInfo {
    /// Annotation type descriptor, e.g. `Ljava/lang/Deprecated;`
    pub descriptor: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<AnnotationElement>,
}

fn default_visible() -> bool {
    true
}

impl AnnotationInfo {
    pub fn new(descriptor: impl Into<String>) -> Self {
        Self {
            descriptor: descriptor.into(),
            visible: true,
            elements: Vec::new(),
        }
    }

    pub fn with_element(mut self, name: impl Into<String>, value: AnnotationValue) -> Self {
        self.elements.push(AnnotationElement {
            name: name.into(),
            value,
        });
        self
    }
}

/// Immutable model of a binary class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassInfo {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    super_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    interfaces: Vec<String>,
    #[serde(default)]
    access: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    fields: Vec<FieldMember>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    methods: Vec<MethodMember>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    annotations: Vec<AnnotationInfo>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    properties: BTreeMap<String, serde_json::Value>,
}

impl ClassInfo {
    /// Start building a class with the given internal name
    pub fn builder(name: impl Into<String>) -> ClassInfoBuilder {
        ClassInfoBuilder::new(name)
    }

    /// Internal name, e.g. `com/example/Foo`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn super_name(&self) -> Option<&str> {
        self.super_name.as_deref()
    }

    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    pub fn access(&self) -> u32 {
        self.access
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn fields(&self) -> &[FieldMember] {
        &self.fields
    }

    pub fn methods(&self) -> &[MethodMember] {
        &self.methods
    }

    pub fn annotations(&self) -> &[AnnotationInfo] {
        &self.annotations
    }

    /// Super type followed by interfaces, in declaration order
    pub fn declared_parents(&self) -> impl Iterator<Item = &str> {
        self.super_name
            .as_deref()
            .into_iter()
            .chain(self.interfaces.iter().map(String::as_str))
    }

    pub fn is_interface(&self) -> bool {
        self.access & access::INTERFACE != 0
    }

    /// Module descriptors (`module-info`) sit outside of any hierarchy
    pub fn is_module(&self) -> bool {
        self.access & access::MODULE != 0
    }

    pub fn field(&self, name: &str, descriptor: &str) -> Option<&FieldMember> {
        self.fields
            .iter()
            .find(|f| f.name == name && f.descriptor == descriptor)
    }

    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodMember> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    /// Check for a field or method with the given name and descriptor.
    ///
    /// Method descriptors always start with `(`, so the descriptor alone
    /// decides which member list is consulted.
    pub fn has_member(&self, name: &str, descriptor: &str) -> bool {
        if descriptor.starts_with('(') {
            self.method(name, descriptor).is_some()
        } else {
            self.field(name, descriptor).is_some()
        }
    }

    /// Raw side-table value
    pub fn property_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }

    /// Typed side-table value, `None` when missing or of another shape
    pub fn property<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.properties
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn properties(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.properties
    }

    /// Copy this class into a builder to derive an updated class
    pub fn to_builder(&self) -> ClassInfoBuilder {
        ClassInfoBuilder {
            inner: self.clone(),
        }
    }
}

// Properties are host metadata and do not take part in identity.
impl PartialEq for ClassInfo {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.super_name == other.super_name
            && self.interfaces == other.interfaces
            && self.access == other.access
            && self.signature == other.signature
            && self.fields == other.fields
            && self.methods == other.methods
            && self.annotations == other.annotations
    }
}

impl Eq for ClassInfo {}

/// Builder for [`ClassInfo`].
#[derive(Debug, Clone)]
pub struct ClassInfoBuilder {
    inner: ClassInfo,
}

impl ClassInfoBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: ClassInfo {
                name: name.into(),
                super_name: None,
                interfaces: Vec::new(),
                access: access::PUBLIC | access::SUPER,
                signature: None,
                fields: Vec::new(),
                methods: Vec::new(),
                annotations: Vec::new(),
                properties: BTreeMap::new(),
            },
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner.name = name.into();
        self
    }

    pub fn super_name(mut self, super_name: impl Into<String>) -> Self {
        self.inner.super_name = Some(super_name.into());
        self
    }

    pub fn no_super(mut self) -> Self {
        self.inner.super_name = None;
        self
    }

    pub fn interface(mut self, interface: impl Into<String>) -> Self {
        self.inner.interfaces.push(interface.into());
        self
    }

    pub fn interfaces(mut self, interfaces: Vec<String>) -> Self {
        self.inner.interfaces = interfaces;
        self
    }

    pub fn access(mut self, access: u32) -> Self {
        self.inner.access = access;
        self
    }

    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.inner.signature = Some(signature.into());
        self
    }

    pub fn clear_signature(mut self) -> Self {
        self.inner.signature = None;
        self
    }

    pub fn field(mut self, field: FieldMember) -> Self {
        self.inner.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: Vec<FieldMember>) -> Self {
        self.inner.fields = fields;
        self
    }

    pub fn method(mut self, method: MethodMember) -> Self {
        self.inner.methods.push(method);
        self
    }

    pub fn methods(mut self, methods: Vec<MethodMember>) -> Self {
        self.inner.methods = methods;
        self
    }

    pub fn annotation(mut self, annotation: AnnotationInfo) -> Self {
        self.inner.annotations.push(annotation);
        self
    }

    pub fn annotations(mut self, annotations: Vec<AnnotationInfo>) -> Self {
        self.inner.annotations = annotations;
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.inner.properties.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> ClassInfo {
        self.inner
    }
}

/// A non-class file carried by a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    name: String,
    #[serde(default)]
    content: Vec<u8>,
}

impl FileInfo {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
