//! Class rewriting
//!
//! The applier does not know how a class is rewritten. It hands each class
//! to a [`ClassRemapper`] and only deals with the outcome. The default
//! [`StructuralRemapper`] rewrites every symbolic reference held by the
//! class model.

use super::descriptor::{remap_descriptor, remap_internal_name, remap_signature};
use super::Mappings;
use crate::class::{AnnotationInfo, AnnotationValue, ClassInfo, FieldMember, LocalVariable, MethodMember};
use crate::Result;

/// Produces the post-mapping form of one class.
///
/// Implementations must not touch any bundle; they only compute.
pub trait ClassRemapper: Send + Sync {
    fn remap(&self, class: &ClassInfo, mappings: &dyn Mappings) -> Result<ClassInfo>;
}

/// Rewrites names, descriptors, signatures, annotations and local variables.
///
/// Member lookups always use the pre-rename owner name and descriptor.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralRemapper;

impl ClassRemapper for StructuralRemapper {
    fn remap(&self, class: &ClassInfo, mappings: &dyn Mappings) -> Result<ClassInfo> {
        let owner = class.name();
        let mut builder = class.to_builder().name(remap_internal_name(owner, mappings)?);

        builder = match class.super_name() {
            Some(super_name) => builder.super_name(remap_internal_name(super_name, mappings)?),
            None => builder.no_super(),
        };

        let interfaces = class
            .interfaces()
            .iter()
            .map(|i| remap_internal_name(i, mappings))
            .collect::<Result<Vec<_>>>()?;
        builder = builder.interfaces(interfaces);

        if let Some(signature) = class.signature() {
            builder = builder.signature(remap_signature(signature, mappings)?);
        }

        let fields = class
            .fields()
            .iter()
            .map(|f| remap_field(owner, f, mappings))
            .collect::<Result<Vec<_>>>()?;
        let methods = class
            .methods()
            .iter()
            .map(|m| remap_method(owner, m, mappings))
            .collect::<Result<Vec<_>>>()?;
        let annotations = class
            .annotations()
            .iter()
            .map(|a| remap_annotation(a, mappings))
            .collect::<Result<Vec<_>>>()?;

        Ok(builder
            .fields(fields)
            .methods(methods)
            .annotations(annotations)
            .build())
    }
}

fn remap_optional_signature(signature: Option<&str>, mappings: &dyn Mappings) -> Result<Option<String>> {
    signature.map(|s| remap_signature(s, mappings)).transpose()
}

fn remap_field(owner: &str, field: &FieldMember, mappings: &dyn Mappings) -> Result<FieldMember> {
    let name = mappings
        .mapped_field_name(owner, &field.name, &field.descriptor)
        .unwrap_or_else(|| field.name.clone());
    Ok(FieldMember {
        name,
        descriptor: remap_descriptor(&field.descriptor, mappings)?,
        access: field.access,
        signature: remap_optional_signature(field.signature.as_deref(), mappings)?,
    })
}

fn remap_method(owner: &str, method: &MethodMember, mappings: &dyn Mappings) -> Result<MethodMember> {
    let name = if method.is_initializer() {
        method.name.clone()
    } else {
        mappings
            .mapped_method_name(owner, &method.name, &method.descriptor)
            .unwrap_or_else(|| method.name.clone())
    };

    let variables = method
        .variables
        .iter()
        .map(|v| remap_variable(owner, method, v, mappings))
        .collect::<Result<Vec<_>>>()?;

    Ok(MethodMember {
        name,
        descriptor: remap_descriptor(&method.descriptor, mappings)?,
        access: method.access,
        signature: remap_optional_signature(method.signature.as_deref(), mappings)?,
        variables,
    })
}

fn remap_variable(
    owner: &str,
    method: &MethodMember,
    variable: &LocalVariable,
    mappings: &dyn Mappings,
) -> Result<LocalVariable> {
    let name = mappings
        .mapped_variable_name(
            owner,
            &method.name,
            &method.descriptor,
            &variable.name,
            &variable.descriptor,
            variable.index,
        )
        .unwrap_or_else(|| variable.name.clone());
    Ok(LocalVariable {
        name,
        descriptor: remap_descriptor(&variable.descriptor, mappings)?,
        signature: remap_optional_signature(variable.signature.as_deref(), mappings)?,
        index: variable.index,
    })
}

fn remap_annotation(annotation: &AnnotationInfo, mappings: &dyn Mappings) -> Result<AnnotationInfo> {
    let mut remapped = AnnotationInfo::new(remap_descriptor(&annotation.descriptor, mappings)?);
    remapped.visible = annotation.visible;
    for element in &annotation.elements {
        remapped = remapped.with_element(element.name.clone(), remap_value(&element.value, mappings)?);
    }
    Ok(remapped)
}

fn remap_value(value: &AnnotationValue, mappings: &dyn Mappings) -> Result<AnnotationValue> {
    Ok(match value {
        AnnotationValue::Literal { value } => AnnotationValue::Literal { value: value.clone() },
        AnnotationValue::Enum { descriptor, constant } => AnnotationValue::Enum {
            descriptor: remap_descriptor(descriptor, mappings)?,
            constant: constant.clone(),
        },
        // `void.class` is the one class literal that is not a field type
        AnnotationValue::Class { descriptor } if descriptor == "V" => AnnotationValue::Class {
            descriptor: descriptor.clone(),
        },
        AnnotationValue::Class { descriptor } => AnnotationValue::Class {
            descriptor: remap_descriptor(descriptor, mappings)?,
        },
        AnnotationValue::Annotation { annotation } => AnnotationValue::Annotation {
            annotation: remap_annotation(annotation, mappings)?,
        },
        AnnotationValue::Array { values } => AnnotationValue::Array {
            values: values
                .iter()
                .map(|v| remap_value(v, mappings))
                .collect::<Result<Vec<_>>>()?,
        },
    })
}
