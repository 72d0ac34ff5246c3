//! In-memory rename table
//!
//! The common target of every mapping format: formats parse into an
//! [`IntermediateMappings`] and export from one.

use super::Mappings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// name → descriptor → new name
type MemberTable = BTreeMap<String, BTreeMap<String, String>>;

/// A field or method rename
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberMapping {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub new_name: String,
}

/// A local variable rename, scoped to one method.
///
/// Without an old name the rename applies to whatever variable occupies the slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableMapping {
    pub owner: String,
    pub method_name: String,
    pub method_descriptor: String,
    pub index: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub new_name: String,
}

/// Explicit rename table for classes, fields, methods and variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "MappingsDocument", into = "MappingsDocument")]
pub struct IntermediateMappings {
    classes: BTreeMap<String, String>,
    fields: BTreeMap<String, MemberTable>,
    methods: BTreeMap<String, MemberTable>,
    /// owner → method name + descriptor → slot renames
    variables: BTreeMap<String, BTreeMap<String, Vec<VariableMapping>>>,
}

impl IntermediateMappings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(&mut self, old_name: impl Into<String>, new_name: impl Into<String>) {
        self.classes.insert(old_name.into(), new_name.into());
    }

    pub fn add_field(
        &mut self,
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
        new_name: impl Into<String>,
    ) {
        insert_member(&mut self.fields, owner.into(), name.into(), descriptor.into(), new_name.into());
    }

    pub fn add_method(
        &mut self,
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
        new_name: impl Into<String>,
    ) {
        insert_member(&mut self.methods, owner.into(), name.into(), descriptor.into(), new_name.into());
    }

    /// Add a variable rename; replaces an earlier one for the same slot and old name
    pub fn add_variable(&mut self, mapping: VariableMapping) {
        let slots = self
            .variables
            .entry(mapping.owner.clone())
            .or_default()
            .entry(method_key(&mapping.method_name, &mapping.method_descriptor))
            .or_default();
        slots.retain(|v| !(v.index == mapping.index && v.name == mapping.name));
        slots.push(mapping);
    }

    /// Every class rename, old → new
    pub fn class_mappings(&self) -> &BTreeMap<String, String> {
        &self.classes
    }

    pub fn fields_of(&self, owner: &str) -> Vec<MemberMapping> {
        members_of(&self.fields, owner)
    }

    pub fn methods_of(&self, owner: &str) -> Vec<MemberMapping> {
        members_of(&self.methods, owner)
    }

    pub fn variables_of(&self, owner: &str, method_name: &str, method_descriptor: &str) -> Vec<VariableMapping> {
        self.variables
            .get(owner)
            .and_then(|methods| methods.get(&method_key(method_name, method_descriptor)))
            .cloned()
            .unwrap_or_default()
    }

    pub fn all_fields(&self) -> Vec<MemberMapping> {
        self.fields.keys().flat_map(|owner| self.fields_of(owner)).collect()
    }

    pub fn all_methods(&self) -> Vec<MemberMapping> {
        self.methods.keys().flat_map(|owner| self.methods_of(owner)).collect()
    }

    pub fn all_variables(&self) -> Vec<VariableMapping> {
        self.variables
            .values()
            .flat_map(|methods| methods.values().flatten().cloned())
            .collect()
    }

    /// Total number of renames
    pub fn len(&self) -> usize {
        let members = |table: &BTreeMap<String, MemberTable>| -> usize {
            table
                .values()
                .flat_map(|names| names.values())
                .map(|descriptors| descriptors.len())
                .sum()
        };
        self.classes.len()
            + members(&self.fields)
            + members(&self.methods)
            + self
                .variables
                .values()
                .flat_map(|methods| methods.values())
                .map(Vec::len)
                .sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add every rename of `other`, replacing entries with the same key
    pub fn extend(&mut self, other: IntermediateMappings) {
        let document = MappingsDocument::from(other);
        self.classes.extend(document.classes);
        for m in document.fields {
            self.add_field(m.owner, m.name, m.descriptor, m.new_name);
        }
        for m in document.methods {
            self.add_method(m.owner, m.name, m.descriptor, m.new_name);
        }
        for v in document.variables {
            self.add_variable(v);
        }
    }
}

fn method_key(name: &str, descriptor: &str) -> String {
    format!("{}{}", name, descriptor)
}

fn insert_member(
    table: &mut BTreeMap<String, MemberTable>,
    owner: String,
    name: String,
    descriptor: String,
    new_name: String,
) {
    table
        .entry(owner)
        .or_default()
        .entry(name)
        .or_default()
        .insert(descriptor, new_name);
}

fn lookup_member(table: &BTreeMap<String, MemberTable>, owner: &str, name: &str, descriptor: &str) -> Option<String> {
    table.get(owner)?.get(name)?.get(descriptor).cloned()
}

fn members_of(table: &BTreeMap<String, MemberTable>, owner: &str) -> Vec<MemberMapping> {
    let Some(names) = table.get(owner) else {
        return Vec::new();
    };
    names
        .iter()
        .flat_map(|(name, descriptors)| {
            descriptors.iter().map(move |(descriptor, new_name)| MemberMapping {
                owner: owner.to_string(),
                name: name.clone(),
                descriptor: descriptor.clone(),
                new_name: new_name.clone(),
            })
        })
        .collect()
}

impl Mappings for IntermediateMappings {
    fn mapped_class_name(&self, internal_name: &str) -> Option<String> {
        self.classes.get(internal_name).cloned()
    }

    fn mapped_field_name(&self, owner: &str, name: &str, descriptor: &str) -> Option<String> {
        lookup_member(&self.fields, owner, name, descriptor)
    }

    fn mapped_method_name(&self, owner: &str, name: &str, descriptor: &str) -> Option<String> {
        lookup_member(&self.methods, owner, name, descriptor)
    }

    fn mapped_variable_name(
        &self,
        class_name: &str,
        method_name: &str,
        method_descriptor: &str,
        name: &str,
        _descriptor: &str,
        index: u16,
    ) -> Option<String> {
        let slots = self
            .variables
            .get(class_name)?
            .get(&method_key(method_name, method_descriptor))?;
        let named = slots
            .iter()
            .find(|v| v.index == index && v.name.as_deref() == Some(name));
        let any = || slots.iter().find(|v| v.index == index && v.name.is_none());
        named.or_else(any).map(|v| v.new_name.clone())
    }
}

/// Flat serialized form
#[derive(Debug, Default, Serialize, Deserialize)]
struct MappingsDocument {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    classes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    fields: Vec<MemberMapping>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    methods: Vec<MemberMapping>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    variables: Vec<VariableMapping>,
}

impl From<IntermediateMappings> for MappingsDocument {
    fn from(mappings: IntermediateMappings) -> Self {
        Self {
            fields: mappings.all_fields(),
            methods: mappings.all_methods(),
            variables: mappings.all_variables(),
            classes: mappings.classes,
        }
    }
}

impl From<MappingsDocument> for IntermediateMappings {
    fn from(document: MappingsDocument) -> Self {
        let mut mappings = IntermediateMappings::new();
        mappings.classes = document.classes;
        for m in document.fields {
            mappings.add_field(m.owner, m.name, m.descriptor, m.new_name);
        }
        for m in document.methods {
            mappings.add_method(m.owner, m.name, m.descriptor, m.new_name);
        }
        for v in document.variables {
            mappings.add_variable(v);
        }
        mappings
    }
}
