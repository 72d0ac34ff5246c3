//! Mapping file formats
//!
//! The simple line format, one rename per line:
//!
//! ```text
//! # comment
//! a/Old b/New                          class
//! a/Old.count I total                  field: owner.name descriptor new
//! a/Old.run(I)V execute                method: owner.name(descriptor) new
//! a/Old.run(I)V#1:i index              variable: method#slot[:old] new
//! ```

use super::descriptor::{is_method_descriptor, validate_descriptor};
use super::intermediate::{IntermediateMappings, VariableMapping};
use crate::{Error, Result};

/// Reads and writes [`IntermediateMappings`]
pub trait MappingFormat {
    fn name(&self) -> &'static str;

    fn parse(&self, text: &str) -> Result<IntermediateMappings>;

    fn export(&self, mappings: &IntermediateMappings) -> Result<String>;
}

/// Look up a format by name (`simple` or `json`)
pub fn by_name(name: &str) -> Option<Box<dyn MappingFormat>> {
    match name {
        "simple" => Some(Box::new(SimpleFormat)),
        "json" => Some(Box::new(JsonFormat)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleFormat;

fn parse_error(line: usize, message: impl Into<String>) -> Error {
    Error::MappingParse {
        line,
        message: message.into(),
    }
}

/// Comments start with '#' at the start of a line or after whitespace.
/// A '#' inside a token is a variable slot separator.
fn strip_comment(line: &str) -> &str {
    let mut previous = None;
    for (i, c) in line.char_indices() {
        if c == '#' && previous.is_none_or(char::is_whitespace) {
            return &line[..i];
        }
        previous = Some(c);
    }
    line
}

/// Split `owner.member` at the last '.'
fn split_owner(line: usize, qualified: &str) -> Result<(String, String)> {
    let (owner, name) = qualified
        .rsplit_once('.')
        .ok_or_else(|| parse_error(line, format!("expected owner.name, got '{}'", qualified)))?;
    if owner.is_empty() || name.is_empty() {
        return Err(parse_error(line, format!("empty owner or name in '{}'", qualified)));
    }
    Ok((owner.to_string(), name.to_string()))
}

/// Split `owner.name(desc)ret` into owner, name and descriptor
fn split_method(line: usize, key: &str) -> Result<(String, String, String)> {
    let paren = key
        .find('(')
        .ok_or_else(|| parse_error(line, format!("missing method descriptor in '{}'", key)))?;
    let (owner, name) = split_owner(line, &key[..paren])?;
    let descriptor = &key[paren..];
    check_descriptor(line, descriptor)?;
    Ok((owner, name, descriptor.to_string()))
}

fn check_descriptor(line: usize, descriptor: &str) -> Result<()> {
    validate_descriptor(descriptor).map_err(|e| parse_error(line, e.to_string()))
}

impl SimpleFormat {
    fn parse_line(mappings: &mut IntermediateMappings, line: usize, tokens: &[&str]) -> Result<()> {
        match tokens {
            [key, new] if key.contains('(') && key.contains('#') => {
                let (method, slot) = key
                    .rsplit_once('#')
                    .ok_or_else(|| parse_error(line, "missing variable slot"))?;
                let (owner, method_name, method_descriptor) = split_method(line, method)?;
                let (index, name) = match slot.split_once(':') {
                    Some((index, name)) => (index, Some(name.to_string())),
                    None => (slot, None),
                };
                let index: u16 = index
                    .parse()
                    .map_err(|_| parse_error(line, format!("invalid variable slot '{}'", index)))?;
                mappings.add_variable(VariableMapping {
                    owner,
                    method_name,
                    method_descriptor,
                    index,
                    name,
                    new_name: new.to_string(),
                });
            }
            [key, new] if key.contains('(') => {
                let (owner, name, descriptor) = split_method(line, key)?;
                mappings.add_method(owner, name, descriptor, *new);
            }
            [old, new] => mappings.add_class(*old, *new),
            [key, descriptor, new] => {
                let (owner, name) = split_owner(line, key)?;
                if is_method_descriptor(descriptor) {
                    return Err(parse_error(
                        line,
                        format!("field {} has a method descriptor", key),
                    ));
                }
                check_descriptor(line, descriptor)?;
                mappings.add_field(owner, name, *descriptor, *new);
            }
            _ => {
                return Err(parse_error(
                    line,
                    format!("expected 2 or 3 columns, got {}", tokens.len()),
                ))
            }
        }
        Ok(())
    }
}

impl MappingFormat for SimpleFormat {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn parse(&self, text: &str) -> Result<IntermediateMappings> {
        let mut mappings = IntermediateMappings::new();
        for (i, raw) in text.lines().enumerate() {
            let content = strip_comment(raw);
            let tokens: Vec<&str> = content.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }
            Self::parse_line(&mut mappings, i + 1, &tokens)?;
        }
        Ok(mappings)
    }

    fn export(&self, mappings: &IntermediateMappings) -> Result<String> {
        let mut out = String::new();
        for (old, new) in mappings.class_mappings() {
            out.push_str(&format!("{} {}\n", old, new));
        }
        for m in mappings.all_fields() {
            out.push_str(&format!("{}.{} {} {}\n", m.owner, m.name, m.descriptor, m.new_name));
        }
        for m in mappings.all_methods() {
            out.push_str(&format!("{}.{}{} {}\n", m.owner, m.name, m.descriptor, m.new_name));
        }
        for v in mappings.all_variables() {
            let slot = match &v.name {
                Some(name) => format!("{}:{}", v.index, name),
                None => v.index.to_string(),
            };
            out.push_str(&format!(
                "{}.{}{}#{} {}\n",
                v.owner, v.method_name, v.method_descriptor, slot, v.new_name
            ));
        }
        Ok(out)
    }
}

/// [`IntermediateMappings`] in its serde JSON form
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl MappingFormat for JsonFormat {
    fn name(&self) -> &'static str {
        "json"
    }

    fn parse(&self, text: &str) -> Result<IntermediateMappings> {
        Ok(serde_json::from_str(text)?)
    }

    fn export(&self, mappings: &IntermediateMappings) -> Result<String> {
        Ok(serde_json::to_string_pretty(mappings)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::Mappings;

    const SAMPLE: &str = "\
# renames for the sample app
a/Old b/New
a/Old.count I total   # trailing note
a/Old.run(I)V execute
a/Old.run(I)V#1:i index
a/Old.run(I)V#2 other	# slot only

";

    #[test]
    fn test_parse_every_kind() {
        let mappings = SimpleFormat.parse(SAMPLE).unwrap();
        assert_eq!(mappings.mapped_class_name("a/Old").as_deref(), Some("b/New"));
        assert_eq!(mappings.mapped_field_name("a/Old", "count", "I").as_deref(), Some("total"));
        assert_eq!(mappings.mapped_method_name("a/Old", "run", "(I)V").as_deref(), Some("execute"));
        assert_eq!(
            mappings
                .mapped_variable_name("a/Old", "run", "(I)V", "i", "I", 1)
                .as_deref(),
            Some("index")
        );
        assert_eq!(
            mappings
                .mapped_variable_name("a/Old", "run", "(I)V", "x", "J", 2)
                .as_deref(),
            Some("other")
        );
        assert_eq!(mappings.len(), 5);
    }

    #[test]
    fn test_export_parses_back() {
        let mappings = SimpleFormat.parse(SAMPLE).unwrap();
        let text = SimpleFormat.export(&mappings).unwrap();
        assert!(text.starts_with("a/Old b/New\n"));
        assert_eq!(SimpleFormat.parse(&text).unwrap(), mappings);
    }

    #[test]
    fn test_parse_errors_carry_line() {
        let err = SimpleFormat.parse("a/A b/B\nnonsense\n").unwrap_err();
        assert!(matches!(err, Error::MappingParse { line: 2, .. }));

        let err = SimpleFormat.parse("a/A.m(I)V#x n\n").unwrap_err();
        assert!(matches!(err, Error::MappingParse { line: 1, .. }));

        let err = SimpleFormat.parse("noowner I f\n").unwrap_err();
        assert!(matches!(err, Error::MappingParse { line: 1, .. }));

        let err = SimpleFormat.parse("a/A.f (I)V f\n").unwrap_err();
        assert!(matches!(err, Error::MappingParse { line: 1, .. }));

        let err = SimpleFormat.parse("a/A b/B\na/A.m(Lfoo)V n\n").unwrap_err();
        assert!(matches!(err, Error::MappingParse { line: 2, .. }));
    }

    #[test]
    fn test_json_format() {
        let mappings = SimpleFormat.parse(SAMPLE).unwrap();
        let json = JsonFormat.export(&mappings).unwrap();
        assert_eq!(JsonFormat.parse(&json).unwrap(), mappings);
        assert!(matches!(JsonFormat.parse("{"), Err(Error::Json(_))));
    }

    #[test]
    fn test_by_name() {
        assert_eq!(by_name("simple").unwrap().name(), "simple");
        assert_eq!(by_name("json").unwrap().name(), "json");
        assert!(by_name("tiny").is_none());
    }
}
