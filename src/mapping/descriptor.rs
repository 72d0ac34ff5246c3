//! Descriptor and generic signature rewriting
//!
//! Descriptors (`I`, `[Ljava/lang/String;`, `(IJ)La/B;`) and generic
//! signatures (`<T:Ljava/lang/Object;>La/Base<TT;>;`) both embed class
//! names. Rewriting parses them fully and swaps every class name through
//! the mappings, so malformed input is reported instead of half-rewritten.

use super::Mappings;
use crate::{Error, Result};

/// Rewrite the class names of a field or method descriptor
pub fn remap_descriptor(descriptor: &str, mappings: &dyn Mappings) -> Result<String> {
    let mut parser = Parser::new(descriptor, mappings);
    if parser.peek() == Some(b'(') {
        parser.method_descriptor()?;
    } else {
        parser.field_type(false)?;
    }
    parser.finish()
}

/// Rewrite the class names of a class, method or field generic signature.
///
/// Type variables are left alone; inner classes written as `Outer<..>.Inner`
/// are resolved as `Outer$Inner` before lookup.
pub fn remap_signature(signature: &str, mappings: &dyn Mappings) -> Result<String> {
    let mut parser = Parser::new(signature, mappings);
    if parser.peek() == Some(b'<') {
        parser.type_parameters()?;
    }
    if parser.peek() == Some(b'(') {
        parser.method_signature()?;
    } else {
        parser.reference_type()?;
        while !parser.at_end() {
            parser.reference_type()?;
        }
    }
    parser.finish()
}

/// Rewrite an internal name, or an array descriptor standing in for one
pub fn remap_internal_name(name: &str, mappings: &dyn Mappings) -> Result<String> {
    if name.starts_with('[') {
        return remap_descriptor(name, mappings);
    }
    Ok(mappings
        .mapped_class_name(name)
        .unwrap_or_else(|| name.to_string()))
}

/// Check a field or method descriptor without rewriting it
pub fn validate_descriptor(descriptor: &str) -> Result<()> {
    remap_descriptor(descriptor, &super::EmptyMappings).map(|_| ())
}

pub fn is_method_descriptor(descriptor: &str) -> bool {
    descriptor.starts_with('(')
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    out: String,
    mappings: &'a dyn Mappings,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, mappings: &'a dyn Mappings) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            out: String::with_capacity(input.len()),
            mappings,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn error(&self, message: &str) -> Error {
        Error::InvalidDescriptor(format!("{} at offset {} in '{}'", message, self.pos, self.input))
    }

    fn finish(self) -> Result<String> {
        if !self.at_end() {
            return Err(self.error("trailing characters"));
        }
        Ok(self.out)
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        if self.peek() != Some(byte) {
            return Err(self.error(&format!("expected '{}'", byte as char)));
        }
        self.out.push(byte as char);
        self.pos += 1;
        Ok(())
    }

    /// Read up to (not including) any of `stops`; must be non-empty
    fn identifier(&mut self, stops: &[u8]) -> Result<&'a str> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if stops.contains(&b) {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start || self.at_end() {
            return Err(self.error("unterminated or empty name"));
        }
        Ok(&self.input[start..self.pos])
    }

    fn method_descriptor(&mut self) -> Result<()> {
        self.expect(b'(')?;
        while self.peek() != Some(b')') {
            if self.at_end() {
                return Err(self.error("unterminated parameter list"));
            }
            self.field_type(false)?;
        }
        self.expect(b')')?;
        self.field_type(true)
    }

    /// Plain descriptor type; `void` only in return position
    fn field_type(&mut self, allow_void: bool) -> Result<()> {
        match self.peek() {
            Some(b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z') => self.primitive(),
            Some(b'V') if allow_void => self.primitive(),
            Some(b'[') => {
                self.expect(b'[')?;
                self.field_type(false)
            }
            Some(b'L') => {
                self.expect(b'L')?;
                let name = self.identifier(b";")?;
                let mapped = self
                    .mappings
                    .mapped_class_name(name)
                    .unwrap_or_else(|| name.to_string());
                self.out.push_str(&mapped);
                self.expect(b';')
            }
            _ => Err(self.error("expected a type")),
        }
    }

    fn primitive(&mut self) -> Result<()> {
        if let Some(b) = self.peek() {
            self.out.push(b as char);
            self.pos += 1;
        }
        Ok(())
    }

    fn type_parameters(&mut self) -> Result<()> {
        self.expect(b'<')?;
        loop {
            let name = self.identifier(b":>")?;
            self.out.push_str(name);
            // Class bound may be empty, interface bounds follow with ':'
            self.expect(b':')?;
            if matches!(self.peek(), Some(b'L' | b'T' | b'[')) {
                self.reference_type()?;
            }
            while self.peek() == Some(b':') {
                self.expect(b':')?;
                self.reference_type()?;
            }
            match self.peek() {
                Some(b'>') => break,
                None => return Err(self.error("unterminated type parameters")),
                _ => {}
            }
        }
        self.expect(b'>')
    }

    fn method_signature(&mut self) -> Result<()> {
        self.expect(b'(')?;
        while self.peek() != Some(b')') {
            if self.at_end() {
                return Err(self.error("unterminated parameter list"));
            }
            self.type_signature(false)?;
        }
        self.expect(b')')?;
        self.type_signature(true)?;
        while self.peek() == Some(b'^') {
            self.expect(b'^')?;
            self.reference_type()?;
        }
        Ok(())
    }

    fn type_signature(&mut self, allow_void: bool) -> Result<()> {
        match self.peek() {
            Some(b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z') => self.primitive(),
            Some(b'V') if allow_void => self.primitive(),
            _ => self.reference_type(),
        }
    }

    fn reference_type(&mut self) -> Result<()> {
        match self.peek() {
            Some(b'L') => self.class_type(),
            Some(b'T') => {
                self.expect(b'T')?;
                let name = self.identifier(b";")?;
                self.out.push_str(name);
                self.expect(b';')
            }
            Some(b'[') => {
                self.expect(b'[')?;
                self.type_signature(false)
            }
            _ => Err(self.error("expected a reference type")),
        }
    }

    fn class_type(&mut self) -> Result<()> {
        self.expect(b'L')?;
        let outer = self.identifier(b"<.;")?;
        let mut original = outer.to_string();
        let mut mapped = self
            .mappings
            .mapped_class_name(outer)
            .unwrap_or_else(|| outer.to_string());
        self.out.push_str(&mapped);
        if self.peek() == Some(b'<') {
            self.type_arguments()?;
        }

        while self.peek() == Some(b'.') {
            self.expect(b'.')?;
            let inner = self.identifier(b"<.;")?;
            original = format!("{}${}", original, inner);
            let simple = match self.mappings.mapped_class_name(&original) {
                Some(full) => {
                    let prefix = format!("{}$", mapped);
                    let simple = match full.strip_prefix(&prefix) {
                        Some(rest) => rest.to_string(),
                        None => full
                            .rsplit(['$', '/'])
                            .next()
                            .unwrap_or(inner)
                            .to_string(),
                    };
                    mapped = full;
                    simple
                }
                None => {
                    mapped = format!("{}${}", mapped, inner);
                    inner.to_string()
                }
            };
            self.out.push_str(&simple);
            if self.peek() == Some(b'<') {
                self.type_arguments()?;
            }
        }
        self.expect(b';')
    }

    fn type_arguments(&mut self) -> Result<()> {
        self.expect(b'<')?;
        loop {
            match self.peek() {
                Some(b'*') => self.expect(b'*')?,
                Some(b'+') => {
                    self.expect(b'+')?;
                    self.reference_type()?;
                }
                Some(b'-') => {
                    self.expect(b'-')?;
                    self.reference_type()?;
                }
                Some(b'>') => break,
                None => return Err(self.error("unterminated type arguments")),
                _ => self.reference_type()?,
            }
        }
        self.expect(b'>')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::IntermediateMappings;

    fn mappings() -> IntermediateMappings {
        let mut m = IntermediateMappings::new();
        m.add_class("a/A", "x/Alpha");
        m.add_class("a/Outer", "x/Shell");
        m.add_class("a/Outer$Inner", "x/Shell$Core");
        m.add_class("a/Outer$Other", "y/Detached");
        m
    }

    #[test]
    fn test_remap_field_descriptors() {
        let m = mappings();
        assert_eq!(remap_descriptor("I", &m).unwrap(), "I");
        assert_eq!(remap_descriptor("La/A;", &m).unwrap(), "Lx/Alpha;");
        assert_eq!(remap_descriptor("[[La/A;", &m).unwrap(), "[[Lx/Alpha;");
        assert_eq!(remap_descriptor("La/B;", &m).unwrap(), "La/B;");
    }

    #[test]
    fn test_remap_method_descriptor() {
        let m = mappings();
        assert_eq!(
            remap_descriptor("(ILa/A;[J)La/Outer;", &m).unwrap(),
            "(ILx/Alpha;[J)Lx/Shell;"
        );
        assert_eq!(remap_descriptor("()V", &m).unwrap(), "()V");
    }

    #[test]
    fn test_invalid_descriptors() {
        let m = mappings();
        for bad in ["", "V", "La/A", "(I", "(I)", "Q", "II", "(V)V", "L;"] {
            assert!(
                matches!(remap_descriptor(bad, &m), Err(Error::InvalidDescriptor(_))),
                "accepted {:?}",
                bad
            );
        }
        assert!(validate_descriptor("(Ljava/lang/String;)[I").is_ok());
    }

    #[test]
    fn test_remap_class_signature() {
        let m = mappings();
        let signature = "<T:La/A;U::Ljava/lang/Comparable<TT;>;>La/Outer<TT;>;Ljava/util/List<+La/A;>;";
        assert_eq!(
            remap_signature(signature, &m).unwrap(),
            "<T:Lx/Alpha;U::Ljava/lang/Comparable<TT;>;>Lx/Shell<TT;>;Ljava/util/List<+Lx/Alpha;>;"
        );
    }

    #[test]
    fn test_remap_method_signature() {
        let m = mappings();
        assert_eq!(
            remap_signature("<E:Ljava/lang/Exception;>(Ljava/util/Map<*-La/A;>;)TE;^TE;^La/A;", &m)
                .unwrap(),
            "<E:Ljava/lang/Exception;>(Ljava/util/Map<*-Lx/Alpha;>;)TE;^TE;^Lx/Alpha;"
        );
    }

    #[test]
    fn test_remap_inner_class_signature() {
        let m = mappings();
        assert_eq!(
            remap_signature("La/Outer<La/A;>.Inner<TT;>;", &m).unwrap(),
            "Lx/Shell<Lx/Alpha;>.Core<TT;>;"
        );
        assert_eq!(
            remap_signature("La/Outer.Other;", &m).unwrap(),
            "Lx/Shell.Detached;"
        );
        assert_eq!(
            remap_signature("La/Outer.Unmapped;", &m).unwrap(),
            "Lx/Shell.Unmapped;"
        );
    }

    #[test]
    fn test_type_variable_named_like_class_marker() {
        let m = mappings();
        assert_eq!(
            remap_signature("<L:La/A;>TL;", &m).unwrap(),
            "<L:Lx/Alpha;>TL;"
        );
    }

    #[test]
    fn test_invalid_signatures() {
        let m = mappings();
        for bad in ["La/A<", "<T:>", "TT", "(TT;", "La/A;Q"] {
            assert!(remap_signature(bad, &m).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_remap_internal_name() {
        let m = mappings();
        assert_eq!(remap_internal_name("a/A", &m).unwrap(), "x/Alpha");
        assert_eq!(remap_internal_name("[La/A;", &m).unwrap(), "[Lx/Alpha;");
        assert_eq!(remap_internal_name("b/B", &m).unwrap(), "b/B");
    }
}
