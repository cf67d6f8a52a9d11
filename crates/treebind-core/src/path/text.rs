//! Text form of generic paths.
//!
//! The reader is a restartable, non-backtracking left-to-right scanner over
//! `"/" qname ("[" predicate "]")*` with predicates `key=value` and
//! `.=value`. Prefixes are resolved through a caller-supplied
//! [`PrefixResolver`]; an unprefixed name inherits the module of the
//! enclosing segment. Mixin segments (choices, list-as-whole) never appear
//! in text; they are re-synthesized by schema lookup while reading and
//! dropped again while writing, so `parse(serialize(p)) == p` for every
//! path the serializer can produce.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::errors::{CodecError, CodecResult};
use crate::model::path::{GenericPath, PathSegment};
use crate::model::qname::{ModuleId, QName};
use crate::model::schema::{SchemaKind, SchemaType};
use crate::model::value::{Decimal64, Value};
use crate::schema_tree::{SchemaTree, SchemaTreeNode, TreeKind};

/// Maps prefixes to modules and back. Callers decide the prefix scheme;
/// the codec only requires the two directions to agree.
pub trait PrefixResolver {
    fn module_for(&self, prefix: &str) -> Option<ModuleId>;
    fn prefix_for(&self, module: &ModuleId) -> Option<String>;
}

/// Text codec over one schema tree and one prefix mapping.
pub struct TextPathCodec<'a, R: PrefixResolver> {
    tree: &'a SchemaTree,
    resolver: &'a R,
}

impl<'a, R: PrefixResolver> TextPathCodec<'a, R> {
    pub fn new(tree: &'a SchemaTree, resolver: &'a R) -> Self {
        Self { tree, resolver }
    }

    pub fn parse(&self, input: &str) -> CodecResult<GenericPath> {
        let mut reader = Reader::new(input);
        let mut path = GenericPath::empty();
        let mut node = self.tree.root().clone();
        let mut module: Option<ModuleId> = None;

        if reader.at_end() {
            return Err(reader.fail("empty path"));
        }
        while !reader.at_end() {
            reader.expect('/')?;
            let qname = self.read_qname(&mut reader, module.as_ref())?;
            module = Some(qname.module().clone());
            node = self.descend(&mut reader, node, qname, &mut path)?;
        }
        Ok(path)
    }

    pub fn serialize(&self, path: &GenericPath) -> CodecResult<String> {
        let mut out = String::new();
        let mut node = self.tree.root().clone();
        let mut last_module: Option<ModuleId> = None;
        let segments = path.segments();
        for (index, segment) in segments.iter().enumerate() {
            let child = node.child_of(segment).ok_or_else(|| serialize_error(
                format!("segment {segment} does not match the schema"),
            ))?;
            match segment {
                PathSegment::Augment(_) => {}
                PathSegment::Node(qname) => {
                    let skip = match child.kind() {
                        TreeKind::Choice => true,
                        TreeKind::ListWhole { .. } | TreeKind::LeafListWhole => {
                            // Collapsed when directly followed by an entry.
                            segments
                                .get(index + 1)
                                .and_then(PathSegment::name)
                                .is_some_and(|next| next == qname)
                        }
                        _ => false,
                    };
                    if !skip {
                        out.push('/');
                        self.write_step_qname(&mut out, qname, &mut last_module)?;
                    }
                }
                PathSegment::KeyedEntry { name, predicates } => {
                    out.push('/');
                    self.write_step_qname(&mut out, name, &mut last_module)?;
                    // Predicates in schema-declared key order.
                    for key in child.schema().key_order() {
                        let value = predicates.get(key).ok_or_else(|| {
                            serialize_error(format!("missing key predicate {key}"))
                        })?;
                        out.push('[');
                        out.push_str(key.local());
                        out.push('=');
                        self.write_value(&mut out, value)?;
                        out.push(']');
                    }
                }
                PathSegment::ValueEntry { name, value } => {
                    out.push('/');
                    self.write_step_qname(&mut out, name, &mut last_module)?;
                    out.push_str("[.=");
                    self.write_value(&mut out, value)?;
                    out.push(']');
                }
            }
            node = child;
        }
        if out.is_empty() {
            out.push('/');
        }
        Ok(out)
    }

    fn descend(
        &self,
        reader: &mut Reader<'_>,
        node: Arc<SchemaTreeNode>,
        qname: QName,
        path: &mut GenericPath,
    ) -> CodecResult<Arc<SchemaTreeNode>> {
        let offset = reader.pos;
        let parent = self.synthesize_mixins(node, &qname, path, offset)?;
        let child = parent
            .child_of(&PathSegment::Node(qname.clone()))
            .ok_or_else(|| CodecError::MalformedPath {
                offset,
                reason: format!("{qname} is not a valid child here"),
            })?;

        match child.kind() {
            TreeKind::LeafListWhole if reader.peek() == Some('[') => {
                path.push(PathSegment::Node(qname.clone()));
                reader.expect('[')?;
                reader.expect('.')?;
                reader.expect('=')?;
                let value_type = child.schema().value_type().cloned().ok_or_else(|| {
                    reader.fail("leaf-list without a value type")
                })?;
                let value = self.read_value(reader, &value_type, qname.module())?;
                reader.expect(']')?;
                let segment = PathSegment::ValueEntry {
                    name: qname,
                    value,
                };
                let entry = child
                    .child_of(&segment)
                    .ok_or_else(|| reader.fail("value predicate is not applicable"))?;
                path.push(segment);
                Ok(entry)
            }
            TreeKind::ListWhole { keyed } if reader.peek() == Some('[') => {
                if !keyed {
                    return Err(reader.fail("predicates on an unkeyed list"));
                }
                path.push(PathSegment::Node(qname.clone()));
                let predicates = self.read_predicates(reader, &child, &qname)?;
                let segment = PathSegment::keyed(qname, predicates);
                let entry = child
                    .child_of(&segment)
                    .ok_or_else(|| reader.fail("key predicates are not applicable"))?;
                path.push(segment);
                Ok(entry)
            }
            _ => {
                path.push(PathSegment::Node(qname));
                Ok(child)
            }
        }
    }

    /// Inserts the choice and augmentation segments text leaves implicit.
    fn synthesize_mixins(
        &self,
        node: Arc<SchemaTreeNode>,
        qname: &QName,
        path: &mut GenericPath,
        offset: usize,
    ) -> CodecResult<Arc<SchemaTreeNode>> {
        let schema = node.schema().clone();
        if schema.child(qname).is_some() {
            return match schema.augment_of(qname) {
                Some(id) => {
                    let segment = PathSegment::Augment(id.clone());
                    let augment =
                        node.child_of(&segment)
                            .ok_or_else(|| CodecError::MalformedPath {
                                offset,
                                reason: format!("augmentation of {qname} is not addressable"),
                            })?;
                    path.push(segment);
                    Ok(augment)
                }
                None => Ok(node),
            };
        }
        // Not a direct child: search choice children one level deep.
        for candidate in schema.children().values() {
            if !candidate.is_choice() {
                continue;
            }
            let in_case = candidate
                .children()
                .values()
                .any(|case| case.child(qname).is_some());
            if in_case {
                let segment = PathSegment::Node(candidate.qname().clone());
                let choice = node
                    .child_of(&segment)
                    .ok_or_else(|| CodecError::MalformedPath {
                        offset,
                        reason: format!("choice {} is not addressable", candidate.qname()),
                    })?;
                path.push(segment);
                return Ok(choice);
            }
        }
        Ok(node)
    }

    fn read_predicates(
        &self,
        reader: &mut Reader<'_>,
        list: &Arc<SchemaTreeNode>,
        list_name: &QName,
    ) -> CodecResult<BTreeMap<QName, Value>> {
        let mut predicates = BTreeMap::new();
        while reader.peek() == Some('[') {
            reader.expect('[')?;
            if reader.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(reader.fail("positional predicates are not supported"));
            }
            let key = self.read_qname(reader, Some(list_name.module()))?;
            reader.expect('=')?;
            let leaf = list
                .schema()
                .child(&key)
                .and_then(|leaf| leaf.value_type().cloned())
                .ok_or_else(|| reader.fail(format!("{key} is not a key leaf")))?;
            let value = self.read_value(reader, &leaf, key.module())?;
            reader.expect(']')?;
            if predicates.insert(key.clone(), value).is_some() {
                return Err(reader.fail(format!("duplicate predicate {key}")));
            }
        }
        Ok(predicates)
    }

    fn read_qname(
        &self,
        reader: &mut Reader<'_>,
        inherited: Option<&ModuleId>,
    ) -> CodecResult<QName> {
        let start = reader.pos;
        let first = reader.read_identifier()?;
        if reader.peek() == Some(':') {
            reader.expect(':')?;
            let local = reader.read_identifier()?;
            let module =
                self.resolver
                    .module_for(&first)
                    .ok_or_else(|| CodecError::MalformedPath {
                        offset: start,
                        reason: format!("unknown prefix {first}"),
                    })?;
            return Ok(QName::new(module, local));
        }
        let module = inherited.ok_or_else(|| CodecError::MalformedPath {
            offset: start,
            reason: format!("{first} has no prefix and no module to inherit"),
        })?;
        Ok(QName::new(module.clone(), first))
    }

    fn read_value(
        &self,
        reader: &mut Reader<'_>,
        value_type: &SchemaType,
        module: &ModuleId,
    ) -> CodecResult<Value> {
        let start = reader.pos;
        let (literal, quoted) = reader.read_literal()?;
        self.parse_value(&literal, quoted, value_type, module)
            .map_err(|reason| CodecError::MalformedPath {
                offset: start,
                reason,
            })
    }

    fn parse_value(
        &self,
        literal: &str,
        quoted: bool,
        value_type: &SchemaType,
        module: &ModuleId,
    ) -> Result<Value, String> {
        fn int<T: std::str::FromStr>(literal: &str, what: &str) -> Result<T, String> {
            literal
                .parse::<T>()
                .map_err(|_| format!("{literal} is not a valid {what}"))
        }
        match value_type {
            SchemaType::String => {
                if !quoted {
                    return Err(format!("string value {literal} must be quoted"));
                }
                Ok(Value::string(literal))
            }
            SchemaType::Enumeration { symbols } => {
                if symbols.iter().any(|s| &**s == literal) {
                    Ok(Value::string(literal))
                } else {
                    Err(format!("{literal} is not a declared symbol"))
                }
            }
            SchemaType::Bool => match literal {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                other => Err(format!("{other} is not a boolean")),
            },
            SchemaType::Int8 => int(literal, "int8").map(Value::Int8),
            SchemaType::Int16 => int(literal, "int16").map(Value::Int16),
            SchemaType::Int32 => int(literal, "int32").map(Value::Int32),
            SchemaType::Int64 => int(literal, "int64").map(Value::Int64),
            SchemaType::Uint8 => int(literal, "uint8").map(Value::Uint8),
            SchemaType::Uint16 => int(literal, "uint16").map(Value::Uint16),
            SchemaType::Uint32 => int(literal, "uint32").map(Value::Uint32),
            SchemaType::Uint64 => int(literal, "uint64").map(Value::Uint64),
            SchemaType::Decimal { fraction_digits } => {
                parse_decimal(literal, *fraction_digits).map(Value::Decimal)
            }
            SchemaType::IdentityRef { .. } => {
                let (prefix, local) = match literal.split_once(':') {
                    Some((prefix, local)) => (Some(prefix), local),
                    None => (None, literal),
                };
                let module = match prefix {
                    Some(prefix) => self
                        .resolver
                        .module_for(prefix)
                        .ok_or_else(|| format!("unknown prefix {prefix}"))?,
                    None => module.clone(),
                };
                Ok(Value::Identity(QName::new(module, local)))
            }
            SchemaType::Union { members } => {
                for member in members {
                    if let Ok(value) = self.parse_value(literal, quoted, member, module) {
                        return Ok(value);
                    }
                }
                Err(format!("{literal} matches no union member"))
            }
            other => Err(format!("{other:?} values cannot appear in path text")),
        }
    }

    /// Writes a path-step name, prefixing it only when the module differs
    /// from the preceding step's. The parser inherits modules the same way.
    fn write_step_qname(
        &self,
        out: &mut String,
        qname: &QName,
        last_module: &mut Option<ModuleId>,
    ) -> CodecResult<()> {
        if last_module.as_ref() != Some(qname.module()) {
            let prefix = self.resolver.prefix_for(qname.module()).ok_or_else(|| {
                serialize_error(format!("no prefix for module {}", qname.module()))
            })?;
            out.push_str(&prefix);
            out.push(':');
            *last_module = Some(qname.module().clone());
        }
        out.push_str(qname.local());
        Ok(())
    }

    fn write_qname(&self, out: &mut String, qname: &QName) -> CodecResult<()> {
        let prefix = self
            .resolver
            .prefix_for(qname.module())
            .ok_or_else(|| serialize_error(format!("no prefix for module {}", qname.module())))?;
        out.push_str(&prefix);
        out.push(':');
        out.push_str(qname.local());
        Ok(())
    }

    fn write_value(&self, out: &mut String, value: &Value) -> CodecResult<()> {
        match value {
            Value::String(s) => {
                let quote = if s.contains('"') { '\'' } else { '"' };
                if s.contains(quote) {
                    return Err(serialize_error(format!(
                        "string {s} cannot be quoted in path text"
                    )));
                }
                out.push(quote);
                out.push_str(s);
                out.push(quote);
            }
            Value::Identity(qname) => self.write_qname(out, qname)?,
            other => out.push_str(&other.to_string()),
        }
        Ok(())
    }
}

fn serialize_error(reason: String) -> CodecError {
    CodecError::MalformedPath { offset: 0, reason }
}

fn parse_decimal(literal: &str, fraction_digits: u8) -> Result<Decimal64, String> {
    let bad = || format!("{literal} is not a valid decimal");
    let (whole, fraction) = literal.split_once('.').unwrap_or((literal, ""));
    if fraction.len() > fraction_digits as usize || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(bad());
    }
    let negative = whole.starts_with('-');
    let whole: i64 = whole.parse().map_err(|_| bad())?;
    let scale = 10i64.checked_pow(u32::from(fraction_digits)).ok_or_else(bad)?;
    let mut digits = whole.checked_mul(scale).ok_or_else(bad)?;
    if !fraction.is_empty() {
        let mut fraction_value: i64 = fraction.parse().map_err(|_| bad())?;
        for _ in 0..(fraction_digits as usize - fraction.len()) {
            fraction_value = fraction_value.checked_mul(10).ok_or_else(bad)?;
        }
        if negative {
            fraction_value = -fraction_value;
        }
        digits = digits.checked_add(fraction_value).ok_or_else(bad)?;
    }
    Ok(Decimal64::new(digits, fraction_digits))
}

struct Reader<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn expect(&mut self, wanted: char) -> CodecResult<()> {
        match self.peek() {
            Some(c) if c == wanted => {
                self.bump();
                Ok(())
            }
            found => Err(CodecError::MalformedPath {
                offset: self.pos,
                reason: match found {
                    Some(c) => format!("expected '{wanted}', found '{c}'"),
                    None => format!("expected '{wanted}', found end of input"),
                },
            }),
        }
    }

    fn fail(&self, reason: impl Into<String>) -> CodecError {
        CodecError::MalformedPath {
            offset: self.pos,
            reason: reason.into(),
        }
    }

    fn read_identifier(&mut self) -> CodecResult<String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                self.bump();
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.fail("expected a name"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    /// Reads a predicate value: a quoted string or a bare token running to
    /// the closing bracket.
    fn read_literal(&mut self) -> CodecResult<(String, bool)> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c == quote {
                        let literal = self.input[start..self.pos].to_string();
                        self.bump();
                        return Ok((literal, true));
                    }
                    self.bump();
                }
                Err(self.fail("unterminated quoted value"))
            }
            Some(_) => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c == ']' {
                        break;
                    }
                    self.bump();
                }
                if self.pos == start {
                    return Err(self.fail("expected a value"));
                }
                Ok((self.input[start..self.pos].to_string(), false))
            }
            None => Err(self.fail("expected a value")),
        }
    }
}
