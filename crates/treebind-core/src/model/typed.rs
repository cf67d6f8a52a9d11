//! Typed values: the binding-side mirror of generic scalar values and nodes.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::model::path::TypedPath;
use crate::model::registry::TypeToken;
use crate::model::value::Decimal64;
use crate::view::LazyView;

/// A value as seen through generated types.
///
/// Primitives carry through unchanged; schema-described value types are
/// tagged with the generated type they belong to, which is what the value
/// codec library dispatches on.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum TypedValue {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Decimal(Decimal64),
    String(Arc<str>),
    Binary(Arc<[u8]>),
    Empty,
    /// A generated enumeration variant.
    Enum {
        type_token: TypeToken,
        variant: Arc<str>,
    },
    /// A generated bit-field record: every member in canonical alphabetical
    /// order, explicitly set or unset.
    Bits {
        type_token: TypeToken,
        fields: BTreeMap<Arc<str>, bool>,
    },
    /// A union value tagged with the member accessor that produced it.
    Union {
        type_token: TypeToken,
        member: Arc<str>,
        value: Box<TypedValue>,
    },
    /// A derived scalar wrapping its base value.
    Scalar {
        type_token: TypeToken,
        value: Box<TypedValue>,
    },
    /// An identity marker.
    Identity { type_token: TypeToken },
    /// An opaque structural reference.
    Reference(TypedPath),
    /// A typed list key.
    Key(ListKey),
    /// A data object: a lazy view or an explicitly built object.
    Object(TypedObject),
    /// Keyed or unkeyed list entries, in iteration order.
    List(Vec<TypedValue>),
    /// Leaf-list values, in entry order.
    LeafSet(Vec<TypedValue>),
}

impl TypedValue {
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        TypedValue::String(s.into())
    }

    pub fn scalar(type_token: TypeToken, value: TypedValue) -> Self {
        TypedValue::Scalar {
            type_token,
            value: Box::new(value),
        }
    }

    pub fn object(object: impl Into<TypedObject>) -> Self {
        TypedValue::Object(object.into())
    }

    pub fn as_object(&self) -> Option<&TypedObject> {
        match self {
            TypedValue::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Bool(v) => write!(f, "{v}"),
            TypedValue::Int8(v) => write!(f, "{v}"),
            TypedValue::Int16(v) => write!(f, "{v}"),
            TypedValue::Int32(v) => write!(f, "{v}"),
            TypedValue::Int64(v) => write!(f, "{v}"),
            TypedValue::Uint8(v) => write!(f, "{v}"),
            TypedValue::Uint16(v) => write!(f, "{v}"),
            TypedValue::Uint32(v) => write!(f, "{v}"),
            TypedValue::Uint64(v) => write!(f, "{v}"),
            TypedValue::Decimal(v) => write!(f, "{v}"),
            TypedValue::String(v) => write!(f, "{v}"),
            TypedValue::Binary(v) => {
                write!(f, "0x")?;
                for byte in v.iter() {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            TypedValue::Empty => write!(f, "(empty)"),
            TypedValue::Enum { variant, .. } => write!(f, "{variant}"),
            TypedValue::Bits { fields, .. } => {
                write!(f, "{{")?;
                let mut first = true;
                for (name, set) in fields {
                    if *set {
                        if !first {
                            write!(f, " ")?;
                        }
                        write!(f, "{name}")?;
                        first = false;
                    }
                }
                write!(f, "}}")
            }
            TypedValue::Union { value, .. } => write!(f, "{value}"),
            TypedValue::Scalar { value, .. } => write!(f, "{value}"),
            TypedValue::Identity { type_token } => write!(f, "{type_token}"),
            TypedValue::Reference(path) => write!(f, "{path:?}"),
            TypedValue::Key(key) => write!(f, "{key:?}"),
            TypedValue::Object(obj) => write!(f, "{obj}"),
            TypedValue::List(entries) | TypedValue::LeafSet(entries) => {
                write!(f, "[")?;
                for (i, entry) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{entry}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// A typed list key: N leaf values identifying one list entry.
///
/// Fields are held in generated-constructor order, which is alphabetical by
/// accessor name. The schema-declared key order is a property of the list
/// schema and is modeled separately by the key codec.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ListKey {
    type_token: TypeToken,
    fields: Vec<(Arc<str>, TypedValue)>,
}

impl ListKey {
    /// Builds a key from accessor-name/value pairs; the pairs are put into
    /// constructor (alphabetical) order regardless of input order.
    pub fn new<N, I>(type_token: TypeToken, fields: I) -> Self
    where
        N: Into<Arc<str>>,
        I: IntoIterator<Item = (N, TypedValue)>,
    {
        let mut fields: Vec<(Arc<str>, TypedValue)> = fields
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        Self { type_token, fields }
    }

    pub fn type_token(&self) -> &TypeToken {
        &self.type_token
    }

    /// Fields in constructor order.
    pub fn fields(&self) -> &[(Arc<str>, TypedValue)] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        self.fields
            .iter()
            .find(|(field, _)| &**field == name)
            .map(|(_, value)| value)
    }
}

impl fmt::Debug for ListKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        write!(f, "]")
    }
}

/// An explicitly constructed data object, the writable counterpart of a
/// [`LazyView`]. Fields are keyed by accessor name.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct BuiltObject {
    type_token: TypeToken,
    fields: BTreeMap<Arc<str>, TypedValue>,
    augments: BTreeMap<TypeToken, Arc<BuiltObject>>,
}

impl BuiltObject {
    pub fn new(type_token: TypeToken) -> Self {
        Self {
            type_token,
            fields: BTreeMap::new(),
            augments: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<Arc<str>>, value: TypedValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn with_augment(mut self, augment: BuiltObject) -> Self {
        self.augments
            .insert(augment.type_token.clone(), Arc::new(augment));
        self
    }

    pub fn type_token(&self) -> &TypeToken {
        &self.type_token
    }

    pub fn field(&self, name: &str) -> Option<&TypedValue> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &BTreeMap<Arc<str>, TypedValue> {
        &self.fields
    }

    pub fn augments(&self) -> &BTreeMap<TypeToken, Arc<BuiltObject>> {
        &self.augments
    }
}

impl fmt::Display for BuiltObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.type_token)?;
        let mut first = true;
        for (name, value) in &self.fields {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {value}")?;
            first = false;
        }
        for (token, augment) in &self.augments {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{token}: {augment}")?;
            first = false;
        }
        write!(f, "}}")
    }
}

/// A data object, either lazily deserialized from a generic node or built
/// in memory. Equality, hashing and printing follow the typed contract:
/// every declared accessor's value plus the merged augmentation map.
#[derive(Clone)]
pub enum TypedObject {
    Built(Arc<BuiltObject>),
    View(LazyView),
}

impl TypedObject {
    pub fn type_token(&self) -> &TypeToken {
        match self {
            TypedObject::Built(obj) => obj.type_token(),
            TypedObject::View(view) => view.type_token(),
        }
    }

    /// The computed value of one accessor, `None` when absent. For views
    /// the value is computed on demand and cached.
    pub fn field(&self, name: &str) -> Option<TypedValue> {
        match self {
            TypedObject::Built(obj) => obj.field(name).cloned(),
            TypedObject::View(view) => view.get(name).ok().flatten(),
        }
    }

    /// Accessor names, in canonical (alphabetical) order.
    pub fn field_names(&self) -> Vec<Arc<str>> {
        match self {
            TypedObject::Built(obj) => obj.fields().keys().cloned().collect(),
            TypedObject::View(view) => {
                let mut names: Vec<Arc<str>> = view.accessor_names().to_vec();
                names.sort();
                names
            }
        }
    }

    /// The content hash over the typed contract. Views publish the result
    /// once and reuse it; built objects compute it fresh.
    pub(crate) fn content_hash(&self) -> u64 {
        if let TypedObject::View(view) = self {
            return view.content_hash();
        }
        let mut hasher = DefaultHasher::new();
        self.hash_content(&mut hasher);
        hasher.finish()
    }

    pub(crate) fn hash_content<H: Hasher>(&self, state: &mut H) {
        self.type_token().hash(state);
        for name in self.field_names() {
            if let Some(value) = self.field(&name) {
                name.hash(state);
                value.hash(state);
            }
        }
        for (token, augment) in self.augments() {
            token.hash(state);
            augment.hash(state);
        }
    }

    /// The merged augmentation map: augmentation type to augmentation value.
    pub fn augments(&self) -> BTreeMap<TypeToken, TypedObject> {
        match self {
            TypedObject::Built(obj) => obj
                .augments()
                .iter()
                .map(|(token, aug)| (token.clone(), TypedObject::Built(aug.clone())))
                .collect(),
            TypedObject::View(view) => view
                .augments()
                .unwrap_or_default()
                .into_iter()
                .map(|(token, aug)| (token, TypedObject::View(aug)))
                .collect(),
        }
    }
}

impl From<BuiltObject> for TypedObject {
    fn from(obj: BuiltObject) -> Self {
        TypedObject::Built(Arc::new(obj))
    }
}

impl From<LazyView> for TypedObject {
    fn from(view: LazyView) -> Self {
        TypedObject::View(view)
    }
}

impl PartialEq for TypedObject {
    fn eq(&self, other: &Self) -> bool {
        if self.type_token() != other.type_token() {
            return false;
        }
        // Built objects are open field maps, so neither side's name set is
        // authoritative on its own: walk the union of both.
        let mut names = self.field_names();
        for name in other.field_names() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        for name in &names {
            if self.field(name) != other.field(name) {
                return false;
            }
        }
        self.augments() == other.augments()
    }
}

impl Eq for TypedObject {}

impl Hash for TypedObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.content_hash());
    }
}

impl fmt::Display for TypedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedObject::Built(obj) => write!(f, "{obj}"),
            TypedObject::View(view) => write!(f, "{view}"),
        }
    }
}

impl fmt::Debug for TypedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_key_normalizes_to_constructor_order() {
        let key = ListKey::new(
            TypeToken::new("EndpointKey"),
            vec![
                ("name", TypedValue::string("x")),
                ("id", TypedValue::Int32(5)),
            ],
        );
        let names: Vec<&str> = key.fields().iter().map(|(n, _)| &**n).collect();
        assert_eq!(names, ["id", "name"]);
        assert_eq!(key.get("id"), Some(&TypedValue::Int32(5)));
    }

    #[test]
    fn built_object_display_omits_nothing_present() {
        let obj = BuiltObject::new(TypeToken::new("Endpoint"))
            .with("id", TypedValue::Int32(5))
            .with("name", TypedValue::string("alpha"));
        assert_eq!(obj.to_string(), "Endpoint{id: 5, name: alpha}");
    }

    #[test]
    fn built_objects_compare_by_value() {
        let a = BuiltObject::new(TypeToken::new("T")).with("x", TypedValue::Int32(1));
        let b = BuiltObject::new(TypeToken::new("T")).with("x", TypedValue::Int32(1));
        let c = BuiltObject::new(TypeToken::new("T")).with("x", TypedValue::Int32(2));
        assert_eq!(TypedObject::from(a.clone()), TypedObject::from(b));
        assert_ne!(TypedObject::from(a), TypedObject::from(c));
    }

    #[test]
    fn superset_fields_break_equality_both_ways() {
        let a = TypedObject::from(BuiltObject::new(TypeToken::new("T")).with("x", TypedValue::Int32(1)));
        let b = TypedObject::from(
            BuiltObject::new(TypeToken::new("T"))
                .with("x", TypedValue::Int32(1))
                .with("y", TypedValue::Int32(2)),
        );
        assert_ne!(a, b);
        assert_ne!(b, a);
    }

    #[test]
    fn augmentation_values_participate_in_equality() {
        fn fingerprint(object: &TypedObject) -> u64 {
            let mut hasher = DefaultHasher::new();
            object.hash(&mut hasher);
            hasher.finish()
        }

        let base = || BuiltObject::new(TypeToken::new("T")).with("x", TypedValue::Int32(1));
        let aug = |v: i32| BuiltObject::new(TypeToken::new("A")).with("y", TypedValue::Int32(v));

        let a = TypedObject::from(base().with_augment(aug(1)));
        let b = TypedObject::from(base().with_augment(aug(1)));
        let c = TypedObject::from(base().with_augment(aug(2)));
        assert_eq!(a, b);
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_ne!(a, c);
        assert_ne!(a, TypedObject::from(base()));
    }
}
