//! Struct schema compiler and the process-wide schema cache.
//!
//! A record's derive emits a table of [`FieldDef`]s. [`compile`] walks that table once,
//! inlining `flatten` sub-records, and produces a [`Schema`]: the ordered wire fields, each
//! with the *route* its accessors are addressed by. [`schema_of`] memoizes the result for the
//! rest of the process.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::OnceLock;

use parking_lot::RwLock;

use crate::record::Record;

/// Flattening deeper than this is treated as a cycle and dropped.
pub const MAX_FLATTEN_DEPTH: usize = 64;

/// Wire-level kind of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// `bool`
    Bool,
    /// Signed integer of any width.
    Int,
    /// Unsigned integer of any width.
    Uint,
    /// `f32`
    Float32,
    /// `f64`
    Float64,
    /// Text (`String`, `&str`, `Cow<str>`).
    Str,
    /// Byte sequence, encoded as binary.
    Bytes,
    /// Homogeneous sequence; see [`FieldDef::elem`].
    Seq,
    /// String-keyed map; see [`FieldDef::elem`].
    Map,
    /// Nested record.
    Record,
    /// Open-ended value (`Value`, `Dynamic`).
    Dynamic,
    /// Extension value.
    Ext,
}

/// One declared field, as emitted by the derive.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// Wire name.
    pub name: &'static str,
    /// Field kind.
    pub kind: FieldKind,
    /// Element kind for sequences, value kind for maps.
    pub elem: Option<FieldKind>,
    /// Declared as `Option<T>`.
    pub nullable: bool,
    /// Left out of the encoded map while holding its empty value.
    pub omit_empty: bool,
    /// Field table of a flattened sub-record.
    pub flatten: Option<fn() -> Vec<FieldDef>>,
}

impl FieldDef {
    /// A plain field of `kind`.
    #[must_use]
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            elem: None,
            nullable: false,
            omit_empty: false,
            flatten: None,
        }
    }
}

/// A compiled wire field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Wire name.
    pub name: &'static str,
    /// Declared index, then indices inside flattened sub-records.
    pub route: Box<[u16]>,
    /// Field kind.
    pub kind: FieldKind,
    /// Element kind for containers.
    pub elem: Option<FieldKind>,
    /// Declared as `Option<T>`.
    pub nullable: bool,
    /// Left out of the encoded map while holding its empty value.
    pub omit_empty: bool,
}

/// Ordered wire fields of one record type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    fields: Vec<FieldDescriptor>,
}

impl Schema {
    /// Fields in encode order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Number of wire fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the record has no wire fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Find the field with wire name `key` by linear scan.
    #[must_use]
    pub fn find(&self, key: &[u8]) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name.as_bytes() == key)
    }
}

/// Compile the field table of `T`.
///
/// Prefer [`schema_of`], which compiles each record once per process.
#[must_use]
pub fn compile<T: Record>() -> Schema {
    compile_table(T::fields)
}

/// Compile a raw field table.
#[must_use]
pub fn compile_table(fields: fn() -> Vec<FieldDef>) -> Schema {
    let mut route = Vec::new();
    Schema {
        fields: collect(fields, &mut route, 0),
    }
}

fn collect(fields: fn() -> Vec<FieldDef>, route: &mut Vec<u16>, depth: usize) -> Vec<FieldDescriptor> {
    let defs = fields();
    let mut out: Vec<FieldDescriptor> = Vec::with_capacity(defs.len());
    let shadowed = |name: &str, out: &[FieldDescriptor]| {
        defs.iter().any(|d| d.flatten.is_none() && d.name == name) || out.iter().any(|f| f.name == name)
    };

    for (idx, def) in (0u16..).zip(defs.iter()) {
        route.push(idx);
        match def.flatten {
            None => out.push(FieldDescriptor {
                name: def.name,
                route: route.as_slice().into(),
                kind: def.kind,
                elem: def.elem,
                nullable: def.nullable,
                omit_empty: def.omit_empty,
            }),
            Some(sub) if depth < MAX_FLATTEN_DEPTH => {
                for field in collect(sub, route, depth + 1) {
                    if !shadowed(field.name, &out) {
                        out.push(field);
                    }
                }
            }
            Some(_) => {
                debug!(field = def.name, "flatten depth limit reached; field dropped");
            }
        }
        route.pop();
    }
    out
}

/// Identity of a compiled schema.
///
/// A record declaration plus the keys of the records it flattens, so a generic record that
/// flattens its parameter gets one schema per flattened instantiation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaKey {
    decl: TypeId,
    flattened: Vec<SchemaKey>,
}

impl SchemaKey {
    /// Key of the declaration identified by the marker type `M`.
    #[must_use]
    pub fn of<M: 'static>() -> Self {
        Self {
            decl: TypeId::of::<M>(),
            flattened: Vec::new(),
        }
    }

    /// Append the key of a flattened field's record, in declaration order.
    #[must_use]
    pub fn with(mut self, flattened: Self) -> Self {
        self.flattened.push(flattened);
        self
    }
}

type SchemaCache = RwLock<HashMap<SchemaKey, &'static Schema>>;

static CACHE: OnceLock<SchemaCache> = OnceLock::new();

fn cache() -> &'static SchemaCache {
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// The compiled schema of `T`, compiled on first use and shared by every thread afterwards.
///
/// The cache grows by one entry per [`SchemaKey`] and is never cleared; entries live for
/// the rest of the process.
#[must_use]
pub fn schema_of<T: Record>() -> &'static Schema {
    let key = T::schema_key();
    let cached = cache().read().get(&key).copied();
    if let Some(schema) = cached {
        return schema;
    }

    let mut cache = cache().write();
    if let Some(schema) = cache.get(&key).copied() {
        return schema;
    }
    let schema: &'static Schema = Box::leak(Box::new(compile::<T>()));
    cache.insert(key, schema);
    debug!(
        record = std::any::type_name::<T>(),
        fields = schema.len(),
        "compiled record schema"
    );
    schema
}
