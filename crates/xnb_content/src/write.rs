//! Types for encoding the object payload
//!

use tracing::{debug, instrument};

use crate::cursor::ByteWriter;
use crate::descriptor::TypeDescriptor;
use crate::error::{Error, Result};
use crate::registry::{Primitive, TypeKind, TypeRegistry};
use crate::types::{Node, Scalar, TaggedObject};

/// How a value of one declared type is encoded
///
/// Unlike [`crate::read::ReaderBehavior`] the element behaviors are always
/// kept: a reference-kind element is looked up in the [`WriterTable`] to find
/// the index written in front of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterBehavior {
    Primitive(Primitive),
    String,
    Array(Box<WriterBehavior>),
    Dictionary(Box<WriterBehavior>, Box<WriterBehavior>),
    Texture2D,
    TileMap,
}

impl WriterBehavior {
    pub fn is_value_type(&self) -> bool {
        matches!(self, WriterBehavior::Primitive(_))
    }

    fn name(&self) -> &'static str {
        match self {
            WriterBehavior::Primitive(Primitive::Int32) => "int32",
            WriterBehavior::Primitive(Primitive::Boolean) => "boolean",
            WriterBehavior::String => "string",
            WriterBehavior::Array(_) => "array",
            WriterBehavior::Dictionary(_, _) => "dictionary",
            WriterBehavior::Texture2D => "texture",
            WriterBehavior::TileMap => "tile map",
        }
    }

    fn mismatch(&self, node: &Node) -> Error {
        Error::TypeMismatch {
            expected: self.name(),
            found: node.kind(),
        }
    }

    fn write(&self, buffer: &mut ByteWriter, node: &Node, table: &WriterTable) -> Result<()> {
        match (self, node) {
            (WriterBehavior::Primitive(Primitive::Int32), Node::Scalar(Scalar::Int(value))) => {
                buffer.write_i32_le(*value)
            }
            (WriterBehavior::Primitive(Primitive::Boolean), Node::Scalar(Scalar::Bool(value))) => {
                buffer.write_byte(u8::from(*value))
            }
            (WriterBehavior::String, Node::Scalar(Scalar::String(value))) => {
                write_string(buffer, value)
            }
            (WriterBehavior::Array(element), Node::Sequence(items)) => {
                buffer.write_u32_le(count(items.len())?)?;
                for item in items {
                    table.write_element(buffer, element, item)?;
                }
                Ok(())
            }
            (WriterBehavior::Dictionary(key, value), Node::Mapping(fields)) => {
                buffer.write_u32_le(count(fields.len())?)?;
                for (k, v) in fields {
                    table.write_element(buffer, key, &dictionary_key(key, k)?)?;
                    table.write_element(buffer, value, v)?;
                }
                Ok(())
            }
            (WriterBehavior::Texture2D, Node::TaggedObject(tagged)) => write_texture(buffer, tagged),
            (WriterBehavior::TileMap, Node::TaggedObject(tagged)) => {
                let data = required_bytes(tagged, "data")?;
                buffer.write_u32_le(count(data.len())?)?;
                buffer.concat(data)
            }
            (behavior, node) => Err(behavior.mismatch(node)),
        }
    }
}

fn count(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::InvalidLength(len as i64))
}

fn write_string(buffer: &mut ByteWriter, value: &str) -> Result<()> {
    buffer.write_length(value.len())?;
    buffer.concat(value.as_bytes())
}

fn required_field<'a>(tagged: &'a TaggedObject, field: &'static str) -> Result<&'a Node> {
    tagged.field(field).ok_or_else(|| Error::MissingField {
        type_name: tagged.type_name.clone(),
        field,
    })
}

fn required_int(tagged: &TaggedObject, field: &'static str) -> Result<i32> {
    let node = required_field(tagged, field)?;
    node.as_scalar()
        .and_then(|s| s.as_int())
        .ok_or(Error::TypeMismatch {
            expected: "int32",
            found: node.kind(),
        })
}

fn required_bytes<'a>(tagged: &'a TaggedObject, field: &'static str) -> Result<&'a [u8]> {
    let node = required_field(tagged, field)?;
    node.as_scalar()
        .and_then(|s| s.as_bytes())
        .ok_or(Error::TypeMismatch {
            expected: "bytes",
            found: node.kind(),
        })
}

fn write_texture(buffer: &mut ByteWriter, tagged: &TaggedObject) -> Result<()> {
    buffer.write_i32_le(required_int(tagged, "format")?)?;
    buffer.write_i32_le(required_int(tagged, "width")?)?;
    buffer.write_i32_le(required_int(tagged, "height")?)?;

    let mut levels = Vec::new();
    if tagged.field("pixel_buffer").is_some() {
        levels.push(required_bytes(tagged, "pixel_buffer")?);
    }
    match tagged.field("mip_levels") {
        None => {}
        Some(Node::Sequence(mips)) => {
            for mip in mips {
                let level = mip.as_scalar().and_then(|s| s.as_bytes()).ok_or(
                    Error::TypeMismatch {
                        expected: "bytes",
                        found: mip.kind(),
                    },
                )?;
                levels.push(level);
            }
        }
        Some(other) => {
            return Err(Error::TypeMismatch {
                expected: "sequence",
                found: other.kind(),
            })
        }
    }

    buffer.write_u32_le(count(levels.len())?)?;
    for level in levels {
        buffer.write_u32_le(count(level.len())?)?;
        buffer.concat(level)?;
    }
    Ok(())
}

/// Turn a mapping key back into a node of the dictionary's key type.
fn dictionary_key(behavior: &WriterBehavior, key: &str) -> Result<Node> {
    let invalid = || Error::InvalidKey(key.to_owned());
    match behavior {
        WriterBehavior::Primitive(Primitive::Int32) => {
            key.parse().map(Node::int).map_err(|_| invalid())
        }
        WriterBehavior::Primitive(Primitive::Boolean) => {
            key.parse().map(Node::bool).map_err(|_| invalid())
        }
        WriterBehavior::String => Ok(Node::string(key)),
        _ => Err(invalid()),
    }
}

impl TypeRegistry {
    /// Resolve the encoding behavior for a declared type name.
    pub fn resolve_writer(&self, type_name: &str) -> Result<WriterBehavior> {
        self.writer_for(&TypeDescriptor::parse(type_name)?)
    }

    fn writer_for(&self, descriptor: &TypeDescriptor) -> Result<WriterBehavior> {
        if let Some(element) = descriptor.main_type.strip_suffix("[]") {
            let element = self.writer_for(&TypeDescriptor::simple(element))?;
            return Ok(WriterBehavior::Array(Box::new(element)));
        }

        let kind = self
            .kind_of(&descriptor.main_type)
            .ok_or_else(|| Error::UnsupportedType(descriptor.main_type.clone()))?;

        Ok(match kind {
            TypeKind::Primitive(primitive) => WriterBehavior::Primitive(primitive),
            TypeKind::String => WriterBehavior::String,
            TypeKind::Array => {
                WriterBehavior::Array(Box::new(self.writer_for(descriptor.argument(0)?)?))
            }
            TypeKind::Dictionary => WriterBehavior::Dictionary(
                Box::new(self.writer_for(descriptor.argument(0)?)?),
                Box::new(self.writer_for(descriptor.argument(1)?)?),
            ),
            TypeKind::Texture2D => WriterBehavior::Texture2D,
            TypeKind::TileMap => WriterBehavior::TileMap,
        })
    }
}

/// Resolve a declared type name against the default registry.
pub fn resolve_writer(type_name: &str) -> Result<WriterBehavior> {
    TypeRegistry::default().resolve_writer(type_name)
}

/// The per-file table of encoders
///
/// Built from the same ordered type names as the [`crate::read::ReaderTable`]
/// of the file, so the indices written here are the ones the reader expects.
///
/// ```
/// use xnb_content::cursor::ByteWriter;
/// use xnb_content::types::Node;
/// use xnb_content::write::WriterTable;
///
/// # fn doit() -> xnb_content::error::Result<()> {
/// let table = WriterTable::new(&["Microsoft.Xna.Framework.Content.StringReader"])?;
/// let mut buffer = ByteWriter::new();
/// table.encode_root(&mut buffer, &Node::string("hi"))?;
///
/// assert_eq!(buffer.into_inner(), vec![0x01, 0x02, b'h', b'i']);
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct WriterTable {
    writers: Vec<WriterBehavior>,
}

impl WriterTable {
    /// Build the table using the default registry.
    pub fn new<S: AsRef<str>>(type_names: &[S]) -> Result<WriterTable> {
        Self::with_registry(&TypeRegistry::default(), type_names)
    }

    /// Build the table, failing on the first name without a writer.
    #[instrument(skip_all, err)]
    pub fn with_registry<S: AsRef<str>>(
        registry: &TypeRegistry,
        type_names: &[S],
    ) -> Result<WriterTable> {
        let writers = type_names
            .iter()
            .map(|name| registry.resolve_writer(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        debug!(writers = writers.len(), "built writer table");
        Ok(WriterTable { writers })
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&WriterBehavior> {
        self.writers.get(index)
    }

    /// Table index of the first entry with this behavior
    pub fn index_of(&self, behavior: &WriterBehavior) -> Option<usize> {
        self.writers.iter().position(|w| w == behavior)
    }

    /// Encode the root object through the first declared type.
    pub fn encode_root(&self, buffer: &mut ByteWriter, node: &Node) -> Result<()> {
        if node.is_null() {
            return buffer.write_varint(0);
        }

        let writer = self.writers.first().ok_or(Error::InvalidTypeIndex(1))?;
        buffer.write_varint(1)?;
        writer.write(buffer, node, self)
    }

    fn write_element(
        &self,
        buffer: &mut ByteWriter,
        element: &WriterBehavior,
        node: &Node,
    ) -> Result<()> {
        if element.is_value_type() {
            return element.write(buffer, node, self);
        }

        if node.is_null() {
            return buffer.write_varint(0);
        }

        let index = self
            .index_of(element)
            .ok_or_else(|| Error::UnregisteredType(element.name().to_owned()))?;
        buffer.write_length(index + 1)?;
        element.write(buffer, node, self)
    }
}
