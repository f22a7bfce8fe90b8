//! Types for decoding the object payload
//!

use indexmap::IndexMap;
use tracing::{debug, instrument, trace};

use crate::cursor::ByteReader;
use crate::descriptor::TypeDescriptor;
use crate::error::{Error, Result};
use crate::registry::{Primitive, TypeKind, TypeRegistry};
use crate::types::{Node, Scalar, TEXTURE_TYPE, TILE_MAP_TYPE};

/// How a value of one declared type is decoded
///
/// Element behaviors are only kept for value kinds. A `None` element is
/// preceded in the stream by a 1-based index into the [`ReaderTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderBehavior {
    Primitive(Primitive),
    String,
    Array(Option<Box<ReaderBehavior>>),
    Dictionary(Option<Box<ReaderBehavior>>, Option<Box<ReaderBehavior>>),
    Texture2D,
    TileMap,
}

impl ReaderBehavior {
    pub fn is_value_type(&self) -> bool {
        matches!(self, ReaderBehavior::Primitive(_))
    }

    /// Keep the behavior for inlining if it is a value kind.
    fn inline(self) -> Option<Box<ReaderBehavior>> {
        self.is_value_type().then(|| Box::new(self))
    }

    fn consume(&self, cursor: &mut ByteReader<'_>, table: &ReaderTable) -> Result<Node> {
        match self {
            ReaderBehavior::Primitive(Primitive::Int32) => Ok(Node::int(cursor.consume_i32_le()?)),
            ReaderBehavior::Primitive(Primitive::Boolean) => {
                Ok(Node::bool(cursor.consume_u8()? != 0))
            }
            ReaderBehavior::String => Ok(Node::string(consume_string(cursor)?)),
            ReaderBehavior::Array(element) => {
                let count = cursor.consume_u32_le()?;
                let mut items = Vec::new();
                for _ in 0..count {
                    items.push(table.consume_element(element.as_deref(), cursor)?);
                }
                Ok(Node::Sequence(items))
            }
            ReaderBehavior::Dictionary(key, value) => {
                let count = cursor.consume_u32_le()?;
                let mut fields = IndexMap::new();
                for _ in 0..count {
                    let key = dictionary_key(table.consume_element(key.as_deref(), cursor)?)?;
                    let value = table.consume_element(value.as_deref(), cursor)?;
                    fields.insert(key, value);
                }
                Ok(Node::Mapping(fields))
            }
            ReaderBehavior::Texture2D => consume_texture(cursor),
            ReaderBehavior::TileMap => {
                let size = cursor.consume_u32_le()? as usize;
                let data = cursor.consume(size)?;
                Ok(Node::tagged(
                    TILE_MAP_TYPE,
                    Node::mapping([("data", Node::bytes(data))]),
                ))
            }
        }
    }
}

fn consume_string(cursor: &mut ByteReader<'_>) -> Result<String> {
    let size = cursor.consume_length()?;
    Ok(String::from_utf8(cursor.consume(size)?.to_vec())?)
}

fn consume_texture(cursor: &mut ByteReader<'_>) -> Result<Node> {
    let format = cursor.consume_i32_le()?;
    let width = cursor.consume_i32_le()?;
    let height = cursor.consume_i32_le()?;
    let mip_count = cursor.consume_u32_le()?;

    let mut levels = Vec::new();
    for _ in 0..mip_count {
        let size = cursor.consume_u32_le()? as usize;
        levels.push(Node::bytes(cursor.consume(size)?));
    }

    let mut fields = IndexMap::new();
    fields.insert("format".to_owned(), Node::int(format));
    fields.insert("width".to_owned(), Node::int(width));
    fields.insert("height".to_owned(), Node::int(height));

    // The first level is the image itself, the rest are its mipmaps.
    let mut levels = levels.into_iter();
    if let Some(pixel_buffer) = levels.next() {
        fields.insert("pixel_buffer".to_owned(), pixel_buffer);
        fields.insert("mip_levels".to_owned(), Node::Sequence(levels.collect()));
    }

    Ok(Node::tagged(TEXTURE_TYPE, Node::Mapping(fields)))
}

/// Dictionary keys become mapping keys, so they have to be scalars.
fn dictionary_key(key: Node) -> Result<String> {
    match key {
        Node::Scalar(Scalar::String(key)) => Ok(key),
        Node::Scalar(Scalar::Int(key)) => Ok(key.to_string()),
        Node::Scalar(Scalar::Bool(key)) => Ok(key.to_string()),
        other => Err(Error::InvalidKey(other.kind().to_owned())),
    }
}

impl TypeRegistry {
    /// Resolve the decoding behavior for a declared type name.
    pub fn resolve_reader(&self, type_name: &str) -> Result<ReaderBehavior> {
        self.reader_for(&TypeDescriptor::parse(type_name)?)
    }

    fn reader_for(&self, descriptor: &TypeDescriptor) -> Result<ReaderBehavior> {
        if let Some(element) = descriptor.main_type.strip_suffix("[]") {
            let element = self.reader_for(&TypeDescriptor::simple(element))?;
            return Ok(ReaderBehavior::Array(element.inline()));
        }

        let kind = self
            .kind_of(&descriptor.main_type)
            .ok_or_else(|| Error::UnsupportedType(descriptor.main_type.clone()))?;

        Ok(match kind {
            TypeKind::Primitive(primitive) => ReaderBehavior::Primitive(primitive),
            TypeKind::String => ReaderBehavior::String,
            TypeKind::Array => {
                let element = self.reader_for(descriptor.argument(0)?)?;
                ReaderBehavior::Array(element.inline())
            }
            TypeKind::Dictionary => {
                let key = self.reader_for(descriptor.argument(0)?)?;
                let value = self.reader_for(descriptor.argument(1)?)?;
                ReaderBehavior::Dictionary(key.inline(), value.inline())
            }
            TypeKind::Texture2D => ReaderBehavior::Texture2D,
            TypeKind::TileMap => ReaderBehavior::TileMap,
        })
    }
}

/// Resolve a declared type name against the default registry.
pub fn resolve_reader(type_name: &str) -> Result<ReaderBehavior> {
    TypeRegistry::default().resolve_reader(type_name)
}

/// The per-file table of decoders, in the order the file declares them
///
/// ```
/// use xnb_content::cursor::ByteReader;
/// use xnb_content::read::ReaderTable;
/// use xnb_content::types::Node;
///
/// # fn doit() -> xnb_content::error::Result<()> {
/// let table = ReaderTable::new(&["Microsoft.Xna.Framework.Content.StringReader"])?;
/// let node = table.decode_root(&mut ByteReader::new(&[0x01, 0x02, b'h', b'i']))?;
///
/// assert_eq!(node, Node::string("hi"));
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ReaderTable {
    readers: Vec<ReaderBehavior>,
}

impl ReaderTable {
    /// Build the table using the default registry.
    pub fn new<S: AsRef<str>>(type_names: &[S]) -> Result<ReaderTable> {
        Self::with_registry(&TypeRegistry::default(), type_names)
    }

    /// Build the table, failing on the first name without a reader.
    #[instrument(skip_all, err)]
    pub fn with_registry<S: AsRef<str>>(
        registry: &TypeRegistry,
        type_names: &[S],
    ) -> Result<ReaderTable> {
        let readers = type_names
            .iter()
            .map(|name| registry.resolve_reader(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        debug!(readers = readers.len(), "built reader table");
        Ok(ReaderTable { readers })
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ReaderBehavior> {
        self.readers.get(index)
    }

    /// Decode the root object of a payload.
    ///
    /// The root must be null or use the first declared type, which is the
    /// entry [`crate::write::WriterTable::encode_root`] writes it through.
    pub fn decode_root(&self, cursor: &mut ByteReader<'_>) -> Result<Node> {
        let index = cursor.consume_length()?;
        if index > 1 && index <= self.readers.len() {
            return Err(Error::RootTypeIndex(index));
        }
        self.dispatch(index, cursor)
    }

    /// Decode the object at the cursor, dispatching on its leading type index.
    pub fn decode_object(&self, cursor: &mut ByteReader<'_>) -> Result<Node> {
        let index = cursor.consume_length()?;
        self.dispatch(index, cursor)
    }

    fn dispatch(&self, index: usize, cursor: &mut ByteReader<'_>) -> Result<Node> {
        if index == 0 {
            return Ok(Node::null());
        }

        let reader = self
            .readers
            .get(index - 1)
            .ok_or(Error::InvalidTypeIndex(index))?;
        trace!(index, position = cursor.position(), "dispatching reader");
        reader.consume(cursor, self)
    }

    fn consume_element(
        &self,
        element: Option<&ReaderBehavior>,
        cursor: &mut ByteReader<'_>,
    ) -> Result<Node> {
        match element {
            Some(reader) => reader.consume(cursor, self),
            None => self.decode_object(cursor),
        }
    }
}
