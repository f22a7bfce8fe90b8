//! The decoded object tree.

use derive_more::derive::{Constructor, From};
use indexmap::IndexMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tag given to decoded textures
pub const TEXTURE_TYPE: &str = "Texture2D";

/// Tag given to decoded tile maps
pub const TILE_MAP_TYPE: &str = "Tide";

/// A node of the decoded object graph
#[derive(Debug, Clone, PartialEq, From)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Node {
    /// A value the format attached an explicit type name to
    TaggedObject(TaggedObject),
    /// Named fields, kept in the order they were decoded
    Mapping(IndexMap<String, Node>),
    /// An ordered list of nodes
    Sequence(Vec<Node>),
    /// A leaf value
    Scalar(Scalar),
}

/// A value tagged with the type it was decoded as
#[derive(Debug, Clone, PartialEq, Constructor)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TaggedObject {
    pub type_name: String,
    pub data: Box<Node>,
}

/// Leaf values
#[derive(Debug, Clone, PartialEq, Eq, From)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Scalar {
    #[from(ignore)]
    Null,
    Bool(bool),
    Int(i32),
    String(String),
    Bytes(Vec<u8>),
}

impl Node {
    pub fn null() -> Node {
        Node::Scalar(Scalar::Null)
    }

    pub fn bool(value: bool) -> Node {
        Node::Scalar(Scalar::Bool(value))
    }

    pub fn int(value: i32) -> Node {
        Node::Scalar(Scalar::Int(value))
    }

    pub fn string(value: impl Into<String>) -> Node {
        Node::Scalar(Scalar::String(value.into()))
    }

    pub fn bytes(value: impl Into<Vec<u8>>) -> Node {
        Node::Scalar(Scalar::Bytes(value.into()))
    }

    pub fn tagged(type_name: impl Into<String>, data: Node) -> Node {
        Node::TaggedObject(TaggedObject::new(type_name.into(), Box::new(data)))
    }

    /// Build a mapping from `(key, node)` pairs, keeping their order.
    pub fn mapping<K: Into<String>>(fields: impl IntoIterator<Item = (K, Node)>) -> Node {
        Node::Mapping(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Short name of the variant, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Node::TaggedObject(_) => "tagged object",
            Node::Mapping(_) => "mapping",
            Node::Sequence(_) => "sequence",
            Node::Scalar(scalar) => scalar.kind(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Scalar(Scalar::Null))
    }

    pub fn as_tagged(&self) -> Option<&TaggedObject> {
        match self {
            Node::TaggedObject(tagged) => Some(tagged),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&IndexMap<String, Node>> {
        match self {
            Node::Mapping(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut IndexMap<String, Node>> {
        match self {
            Node::Mapping(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    /// Whether this node, or a tag nested directly inside it, carries `type_name`.
    pub fn has_tag(&self, type_name: &str) -> bool {
        match self {
            Node::TaggedObject(tagged) => {
                tagged.type_name == type_name || tagged.data.has_tag(type_name)
            }
            _ => false,
        }
    }

    /// Skip over any tags wrapping this node.
    pub fn untagged(&self) -> &Node {
        match self {
            Node::TaggedObject(tagged) => tagged.data.untagged(),
            other => other,
        }
    }

    pub fn untagged_mut(&mut self) -> &mut Node {
        match self {
            Node::TaggedObject(tagged) => tagged.data.untagged_mut(),
            other => other,
        }
    }
}

impl TaggedObject {
    /// Look up a field of the tagged data, if the data is a mapping.
    pub fn field(&self, name: &str) -> Option<&Node> {
        self.data.as_mapping().and_then(|fields| fields.get(name))
    }
}

impl Scalar {
    pub fn kind(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "boolean",
            Scalar::Int(_) => "int32",
            Scalar::String(_) => "string",
            Scalar::Bytes(_) => "bytes",
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Scalar::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Scalar::Bytes(value) => Some(value),
            _ => None,
        }
    }
}

/// Location of an image pulled out of the tree into a sibling artifact
#[derive(Debug, Clone, PartialEq, Eq, Constructor)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExtractedImage {
    /// Dot separated structural path of the texture
    pub path: String,
}

/// A decoded payload together with the images extracted from it
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Asset {
    pub content: Node,

    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Vec::is_empty")
    )]
    pub extracted_images: Vec<ExtractedImage>,
}

impl Asset {
    pub fn new(content: Node) -> Self {
        Asset {
            content,
            extracted_images: Vec::new(),
        }
    }
}
