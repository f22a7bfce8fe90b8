//! This library decodes and encodes the object payload of **XNB** content files used by XNA games.
//!
//! # XNB Payload Format Documentation
//!
//! An XNB file is a small header, an optional compression layer and a payload. The container
//! hands this crate the decompressed payload together with the ordered list of reader type names
//! declared in its header. Everything after that is handled here: the payload is decoded into a
//! tree of [`Node`]s that can be edited as text, and the edited tree is encoded back into the
//! same bytes.
//!
//! ## Type Names
//!
//! Reader names are .NET type names, optionally generic:
//!
//! ```text
//! Microsoft.Xna.Framework.Content.DictionaryReader`2[[System.String, mscorlib],[System.Int32, mscorlib]]
//! ```
//!
//! The part before the backtick is the main type, the digit is the arity and each bracketed
//! group is one argument. Arguments are parsed recursively into a [`TypeDescriptor`].
//!
//! ## Payload Structure
//!
//! The payload is one object. Every object that is not a value type is preceded by its type index:
//!
//! | Field      | Type    | Description                                                  |
//! |------------|---------|--------------------------------------------------------------|
//! | Type index | varint  | 0 for null, otherwise 1 + the position in the reader table   |
//! | Data       | varies  | Laid out as described by the reader                           |
//!
//! Value types (`Int32`, `Boolean`) are written inline inside their container with no index.
//!
//! ### Readers
//!
//! | Reader            | Layout                                                                |
//! |-------------------|-----------------------------------------------------------------------|
//! | `Int32Reader`     | 4 bytes: little endian `i32`                                          |
//! | `BooleanReader`   | 1 byte: non-zero is true                                              |
//! | `StringReader`    | varint byte length, then UTF-8 data                                   |
//! | `ArrayReader`     | 4 bytes: element count, then the elements                             |
//! | `ListReader`      | Same as `ArrayReader`                                                 |
//! | `DictionaryReader`| 4 bytes: pair count, then each key followed by its value              |
//! | `Texture2DReader` | format, width, height, level count, then each level as size + bytes   |
//! | `TideReader`      | 4 bytes: size, then a `tBIN10` tile map                               |
//!
//! ### Varints
//!
//! Lengths and type indices use 7 bits per byte, least significant group first, with the high
//! bit set on every byte but the last.
//!
//! ## Artifacts
//!
//! Binary parts of an asset can be moved to sibling files so that the remaining tree is easy to
//! edit:
//!
//! - **Textures** are written as `{stem}.{path}.png`, where `path` is the dot separated location
//!   of the texture in the tree.
//! - **Tile maps** are written as `{stem}.tbin`, with `.png` added to each tile sheet image source.
//!
//! See [`Asset::extract_artifacts`] and [`Asset::inject_artifacts`].
//!

mod artifact;
pub mod asset;
pub mod cursor;
pub mod descriptor;
pub mod error;
pub mod image;
pub mod read;
pub mod registry;
pub mod tbin;
pub mod types;
pub mod walk;
pub mod write;

pub use asset::ArtifactOptions;
pub use descriptor::TypeDescriptor;
pub use image::PngCodec;
pub use read::ReaderTable;
pub use registry::TypeRegistry;
pub use types::{Asset, ExtractedImage, Node, Scalar, TaggedObject};
pub use walk::NodePath;
pub use write::WriterTable;
