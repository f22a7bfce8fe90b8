//! Error types that can be emitted from this library

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent warpper for [`std::string::FromUtf8Error`]
    #[error(transparent)]
    UTF8Error(#[from] std::string::FromUtf8Error),

    /// Transparent warpper for [`png::EncodingError`]
    #[error(transparent)]
    PngEncodingError(#[from] png::EncodingError),

    /// Transparent warpper for [`png::DecodingError`]
    #[error(transparent)]
    PngDecodingError(#[from] png::DecodingError),

    /// A generic type name could not be parsed
    #[error("invalid type descriptor {name:?}: {reason}")]
    TypeDescriptor {
        /// The type name as declared in the file
        name: String,
        /// What was wrong with it
        reason: String,
    },

    /// No reader or writer is known for the type
    #[error("unsupported type {0:?}")]
    UnsupportedType(String),

    /// The cursor was asked for more bytes than remain
    #[error("tried to read {requested} bytes at offset {position} with only {remaining} remaining")]
    TruncatedInput {
        /// Number of bytes asked for
        requested: usize,
        /// Number of bytes left in the buffer
        remaining: usize,
        /// Offset of the cursor when the read was attempted
        position: usize,
    },

    /// An extracted image is referenced but its artifact is missing
    #[error("missing image artifact {0}")]
    MissingImageArtifact(PathBuf),

    /// An extracted tile map is referenced but its artifact is missing
    #[error("missing tile map artifact {0}")]
    MissingTileMapArtifact(PathBuf),

    /// A recorded structural path does not resolve to the expected node
    #[error("path {0:?} does not resolve to an object")]
    InvalidPath(String),

    /// A type index in the stream is outside the reader table
    #[error("type index {0} is outside the reader table")]
    InvalidTypeIndex(usize),

    /// The root object uses a type other than the first declared one
    #[error("root object uses type index {0}, only the first declared type can be encoded back")]
    RootTypeIndex(usize),

    /// A length prefix decoded to a negative value
    #[error("invalid length {0}")]
    InvalidLength(i64),

    /// A reference-kind element has no entry in the writer table
    #[error("no writer table entry for {0}")]
    UnregisteredType(String),

    /// A node does not have the shape its writer expects
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        /// What the writer expected
        expected: &'static str,
        /// What the tree contained
        found: &'static str,
    },

    /// A tagged object lacks a field its writer needs
    #[error("{type_name} is missing field {field:?}")]
    MissingField {
        /// Tag of the object
        type_name: String,
        /// Name of the absent field
        field: &'static str,
    },

    /// A mapping key cannot be converted to the dictionary key type
    #[error("invalid dictionary key {0:?}")]
    InvalidKey(String),

    /// An embedded tile map blob could not be rewritten
    #[error("invalid tile map: {0}")]
    InvalidTileMap(String),
}

impl Error {
    /// Whether a batch caller may skip the current file and carry on.
    ///
    /// Only an unsupported type is expected to happen on well formed input.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::UnsupportedType(_))
    }
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
