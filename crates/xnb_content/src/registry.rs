//! The set of types this library knows how to read and write.
//!

use std::collections::HashMap;

/// Fixed-size values that are stored inline in their container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// 4 bytes, little endian
    Int32,
    /// 1 byte, non-zero is true
    Boolean,
}

/// Kind of behavior a main type name resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Primitive(Primitive),
    String,
    Array,
    Dictionary,
    Texture2D,
    TileMap,
}

impl TypeKind {
    /// Value kinds are written inline, without a type index.
    pub fn is_value_type(self) -> bool {
        matches!(self, TypeKind::Primitive(_))
    }
}

const BUILTIN: &[(&str, TypeKind)] = &[
    (
        "Microsoft.Xna.Framework.Content.Int32Reader",
        TypeKind::Primitive(Primitive::Int32),
    ),
    ("System.Int32", TypeKind::Primitive(Primitive::Int32)),
    (
        "Microsoft.Xna.Framework.Content.BooleanReader",
        TypeKind::Primitive(Primitive::Boolean),
    ),
    ("System.Boolean", TypeKind::Primitive(Primitive::Boolean)),
    ("Microsoft.Xna.Framework.Content.StringReader", TypeKind::String),
    ("System.String", TypeKind::String),
    ("Microsoft.Xna.Framework.Content.ArrayReader", TypeKind::Array),
    ("Microsoft.Xna.Framework.Content.ListReader", TypeKind::Array),
    (
        "Microsoft.Xna.Framework.Content.DictionaryReader",
        TypeKind::Dictionary,
    ),
    (
        "Microsoft.Xna.Framework.Content.Texture2DReader",
        TypeKind::Texture2D,
    ),
    ("Microsoft.Xna.Framework.Graphics.Texture2D", TypeKind::Texture2D),
    ("xTile.Pipeline.TideReader", TypeKind::TileMap),
    ("xTile.Map", TypeKind::TileMap),
];

/// Lookup from main type name to [`TypeKind`]
///
/// The default registry holds the XNA readers this crate implements. Games
/// that ship their own reader names for one of these shapes can add them with
/// [`TypeRegistry::with_alias`].
///
/// ```
/// use xnb_content::registry::{Primitive, TypeKind, TypeRegistry};
///
/// let registry = TypeRegistry::default()
///     .with_alias("MyGame.Content.ScoreReader", TypeKind::Primitive(Primitive::Int32));
///
/// assert!(registry.resolve_reader("MyGame.Content.ScoreReader").is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    kinds: HashMap<String, TypeKind>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        TypeRegistry {
            kinds: BUILTIN
                .iter()
                .map(|(name, kind)| (name.to_string(), *kind))
                .collect(),
        }
    }
}

impl TypeRegistry {
    /// Register another main type name for an existing behavior.
    pub fn with_alias(mut self, main_type: impl Into<String>, kind: TypeKind) -> Self {
        self.kinds.insert(main_type.into(), kind);
        self
    }

    /// Kind registered for a main type name. Array suffixes are not handled here.
    pub fn kind_of(&self, main_type: &str) -> Option<TypeKind> {
        self.kinds.get(main_type).copied()
    }
}

#[cfg(test)]
mod test {
    use crate::registry::{Primitive, TypeKind, TypeRegistry};

    #[test]
    fn builtin_names() {
        let registry = TypeRegistry::default();

        assert_eq!(
            registry.kind_of("System.Int32"),
            Some(TypeKind::Primitive(Primitive::Int32))
        );
        assert_eq!(
            registry.kind_of("Microsoft.Xna.Framework.Content.ListReader"),
            Some(TypeKind::Array)
        );
        assert_eq!(registry.kind_of("Totally.Unknown.Type"), None);
    }

    #[test]
    fn alias_extends_registry() {
        let registry =
            TypeRegistry::default().with_alias("Game.FlagReader", TypeKind::Primitive(Primitive::Boolean));

        assert_eq!(
            registry.kind_of("Game.FlagReader"),
            Some(TypeKind::Primitive(Primitive::Boolean))
        );
        assert!(registry.kind_of("Game.FlagReader").is_some_and(TypeKind::is_value_type));
    }
}
