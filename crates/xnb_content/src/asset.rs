//! Decoding and encoding whole payloads, and moving their binary parts to
//! sibling files.

use std::path::Path;

use bon::Builder;
use tracing::{debug, instrument, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cursor::{ByteReader, ByteWriter};
use crate::error::Result;
use crate::image::{extract_images, inject_images, ImageCodec};
use crate::read::ReaderTable;
use crate::registry::TypeRegistry;
use crate::tbin::{extract_tile_maps, inject_tile_maps, TILESHEET_SUFFIX};
use crate::types::Asset;
use crate::write::WriterTable;

/// Which parts of an asset are written to sibling files
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ArtifactOptions {
    /// Write textures as PNG files
    #[builder(default = true)]
    pub images: bool,

    /// Write embedded tile maps as `.tbin` files
    #[builder(default = true)]
    pub tile_maps: bool,

    /// Appended to tile sheet image sources inside extracted tile maps
    #[builder(default = TILESHEET_SUFFIX.to_owned(), into)]
    pub tilesheet_suffix: String,
}

impl Default for ArtifactOptions {
    fn default() -> Self {
        ArtifactOptions::builder().build()
    }
}

impl Asset {
    /// Decode a payload whose readers are declared by `type_names`.
    ///
    /// ```
    /// # fn doit() -> xnb_content::error::Result<()>
    /// # {
    /// use xnb_content::{Asset, Node};
    ///
    /// let names = ["Microsoft.Xna.Framework.Content.StringReader"];
    /// let asset = Asset::decode(b"\x01\x02hi", &names)?;
    ///
    /// assert_eq!(asset.content, Node::string("hi"));
    /// assert_eq!(asset.encode(&names)?, b"\x01\x02hi");
    /// # Ok(())
    /// # }
    /// # doit().unwrap();
    /// ```
    pub fn decode<S: AsRef<str>>(payload: &[u8], type_names: &[S]) -> Result<Asset> {
        Self::decode_with_registry(&TypeRegistry::default(), payload, type_names)
    }

    #[instrument(skip_all, fields(size = payload.len()), err)]
    pub fn decode_with_registry<S: AsRef<str>>(
        registry: &TypeRegistry,
        payload: &[u8],
        type_names: &[S],
    ) -> Result<Asset> {
        let table = ReaderTable::with_registry(registry, type_names)?;
        let mut cursor = ByteReader::new(payload);
        let content = table.decode_root(&mut cursor)?;

        if !cursor.is_empty() {
            warn!(
                remaining = cursor.remaining(),
                position = cursor.position(),
                "ignoring trailing payload bytes"
            );
        }

        Ok(Asset::new(content))
    }

    /// Encode the content with the writers declared by `type_names`.
    ///
    /// Textures whose pixels were extracted have to be injected first.
    pub fn encode<S: AsRef<str>>(&self, type_names: &[S]) -> Result<Vec<u8>> {
        self.encode_with_registry(&TypeRegistry::default(), type_names)
    }

    #[instrument(skip_all, err)]
    pub fn encode_with_registry<S: AsRef<str>>(
        &self,
        registry: &TypeRegistry,
        type_names: &[S],
    ) -> Result<Vec<u8>> {
        let table = WriterTable::with_registry(registry, type_names)?;
        let mut buffer = ByteWriter::new();
        table.encode_root(&mut buffer, &self.content)?;

        debug!(size = buffer.len(), "encoded payload");
        Ok(buffer.into_inner())
    }

    /// Move textures and tile maps into files next to `base`.
    #[instrument(skip(self, codec), err)]
    pub fn extract_artifacts(
        self,
        base: &Path,
        options: &ArtifactOptions,
        codec: &impl ImageCodec,
    ) -> Result<Asset> {
        let Asset {
            mut content,
            mut extracted_images,
        } = self;

        if options.images {
            let (stripped, images) = extract_images(content, base, codec)?;
            content = stripped;
            extracted_images.extend(images);
        }
        if options.tile_maps {
            content = extract_tile_maps(content, base, &options.tilesheet_suffix)?;
        }

        Ok(Asset {
            content,
            extracted_images,
        })
    }

    /// Read back everything [`Asset::extract_artifacts`] wrote.
    #[instrument(skip(self, codec), err)]
    pub fn inject_artifacts(self, base: &Path, codec: &impl ImageCodec) -> Result<Asset> {
        let content = inject_tile_maps(self.content, base)?;
        let content = inject_images(content, &self.extracted_images, base, codec)?;

        Ok(Asset::new(content))
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use crate::asset::ArtifactOptions;
    use crate::error::{Error, Result};
    use crate::image::PngCodec;
    use crate::tbin::test::synthetic_map;
    use crate::types::{Asset, Node, TEXTURE_TYPE, TILE_MAP_TYPE};

    const TIDE_READER: &str = "xTile.Pipeline.TideReader, xTile";
    const TEXTURE_READER: &str = "Microsoft.Xna.Framework.Content.Texture2DReader";
    const INT_READER: &str = "Microsoft.Xna.Framework.Content.Int32Reader";

    #[test]
    fn default_options() {
        let options = ArtifactOptions::default();

        assert!(options.images);
        assert!(options.tile_maps);
        assert_eq!(options.tilesheet_suffix, ".png");
        assert_eq!(
            ArtifactOptions::builder().images(false).tilesheet_suffix(".gif").build(),
            ArtifactOptions {
                images: false,
                tile_maps: true,
                tilesheet_suffix: ".gif".into(),
            }
        );
    }

    #[test]
    #[traced_test]
    fn trailing_bytes_are_ignored() -> Result<()> {
        let asset = Asset::decode(&[0x01, 0x05, 0x00, 0x00, 0x00, 0xFF], &[INT_READER])?;

        assert_eq!(asset.content, Node::int(5));
        assert!(logs_contain("ignoring trailing payload bytes"));
        Ok(())
    }

    #[test]
    fn null_root() -> Result<()> {
        let asset = Asset::decode(&[0x00], &[INT_READER])?;

        assert_eq!(asset.content, Node::null());
        assert_eq!(asset.encode(&[INT_READER])?, vec![0x00]);
        Ok(())
    }

    #[test]
    #[traced_test]
    fn tile_map_artifacts() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let base = dir.path().join("Farm.json");
        let blob = synthetic_map(&["spring_outdoors", "paths"]);

        let mut payload = vec![0x01];
        payload.extend((blob.len() as u32).to_le_bytes());
        payload.extend(&blob);

        let asset = Asset::decode(&payload, &[TIDE_READER])?;
        let extracted = asset.extract_artifacts(&base, &ArtifactOptions::default(), &PngCodec)?;

        assert_eq!(
            extracted.content,
            Node::tagged(
                TILE_MAP_TYPE,
                Node::mapping([
                    ("tbin_file", Node::string("Farm.tbin")),
                    (
                        "tilesheet_sources",
                        Node::Sequence(vec![Node::string("spring_outdoors"), Node::string("paths")])
                    ),
                ])
            )
        );
        assert_eq!(
            std::fs::read(dir.path().join("Farm.tbin"))?,
            synthetic_map(&["spring_outdoors.png", "paths.png"])
        );

        let restored = extracted.inject_artifacts(&base, &PngCodec)?;
        assert_eq!(restored.encode(&[TIDE_READER])?, payload);
        Ok(())
    }

    #[test]
    fn tile_map_file_must_be_a_sibling() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let base = dir.path().join("maps").join("Farm.json");
        std::fs::create_dir(dir.path().join("maps"))?;
        std::fs::write(dir.path().join("Farm.tbin"), synthetic_map(&["paths.png"]))?;

        for file_name in ["../Farm.tbin", "maps/Farm.tbin", ""] {
            let asset = Asset::new(Node::tagged(
                TILE_MAP_TYPE,
                Node::mapping([
                    ("tbin_file", Node::string(file_name)),
                    ("tilesheet_sources", Node::Sequence(vec![Node::string("paths")])),
                ]),
            ));

            let result = asset.inject_artifacts(&base, &PngCodec);
            assert!(
                matches!(result, Err(Error::InvalidTileMap(ref msg)) if msg.contains("tbin_file")),
                "{file_name:?} gave {result:?}"
            );
        }
        Ok(())
    }

    #[test]
    fn disabled_images_stay_inline() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let base = dir.path().join("Icon.json");
        let texture = Node::tagged(
            TEXTURE_TYPE,
            Node::mapping([
                ("format", Node::int(0)),
                ("width", Node::int(1)),
                ("height", Node::int(1)),
                ("pixel_buffer", Node::bytes(vec![9, 9, 9, 9])),
                ("mip_levels", Node::Sequence(vec![])),
            ]),
        );

        let options = ArtifactOptions::builder().images(false).build();
        let asset = Asset::new(texture.clone()).extract_artifacts(&base, &options, &PngCodec)?;

        assert_eq!(asset.content, texture);
        assert!(asset.extracted_images.is_empty());
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);

        let encoded = asset.encode(&[TEXTURE_READER])?;
        assert_eq!(Asset::decode(&encoded, &[TEXTURE_READER])?.content, texture);
        Ok(())
    }
}
