//! Rewriting of embedded `tBIN10` tile maps.
//!
//! Tile maps reference their tile sheet images by name. When the map is pulled
//! out into a `.tbin` file, each of those names gets a suffix so editors find
//! the extracted images, and the original names are kept in the tree so the
//! map can be restored byte for byte.
//!
//! ## Layout
//!
//! All integers are little endian. A string is an `i32` byte length followed
//! by that many bytes.
//!
//! | Field       | Type             | Notes                           |
//! |-------------|------------------|---------------------------------|
//! | Magic       | `[u8; 6]`        | `tBIN10`                        |
//! | Id          | string           |                                 |
//! | Description | string           |                                 |
//! | Properties  | property list    |                                 |
//! | Sheet count | `i32`            |                                 |
//! | Sheets      | sheet[count]     |                                 |
//! | Remainder   | bytes            | Layers, copied without parsing  |
//!
//! A property list is an `i32` count of `{key string, u8 tag, value}`, where
//! tag `0` is a 1 byte bool, `1` an `i32`, `2` an `f32` and `3` a string.
//!
//! A sheet is `{id string, description string, image source string,
//! 16 bytes of metrics, property list}`.

use std::ffi::OsStr;
use std::path::Path;

use tracing::{debug, instrument};

use crate::artifact::{sibling_path, write_atomic};
use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{Error, Result};
use crate::types::{Node, Scalar};
use crate::walk::find_tagged;

/// Leading bytes of every tile map blob
pub const MAGIC: &[u8; 6] = b"tBIN10";

/// Suffix appended to tile sheet image sources on extraction
pub const TILESHEET_SUFFIX: &str = ".png";

/// Field of a tile map object that holds the blob
pub const DATA_FIELD: &str = "data";

/// Field recording the sibling `.tbin` file name
pub const TBIN_FILE_FIELD: &str = "tbin_file";

/// Field recording the original tile sheet image sources
pub const SOURCES_FIELD: &str = "tilesheet_sources";

/// Tile size, margin and spacing as two pairs of `i32`
const SHEET_METRICS_SIZE: usize = 16;

/// A tile map blob with suffixed image sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTileMap {
    pub blob: Vec<u8>,
    /// Image sources as they were before the suffix was added
    pub image_sources: Vec<String>,
}

/// What happens to each tile sheet image source
enum SourceRewrite<'a> {
    AddSuffix {
        suffix: &'a str,
        originals: Vec<String>,
    },
    Restore(std::slice::Iter<'a, String>),
}

struct TileMapRewriter<'a, 'r> {
    source: ByteReader<'a>,
    output: ByteWriter,
    rewrite: SourceRewrite<'r>,
}

impl<'a, 'r> TileMapRewriter<'a, 'r> {
    fn new(blob: &'a [u8], rewrite: SourceRewrite<'r>) -> Self {
        TileMapRewriter {
            source: ByteReader::new(blob),
            output: ByteWriter::new(),
            rewrite,
        }
    }

    fn copy(&mut self, amount: usize) -> Result<()> {
        let bytes = self.source.consume(amount)?;
        self.output.concat(bytes)
    }

    fn copy_i32(&mut self) -> Result<i32> {
        let value = self.source.consume_i32_le()?;
        self.output.write_i32_le(value)?;
        Ok(value)
    }

    fn count(&mut self) -> Result<usize> {
        let value = self.copy_i32()?;
        usize::try_from(value)
            .map_err(|_| Error::InvalidTileMap(format!("negative count {} at {}", value, self.source.position())))
    }

    fn read_string(&mut self) -> Result<String> {
        let length = self.source.consume_i32_le()?;
        let length = usize::try_from(length)
            .map_err(|_| Error::InvalidTileMap(format!("negative string length {}", length)))?;
        Ok(String::from_utf8(self.source.consume(length)?.to_vec())?)
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        let length = i32::try_from(value.len())
            .map_err(|_| Error::InvalidTileMap(format!("string of {} bytes", value.len())))?;
        self.output.write_i32_le(length)?;
        self.output.concat(value.as_bytes())
    }

    fn copy_string(&mut self) -> Result<()> {
        let length = self.count()?;
        self.copy(length)
    }

    fn copy_properties(&mut self) -> Result<()> {
        let count = self.count()?;
        for _ in 0..count {
            self.copy_string()?;
            let tag = self.source.consume_u8()?;
            self.output.write_byte(tag)?;
            match tag {
                0 => self.copy(1)?,
                1 | 2 => self.copy(4)?,
                3 => self.copy_string()?,
                other => {
                    return Err(Error::InvalidTileMap(format!(
                        "unknown property type {} at {}",
                        other,
                        self.source.position() - 1
                    )))
                }
            }
        }
        Ok(())
    }

    fn rewrite_source(&mut self) -> Result<()> {
        let current = self.read_string()?;
        let replacement = match &mut self.rewrite {
            SourceRewrite::AddSuffix { suffix, originals } => {
                let suffixed = format!("{}{}", current, suffix);
                originals.push(current);
                suffixed
            }
            SourceRewrite::Restore(originals) => originals
                .next()
                .cloned()
                .ok_or_else(|| Error::InvalidTileMap("more tile sheets than recorded sources".into()))?,
        };
        self.write_string(&replacement)
    }

    fn run(mut self) -> Result<(Vec<u8>, SourceRewrite<'r>)> {
        self.copy(MAGIC.len())?;
        self.copy_string()?;
        self.copy_string()?;
        self.copy_properties()?;

        let sheets = self.count()?;
        for _ in 0..sheets {
            self.copy_string()?;
            self.copy_string()?;
            self.rewrite_source()?;
            self.copy(SHEET_METRICS_SIZE)?;
            self.copy_properties()?;
        }

        let rest = self.source.rest();
        self.output.concat(rest)?;

        Ok((self.output.into_inner(), self.rewrite))
    }
}

/// Add `suffix` to every tile sheet image source of `blob`.
///
/// Returns `None` if `blob` is not a tile map.
pub fn decode_tilemap(blob: &[u8], suffix: &str) -> Result<Option<DecodedTileMap>> {
    if !blob.starts_with(MAGIC) {
        return Ok(None);
    }

    let rewrite = SourceRewrite::AddSuffix {
        suffix,
        originals: Vec::new(),
    };
    let (blob, rewrite) = TileMapRewriter::new(blob, rewrite).run()?;
    let image_sources = match rewrite {
        SourceRewrite::AddSuffix { originals, .. } => originals,
        SourceRewrite::Restore(_) => Vec::new(),
    };

    Ok(Some(DecodedTileMap {
        blob,
        image_sources,
    }))
}

/// Put the recorded image sources back into a blob from [`decode_tilemap`].
pub fn encode_tilemap(blob: &[u8], image_sources: &[String]) -> Result<Vec<u8>> {
    if !blob.starts_with(MAGIC) {
        return Err(Error::InvalidTileMap("missing tBIN10 header".into()));
    }

    let (blob, _) =
        TileMapRewriter::new(blob, SourceRewrite::Restore(image_sources.iter())).run()?;
    Ok(blob)
}

/// Location of the `.tbin` artifact for the tile map at `path`
pub fn tilemap_artifact_path(base: &Path, path: &str) -> std::path::PathBuf {
    if path.is_empty() {
        sibling_path(base, ".tbin")
    } else {
        sibling_path(base, &format!(".{}.tbin", path))
    }
}

fn tile_map_blob(node: &Node) -> Option<&[u8]> {
    node.as_tagged()?
        .field(DATA_FIELD)?
        .as_scalar()?
        .as_bytes()
        .filter(|blob| blob.starts_with(MAGIC))
}

/// Move every embedded tile map into a sibling `.tbin` file.
#[instrument(skip(content), err)]
pub fn extract_tile_maps(mut content: Node, base: &Path, suffix: &str) -> Result<Node> {
    for path in find_tagged(&content, |node| tile_map_blob(node).is_some()) {
        let path_str = path.to_string();
        let Some(fields) = content.resolve_mut(&path).and_then(Node::as_mapping_mut) else {
            continue;
        };
        let Some(Node::Scalar(Scalar::Bytes(blob))) = fields.shift_remove(DATA_FIELD) else {
            continue;
        };
        let Some(decoded) = decode_tilemap(&blob, suffix)? else {
            continue;
        };

        let artifact = tilemap_artifact_path(base, &path_str);
        write_atomic(&artifact, &decoded.blob)?;

        let file_name = artifact
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!(path = %path_str, file = %file_name, sheets = decoded.image_sources.len(), "extracted tile map");

        fields.insert(TBIN_FILE_FIELD.to_owned(), Node::string(file_name));
        fields.insert(
            SOURCES_FIELD.to_owned(),
            Node::Sequence(decoded.image_sources.into_iter().map(Node::string).collect()),
        );
    }

    Ok(content)
}

fn recorded_sources(node: &Node) -> Result<Vec<String>> {
    let Some(Node::Sequence(items)) = node.as_mapping().and_then(|f| f.get(SOURCES_FIELD)) else {
        return Ok(Vec::new());
    };

    items
        .iter()
        .map(|item| {
            item.as_scalar()
                .and_then(Scalar::as_str)
                .map(str::to_owned)
                .ok_or(Error::TypeMismatch {
                    expected: "string",
                    found: item.kind(),
                })
        })
        .collect()
}

fn has_tbin_file(node: &Node) -> bool {
    node.as_tagged()
        .and_then(|tagged| tagged.field(TBIN_FILE_FIELD))
        .is_some()
}

/// Read back every tile map extracted by [`extract_tile_maps`].
#[instrument(skip(content), err)]
pub fn inject_tile_maps(mut content: Node, base: &Path) -> Result<Node> {
    let dir = base.parent().unwrap_or(Path::new(""));

    for path in find_tagged(&content, has_tbin_file) {
        let path_str = path.to_string();
        let Some(node) = content.resolve_mut(&path) else {
            return Err(Error::InvalidPath(path_str));
        };

        let file_name = node
            .as_mapping()
            .and_then(|fields| fields.get(TBIN_FILE_FIELD))
            .and_then(Node::as_scalar)
            .and_then(Scalar::as_str)
            .ok_or_else(|| Error::InvalidPath(path_str.clone()))?
            .to_owned();
        if Path::new(&file_name).file_name() != Some(OsStr::new(&file_name)) {
            return Err(Error::InvalidTileMap(format!(
                "{} {:?} is not a file name next to the asset",
                TBIN_FILE_FIELD, file_name
            )));
        }
        let sources = recorded_sources(node)?;

        let artifact = dir.join(&file_name);
        if !artifact.is_file() {
            return Err(Error::MissingTileMapArtifact(artifact));
        }
        let blob = encode_tilemap(&std::fs::read(&artifact)?, &sources)?;

        if let Some(fields) = node.as_mapping_mut() {
            fields.shift_remove(TBIN_FILE_FIELD);
            fields.shift_remove(SOURCES_FIELD);
            fields.insert(DATA_FIELD.to_owned(), Node::bytes(blob));
        }
        debug!(path = %path_str, file = %file_name, "injected tile map");
    }

    Ok(content)
}

#[cfg(test)]
pub(crate) mod test {
    use pretty_assertions::assert_eq;

    use crate::error::{Error, Result};
    use crate::tbin::{decode_tilemap, encode_tilemap, MAGIC, TILESHEET_SUFFIX};

    fn string(out: &mut Vec<u8>, value: &str) {
        out.extend((value.len() as i32).to_le_bytes());
        out.extend(value.as_bytes());
    }

    fn properties(out: &mut Vec<u8>) {
        out.extend(4i32.to_le_bytes());
        string(out, "flag");
        out.extend([0, 1]);
        string(out, "count");
        out.push(1);
        out.extend((-3i32).to_le_bytes());
        string(out, "scale");
        out.push(2);
        out.extend(1.5f32.to_le_bytes());
        string(out, "note");
        out.push(3);
        string(out, "tBIN10 in a string");
    }

    /// A map with one property list and the given tile sheet sources
    pub(crate) fn synthetic_map(sources: &[&str]) -> Vec<u8> {
        let mut out = MAGIC.to_vec();
        string(&mut out, "Farm");
        string(&mut out, "");
        properties(&mut out);
        out.extend((sources.len() as i32).to_le_bytes());
        for (i, source) in sources.iter().enumerate() {
            string(&mut out, &format!("sheet{}", i));
            string(&mut out, "desc");
            string(&mut out, source);
            for metric in [16i32, 16, 0, 0] {
                out.extend(metric.to_le_bytes());
            }
            properties(&mut out);
        }
        // layers, left alone
        out.extend([0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x07]);
        out
    }

    #[test]
    fn suffix_changes_only_sources() -> Result<()> {
        let blob = synthetic_map(&["spring_outdoors", "paths"]);
        let decoded = decode_tilemap(&blob, TILESHEET_SUFFIX)?.ok_or(Error::InvalidTileMap("".into()))?;

        assert_eq!(decoded.blob.len(), blob.len() + TILESHEET_SUFFIX.len() * 2);
        assert_eq!(decoded.image_sources, vec!["spring_outdoors", "paths"]);
        assert_eq!(
            decoded.blob,
            synthetic_map(&["spring_outdoors.png", "paths.png"])
        );
        Ok(())
    }

    #[test]
    fn restore_reproduces_blob() -> Result<()> {
        let blob = synthetic_map(&["spring_outdoors", "paths"]);
        let decoded = decode_tilemap(&blob, TILESHEET_SUFFIX)?.ok_or(Error::InvalidTileMap("".into()))?;

        assert_eq!(encode_tilemap(&decoded.blob, &decoded.image_sources)?, blob);
        Ok(())
    }

    #[test]
    fn restore_uses_recorded_sources() -> Result<()> {
        let edited = synthetic_map(&["renamed.png"]);

        assert_eq!(
            encode_tilemap(&edited, &["original".to_string()])?,
            synthetic_map(&["original"])
        );
        Ok(())
    }

    #[test]
    fn not_a_tile_map() -> Result<()> {
        assert_eq!(decode_tilemap(b"PNG\x00\x00\x00\x00", TILESHEET_SUFFIX)?, None);
        assert_eq!(decode_tilemap(b"tBIN", TILESHEET_SUFFIX)?, None);
        Ok(())
    }

    #[test]
    fn sources_run_out() {
        let blob = synthetic_map(&["a", "b"]);
        let result = encode_tilemap(&blob, &["a".to_string()]);

        assert!(matches!(result, Err(Error::InvalidTileMap(_))));
    }

    #[test]
    fn unknown_property_type() {
        let mut blob = MAGIC.to_vec();
        string(&mut blob, "Id");
        string(&mut blob, "");
        blob.extend(1i32.to_le_bytes());
        string(&mut blob, "bad");
        blob.push(9);

        let result = decode_tilemap(&blob, TILESHEET_SUFFIX);

        assert!(matches!(result, Err(Error::InvalidTileMap(msg)) if msg.contains("unknown property type 9")));
    }

    #[test]
    fn truncated_sheet() {
        let mut blob = synthetic_map(&["a"]);
        let header_only = blob.len() - 6 - 60;
        blob.truncate(header_only);

        let result = decode_tilemap(&blob, TILESHEET_SUFFIX);

        assert!(matches!(result, Err(Error::TruncatedInput { .. })));
    }
}
