//! Moving texture pixels out of the tree and back.
//!
//! Every `Texture2D` whose first level is plain RGBA data is written to a PNG
//! next to the asset and its `pixel_buffer`, `width` and `height` fields are
//! dropped from the tree. The structural path of each texture is recorded so
//! [`inject_images`] can put the pixels back.
//!
//! Artifacts are named `{stem}.{path}.png`, where `stem` is the asset file name
//! without its extension.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use crate::artifact::{sibling_path, write_atomic};
use crate::error::{Error, Result};
use crate::types::{ExtractedImage, Node, TEXTURE_TYPE};
use crate::walk::{find_tagged, NodePath};

const BYTES_PER_PIXEL: usize = 4;

/// Pixels of one texture level, 8-bit RGBA
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Conversion between [`RawImage`] and the bytes of an image file
pub trait ImageCodec {
    fn encode(&self, image: &RawImage) -> Result<Vec<u8>>;
    fn decode(&self, bytes: &[u8]) -> Result<RawImage>;
}

/// PNG files, read as and written as RGBA8
#[derive(Debug, Clone, Copy, Default)]
pub struct PngCodec;

impl ImageCodec for PngCodec {
    fn encode(&self, image: &RawImage) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();

        let mut encoder = png::Encoder::new(&mut bytes, image.width, image.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Default);

        let mut writer = encoder.write_header()?;
        writer.write_image_data(&image.pixels)?;
        writer.finish()?;

        Ok(bytes)
    }

    fn decode(&self, bytes: &[u8]) -> Result<RawImage> {
        let mut decoder = png::Decoder::new(Cursor::new(bytes));
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        let mut reader = decoder.read_info()?;

        let mut buffer = vec![0u8; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buffer)?;
        buffer.truncate(info.buffer_size());

        let pixels = match info.color_type {
            png::ColorType::Rgba => buffer,
            png::ColorType::Rgb => buffer
                .chunks_exact(3)
                .flat_map(|px| [px[0], px[1], px[2], u8::MAX])
                .collect(),
            png::ColorType::GrayscaleAlpha => buffer
                .chunks_exact(2)
                .flat_map(|px| [px[0], px[0], px[0], px[1]])
                .collect(),
            // Indexed images are expanded to RGB(A) by the decoder
            png::ColorType::Grayscale | png::ColorType::Indexed => buffer
                .iter()
                .flat_map(|&v| [v, v, v, u8::MAX])
                .collect(),
        };

        Ok(RawImage {
            width: info.width,
            height: info.height,
            pixels,
        })
    }
}

/// Location of the artifact for the texture at `path`
pub fn image_artifact_path(base: &Path, path: &str) -> PathBuf {
    sibling_path(base, &format!(".{}.png", path))
}

fn is_texture(node: &Node) -> bool {
    node.as_tagged()
        .is_some_and(|tagged| tagged.type_name == TEXTURE_TYPE)
}

fn int_field(node: &Node, name: &str) -> Option<i32> {
    node.as_mapping()?.get(name)?.as_scalar()?.as_int()
}

/// Pixels of a texture if its first level is exactly `width * height` RGBA
fn texture_pixels(node: &Node) -> Option<RawImage> {
    let width = u32::try_from(int_field(node, "width")?).ok()?;
    let height = u32::try_from(int_field(node, "height")?).ok()?;
    let pixels = node
        .as_mapping()?
        .get("pixel_buffer")?
        .as_scalar()?
        .as_bytes()?;

    let expected = (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(BYTES_PER_PIXEL)?;
    (pixels.len() == expected).then(|| RawImage {
        width,
        height,
        pixels: pixels.to_vec(),
    })
}

/// Write the pixels of every texture in `content` to sibling PNG files.
///
/// Returns the tree with the pixel fields removed and the list of extracted
/// paths in walk order.
#[instrument(skip(content, codec), err)]
pub fn extract_images(
    mut content: Node,
    base: &Path,
    codec: &impl ImageCodec,
) -> Result<(Node, Vec<ExtractedImage>)> {
    let mut extracted = Vec::new();

    for path in find_tagged(&content, is_texture) {
        let path_str = path.to_string();
        let Some(node) = content.resolve_mut(&path) else {
            continue;
        };

        let Some(image) = texture_pixels(node) else {
            warn!(path = %path_str, "texture is not plain RGBA, leaving it in place");
            continue;
        };

        let artifact = image_artifact_path(base, &path_str);
        write_atomic(&artifact, &codec.encode(&image)?)?;

        if let Some(fields) = node.as_mapping_mut() {
            fields.shift_remove("pixel_buffer");
            fields.shift_remove("width");
            fields.shift_remove("height");
        }

        debug!(path = %path_str, width = image.width, height = image.height, "extracted image");
        extracted.push(ExtractedImage::new(path_str));
    }

    Ok((content, extracted))
}

/// Restore the pixel fields of every texture listed in `images`.
#[instrument(skip(content, images, codec), err)]
pub fn inject_images(
    mut content: Node,
    images: &[ExtractedImage],
    base: &Path,
    codec: &impl ImageCodec,
) -> Result<Node> {
    for image in images {
        let artifact = image_artifact_path(base, &image.path);
        if !artifact.is_file() {
            return Err(Error::MissingImageArtifact(artifact));
        }

        let path: NodePath = image.path.parse().unwrap_or_default();
        let fields = content
            .resolve_tagged_mut(&path)
            .filter(|node| node.has_tag(TEXTURE_TYPE))
            .and_then(|node| node.untagged_mut().as_mapping_mut())
            .ok_or_else(|| Error::InvalidPath(image.path.clone()))?;

        let raw = codec.decode(&std::fs::read(&artifact)?)?;
        let width = i32::try_from(raw.width).map_err(|_| Error::InvalidLength(raw.width.into()))?;
        let height =
            i32::try_from(raw.height).map_err(|_| Error::InvalidLength(raw.height.into()))?;

        fields.insert("width".to_owned(), Node::int(width));
        fields.insert("height".to_owned(), Node::int(height));
        fields.insert("pixel_buffer".to_owned(), Node::bytes(raw.pixels));

        debug!(path = %image.path, width, height, "injected image");
    }

    Ok(content)
}
