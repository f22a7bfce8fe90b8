use miette::{IntoDiagnostic, Result};
use pretty_assertions::assert_eq;
use tracing::info;
use tracing_test::traced_test;
use xnb_content::error::Error;
use xnb_content::types::{ExtractedImage, TEXTURE_TYPE};
use xnb_content::{ArtifactOptions, Asset, Node, PngCodec};

const STRING_READER: &str = "Microsoft.Xna.Framework.Content.StringReader";
const TEXTURE_READER: &str = "Microsoft.Xna.Framework.Content.Texture2DReader";
const TEXTURE_ARRAY: &str = "Microsoft.Xna.Framework.Content.ArrayReader`1[[Microsoft.Xna.Framework.Graphics.Texture2D, Microsoft.Xna.Framework.Graphics]]";
const SHEETS: &str = "Microsoft.Xna.Framework.Content.DictionaryReader`2[[System.String, mscorlib],[Microsoft.Xna.Framework.Graphics.Texture2D[], Microsoft.Xna.Framework.Graphics]]";
const ATLAS: &str = "Microsoft.Xna.Framework.Content.DictionaryReader`2[[System.String, mscorlib],[Microsoft.Xna.Framework.Content.DictionaryReader`2[[System.String, mscorlib],[Microsoft.Xna.Framework.Graphics.Texture2D[], Microsoft.Xna.Framework.Graphics]], Microsoft.Xna.Framework]]";

fn names() -> [&'static str; 5] {
    [ATLAS, STRING_READER, SHEETS, TEXTURE_ARRAY, TEXTURE_READER]
}

fn texture(width: i32, height: i32) -> Node {
    let pixels: Vec<u8> = (0..width * height * 4).map(|i| (i * 7) as u8).collect();
    Node::tagged(
        TEXTURE_TYPE,
        Node::mapping([
            ("format", Node::int(0)),
            ("width", Node::int(width)),
            ("height", Node::int(height)),
            ("pixel_buffer", Node::bytes(pixels)),
            ("mip_levels", Node::Sequence(vec![])),
        ]),
    )
}

/// `{"a": {"b": [texture, null, texture]}}`
fn atlas() -> Node {
    Node::mapping([(
        "a",
        Node::mapping([(
            "b",
            Node::Sequence(vec![texture(1, 1), Node::null(), texture(3, 2)]),
        )]),
    )])
}

#[test]
#[traced_test]
fn texture_round_trip_through_json() -> Result<()> {
    let dir = tempfile::tempdir().into_diagnostic()?;
    let base = dir.path().join("Atlas.json");
    let names = names();

    let payload = Asset::new(atlas()).encode(&names)?;
    let decoded = Asset::decode(&payload, &names)?;
    assert_eq!(decoded.content, atlas());

    let extracted = decoded.extract_artifacts(&base, &ArtifactOptions::default(), &PngCodec)?;
    assert_eq!(
        extracted.extracted_images,
        vec![
            ExtractedImage::new("a.b.0".into()),
            ExtractedImage::new("a.b.2".into()),
        ]
    );
    assert!(dir.path().join("Atlas.a.b.0.png").is_file());
    assert!(dir.path().join("Atlas.a.b.2.png").is_file());

    let json = serde_json::to_string_pretty(&extracted).into_diagnostic()?;
    info!("editable form:\n{}", json);
    assert!(json.contains("\"extractedImages\""));
    assert!(!json.contains("pixel_buffer"));

    let edited: Asset = serde_json::from_str(&json).into_diagnostic()?;
    assert_eq!(edited, extracted);

    let restored = edited.inject_artifacts(&base, &PngCodec)?;
    assert_eq!(restored.content, atlas());
    assert_eq!(restored.encode(&names)?, payload);
    Ok(())
}

#[test]
fn tags_survive_json() -> Result<()> {
    let asset = Asset::new(Node::tagged("Tide", Node::mapping([("id", Node::int(4))])));

    let json = serde_json::to_value(&asset).into_diagnostic()?;
    assert_eq!(
        json,
        serde_json::json!({
            "content": {
                "tagged_object": {
                    "type_name": "Tide",
                    "data": { "mapping": { "id": { "scalar": { "int": 4 } } } }
                }
            }
        })
    );

    let back: Asset = serde_json::from_value(json).into_diagnostic()?;
    assert_eq!(back, asset);
    Ok(())
}

#[test]
fn injection_needs_every_artifact() -> Result<()> {
    let dir = tempfile::tempdir().into_diagnostic()?;
    let base = dir.path().join("Atlas.json");

    let extracted =
        Asset::new(atlas()).extract_artifacts(&base, &ArtifactOptions::default(), &PngCodec)?;
    std::fs::remove_file(dir.path().join("Atlas.a.b.2.png")).into_diagnostic()?;

    let result = extracted.inject_artifacts(&base, &PngCodec);
    assert!(
        matches!(result, Err(Error::MissingImageArtifact(path)) if path.ends_with("Atlas.a.b.2.png"))
    );
    Ok(())
}

#[test]
fn stale_path_is_reported() -> Result<()> {
    let dir = tempfile::tempdir().into_diagnostic()?;
    let base = dir.path().join("Atlas.json");

    let mut extracted =
        Asset::new(atlas()).extract_artifacts(&base, &ArtifactOptions::default(), &PngCodec)?;
    if let Some(fields) = extracted.content.as_mapping_mut() {
        fields.shift_remove("a");
    }

    let result = extracted.inject_artifacts(&base, &PngCodec);
    assert!(matches!(result, Err(Error::InvalidPath(path)) if path == "a.b.0"));
    Ok(())
}

#[test]
fn extracted_tree_cannot_encode() -> Result<()> {
    let dir = tempfile::tempdir().into_diagnostic()?;
    let base = dir.path().join("Atlas.json");

    let extracted =
        Asset::new(atlas()).extract_artifacts(&base, &ArtifactOptions::default(), &PngCodec)?;
    let result = extracted.encode(&names());

    assert!(matches!(
        result,
        Err(Error::MissingField { field: "width", .. })
    ));
    Ok(())
}
