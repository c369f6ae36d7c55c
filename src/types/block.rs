use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DEFAULT_LINK_TITLE: &str = "Link";

/// One typed unit of resource content, stored as JSON with a `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum ContentBlock {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Link {
        url: String,
        title: String,
    },
    Image(MediaBlock),
    Pdf(MediaBlock),
    Formula {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaBlock {
    pub asset_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Untrusted block as submitted by a client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInput {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, alias = "asset_id")]
    pub asset_id: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl ContentBlock {
    /// Converts one submitted block. `Ok(None)` means the block is dropped.
    ///
    /// Unknown types, empty TEXT and LINK without a url are dropped silently;
    /// an empty FORMULA or a media block without an asset fails the request.
    pub fn from_input(input: &BlockInput) -> Result<Option<ContentBlock>> {
        let kind = input
            .kind
            .as_deref()
            .map(|k| k.trim().to_ascii_uppercase())
            .unwrap_or_default();

        let block = match kind.as_str() {
            "TEXT" => trimmed(input.text.as_deref()).map(|text| ContentBlock::Text {
                text,
                title: input.title.clone(),
            }),
            "LINK" => trimmed(input.url.as_deref()).map(|url| ContentBlock::Link {
                url,
                title: trimmed(input.title.as_deref())
                    .unwrap_or_else(|| DEFAULT_LINK_TITLE.to_string()),
            }),
            "IMAGE" | "PDF" => {
                let asset_id = trimmed(input.asset_id.as_deref()).ok_or_else(|| {
                    Error::bad_request("An uploaded file is required for media blocks")
                })?;
                let media = MediaBlock {
                    asset_id,
                    caption: input.caption.clone(),
                    title: input.title.clone(),
                };
                Some(if kind == "IMAGE" {
                    ContentBlock::Image(media)
                } else {
                    ContentBlock::Pdf(media)
                })
            }
            "FORMULA" => {
                let text = trimmed(input.text.as_deref())
                    .ok_or_else(|| Error::bad_request("Formula cannot be empty"))?;
                Some(ContentBlock::Formula {
                    text,
                    title: input.title.clone(),
                })
            }
            _ => None,
        };

        Ok(block)
    }
}

/// Validates submitted blocks in order, keeping only the accepted ones.
pub fn validate_blocks(inputs: &[BlockInput]) -> Result<Vec<ContentBlock>> {
    let mut blocks = Vec::with_capacity(inputs.len());
    for input in inputs {
        if let Some(block) = ContentBlock::from_input(input)? {
            blocks.push(block);
        }
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(kind: &str) -> BlockInput {
        BlockInput {
            kind: Some(kind.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_unknown_types_are_dropped() {
        let blocks = validate_blocks(&[input("VIDEO"), BlockInput::default()]).unwrap();
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_empty_text_is_dropped_but_empty_formula_fails() {
        let mut text = input("text");
        text.text = Some("   ".to_string());
        assert!(validate_blocks(&[text]).unwrap().is_empty());

        let formula = input("FORMULA");
        assert!(matches!(
            validate_blocks(&[formula]),
            Err(Error::BadRequest(_))
        ));
    }

    #[test]
    fn test_link_defaults_title() {
        let mut link = input("LINK");
        link.url = Some(" https://example.com ".to_string());
        let blocks = validate_blocks(&[link, input("LINK")]).unwrap();
        assert_eq!(
            blocks,
            vec![ContentBlock::Link {
                url: "https://example.com".to_string(),
                title: "Link".to_string(),
            }]
        );
    }

    #[test]
    fn test_media_requires_asset() {
        assert!(validate_blocks(&[input("PDF")]).is_err());

        let mut image = input("IMAGE");
        image.asset_id = Some("asset-1".to_string());
        image.caption = Some("Diagram".to_string());
        let blocks = validate_blocks(&[image]).unwrap();
        assert!(matches!(&blocks[0], ContentBlock::Image(m) if m.asset_id == "asset-1"));
    }

    #[test]
    fn test_stored_json_shape() {
        let block = ContentBlock::Pdf(MediaBlock {
            asset_id: "a1".to_string(),
            caption: None,
            title: None,
        });
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json, serde_json::json!({"type": "PDF", "assetId": "a1"}));

        let back: ContentBlock = serde_json::from_value(json).unwrap();
        assert_eq!(back, block);
    }

    #[test]
    fn test_accepts_snake_case_asset_id() {
        let parsed: BlockInput =
            serde_json::from_str(r#"{"type":"IMAGE","asset_id":"x"}"#).unwrap();
        assert_eq!(parsed.asset_id.as_deref(), Some("x"));
    }
}
