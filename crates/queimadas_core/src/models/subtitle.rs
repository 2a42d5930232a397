//! Legend (subtitle) configuration.

use serde::{Deserialize, Serialize};

/// One legend swatch row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SubtitleItem {
    #[serde(default)]
    pub subtitle_id: Option<String>,
    #[serde(default)]
    pub fill_color: Option<String>,
    #[serde(default)]
    pub border_color: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(rename = "SubtitleText")]
    pub text: String,
}

impl SubtitleItem {
    /// Inline style of the swatch box; `base_url` prefixes icon paths.
    pub fn swatch_style(&self, base_url: &str) -> String {
        let mut css = String::new();
        if let Some(fill) = &self.fill_color {
            css.push_str(&format!("background-color: {};", fill));
        }
        if let Some(border) = &self.border_color {
            css.push_str(&format!("border: solid 2px {};", border));
        }
        if let Some(image) = &self.image {
            css.push_str(&format!(
                "background: url({}{});background-size: 12px;background-position: center;background-repeat: no-repeat;",
                base_url, image
            ));
        }
        css
    }
}

/// Legend group as written in the configuration document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawSubtitle {
    pub id: String,
    pub layer_id: String,
    #[serde(default)]
    pub layer_name: String,
    #[serde(default)]
    pub subtitles: Vec<SubtitleItem>,
}

/// A legend group tied to one or more layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSubtitle")]
pub struct SubtitleConfig {
    pub id: String,
    /// Layer ids from the pipe-delimited `LayerId` field.
    pub layer_ids: Vec<String>,
    pub layer_name: String,
    pub items: Vec<SubtitleItem>,
}

impl From<RawSubtitle> for SubtitleConfig {
    fn from(raw: RawSubtitle) -> Self {
        Self {
            id: raw.id,
            layer_ids: split_layer_ids(&raw.layer_id),
            layer_name: raw.layer_name,
            items: raw.subtitles,
        }
    }
}

impl SubtitleConfig {
    pub fn references_layer(&self, layer_id: &str) -> bool {
        self.layer_ids.iter().any(|id| id == layer_id)
    }
}

/// Split a pipe-delimited layer id set, dropping empty members.
pub fn split_layer_ids(value: &str) -> Vec<String> {
    value
        .split('|')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}
