//! User-controlled generation settings.
//!
//! Color/font schemes, the content-richness directive, and page-number
//! placement. All of these feed the style-generation prompt; every field is
//! optional on the wire and falls back to built-in defaults when absent.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// A named color scheme supplied by the client.
///
/// Hex values are passed through verbatim into the style prompt; no
/// validation beyond being strings is performed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorScheme {
    #[serde(default)]
    pub name: Option<String>,
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub gray: String,
}

/// Font size suggestions in points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontSizes {
    #[serde(default = "default_main_title_size")]
    pub main_title: u32,
    #[serde(default = "default_page_title_size")]
    pub page_title: u32,
    #[serde(default = "default_body_size")]
    pub body: u32,
}

fn default_main_title_size() -> u32 {
    48
}

fn default_page_title_size() -> u32 {
    18
}

fn default_body_size() -> u32 {
    14
}

impl Default for FontSizes {
    fn default() -> Self {
        Self {
            main_title: default_main_title_size(),
            page_title: default_page_title_size(),
            body: default_body_size(),
        }
    }
}

/// A named font scheme supplied by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontScheme {
    #[serde(default)]
    pub name: Option<String>,
    pub title: String,
    pub body: String,
    pub english: String,
    #[serde(default)]
    pub sizes: FontSizes,
}

/// Free-form directive controlling how dense each page's content should be.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentRichness {
    #[serde(default)]
    pub prompt: String,
}

/// Where the page number is rendered on each generated slide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageNumberPlacement {
    None,
    BottomLeft,
    BottomRight,
    #[default]
    BottomCenter,
}

impl fmt::Display for PageNumberPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageNumberPlacement::None => write!(f, "none"),
            PageNumberPlacement::BottomLeft => write!(f, "bottom-left"),
            PageNumberPlacement::BottomRight => write!(f, "bottom-right"),
            PageNumberPlacement::BottomCenter => write!(f, "bottom-center"),
        }
    }
}

impl FromStr for PageNumberPlacement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(PageNumberPlacement::None),
            "bottom-left" => Ok(PageNumberPlacement::BottomLeft),
            "bottom-right" => Ok(PageNumberPlacement::BottomRight),
            "bottom-center" => Ok(PageNumberPlacement::BottomCenter),
            other => Err(format!("invalid page number placement: '{other}'")),
        }
    }
}

/// Template settings attached to a session before style generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateSettings {
    #[serde(default)]
    pub color_scheme: Option<ColorScheme>,
    #[serde(default)]
    pub font_scheme: Option<FontScheme>,
    #[serde(default)]
    pub content_richness: Option<ContentRichness>,
    #[serde(default)]
    pub page_number_placement: PageNumberPlacement,
}
