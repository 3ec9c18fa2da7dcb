//! Wire types for the Gemini `generateContent` API.
//!
//! Requests send inline attachments as `inline_data`; responses deliver them
//! as `inlineData`. The deserializers accept both casings.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    pub model: String,
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RequestPart {
    Text { text: String },
    InlineData { inline_data: InlineBlob },
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineBlob {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Default, Serialize)]
pub struct GenerationConfig {
    #[serde(rename = "thinkingConfig", skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
    #[serde(rename = "responseModalities", skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<String>>,
    #[serde(rename = "imageConfig", skip_serializing_if = "Option::is_none")]
    pub image_config: Option<ImageConfig>,
    #[serde(rename = "response_mime_type", skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ThinkingConfig {
    #[serde(rename = "thinkingLevel")]
    pub thinking_level: String,
}

#[derive(Debug, Serialize)]
pub struct ImageConfig {
    #[serde(rename = "aspectRatio")]
    pub aspect_ratio: String,
    #[serde(rename = "imageSize")]
    pub image_size: String,
}

impl GenerateContentRequest {
    /// A plain text request with high-effort thinking (outline/style calls).
    pub fn text(model: &str, prompt: &str) -> Self {
        Self {
            model: model.to_string(),
            contents: vec![Content {
                parts: vec![RequestPart::Text {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                thinking_config: Some(ThinkingConfig {
                    thinking_level: "high".to_string(),
                }),
                ..Default::default()
            }),
        }
    }

    /// An image request: prompt plus inline attachments, 16:9 at 4K.
    pub fn image(model: &str, prompt: &str, attachments: Vec<InlineBlob>) -> Self {
        let mut parts = vec![RequestPart::Text {
            text: prompt.to_string(),
        }];
        parts.extend(
            attachments
                .into_iter()
                .map(|blob| RequestPart::InlineData { inline_data: blob }),
        );
        Self {
            model: model.to_string(),
            contents: vec![Content { parts }],
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["TEXT".to_string(), "IMAGE".to_string()]),
                image_config: Some(ImageConfig {
                    aspect_ratio: "16:9".to_string(),
                    image_size: "4K".to_string(),
                }),
                ..Default::default()
            }),
        }
    }

    /// A vision request forced into JSON output mode (template analysis).
    pub fn analysis(model: &str, prompt: &str, attachment: InlineBlob) -> Self {
        Self {
            model: model.to_string(),
            contents: vec![Content {
                parts: vec![
                    RequestPart::Text {
                        text: prompt.to_string(),
                    },
                    RequestPart::InlineData {
                        inline_data: attachment,
                    },
                ],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                ..Default::default()
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, rename = "inlineData", alias = "inline_data")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
pub struct InlineData {
    pub data: String,
    #[serde(default, rename = "mimeType", alias = "mime_type")]
    pub mime_type: Option<String>,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[ResponsePart] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or(&[])
    }

    /// Text of the first part that carries any.
    pub fn first_text(&self) -> Option<&str> {
        self.first_parts()
            .iter()
            .find_map(|part| part.text.as_deref())
    }

    /// The first inline image payload, if any part carries one.
    pub fn first_inline_data(&self) -> Option<&InlineData> {
        self.first_parts()
            .iter()
            .find_map(|part| part.inline_data.as_ref())
    }

    /// Text of the second part when present, else the first.
    ///
    /// In JSON-forced mode the first part may be thinking output; the actual
    /// answer follows it.
    pub fn analysis_text(&self) -> Option<&str> {
        let parts = self.first_parts();
        parts
            .get(1)
            .and_then(|part| part.text.as_deref())
            .or_else(|| self.first_text())
    }
}
