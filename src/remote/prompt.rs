//! Request body construction for the vision analysis call.
//!
//! [`build_analysis_body`] produces the chat-completions JSON: a fixed
//! system prompt plus one user message holding the question text (with the
//! optional vehicle description) and the image as a base64 JPEG data URL.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// System prompt
// ---------------------------------------------------------------------------

/// Fixed instructions for the diagnostic assistant.
///
/// The response format ("Summary followed by bullet points") is relied on by
/// the narration sanitizer, which strips the markup before display.
pub const SYSTEM_PROMPT: &str = "\
You are CarDoctor, an AI assistant specializing in vehicle diagnostics and troubleshooting. \
When a user shares images of dashboard warning lights, engine components, or other vehicle issues:

1. Identify dashboard symbols and explain severity (urgent, needs attention, informational).
2. Suggest common-to-rare causes based on the make/model (if known).
3. Detect oil vs. coolant leaks.
4. Diagnose tire wear from alignment vs. inflation.
5. Spot critical alerts: brake line leaks, belts, etc.
6. Offer safe \"limp mode\" advice.
7. Prompt questions like \"How many miles since last oil change?\"
8. Clearly assess driving safety.
9. Suggest safe basic checks (no tools).
10. Recommend when to seek professional service.
11. Identify parts in the photo and explain how they relate to the issue.
12. Recommend documenting intermittent problems.

Tone: Professional, helpful, and concise.
Format: Summary followed by bullet points of findings.";

/// Question sent with every image.
pub const USER_QUESTION: &str = "What do you see in this car image?";

// ---------------------------------------------------------------------------
// ImageDetail
// ---------------------------------------------------------------------------

/// Resolution hint for the vision model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    Low,
    #[default]
    High,
    Auto,
}

impl ImageDetail {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageDetail::Low => "low",
            ImageDetail::High => "high",
            ImageDetail::Auto => "auto",
        }
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// User-visible text part: the fixed question, then the vehicle description
/// when one was supplied.
pub fn user_text(context: Option<&str>) -> String {
    match context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(vehicle) => format!("{USER_QUESTION}\nVehicle: {vehicle}"),
        None => USER_QUESTION.to_string(),
    }
}

/// `data:` URL embedding `image` as base64 JPEG.
pub fn image_data_url(image: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", BASE64.encode(image))
}

/// Full chat-completions request body.
pub fn build_analysis_body(
    model: &str,
    max_tokens: u32,
    detail: ImageDetail,
    image: &[u8],
    context: Option<&str>,
) -> serde_json::Value {
    serde_json::json!({
        "model": model,
        "messages": [
            { "role": "system", "content": SYSTEM_PROMPT },
            {
                "role": "user",
                "content": [
                    { "type": "text", "text": user_text(context) },
                    {
                        "type": "image_url",
                        "image_url": {
                            "url": image_data_url(image),
                            "detail": detail.as_str()
                        }
                    }
                ]
            }
        ],
        "max_tokens": max_tokens
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
