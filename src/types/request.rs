//! Request type definitions
//!
//! Defines song generation requests and the upstream payload they map to.

use serde::{Deserialize, Serialize};

/// Model used when a request does not name one
pub const DEFAULT_MODEL: &str = "chirp-v3-5";

/// Models known to be accepted by the generate endpoint
pub const KNOWN_MODELS: &[(&str, &str)] = &[
    ("chirp-v4", "Last generation model"),
    ("chirp-v3-5", "Default high-quality model"),
    ("chirp-v3-0", "Previous generation model"),
    ("chirp-v2-5", "Earlier generation model"),
];

/// Whether `model` appears in [`KNOWN_MODELS`]
pub fn is_known_model(model: &str) -> bool {
    KNOWN_MODELS.iter().any(|(name, _)| *name == model)
}

/// Request for song generation
///
/// Two mutually exclusive modes exist upstream: in custom mode `prompt`
/// holds the lyrics and `title`/`tags` are honoured; otherwise `prompt` is a
/// free-text description and title/tags are withheld.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Lyrics (custom mode) or song description
    pub prompt: String,

    /// Custom lyrics mode
    #[serde(default)]
    pub custom: bool,

    /// Style tags
    #[serde(default)]
    pub tags: String,

    /// Styles to steer away from
    #[serde(default)]
    pub negative_tags: String,

    /// Generate without vocals
    #[serde(default)]
    pub instrumental: bool,

    /// Song title, custom mode only
    #[serde(default)]
    pub title: Option<String>,

    /// Model version
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

/// JSON body of `POST /generate/v2/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratePayload {
    pub mv: String,
    pub title: String,
    pub prompt: String,
    pub gpt_description_prompt: String,
    pub tags: String,
    pub negative_tags: String,
    pub make_instrumental: bool,
    pub token: String,
}

impl GenerationRequest {
    /// Create a description-mode request
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            custom: false,
            tags: String::new(),
            negative_tags: String::new(),
            instrumental: false,
            title: None,
            model: default_model(),
        }
    }

    /// Create a custom-lyrics request
    pub fn custom(lyrics: impl Into<String>) -> Self {
        Self::new(lyrics).with_custom(true)
    }

    /// Set custom mode
    pub fn with_custom(mut self, custom: bool) -> Self {
        self.custom = custom;
        self
    }

    /// Set style tags
    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }

    /// Set negative tags
    pub fn with_negative_tags(mut self, negative_tags: impl Into<String>) -> Self {
        self.negative_tags = negative_tags.into();
        self
    }

    /// Set instrumental flag
    pub fn with_instrumental(mut self, instrumental: bool) -> Self {
        self.instrumental = instrumental;
        self
    }

    /// Set title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set model version
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Build the upstream payload, embedding the freshly minted `token`
    pub fn to_payload(&self, token: &str) -> GeneratePayload {
        let (title, prompt, description, tags) = if self.custom {
            (
                self.title.clone().unwrap_or_default(),
                self.prompt.clone(),
                String::new(),
                self.tags.clone(),
            )
        } else {
            (String::new(), String::new(), self.prompt.clone(), String::new())
        };

        GeneratePayload {
            mv: self.model.clone(),
            title,
            prompt,
            gpt_description_prompt: description,
            tags,
            negative_tags: self.negative_tags.clone(),
            make_instrumental: self.instrumental,
            token: format!("P1_{}", token),
        }
    }
}
