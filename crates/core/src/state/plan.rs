//! # Presentation Plan
//!
//! The evolving document state threaded through the pipeline, plus the
//! request payloads each stage sends to its provider.

use serde::{Deserialize, Serialize};

/// Slide layout
///
/// Serialized as the human label providers understand ("Title Slide").
/// Anything unrecognized falls back to `TitleAndContent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SlideLayout {
    TitleSlide,
    #[default]
    TitleAndContent,
    SectionHeader,
    TwoContent,
}

impl SlideLayout {
    pub fn label(&self) -> &'static str {
        match self {
            Self::TitleSlide => "Title Slide",
            Self::TitleAndContent => "Title and Content",
            Self::SectionHeader => "Section Header",
            Self::TwoContent => "Two Content",
        }
    }

    /// Lenient parse: ignores case, spaces, underscores and dashes.
    pub fn from_label(s: &str) -> Self {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "titleslide" => Self::TitleSlide,
            "titleandcontent" => Self::TitleAndContent,
            "sectionheader" => Self::SectionHeader,
            "twocontent" => Self::TwoContent,
            _ => Self::TitleAndContent,
        }
    }
}

impl From<String> for SlideLayout {
    fn from(s: String) -> Self {
        Self::from_label(&s)
    }
}

impl From<SlideLayout> for String {
    fn from(layout: SlideLayout) -> Self {
        layout.label().to_string()
    }
}

/// One slide of the presentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideSpec {
    /// 1-based page number
    pub page_number: u32,
    pub title: String,
    #[serde(default)]
    pub layout: SlideLayout,
    /// Body text / bullet points
    #[serde(default)]
    pub body_text: Option<String>,
    #[serde(default)]
    pub speaker_notes: Option<String>,
    /// Prompt for the image stage; slides without one get no image
    #[serde(default)]
    pub image_prompt: Option<String>,
    /// Location of the generated image, set only by the image stage
    #[serde(default)]
    pub image_path: Option<String>,
}

impl SlideSpec {
    pub fn new(page_number: u32, title: impl Into<String>) -> Self {
        Self {
            page_number,
            title: title.into(),
            layout: SlideLayout::default(),
            body_text: None,
            speaker_notes: None,
            image_prompt: None,
            image_path: None,
        }
    }

    pub fn with_layout(mut self, layout: SlideLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_image_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.image_prompt = Some(prompt.into());
        self
    }

    /// The image prompt, unless missing or blank
    pub fn usable_image_prompt(&self) -> Option<&str> {
        self.image_prompt
            .as_deref()
            .map(str::trim)
            .filter(|prompt| !prompt.is_empty())
    }

    /// Take a content-stage rewrite of this slide.
    ///
    /// The content stage owns title, body, notes and image prompt. Layout,
    /// page number and image path stay as they were.
    pub fn merge_content(&self, written: SlideSpec) -> SlideSpec {
        SlideSpec {
            page_number: self.page_number,
            layout: self.layout,
            image_path: self.image_path.clone(),
            ..written
        }
    }
}

/// The whole presentation as it moves through the stages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationPlan {
    pub topic: String,
    pub slides: Vec<SlideSpec>,
}

impl PresentationPlan {
    pub fn new(topic: impl Into<String>, slides: Vec<SlideSpec>) -> Self {
        Self {
            topic: topic.into(),
            slides,
        }
    }

    /// Parse the JSON wire form
    pub fn from_wire(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Serialize to the JSON wire form
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Swap in a rewritten slide list. Order and count must be unchanged.
    pub fn replace_slides(&mut self, slides: Vec<SlideSpec>) {
        debug_assert_eq!(slides.len(), self.slides.len());
        self.slides = slides;
    }

    /// Number of slides that will be sent to the image stage
    pub fn image_candidates(&self) -> usize {
        self.slides
            .iter()
            .filter(|s| s.usable_image_prompt().is_some())
            .count()
    }
}

fn default_num_slides() -> u32 {
    5
}

fn default_style() -> String {
    "professional".to_string()
}

/// Immutable input to one pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub topic: String,
    #[serde(default = "default_num_slides")]
    pub num_slides: u32,
    #[serde(default = "default_style")]
    pub style: String,
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            num_slides: default_num_slides(),
            style: default_style(),
        }
    }

    pub fn with_num_slides(mut self, num_slides: u32) -> Self {
        self.num_slides = num_slides;
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }
}

/// Content stage request for one slide
#[derive(Debug, Serialize)]
pub struct ContentRequest<'a> {
    pub slide: &'a SlideSpec,
    pub topic: &'a str,
}

/// Image stage request for one slide
#[derive(Debug, Serialize)]
pub struct ImageRequest<'a> {
    pub prompt: &'a str,
    pub title: &'a str,
}

/// Image stage reply
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageReply {
    pub image_path: String,
}
