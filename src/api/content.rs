//! Message Content
//!
//! The `content` field of a message is either a plain string or an array of
//! content items. The shape is decided once, at decode time, and kept in
//! [`Content`]. Array elements are decoded through a [`ContentItemMatcher`].

use crate::api::registry::{self, ContentItemMatcher, DefaultMatcher};
use crate::error::{ChatwireError, Result};
use serde::de::Error as _;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

/// One element of an array-shaped message content
pub trait ContentItem: fmt::Debug + Send + Sync {
    /// Discriminator keyword of this item
    fn kind(&self) -> &str;

    /// Text carried by the item (the URL for image items)
    fn text(&self) -> String;

    fn as_text(&self) -> Option<TextContent> {
        None
    }

    fn as_image(&self) -> Option<ImageContent> {
        None
    }

    /// Wire representation used when the message is encoded again
    fn to_json(&self) -> Value;
}

/// Text content item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    pub text: String,
}

impl TextContent {
    pub const KIND: &'static str = "text";

    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl ContentItem for TextContent {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn text(&self) -> String {
        self.text.clone()
    }

    fn as_text(&self) -> Option<TextContent> {
        Some(self.clone())
    }

    fn to_json(&self) -> Value {
        json!({ "type": Self::KIND, "text": self.text })
    }
}

/// Image URL content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// URL or base64 data URL
    pub url: String,

    /// Optional detail level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Image reference content item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageContent {
    pub image_url: ImageUrl,
}

impl ImageContent {
    pub const KIND: &'static str = "image_url";

    pub fn new(url: impl Into<String>) -> Self {
        Self {
            image_url: ImageUrl {
                url: url.into(),
                detail: None,
            },
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.image_url.detail = Some(detail.into());
        self
    }
}

impl ContentItem for ImageContent {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn text(&self) -> String {
        self.image_url.url.clone()
    }

    fn as_image(&self) -> Option<ImageContent> {
        Some(self.clone())
    }

    fn to_json(&self) -> Value {
        json!({ "type": Self::KIND, "image_url": self.image_url })
    }
}

/// Message content - either a plain string or an ordered list of items
#[derive(Debug, Clone)]
pub enum Content {
    /// Simple string content
    Text(String),

    /// Array of content items (for multimodal)
    Items(Vec<Arc<dyn ContentItem>>),
}

impl Content {
    /// Build array content from concrete items
    pub fn items<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ContentItem + 'static,
    {
        Content::Items(
            items
                .into_iter()
                .map(|item| Arc::new(item) as Arc<dyn ContentItem>)
                .collect(),
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Content::Text(s) => Some(s),
            Content::Items(_) => None,
        }
    }

    pub fn as_items(&self) -> Option<&[Arc<dyn ContentItem>]> {
        match self {
            Content::Text(_) => None,
            Content::Items(items) => Some(items),
        }
    }

    /// Convert to string (concatenating text items if needed)
    pub fn to_string_content(&self) -> String {
        match self {
            Content::Text(s) => s.clone(),
            Content::Items(items) => items
                .iter()
                .filter_map(|item| item.as_text())
                .map(|t| t.text)
                .collect::<Vec<_>>()
                .join(""),
        }
    }

    /// Check if content is empty
    pub fn is_empty(&self) -> bool {
        match self {
            Content::Text(s) => s.is_empty(),
            Content::Items(items) => items.is_empty(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Content::Text(s) => Value::String(s.clone()),
            Content::Items(items) => Value::Array(items.iter().map(|i| i.to_json()).collect()),
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Content::Text(String::new())
    }
}

impl PartialEq for Content {
    fn eq(&self, other: &Self) -> bool {
        self.to_json() == other.to_json()
    }
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Content::Text(s.to_string())
    }
}

impl From<String> for Content {
    fn from(s: String) -> Self {
        Content::Text(s)
    }
}

impl Serialize for Content {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Content::Text(s) => serializer.serialize_str(s),
            Content::Items(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&item.to_json())?;
                }
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Content {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        ContentDecoder::current()
            .decode(value)
            .map_err(D::Error::custom)
    }
}

/// What to do with an array element no matcher recognizes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownItemPolicy {
    /// Drop the element and keep decoding
    #[default]
    Skip,

    /// Fail the whole decode
    Reject,
}

/// Decodes raw `content` values into [`Content`]
#[derive(Clone)]
pub struct ContentDecoder {
    matcher: Arc<dyn ContentItemMatcher>,
    policy: UnknownItemPolicy,
}

impl ContentDecoder {
    pub fn new(matcher: impl ContentItemMatcher + 'static) -> Self {
        Self {
            matcher: Arc::new(matcher),
            policy: UnknownItemPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: UnknownItemPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> UnknownItemPolicy {
        self.policy
    }

    /// The decoder installed process-wide, or the built-in one
    pub fn current() -> Self {
        registry::current_decoder()
    }

    /// Decode a raw `content` value
    pub fn decode(&self, value: Value) -> Result<Content> {
        match value {
            Value::String(s) => Ok(Content::Text(s)),
            // assistant messages carrying only tool calls
            Value::Null => Ok(Content::default()),
            Value::Array(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for element in &elements {
                    if let Some(item) = self.decode_item(element)? {
                        items.push(item);
                    }
                }
                Ok(Content::Items(items))
            }
            other => Err(ChatwireError::InvalidContent(format!(
                "expected a string or an array, got {}",
                other
            ))),
        }
    }

    /// Decode one array element, `None` when it is skipped
    pub fn decode_item(&self, element: &Value) -> Result<Option<Arc<dyn ContentItem>>> {
        let Value::Object(fields) = element else {
            return Err(ChatwireError::InvalidContent(format!(
                "content item must be an object, got {}",
                element
            )));
        };

        // explicit "type" wins; otherwise the first key the matcher knows
        let (keyword, decoder) = match fields.get("type") {
            Some(Value::String(kind)) => (kind.clone(), self.matcher.resolve(kind)),
            _ => fields
                .keys()
                .find_map(|key| self.matcher.resolve(key).map(|d| (key.clone(), Some(d))))
                .unwrap_or_else(|| (fields.keys().next().cloned().unwrap_or_default(), None)),
        };

        match decoder {
            Some(decode) => decode(element)
                .map(Some)
                .map_err(|e| ChatwireError::decode(e, element.to_string())),
            None => match self.policy {
                UnknownItemPolicy::Skip => {
                    tracing::debug!(keyword = %keyword, "skipping unrecognized content item");
                    Ok(None)
                }
                UnknownItemPolicy::Reject => Err(ChatwireError::UnknownContentItem(keyword)),
            },
        }
    }
}

impl Default for ContentDecoder {
    fn default() -> Self {
        Self::new(DefaultMatcher)
    }
}

impl fmt::Debug for ContentDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentDecoder")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
