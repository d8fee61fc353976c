//! Content Item Registry
//!
//! Maps a discriminator keyword to the decoder for one content item shape.
//!
//! The registry is process-wide on purpose: it is the hook that lets callers
//! teach serde-driven decoding about content items this crate does not know.
//! Install a custom matcher once at startup. Replacing it while responses are
//! being decoded affects every decode that starts afterwards (last writer wins).
//!
//! Custom matchers must consult [`DefaultMatcher`] first and only handle the
//! keywords it returns `None` for, otherwise built-in items stop decoding.

use crate::api::content::{ContentDecoder, ContentItem, ImageContent, TextContent, UnknownItemPolicy};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Decodes one array element into a content item
pub type ItemDecoder = fn(&serde_json::Value) -> Result<Arc<dyn ContentItem>, serde_json::Error>;

/// Decode an element straight into `T` via serde
pub fn decode_item<T>(value: &serde_json::Value) -> Result<Arc<dyn ContentItem>, serde_json::Error>
where
    T: ContentItem + DeserializeOwned + 'static,
{
    let item = T::deserialize(value)?;
    Ok(Arc::new(item))
}

/// Strategy that resolves a discriminator keyword to an item decoder
pub trait ContentItemMatcher: Send + Sync {
    /// Returns `None` when the keyword is not recognized
    fn resolve(&self, keyword: &str) -> Option<ItemDecoder>;
}

/// Built-in matcher for `text` and `image_url` items
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMatcher;

impl ContentItemMatcher for DefaultMatcher {
    fn resolve(&self, keyword: &str) -> Option<ItemDecoder> {
        match keyword {
            TextContent::KIND => Some(decode_item::<TextContent> as ItemDecoder),
            ImageContent::KIND => Some(decode_item::<ImageContent> as ItemDecoder),
            _ => None,
        }
    }
}

static GLOBAL_DECODER: RwLock<Option<ContentDecoder>> = RwLock::new(None);

/// Replace the process-wide content decoder
pub fn set_content_decoder(decoder: ContentDecoder) {
    *GLOBAL_DECODER.write() = Some(decoder);
}

/// Replace the process-wide matcher, keeping the current unknown-item policy
pub fn set_content_item_matcher(matcher: impl ContentItemMatcher + 'static) {
    let mut global = GLOBAL_DECODER.write();
    let policy = global
        .as_ref()
        .map(ContentDecoder::policy)
        .unwrap_or_default();
    *global = Some(ContentDecoder::new(matcher).with_policy(policy));
}

/// Replace the process-wide unknown-item policy, keeping the current matcher
pub fn set_unknown_item_policy(policy: UnknownItemPolicy) {
    let mut global = GLOBAL_DECODER.write();
    let decoder = global.take().unwrap_or_default();
    *global = Some(decoder.with_policy(policy));
}

/// Restore the built-in decoder
pub fn reset_content_decoder() {
    *GLOBAL_DECODER.write() = None;
}

/// Snapshot of the process-wide decoder
pub(crate) fn current_decoder() -> ContentDecoder {
    GLOBAL_DECODER.read().clone().unwrap_or_default()
}
