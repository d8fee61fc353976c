//! Process-wide content decoder. Kept in its own test binary since it
//! mutates global state.

use chatwire::api::{
    decode_item, reset_content_decoder, set_content_item_matcher, set_unknown_item_policy,
    ChatChoice, DefaultMatcher, ImageContent, ItemDecoder, UnknownItemPolicy,
};
use chatwire::{ContentItem, ContentItemMatcher};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct BareImage {
    image: String,
}

impl ContentItem for BareImage {
    fn kind(&self) -> &str {
        "image"
    }

    fn text(&self) -> String {
        self.image.clone()
    }

    fn as_image(&self) -> Option<ImageContent> {
        Some(ImageContent::new(self.image.clone()))
    }

    fn to_json(&self) -> Value {
        json!({ "image": self.image })
    }
}

struct BareImageMatcher;

impl ContentItemMatcher for BareImageMatcher {
    fn resolve(&self, keyword: &str) -> Option<ItemDecoder> {
        if let Some(decoder) = DefaultMatcher.resolve(keyword) {
            return Some(decoder);
        }
        match keyword {
            "image" => Some(decode_item::<BareImage> as ItemDecoder),
            _ => None,
        }
    }
}

fn choice_json() -> Value {
    json!({
        "index": 0,
        "message": {
            "role": "user",
            "content": [
                {"type": "text", "text": "What's in this image?"},
                {"type": "image_url", "image_url": {"url": "https://example.com/boardwalk.jpg", "detail": "high"}},
                {"image": "https://example.com/dog_and_girl.jpeg"},
                {"text": "Where is this?"}
            ],
            "name": "test",
            "refusal": "no"
        },
        "finish_reason": "stop"
    })
}

#[test]
fn global_matcher_controls_serde_decoding() {
    // built-in matcher drops the bare image element
    let choice: ChatChoice = serde_json::from_value(choice_json()).unwrap();
    assert_eq!(choice.message.content.as_items().unwrap().len(), 3);

    set_content_item_matcher(BareImageMatcher);
    let choice: ChatChoice = serde_json::from_value(choice_json()).unwrap();
    let items = choice.message.content.as_items().unwrap();
    assert_eq!(items.len(), 4);
    assert_eq!(
        items[2].as_image().unwrap().image_url.url,
        "https://example.com/dog_and_girl.jpeg"
    );

    let encoded = serde_json::to_value(&choice).unwrap();
    assert_eq!(
        encoded["message"]["content"][2],
        json!({"image": "https://example.com/dog_and_girl.jpeg"})
    );
    assert_eq!(encoded["message"]["content"][3]["type"], "text");

    // the policy can be tightened without losing the matcher
    set_unknown_item_policy(UnknownItemPolicy::Reject);
    let mut unknown = choice_json();
    unknown["message"]["content"][0] = json!({"type": "input_audio", "input_audio": {}});
    assert!(serde_json::from_value::<ChatChoice>(unknown).is_err());
    assert!(serde_json::from_value::<ChatChoice>(choice_json()).is_ok());

    reset_content_decoder();
    let choice: ChatChoice = serde_json::from_value(choice_json()).unwrap();
    assert_eq!(choice.message.content.as_items().unwrap().len(), 3);
}
