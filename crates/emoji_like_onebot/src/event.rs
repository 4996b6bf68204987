use emoji_like_core::{EmojiId, Segment};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "post_type")]
pub enum OneBotEvent {
    #[serde(rename = "message")]
    Message(MessageEvent),
    #[serde(rename = "message_sent")]
    MessageSent(Value),
    #[serde(rename = "meta_event")]
    Meta(MetaEvent),
    #[serde(rename = "notice")]
    Notice(Value),
    #[serde(rename = "request")]
    Request(Value),
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageEvent {
    pub message_type: String, // "private" or "group"
    pub message_id: i64,
    pub user_id: i64,
    pub group_id: Option<i64>,
    pub message: MessageBody,
}

/// Implementations post either a segment array or a CQ-coded string,
/// depending on their `message_post_format` setting.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageBody {
    Segments(Vec<RawSegment>),
    CqString(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSegment {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "meta_event_type")]
pub enum MetaEvent {
    #[serde(rename = "heartbeat")]
    Heartbeat,
    #[serde(rename = "lifecycle")]
    Lifecycle,
}

/// Reply to an action frame.
#[derive(Debug, Clone, Deserialize)]
pub struct OneBotResponse {
    pub status: String,
    pub retcode: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub wording: String,
}

impl OneBotResponse {
    /// `async` replies (retcode 1) are accepted as well.
    pub fn is_ok(&self) -> bool {
        matches!(self.status.as_str(), "ok" | "async")
    }
}

impl MessageEvent {
    /// Convert to the platform-neutral event the reaction logic works on.
    pub fn into_core(self) -> emoji_like_core::MessageEvent {
        let segments = match self.message {
            MessageBody::Segments(raw) => raw.into_iter().map(RawSegment::into_core).collect(),
            MessageBody::CqString(s) => parse_cq(&s),
        };
        emoji_like_core::MessageEvent {
            message_id: self.message_id.to_string(),
            sender_id: self.user_id.to_string(),
            group_id: if self.message_type == "group" {
                self.group_id
            } else {
                None
            },
            segments,
        }
    }
}

impl RawSegment {
    fn into_core(self) -> Segment {
        let field = |name: &str| scalar_to_string(&self.data[name]);
        match self.kind.as_str() {
            "text" => Segment::Text(field("text")),
            "at" => Segment::At(field("qq")),
            "reply" => Segment::Reply(field("id")),
            "face" => Segment::Face(field("id")),
            "image" => Segment::Image,
            _ => Segment::Other(self.kind),
        }
    }
}

fn scalar_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Split a CQ-coded string such as `[CQ:reply,id=1][CQ:at,qq=2] hi` into segments.
pub fn parse_cq(s: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = s;
    while let Some(start) = rest.find("[CQ:") {
        if start > 0 {
            segments.push(Segment::Text(unescape_cq(&rest[..start])));
        }
        let Some(len) = rest[start..].find(']') else {
            break;
        };
        let code = &rest[start + 4..start + len];
        segments.push(cq_segment(code));
        rest = &rest[start + len + 1..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Text(unescape_cq(rest)));
    }
    segments
}

fn cq_segment(code: &str) -> Segment {
    let kind = code.split(',').next().unwrap_or_default();
    let param = |name: &str| {
        code.split(',')
            .skip(1)
            .filter_map(|kv| kv.split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| unescape_cq(v))
            .unwrap_or_default()
    };
    match kind {
        "at" => Segment::At(param("qq")),
        "reply" => Segment::Reply(param("id")),
        "face" => Segment::Face(param("id")),
        "image" => Segment::Image,
        other => Segment::Other(other.to_string()),
    }
}

fn unescape_cq(s: &str) -> String {
    s.replace("&#91;", "[")
        .replace("&#93;", "]")
        .replace("&#44;", ",")
        .replace("&amp;", "&")
}

// ============================================================================
// Outbound actions
// ============================================================================

#[derive(Debug, Serialize)]
pub struct Action {
    pub action: &'static str,
    pub params: Value,
}

impl Action {
    /// NapCat / LLOneBot extension for QQ message reactions.
    pub fn set_msg_emoji_like(message_id: &str, emoji: EmojiId, set: bool) -> Self {
        let message_id = match message_id.parse::<i64>() {
            Ok(n) => json!(n),
            Err(_) => json!(message_id),
        };
        Self {
            action: "set_msg_emoji_like",
            params: json!({
                "message_id": message_id,
                "emoji_id": emoji,
                "set": set,
            }),
        }
    }

    pub fn send_group_msg(group_id: i64, text: &str) -> Self {
        Self {
            action: "send_group_msg",
            params: json!({
                "group_id": group_id,
                "message": text,
                "auto_escape": true,
            }),
        }
    }

    pub fn send_private_msg(user_id: i64, text: &str) -> Self {
        Self {
            action: "send_private_msg",
            params: json!({
                "user_id": user_id,
                "message": text,
                "auto_escape": true,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emoji_like_core::catalog::MONKEY;

    #[test]
    fn test_parse_group_message_with_segments() {
        let raw = r#"{
            "post_type": "message",
            "message_type": "group",
            "sub_type": "normal",
            "message_id": 1928374,
            "user_id": 12345,
            "group_id": 67890,
            "self_id": 1,
            "time": 1700000000,
            "raw_message": "[CQ:reply,id=111]/fill 5",
            "font": 14,
            "sender": {"user_id": 12345, "nickname": "阿猴", "role": "member"},
            "message": [
                {"type": "reply", "data": {"id": "111"}},
                {"type": "at", "data": {"qq": 1}},
                {"type": "text", "data": {"text": " /fill 5"}}
            ]
        }"#;
        let OneBotEvent::Message(msg) = serde_json::from_str::<OneBotEvent>(raw).unwrap() else {
            panic!("Expected message event");
        };
        let event = msg.into_core();
        assert_eq!(event.message_id, "1928374");
        assert_eq!(event.sender_id, "12345");
        assert_eq!(event.group_id, Some(67890));
        assert_eq!(event.reply_target(), Some("111"));
        assert_eq!(event.segments[1], Segment::At("1".into()));
        assert_eq!(event.plain_text(), "/fill 5");
    }

    #[test]
    fn test_parse_private_message_with_cq_string() {
        let raw = r#"{
            "post_type": "message",
            "message_type": "private",
            "message_id": 5,
            "user_id": 42,
            "time": 1700000000,
            "message": "[CQ:at,qq=7] 你好&#91;笑&#93;"
        }"#;
        let OneBotEvent::Message(msg) = serde_json::from_str::<OneBotEvent>(raw).unwrap() else {
            panic!("Expected message event");
        };
        let event = msg.into_core();
        assert!(event.group_id.is_none());
        assert!(event.starts_with_at());
        assert_eq!(event.plain_text(), "你好[笑]");
    }

    #[test]
    fn test_parse_heartbeat() {
        let raw = r#"{"post_type": "meta_event", "meta_event_type": "heartbeat",
                      "time": 1, "status": {"online": true}, "interval": 5000}"#;
        assert!(matches!(
            serde_json::from_str::<OneBotEvent>(raw).unwrap(),
            OneBotEvent::Meta(MetaEvent::Heartbeat)
        ));
    }

    #[test]
    fn test_parse_cq_reply_and_text() {
        let segments = parse_cq("[CQ:reply,id=-99][CQ:face,id=66]/boom 3");
        assert_eq!(
            segments,
            vec![
                Segment::Reply("-99".into()),
                Segment::Face("66".into()),
                Segment::Text("/boom 3".into()),
            ]
        );
    }

    #[test]
    fn test_emoji_like_action_payload() {
        let action = Action::set_msg_emoji_like("1928374", MONKEY, true);
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["action"], "set_msg_emoji_like");
        assert_eq!(value["params"]["message_id"], 1928374);
        assert_eq!(value["params"]["emoji_id"], "128053");
        assert_eq!(value["params"]["set"], true);

        let face = Action::set_msg_emoji_like("abc", EmojiId::Face(66), false);
        let value = serde_json::to_value(&face).unwrap();
        assert_eq!(value["params"]["message_id"], "abc");
        assert_eq!(value["params"]["emoji_id"], 66);
    }

    #[test]
    fn test_response_status() {
        let resp: OneBotResponse =
            serde_json::from_str(r#"{"status":"failed","retcode":1200,"message":"bad id"}"#).unwrap();
        assert!(!resp.is_ok());

        let resp: OneBotResponse =
            serde_json::from_str(r#"{"status":"async","retcode":1,"data":null,"echo":"x"}"#).unwrap();
        assert!(resp.is_ok());
    }
}
