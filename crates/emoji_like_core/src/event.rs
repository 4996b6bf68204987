/// One element of a chat message.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    /// Mention of another participant (user id, or "all").
    At(String),
    /// Quote of an earlier message, carrying its message id.
    Reply(String),
    Face(String),
    Image,
    /// Any segment type this crate does not look at.
    Other(String),
}

/// An inbound chat message as seen by the reaction logic.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    pub message_id: String,
    pub sender_id: String,
    /// `None` for private chats.
    pub group_id: Option<i64>,
    pub segments: Vec<Segment>,
}

impl MessageEvent {
    pub fn is_group(&self) -> bool {
        self.group_id.is_some()
    }

    /// Whether the first content element is an @mention.
    pub fn starts_with_at(&self) -> bool {
        matches!(self.segments.first(), Some(Segment::At(_)))
    }

    /// Id of the quoted message, if the message is a reply.
    pub fn reply_target(&self) -> Option<&str> {
        self.segments.iter().find_map(|seg| match seg {
            Segment::Reply(id) => Some(id.trim()),
            _ => None,
        })
    }

    /// Concatenated text segments, trimmed.
    pub fn plain_text(&self) -> String {
        let text: String = self
            .segments
            .iter()
            .filter_map(|seg| match seg {
                Segment::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        text.trim().to_string()
    }
}
