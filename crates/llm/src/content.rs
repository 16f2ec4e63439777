/// Author of a transcript entry as understood by the remote model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

/// One piece of a turn payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    /// Base64-encoded bytes sent inline with the request.
    InlineImage { mime_type: String, data: String },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn inline_image(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::InlineImage {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            Self::InlineImage { .. } => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::InlineImage { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self { role, parts }
    }

    pub fn user(parts: Vec<Part>) -> Self {
        Self::new(Role::User, parts)
    }

    pub fn model(parts: Vec<Part>) -> Self {
        Self::new(Role::Model, parts)
    }

    /// Concatenated text parts, images skipped.
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::as_text).collect()
    }

    pub fn image_count(&self) -> usize {
        self.parts.iter().filter(|part| part.is_image()).count()
    }
}

/// Incremental fragment of a streamed model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamDelta {
    Text(String),
    Reasoning(String),
}

impl StreamDelta {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            Self::Reasoning(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_text_skips_image_parts() {
        let content = Content::user(vec![
            Part::text("ជំរាបសួរ "),
            Part::inline_image("image/png", "iVBORw0KGgo="),
            Part::text("hello"),
        ]);

        assert_eq!(content.text(), "ជំរាបសួរ hello");
        assert_eq!(content.image_count(), 1);
        assert_eq!(content.role.as_str(), "user");
    }

    #[test]
    fn reasoning_delta_carries_no_text() {
        assert_eq!(StreamDelta::Text("hi".into()).as_text(), Some("hi"));
        assert_eq!(StreamDelta::Reasoning("thinking".into()).as_text(), None);
    }
}
