use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Text,
    Image,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Text, Mode::Image];

    pub fn id(&self) -> u8 {
        match self {
            Self::Text => 1,
            Self::Image => 2,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.id() == id)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "Text request",
            Self::Image => "Image request",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    text: Vec<String>,
    image: Vec<String>,
}

impl ModelCatalog {
    pub fn new(text: Vec<String>, image: Vec<String>) -> Self {
        Self { text, image }
    }

    pub fn models(&self, mode: Mode) -> &[String] {
        match mode {
            Mode::Text => &self.text,
            Mode::Image => &self.image,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}
