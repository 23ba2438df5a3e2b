use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

impl Tag {
    pub fn new(slug: &str) -> Self {
        Self {
            slug: slug.to_string(),
            name: slug.to_string(),
            url: String::new(),
        }
    }
}
