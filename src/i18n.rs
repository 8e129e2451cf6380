// Translation lookup used for every user-visible string of the booking section

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub trait Translate: Send + Sync {
    fn translate(&self, key: &str) -> String;
}

impl<F> Translate for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn translate(&self, key: &str) -> String {
        self(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    De,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::De => "de",
        }
    }

    // Accepts browser-style tags such as `de-CH`
    pub fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag.split(['-', '_']).next()?.to_ascii_lowercase();
        match primary.as_str() {
            "en" => Some(Language::En),
            "de" => Some(Language::De),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("JSON parse error: {0}")]
    JsonParseError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub en: String,
    #[serde(default)]
    pub de: Option<String>,
}

/// Key to per-language text, e.g. `{ "booking.title": { "en": "...", "de": "..." } }`.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<String, Entry>,
    language: Language,
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let entries: HashMap<String, Entry> = serde_json::from_str(json)?;
        Ok(Self {
            entries,
            language: Language::default(),
        })
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, key: &str) -> Option<&str> {
        let entry = self.entries.get(key)?;
        match self.language {
            Language::De => entry.de.as_deref().or(Some(entry.en.as_str())),
            Language::En => Some(entry.en.as_str()),
        }
    }
}

// Unknown keys render as the key itself so a missing translation never blanks the UI
impl Translate for Catalog {
    fn translate(&self, key: &str) -> String {
        self.lookup(key).unwrap_or(key).to_string()
    }
}
