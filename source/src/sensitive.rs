//! Lexical filter for notes that must never be indexed or sent to a model.
//!
//! The filter is purely lexical: it catches denylisted words and tags, not
//! secrets phrased in any other way.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Hashtags as Memos writes them: `#tag`, `#nested/tag`.
const TAG_PATTERN: &str = r"#([^\s#]+)";

/// Denylist configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitiveConfig {
    /// Case-insensitive substrings.
    pub keywords: Vec<String>,

    /// Tag patterns, without the leading `#`. `foo` matches `#foo` and
    /// `#foo/bar`; a trailing `*` (`foo*`) matches any tag with that prefix.
    pub tags: Vec<String>,
}

impl Default for SensitiveConfig {
    fn default() -> Self {
        Self {
            keywords: ["password", "passwd", "private key", "api key", "api_key"]
                .into_iter()
                .map(String::from)
                .collect(),
            tags: ["sensitive", "secret"].into_iter().map(String::from).collect(),
        }
    }
}

impl SensitiveConfig {
    /// A configuration that flags nothing.
    pub fn empty() -> Self {
        Self {
            keywords: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keywords.push(keyword.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

#[derive(Debug, Clone)]
enum TagPattern {
    Exact(String),
    Prefix(String),
}

impl TagPattern {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().trim_start_matches('#').to_lowercase();
        if raw.is_empty() {
            return None;
        }
        match raw.strip_suffix('*') {
            Some(prefix) => Some(Self::Prefix(prefix.to_string())),
            None => Some(Self::Exact(raw)),
        }
    }

    fn matches(&self, tag: &str) -> bool {
        match self {
            Self::Exact(name) => {
                tag == name.as_str()
                    || tag
                        .strip_prefix(name.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            Self::Prefix(prefix) => tag.starts_with(prefix.as_str()),
        }
    }
}

/// Predicate deciding whether note content is sensitive.
#[derive(Debug, Clone)]
pub struct SensitiveContentFilter {
    keywords: Vec<String>,
    tags: Vec<TagPattern>,
    tag_regex: Option<Regex>,
}

impl SensitiveContentFilter {
    pub fn new(config: &SensitiveConfig) -> Self {
        Self {
            keywords: config
                .keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            tags: config
                .tags
                .iter()
                .map(String::as_str)
                .filter_map(TagPattern::parse)
                .collect(),
            tag_regex: Regex::new(TAG_PATTERN).ok(),
        }
    }

    /// A filter that flags nothing.
    pub fn permissive() -> Self {
        Self::new(&SensitiveConfig::empty())
    }

    /// Whether `content` contains a denylisted keyword or tag.
    pub fn is_sensitive(&self, content: &str) -> bool {
        if !self.keywords.is_empty() {
            let lowered = content.to_lowercase();
            if self.keywords.iter().any(|k| lowered.contains(k.as_str())) {
                return true;
            }
        }

        if self.tags.is_empty() {
            return false;
        }
        let Some(re) = &self.tag_regex else {
            return false;
        };
        re.captures_iter(content)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_lowercase())
            .any(|tag| self.tags.iter().any(|p| p.matches(&tag)))
    }
}

impl Default for SensitiveContentFilter {
    fn default() -> Self {
        Self::new(&SensitiveConfig::default())
    }
}
