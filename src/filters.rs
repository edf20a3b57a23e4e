//! # Structured Search Filters
//!
//! `SearchFilters` is the contract between the query interpreter and the
//! filter-to-query compiler. The interpreter produces it, the compiler only
//! reads it.
//!
//! Filters arrive from untrusted JSON (model output, or a document handed to
//! the CLI), so `SearchFilters::from_value` maps them leniently: field names
//! match case-insensitively, and a missing, blank or wrongly typed field is
//! treated as absent instead of failing the whole document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result limit used when none (or a non-positive one) is given
pub const DEFAULT_LIMIT: usize = 20;

/// Upper bound applied to any requested limit
pub const MAX_LIMIT: usize = 50;

/// Requested result ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Relevance,
    Title,
    Year,
}

impl SortBy {
    /// Parse a sort hint, ignoring case. Unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "relevance" => Some(SortBy::Relevance),
            "title" => Some(SortBy::Title),
            "year" => Some(SortBy::Year),
            _ => None,
        }
    }
}

/// Structured filters for a book search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    /// Free-text narrowing terms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Tag terms, matched the same way as keywords
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_year_min: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_year_max: Option<i32>,

    /// Restrict to books with at least one copy on the shelf
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_only: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,

    /// Requested number of results; see [`SearchFilters::effective_limit`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,
}

impl SearchFilters {
    /// Build filters from an arbitrary JSON object, tolerating bad fields.
    ///
    /// Returns `None` only when `value` is not a JSON object.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let fields = FieldLookup::new(object);

        Some(Self {
            keywords: fields.string_list("keywords"),
            title: fields.string("title"),
            author: fields.string("author"),
            isbn: fields.string("isbn"),
            category: fields.string("category"),
            tags: fields.string_list("tags"),
            language: fields.string("language"),
            publish_year_min: fields.integer("publishYearMin"),
            publish_year_max: fields.integer("publishYearMax"),
            available_only: fields.boolean("availableOnly"),
            sort_by: fields.string("sortBy").as_deref().and_then(SortBy::parse),
            limit: fields.integer("limit"),
        })
    }

    /// Keywords followed by tags, with blank entries dropped
    pub fn terms(&self) -> Vec<String> {
        self.keywords
            .iter()
            .chain(self.tags.iter())
            .flatten()
            .map(|term| term.trim())
            .filter(|term| !term.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// The number of rows a search should return: a positive `limit` capped
    /// at [`MAX_LIMIT`], otherwise [`DEFAULT_LIMIT`].
    pub fn effective_limit(&self) -> usize {
        match self.limit {
            Some(limit) if limit > 0 => (limit as usize).min(MAX_LIMIT),
            _ => DEFAULT_LIMIT,
        }
    }

    /// Whether no filter field is set at all
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Case-insensitive view over a JSON object's fields
struct FieldLookup<'a> {
    fields: Vec<(String, &'a Value)>,
}

impl<'a> FieldLookup<'a> {
    fn new(object: &'a Map<String, Value>) -> Self {
        Self {
            fields: object
                .iter()
                .map(|(key, value)| (key.to_lowercase(), value))
                .collect(),
        }
    }

    fn get(&self, name: &str) -> Option<&'a Value> {
        let name = name.to_lowercase();
        self.fields
            .iter()
            .find(|(key, value)| *key == name && !value.is_null())
            .map(|(_, value)| *value)
    }

    fn string(&self, name: &str) -> Option<String> {
        let value = self.get(name)?.as_str()?.trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    fn string_list(&self, name: &str) -> Option<Vec<String>> {
        let items: Vec<String> = match self.get(name)? {
            Value::Array(values) => values
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
            _ => return None,
        };
        (!items.is_empty()).then_some(items)
    }

    fn integer(&self, name: &str) -> Option<i32> {
        match self.get(name)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .and_then(|n| i32::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn boolean(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_full_document() {
        let value = json!({
            "keywords": ["french", "provençal"],
            "title": null,
            "author": "Julia Child",
            "category": "Cooking",
            "tags": [],
            "language": "English",
            "publishYearMin": 1960,
            "publishYearMax": 1975,
            "availableOnly": true,
            "sortBy": "year",
            "limit": 10,
            "explanation": "ignored here"
        });

        let filters = SearchFilters::from_value(&value).unwrap();
        assert_eq!(
            filters.keywords,
            Some(vec!["french".to_string(), "provençal".to_string()])
        );
        assert_eq!(filters.title, None);
        assert_eq!(filters.author.as_deref(), Some("Julia Child"));
        assert_eq!(filters.category.as_deref(), Some("Cooking"));
        assert_eq!(filters.tags, None);
        assert_eq!(filters.language.as_deref(), Some("English"));
        assert_eq!(filters.publish_year_min, Some(1960));
        assert_eq!(filters.publish_year_max, Some(1975));
        assert_eq!(filters.available_only, Some(true));
        assert_eq!(filters.sort_by, Some(SortBy::Year));
        assert_eq!(filters.limit, Some(10));
    }

    #[test]
    fn test_from_value_case_insensitive_keys() {
        let value = json!({"Author": "Tolkien", "PUBLISHYEARMIN": 1937, "SortBy": "Title"});
        let filters = SearchFilters::from_value(&value).unwrap();

        assert_eq!(filters.author.as_deref(), Some("Tolkien"));
        assert_eq!(filters.publish_year_min, Some(1937));
        assert_eq!(filters.sort_by, Some(SortBy::Title));
    }

    #[test]
    fn test_from_value_bad_fields_are_absent() {
        let value = json!({
            "keywords": "dragons",
            "title": 42,
            "author": "   ",
            "publishYearMin": "nineteen",
            "publishYearMax": "2001",
            "availableOnly": "yes",
            "sortBy": "popularity",
            "limit": "many"
        });
        let filters = SearchFilters::from_value(&value).unwrap();

        assert_eq!(filters.keywords, Some(vec!["dragons".to_string()]));
        assert_eq!(filters.title, None);
        assert_eq!(filters.author, None);
        assert_eq!(filters.publish_year_min, None);
        assert_eq!(filters.publish_year_max, Some(2001));
        assert_eq!(filters.available_only, None);
        assert_eq!(filters.sort_by, None);
        assert_eq!(filters.limit, None);
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(SearchFilters::from_value(&json!(["a", "b"])).is_none());
        assert!(SearchFilters::from_value(&json!("text")).is_none());
    }

    #[test]
    fn test_terms_merge_keywords_then_tags() {
        let filters = SearchFilters {
            keywords: Some(vec!["fantasy".to_string(), " ".to_string()]),
            tags: Some(vec!["dragon".to_string()]),
            ..Default::default()
        };
        assert_eq!(filters.terms(), vec!["fantasy", "dragon"]);
    }

    #[test]
    fn test_effective_limit_defaults_and_cap() {
        let with_limit = |limit| SearchFilters {
            limit,
            ..Default::default()
        };

        assert_eq!(with_limit(None).effective_limit(), DEFAULT_LIMIT);
        assert_eq!(with_limit(Some(0)).effective_limit(), DEFAULT_LIMIT);
        assert_eq!(with_limit(Some(-5)).effective_limit(), DEFAULT_LIMIT);
        assert_eq!(with_limit(Some(7)).effective_limit(), 7);
        assert_eq!(with_limit(Some(500)).effective_limit(), MAX_LIMIT);
    }

    #[test]
    fn test_serializes_camel_case_and_skips_absent() {
        let filters = SearchFilters {
            publish_year_min: Some(2000),
            available_only: Some(true),
            ..Default::default()
        };
        let json = serde_json::to_value(&filters).unwrap();
        assert_eq!(json, json!({"publishYearMin": 2000, "availableOnly": true}));
    }
}
