use serde::{Deserialize, Serialize};

/// Category type used for subject classifications.
pub const SUBJECT_CATEGORY: &str = "subject";

/// Author reference attached to a book record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRef {
    pub name: String,
    pub surname: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
}

impl AuthorRef {
    pub fn new(name: impl Into<String>, surname: impl Into<String>) -> Self {
        let name = name.into();
        let surname = surname.into();
        let full_name = if surname.is_empty() {
            name.clone()
        } else {
            format!("{name} {surname}")
        };
        Self {
            name,
            surname,
            full_name,
            nationality: None,
        }
    }

    /// Splits a display name on its first whitespace: `"Mary Wollstonecraft Shelley"`
    /// becomes name `"Mary"`, surname `"Wollstonecraft Shelley"`.
    pub fn from_full_name(full_name: &str) -> Self {
        let trimmed = full_name.trim();
        match trimmed.split_once(char::is_whitespace) {
            Some((name, surname)) => Self::new(name, surname.trim()),
            None => Self::new(trimmed, ""),
        }
    }

    pub fn unknown() -> Self {
        Self::new("Unknown", "Author")
    }

    pub fn with_nationality(mut self, nationality: impl Into<String>) -> Self {
        self.nationality = Some(nationality.into());
        self
    }
}

/// Category reference attached to a book record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl CategoryRef {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }

    pub fn subject(name: impl Into<String>) -> Self {
        Self::new(name, SUBJECT_CATEGORY)
    }

    pub fn unknown() -> Self {
        Self::subject("Unknown")
    }
}

/// Physical dimensions as reported upstream, e.g. `"21.00 cm"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thickness: Option<String>,
}

/// Resolved book metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub isbn_code: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub authors: Vec<AuthorRef>,
    #[serde(default)]
    pub categories: Vec<CategoryRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition_date: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub publishers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cover_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
}

impl BookRecord {
    /// Creates a record with only the identifying fields populated.
    pub fn new(isbn_code: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            isbn_code: isbn_code.into(),
            title: title.into(),
            subtitle: None,
            authors: Vec::new(),
            categories: Vec::new(),
            edition_number: None,
            edition_date: None,
            publishers: Vec::new(),
            pages: None,
            language: None,
            description: None,
            cover_urls: Vec::new(),
            physical_format: None,
            weight: None,
            dimensions: None,
        }
    }

    pub fn with_author(mut self, author: AuthorRef) -> Self {
        self.authors.push(author);
        self
    }

    pub fn with_category(mut self, category: CategoryRef) -> Self {
        self.categories.push(category);
        self
    }
}
