use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{EngineError, EngineResult};

/// One movie in the catalog
///
/// `row_index` is the position of the entry in the catalog and the row of its
/// vector in the matrix. Titles are not unique.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogEntry {
    pub row_index: usize,
    pub title: String,
    pub tags: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movie_id: Option<String>,
}

/// A row as it appears in the catalog CSV
#[derive(Debug, Deserialize)]
struct CatalogRow {
    title: String,
    #[serde(default)]
    tags: Option<String>,
    #[serde(default)]
    movie_id: Option<String>,
}

/// Ordered, immutable movie catalog with case-insensitive title lookup
///
/// When several rows share a title (ignoring case), lookups resolve to the
/// row with the lowest `row_index`.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    first_row_by_title: HashMap<String, usize>,
}

impl Catalog {
    /// Builds a catalog from `(title, tags)` pairs, in order
    pub fn from_rows<I, T, G>(rows: I) -> Self
    where
        I: IntoIterator<Item = (T, G)>,
        T: Into<String>,
        G: Into<String>,
    {
        let entries = rows
            .into_iter()
            .enumerate()
            .map(|(row_index, (title, tags))| CatalogEntry {
                row_index,
                title: title.into(),
                tags: tags.into(),
                movie_id: None,
            })
            .collect();
        Self::from_entries(entries)
    }

    fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        let mut first_row_by_title = HashMap::with_capacity(entries.len());
        for entry in &entries {
            first_row_by_title
                .entry(lookup_key(&entry.title))
                .or_insert(entry.row_index);
        }
        Self {
            entries,
            first_row_by_title,
        }
    }

    /// Loads a catalog from a CSV file with `title` and `tags` columns
    pub fn load_csv(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)?;

        let headers = reader.headers()?.clone();
        for required in ["title", "tags"] {
            if !headers.iter().any(|h| h == required) {
                return Err(EngineError::InvalidCatalog(format!(
                    "{} is missing the '{}' column",
                    path.display(),
                    required
                )));
            }
        }

        let mut entries = Vec::new();
        for (row_index, record) in reader.deserialize::<CatalogRow>().enumerate() {
            let row = record?;
            entries.push(CatalogEntry {
                row_index,
                title: row.title,
                tags: row.tags.unwrap_or_default(),
                movie_id: row.movie_id.filter(|id| !id.is_empty()),
            });
        }

        tracing::info!(
            path = %path.display(),
            rows = entries.len(),
            "Loaded movie catalog"
        );

        Ok(Self::from_entries(entries))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn get(&self, row_index: usize) -> Option<&CatalogEntry> {
        self.entries.get(row_index)
    }

    /// Case-insensitive exact title lookup, first matching row wins
    pub fn find(&self, title: &str) -> Option<&CatalogEntry> {
        self.first_row_by_title
            .get(&lookup_key(title))
            .and_then(|&row| self.entries.get(row))
    }

    /// CRC32 over every `(title, tags)` pair in row order
    ///
    /// Any reordering or edit of the catalog changes the fingerprint, which is
    /// how a stale artifact bundle is detected.
    pub fn fingerprint(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        for entry in &self.entries {
            hasher.update(entry.title.as_bytes());
            hasher.update(&[0x1f]);
            hasher.update(entry.tags.as_bytes());
            hasher.update(&[0x1e]);
        }
        hasher.finalize()
    }
}

/// Key used for case-insensitive title matching
pub fn lookup_key(title: &str) -> String {
    title.to_lowercase()
}

/// Lowercased alphanumeric skeleton of a title
///
/// "Spider-Man: Homecoming" and "spider man homecoming" share a skeleton.
pub fn normalized_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_find_is_case_insensitive() {
        let catalog = Catalog::from_rows([("Inception", "dream heist"), ("Heat", "crime")]);
        let entry = catalog.find("iNcEpTiOn").unwrap();
        assert_eq!(entry.row_index, 0);
        assert_eq!(entry.title, "Inception");
        assert!(catalog.find("Inceptio").is_none());
    }

    #[test]
    fn test_duplicate_titles_resolve_to_first_row() {
        let catalog = Catalog::from_rows([
            ("Heat", "crime thriller"),
            ("Other", "drama"),
            ("HEAT", "remake"),
        ]);
        assert_eq!(catalog.find("heat").unwrap().row_index, 0);
        assert_eq!(catalog.get(2).unwrap().title, "HEAT");
    }

    #[test]
    fn test_fingerprint_detects_reordering() {
        let a = Catalog::from_rows([("a", "x"), ("b", "y")]);
        let b = Catalog::from_rows([("b", "y"), ("a", "x")]);
        let c = Catalog::from_rows([("a", "x"), ("b", "y")]);
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_normalized_title() {
        assert_eq!(normalized_title("Spider-Man: Homecoming"), "spidermanhomecoming");
        assert_eq!(normalized_title("spider man homecoming"), "spidermanhomecoming");
    }

    #[test]
    fn test_load_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "movie_id,title,tags").unwrap();
        writeln!(file, "19995,Avatar,\"space marine alien\"").unwrap();
        writeln!(file, "285,Pirates of the Caribbean,").unwrap();
        file.flush().unwrap();

        let catalog = Catalog::load_csv(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(0).unwrap().movie_id.as_deref(), Some("19995"));
        assert_eq!(catalog.get(0).unwrap().tags, "space marine alien");
        assert_eq!(catalog.get(1).unwrap().tags, "");
    }

    #[test]
    fn test_load_csv_requires_tags_column() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "title,overview").unwrap();
        writeln!(file, "Avatar,blue people").unwrap();
        file.flush().unwrap();

        let err = Catalog::load_csv(file.path()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidCatalog(_)));
    }
}
