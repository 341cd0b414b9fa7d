//! Knowledge Base Loader
//!
//! Loads knowledge documents from YAML/JSON files into the in-memory index.
//!
//! File format:
//!
//! ```yaml
//! version: "1.0"
//! documents:
//!   - id: orion_001
//!     title: Orion
//!     source: docs/orion.md
//!     text: Orion is the request router ...
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use neo_core::MatchMetadata;

use crate::memory_index::InMemoryVectorIndex;
use crate::RagError;

/// Knowledge document format for YAML/JSON files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    pub id: String,
    pub title: String,
    /// Chunk text (embedded and shown to the model)
    #[serde(alias = "content")]
    pub text: String,
    /// Where the text came from, shown in source attributions
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl KnowledgeDocument {
    fn into_metadata(self) -> (String, MatchMetadata) {
        let mut metadata = MatchMetadata::new(self.text).with_title(self.title);
        metadata.source = self.source;
        if let Some(category) = self.category {
            metadata
                .extra
                .insert("category".to_string(), serde_json::Value::String(category));
        }
        (self.id, metadata)
    }
}

/// Knowledge base file format
#[derive(Debug, Serialize, Deserialize)]
pub struct KnowledgeFile {
    #[serde(default)]
    pub version: Option<String>,
    pub documents: Vec<KnowledgeDocument>,
}

/// Knowledge loader for populating the in-memory index
pub struct KnowledgeLoader;

impl KnowledgeLoader {
    /// Load every YAML/JSON file in a directory, in file-name order
    ///
    /// Files that fail to parse are logged and skipped. A missing directory
    /// loads nothing.
    pub fn load_directory(
        knowledge_dir: &Path,
        index: &InMemoryVectorIndex,
    ) -> Result<usize, RagError> {
        if !knowledge_dir.exists() {
            tracing::warn!(
                path = %knowledge_dir.display(),
                "Knowledge directory does not exist"
            );
            return Ok(0);
        }

        let entries = std::fs::read_dir(knowledge_dir)
            .map_err(|e| RagError::Index(format!("Failed to read directory: {}", e)))?;

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| RagError::Index(format!("Failed to read entry: {}", e)))?;
            let path = entry.path();
            let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if matches!(extension, "yaml" | "yml" | "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut total_count = 0;
        for path in paths {
            match Self::load_file(&path) {
                Ok(documents) => {
                    let count = documents.len();
                    for doc in documents {
                        let (id, metadata) = doc.into_metadata();
                        index.upsert(id, metadata);
                    }
                    tracing::info!(file = %path.display(), documents = count, "Loaded knowledge file");
                    total_count += count;
                }
                Err(e) => {
                    tracing::error!(
                        file = %path.display(),
                        error = %e,
                        "Failed to load knowledge file"
                    );
                }
            }
        }

        tracing::info!(
            directory = %knowledge_dir.display(),
            total_documents = total_count,
            "Knowledge base loading complete"
        );

        Ok(total_count)
    }

    /// Parse a single knowledge file
    pub fn load_file(path: &Path) -> Result<Vec<KnowledgeDocument>, RagError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RagError::Index(format!("Failed to read file: {}", e)))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let knowledge: KnowledgeFile = match extension {
            "json" => serde_json::from_str(&content)
                .map_err(|e| RagError::Index(format!("JSON parse error: {}", e)))?,
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .map_err(|e| RagError::Index(format!("YAML parse error: {}", e)))?,
            _ => {
                return Err(RagError::Index(format!(
                    "Unsupported file type: {}",
                    extension
                )))
            }
        };

        Ok(knowledge.documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashEmbedder;
    use neo_core::VectorSearch;
    use tempfile::tempdir;

    const YAML: &str = r#"
version: "1.0"
documents:
  - id: orion_001
    title: Orion
    source: docs/orion.md
    text: Orion is the request router of Cogneoverse.
  - id: spline_001
    title: Spline
    content: Spline renders scenes.
    category: product
"#;

    #[test]
    fn test_parse_yaml_with_content_alias() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kb.yaml");
        std::fs::write(&path, YAML).unwrap();

        let docs = KnowledgeLoader::load_file(&path).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].text, "Spline renders scenes.");
        assert!(docs[1].source.is_none());
    }

    #[tokio::test]
    async fn test_load_directory_populates_index() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.yaml"), YAML).unwrap();
        std::fs::write(
            dir.path().join("b.json"),
            r#"{"documents":[{"id":"neo_001","title":"Neo","text":"Neo is the assistant."}]}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.yaml"), "documents: [").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let index = InMemoryVectorIndex::new(HashEmbedder::new(128));
        let count = KnowledgeLoader::load_directory(dir.path(), &index).unwrap();
        assert_eq!(count, 3);
        assert_eq!(index.len(), 3);

        let results = index.search("orion request router", 1).await.unwrap();
        assert_eq!(results[0].id, "orion_001");
        assert_eq!(results[0].metadata.title.as_deref(), Some("Orion"));
        assert_eq!(results[0].metadata.source.as_deref(), Some("docs/orion.md"));
    }

    #[test]
    fn test_missing_directory_loads_nothing() {
        let index = InMemoryVectorIndex::new(HashEmbedder::new(16));
        let count = KnowledgeLoader::load_directory(Path::new("/nonexistent/kb"), &index).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kb.toml");
        std::fs::write(&path, "x = 1").unwrap();
        assert!(KnowledgeLoader::load_file(&path).is_err());
    }
}
