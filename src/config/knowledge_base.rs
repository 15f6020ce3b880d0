//! Declarative description of the knowledge base to deploy

use std::path::{Path, PathBuf};

use config::{Config, File, FileFormat};
use serde::Deserialize;
use validator::Validate;

use crate::domain::knowledge_base::validate_knowledge_base_name;
use crate::domain::DomainError;

pub const DEFAULT_REGION: &str = "us-east-1";

/// Knowledge base settings loaded once from YAML; immutable afterwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeBaseConfig {
    pub name: String,
    pub description: String,
    /// Absolute or config-relative directory holding the documents
    pub document_directory_path: PathBuf,
    pub region: String,
}

#[derive(Debug, Deserialize, Validate)]
struct RawKnowledgeBaseConfig {
    #[validate(length(min = 1))]
    knowledge_base_name: Option<String>,
    #[validate(length(min = 1))]
    knowledge_base_description: Option<String>,
    #[validate(length(min = 1))]
    kb_files_path: Option<String>,
    #[validate(length(min = 1))]
    region_name: Option<String>,
}

fn required(value: Option<String>, key: &str) -> Result<String, DomainError> {
    value.ok_or_else(|| DomainError::configuration(format!("Missing required key '{}'", key)))
}

impl KnowledgeBaseConfig {
    /// Load from a YAML file; `kb_files_path` is resolved against the file's directory
    pub fn load(path: &Path) -> Result<Self, DomainError> {
        if !path.is_file() {
            return Err(DomainError::configuration(format!(
                "Knowledge base configuration file not found: {}",
                path.display()
            )));
        }

        let source = Config::builder()
            .add_source(File::from(path).format(FileFormat::Yaml))
            .build()
            .map_err(|e| {
                DomainError::configuration(format!("Failed to read {}: {}", path.display(), e))
            })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_source(source, base_dir)
    }

    /// Parse YAML text directly, resolving relative paths against `base_dir`
    pub fn from_yaml_str(contents: &str, base_dir: &Path) -> Result<Self, DomainError> {
        let source = Config::builder()
            .add_source(File::from_str(contents, FileFormat::Yaml))
            .build()
            .map_err(|e| DomainError::configuration(format!("Invalid YAML: {}", e)))?;

        Self::from_source(source, base_dir)
    }

    fn from_source(source: Config, base_dir: &Path) -> Result<Self, DomainError> {
        let raw: RawKnowledgeBaseConfig = source
            .try_deserialize()
            .map_err(|e| DomainError::configuration(e.to_string()))?;

        raw.validate()
            .map_err(|e| DomainError::configuration(format!("Empty value: {}", e)))?;

        let name = required(raw.knowledge_base_name, "knowledge_base_name")?;
        let description = required(raw.knowledge_base_description, "knowledge_base_description")?;
        let files_path = required(raw.kb_files_path, "kb_files_path")?;

        validate_knowledge_base_name(&name)
            .map_err(|e| DomainError::configuration(e.to_string()))?;

        Ok(Self {
            name,
            description,
            document_directory_path: base_dir.join(files_path),
            region: raw
                .region_name
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FULL: &str = r#"
knowledge_base_name: schoolassistant
knowledge_base_description: KCA University academic information
kb_files_path: kb_files
region_name: eu-west-1
"#;

    #[test]
    fn test_parse_full_config() {
        let config = KnowledgeBaseConfig::from_yaml_str(FULL, Path::new("/srv/kb_store")).unwrap();

        assert_eq!(config.name, "schoolassistant");
        assert_eq!(config.description, "KCA University academic information");
        assert_eq!(
            config.document_directory_path,
            PathBuf::from("/srv/kb_store/kb_files")
        );
        assert_eq!(config.region, "eu-west-1");
    }

    #[test]
    fn test_region_defaults() {
        let yaml = "knowledge_base_name: kb\nknowledge_base_description: d\nkb_files_path: docs\n";
        let config = KnowledgeBaseConfig::from_yaml_str(yaml, Path::new(".")).unwrap();
        assert_eq!(config.region, "us-east-1");
    }

    #[test]
    fn test_missing_keys_are_named() {
        let cases = [
            (
                "knowledge_base_description: d\nkb_files_path: docs\n",
                "knowledge_base_name",
            ),
            (
                "knowledge_base_name: kb\nkb_files_path: docs\n",
                "knowledge_base_description",
            ),
            (
                "knowledge_base_name: kb\nknowledge_base_description: d\n",
                "kb_files_path",
            ),
        ];

        for (yaml, key) in cases {
            let err = KnowledgeBaseConfig::from_yaml_str(yaml, Path::new(".")).unwrap_err();
            assert!(matches!(err, DomainError::Configuration { .. }));
            assert!(err.to_string().contains(key), "{} should name {}", err, key);
        }
    }

    #[test]
    fn test_empty_value_is_rejected() {
        let yaml = "knowledge_base_name: ''\nknowledge_base_description: d\nkb_files_path: docs\n";
        let err = KnowledgeBaseConfig::from_yaml_str(yaml, Path::new(".")).unwrap_err();
        assert!(matches!(err, DomainError::Configuration { .. }));
    }

    #[test]
    fn test_invalid_name_is_rejected() {
        let yaml = "knowledge_base_name: 'bad name!'\nknowledge_base_description: d\nkb_files_path: docs\n";
        let err = KnowledgeBaseConfig::from_yaml_str(yaml, Path::new(".")).unwrap_err();
        assert!(matches!(err, DomainError::Configuration { .. }));
    }

    #[test]
    fn test_load_resolves_relative_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prereqs_config.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        let config = KnowledgeBaseConfig::load(&path).unwrap();
        assert_eq!(config.document_directory_path, dir.path().join("kb_files"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = KnowledgeBaseConfig::load(Path::new("/nonexistent/prereqs_config.yaml"))
            .unwrap_err();
        assert!(matches!(err, DomainError::Configuration { .. }));
        assert!(err.to_string().contains("not found"));
    }
}
