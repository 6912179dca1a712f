//! Template registry: loads and caches question templates from YAML files.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::TemplateError;

use super::schema::QuestionTemplate;

/// In-memory registry of question templates, keyed by template ID.
///
/// Loaded once at startup and shared read-only across workers.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, QuestionTemplate>,
    loaded_paths: HashMap<String, PathBuf>,
}

impl TemplateRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
            loaded_paths: HashMap::new(),
        }
    }

    /// Loads a single template from a YAML file.
    ///
    /// The template is validated after parsing; invalid templates are not
    /// added to the registry.
    pub fn load_file<P: AsRef<Path>>(
        &mut self,
        path: P,
    ) -> Result<&QuestionTemplate, TemplateError> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(TemplateError::Io)?;

        let template: QuestionTemplate =
            serde_yaml::from_str(&content).map_err(|e| TemplateError::ParseError {
                path: path_str.clone(),
                message: e.to_string(),
            })?;

        template.validate()?;

        if self.templates.contains_key(&template.id) {
            return Err(TemplateError::DuplicateTemplateId(template.id.clone()));
        }

        let id = template.id.clone();
        self.templates.insert(id.clone(), template);
        self.loaded_paths.insert(id.clone(), path.to_path_buf());

        Ok(self
            .templates
            .get(&id)
            .expect("template was just inserted"))
    }

    /// Loads all `.yaml`/`.yml` templates from a directory (non-recursive).
    ///
    /// Returns the number of templates loaded.
    pub fn load_directory<P: AsRef<Path>>(&mut self, dir: P) -> Result<usize, TemplateError> {
        let mut count = 0;

        for entry in fs::read_dir(dir.as_ref()).map_err(TemplateError::Io)? {
            let path = entry.map_err(TemplateError::Io)?.path();
            if path.is_dir() {
                continue;
            }

            let is_yaml = path
                .extension()
                .map(|ext| ext == "yaml" || ext == "yml")
                .unwrap_or(false);

            if is_yaml {
                self.load_file(&path)?;
                count += 1;
            }
        }

        Ok(count)
    }

    /// Inserts a template directly, bypassing the filesystem.
    ///
    /// Used by tests and programmatic registry construction.
    pub fn insert(&mut self, template: QuestionTemplate) -> Result<(), TemplateError> {
        template.validate()?;
        if self.templates.contains_key(&template.id) {
            return Err(TemplateError::DuplicateTemplateId(template.id));
        }
        self.templates.insert(template.id.clone(), template);
        Ok(())
    }

    /// Gets a template by ID.
    pub fn get(&self, id: &str) -> Result<&QuestionTemplate, TemplateError> {
        self.templates
            .get(id)
            .ok_or_else(|| TemplateError::NotFound(id.to_string()))
    }

    /// Iterates over all templates.
    pub fn iter(&self) -> impl Iterator<Item = &QuestionTemplate> {
        self.templates.values()
    }

    /// Number of loaded templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Path the template was loaded from, if it came from a file.
    pub fn source_path(&self, id: &str) -> Option<&Path> {
        self.loaded_paths.get(id).map(PathBuf::as_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_template(dir: &Path, id: &str, topic: &str) {
        let yaml = format!(
            r#"
id: {id}
question_type: fill_blank
pattern: "Complete this {{{{ topic }}}} statement: ___"
curriculum:
  subject: mathematics
  key_stage: ks2
  year: 3
  topic: {topic}
difficulty: medium
"#
        );
        fs::write(dir.join(format!("{id}.yaml")), yaml).expect("write should work");
    }

    #[test]
    fn test_load_directory() {
        let dir = TempDir::new().expect("tempdir should work");
        write_template(dir.path(), "fb-001", "fractions");
        write_template(dir.path(), "fb-002", "decimals");
        fs::write(dir.path().join("notes.txt"), "ignored").expect("write should work");

        let mut registry = TemplateRegistry::new();
        let count = registry.load_directory(dir.path()).expect("load should work");

        assert_eq!(count, 2);
        assert_eq!(registry.len(), 2);
        assert!(registry.get("fb-001").is_ok());
        assert!(registry.source_path("fb-001").is_some());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let dir = TempDir::new().expect("tempdir should work");
        write_template(dir.path(), "fb-001", "fractions");

        let mut registry = TemplateRegistry::new();
        registry.load_directory(dir.path()).expect("load should work");
        let err = registry.load_file(dir.path().join("fb-001.yaml"));
        assert!(matches!(err, Err(TemplateError::DuplicateTemplateId(_))));
    }

    #[test]
    fn test_get_missing() {
        let registry = TemplateRegistry::new();
        assert!(matches!(
            registry.get("nope"),
            Err(TemplateError::NotFound(_))
        ));
    }
}
