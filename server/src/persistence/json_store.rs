use super::PersistenceError;
use serde::{de::DeserializeOwned, Serialize};
use std::io::Write;
use std::marker::PhantomData;
use std::path::PathBuf;

/// Trait for types that can be persisted in a JsonStore.
pub trait Storable: Serialize + DeserializeOwned {
    /// File key. Two records with the same key occupy the same file.
    fn id(&self) -> &str;
}

/// Generic JSON-file-per-record persistence store.
pub struct JsonStore<T> {
    dir: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T: Storable> JsonStore<T> {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            _phantom: PhantomData,
        }
    }

    pub fn ensure_dir(&self) -> Result<(), PersistenceError> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    pub fn file_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize(id)))
    }

    /// Save a record, replacing any previous version. Returns the id.
    pub fn save(&self, data: &T) -> Result<String, PersistenceError> {
        self.ensure_dir()?;
        let path = self.file_path(data.id());
        let json = serde_json::to_string_pretty(data)?;
        std::fs::write(&path, json)?;
        Ok(data.id().to_string())
    }

    /// Write a record only if no record with the same id exists yet.
    /// Returns `false` without touching the file otherwise.
    pub fn insert(&self, data: &T) -> Result<bool, PersistenceError> {
        self.ensure_dir()?;
        let path = self.file_path(data.id());
        let json = serde_json::to_string_pretty(data)?;
        let mut file = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        file.write_all(json.as_bytes())?;
        Ok(true)
    }

    /// Load a record by id. Returns None if not found.
    pub fn load(&self, id: &str) -> Result<Option<T>, PersistenceError> {
        let path = self.file_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        let data = serde_json::from_str(&contents)?;
        Ok(Some(data))
    }

    /// Load all records from the store directory, skipping files that fail to parse.
    pub fn load_all(&self) -> Result<Vec<T>, PersistenceError> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }
        let mut items = Vec::new();
        let entries = std::fs::read_dir(&self.dir)?;

        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                match std::fs::read_to_string(&path) {
                    Ok(contents) => match serde_json::from_str::<T>(&contents) {
                        Ok(data) => items.push(data),
                        Err(e) => tracing::warn!("Skipping unreadable record {:?}: {}", path, e),
                    },
                    Err(e) => {
                        tracing::warn!("Failed to read file {:?}: {}", path, e);
                    }
                }
            }
        }

        Ok(items)
    }

    /// Delete a record by id. Returns whether a file was removed.
    pub fn delete(&self, id: &str) -> Result<bool, PersistenceError> {
        let path = self.file_path(id);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)?;
        Ok(true)
    }
}

/// Ids come from URLs; keep them inside the store directory.
fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        body: String,
    }

    impl Storable for Note {
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn note(id: &str, body: &str) -> Note {
        Note {
            id: id.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_insert_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonStore<Note> = JsonStore::new(dir.path().join("notes"));

        assert!(store.insert(&note("a", "first")).unwrap());
        assert!(!store.insert(&note("a", "second")).unwrap());
        assert_eq!(store.load("a").unwrap(), Some(note("a", "first")));
    }

    #[test]
    fn test_load_all_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonStore<Note> = JsonStore::new(dir.path().to_path_buf());
        store.save(&note("a", "ok")).unwrap();
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();

        let all = store.load_all().unwrap();
        assert_eq!(all, vec![note("a", "ok")]);
    }

    #[test]
    fn test_path_traversal_is_neutralised() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonStore<Note> = JsonStore::new(dir.path().join("notes"));
        let path = store.file_path("../../etc/passwd");
        assert!(path.starts_with(dir.path().join("notes")));
        assert_eq!(store.load("../secret").unwrap(), None);
    }

    #[test]
    fn test_delete_reports_presence() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonStore<Note> = JsonStore::new(dir.path().to_path_buf());
        store.save(&note("a", "x")).unwrap();
        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
    }
}
