use crate::document::{Document, DocumentSource};
use crate::links::LinkState;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Read a document file: `{"containers": [{"id": .., "markup": ..}, ..]}`.
pub fn read_document(path: &Path) -> Result<Document, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    let source: DocumentSource = parse(path, &content)?;
    Ok(Document::from_source(source))
}

/// Write the live markup of every container back out.
pub fn write_document(path: &Path, document: &Document) -> Result<(), IoError> {
    write_json(path, &document.to_source())
}

/// Read persisted link state. A missing file means no links yet.
pub fn read_link_state(path: &Path) -> Result<Option<LinkState>, IoError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    parse(path, &content).map(Some)
}

/// Write link state as pretty JSON, creating parent directories.
pub fn write_link_state(path: &Path, state: &LinkState) -> Result<(), IoError> {
    write_json(path, state)
}

fn parse<T: serde::de::DeserializeOwned>(path: &Path, content: &str) -> Result<T, IoError> {
    serde_json::from_str(content).map_err(|source| IoError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), IoError> {
    // Create parent directories if they don't exist
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|source| IoError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json + "\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchoring::{MarkerAttrs, MarkupAnchorWriter};
    use crate::document::Container;
    use crate::ids::{ContainerId, GroupId, ResourceId};
    use crate::links::{Anchor, Link, LinkStateStore};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_read_document() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.json");
        fs::write(
            &path,
            r#"{"containers":[{"id":"c1","markup":"say hello world"},{"id":"c2","markup":"<b>x</b>"}]}"#,
        )
        .unwrap();

        let doc = read_document(&path).unwrap();

        assert_eq!(doc.containers().len(), 2);
        assert_eq!(
            doc.container(&ContainerId::new("c2")).unwrap().markup(),
            "<b>x</b>"
        );
    }

    #[test]
    fn test_linked_document_reads_back_with_markup() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out").join("doc.json");
        let mut doc = Document::new([Container::new("c1", "say hello world")]);
        let attrs = MarkerAttrs::committed(GroupId::new("g"), ResourceId::new("r1"), None);
        MarkupAnchorWriter::new(&mut doc)
            .insert_marker(&ContainerId::new("c1"), 4, 9, attrs)
            .unwrap();

        write_document(&path, &doc).unwrap();
        let read = read_document(&path).unwrap();

        let markup = read.container(&ContainerId::new("c1")).unwrap().markup();
        assert_eq!(markup, doc.container(&ContainerId::new("c1")).unwrap().markup());
        assert!(markup.contains("groupId-g"));
        assert_eq!(read.to_source().containers.len(), 1);
    }

    #[test]
    fn test_missing_document() {
        let temp_dir = TempDir::new().unwrap();
        let result = read_document(&temp_dir.path().join("nope.json"));
        assert!(matches!(result, Err(IoError::NotFound(_))));
    }

    #[test]
    fn test_bad_json_names_the_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("links.json");
        fs::write(&path, "{not json").unwrap();

        let err = read_link_state(&path).unwrap_err();

        assert!(matches!(err, IoError::Json { .. }));
        assert!(err.to_string().contains("links.json"));
    }

    #[test]
    fn test_link_state_round_trip_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("links.json");
        assert!(read_link_state(&path).unwrap().is_none());

        let mut store = LinkStateStore::new();
        store.register(Link {
            resource: ResourceId::new("r1"),
            group: GroupId::new("g"),
            anchors: vec![Anchor::new("c1", 4, 9)],
        });
        write_link_state(&path, store.state()).unwrap();

        assert_eq!(read_link_state(&path).unwrap().as_ref(), Some(store.state()));
    }
}
