//! JSON lesson catalog loader.
//!
//! Accepts either a single JSON file or a directory of `*.json` files. Each
//! file holds one lesson (with an optional `id`, defaulting to the file
//! stem) or a map of lesson id to lesson.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tutorlane_core::lesson::InMemoryLessonCatalog;
use tutorlane_types::error::LessonError;
use tutorlane_types::lesson::LessonContext;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LessonFile {
    One {
        #[serde(default)]
        id: Option<String>,
        #[serde(flatten)]
        context: LessonContext,
    },
    Many(HashMap<String, LessonContext>),
}

/// Load every lesson under `path` into an in-memory catalog.
pub async fn load_lessons(path: &Path) -> Result<InMemoryLessonCatalog, LessonError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| LessonError::Io(format!("{}: {e}", path.display())))?;

    let mut catalog = InMemoryLessonCatalog::new();
    if metadata.is_dir() {
        let mut entries = tokio::fs::read_dir(path)
            .await
            .map_err(|e| LessonError::Io(format!("{}: {e}", path.display())))?;
        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| LessonError::Io(e.to_string()))?
        {
            let file = entry.path();
            if file.extension().is_some_and(|ext| ext == "json") {
                files.push(file);
            }
        }
        files.sort();
        for file in files {
            load_file(&file, &mut catalog).await?;
        }
    } else {
        load_file(path, &mut catalog).await?;
    }

    tracing::info!(path = %path.display(), lessons = catalog.len(), "lesson catalog loaded");
    Ok(catalog)
}

async fn load_file(path: &Path, catalog: &mut InMemoryLessonCatalog) -> Result<(), LessonError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| LessonError::Io(format!("{}: {e}", path.display())))?;
    let parsed: LessonFile = serde_json::from_str(&content).map_err(|e| LessonError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    match parsed {
        LessonFile::One { id, context } => {
            let id = id
                .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
                .ok_or_else(|| LessonError::Parse {
                    path: path.display().to_string(),
                    message: "lesson has no id".to_string(),
                })?;
            catalog.insert(id, context);
        }
        LessonFile::Many(lessons) => {
            for (id, context) in lessons {
                catalog.insert(id, context);
            }
        }
    }
    Ok(())
}
