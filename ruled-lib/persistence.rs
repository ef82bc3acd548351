//! Loading and saving notes.
//!
//! A note is stored as one JSON blob:
//!
//! ```json
//! {
//!   "version": 1,
//!   "typing_style": { "font": "body", "paragraph-spacing": 8.0, ... },
//!   "spans": [{ "text": "Hello\n", "style": { ... } }, ...]
//! }
//! ```
//!
//! Loading never fails from the editor's point of view:
//! [`load_or_default`] substitutes an empty note for anything unreadable.

use std::{
  fs,
  path::{
    Path,
    PathBuf,
  },
};

use serde::{
  Deserialize,
  Serialize,
};
use thiserror::Error;

use crate::{
  buffer::{
    StyledText,
    StyledTextBuffer,
  },
  style::StyleAttributes,
};

/// Blob format version written by [`encode`].
pub const FORMAT_VERSION: u32 = 1;

pub type Result<T> = std::result::Result<T, PersistenceError>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PersistenceError {
  #[error("failed to access note file {path}: {source}")]
  Io {
    path:   PathBuf,
    source: std::io::Error,
  },
  #[error("malformed note: {0}")]
  Json(#[from] serde_json::Error),
  #[error("unsupported note format version {0}")]
  UnsupportedVersion(u32),
  #[error("no note stored")]
  Missing,
}

#[derive(Debug, Serialize, Deserialize)]
struct NoteBlob {
  version:      u32,
  typing_style: StyleAttributes,
  spans:        Vec<SpanBlob>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SpanBlob {
  text:  String,
  style: StyleAttributes,
}

pub fn encode(buffer: &StyledTextBuffer) -> Result<String> {
  let content = buffer.to_styled();
  let blob = NoteBlob {
    version:      FORMAT_VERSION,
    typing_style: buffer.typing_style(),
    spans:        content
      .spans()
      .map(|(text, style)| {
        SpanBlob {
          text:  text.to_string(),
          style: *style,
        }
      })
      .collect(),
  };
  Ok(serde_json::to_string_pretty(&blob)?)
}

pub fn decode(source: &str) -> Result<StyledTextBuffer> {
  let blob: NoteBlob = serde_json::from_str(source)?;
  if blob.version != FORMAT_VERSION {
    return Err(PersistenceError::UnsupportedVersion(blob.version));
  }
  let content = StyledText::from_spans(
    blob
      .spans
      .iter()
      .map(|span| (span.text.as_str(), span.style)),
  );
  Ok(StyledTextBuffer::from_styled(&content, blob.typing_style))
}

/// Atomic load and save of one note.
pub trait NoteStore {
  fn load(&self) -> Result<StyledTextBuffer>;
  fn save(&mut self, buffer: &StyledTextBuffer) -> Result<()>;
}

/// Load from `store`, falling back to an empty note in `default_style`.
pub fn load_or_default(store: &dyn NoteStore, default_style: StyleAttributes) -> StyledTextBuffer {
  match store.load() {
    Ok(buffer) => buffer,
    Err(PersistenceError::Missing) => StyledTextBuffer::new(default_style),
    Err(err) => {
      tracing::warn!(%err, "failed to load note, starting empty");
      StyledTextBuffer::new(default_style)
    },
  }
}

/// A note in a JSON file. A missing file is an empty store.
#[derive(Debug, Clone)]
pub struct FileStore {
  path: PathBuf,
}

impl FileStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn io_error(&self, source: std::io::Error) -> PersistenceError {
    PersistenceError::Io {
      path: self.path.clone(),
      source,
    }
  }
}

impl NoteStore for FileStore {
  fn load(&self) -> Result<StyledTextBuffer> {
    let source = match fs::read_to_string(&self.path) {
      Ok(source) => source,
      Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
        return Err(PersistenceError::Missing);
      },
      Err(err) => return Err(self.io_error(err)),
    };
    decode(&source)
  }

  fn save(&mut self, buffer: &StyledTextBuffer) -> Result<()> {
    let blob = encode(buffer)?;
    if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
      fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
    }
    // stage next to the target, then rename over it
    let staging = self.path.with_extension("tmp");
    fs::write(&staging, blob).map_err(|err| self.io_error(err))?;
    fs::rename(&staging, &self.path).map_err(|err| self.io_error(err))?;
    tracing::debug!(path = %self.path.display(), "note saved");
    Ok(())
  }
}

/// A note held in memory as its serialized blob.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
  blob: Option<String>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_blob(blob: impl Into<String>) -> Self {
    Self {
      blob: Some(blob.into()),
    }
  }

  pub fn blob(&self) -> Option<&str> {
    self.blob.as_deref()
  }
}

impl NoteStore for MemoryStore {
  fn load(&self) -> Result<StyledTextBuffer> {
    decode(self.blob.as_deref().ok_or(PersistenceError::Missing)?)
  }

  fn save(&mut self, buffer: &StyledTextBuffer) -> Result<()> {
    self.blob = Some(encode(buffer)?);
    Ok(())
  }
}
