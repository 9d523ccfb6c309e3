//! Loading and saving catalogs.
//!
//! Saves are atomic: the catalog is written to a temporary file next to the
//! target and renamed over it, so an interrupted write never leaves a
//! truncated catalog behind. The writer reproduces the layout it found,
//! including Xcode's `"key" : value` separator, so an unchanged catalog
//! round-trips byte for byte.

use std::{
    fs::{self, File},
    io::{self, BufReader, Read, Write},
    path::{Path, PathBuf},
};

use serde::Serialize;
use serde_json::ser::Formatter;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{error::Error, types::Catalog};

/// Textual layout of a catalog file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// `"key" : value` (Xcode) rather than `"key": value`.
    pub spaced_colon: bool,
    pub trailing_newline: bool,
}

impl Default for Layout {
    /// What Xcode itself writes.
    fn default() -> Self {
        Layout {
            spaced_colon: true,
            trailing_newline: false,
        }
    }
}

impl Layout {
    pub fn detect(text: &str) -> Self {
        Layout {
            spaced_colon: text.contains("\" : "),
            trailing_newline: text.ends_with('\n'),
        }
    }
}

/// Persists a catalog. The driver only ever saves through this trait.
pub trait CatalogStore {
    fn save(&mut self, catalog: &Catalog) -> Result<(), Error>;
}

/// The production store: one `.xcstrings` file on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    layout: Layout,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>, layout: Layout) -> Self {
        FileStore {
            path: path.into(),
            layout,
        }
    }

    /// Loads the catalog at `path` and returns a store that writes it back
    /// with the same layout.
    pub fn open(path: impl Into<PathBuf>) -> Result<(Self, Catalog), Error> {
        let path = path.into();
        let (catalog, layout) = load_with_layout(&path)?;
        Ok((FileStore { path, layout }, catalog))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }
}

impl CatalogStore for FileStore {
    fn save(&mut self, catalog: &Catalog) -> Result<(), Error> {
        save_with_layout(catalog, &self.path, self.layout)
    }
}

pub fn load(path: impl AsRef<Path>) -> Result<Catalog, Error> {
    load_with_layout(path).map(|(catalog, _)| catalog)
}

pub fn load_with_layout(path: impl AsRef<Path>) -> Result<(Catalog, Layout), Error> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::CatalogNotFound(path.to_path_buf()),
        _ => Error::Io(e),
    })?;

    let mut raw = String::new();
    BufReader::new(file).read_to_string(&mut raw)?;
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw.as_str());

    let catalog = from_str(text).map_err(|source| Error::CatalogParse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        "Loaded {} ({} entries, source language {})",
        path.display(),
        catalog.strings.len(),
        catalog.source_language
    );
    Ok((catalog, Layout::detect(text)))
}

pub fn from_str(text: &str) -> Result<Catalog, serde_json::Error> {
    serde_json::from_str(text)
}

/// Saves with Xcode's default layout.
pub fn save(catalog: &Catalog, path: impl AsRef<Path>) -> Result<(), Error> {
    save_with_layout(catalog, path, Layout::default())
}

pub fn save_with_layout(
    catalog: &Catalog,
    path: impl AsRef<Path>,
    layout: Layout,
) -> Result<(), Error> {
    let path = path.as_ref();
    let bytes = to_vec(catalog, layout)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let write = || -> io::Result<()> {
        let mut tmp = NamedTempFile::new_in(dir)?;
        if let Ok(metadata) = fs::metadata(path) {
            tmp.as_file().set_permissions(metadata.permissions())?;
        }
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    };
    write().map_err(|source| Error::write_error(path, source))?;

    debug!("Saved {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

pub fn to_vec(catalog: &Catalog, layout: Layout) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, CatalogFormatter::new(layout));
    catalog.serialize(&mut serializer)?;
    if layout.trailing_newline {
        out.push(b'\n');
    }
    Ok(out)
}

pub fn to_string(catalog: &Catalog, layout: Layout) -> Result<String, Error> {
    let bytes = to_vec(catalog, layout)?;
    // serde_json only ever emits UTF-8.
    String::from_utf8(bytes).map_err(|e| Error::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

/// Two-space pretty printer with a configurable key separator. In Xcode
/// layout, empty containers are written as `{\n\n<indent>}`.
struct CatalogFormatter {
    layout: Layout,
    depth: usize,
    has_value: bool,
}

impl CatalogFormatter {
    fn new(layout: Layout) -> Self {
        CatalogFormatter {
            layout,
            depth: 0,
            has_value: false,
        }
    }

    fn indent<W: ?Sized + Write>(&self, writer: &mut W) -> io::Result<()> {
        for _ in 0..self.depth {
            writer.write_all(b"  ")?;
        }
        Ok(())
    }

    fn open<W: ?Sized + Write>(&mut self, writer: &mut W, bracket: &[u8]) -> io::Result<()> {
        self.depth += 1;
        self.has_value = false;
        writer.write_all(bracket)
    }

    fn close<W: ?Sized + Write>(&mut self, writer: &mut W, bracket: &[u8]) -> io::Result<()> {
        self.depth -= 1;
        if self.has_value {
            writer.write_all(b"\n")?;
            self.indent(writer)?;
        } else if self.layout.spaced_colon {
            writer.write_all(b"\n\n")?;
            self.indent(writer)?;
        }
        writer.write_all(bracket)
    }

    fn element<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        let separator: &[u8] = if first { b"\n" } else { b",\n" };
        writer.write_all(separator)?;
        self.indent(writer)
    }
}

impl Formatter for CatalogFormatter {
    fn begin_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.open(writer, b"[")
    }

    fn end_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.close(writer, b"]")
    }

    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.element(writer, first)
    }

    fn end_array_value<W: ?Sized + Write>(&mut self, _writer: &mut W) -> io::Result<()> {
        self.has_value = true;
        Ok(())
    }

    fn begin_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.open(writer, b"{")
    }

    fn end_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.close(writer, b"}")
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.element(writer, first)
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        let separator: &[u8] = if self.layout.spaced_colon { b" : " } else { b": " };
        writer.write_all(separator)
    }

    fn end_object_value<W: ?Sized + Write>(&mut self, _writer: &mut W) -> io::Result<()> {
        self.has_value = true;
        Ok(())
    }
}
