//! Filesystem probe: metadata for one path under the served root.
//!
//! Every failure collapses to `None`. Callers cannot tell "missing" from
//! "unreadable"; the distinction only shows up in the log.

use crate::clock::unix_seconds;
use autoindex_logging::Logger;
use autoindex_protocol::{Entry, Response};
use std::fs::{self, Metadata};
use std::io::{self, ErrorKind};
use std::path::{Component, Path, PathBuf};

/// Map a logical request path onto the filesystem, never leaving `root`.
///
/// Leading `/`, empty and `.` segments are dropped; `..` pops a segment but
/// stops at the root.
pub fn resolve(root: &Path, logical: &str) -> PathBuf {
    let mut segments: Vec<&str> = Vec::new();
    for component in Path::new(logical).components() {
        match component {
            Component::Normal(segment) => {
                if let Some(segment) = segment.to_str() {
                    segments.push(segment);
                }
            }
            Component::ParentDir => {
                segments.pop();
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }

    let mut path = root.to_path_buf();
    path.extend(segments);
    path
}

fn mtime(meta: &Metadata) -> io::Result<i64> {
    meta.modified().map(unix_seconds)
}

/// Describe the file or directory at `logical` under `root`.
pub fn probe(root: &Path, logical: &str, logger: &dyn Logger) -> Option<Response> {
    let path = resolve(root, logical);

    let meta = match fs::metadata(&path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            logger.debug(format_args!("path {} not found", path.display()));
            return None;
        }
        Err(e) => {
            logger.error(format_args!("error opening path {}: {}", path.display(), e));
            return None;
        }
    };

    if !meta.is_dir() {
        return match mtime(&meta) {
            Ok(mtime) => Some(Response::File {
                mtime,
                size: meta.len(),
            }),
            Err(e) => {
                logger.error(format_args!(
                    "error reading mtime of {}: {}",
                    path.display(),
                    e
                ));
                None
            }
        };
    }

    list(&path, fs::read_dir(&path), logger)
}

/// Build a directory response from an opened (or failed) listing.
fn list(path: &Path, dir: io::Result<fs::ReadDir>, logger: &dyn Logger) -> Option<Response> {
    let dir = match dir {
        Ok(dir) => dir,
        Err(e) => {
            logger.error(format_args!(
                "error reading directory {}: {}",
                path.display(),
                e
            ));
            return None;
        }
    };

    let children = dir.filter_map(|dirent| match dirent {
        // DirEntry::metadata does not follow symlinks
        Ok(dirent) => Some((
            dirent.file_name().to_string_lossy().into_owned(),
            dirent.metadata(),
        )),
        Err(e) => {
            logger.warn(format_args!(
                "error listing entry in {}: {}",
                path.display(),
                e
            ));
            None
        }
    });

    Some(Response::Dir {
        content: entries(path, children, logger),
    })
}

/// Children that cannot be described are skipped; the rest keep their order.
fn entries<I>(dir: &Path, children: I, logger: &dyn Logger) -> Vec<Entry>
where
    I: IntoIterator<Item = (String, io::Result<Metadata>)>,
{
    children
        .into_iter()
        .filter_map(|(name, meta)| describe(dir, name, meta, logger))
        .collect()
}

fn describe(
    dir: &Path,
    name: String,
    meta: io::Result<Metadata>,
    logger: &dyn Logger,
) -> Option<Entry> {
    let described = meta.and_then(|meta| mtime(&meta).map(|mtime| (meta, mtime)));
    match described {
        Ok((meta, mtime)) if meta.is_dir() => Some(Entry::dir(name, mtime)),
        Ok((meta, mtime)) => Some(Entry::file(name, mtime, meta.len())),
        Err(e) => {
            logger.warn(format_args!(
                "error getting info of entry {}/{}: {}",
                dir.display(),
                name,
                e
            ));
            None
        }
    }
}
