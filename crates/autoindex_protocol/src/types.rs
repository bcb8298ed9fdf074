//! Metadata payload types served for every query.
//!
//! The serde attributes here ARE the wire format. Changing a rename or a
//! skip rule changes what HTTP clients see.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of filesystem object behind a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Dir => "dir",
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Dir)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(EntryKind::File),
            "dir" => Ok(EntryKind::Dir),
            _ => Err(format!("Invalid entry kind: '{}'. Expected: file or dir", s)),
        }
    }
}

/// One immediate child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Unix timestamp (seconds)
    pub mtime: i64,
    /// Present for files only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl Entry {
    pub fn file(name: impl Into<String>, mtime: i64, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            mtime,
            size: Some(size),
        }
    }

    pub fn dir(name: impl Into<String>, mtime: i64) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Dir,
            mtime,
            size: None,
        }
    }
}

/// Answer to "what is at this path?".
///
/// ```text
/// {"type":"file","mtime":1700000000,"size":100}
/// {"type":"dir","content":[{"name":"c.txt","type":"file","mtime":1700000001,"size":5}]}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Response {
    File {
        mtime: i64,
        size: u64,
    },
    Dir {
        #[serde(default)]
        content: Vec<Entry>,
    },
}

impl Response {
    pub fn kind(&self) -> EntryKind {
        match self {
            Response::File { .. } => EntryKind::File,
            Response::Dir { .. } => EntryKind::Dir,
        }
    }

    /// Children of a directory response; empty for files.
    pub fn children(&self) -> &[Entry] {
        match self {
            Response::File { .. } => &[],
            Response::Dir { content } => content,
        }
    }
}
