//! Common surface of directory and file nodes.

use chrono::{DateTime, Utc};

use crate::directory::DirectoryNode;
use crate::file::FileNode;
use crate::path;

/// Kind of node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// Virtual directory backed by a marker object
    Directory,
    /// Object holding content
    File,
}

impl NodeType {
    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, NodeType::Directory)
    }

    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        matches!(self, NodeType::File)
    }
}

/// Metadata shared by every node.
///
/// Values reflect the last refresh (or listing) only. A node that was never
/// refreshed reports `exists() == false` and [`MIN_TIMESTAMP`](crate::MIN_TIMESTAMP).
pub trait NodeInfo {
    /// Caller-facing path of the node. Empty for the root.
    fn key(&self) -> &str;

    /// Bucket the node lives in.
    fn bucket(&self) -> &str;

    /// Kind of node.
    fn node_type(&self) -> NodeType;

    /// Whether the node existed at the last refresh.
    fn exists(&self) -> bool;

    /// Last modification time observed at the last refresh.
    fn last_modified(&self) -> DateTime<Utc>;

    /// Change tag reported by the store. Directories have none.
    fn etag(&self) -> Option<&str> {
        None
    }

    /// Last path segment.
    fn name(&self) -> &str {
        path::name(self.key())
    }

    /// Text after the final `.` of the name.
    fn extension(&self) -> &str {
        path::extension(self.key())
    }

    /// `bucket:\key`, unique across buckets.
    fn full_name(&self) -> String {
        format!("{}:{}{}", self.bucket(), path::PATH_SEPARATOR, self.key())
    }
}

/// One entry of a directory listing.
#[derive(Debug, Clone)]
pub enum Node {
    Directory(DirectoryNode),
    File(FileNode),
}

impl Node {
    /// The directory, if this entry is one.
    pub fn as_directory(&self) -> Option<&DirectoryNode> {
        match self {
            Node::Directory(directory) => Some(directory),
            Node::File(_) => None,
        }
    }

    /// The file, if this entry is one.
    pub fn as_file(&self) -> Option<&FileNode> {
        match self {
            Node::File(file) => Some(file),
            Node::Directory(_) => None,
        }
    }

    fn info(&self) -> &dyn NodeInfo {
        match self {
            Node::Directory(directory) => directory,
            Node::File(file) => file,
        }
    }
}

impl NodeInfo for Node {
    fn key(&self) -> &str {
        self.info().key()
    }

    fn bucket(&self) -> &str {
        self.info().bucket()
    }

    fn node_type(&self) -> NodeType {
        self.info().node_type()
    }

    fn exists(&self) -> bool {
        self.info().exists()
    }

    fn last_modified(&self) -> DateTime<Utc> {
        self.info().last_modified()
    }

    fn etag(&self) -> Option<&str> {
        self.info().etag()
    }
}

impl From<DirectoryNode> for Node {
    fn from(directory: DirectoryNode) -> Self {
        Node::Directory(directory)
    }
}

impl From<FileNode> for Node {
    fn from(file: FileNode) -> Self {
        Node::File(file)
    }
}
