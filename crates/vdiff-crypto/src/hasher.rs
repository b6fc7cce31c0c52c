use std::io::{self, Read};

use vdiff_types::ObjectId;

/// Domain-separated BLAKE3 content hasher.
///
/// The domain tag is fed to the hasher ahead of the content. Working-tree
/// files and snapshot blobs must be hashed with [`ContentHasher::BLOB`] for
/// their identities to be comparable.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for file contents.
    pub const BLOB: Self = Self {
        domain: "vdiff-blob-v1",
    };
    /// Hasher for serialized directory listings.
    pub const TREE: Self = Self {
        domain: "vdiff-tree-v1",
    };

    fn start(&self) -> blake3::Hasher {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher
    }

    /// Hash an in-memory buffer.
    pub fn hash(&self, data: &[u8]) -> ObjectId {
        let mut hasher = self.start();
        hasher.update(data);
        ObjectId::from_hash(*hasher.finalize().as_bytes())
    }

    /// Hash everything readable from `reader` without buffering it whole.
    pub fn hash_reader<R: Read>(&self, mut reader: R) -> io::Result<ObjectId> {
        let mut hasher = self.start();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(ObjectId::from_hash(*hasher.finalize().as_bytes()))
    }
}
