//! Recorded output

/// Immutable binary data tagged with a MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    data: Vec<u8>,
    mime_type: String,
}

impl Blob {
    /// Concatenate chunks in order
    pub fn from_chunks<C: AsRef<[u8]>>(chunks: &[C], mime_type: impl Into<String>) -> Self {
        let size = chunks.iter().map(|chunk| chunk.as_ref().len()).sum();
        let mut data = Vec::with_capacity(size);
        for chunk in chunks {
            data.extend_from_slice(chunk.as_ref());
        }
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}
