use std::path::Path;

/// Declared content encoding of a model payload. The remote protocol only
/// accepts text; binary payloads are rejected at encode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelEncoding {
    Text,
    Binary,
}

/// The optimization problem exactly as produced by the modeling toolchain.
/// Created once from external input and never mutated.
#[derive(Debug, Clone)]
pub struct ModelPayload {
    bytes: Vec<u8>,
    encoding: ModelEncoding,
}

impl ModelPayload {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            bytes: body.into().into_bytes(),
            encoding: ModelEncoding::Text,
        }
    }

    pub fn binary(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            encoding: ModelEncoding::Binary,
        }
    }

    /// Read a model file in full. Valid UTF-8 is declared text, anything
    /// else binary; the encoder decides whether binary is acceptable.
    pub async fn from_file(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        match std::str::from_utf8(&bytes) {
            Ok(_) => Ok(Self {
                bytes,
                encoding: ModelEncoding::Text,
            }),
            Err(_) => Ok(Self {
                bytes,
                encoding: ModelEncoding::Binary,
            }),
        }
    }

    pub fn encoding(&self) -> ModelEncoding {
        self.encoding
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Body as text; `None` when the payload is declared binary.
    pub fn as_text(&self) -> Option<&str> {
        match self.encoding {
            ModelEncoding::Text => std::str::from_utf8(&self.bytes).ok(),
            ModelEncoding::Binary => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_payload_roundtrip() {
        let model = ModelPayload::text("NAME test\nROWS\nENDATA\n");
        assert_eq!(model.encoding(), ModelEncoding::Text);
        assert!(!model.is_empty());
        assert_eq!(model.as_text(), Some("NAME test\nROWS\nENDATA\n"));
    }

    #[test]
    fn binary_payload_has_no_text_view() {
        let model = ModelPayload::binary(vec![0xff, 0x00, 0x7f]);
        assert_eq!(model.encoding(), ModelEncoding::Binary);
        assert_eq!(model.as_text(), None);
    }

    #[test]
    fn empty_payload_is_detected() {
        assert!(ModelPayload::text("").is_empty());
        assert_eq!(ModelPayload::text("").len(), 0);
    }

    #[tokio::test]
    async fn from_file_detects_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let text_path = dir.path().join("model.mps");
        std::fs::write(&text_path, "NAME test\n").unwrap();
        let model = ModelPayload::from_file(&text_path).await.unwrap();
        assert_eq!(model.encoding(), ModelEncoding::Text);

        let bin_path = dir.path().join("model.bin");
        std::fs::write(&bin_path, [0xffu8, 0xfe, 0x00]).unwrap();
        let model = ModelPayload::from_file(&bin_path).await.unwrap();
        assert_eq!(model.encoding(), ModelEncoding::Binary);
    }
}
