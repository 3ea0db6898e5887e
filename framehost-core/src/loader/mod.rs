//! Loader utilities for framehost-core.
//!
//! Responsibilities:
//! - Fetch the guest bytes from memory or from a host path.
//! - Detect whether the bytes are a `.wasm` binary or `.wat` text.
//! - If it looks like WAT, convert it to WASM bytes (via the `wat` crate).
//! - Compile a Wasmtime `Module` from the resulting WASM bytes.
//!
//! Notes:
//! - Extension sniffing is unreliable, so we sniff the bytes themselves.
//! - We accept a UTF-8 BOM and leading whitespace for WAT.

use crate::error::LoadError;
use std::fmt;
use std::path::PathBuf;
use wasmtime::{Engine, Module};

/// Where the guest module comes from.
#[derive(Clone, Debug)]
pub enum ModuleSource {
    /// Bytes already in memory (WASM or WAT).
    Bytes(Vec<u8>),
    /// A file read from the host filesystem.
    File(PathBuf),
}

impl fmt::Display for ModuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleSource::Bytes(bytes) => write!(f, "<{} in-memory bytes>", bytes.len()),
            ModuleSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Obtain the guest bytes, retrying a failed fetch up to `retries` extra times.
pub async fn fetch(source: &ModuleSource, retries: u32) -> Result<Vec<u8>, LoadError> {
    let path = match source {
        ModuleSource::Bytes(bytes) => return Ok(bytes.clone()),
        ModuleSource::File(path) => path,
    };

    let mut attempt = 0;
    loop {
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                tracing::debug!(path = %path.display(), len = bytes.len(), "fetched guest bytes");
                return Ok(bytes);
            }
            Err(e) if attempt < retries => {
                attempt += 1;
                tracing::warn!(path = %path.display(), error = %e, attempt, "guest fetch failed; retrying");
            }
            Err(e) => {
                return Err(LoadError::Fetch {
                    source_name: source.to_string(),
                    message: e.to_string(),
                });
            }
        }
    }
}

/// Load: detect -> (optional) wat->wasm -> compile.
pub fn compile_module(engine: &Engine, rom_bytes: &[u8]) -> Result<Module, LoadError> {
    let Detected { format, wasm_bytes } = normalize_to_wasm(rom_bytes)?;
    tracing::debug!(?format, len = wasm_bytes.len(), "compiling guest module");
    Module::new(engine, wasm_bytes.as_slice()).map_err(|e| LoadError::Compile(format!("{e:#}")))
}

/// Detect format and normalize to valid WASM bytes.
pub fn normalize_to_wasm(rom_bytes: &[u8]) -> Result<Detected, LoadError> {
    let format = detect_format(rom_bytes).ok_or_else(|| {
        LoadError::Compile("unrecognized module format (expected wasm or wat)".into())
    })?;

    match format {
        DetectedFormat::Wasm => Ok(Detected {
            format,
            wasm_bytes: rom_bytes.to_vec(),
        }),
        DetectedFormat::Wat => {
            let bytes = wat::parse_bytes(rom_bytes)
                .map_err(|e| LoadError::Compile(format!("failed to parse WAT: {e}")))?;
            Ok(Detected {
                format,
                wasm_bytes: bytes.into(),
            })
        }
    }
}

/// What kind of module the loader inferred from the bytes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DetectedFormat {
    Wasm,
    Wat,
}

/// Result of normalizing (detecting + possibly converting) the input.
#[derive(Clone, Debug)]
pub struct Detected {
    pub format: DetectedFormat,
    /// Always valid WASM bytes (for WASM/WAT inputs).
    pub wasm_bytes: Vec<u8>,
}

/// Best-effort detection.
///
/// Rules:
/// - If the first 4 bytes are `\0asm`, treat as WASM.
/// - Else, after stripping UTF-8 BOM / leading whitespace, if the first non-ws byte is `(`,
///   treat as WAT (common WAT starts with `(module ...)`).
pub fn detect_format(bytes: &[u8]) -> Option<DetectedFormat> {
    if is_wasm_magic(bytes) {
        return Some(DetectedFormat::Wasm);
    }

    let i = skip_bom_and_leading_ws(bytes);
    if i < bytes.len() && bytes[i] == b'(' {
        return Some(DetectedFormat::Wat);
    }

    None
}

fn is_wasm_magic(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && bytes[0..4] == *b"\0asm"
}

fn skip_bom_and_leading_ws(bytes: &[u8]) -> usize {
    let mut i = 0;

    // UTF-8 BOM: EF BB BF
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        i = 3;
    }

    while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\r' | b'\n') {
        i += 1;
    }

    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_wasm_magic() {
        assert_eq!(
            detect_format(b"\0asm\x01\x00\x00\x00"),
            Some(DetectedFormat::Wasm)
        );
    }

    #[test]
    fn detects_wat_with_whitespace_and_bom() {
        assert_eq!(detect_format(b"   \n\t(module)"), Some(DetectedFormat::Wat));
        assert_eq!(
            detect_format(b"\xEF\xBB\xBF(module)"),
            Some(DetectedFormat::Wat)
        );
    }

    #[test]
    fn garbage_is_a_compile_error() {
        let err = compile_module(&Engine::default(), b"not wasm").unwrap_err();
        assert!(matches!(err, LoadError::Compile(_)));
    }

    #[test]
    fn truncated_wasm_is_a_compile_error() {
        let err = compile_module(&Engine::default(), b"\0asm\x01\x00").unwrap_err();
        assert!(matches!(err, LoadError::Compile(_)));
    }

    #[test]
    fn wat_compiles() {
        assert!(compile_module(&Engine::default(), b"(module)").is_ok());
    }

    #[tokio::test]
    async fn missing_file_is_a_fetch_error_after_retries() {
        let source = ModuleSource::File(PathBuf::from("/definitely/not/here/guest.wasm"));
        let err = fetch(&source, 1).await.unwrap_err();
        match err {
            LoadError::Fetch { source_name, .. } => {
                assert_eq!(source_name, "/definitely/not/here/guest.wasm")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn in_memory_bytes_are_returned_as_is() {
        let source = ModuleSource::Bytes(b"(module)".to_vec());
        assert_eq!(fetch(&source, 0).await.unwrap(), b"(module)");
    }
}
