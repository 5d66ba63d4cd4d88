//! `enc-file` backend: checks a candidate passphrase against a local
//! ZipCrypto-encrypted archive.
//!
//! Grounded in the teacher crate's own ZipCrypto fast-path/slow-path
//! validation: a cheap header check rejects almost every wrong candidate
//! without touching the compressed data, and only a header hit pays for a
//! full decompression to rule out the ~1/256 false-positive rate of the
//! fast path.

use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use anyhow::{bail, Context};
use memmap2::Mmap;

use crate::backend::{Backend, RegisterPassword, TryOutcome};
use crate::error::{EngineError, EngineResult};

const CRC32_TABLE: [u32; 256] = build_crc32_table();

const fn build_crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            crc = if (crc & 1) != 0 {
                (crc >> 1) ^ 0xEDB8_8320
            } else {
                crc >> 1
            };
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

#[derive(Clone, Copy)]
struct CryptoHeader {
    header: [u8; 12],
    check_byte: u8,
}

struct ArchiveState {
    mmap: Arc<Mmap>,
    header: CryptoHeader,
}

pub struct EncFileBackend {
    register: RegisterPassword,
    target_path: std::sync::Mutex<Option<PathBuf>>,
    archive: OnceLock<ArchiveState>,
}

impl EncFileBackend {
    pub fn new(register: RegisterPassword) -> Self {
        EncFileBackend {
            register,
            target_path: std::sync::Mutex::new(None),
            archive: OnceLock::new(),
        }
    }
}

impl Backend for EncFileBackend {
    fn name(&self) -> &str {
        "enc-file"
    }

    fn init(&self, _total_workers: usize) -> EngineResult<()> {
        let path = self
            .target_path
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| EngineError::config("enc-file requires a target archive path"))?;

        let file = std::fs::File::open(&path)
            .map_err(|e| EngineError::resource(format!("opening {}", path.display()), e))?;
        let mmap = unsafe {
            Mmap::map(&file).map_err(|e| EngineError::resource("memory-mapping archive", e))?
        };
        let header = locate_zip_crypto_header(&mmap)
            .with_context(|| format!("scanning {}", path.display()))
            .map_err(|e| EngineError::config(format!("{e:#}")))?;

        let _ = self.archive.set(ArchiveState {
            mmap: Arc::new(mmap),
            header,
        });
        Ok(())
    }

    fn worker_init(&self, _id: usize) -> EngineResult<()> {
        if self.archive.get().is_none() {
            return Err(EngineError::config("enc-file backend not initialized"));
        }
        Ok(())
    }

    fn try_phrase(&self, _id: usize, candidate: &[u8]) -> TryOutcome {
        let Some(state) = self.archive.get() else {
            return TryOutcome::Fail("archive not initialized".to_string());
        };

        if !validate_password_header(&state.header, candidate) {
            return TryOutcome::Continue;
        }

        if verify_password_integrity(&state.mmap, candidate) {
            let path = self
                .target_path
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_default();
            (self.register)(&path.display().to_string(), candidate);
            TryOutcome::Completed
        } else {
            // fast-path false positive (~1/256 of header hits)
            TryOutcome::Continue
        }
    }

    fn worker_finish(&self, _id: usize) {}

    fn finish(&self) {}

    fn accept_option(&self, opt: char, _arg: Option<&str>) -> EngineResult<()> {
        Err(EngineError::config(format!(
            "enc-file does not support option '{opt}'"
        )))
    }

    fn set_target(&self, args: &[String]) -> EngineResult<()> {
        let path = args
            .first()
            .ok_or_else(|| EngineError::config("enc-file requires a target archive path argument"))?;
        *self.target_path.lock().unwrap() = Some(PathBuf::from(path));
        Ok(())
    }
}

fn locate_zip_crypto_header(data: &[u8]) -> anyhow::Result<CryptoHeader> {
    const LOCAL_FILE_HEADER_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];
    const MIN_HEADER_SIZE: usize = 30;
    const ENCRYPTION_FLAG_BIT: u16 = 0x01;
    const AES_ENCRYPTION_METHOD: u16 = 99;

    let mut cursor = 0;
    while cursor < data.len().saturating_sub(MIN_HEADER_SIZE) {
        if data[cursor..cursor + 4] != LOCAL_FILE_HEADER_SIGNATURE {
            cursor += 1;
            continue;
        }

        let flags = u16::from_le_bytes([data[cursor + 6], data[cursor + 7]]);
        if (flags & ENCRYPTION_FLAG_BIT) == 0 {
            cursor += 1;
            continue;
        }

        let method = u16::from_le_bytes([data[cursor + 8], data[cursor + 9]]);
        if method == AES_ENCRYPTION_METHOD {
            bail!("WinZip AES encryption is not supported");
        }

        let mod_time = u16::from_le_bytes([data[cursor + 10], data[cursor + 11]]);
        let crc = u32::from_le_bytes([
            data[cursor + 14],
            data[cursor + 15],
            data[cursor + 16],
            data[cursor + 17],
        ]);
        let fname_len = u16::from_le_bytes([data[cursor + 26], data[cursor + 27]]) as usize;
        let extra_len = u16::from_le_bytes([data[cursor + 28], data[cursor + 29]]) as usize;

        let header_start = cursor + MIN_HEADER_SIZE + fname_len + extra_len;
        if header_start + 12 > data.len() {
            bail!("truncated archive, local file header points past end of file");
        }

        let mut header = [0u8; 12];
        header.copy_from_slice(&data[header_start..header_start + 12]);

        let check_byte = if (flags & (1 << 3)) != 0 {
            (mod_time >> 8) as u8
        } else {
            (crc >> 24) as u8
        };

        return Ok(CryptoHeader { header, check_byte });
    }

    bail!("no ZipCrypto-encrypted entries found")
}

fn validate_password_header(header: &CryptoHeader, password: &[u8]) -> bool {
    let mut k0 = 0x1234_5678u32;
    let mut k1 = 0x2345_6789u32;
    let mut k2 = 0x3456_7890u32;

    for &byte in password {
        update_crypto_keys(&mut k0, &mut k1, &mut k2, byte);
    }

    for i in 0..11 {
        let temp = (k2 | 2) & 0xFFFF;
        let key_byte = ((temp.wrapping_mul(temp ^ 1)) >> 8) as u8;
        let decrypted = header.header[i] ^ key_byte;
        update_crypto_keys(&mut k0, &mut k1, &mut k2, decrypted);
    }

    let temp = (k2 | 2) & 0xFFFF;
    let key_byte = ((temp.wrapping_mul(temp ^ 1)) >> 8) as u8;
    (header.header[11] ^ key_byte) == header.check_byte
}

fn update_crypto_keys(k0: &mut u32, k1: &mut u32, k2: &mut u32, byte: u8) {
    let index0 = ((*k0 ^ byte as u32) & 0xFF) as usize;
    *k0 = (*k0 >> 8) ^ CRC32_TABLE[index0];
    *k1 = k1.wrapping_add(*k0 as u8 as u32);
    *k1 = k1.wrapping_mul(134_775_813).wrapping_add(1);
    let index2 = ((*k2 ^ (*k1 >> 24)) & 0xFF) as usize;
    *k2 = (*k2 >> 8) ^ CRC32_TABLE[index2];
}

fn verify_password_integrity(file_bytes: &[u8], password: &[u8]) -> bool {
    let cursor = std::io::Cursor::new(file_bytes);
    let mut archive = match zip::ZipArchive::new(cursor) {
        Ok(a) => a,
        Err(_) => return false,
    };

    for i in 0..archive.len() {
        let file_result = archive.by_index_decrypt(i, password);
        if let Ok(Ok(mut file)) = file_result {
            let mut buffer = [0u8; 4096];
            let mut is_valid = true;
            loop {
                match file.read(&mut buffer) {
                    Ok(0) => break,
                    Ok(_) => continue,
                    Err(_) => {
                        is_valid = false;
                        break;
                    }
                }
            }
            if is_valid {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::unstable::write::FileOptionsExt;
    use zip::write::FileOptions;

    fn build_test_archive(password: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        {
            let mut writer = zip::ZipWriter::new(file.reopen().unwrap());
            let options = FileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated)
                .with_deprecated_encryption(password.as_bytes());
            writer.start_file("secret.txt", options).unwrap();
            writer.write_all(b"top secret contents").unwrap();
            writer.finish().unwrap();
        }
        file
    }

    #[test]
    fn finds_the_correct_passphrase() {
        let archive = build_test_archive("hunter2");
        let backend = EncFileBackend::new(Arc::new(|_: &str, _: &[u8]| {}));
        backend
            .set_target(&[archive.path().display().to_string()])
            .unwrap();
        backend.init(1).unwrap();
        backend.worker_init(0).unwrap();

        assert!(matches!(
            backend.try_phrase(0, b"wrong"),
            TryOutcome::Continue
        ));
        assert!(matches!(
            backend.try_phrase(0, b"hunter2"),
            TryOutcome::Completed
        ));
    }

    #[test]
    fn missing_target_is_a_config_error() {
        let backend = EncFileBackend::new(Arc::new(|_: &str, _: &[u8]| {}));
        assert!(backend.init(1).is_err());
    }
}
