//! # Standard Security Handler
//!
//! RC4 40-bit encryption, revision 2 (`/V 1 /R 2`). The file key is derived
//! from the padded user password, the owner hash, the permission bits and the
//! first file identifier. Every string and stream of object `n` is then
//! encrypted with `md5(key ‖ n[0..3] ‖ gen[0..2])` truncated to ten bytes.

use crate::config::Protection;

const PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// Length of the file key in bytes (40 bits).
const KEY_LENGTH: usize = 5;

/// RC4 cipher state.
pub struct Rc4 {
    s: [u8; 256],
    i: usize,
    j: usize,
}

impl Rc4 {
    pub fn new(key: &[u8]) -> Self {
        let mut s = [0u8; 256];
        for (i, byte) in s.iter_mut().enumerate() {
            *byte = i as u8;
        }

        // KSA
        if !key.is_empty() {
            let mut j = 0usize;
            for i in 0..256 {
                j = (j + s[i] as usize + key[i % key.len()] as usize) % 256;
                s.swap(i, j);
            }
        }

        Self { s, i: 0, j: 0 }
    }

    /// Encrypt or decrypt `data`; RC4 is symmetric.
    pub fn process(&mut self, data: &[u8]) -> Vec<u8> {
        let mut output = Vec::with_capacity(data.len());
        for &byte in data {
            // PRGA
            self.i = (self.i + 1) % 256;
            self.j = (self.j + self.s[self.i] as usize) % 256;
            self.s.swap(self.i, self.j);
            let k = self.s[(self.s[self.i] as usize + self.s[self.j] as usize) % 256];
            output.push(byte ^ k);
        }
        output
    }
}

pub fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    Rc4::new(key).process(data)
}

/// Pad or truncate a password to 32 bytes.
fn pad_password(password: &str) -> [u8; 32] {
    let bytes = password.as_bytes();
    let len = bytes.len().min(32);
    let mut padded = [0u8; 32];
    padded[..len].copy_from_slice(&bytes[..len]);
    padded[len..].copy_from_slice(&PADDING[..32 - len]);
    padded
}

/// Key material of a protected document: the values written into the
/// `/Encrypt` dictionary and the file key used for per-object encryption.
#[derive(Debug, Clone)]
pub struct SecurityHandler {
    key: Vec<u8>,
    pub owner_hash: Vec<u8>,
    pub user_hash: Vec<u8>,
    pub permissions: i32,
    pub file_id: [u8; 16],
}

impl SecurityHandler {
    pub fn new(protection: &Protection, file_id: [u8; 16]) -> Self {
        let permissions = protection.permissions.p_value();
        let owner_password = if protection.owner_password.is_empty() {
            &protection.user_password
        } else {
            &protection.owner_password
        };

        // O entry: padded user password under a key from the owner password
        let owner_digest = md5::compute(pad_password(owner_password));
        let owner_hash = rc4(&owner_digest[..KEY_LENGTH], &pad_password(&protection.user_password));

        let mut data = Vec::with_capacity(32 + 32 + 4 + 16);
        data.extend_from_slice(&pad_password(&protection.user_password));
        data.extend_from_slice(&owner_hash);
        data.extend_from_slice(&permissions.to_le_bytes());
        data.extend_from_slice(&file_id);
        let key = md5::compute(&data)[..KEY_LENGTH].to_vec();

        let user_hash = rc4(&key, &PADDING);

        Self {
            key,
            owner_hash,
            user_hash,
            permissions,
            file_id,
        }
    }

    /// Per-object RC4 key for object `number`, generation 0.
    pub fn object_key(&self, number: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(KEY_LENGTH + 5);
        data.extend_from_slice(&self.key);
        data.extend_from_slice(&(number as u32).to_le_bytes()[..3]);
        data.extend_from_slice(&0u16.to_le_bytes());
        let hash = md5::compute(&data);
        hash[..(KEY_LENGTH + 5).min(16)].to_vec()
    }

    pub fn encrypt(&self, number: usize, data: &[u8]) -> Vec<u8> {
        rc4(&self.object_key(number), data)
    }
}

/// Hex encoding used for `/ID`, `/O` and `/U`.
pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}
