//! Algorand address encoding.
//!
//! Address format: base32(public_key || checksum) without padding, where the checksum is the
//! last 4 bytes of SHA-512/256(public_key). A 36-byte input always yields 58 characters.

use sha2::{Digest, Sha512_256};

use super::DecodeError;

/// RFC 4648 base32 alphabet.
const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Length of an account public key.
pub const PUBLIC_KEY_LEN: usize = 32;

const CHECKSUM_LEN: usize = 4;

/// Encode a byte slice as unpadded base32.
fn encode_base32(bytes: &[u8]) -> String {
	let num_chars = (bytes.len() * 8).div_ceil(5);
	let mut result = String::with_capacity(num_chars);

	let mut buffer: u64 = 0;
	let mut bits_in_buffer = 0;

	for &byte in bytes {
		buffer = (buffer << 8) | byte as u64;
		bits_in_buffer += 8;
		while bits_in_buffer >= 5 {
			bits_in_buffer -= 5;
			let idx = ((buffer >> bits_in_buffer) & 0x1F) as usize;
			result.push(BASE32_ALPHABET[idx] as char);
		}
	}
	if bits_in_buffer > 0 {
		let idx = ((buffer << (5 - bits_in_buffer)) & 0x1F) as usize;
		result.push(BASE32_ALPHABET[idx] as char);
	}

	result
}

/// Encode a 32-byte public key as its canonical address string.
pub fn encode_address(public_key: &[u8; PUBLIC_KEY_LEN]) -> String {
	let digest = Sha512_256::digest(public_key);
	let mut raw = Vec::with_capacity(PUBLIC_KEY_LEN + CHECKSUM_LEN);
	raw.extend_from_slice(public_key);
	raw.extend_from_slice(&digest[digest.len() - CHECKSUM_LEN..]);
	encode_base32(&raw)
}

/// Decode an ARC-4 `address` argument (a bare 32-byte public key).
pub fn decode_address(arg: &[u8]) -> Result<String, DecodeError> {
	let public_key: [u8; PUBLIC_KEY_LEN] = arg.try_into().map_err(|_| {
		DecodeError::MalformedArgs(format!(
			"address argument has {} bytes; expected {}",
			arg.len(),
			PUBLIC_KEY_LEN
		))
	})?;
	Ok(encode_address(&public_key))
}
