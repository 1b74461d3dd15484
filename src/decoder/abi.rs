//! ARC-4 primitives shared by the argument decoders.

use sha2::{Digest, Sha512_256};

use super::DecodeError;

/// Width of one `byte[32]` element.
pub const WORD_LEN: usize = 32;

/// Width of the length header in front of a dynamic array.
pub const ARRAY_HEADER_LEN: usize = 2;

/// Width of an ARC-4 method selector / return prefix.
pub const SELECTOR_LEN: usize = 4;

/// A decoded `byte[32][]` dynamic array borrowed from its payload.
#[derive(Debug, Clone, Copy)]
pub struct WordArray<'a> {
	words: &'a [u8],
}

impl<'a> WordArray<'a> {
	/// Parse a `byte[32][]` payload: a 2-byte big-endian element count followed by exactly that
	/// many 32-byte words.
	pub fn parse(payload: &'a [u8]) -> Result<Self, DecodeError> {
		if payload.len() < ARRAY_HEADER_LEN {
			return Err(DecodeError::MalformedArgs(format!(
				"word array of {} bytes is shorter than its {}-byte header",
				payload.len(),
				ARRAY_HEADER_LEN
			)));
		}

		let count = u16::from_be_bytes([payload[0], payload[1]]) as usize;
		let words = &payload[ARRAY_HEADER_LEN..];
		if words.len() != count * WORD_LEN {
			return Err(DecodeError::MalformedArgs(format!(
				"word array header declares {} words ({} bytes) but {} bytes follow",
				count,
				count * WORD_LEN,
				words.len()
			)));
		}

		Ok(Self { words })
	}

	/// Number of words in the array.
	pub fn len(&self) -> usize {
		self.words.len() / WORD_LEN
	}

	pub fn is_empty(&self) -> bool {
		self.words.is_empty()
	}

	/// Word at position `pos`.
	pub fn word(&self, pos: usize) -> Result<[u8; WORD_LEN], DecodeError> {
		let start = pos * WORD_LEN;
		let word = self.words.get(start..start + WORD_LEN).ok_or_else(|| {
			DecodeError::MalformedArgs(format!(
				"word {} requested from an array of {} words",
				pos,
				self.len()
			))
		})?;

		let mut out = [0u8; WORD_LEN];
		out.copy_from_slice(word);
		Ok(out)
	}

	/// Word at position `pos` read as a big-endian unsigned integer.
	pub fn uint64(&self, pos: usize) -> Result<u64, DecodeError> {
		uint64_from_be(&self.word(pos)?)
	}
}

/// Read a big-endian unsigned integer that must fit in 64 bits.
///
/// Leading bytes beyond the low eight must be zero; larger values are rejected rather than
/// truncated.
pub fn uint64_from_be(bytes: &[u8]) -> Result<u64, DecodeError> {
	if bytes.is_empty() {
		return Err(DecodeError::MalformedArgs("empty integer".to_string()));
	}

	let split = bytes.len().saturating_sub(8);
	let (high, low) = bytes.split_at(split);
	if high.iter().any(|b| *b != 0) {
		return Err(DecodeError::MalformedArgs(format!(
			"integer 0x{} does not fit in 64 bits",
			hex::encode(bytes)
		)));
	}

	Ok(low.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

/// ARC-4 method selector: the first four bytes of SHA-512/256 over the method signature.
pub fn method_selector(signature: &str) -> [u8; SELECTOR_LEN] {
	let digest = Sha512_256::digest(signature.as_bytes());
	let mut selector = [0u8; SELECTOR_LEN];
	selector.copy_from_slice(&digest[..SELECTOR_LEN]);
	selector
}

#[cfg(test)]
mod tests {
	use super::*;

	fn word_array(words: &[[u8; 32]]) -> Vec<u8> {
		let mut payload = (words.len() as u16).to_be_bytes().to_vec();
		for word in words {
			payload.extend_from_slice(word);
		}
		payload
	}

	#[test]
	fn test_selector_matches_arc4_reference() {
		assert_eq!(
			method_selector("add(uint64,uint64)uint128"),
			[0x8a, 0xa3, 0xb6, 0x1f]
		);
	}

	#[test]
	fn test_pool_deposit_selector() {
		assert_eq!(
			method_selector("deposit(byte[32][],byte[32][],address)(uint64,byte[32])"),
			[0xa8, 0x36, 0x91, 0x3c]
		);
	}

	#[test]
	fn test_word_array_reads_words_in_order() {
		let payload = word_array(&[[1u8; 32], [2u8; 32]]);
		let array = WordArray::parse(&payload).unwrap();
		assert_eq!(array.len(), 2);
		assert_eq!(array.word(0).unwrap(), [1u8; 32]);
		assert_eq!(array.word(1).unwrap(), [2u8; 32]);
		assert!(array.word(2).is_err());
	}

	#[test]
	fn test_word_array_rejects_header_mismatch() {
		let mut payload = word_array(&[[1u8; 32], [2u8; 32]]);
		payload.pop();
		assert!(matches!(
			WordArray::parse(&payload),
			Err(DecodeError::MalformedArgs(_))
		));
		assert!(WordArray::parse(&[0u8]).is_err());
	}

	#[test]
	fn test_uint64_rejects_overflow() {
		let mut word = [0u8; 32];
		word[31] = 100;
		assert_eq!(uint64_from_be(&word).unwrap(), 100);

		word[23] = 1;
		assert!(uint64_from_be(&word).is_err());
	}
}
