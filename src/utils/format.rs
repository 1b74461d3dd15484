/// Format bytes as hex with a space between each byte.
pub fn format_bytes(bytes: &[u8]) -> String {
	bytes
		.iter()
		.map(|b| format!("{:02x}", b))
		.collect::<Vec<_>>()
		.join(" ")
}
