use anyhow::{Result, anyhow};

/// Decodes a hex string (with or without "0x" prefix) into UTF-8 text.
///
/// Invalid UTF-8 sequences are replaced rather than rejected; transaction
/// payloads are display-only here.
pub fn decode_hex_utf8(input: &str) -> Result<String> {
    let hex_str = input.strip_prefix("0x").unwrap_or(input);
    if hex_str.len() % 2 != 0 {
        return Err(anyhow!("hex string has odd length"));
    }
    let bytes = hex::decode(hex_str).map_err(|e| anyhow!("invalid hex string: {}", e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Shortens an address for display: first 5 characters, ellipsis, last 4
pub fn mask_address(address: &str) -> String {
    if address.len() <= 9 {
        return address.to_string();
    }
    format!("{}...{}", &address[..5], &address[address.len() - 4..])
}
