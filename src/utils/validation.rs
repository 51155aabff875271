/// Maximum file size: 100 MB
pub const MAX_FILE_SIZE: usize = 100 * 1024 * 1024;

/// Allowed MIME types for pinning: documents and images only
pub const ACCEPTED_FILE_TYPES: &[&str] = &["application/pdf", "image/png", "image/jpeg"];

/// Magic byte signatures for the accepted file types
const MAGIC_SIGNATURES: &[(&[u8], &str)] = &[
    (&[0x25, 0x50, 0x44, 0x46], "application/pdf"), // %PDF
    (&[0x89, 0x50, 0x4E, 0x47], "image/png"),       // PNG
    (&[0xFF, 0xD8, 0xFF], "image/jpeg"),            // JPEG
];

/// Strips MIME parameters (e.g. "; charset=...") and lowercases the type
pub fn normalize_mime(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

/// Checks a MIME type against the pinning allowlist
pub fn is_accepted_mime(content_type: &str) -> bool {
    let Ok(parsed) = content_type.trim().parse::<mime::Mime>() else {
        return false;
    };
    ACCEPTED_FILE_TYPES
        .iter()
        .any(|&t| t == parsed.essence_str())
}

fn is_base58_char(c: char) -> bool {
    c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l')
}

fn is_base32_char(c: char) -> bool {
    matches!(c, 'a'..='z' | '2'..='7')
}

/// Validates an IPFS CID, accepting both CIDv0 and CIDv1 shapes.
///
/// CIDv0: "Qm" followed by exactly 44 base58 characters.
/// CIDv1: "b" followed by 58 or more base32 characters.
pub fn is_valid_cid(cid: &str) -> bool {
    if let Some(rest) = cid.strip_prefix("Qm") {
        return rest.len() == 44 && rest.chars().all(is_base58_char);
    }
    if let Some(rest) = cid.strip_prefix('b') {
        return rest.len() >= 58 && rest.chars().all(is_base32_char);
    }
    false
}

/// Validates a wallet address: "0x" followed by 40 hex digits
pub fn is_valid_wallet_address(address: &str) -> bool {
    match address.strip_prefix("0x") {
        Some(rest) => rest.len() == 40 && rest.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// Validates a transaction hash: "0x" followed by 64 hex digits
pub fn is_valid_transaction_hash(hash: &str) -> bool {
    match hash.strip_prefix("0x") {
        Some(rest) => rest.len() == 64 && rest.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// Sanitizes a filename before it is forwarded to the pinning service.
///
/// Keeps only `[A-Za-z0-9._-]`, collapses runs of dots (path traversal and
/// hidden-file tricks reduce to a single dot), and truncates to 255 bytes.
/// A name left with nothing but dots falls back to "file".
pub fn sanitize_filename(filename: &str) -> String {
    let mut sanitized = String::with_capacity(filename.len().min(255));
    for c in filename.chars() {
        if !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')) {
            continue;
        }
        if c == '.' && sanitized.ends_with('.') {
            continue;
        }
        sanitized.push(c);
        if sanitized.len() >= 255 {
            break;
        }
    }

    if sanitized.chars().all(|c| c == '.') {
        return "file".to_string();
    }
    sanitized
}

/// Checks that the first bytes of the upload match its declared MIME type
pub fn verify_magic_bytes(header: &[u8], claimed_mime: &str) -> bool {
    let normalized = normalize_mime(claimed_mime);
    MAGIC_SIGNATURES
        .iter()
        .any(|(signature, mime_type)| *mime_type == normalized && header.starts_with(signature))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CID_V0: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";

    #[test]
    fn test_is_valid_cid_v0() {
        assert!(is_valid_cid(CID_V0));

        // Wrong length
        assert!(!is_valid_cid("QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbd"));
        // Base58 excludes 0, O, I and l
        assert!(!is_valid_cid("Qm0wAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG"));
        assert!(!is_valid_cid("QmOwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG"));
    }

    #[test]
    fn test_is_valid_cid_v1() {
        assert!(is_valid_cid(&format!("b{}", "a".repeat(58))));
        assert!(is_valid_cid(&format!("b{}", "afybei234567".repeat(6))));

        // Too short
        assert!(!is_valid_cid(&format!("b{}", "a".repeat(57))));
        // Uppercase and out-of-alphabet digits are not base32
        assert!(!is_valid_cid(&format!("b{}", "A".repeat(58))));
        assert!(!is_valid_cid(&format!("b{}", "1".repeat(58))));
    }

    #[test]
    fn test_is_valid_cid_rejects_garbage() {
        assert!(!is_valid_cid(""));
        assert!(!is_valid_cid("not-a-cid"));
        assert!(!is_valid_cid("Qm"));
        assert!(!is_valid_cid("b"));
    }

    #[test]
    fn test_is_valid_wallet_address() {
        assert!(is_valid_wallet_address(
            "0x742d35Cc6634C0532925a3b844Bc454e4438f44e"
        ));
        assert!(is_valid_wallet_address(&format!("0x{}", "a".repeat(40))));

        assert!(!is_valid_wallet_address(&format!("0x{}", "a".repeat(39))));
        assert!(!is_valid_wallet_address(&format!("0x{}", "g".repeat(40))));
        assert!(!is_valid_wallet_address(&"a".repeat(42)));
        assert!(!is_valid_wallet_address(""));
    }

    #[test]
    fn test_is_valid_transaction_hash() {
        assert!(is_valid_transaction_hash(&format!("0x{}", "ab".repeat(32))));

        assert!(!is_valid_transaction_hash(&format!("0x{}", "ab".repeat(31))));
        assert!(!is_valid_transaction_hash(&format!("0x{}", "zz".repeat(32))));
        assert!(!is_valid_transaction_hash(""));
    }

    #[test]
    fn test_is_accepted_mime() {
        assert!(is_accepted_mime("application/pdf"));
        assert!(is_accepted_mime("image/png"));
        assert!(is_accepted_mime("IMAGE/JPEG"));
        assert!(is_accepted_mime("image/png; charset=binary"));

        assert!(!is_accepted_mime("image/gif"));
        assert!(!is_accepted_mime("text/html"));
        assert!(!is_accepted_mime("application/octet-stream"));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("my file (1).png"), "myfile1.png");
        assert_eq!(sanitize_filename("../../../etc/passwd"), ".etcpasswd");
        assert_eq!(sanitize_filename("a..b...c.pdf"), "a.b.c.pdf");
        assert_eq!(sanitize_filename("照片.jpeg"), ".jpeg");

        // Degenerate names fall back
        assert_eq!(sanitize_filename(""), "file");
        assert_eq!(sanitize_filename("...."), "file");
        assert_eq!(sanitize_filename("///"), "file");

        let long = "x".repeat(300);
        assert_eq!(sanitize_filename(&long).len(), 255);
    }

    #[test]
    fn test_verify_magic_bytes() {
        assert!(verify_magic_bytes(b"%PDF-1.5", "application/pdf"));
        assert!(verify_magic_bytes(
            &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A],
            "image/png"
        ));
        assert!(verify_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0], "image/jpeg"));

        // Mismatched or unknown content
        assert!(!verify_magic_bytes(b"%PDF-1.5", "image/png"));
        assert!(!verify_magic_bytes(b"Hello World", "application/pdf"));
        assert!(!verify_magic_bytes(&[], "image/jpeg"));
    }
}
