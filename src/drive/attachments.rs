//! Attachment rules shared by the submission handler and the issue wizard.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

use crate::core::shared::error::ApiError;

pub const MAX_ATTACHMENTS: usize = 5;
pub const MAX_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;
pub const MAX_FILE_NAME_CHARS: usize = 100;

/// Request body cap for a report carrying the maximum number of full-size
/// attachments: base64 grows 4/3, plus 1 MiB for data-URL prefixes and fields.
pub const MAX_ISSUE_BODY_BYTES: usize =
    MAX_ATTACHMENTS * MAX_ATTACHMENT_BYTES.div_ceil(3) * 4 + 1024 * 1024;

pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "application/pdf",
    "text/plain",
];

/// Attachment as sent by the client: base64 content, optionally a data URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttachmentInput {
    pub name: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAttachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub fn is_allowed_content_type(content_type: &str) -> bool {
    ALLOWED_CONTENT_TYPES.contains(&content_type.trim().to_ascii_lowercase().as_str())
}

/// Splits `data:<mime>;base64,<payload>` into its MIME type and payload.
/// Plain base64 is returned unchanged with no MIME type.
pub fn split_data_url(data: &str) -> (Option<&str>, &str) {
    let Some(rest) = data.strip_prefix("data:") else {
        return (None, data);
    };
    match rest.split_once(',') {
        Some((meta, payload)) => {
            let mime = meta.strip_suffix(";base64").unwrap_or(meta);
            ((!mime.is_empty()).then_some(mime), payload)
        }
        None => (None, data),
    }
}

/// Decoded size of a base64 payload without decoding it.
pub fn estimated_decoded_len(payload: &str) -> usize {
    let significant = payload.bytes().filter(|b| !b.is_ascii_whitespace()).count();
    let padding = payload.trim_end().bytes().rev().take_while(|b| *b == b'=').count();
    ((significant / 4) * 3 + (significant % 4).saturating_sub(1)).saturating_sub(padding.min(2))
}

pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILE_NAME_CHARS)
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "attachment".to_string()
    } else {
        cleaned
    }
}

fn rejected(name: &str, reason: impl std::fmt::Display) -> ApiError {
    ApiError::Validation(vec![format!("Attachment '{}': {}", name, reason)])
}

/// Checks the metadata of an attachment list without decoding any content.
pub fn check_attachment_list(attachments: &[AttachmentInput]) -> Vec<String> {
    let mut problems = Vec::new();
    if attachments.len() > MAX_ATTACHMENTS {
        problems.push(format!(
            "At most {} attachments are allowed, got {}",
            MAX_ATTACHMENTS,
            attachments.len()
        ));
    }
    for attachment in attachments {
        let (prefix_type, payload) = split_data_url(&attachment.data);
        let content_type = effective_content_type(attachment, prefix_type);
        if !is_allowed_content_type(&content_type) {
            problems.push(format!(
                "Attachment '{}': type '{}' is not allowed",
                attachment.name, content_type
            ));
        }
        if estimated_decoded_len(payload) > MAX_ATTACHMENT_BYTES {
            problems.push(format!(
                "Attachment '{}': larger than {} MiB",
                attachment.name,
                MAX_ATTACHMENT_BYTES / (1024 * 1024)
            ));
        }
    }
    problems
}

fn effective_content_type(attachment: &AttachmentInput, prefix_type: Option<&str>) -> String {
    let declared = attachment.content_type.trim();
    if declared.is_empty() {
        prefix_type.unwrap_or_default().to_ascii_lowercase()
    } else {
        declared.to_ascii_lowercase()
    }
}

pub fn decode_attachment(input: &AttachmentInput) -> Result<DecodedAttachment, ApiError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation(vec![
            "Attachment name is required".to_string()
        ]));
    }

    let (prefix_type, payload) = split_data_url(&input.data);
    let content_type = effective_content_type(input, prefix_type);
    if !is_allowed_content_type(&content_type) {
        return Err(rejected(name, format!("type '{}' is not allowed", content_type)));
    }

    if estimated_decoded_len(payload) > MAX_ATTACHMENT_BYTES {
        return Err(rejected(name, "larger than 5 MiB"));
    }

    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64
        .decode(compact.as_bytes())
        .map_err(|e| rejected(name, format!("invalid base64 ({e})")))?;

    if bytes.is_empty() {
        return Err(rejected(name, "file is empty"));
    }
    if bytes.len() > MAX_ATTACHMENT_BYTES {
        return Err(rejected(name, "larger than 5 MiB"));
    }

    Ok(DecodedAttachment {
        file_name: sanitize_file_name(name),
        content_type,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, content_type: &str, data: &str) -> AttachmentInput {
        AttachmentInput {
            name: name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    #[test]
    fn test_decode_plain_base64() {
        let encoded = BASE64.encode(b"hello log");
        let decoded = decode_attachment(&input("app.log", "text/plain", &encoded)).unwrap();
        assert_eq!(decoded.bytes, b"hello log");
        assert_eq!(decoded.content_type, "text/plain");
        assert_eq!(decoded.file_name, "app.log");
    }

    #[test]
    fn test_decode_strips_data_url_prefix() {
        let data = format!("data:image/png;base64,{}", BASE64.encode([0x89, b'P', b'N', b'G']));
        let decoded = decode_attachment(&input("shot.png", "", &data)).unwrap();
        assert_eq!(decoded.content_type, "image/png");
        assert_eq!(decoded.bytes, vec![0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_disallowed_type_rejected() {
        let data = BASE64.encode(b"MZ");
        let err = decode_attachment(&input("setup.exe", "application/x-msdownload", &data))
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let data = BASE64.encode(vec![0u8; MAX_ATTACHMENT_BYTES + 1]);
        assert!(decode_attachment(&input("big.pdf", "application/pdf", &data)).is_err());

        let at_limit = BASE64.encode(vec![1u8; MAX_ATTACHMENT_BYTES]);
        assert!(decode_attachment(&input("ok.pdf", "application/pdf", &at_limit)).is_ok());
    }

    #[test]
    fn test_invalid_base64_rejected() {
        assert!(decode_attachment(&input("a.txt", "text/plain", "@@not base64@@")).is_err());
    }

    #[test]
    fn test_estimated_len_matches_decoded() {
        for n in 0..20usize {
            let encoded = BASE64.encode(vec![7u8; n]);
            assert_eq!(estimated_decoded_len(&encoded), n, "n = {n}");
        }
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("my report (final).pdf"), "my_report__final_.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_file_name("  "), "attachment");
        assert_eq!(sanitize_file_name(&"a".repeat(300)).len(), MAX_FILE_NAME_CHARS);
        assert_eq!(sanitize_file_name("snímek.png"), "sn_mek.png");
    }

    #[test]
    fn test_attachment_list_limits() {
        let one = input("a.txt", "text/plain", &BASE64.encode(b"x"));
        assert!(check_attachment_list(&vec![one.clone(); MAX_ATTACHMENTS]).is_empty());
        assert_eq!(check_attachment_list(&vec![one; MAX_ATTACHMENTS + 1]).len(), 1);
    }
}
