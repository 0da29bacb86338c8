//! Group reference normalization.
//!
//! Turns free-text user input into a typed reference: numeric id, canonical
//! `@handle`, invite link, or raw passthrough. Never fails on malformed
//! input; worst case it degrades to [`NormalizedRef::Raw`] and the resolver
//! gets to try its luck. Only empty input is rejected.

use std::sync::OnceLock;

use regex::Regex;

use crate::{domain::NormalizedRef, Error, Result};

fn handle_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:https?://)?(?:t\.me/|telegram\.me/)?@?([A-Za-z0-9_]+)$")
            .expect("valid regex")
    })
}

fn invite_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:https?://)?t\.me/joinchat/[A-Za-z0-9_-]+$").expect("valid regex")
    })
}

/// Normalize user input into a typed group reference.
///
/// Priority: numeric id (including `-100...` broadcast/supergroup ids),
/// then link-or-handle, then invite link, then raw passthrough.
pub fn normalize(text: &str) -> Result<NormalizedRef> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyInput);
    }

    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        return match trimmed.parse::<i64>() {
            Ok(id) => Ok(NormalizedRef::Numeric(id)),
            // i64 overflow: pass the text through untouched rather than
            // letting the handle pattern mangle it into an @name.
            Err(_) => Ok(NormalizedRef::Raw(trimmed.to_string())),
        };
    }

    if let Some(caps) = handle_re().captures(trimmed) {
        return Ok(NormalizedRef::Handle(format!("@{}", &caps[1])));
    }

    if invite_re().is_match(trimmed) {
        // Invite links are recognized, never rewritten.
        return Ok(NormalizedRef::Invite(trimmed.to_string()));
    }

    Ok(NormalizedRef::Raw(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_parse_signed() {
        assert_eq!(
            normalize("-1001234567890").unwrap(),
            NormalizedRef::Numeric(-1001234567890)
        );
        assert_eq!(normalize("12345").unwrap(), NormalizedRef::Numeric(12345));
        assert_eq!(normalize(" -42 ").unwrap(), NormalizedRef::Numeric(-42));
    }

    #[test]
    fn handles_normalize_onto_at_form() {
        for input in ["@foo", "foo", "t.me/foo", "https://t.me/foo", "telegram.me/foo"] {
            assert_eq!(
                normalize(input).unwrap(),
                NormalizedRef::Handle("@foo".to_string()),
                "input: {input}"
            );
        }
    }

    #[test]
    fn invite_links_pass_through_verbatim() {
        let link = "https://t.me/joinchat/AbC123";
        assert_eq!(
            normalize(link).unwrap(),
            NormalizedRef::Invite(link.to_string())
        );
        assert_eq!(
            normalize("t.me/joinchat/a-b_c").unwrap(),
            NormalizedRef::Invite("t.me/joinchat/a-b_c".to_string())
        );
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(normalize(""), Err(Error::EmptyInput)));
        assert!(matches!(normalize("   "), Err(Error::EmptyInput)));
    }

    #[test]
    fn unrecognized_text_degrades_to_raw() {
        assert_eq!(
            normalize("some group title").unwrap(),
            NormalizedRef::Raw("some group title".to_string())
        );
        assert_eq!(
            normalize("https://example.com/x").unwrap(),
            NormalizedRef::Raw("https://example.com/x".to_string())
        );
    }

    #[test]
    fn overlong_digit_strings_degrade_to_raw_not_handle() {
        let huge = "9".repeat(40);
        assert_eq!(
            normalize(&huge).unwrap(),
            NormalizedRef::Raw(huge.clone())
        );

        let negative = format!("-{huge}");
        assert_eq!(
            normalize(&negative).unwrap(),
            NormalizedRef::Raw(negative.clone())
        );
    }
}
