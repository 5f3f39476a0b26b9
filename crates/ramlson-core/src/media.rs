//! # Media Types and Content Negotiation
//!
//! Media type constants used by the renderers, and [`negotiate`], which picks
//! the representation to send from a request's `Accept` header.
//!
//! Negotiation follows RFC 9110 §12.5.1: each offered type takes the quality
//! of the most specific media range that matches it; `q=0` means "not
//! acceptable". Among acceptable offers the highest quality wins, then the
//! more specific matching range, then the earlier offer.

/// JSON media type.
pub const APPLICATION_JSON: &str = "application/json";

/// XML media type.
pub const APPLICATION_XML: &str = "application/xml";

/// Default content type of a fresh response.
pub const TEXT_HTML: &str = "text/html";

/// One media range from an `Accept` header.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRange {
    /// Top-level type, lower case, `*` for any.
    pub kind: String,
    /// Subtype, lower case, `*` for any.
    pub subtype: String,
    /// Quality value in `[0, 1]`.
    pub quality: f32,
}

impl MediaRange {
    /// Parse one comma-separated element of an `Accept` header.
    ///
    /// Returns `None` for elements that are not `type/subtype`.
    pub fn parse(element: &str) -> Option<Self> {
        let mut parts = element.split(';');
        let range = parts.next()?.trim();
        let (kind, subtype) = range.split_once('/')?;
        let (kind, subtype) = (kind.trim(), subtype.trim());
        if kind.is_empty() || subtype.is_empty() || (kind == "*" && subtype != "*") {
            return None;
        }

        let mut quality = 1.0;
        for param in parts {
            if let Some((name, value)) = param.split_once('=') {
                if name.trim().eq_ignore_ascii_case("q") {
                    quality = value.trim().parse::<f32>().ok()?.clamp(0.0, 1.0);
                }
            }
        }

        Some(Self {
            kind: kind.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            quality,
        })
    }

    /// Parse a full `Accept` header, skipping malformed elements.
    pub fn parse_header(header: &str) -> Vec<Self> {
        header.split(',').filter_map(Self::parse).collect()
    }

    /// Specificity of this range against a concrete media type, or `None`
    /// if it does not match. `*/*` is 0, `type/*` is 1, an exact match 2.
    pub fn specificity(&self, media_type: &str) -> Option<u8> {
        let essence = media_type.split(';').next().unwrap_or(media_type).trim();
        let (kind, subtype) = essence.split_once('/')?;
        if self.kind == "*" {
            return Some(0);
        }
        if !self.kind.eq_ignore_ascii_case(kind) {
            return None;
        }
        if self.subtype == "*" {
            return Some(1);
        }
        self.subtype.eq_ignore_ascii_case(subtype).then_some(2)
    }
}

/// Choose which of `offered` to send for the given `Accept` header.
///
/// A missing or blank header accepts anything, so the first offer is chosen.
/// Returns `None` when no offer is acceptable.
pub fn negotiate(accept: Option<&str>, offered: &[&'static str]) -> Option<&'static str> {
    let header = match accept.map(str::trim) {
        Some(h) if !h.is_empty() => h,
        _ => return offered.first().copied(),
    };

    let ranges = MediaRange::parse_header(header);
    if ranges.is_empty() {
        return offered.first().copied();
    }

    let mut best: Option<(&'static str, f32, u8)> = None;
    for &candidate in offered {
        let matched = ranges
            .iter()
            .filter_map(|r| r.specificity(candidate).map(|s| (r.quality, s)))
            .max_by_key(|&(_, s)| s);
        let Some((quality, specificity)) = matched else {
            continue;
        };
        if quality <= 0.0 {
            continue;
        }
        let better = match best {
            None => true,
            Some((_, q, s)) => quality > q || (quality == q && specificity > s),
        };
        if better {
            best = Some((candidate, quality, specificity));
        }
    }
    best.map(|(media_type, _, _)| media_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFERED: &[&str] = &[APPLICATION_JSON, APPLICATION_XML];

    #[test]
    fn missing_header_picks_first_offer() {
        assert_eq!(negotiate(None, OFFERED), Some(APPLICATION_JSON));
        assert_eq!(negotiate(Some("  "), OFFERED), Some(APPLICATION_JSON));
    }

    #[test]
    fn exact_match() {
        assert_eq!(negotiate(Some("application/xml"), OFFERED), Some(APPLICATION_XML));
    }

    #[test]
    fn wildcard_picks_first_offer() {
        assert_eq!(negotiate(Some("*/*"), OFFERED), Some(APPLICATION_JSON));
        assert_eq!(negotiate(Some("application/*"), OFFERED), Some(APPLICATION_JSON));
    }

    #[test]
    fn quality_ordering() {
        let accept = "application/json;q=0.5, application/xml;q=0.9";
        assert_eq!(negotiate(Some(accept), OFFERED), Some(APPLICATION_XML));
    }

    #[test]
    fn specific_range_overrides_wildcard_quality() {
        let accept = "*/*;q=0.8, application/json;q=0";
        assert_eq!(negotiate(Some(accept), OFFERED), Some(APPLICATION_XML));
    }

    #[test]
    fn browser_style_header() {
        let accept = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
        assert_eq!(negotiate(Some(accept), OFFERED), Some(APPLICATION_XML));
    }

    #[test]
    fn nothing_acceptable() {
        assert_eq!(negotiate(Some("text/csv"), OFFERED), None);
    }

    #[test]
    fn malformed_elements_are_skipped() {
        assert_eq!(negotiate(Some("garbage, application/xml"), OFFERED), Some(APPLICATION_XML));
        assert_eq!(negotiate(Some("garbage"), OFFERED), Some(APPLICATION_JSON));
    }

    #[test]
    fn parse_range_with_params() {
        let range = MediaRange::parse(" Application/JSON ; charset=utf-8; q=0.7").unwrap();
        assert_eq!(range.kind, "application");
        assert_eq!(range.subtype, "json");
        assert!((range.quality - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn reject_invalid_wildcard() {
        assert!(MediaRange::parse("*/json").is_none());
        assert!(MediaRange::parse("json").is_none());
    }

    #[test]
    fn specificity_levels() {
        let any = MediaRange::parse("*/*").unwrap();
        let app = MediaRange::parse("application/*").unwrap();
        let json = MediaRange::parse("application/json").unwrap();
        assert_eq!(any.specificity(APPLICATION_JSON), Some(0));
        assert_eq!(app.specificity(APPLICATION_JSON), Some(1));
        assert_eq!(json.specificity("application/json; charset=utf-8"), Some(2));
        assert_eq!(json.specificity(APPLICATION_XML), None);
    }
}
