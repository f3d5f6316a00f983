use std::sync::LazyLock;

use regex::Regex;

use crate::model::LayerNode;

/// Marker / comment / source-name form: `PH:3`, `PH_3`, `PH3`, optional
/// `_<label>` suffix, case-insensitive.
static PH_TAGGED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^PH[:_]?(\d+)(?:_(\w+))?").unwrap());

/// Legacy layer-name convention: first whitespace token only, case-sensitive.
static PH_LEGACY_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^PH_?(\d+)").unwrap());

/// Which identification strategy produced a match. Ordered by precedence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchVia {
    Marker,
    Comment,
    SourceName,
    LayerName,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaceholderMatch {
    /// Zero-based slot index (on-disk declarations are 1-based).
    pub index: usize,
    pub label: Option<String>,
    pub via: MatchVia,
}

/// Classify one layer as a placeholder slot or not.
///
/// Precedence, first match wins: timed-marker comment, then the layer comment,
/// then the name of the layer's source (`source_name`), then the legacy
/// layer-name convention. Marker metadata survives layer renames, which is why
/// it outranks everything name-derived.
pub fn locate(layer: &LayerNode, source_name: Option<&str>) -> Option<PlaceholderMatch> {
    if let Some(hit) = locate_marker_or_comment(layer) {
        return Some(hit);
    }

    if let Some(name) = source_name
        && let Some(hit) = match_tagged(name, MatchVia::SourceName)
    {
        return Some(hit);
    }

    // Legacy: "PH_1 hero video" is examined as just "PH_1".
    let first_token = layer.name.split_whitespace().next()?;
    let caps = PH_LEGACY_NAME.captures(first_token)?;
    let index = parse_slot_number(caps.get(1)?.as_str())?;
    Some(PlaceholderMatch {
        index,
        label: None,
        via: MatchVia::LayerName,
    })
}

/// The tamper-resistant subset used by manifest extraction: markers and the
/// layer comment, never name-derived forms.
pub fn locate_marker_or_comment(layer: &LayerNode) -> Option<PlaceholderMatch> {
    for marker in &layer.markers {
        if let Some(hit) = match_tagged(&marker.comment, MatchVia::Marker) {
            return Some(hit);
        }
    }

    if let Some(comment) = layer.comment.as_deref()
        && let Some(hit) = match_tagged(comment, MatchVia::Comment)
    {
        return Some(hit);
    }

    None
}

fn match_tagged(text: &str, via: MatchVia) -> Option<PlaceholderMatch> {
    let caps = PH_TAGGED.captures(text)?;
    let index = parse_slot_number(caps.get(1)?.as_str())?;
    Some(PlaceholderMatch {
        index,
        label: caps.get(2).map(|m| m.as_str().to_string()),
        via,
    })
}

/// Declared slot numbers are positive 1-based integers; internal indices are
/// zero-based.
fn parse_slot_number(digits: &str) -> Option<usize> {
    let n: usize = digits.parse().ok()?;
    if n == 0 { None } else { Some(n - 1) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LayerKind, LayerProps, Marker};

    fn layer(name: &str) -> LayerNode {
        LayerNode {
            name: name.to_string(),
            comment: None,
            markers: vec![],
            source: None,
            kind: LayerKind::Av,
            props: LayerProps::default(),
        }
    }

    fn marker(comment: &str) -> Marker {
        Marker {
            time_sec: 0.0,
            comment: comment.to_string(),
        }
    }

    #[test]
    fn marker_beats_conflicting_legacy_name() {
        let mut l = layer("PH_9 old name");
        l.markers.push(marker("PH:2_hero"));
        let hit = locate(&l, None).unwrap();
        assert_eq!(hit.index, 1);
        assert_eq!(hit.label.as_deref(), Some("hero"));
        assert_eq!(hit.via, MatchVia::Marker);
    }

    #[test]
    fn comment_beats_source_name_and_layer_name() {
        let mut l = layer("PH_9");
        l.comment = Some("ph_3".to_string());
        let hit = locate(&l, Some("PH:5")).unwrap();
        assert_eq!(hit.index, 2);
        assert_eq!(hit.via, MatchVia::Comment);
    }

    #[test]
    fn source_name_beats_layer_name() {
        let l = layer("PH_9");
        let hit = locate(&l, Some("ph4_intro.mp4")).unwrap();
        assert_eq!(hit.index, 3);
        assert_eq!(hit.label.as_deref(), Some("intro"));
        assert_eq!(hit.via, MatchVia::SourceName);
    }

    #[test]
    fn legacy_name_uses_first_token_case_sensitive() {
        assert_eq!(locate(&layer("PH_1 whatever"), None).unwrap().index, 0);
        assert_eq!(locate(&layer("PH7"), None).unwrap().index, 6);
        // Legacy form is case-sensitive.
        assert_eq!(locate(&layer("ph_1"), None), None);
        // Number must be in the first token.
        assert_eq!(locate(&layer("Layer PH_1"), None), None);
    }

    #[test]
    fn tagged_forms_are_case_insensitive() {
        let mut l = layer("plain");
        l.markers.push(marker("pH_12"));
        assert_eq!(locate(&l, None).unwrap().index, 11);
    }

    #[test]
    fn zero_and_garbage_are_rejected() {
        assert_eq!(locate(&layer("PH_0"), None), None);
        assert_eq!(locate(&layer("PHX"), None), None);
        let mut l = layer("plain");
        l.comment = Some("PH:0".to_string());
        assert_eq!(locate(&l, None), None);
    }

    #[test]
    fn extraction_subset_ignores_names() {
        let l = layer("PH_4");
        assert_eq!(locate_marker_or_comment(&l), None);
        assert!(locate(&l, None).is_some());
    }
}
