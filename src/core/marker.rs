//! Marker sentinels.
//!
//! A marker is written into the document as plain ASCII letters and digits so
//! that it survives an external format conversion untouched. Insertion
//! produces sentinels through [`Marker`]'s `Display` impl and the compositor
//! recognises them through [`split_sentinels`]; nothing else in the crate
//! spells the sentinel text out.

use super::MarkerId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MarkerKind {
    HighlightEnd,
    HighlightStart,
    Annotation,
}

impl MarkerKind {
    pub const ALL: [MarkerKind; 3] = [
        MarkerKind::HighlightEnd,
        MarkerKind::HighlightStart,
        MarkerKind::Annotation,
    ];

    fn prefix(self) -> &'static str {
        match self {
            MarkerKind::HighlightStart => "HLSTART",
            MarkerKind::HighlightEnd => "HLEND",
            MarkerKind::Annotation => "ANNMARKER",
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            MarkerKind::HighlightStart | MarkerKind::HighlightEnd => "ENDHL",
            MarkerKind::Annotation => "ENDMARKER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Marker {
    pub kind: MarkerKind,
    pub id: MarkerId,
}

impl Marker {
    pub fn start(id: MarkerId) -> Self {
        Self {
            kind: MarkerKind::HighlightStart,
            id,
        }
    }

    pub fn end(id: MarkerId) -> Self {
        Self {
            kind: MarkerKind::HighlightEnd,
            id,
        }
    }

    pub fn annotation(id: MarkerId) -> Self {
        Self {
            kind: MarkerKind::Annotation,
            id,
        }
    }

    pub fn sentinel(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.kind.prefix(), self.id.0, self.kind.suffix())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Marker(Marker),
}

/// Splits `text` into plain runs and markers, left to right.
///
/// Text that only resembles a sentinel (missing digits, missing suffix, id out
/// of range) stays text.
pub fn split_sentinels(text: &str) -> Segments<'_> {
    Segments { text, pos: 0 }
}

/// Returns true if `text` contains at least one well-formed sentinel.
pub fn contains_sentinel(text: &str) -> bool {
    split_sentinels(text).any(|segment| matches!(segment, Segment::Marker(_)))
}

pub struct Segments<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.text.len() {
            return None;
        }
        let rest = &self.text[self.pos..];
        let found = rest
            .match_indices(['H', 'A'])
            .find_map(|(index, _)| parse_sentinel(&rest[index..]).map(|hit| (index, hit)));

        match found {
            Some((0, (marker, len))) => {
                self.pos += len;
                Some(Segment::Marker(marker))
            }
            Some((index, _)) => {
                self.pos += index;
                Some(Segment::Text(&rest[..index]))
            }
            None => {
                self.pos = self.text.len();
                Some(Segment::Text(rest))
            }
        }
    }
}

fn parse_sentinel(candidate: &str) -> Option<(Marker, usize)> {
    for kind in MarkerKind::ALL {
        let Some(rest) = candidate.strip_prefix(kind.prefix()) else {
            continue;
        };
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            continue;
        }
        let Ok(id) = rest[..digits].parse::<u32>() else {
            continue;
        };
        if rest[digits..].starts_with(kind.suffix()) {
            let len = kind.prefix().len() + digits + kind.suffix().len();
            return Some((
                Marker {
                    kind,
                    id: MarkerId(id),
                },
                len,
            ));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_text_is_alphanumeric() {
        for kind in MarkerKind::ALL {
            let marker = Marker {
                kind,
                id: MarkerId(42),
            };
            assert!(marker.sentinel().chars().all(|c| c.is_ascii_alphanumeric()));
        }
        assert_eq!(Marker::start(MarkerId(7)).sentinel(), "HLSTART7ENDHL");
        assert_eq!(Marker::end(MarkerId(7)).sentinel(), "HLEND7ENDHL");
        assert_eq!(
            Marker::annotation(MarkerId(7)).sentinel(),
            "ANNMARKER7ENDMARKER"
        );
    }

    #[test]
    fn test_split_mixed_text() {
        let text = format!(
            "Hello {}world{}{}!",
            Marker::start(MarkerId(0)),
            Marker::end(MarkerId(0)),
            Marker::annotation(MarkerId(0))
        );
        let segments: Vec<_> = split_sentinels(&text).collect();
        assert_eq!(
            segments,
            vec![
                Segment::Text("Hello "),
                Segment::Marker(Marker::start(MarkerId(0))),
                Segment::Text("world"),
                Segment::Marker(Marker::end(MarkerId(0))),
                Segment::Marker(Marker::annotation(MarkerId(0))),
                Segment::Text("!"),
            ]
        );
    }

    #[test]
    fn test_near_misses_stay_text() {
        for text in [
            "HLSTART",
            "HLSTARTENDHL",
            "HLSTART12",
            "HLEND3ENDMARKER",
            "ANNMARKER1ENDHL",
            "HLSTART99999999999ENDHL",
        ] {
            let segments: Vec<_> = split_sentinels(text).collect();
            assert_eq!(segments, vec![Segment::Text(text)], "input {text:?}");
        }
    }

    #[test]
    fn test_adjacent_near_miss_then_marker() {
        let text = "AHLSTART1ENDHL";
        let segments: Vec<_> = split_sentinels(text).collect();
        assert_eq!(
            segments,
            vec![
                Segment::Text("A"),
                Segment::Marker(Marker::start(MarkerId(1)))
            ]
        );
        assert!(contains_sentinel(text));
        assert!(!contains_sentinel("Hello Alice"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(split_sentinels("").next(), None);
    }
}
