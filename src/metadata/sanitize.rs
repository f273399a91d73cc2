//! Header text clean-up before XML parsing
//!
//! The header is stored as interleaved double-byte code units. Only the low
//! byte of each unit is kept, then two kinds of content are removed:
//!
//! - every byte outside the 7-bit ASCII range, which guards against
//!   encoding corruption introduced by dropping the high bytes;
//! - inline, self-closing timestamp tags. Acquisitions can carry one tag
//!   per frame, which makes them by far the bulkiest part of the header
//!   while being useless for addressing pixels.
//!
//! When capture is requested, the values of the stripped timestamp tags are
//! recorded during the same pass, in the order they appear, together with
//! the innermost `Element` node enclosing each tag. Elements are numbered
//! in document pre-order, the same order the header walk detaches them in.

use std::sync::OnceLock;

use log::warn;
use regex::{Captures, Regex};
use serde::Serialize;

/// Timestamps captured from the raw header text, in order of appearance
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawTimestamps {
    /// Absolute timestamps, `(high << 32) + low`
    pub absolute: Vec<u64>,
    /// Relative timestamps in seconds
    pub relative: Vec<f64>,
    /// Pre-order index of the `Element` enclosing each absolute value
    #[serde(skip)]
    pub absolute_owners: Vec<Option<usize>>,
    /// Pre-order index of the `Element` enclosing each relative value
    #[serde(skip)]
    pub relative_owners: Vec<Option<usize>>,
}

impl RawTimestamps {
    /// Absolute values enclosed by the `Element` with pre-order index `element`
    pub fn absolute_in(&self, element: usize) -> Vec<u64> {
        owned_by(&self.absolute, &self.absolute_owners, element)
    }

    /// Relative values enclosed by the `Element` with pre-order index `element`
    pub fn relative_in(&self, element: usize) -> Vec<f64> {
        owned_by(&self.relative, &self.relative_owners, element)
    }
}

fn owned_by<T: Copy>(values: &[T], owners: &[Option<usize>], element: usize) -> Vec<T> {
    values
        .iter()
        .zip(owners)
        .filter(|(_, owner)| **owner == Some(element))
        .map(|(value, _)| *value)
        .collect()
}

/// Output of [`sanitize`]
#[derive(Debug, Clone)]
pub struct Sanitized {
    /// ASCII-only header text with the timestamp tags removed
    pub text: String,
    /// Values of the stripped tags, present only when capture was requested
    pub timestamps: Option<RawTimestamps>,
}

fn element_tags() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"<(?:(?P<close>/)Element\s*>|Element[\s/>])")
            .expect("element tag pattern is a valid regex")
    })
}

fn timestamp_tags() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(concat!(
            r#"<TimeStamp HighInteger="(?P<high>[0-9]*)" LowInteger="(?P<low>[0-9]*)"/>"#,
            r#"|<RelTimeStamp Time="(?P<time_a>[0-9.]*)" Frame="[0-9]*"/>"#,
            r#"|<RelTimeStamp Frame="[0-9]*" Time="(?P<time_b>[0-9.]*)"/>"#,
        ))
        .expect("timestamp tag pattern is a valid regex")
    })
}

/// Keep the low byte of each double-byte code unit
pub fn deinterleave(raw: &[u8]) -> Vec<u8> {
    raw.iter().step_by(2).copied().collect()
}

/// Strip non-ASCII bytes and inline timestamp tags
///
/// The result is a fixpoint: sanitizing already-sanitized text returns it
/// unchanged.
pub fn sanitize(raw: &[u8], capture: bool) -> Sanitized {
    let mut text: String = raw
        .iter()
        .filter(|b| b.is_ascii())
        .map(|&b| char::from(b))
        .collect();
    let mut timestamps = capture.then(RawTimestamps::default);

    // Removing a tag can splice its neighbours into a new match, so strip
    // until nothing matches.
    loop {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        let mut stripped = false;
        // Element tags are never part of a match, so their numbering is
        // the same on every pass
        let mut scope = timestamps.as_ref().map(|_| ElementScope::scan(&text));

        for caps in timestamp_tags().captures_iter(&text) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&text[last..whole.start()]);
            last = whole.end();
            stripped = true;
            if let Some(ts) = timestamps.as_mut() {
                let owner = scope.as_mut().and_then(|s| s.owner_at(whole.start()));
                record(ts, &caps, owner);
            }
        }

        if !stripped {
            break;
        }
        out.push_str(&text[last..]);
        text = out;
    }

    Sanitized { text, timestamps }
}

/// Combine the two halves of an absolute timestamp, `None` on overflow
pub(crate) fn join_ticks(high: u64, low: u64) -> Option<u64> {
    if high > u64::from(u32::MAX) {
        return None;
    }
    (high << 32).checked_add(low)
}

fn record(timestamps: &mut RawTimestamps, caps: &Captures, owner: Option<usize>) {
    let number = |name: &str| -> Option<u64> { caps.name(name)?.as_str().parse().ok() };

    if caps.name("high").is_some() {
        let high = number("high").unwrap_or(0);
        let low = number("low").unwrap_or(0);
        match join_ticks(high, low) {
            Some(ticks) => {
                timestamps.absolute.push(ticks);
                timestamps.absolute_owners.push(owner);
            }
            None => warn!("Skipping out-of-range timestamp {}:{}", high, low),
        }
        return;
    }

    let time = caps
        .name("time_a")
        .or_else(|| caps.name("time_b"))
        .and_then(|m| m.as_str().parse::<f64>().ok());
    if let Some(time) = time {
        timestamps.relative.push(time);
        timestamps.relative_owners.push(owner);
    }
}

/// Innermost open `Element` while walking the text forwards
struct ElementScope {
    /// `(position, Some(pre-order index))` for an opening tag, `None` for a closing one
    events: Vec<(usize, Option<usize>)>,
    next: usize,
    open: Vec<usize>,
}

impl ElementScope {
    fn scan(text: &str) -> Self {
        let mut events = Vec::new();
        let mut preorder = 0;
        for caps in element_tags().captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            if caps.name("close").is_some() {
                events.push((whole.start(), None));
                continue;
            }
            let index = preorder;
            preorder += 1;
            let self_closing = text[whole.start()..]
                .find('>')
                .map(|end| text[..whole.start() + end].ends_with('/'))
                .unwrap_or(false);
            if !self_closing {
                events.push((whole.start(), Some(index)));
            }
        }
        Self {
            events,
            next: 0,
            open: Vec::new(),
        }
    }

    /// Owner of `position`; positions must be queried in increasing order
    fn owner_at(&mut self, position: usize) -> Option<usize> {
        while let Some(&(at, event)) = self.events.get(self.next) {
            if at > position {
                break;
            }
            match event {
                Some(index) => self.open.push(index),
                None => {
                    self.open.pop();
                }
            }
            self.next += 1;
        }
        self.open.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const HEADER: &str = concat!(
        r#"<Data><TimeStampList>"#,
        r#"<TimeStamp HighInteger="1" LowInteger="2"/>"#,
        r#"<TimeStamp HighInteger="0" LowInteger="7"/>"#,
        r#"</TimeStampList>"#,
        r#"<RelTimeStamp Time="0.5" Frame="0"/>"#,
        r#"<RelTimeStamp Frame="1" Time="1.25"/>"#,
        r#"</Data>"#,
    );

    #[test]
    fn test_deinterleave() {
        let raw: Vec<u8> = "<A/>".bytes().flat_map(|b| [b, 0]).collect();
        assert_eq!(deinterleave(&raw), b"<A/>");
    }

    #[test]
    fn test_strips_timestamp_tags() {
        let out = sanitize(HEADER.as_bytes(), false);
        assert_eq!(out.text, "<Data><TimeStampList></TimeStampList></Data>");
        assert!(out.timestamps.is_none());
    }

    #[test]
    fn test_captures_timestamps_in_order() {
        let out = sanitize(HEADER.as_bytes(), true);
        let ts = out.timestamps.unwrap();
        assert_eq!(ts.absolute, vec![(1u64 << 32) + 2, 7]);
        assert_eq!(ts.relative, vec![0.5, 1.25]);
    }

    #[test]
    fn test_out_of_range_timestamp_is_skipped() {
        let text = concat!(
            r#"<A><TimeStamp HighInteger="1" LowInteger="18446744073709551615"/>"#,
            r#"<TimeStamp HighInteger="4294967296" LowInteger="0"/>"#,
            r#"<TimeStamp HighInteger="0" LowInteger="9"/></A>"#,
        );
        let out = sanitize(text.as_bytes(), true);
        assert_eq!(out.text, "<A></A>");
        let ts = out.timestamps.unwrap();
        assert_eq!(ts.absolute, vec![9]);
        assert_eq!(ts.absolute_owners.len(), 1);
    }

    #[test]
    fn test_join_ticks() {
        assert_eq!(join_ticks(1, 2), Some((1u64 << 32) + 2));
        assert_eq!(join_ticks(u64::from(u32::MAX), u64::from(u32::MAX)), Some(u64::MAX));
        assert_eq!(join_ticks(u64::from(u32::MAX), u64::from(u32::MAX) + 1), None);
        assert_eq!(join_ticks(1 << 32, 0), None);
    }

    #[test]
    fn test_timestamps_are_attributed_to_enclosing_element() {
        let text = concat!(
            r#"<H><Element Name="exp"><Children>"#,
            r#"<Element Name="a"><TimeStamp HighInteger="0" LowInteger="1"/>"#,
            r#"<Element Name="a.inner"/>"#,
            r#"<RelTimeStamp Time="0.5" Frame="0"/></Element>"#,
            r#"<Element Name="b"><TimeStamp HighInteger="0" LowInteger="2"/>"#,
            r#"<RelTimeStamp Frame="1" Time="2.5"/></Element>"#,
            r#"</Children></Element></H>"#,
        );
        let ts = sanitize(text.as_bytes(), true).timestamps.unwrap();
        assert_eq!(ts.absolute_in(1), vec![1]);
        assert_eq!(ts.relative_in(1), vec![0.5]);
        assert!(ts.absolute_in(2).is_empty());
        assert_eq!(ts.absolute_in(3), vec![2]);
        assert_eq!(ts.relative_in(3), vec![2.5]);
        assert!(ts.absolute_in(0).is_empty());
    }

    #[test]
    fn test_strips_non_ascii() {
        let raw = b"<A Name=\"caf\xe9\xff\"/>";
        assert_eq!(sanitize(raw, false).text, "<A Name=\"caf\"/>");
    }

    #[test]
    fn test_spliced_tags_are_stripped() {
        let spliced = concat!(
            r#"<TimeStamp HighInteger="1" Low"#,
            r#"<TimeStamp HighInteger="2" LowInteger="3"/>"#,
            r#"Integer="4"/><B/>"#,
        );
        assert_eq!(sanitize(spliced.as_bytes(), false).text, "<B/>");
    }

    #[test]
    fn test_non_matching_layout_is_kept() {
        let text = r#"<TimeStamp LowInteger="2" HighInteger="1"/>"#;
        assert_eq!(sanitize(text.as_bytes(), false).text, text);
    }

    proptest! {
        #[test]
        fn test_sanitize_is_idempotent(raw in prop::collection::vec(any::<u8>(), 0..400)) {
            let once = sanitize(&raw, false).text;
            let twice = sanitize(once.as_bytes(), false).text;
            prop_assert_eq!(&once, &twice);
            prop_assert!(once.is_ascii());
            prop_assert!(!timestamp_tags().is_match(&once));
        }

        #[test]
        fn test_sanitize_idempotent_with_tags(
            parts in prop::collection::vec(
                prop_oneof![
                    Just(r#"<TimeStamp HighInteger="3" LowInteger="9"/>"#.to_string()),
                    Just(r#"<RelTimeStamp Time="0.1" Frame="4"/>"#.to_string()),
                    Just(r#"<RelTimeStamp Frame="4" Time="0.1"/>"#.to_string()),
                    "[ -~]{0,12}",
                ],
                0..20,
            )
        ) {
            let raw = parts.concat();
            let once = sanitize(raw.as_bytes(), false).text;
            let twice = sanitize(once.as_bytes(), false).text;
            prop_assert_eq!(once, twice);
        }
    }
}
