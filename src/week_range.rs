use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Highest week number a descriptor can name. Tokens reaching past it are
/// dropped rather than expanded.
pub const MAX_WEEK: u32 = 53;

static WEEK_RANGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Sem\s+\d:\s+(.*)$").unwrap());

/// Expands week notation such as `"Sem 1: 1-3,5,7-9"` into the weeks it names.
///
/// Text without the `Sem <n>:` prefix names no weeks. Tokens that are not a
/// single number or an ascending `a-b` pair are dropped, so `"Sem 1: 1-,3"`
/// is `{3}`. So are tokens naming a week beyond [`MAX_WEEK`].
pub fn expand(text: &str) -> BTreeSet<u32> {
    let Some(ranges) = WEEK_RANGE.captures(text).and_then(|captures| captures.get(1)) else {
        log::debug!("Ignoring week descriptor {text:?}");
        return BTreeSet::new();
    };

    ranges
        .as_str()
        .split(',')
        .filter_map(|token| {
            let range = parse_token(token);
            if range.is_none() {
                log::debug!("Ignoring week token {token:?} in {text:?}");
            }
            range
        })
        .flatten()
        .collect()
}

fn parse_token(token: &str) -> Option<std::ops::RangeInclusive<u32>> {
    let mut bounds = token.split('-').map(|bound| bound.trim().parse::<u32>().ok());

    let start = bounds.next()??;
    let end = match bounds.next() {
        None => start,
        Some(end) => end?,
    };

    if bounds.next().is_some() || end > MAX_WEEK {
        return None;
    }

    Some(start..=end)
}
