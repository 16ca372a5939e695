use crate::result::BrokenReason;

/// Phrases that mark a rendered page as a not-found view.
pub const NOT_FOUND_PHRASES: [&str; 3] = ["404", "page not found", "not found"];

/// Decides whether a loaded page is broken.
///
/// The status check runs first; the text heuristic only applies to pages the
/// server did not already answer with 404. Client-rendered apps often serve
/// their error view with a 200.
pub fn classify(status: Option<u16>, visible_text: &str) -> Option<BrokenReason> {
    if status == Some(404) {
        return Some(BrokenReason::Status404);
    }
    if looks_not_found(visible_text) {
        return Some(BrokenReason::NotFoundText);
    }
    None
}

pub fn looks_not_found(visible_text: &str) -> bool {
    let text = visible_text.to_lowercase();
    NOT_FOUND_PHRASES.iter().any(|phrase| text.contains(phrase))
}
