use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TAG: Regex = Regex::new(r"<[^>]*>").expect("valid tag pattern");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid whitespace pattern");
    static ref SCRIPT_BLOCK: Regex = Regex::new(r"(?is)<script\b.*?</script\s*>").expect("valid script pattern");
    static ref STYLE_BLOCK: Regex = Regex::new(r"(?is)<style\b.*?</style\s*>").expect("valid style pattern");
}

/// Decode the handful of entities retailer markup actually uses.
pub fn decode_entities(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

pub fn strip_tags(value: &str) -> String {
    TAG.replace_all(value, "").into_owned()
}

pub fn normalize_whitespace(value: &str) -> String {
    WHITESPACE.replace_all(value, " ").trim().to_string()
}

/// Markup-free, entity-decoded, single-spaced text.
pub fn clean_text(value: &str) -> String {
    normalize_whitespace(&decode_entities(&strip_tags(value)))
}

/// Remove `<script>` and `<style>` blocks so their contents cannot be
/// mistaken for page text.
pub fn strip_scripts_and_styles(html: &str) -> String {
    let without_scripts = SCRIPT_BLOCK.replace_all(html, " ");
    STYLE_BLOCK.replace_all(&without_scripts, " ").into_owned()
}
