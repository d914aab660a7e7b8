use once_cell::sync::Lazy;
use regex::Regex;

static BOLD_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?(strong|b)>").expect("Invalid regex"));
static ITALIC_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?(em|i)>").expect("Invalid regex"));
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("Invalid regex"));

/// Turns search-snippet HTML into Markdown: bold and italic tags become
/// `**` and `*`, any other tag is dropped. Entities are left as they are.
pub fn html_to_markdown(text: &str) -> String {
    let text = BOLD_TAG.replace_all(text, "**");
    let text = ITALIC_TAG.replace_all(&text, "*");
    ANY_TAG.replace_all(&text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bold_and_italic_tags_become_markdown() {
        assert_eq!(html_to_markdown("<b>Rust</b>"), "**Rust**");
        assert_eq!(
            html_to_markdown("<strong>fast</strong> and <em>safe</em>"),
            "**fast** and *safe*"
        );
        assert_eq!(html_to_markdown("<i>x</i>"), "*x*");
    }

    #[test]
    fn other_tags_are_removed_with_contents_kept() {
        assert_eq!(
            html_to_markdown(
                r#"<a href="https://x.example">link</a> <span class="y">text</span><br/>"#
            ),
            "link text"
        );
    }

    #[test]
    fn attributes_on_emphasis_tags_fall_through_to_removal() {
        assert_eq!(html_to_markdown(r#"<b class="hl">Rust</b>"#), "Rust**");
    }

    #[test]
    fn tag_matching_is_case_sensitive() {
        assert_eq!(html_to_markdown("<B>loud</B>"), "loud");
    }

    #[test]
    fn plain_text_is_unchanged() {
        for text in ["", "plain text", "1 <> 2", "x >= y", "**already** *marked*"] {
            assert_eq!(html_to_markdown(text), text);
        }
    }

    #[test]
    fn no_tags_survive() {
        let out = html_to_markdown(
            "<div><p>Intro <b>bold</b></p><ul><li><i>item</i></li></ul></div>",
        );
        assert_eq!(out, "Intro **bold***item*");
        assert!(!ANY_TAG.is_match(&out));
    }

    #[test]
    fn entities_are_not_decoded() {
        // Known limitation: snippets keep their HTML entities.
        assert_eq!(html_to_markdown("Tom &amp; Jerry &lt;3"), "Tom &amp; Jerry &lt;3");
    }
}
