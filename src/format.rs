use once_cell::sync::Lazy;
use regex::Regex;

/// Matches one complete fenced code block, delimiters included.
/// A trailing unterminated fence never matches, so it falls through as
/// plain text instead of depending on incidental split behavior.
static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```.*?```").expect("fence regex is valid"));

const FENCE: &str = "```";

/// One piece of a message after fence splitting, in original order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Plain text outside any fence, passed through untouched.
    Text(String),
    /// The inside of one fenced block, delimiters stripped and body trimmed.
    Code {
        language: Option<String>,
        body: String,
    },
}

/// Split message content into alternating plain and fenced segments.
///
/// The first line inside a fence is taken as a language tag when it contains
/// no whitespace; otherwise the whole block is untagged code.
pub fn split_segments(content: &str) -> Vec<Segment> {
    if !content.contains(FENCE) {
        return vec![Segment::Text(content.to_string())];
    }

    let mut segments = Vec::new();
    let mut cursor = 0;

    for m in FENCED_BLOCK.find_iter(content) {
        if m.start() > cursor {
            segments.push(Segment::Text(content[cursor..m.start()].to_string()));
        }
        segments.push(parse_fenced(m.as_str()));
        cursor = m.end();
    }

    // Anything after the last complete block, including a dangling fence,
    // stays plain text.
    if cursor < content.len() {
        segments.push(Segment::Text(content[cursor..].to_string()));
    }

    segments
}

fn parse_fenced(block: &str) -> Segment {
    let inner = block[FENCE.len()..block.len() - FENCE.len()].trim();

    let first_line = inner.lines().next().unwrap_or("");
    let tag = first_line.trim();

    // A whitespace-free first line is a language tag, even when nothing
    // follows it; otherwise the whole block is untagged code.
    if !tag.is_empty() && !tag.chars().any(char::is_whitespace) {
        Segment::Code {
            language: Some(tag.to_string()),
            body: inner[first_line.len()..].trim().to_string(),
        }
    } else {
        Segment::Code {
            language: None,
            body: inner.to_string(),
        }
    }
}

/// Convert raw message content into displayable markup.
///
/// Content without a fence marker is returned unchanged; plain segments are
/// never escaped here. Each fenced block becomes a `<pre>` element carrying
/// the language tag, with the code body HTML-escaped.
pub fn format_content(content: &str) -> String {
    if !content.contains(FENCE) {
        return content.to_string();
    }

    split_segments(content)
        .into_iter()
        .map(|segment| match segment {
            Segment::Text(text) => text,
            Segment::Code { language, body } => format!(
                "<pre data-language=\"{}\"><code>{}</code></pre>",
                language.unwrap_or_default(),
                escape_html(&body)
            ),
        })
        .collect()
}

/// Escape the five HTML-special characters inside code bodies.
fn escape_html(code: &str) -> String {
    let mut escaped = String::with_capacity(code.len());
    for c in code.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through_unchanged() {
        assert_eq!(format_content("no code here"), "no code here");
        assert_eq!(format_content(""), "");
    }

    #[test]
    fn plain_text_is_never_escaped() {
        let input = "a < b && c > d";
        assert_eq!(format_content(input), input);
        // Already-escaped text outside a fence must not be escaped again.
        let escaped = "a &lt; b &amp;&amp; c &gt; d";
        assert_eq!(format_content(escaped), escaped);
    }

    #[test]
    fn tagged_block_extracts_language() {
        let input = "Hello ```js\nconsole.log(1)\n``` world";
        assert_eq!(
            format_content(input),
            "Hello <pre data-language=\"js\"><code>console.log(1)</code></pre> world"
        );
    }

    #[test]
    fn first_line_with_whitespace_stays_in_body() {
        let input = "```let x = 1;\nlet y = 2;```";
        assert_eq!(
            format_content(input),
            "<pre data-language=\"\"><code>let x = 1;\nlet y = 2;</code></pre>"
        );
    }

    #[test]
    fn code_body_is_html_escaped() {
        let input = "```html\n<a href=\"x\">&'</a>\n```";
        assert_eq!(
            format_content(input),
            "<pre data-language=\"html\"><code>&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;</code></pre>"
        );
    }

    #[test]
    fn unterminated_fence_is_plain_text() {
        let input = "text ```abc";
        assert_eq!(format_content(input), input);
        assert_eq!(
            split_segments(input),
            vec![Segment::Text("text ```abc".to_string())]
        );
    }

    #[test]
    fn dangling_fence_after_complete_block_is_plain_text() {
        let input = "```rs\nfn main() {}\n``` tail ```left over";
        assert_eq!(
            format_content(input),
            "<pre data-language=\"rs\"><code>fn main() {}</code></pre> tail ```left over"
        );
    }

    #[test]
    fn multiple_blocks_keep_original_order() {
        let input = "a ```py\nx = 1\n``` b ```sh\nls\n``` c";
        let segments = split_segments(input);
        assert_eq!(segments.len(), 5);
        assert_eq!(segments[0], Segment::Text("a ".to_string()));
        assert_eq!(
            segments[1],
            Segment::Code {
                language: Some("py".to_string()),
                body: "x = 1".to_string(),
            }
        );
        assert_eq!(segments[2], Segment::Text(" b ".to_string()));
        assert_eq!(
            segments[3],
            Segment::Code {
                language: Some("sh".to_string()),
                body: "ls".to_string(),
            }
        );
        assert_eq!(segments[4], Segment::Text(" c".to_string()));
    }

    #[test]
    fn single_token_block_is_a_bare_tag() {
        assert_eq!(
            format_content("```js```"),
            "<pre data-language=\"js\"><code></code></pre>"
        );
    }

    #[test]
    fn empty_block_is_untagged_empty_code() {
        assert_eq!(
            format_content("``````"),
            "<pre data-language=\"\"><code></code></pre>"
        );
    }
}
