/// Capability applied to raw request input before a handler sees it.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, raw: &str) -> String;
}

/// Escapes the HTML-significant characters, quotes included.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlEscape;

impl Sanitizer for HtmlEscape {
    fn sanitize(&self, raw: &str) -> String {
        let mut escaped = String::with_capacity(raw.len());
        for ch in raw.chars() {
            match ch {
                '&' => escaped.push_str("&amp;"),
                '<' => escaped.push_str("&lt;"),
                '>' => escaped.push_str("&gt;"),
                '"' => escaped.push_str("&quot;"),
                '\'' => escaped.push_str("&#039;"),
                other => escaped.push(other),
            }
        }
        escaped
    }
}

/// Leaves input untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Raw;

impl Sanitizer for Raw {
    fn sanitize(&self, raw: &str) -> String {
        raw.to_string()
    }
}
