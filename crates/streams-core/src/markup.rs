//! Tiny HTML helpers shared by the built-in field types.

/// Escape text for use in element content or a double-quoted attribute.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// `<input>` with escaped attributes. `placeholder` is omitted when empty.
pub fn input(kind: &str, name: &str, value: &str, placeholder: Option<&str>) -> String {
    let mut html = format!(
        r#"<input type="{}" name="{}" id="{}" value="{}""#,
        escape(kind),
        escape(name),
        escape(name),
        escape(value)
    );
    if let Some(p) = placeholder.filter(|p| !p.is_empty()) {
        html.push_str(&format!(r#" placeholder="{}""#, escape(p)));
    }
    html.push_str(" />");
    html
}

/// `<select>` over `(value, label)` options with `selected` marking.
pub fn select(name: &str, options: &[(String, String)], selected: Option<&str>) -> String {
    let mut html = format!(r#"<select name="{}" id="{}">"#, escape(name), escape(name));
    for (value, label) in options {
        let mark = if selected == Some(value.as_str()) {
            " selected"
        } else {
            ""
        };
        html.push_str(&format!(
            r#"<option value="{}"{mark}>{}</option>"#,
            escape(value),
            escape(label)
        ));
    }
    html.push_str("</select>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_special_characters() {
        assert_eq!(escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn input_omits_empty_placeholder() {
        let html = input("text", "ns-blog-title", "Hi", Some(""));
        assert_eq!(
            html,
            r#"<input type="text" name="ns-blog-title" id="ns-blog-title" value="Hi" />"#
        );
    }

    #[test]
    fn select_marks_selected_option() {
        let opts = vec![
            ("1".to_string(), "admin".to_string()),
            ("2".to_string(), "editor".to_string()),
        ];
        let html = select("author", &opts, Some("2"));
        assert!(html.contains(r#"<option value="2" selected>editor</option>"#));
        assert!(html.contains(r#"<option value="1">admin</option>"#));
    }
}
