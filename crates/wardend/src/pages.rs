//! Minimal HTML for the login and app pages.

pub fn login_page(ai_name: &str, error: Option<&str>) -> String {
    let error_html = error
        .map(|e| format!("<p class=\"error\">{}</p>", escape(e)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{name}</title></head>
<body>
<h1>{name}</h1>
{error_html}
<form method="post" action="/login">
  <input type="password" name="code" placeholder="Access code" autofocus>
  <button type="submit">Enter</button>
</form>
</body>
</html>
"#,
        name = escape(ai_name),
        error_html = error_html,
    )
}

pub fn app_page(ai_name: &str, user_limit: u32) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{name}</title></head>
<body>
<h1>{name}</h1>
<p>You can send up to {limit} prompts. Use <code>/imagine</code> for images and <code>/code</code> for code.</p>
<form method="post" action="/api/chat">
  <textarea name="prompt"></textarea>
  <button type="submit">Send</button>
</form>
<form method="post" action="/api/feedback">
  <input type="text" name="message" placeholder="Feedback">
  <button type="submit">Send feedback</button>
</form>
</body>
</html>
"#,
        name = escape(ai_name),
        limit = user_limit,
    )
}

fn escape(text: &str) -> String {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_page_error() {
        let html = login_page("Warden AI", Some("Invalid Access Code"));
        assert!(html.contains("Invalid Access Code"));
        assert!(html.contains("name=\"code\""));
        assert!(!login_page("Warden AI", None).contains("class=\"error\""));
    }

    #[test]
    fn test_app_page_shows_limit_and_escapes_name() {
        let html = app_page("<Nova>", 50);
        assert!(html.contains("up to 50 prompts"));
        assert!(html.contains("&lt;Nova&gt;"));
    }
}
