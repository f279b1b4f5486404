//! HTML pages served by the verification flow

/// Minimal escaping for text and attribute values
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

const BASE_STYLE: &str = r#"
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            min-height: 100vh;
            margin: 0;
            background: linear-gradient(135deg, #1a1a2e 0%, #16213e 100%);
        }
        .container {
            background: white;
            padding: 40px;
            border-radius: 16px;
            box-shadow: 0 10px 40px rgba(0,0,0,0.2);
            text-align: center;
            max-width: 400px;
        }
        .icon {
            font-size: 60px;
            margin-bottom: 20px;
        }
        p { color: #666; }
        .note { color: #888; font-size: 14px; }
        .btn {
            display: inline-block;
            background: #5865F2;
            color: white;
            padding: 15px 30px;
            border: none;
            border-radius: 8px;
            text-decoration: none;
            font-weight: 600;
            font-size: 16px;
            cursor: pointer;
        }
        .btn:hover { background: #4752C4; }
"#;

fn layout(title: &str, head_extra: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{style}</style>
    {head_extra}
</head>
<body>
    <div class="container">
{body}
    </div>
</body>
</html>"#,
        title = title,
        style = BASE_STYLE,
        head_extra = head_extra,
        body = body
    )
}

/// CAPTCHA challenge rendered after the OAuth callback
pub fn verify_page(site_key: &str, user_id: &str, display_name: &str) -> String {
    let name = escape_html(display_name);
    layout(
        "Human Verification",
        r#"<script src="https://www.google.com/recaptcha/api.js" async defer></script>"#,
        &format!(
            r#"        <h1>Hello, {name}</h1>
        <p>Complete the check below to finish verifying.</p>
        <form method="POST" action="/verify">
            <input type="hidden" name="user_id" value="{user_id}">
            <input type="hidden" name="username" value="{name}">
            <div class="g-recaptcha" data-sitekey="{site_key}" style="display: inline-block; margin-bottom: 20px;"></div>
            <br>
            <button type="submit" class="btn">Verify</button>
        </form>"#,
            name = name,
            user_id = escape_html(user_id),
            site_key = escape_html(site_key)
        ),
    )
}

pub fn success_page() -> String {
    layout(
        "Verification Successful",
        "",
        r#"        <div class="icon">✓</div>
        <h1 style="color: #11998e;">Verification Successful!</h1>
        <p>Your role is being assigned.</p>
        <p class="note">You can now close this window and return to Discord.</p>"#,
    )
}

/// Shown when the CAPTCHA check fails; links to the support server if configured
pub fn failure_page(invite_url: Option<&str>, error_code: &str) -> String {
    let support = match invite_url {
        Some(url) => format!(
            r#"<p>Need help? Join the support server and ask for manual verification.</p>
        <a href="{}" class="btn">Open support server</a>"#,
            escape_html(url)
        ),
        None => "<p>Please contact a moderator for manual verification.</p>".to_string(),
    };

    layout(
        "Verification Failed",
        "",
        &format!(
            r#"        <div class="icon">✕</div>
        <h1 style="color: #f5576c;">Verification Failed</h1>
        <p class="note">Error: <code>{code}</code></p>
        {support}"#,
            code = escape_html(error_code),
            support = support
        ),
    )
}

pub fn error_page(message: &str) -> String {
    layout(
        "Verification Error",
        "",
        &format!(
            r#"        <div class="icon">✕</div>
        <h1 style="color: #f5576c;">Something went wrong</h1>
        <p>{}</p>
        <p class="note">Please try again or contact a moderator.</p>"#,
            escape_html(message)
        ),
    )
}
