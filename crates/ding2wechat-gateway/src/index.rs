//! Informational index page listing the configured receivers

use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header::HOST;
use axum::response::Html;
use ding2wechat_core::Config;

use crate::server::GatewayState;

/// Serve the index page. Also answers every path no other route matches.
pub async fn index_handler(State(state): State<GatewayState>, headers: HeaderMap) -> Html<String> {
    let url_base = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(|host| format!("http://{}", host))
        .unwrap_or_default();
    Html(render_index(&state.config, &url_base))
}

/// Render the receiver list, each entry prefixed with `url_base`
pub fn render_index(config: &Config, url_base: &str) -> String {
    let url_base = escape_html(url_base);
    let items: String = config
        .receivers()
        .iter()
        .map(|r| {
            format!(
                "<li><code>{}/receiver?name={}</code></li>\n",
                url_base,
                escape_html(&r.name)
            )
        })
        .collect();

    format!(
        "<html>\n\
         <head><title>DingTalk To WeChat</title></head>\n\
         <body>\n\
         <h1>DingTalk To WeChat</h1>\n\
         <h2>Receivers</h2>\n\
         <ul>\n{}</ul>\n\
         </body>\n\
         </html>\n",
        items
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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
