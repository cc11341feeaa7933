//! Link title prefetch for the recent-sends list.

use std::time::Duration;

use regex::Regex;

use crate::{errors::Error, Result};

/// Only the head of a page is needed to find its title.
const MAX_HTML_BYTES: usize = 256 * 1024;

#[derive(Clone, Debug)]
pub struct LinkPreviewer {
    http: reqwest::Client,
}

impl LinkPreviewer {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("SwiftShift link preview")
            .build()
            .map_err(|e| Error::External(format!("preview client build error: {e}")))?;
        Ok(Self { http })
    }

    /// Best-effort page title; `None` on any network or parse failure.
    pub async fn title(&self, url: &str) -> Option<String> {
        match self.fetch_html(url).await {
            Ok(html) => extract_title(&html),
            Err(e) => {
                tracing::debug!(url, error = %e, "link preview failed");
                None
            }
        }
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::External(format!("not an http url: {url}")));
        }

        let mut resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::External(format!("preview request error: {e}")))?;
        if !resp.status().is_success() {
            return Err(Error::External(format!(
                "preview request failed: {}",
                resp.status()
            )));
        }

        let mut body = Vec::new();
        while body.len() < MAX_HTML_BYTES {
            let chunk = resp
                .chunk()
                .await
                .map_err(|e| Error::External(format!("preview body error: {e}")))?;
            match chunk {
                Some(bytes) => body.extend_from_slice(&bytes),
                None => break,
            }
        }
        body.truncate(MAX_HTML_BYTES);
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// `og:title` if present, otherwise the `<title>` element.
pub fn extract_title(html: &str) -> Option<String> {
    let og = Regex::new(
        r#"(?is)<meta\s[^>]*property\s*=\s*["']og:title["'][^>]*content\s*=\s*["']([^"']*)["']"#,
    )
    .ok()?;
    let og_reversed = Regex::new(
        r#"(?is)<meta\s[^>]*content\s*=\s*["']([^"']*)["'][^>]*property\s*=\s*["']og:title["']"#,
    )
    .ok()?;
    let title = Regex::new(r"(?is)<title[^>]*>(.*?)</title>").ok()?;

    [og, og_reversed, title]
        .iter()
        .filter_map(|re| re.captures(html))
        .filter_map(|c| c.get(1).map(|m| clean(m.as_str())))
        .find(|t| !t.is_empty())
}

fn clean(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_open_graph_title() {
        let html = r#"<html><head>
            <title>Fallback</title>
            <meta property="og:title" content="Rust &amp; Friends">
        </head></html>"#;
        assert_eq!(extract_title(html).as_deref(), Some("Rust & Friends"));
    }

    #[test]
    fn accepts_content_before_property() {
        let html = r#"<meta content="Swapped" property="og:title" />"#;
        assert_eq!(extract_title(html).as_deref(), Some("Swapped"));
    }

    #[test]
    fn falls_back_to_title_element() {
        let html = "<head><TITLE>\n  Hello\n  World </TITLE></head>";
        assert_eq!(extract_title(html).as_deref(), Some("Hello World"));
        assert_eq!(extract_title("<p>no title</p>"), None);
        assert_eq!(extract_title("<title>   </title>"), None);
    }

    #[tokio::test]
    async fn stops_reading_once_the_head_is_in() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut req = [0u8; 4096];
            let _ = sock.read(&mut req).await;
            let head: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\
                Content-Length: 10000000\r\n\r\n\
                <html><head><title>Big Page</title></head><body>";
            let _ = sock.write_all(head).await;
            let _ = sock
                .write_all(&vec![b'a'; MAX_HTML_BYTES + 64 * 1024])
                .await;
            // Never finish the advertised body.
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let p = LinkPreviewer::new(Duration::from_secs(20)).unwrap();
        let title = tokio::time::timeout(
            Duration::from_secs(5),
            p.title(&format!("http://{addr}/")),
        )
        .await
        .expect("preview waited for the whole body");
        assert_eq!(title.as_deref(), Some("Big Page"));
        server.abort();
    }

    #[tokio::test]
    async fn non_http_urls_are_skipped() {
        let p = LinkPreviewer::new(Duration::from_millis(50)).unwrap();
        assert_eq!(p.title("chrome://settings").await, None);
    }
}
