//! Html directory listings.
use super::{empty, full, Reply};
use crate::{vfs::DirEntry, Response};
use headers::{ContentLength, ContentType, HeaderMapExt};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Bytes that can't appear verbatim in a relative href.
const HREF: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// A listing of the entries of one directory, in the order given.
///
/// Directories are suffixed with a `/`, so that following their link lands on the directory
/// itself rather than a redirect.
///
/// ```
/// use veil::{reply::{listing::Listing, Reply}, vfs::DirEntry};
///
/// let resp = Listing::new(vec![DirEntry {
///     name: "css".into(),
///     is_dir: true,
///     size: 0,
///     modified: None,
/// }])
/// .into_response();
///
/// assert_eq!("text/html; charset=utf-8", resp.headers()["content-type"]);
/// ```
#[derive(Clone, Debug)]
pub struct Listing {
    entries: Vec<DirEntry>,
    head: bool,
}

impl Listing {
    pub fn new(entries: Vec<DirEntry>) -> Self {
        let head = false;
        Self { entries, head }
    }

    /// Reply with headers only, as for a `HEAD` request.
    pub fn head_only(mut self) -> Self {
        self.head = true;
        self
    }

    /// Render the html document.
    pub fn render(&self) -> String {
        let mut out = String::from(
            "<!doctype html>\n<meta name=\"viewport\" content=\"width=device-width\">\n<pre>\n",
        );

        for e in &self.entries {
            let mut name = e.name.clone();
            if e.is_dir {
                name.push('/');
            }

            // a colon in the first segment would be read as a scheme
            let prefix = if name.contains(':') { "./" } else { "" };
            let href = utf8_percent_encode(&name, HREF);

            out.push_str(&format!(
                "<a href=\"{}{}\">{}</a>\n",
                prefix,
                href,
                escape(&name)
            ));
        }

        out.push_str("</pre>\n");
        out
    }
}

impl Reply for Listing {
    fn into_response(self) -> Response {
        let html = self.render();
        let len = html.len() as u64;

        let body = if self.head { empty() } else { full(html) };

        let mut resp = Response::new(body);
        let headers = resp.headers_mut();
        headers.typed_insert(ContentType::from(mime::TEXT_HTML_UTF_8));
        headers.typed_insert(ContentLength(len));
        resp
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());

    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }

    out
}
