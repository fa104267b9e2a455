//! Tolerant metadata extraction from JATS full-text XML.
//!
//! PMC serves article full text as JATS: a `<front>` block carrying journal
//! and article metadata, a `<body>`, and optional back matter. Real-world
//! documents omit almost any substructure, so every lookup here degrades to
//! an absent value instead of failing, and a parse error partway through
//! keeps whatever was collected up to that point.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::models::ArticleMetadata;

/// Walk the document tree and pull out whatever metadata is present.
///
/// Never fails: the worst case is an empty [`ArticleMetadata`].
pub fn extract_metadata(xml: &str) -> ArticleMetadata {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut walker = Walker::default();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => walker.open(&e, false),
            Ok(Event::Empty(e)) => walker.open(&e, true),
            Ok(Event::Text(t)) => {
                let text = t.unescape().unwrap_or_default();
                walker.text(&text);
            }
            Ok(Event::CData(t)) => {
                let text = String::from_utf8_lossy(&t.into_inner()).into_owned();
                walker.text(&text);
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                walker.close(&name);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::debug!("stopping extraction on malformed XML: {e}");
                break;
            }
            _ => {}
        }
    }
    walker.finish()
}

/// Strip JATS markup, keeping paragraph and section boundaries.
///
/// Block elements (`p`, `sec`, `title`, `abstract`, ...) become blank-line
/// separated paragraphs, which puts section headings on their own line.
pub fn to_plain_text(xml: &str) -> String {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if is_block(e.local_name().as_ref()) {
                    flush(&mut paragraphs, &mut current);
                }
            }
            Ok(Event::End(e)) => {
                if is_block(e.local_name().as_ref()) {
                    flush(&mut paragraphs, &mut current);
                }
            }
            Ok(Event::Text(t)) => {
                push_joined(&mut current, &t.unescape().unwrap_or_default());
            }
            Ok(Event::CData(t)) => {
                push_joined(&mut current, &String::from_utf8_lossy(&t.into_inner()));
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
    }
    flush(&mut paragraphs, &mut current);

    paragraphs.join("\n\n")
}

fn is_block(name: &[u8]) -> bool {
    matches!(
        name,
        b"p" | b"sec"
            | b"title"
            | b"abstract"
            | b"body"
            | b"front"
            | b"back"
            | b"article-title"
            | b"caption"
            | b"fig"
            | b"table-wrap"
            | b"label"
            | b"list-item"
            | b"ref"
    )
}

fn flush(paragraphs: &mut Vec<String>, current: &mut String) {
    if !current.is_empty() {
        paragraphs.push(std::mem::take(current));
    }
}

/// Append `text` to `buf` with a single separating space.
///
/// Mixed content arrives as separate events with boundary whitespace
/// trimmed away, so fragments are re-joined with one space.
fn push_joined(buf: &mut String, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    if !buf.is_empty() {
        buf.push(' ');
    }
    buf.push_str(text);
}

fn non_empty(buf: String) -> Option<String> {
    let trimmed = buf.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn attr(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

type DateParts = (Option<String>, Option<String>, Option<String>);

/// Streaming walker over the JATS element tree.
///
/// Tracks the element path plus a handful of per-field accumulators; each
/// field lands in the metadata when its element closes, so a document cut
/// off mid-stream still yields everything that closed before the cut.
#[derive(Default)]
struct Walker {
    path: Vec<String>,
    meta: ArticleMetadata,

    title_buf: String,
    title_done: bool,
    journal_buf: String,
    journal_done: bool,
    jid_buf: String,
    journal_id_type: Option<String>,
    aid_buf: String,
    article_id_type: Option<String>,

    pub_type: Option<String>,
    year_buf: String,
    month_buf: String,
    day_buf: String,
    dates: Vec<(String, DateParts)>,

    in_author: bool,
    surname_buf: String,
    given_buf: String,
    name_initials: Option<String>,

    in_abstract: bool,
    abstract_done: bool,
    para_buf: String,
    paragraphs: Vec<String>,

    kwd_buf: String,
}

impl Walker {
    /// Path contains `want` as an in-order subsequence, so intermediate
    /// wrapper elements never break a match.
    fn within(&self, want: &[&str]) -> bool {
        let mut path = self.path.iter();
        want.iter().all(|w| path.any(|p| p == w))
    }

    fn open(&mut self, e: &BytesStart, empty: bool) {
        let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();

        match name.as_str() {
            "article-id" if self.within(&["article-meta"]) => {
                self.article_id_type = attr(e, b"pub-id-type");
                self.aid_buf.clear();
            }
            "journal-id" if self.within(&["journal-meta"]) => {
                self.journal_id_type = attr(e, b"journal-id-type");
                self.jid_buf.clear();
            }
            "pub-date" if self.within(&["article-meta"]) => {
                self.pub_type = attr(e, b"pub-type");
                self.year_buf.clear();
                self.month_buf.clear();
                self.day_buf.clear();
            }
            "contrib" if self.within(&["article-meta", "contrib-group"]) => {
                self.in_author = attr(e, b"contrib-type").as_deref() == Some("author");
                self.surname_buf.clear();
                self.given_buf.clear();
                self.name_initials = None;
            }
            "name" if self.in_author => {
                self.name_initials = attr(e, b"initials");
            }
            "abstract" if self.within(&["article-meta"]) && !self.abstract_done => {
                self.in_abstract = true;
            }
            _ => {}
        }

        self.path.push(name);
        if empty {
            let name = self.path.last().cloned().unwrap_or_default();
            self.close(&name);
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_abstract {
            push_joined(&mut self.para_buf, text);
        } else if !self.title_done
            && self.within(&["article-meta", "title-group", "article-title"])
        {
            push_joined(&mut self.title_buf, text);
        } else if !self.journal_done && self.within(&["journal-meta", "journal-title"]) {
            push_joined(&mut self.journal_buf, text);
        } else if self.within(&["journal-meta", "journal-id"]) {
            push_joined(&mut self.jid_buf, text);
        } else if self.within(&["article-meta", "article-id"]) {
            push_joined(&mut self.aid_buf, text);
        } else if self.within(&["article-meta", "kwd-group", "kwd"]) {
            push_joined(&mut self.kwd_buf, text);
        } else if self.in_author && self.within(&["name", "surname"]) {
            push_joined(&mut self.surname_buf, text);
        } else if self.in_author && self.within(&["name", "given-names"]) {
            push_joined(&mut self.given_buf, text);
        } else if self.within(&["article-meta", "pub-date", "year"]) {
            push_joined(&mut self.year_buf, text);
        } else if self.within(&["article-meta", "pub-date", "month"]) {
            push_joined(&mut self.month_buf, text);
        } else if self.within(&["article-meta", "pub-date", "day"]) {
            push_joined(&mut self.day_buf, text);
        }
    }

    fn close(&mut self, name: &str) {
        // Dispatch before popping so the path still includes the element.
        match name {
            "article-id" if self.within(&["article-meta", "article-id"]) => {
                let value = non_empty(std::mem::take(&mut self.aid_buf));
                match self.article_id_type.take().as_deref() {
                    Some("doi") => self.meta.doi = self.meta.doi.take().or(value),
                    Some("pmid") => self.meta.pmid = self.meta.pmid.take().or(value),
                    Some("pmcid") => self.meta.pmcid = self.meta.pmcid.take().or(value),
                    _ => {}
                }
            }
            "journal-id" if self.within(&["journal-meta", "journal-id"]) => {
                let value = non_empty(std::mem::take(&mut self.jid_buf));
                if let Some(value) = value {
                    if matches!(
                        self.journal_id_type.take().as_deref(),
                        Some("nlm-ta") | Some("iso-abbrev")
                    ) {
                        self.meta.journal_abbrevs.push(value);
                    }
                }
            }
            "article-title" if self.within(&["article-meta", "title-group", "article-title"]) => {
                // Sub-articles carry their own title groups; keep the first.
                self.title_done = !self.title_buf.is_empty();
            }
            "journal-title" if self.within(&["journal-meta", "journal-title"]) => {
                self.journal_done = !self.journal_buf.is_empty();
            }
            "pub-date" if self.within(&["article-meta", "pub-date"]) => {
                let pub_type = self.pub_type.take().unwrap_or_default();
                let parts = (
                    non_empty(std::mem::take(&mut self.year_buf)),
                    non_empty(std::mem::take(&mut self.month_buf)),
                    non_empty(std::mem::take(&mut self.day_buf)),
                );
                self.dates.push((pub_type, parts));
            }
            "contrib" if self.in_author => {
                self.finish_author();
            }
            "kwd" if self.within(&["article-meta", "kwd-group", "kwd"]) => {
                if let Some(keyword) = non_empty(std::mem::take(&mut self.kwd_buf)) {
                    self.meta.keywords.insert(keyword);
                }
            }
            "p" | "title" if self.in_abstract => {
                if let Some(paragraph) = non_empty(std::mem::take(&mut self.para_buf)) {
                    self.paragraphs.push(paragraph);
                }
            }
            "abstract" if self.in_abstract => {
                if let Some(paragraph) = non_empty(std::mem::take(&mut self.para_buf)) {
                    self.paragraphs.push(paragraph);
                }
                if !self.paragraphs.is_empty() {
                    self.meta.abstract_text = Some(self.paragraphs.join("\n\n"));
                    self.paragraphs.clear();
                }
                self.in_abstract = false;
                self.abstract_done = true;
            }
            _ => {}
        }
        self.path.pop();
    }

    fn finish_author(&mut self) {
        let surname = std::mem::take(&mut self.surname_buf);
        let given = std::mem::take(&mut self.given_buf);
        let initials = self
            .name_initials
            .take()
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty());

        let author = if !surname.is_empty() && !given.is_empty() {
            format!("{surname}, {given}")
        } else if !surname.is_empty() {
            match initials {
                Some(initials) => format!("{surname}, {initials}"),
                None => surname,
            }
        } else {
            given
        };

        if !author.is_empty() {
            self.meta.authors.push(author);
        }
        self.in_author = false;
    }

    fn finish(mut self) -> ArticleMetadata {
        self.meta.title = non_empty(self.title_buf);
        self.meta.journal = non_empty(self.journal_buf);

        // Electronic publication date preferred; the collection date often
        // carries a year only, and that is all we take from it.
        let chosen = self
            .dates
            .iter()
            .find(|(pub_type, _)| pub_type == "epub")
            .cloned()
            .or_else(|| {
                self.dates
                    .iter()
                    .find(|(pub_type, _)| pub_type == "collection")
                    .map(|(pub_type, (year, _, _))| (pub_type.clone(), (year.clone(), None, None)))
            });
        if let Some((_, (year, month, day))) = chosen {
            self.meta.year = year;
            self.meta.month = month;
            self.meta.day = day;
        }

        self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_ARTICLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<pmc-articleset>
  <article>
    <front>
      <journal-meta>
        <journal-id journal-id-type="nlm-ta">J Exp Immunol</journal-id>
        <journal-id journal-id-type="iso-abbrev">J. Exp. Immunol.</journal-id>
        <journal-id journal-id-type="publisher-id">JEI</journal-id>
        <journal-title-group>
          <journal-title>Journal of Experimental Immunology</journal-title>
        </journal-title-group>
      </journal-meta>
      <article-meta>
        <article-id pub-id-type="pmcid">7654321</article-id>
        <article-id pub-id-type="pmid">31234567</article-id>
        <article-id pub-id-type="doi">10.1000/jei.2020.0042</article-id>
        <title-group>
          <article-title>Circulating cytokines in <italic>frail</italic> older adults</article-title>
        </title-group>
        <contrib-group>
          <contrib contrib-type="author">
            <name><surname>Okafor</surname><given-names>Adaeze</given-names></name>
          </contrib>
          <contrib contrib-type="author">
            <name initials="M"><surname>Lindqvist</surname></name>
          </contrib>
          <contrib contrib-type="editor">
            <name><surname>Ignored</surname><given-names>Editor</given-names></name>
          </contrib>
        </contrib-group>
        <pub-date pub-type="collection"><year>2020</year></pub-date>
        <pub-date pub-type="epub"><day>17</day><month>3</month><year>2020</year></pub-date>
        <abstract>
          <sec>
            <title>Background</title>
            <p>Frailty correlates with inflammation.</p>
          </sec>
          <sec>
            <title>Results</title>
            <p>IL-6 was elevated in the frail cohort.</p>
          </sec>
        </abstract>
        <kwd-group>
          <kwd>frailty</kwd>
          <kwd>cytokines</kwd>
          <kwd>IL-6</kwd>
        </kwd-group>
      </article-meta>
    </front>
    <body>
      <sec>
        <title>Methods</title>
        <p>Serum was assayed in duplicate.</p>
      </sec>
    </body>
  </article>
</pmc-articleset>"#;

    #[test]
    fn full_document_yields_all_fields() {
        let meta = extract_metadata(FULL_ARTICLE);

        assert_eq!(
            meta.title.as_deref(),
            Some("Circulating cytokines in frail older adults")
        );
        assert_eq!(
            meta.journal.as_deref(),
            Some("Journal of Experimental Immunology")
        );
        assert_eq!(
            meta.journal_abbrevs,
            vec!["J Exp Immunol", "J. Exp. Immunol."]
        );
        assert_eq!(meta.doi.as_deref(), Some("10.1000/jei.2020.0042"));
        assert_eq!(meta.pmid.as_deref(), Some("31234567"));
        assert_eq!(meta.pmcid.as_deref(), Some("7654321"));
        assert_eq!(meta.year.as_deref(), Some("2020"));
        assert_eq!(meta.month.as_deref(), Some("3"));
        assert_eq!(meta.day.as_deref(), Some("17"));
        assert_eq!(meta.authors, vec!["Okafor, Adaeze", "Lindqvist, M"]);
        assert_eq!(
            meta.abstract_text.as_deref(),
            Some(
                "Background\n\nFrailty correlates with inflammation.\n\n\
                 Results\n\nIL-6 was elevated in the frail cohort."
            )
        );
        let keywords: Vec<&str> = meta.keywords.iter().map(String::as_str).collect();
        assert_eq!(keywords, vec!["IL-6", "cytokines", "frailty"]);
    }

    #[test]
    fn missing_sections_leave_other_fields_intact() {
        let xml = r#"<article>
  <front>
    <article-meta>
      <article-id pub-id-type="pmcid">99</article-id>
      <title-group><article-title>Short communication</article-title></title-group>
      <pub-date pub-type="epub"><year>2021</year></pub-date>
    </article-meta>
  </front>
</article>"#;
        let meta = extract_metadata(xml);

        assert_eq!(meta.title.as_deref(), Some("Short communication"));
        assert_eq!(meta.pmcid.as_deref(), Some("99"));
        assert_eq!(meta.year.as_deref(), Some("2021"));
        assert!(meta.abstract_text.is_none());
        assert!(meta.keywords.is_empty());
        assert!(meta.authors.is_empty());
        assert!(meta.journal.is_none());
        assert!(meta.doi.is_none());
    }

    #[test]
    fn collection_date_fallback_takes_year_only() {
        let xml = r#"<article><front><article-meta>
          <pub-date pub-type="collection"><day>1</day><month>6</month><year>2019</year></pub-date>
        </article-meta></front></article>"#;
        let meta = extract_metadata(xml);

        assert_eq!(meta.year.as_deref(), Some("2019"));
        assert!(meta.month.is_none());
        assert!(meta.day.is_none());
    }

    #[test]
    fn citation_titles_are_not_the_article_title() {
        let xml = r#"<article>
  <front><article-meta>
    <title-group><article-title>The real title</article-title></title-group>
  </article-meta></front>
  <back><ref-list><ref><element-citation>
    <article-title>A cited paper</article-title>
  </element-citation></ref></ref-list></back>
</article>"#;
        let meta = extract_metadata(xml);
        assert_eq!(meta.title.as_deref(), Some("The real title"));
    }

    #[test]
    fn malformed_document_keeps_partial_fields() {
        let xml = r#"<article><front><article-meta>
          <article-id pub-id-type="doi">10.1/xyz</article-id>
          <title-group><article-title>Cut off"#;
        let meta = extract_metadata(xml);

        assert_eq!(meta.doi.as_deref(), Some("10.1/xyz"));
        assert_eq!(meta.title.as_deref(), Some("Cut off"));
    }

    #[test]
    fn garbage_input_yields_empty_metadata() {
        assert!(extract_metadata("").is_empty());
        assert!(extract_metadata("plain text, no markup").is_empty());
    }

    #[test]
    fn plain_text_preserves_paragraph_boundaries() {
        let text = to_plain_text(FULL_ARTICLE);

        assert!(text.contains("Methods\n\nSerum was assayed in duplicate."));
        assert!(text.contains("Circulating cytokines in frail older adults"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn plain_text_joins_inline_markup() {
        let xml = "<p>Effects of <italic>stress</italic> on sleep</p>";
        assert_eq!(to_plain_text(xml), "Effects of stress on sleep");
    }
}
