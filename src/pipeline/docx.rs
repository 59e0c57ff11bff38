//! WordprocessingML serializer: block sequence → `.docx` bytes.
//!
//! A minimal OOXML package with exactly the parts Word, LibreOffice and
//! Pages need to open the file:
//!
//! ```text
//! [Content_Types].xml
//! _rels/.rels
//! docProps/core.xml
//! word/document.xml           ← one <w:p> per block
//! word/styles.xml             ← Normal + ListBullet
//! word/numbering.xml          ← single bullet list, numId 1
//! word/_rels/document.xml.rels
//! ```
//!
//! Only `document.xml` depends on the input. Every ZIP entry carries the
//! same fixed DOS timestamp and `core.xml` has no dates, so equal block
//! sequences serialize to equal bytes.

use crate::document::DocumentBlock;
use crate::error::AssistantError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::borrow::Cow;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Title stored in `docProps/core.xml`.
pub const DOCUMENT_TITLE: &str = "Visual Medical Assistant";

const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Paragraph style id used for bullet items.
pub const LIST_BULLET_STYLE: &str = "ListBullet";

/// Numbering instance the bullet paragraphs point at.
const BULLET_NUM_ID: &str = "1";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/><Override PartName="/word/numbering.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering" Target="numbering.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults><w:rPrDefault><w:rPr><w:sz w:val="22"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="120"/></w:pPr></w:pPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style><w:style w:type="paragraph" w:styleId="ListBullet"><w:name w:val="List Bullet"/><w:basedOn w:val="Normal"/><w:pPr><w:numPr><w:numId w:val="1"/></w:numPr><w:ind w:left="360" w:hanging="360"/></w:pPr></w:style></w:styles>"#;

const NUMBERING: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:abstractNum w:abstractNumId="0"><w:multiLevelType w:val="singleLevel"/><w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="bullet"/><w:lvlText w:val="•"/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="360" w:hanging="360"/></w:pPr></w:lvl></w:abstractNum><w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num></w:numbering>"#;

/// Serialize `blocks` into a complete `.docx` package.
pub fn write_docx(blocks: &[DocumentBlock]) -> Result<Vec<u8>, AssistantError> {
    let document = document_xml(blocks)?;
    let core = core_xml(DOCUMENT_TITLE)?;

    let parts: [(&str, &[u8]); 7] = [
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", ROOT_RELS.as_bytes()),
        ("docProps/core.xml", core.as_slice()),
        ("word/document.xml", document.as_slice()),
        ("word/styles.xml", STYLES.as_bytes()),
        ("word/numbering.xml", NUMBERING.as_bytes()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS.as_bytes()),
    ];

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in parts {
        zip.start_file(name, options).map_err(serialization)?;
        zip.write_all(body).map_err(serialization)?;
    }
    let bytes = zip.finish().map_err(serialization)?.into_inner();

    debug!("DOCX: {} blocks → {} bytes", blocks.len(), bytes.len());
    Ok(bytes)
}

/// `word/document.xml` for the given blocks.
pub fn document_xml(blocks: &[DocumentBlock]) -> Result<Vec<u8>, AssistantError> {
    let mut w = Writer::new(Vec::new());
    decl(&mut w)?;

    let mut root = BytesStart::new("w:document");
    root.push_attribute(("xmlns:w", WORDML_NS));
    emit(&mut w, Event::Start(root))?;
    emit(&mut w, Event::Start(BytesStart::new("w:body")))?;

    for block in blocks {
        match block {
            DocumentBlock::Header(text) => header_paragraph(&mut w, text)?,
            DocumentBlock::BulletItem(text) => bullet_paragraph(&mut w, text)?,
        }
    }

    // Letter, 1" margins.
    emit(&mut w, Event::Start(BytesStart::new("w:sectPr")))?;
    let mut pg_sz = BytesStart::new("w:pgSz");
    pg_sz.push_attribute(("w:w", "12240"));
    pg_sz.push_attribute(("w:h", "15840"));
    emit(&mut w, Event::Empty(pg_sz))?;
    let mut pg_mar = BytesStart::new("w:pgMar");
    for side in ["w:top", "w:right", "w:bottom", "w:left"] {
        pg_mar.push_attribute((side, "1440"));
    }
    emit(&mut w, Event::Empty(pg_mar))?;
    emit(&mut w, Event::End(BytesEnd::new("w:sectPr")))?;

    emit(&mut w, Event::End(BytesEnd::new("w:body")))?;
    emit(&mut w, Event::End(BytesEnd::new("w:document")))?;
    Ok(w.into_inner())
}

fn core_xml(title: &str) -> Result<Vec<u8>, AssistantError> {
    let mut w = Writer::new(Vec::new());
    decl(&mut w)?;

    let mut root = BytesStart::new("cp:coreProperties");
    root.push_attribute((
        "xmlns:cp",
        "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
    ));
    root.push_attribute(("xmlns:dc", "http://purl.org/dc/elements/1.1/"));
    emit(&mut w, Event::Start(root))?;
    emit(&mut w, Event::Start(BytesStart::new("dc:title")))?;
    emit(&mut w, Event::Text(BytesText::new(title)))?;
    emit(&mut w, Event::End(BytesEnd::new("dc:title")))?;
    emit(&mut w, Event::End(BytesEnd::new("cp:coreProperties")))?;
    Ok(w.into_inner())
}

fn header_paragraph(w: &mut Writer<Vec<u8>>, text: &str) -> Result<(), AssistantError> {
    emit(w, Event::Start(BytesStart::new("w:p")))?;
    emit(w, Event::Start(BytesStart::new("w:r")))?;
    emit(w, Event::Start(BytesStart::new("w:rPr")))?;
    emit(w, Event::Empty(BytesStart::new("w:b")))?;
    emit(w, Event::End(BytesEnd::new("w:rPr")))?;
    text_run(w, text)?;
    emit(w, Event::End(BytesEnd::new("w:r")))?;
    emit(w, Event::End(BytesEnd::new("w:p")))
}

fn bullet_paragraph(w: &mut Writer<Vec<u8>>, text: &str) -> Result<(), AssistantError> {
    emit(w, Event::Start(BytesStart::new("w:p")))?;
    emit(w, Event::Start(BytesStart::new("w:pPr")))?;
    emit(w, Event::Empty(val("w:pStyle", LIST_BULLET_STYLE)))?;
    emit(w, Event::Start(BytesStart::new("w:numPr")))?;
    emit(w, Event::Empty(val("w:ilvl", "0")))?;
    emit(w, Event::Empty(val("w:numId", BULLET_NUM_ID)))?;
    emit(w, Event::End(BytesEnd::new("w:numPr")))?;
    emit(w, Event::End(BytesEnd::new("w:pPr")))?;
    emit(w, Event::Start(BytesStart::new("w:r")))?;
    text_run(w, text)?;
    emit(w, Event::End(BytesEnd::new("w:r")))?;
    emit(w, Event::End(BytesEnd::new("w:p")))
}

fn text_run(w: &mut Writer<Vec<u8>>, text: &str) -> Result<(), AssistantError> {
    let mut t = BytesStart::new("w:t");
    t.push_attribute(("xml:space", "preserve"));
    emit(w, Event::Start(t))?;
    emit(w, Event::Text(BytesText::new(&xml_chars(text))))?;
    emit(w, Event::End(BytesEnd::new("w:t")))
}

/// Drop characters XML 1.0 cannot carry even escaped: C0 controls other
/// than tab, LF and CR, plus U+FFFE and U+FFFF.
fn xml_chars(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| is_xml_char(c)).collect())
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{FFFD}' | '\u{10000}'..)
}

fn val<'a>(name: &'a str, value: &'a str) -> BytesStart<'a> {
    let mut el = BytesStart::new(name);
    el.push_attribute(("w:val", value));
    el
}

fn decl(w: &mut Writer<Vec<u8>>) -> Result<(), AssistantError> {
    emit(
        w,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))),
    )
}

fn emit(w: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), AssistantError> {
    w.write_event(event).map_err(serialization)
}

fn serialization(e: impl std::fmt::Display) -> AssistantError {
    AssistantError::DocumentSerialization(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut xml = String::new();
        part.read_to_string(&mut xml).unwrap();
        xml
    }

    fn sample() -> Vec<DocumentBlock> {
        vec![
            DocumentBlock::Header("Findings".into()),
            DocumentBlock::BulletItem("No fracture".into()),
        ]
    }

    #[test]
    fn package_has_all_parts() {
        let bytes = write_docx(&sample()).unwrap();
        let archive = ZipArchive::new(Cursor::new(&bytes[..])).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![
                "[Content_Types].xml",
                "_rels/.rels",
                "docProps/core.xml",
                "word/_rels/document.xml.rels",
                "word/document.xml",
                "word/numbering.xml",
                "word/styles.xml",
            ]
        );
    }

    #[test]
    fn starts_with_zip_signature() {
        let bytes = write_docx(&[]).unwrap();
        assert_eq!(&bytes[..4], b"PK\x03\x04");
    }

    #[test]
    fn header_is_bold_and_bullet_is_styled() {
        let xml = String::from_utf8(document_xml(&sample()).unwrap()).unwrap();
        assert!(xml.contains(
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">Findings</w:t></w:r></w:p>"#
        ));
        assert!(xml.contains(r#"<w:pStyle w:val="ListBullet"/>"#));
        assert!(xml.contains(r#"<w:numPr><w:ilvl w:val="0"/><w:numId w:val="1"/></w:numPr>"#));
        assert!(xml.contains(r#"<w:t xml:space="preserve">No fracture</w:t>"#));
        assert!(xml.find("Findings") < xml.find("No fracture"));
    }

    #[test]
    fn text_is_escaped() {
        let blocks = vec![DocumentBlock::BulletItem("a < b & c > d".into())];
        let xml = String::from_utf8(document_xml(&blocks).unwrap()).unwrap();
        assert!(xml.contains("a &lt; b &amp; c &gt; d"));
    }

    #[test]
    fn control_characters_are_stripped() {
        let blocks = vec![
            DocumentBlock::Header("H\u{1}".into()),
            DocumentBlock::BulletItem("a\u{B}b\u{FFFE}\u{FFFF}\tc".into()),
        ];
        let xml = String::from_utf8(document_xml(&blocks).unwrap()).unwrap();
        assert!(!xml.chars().any(|c| !is_xml_char(c)));
        assert!(xml.contains(r#"<w:t xml:space="preserve">H</w:t>"#));
        assert!(xml.contains("<w:t xml:space=\"preserve\">ab\tc</w:t>"));
    }

    #[test]
    fn rendered_package_opens_despite_control_characters() {
        let doc = crate::document::render("**H\u{1}** *a\u{B}b*").unwrap();
        let xml = read_part(doc.bytes(), "word/document.xml");
        assert!(!xml.contains('\u{1}') && !xml.contains('\u{B}'));
        assert!(xml.contains(">ab<"));
    }

    #[test]
    fn empty_block_list_is_a_valid_body() {
        let bytes = write_docx(&[]).unwrap();
        let xml = read_part(&bytes, "word/document.xml");
        assert!(!xml.contains("<w:p>"));
        assert!(xml.contains("<w:body>"));
        assert!(xml.contains("<w:sectPr>"));
    }

    #[test]
    fn core_properties_carry_title_only() {
        let bytes = write_docx(&sample()).unwrap();
        let core = read_part(&bytes, "docProps/core.xml");
        assert!(core.contains("<dc:title>Visual Medical Assistant</dc:title>"));
        assert!(!core.contains("dcterms"));
    }

    #[test]
    fn identical_input_gives_identical_bytes() {
        assert_eq!(write_docx(&sample()).unwrap(), write_docx(&sample()).unwrap());
    }

    #[test]
    fn numbering_and_styles_are_registered() {
        let bytes = write_docx(&sample()).unwrap();
        let types = read_part(&bytes, "[Content_Types].xml");
        assert!(types.contains("/word/numbering.xml"));
        let styles = read_part(&bytes, "word/styles.xml");
        assert!(styles.contains(r#"w:styleId="ListBullet""#));
    }
}
