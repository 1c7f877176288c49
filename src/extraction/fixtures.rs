//! In-memory PDF and PPTX builders for tests.

use std::io::{Cursor, Write};

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Builds a PDF with one page per entry; an empty string yields a page without text.
pub fn build_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let operations = if text.is_empty() {
            Vec::new()
        } else {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 18.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]
        };
        let content = Content { operations }
            .encode()
            .expect("encode page content");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("serialize pdf");
    buf
}

/// One slide for [`build_pptx`].
#[derive(Debug, Clone, Default)]
pub struct FixtureSlide {
    pub paragraphs: Vec<String>,
    pub images: Vec<Vec<u8>>,
}

impl FixtureSlide {
    pub fn text(paragraphs: &[&str]) -> Self {
        Self {
            paragraphs: paragraphs.iter().map(|p| p.to_string()).collect(),
            images: Vec::new(),
        }
    }

    pub fn image(bytes: Vec<u8>) -> Self {
        Self {
            paragraphs: Vec::new(),
            images: vec![bytes],
        }
    }

    pub fn with_image(mut self, bytes: Vec<u8>) -> Self {
        self.images.push(bytes);
        self
    }
}

/// Builds a minimal PPTX. When `reverse_manifest` is set, `sldIdLst` lists the slide parts
/// in reverse numeric order, so presentation order and part order disagree.
pub fn build_pptx(slides: &[FixtureSlide], reverse_manifest: bool) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    let mut order: Vec<usize> = (1..=slides.len()).collect();
    if reverse_manifest {
        order.reverse();
    }

    let mut sld_ids = String::new();
    let mut pres_rels = String::new();
    for (pos, number) in order.iter().enumerate() {
        sld_ids.push_str(&format!(
            r#"<p:sldId id="{}" r:id="rId{}"/>"#,
            256 + pos,
            number
        ));
    }
    for number in 1..=slides.len() {
        pres_rels.push_str(&format!(
            r#"<Relationship Id="rId{number}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{number}.xml"/>"#
        ));
    }

    put(
        &mut zip,
        "ppt/presentation.xml",
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><p:sldIdLst>{sld_ids}</p:sldIdLst></p:presentation>"#
        )
        .as_bytes(),
    );
    put(
        &mut zip,
        "ppt/_rels/presentation.xml.rels",
        format!(r#"<?xml version="1.0" encoding="UTF-8"?><Relationships>{pres_rels}</Relationships>"#)
            .as_bytes(),
    );

    let mut media_counter = 0usize;
    for (i, slide) in slides.iter().enumerate() {
        let number = i + 1;
        let paragraphs: String = slide
            .paragraphs
            .iter()
            .map(|p| format!("<a:p><a:r><a:t>{}</a:t></a:r></a:p>", escape(p)))
            .collect();
        put(
            &mut zip,
            &format!("ppt/slides/slide{number}.xml"),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><p:cSld><p:spTree><p:sp><p:txBody>{paragraphs}</p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#
            )
            .as_bytes(),
        );

        let mut rels = String::new();
        for (j, image) in slide.images.iter().enumerate() {
            media_counter += 1;
            let media = format!("image{media_counter}.png");
            rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/{media}"/>"#,
                j + 1
            ));
            put(&mut zip, &format!("ppt/media/{media}"), image);
        }
        put(
            &mut zip,
            &format!("ppt/slides/_rels/slide{number}.xml.rels"),
            format!(r#"<?xml version="1.0" encoding="UTF-8"?><Relationships>{rels}</Relationships>"#)
                .as_bytes(),
        );
    }

    zip.finish().expect("finish zip").into_inner()
}

/// Fake image payload of `len` bytes with a PNG signature.
pub fn fake_png(len: usize) -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.resize(len.max(bytes.len()), 0xAB);
    bytes
}

fn put(zip: &mut ZipWriter<Cursor<Vec<u8>>>, name: &str, body: &[u8]) {
    zip.start_file(name, SimpleFileOptions::default())
        .expect("start zip entry");
    zip.write_all(body).expect("write zip entry");
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
