//! Native PPTX text via `zip` + `quick-xml`.
//!
//! Slide order comes from `ppt/presentation.xml` (`sldIdLst` resolved through the
//! presentation relationships). Decks without a usable manifest fall back to the numeric
//! order of `ppt/slides/slideN.xml` parts.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

use super::error::ExtractionError;
use super::types::DocumentFormat;

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";
const SLIDE_PREFIX: &str = "ppt/slides/slide";
const IMAGE_REL_SUFFIX: &str = "/image";

type Archive<'a> = ZipArchive<Cursor<&'a [u8]>>;

/// One slide's text layer plus its best OCR candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PptxSlide {
    pub text: String,
    /// Largest embedded picture at or above the size floor.
    pub image: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
}

/// Reads all slides in presentation order.
///
/// A slide part that is missing or not well-formed becomes an empty slide.
pub fn read_slides(
    bytes: &[u8],
    min_image_bytes: usize,
) -> Result<Vec<PptxSlide>, ExtractionError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(corrupt)?;

    let slide_parts = slide_order(&mut archive)?;
    if slide_parts.is_empty() {
        return Err(ExtractionError::NoSlides);
    }

    slide_parts
        .iter()
        .map(|part| read_slide(&mut archive, part, min_image_bytes))
        .collect()
}

fn corrupt(e: impl std::fmt::Display) -> ExtractionError {
    ExtractionError::corrupt(DocumentFormat::Pptx, e)
}

fn read_part(archive: &mut Archive<'_>, name: &str) -> Result<Option<Vec<u8>>, ExtractionError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(corrupt(e)),
    };
    let mut buf = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut buf).map_err(corrupt)?;
    Ok(Some(buf))
}

fn read_xml_part(archive: &mut Archive<'_>, name: &str) -> Result<Option<String>, ExtractionError> {
    Ok(read_part(archive, name)?.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
}

fn slide_order(archive: &mut Archive<'_>) -> Result<Vec<String>, ExtractionError> {
    if let (Some(presentation), Some(rels)) = (
        read_xml_part(archive, PRESENTATION_PART)?,
        read_xml_part(archive, PRESENTATION_RELS)?,
    ) {
        match manifest_order(&presentation, &rels) {
            Ok(parts) if !parts.is_empty() => return Ok(parts),
            Ok(_) => debug!("presentation manifest lists no slides, using part names"),
            Err(reason) => debug!(%reason, "unreadable presentation manifest, using part names"),
        }
    }

    let mut numbered: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = name
                .strip_prefix(SLIDE_PREFIX)?
                .strip_suffix(".xml")?
                .parse::<u32>()
                .ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    numbered.sort();
    Ok(numbered.into_iter().map(|(_, name)| name).collect())
}

fn manifest_order(presentation_xml: &str, rels_xml: &str) -> Result<Vec<String>, String> {
    let rels: HashMap<String, String> = parse_relationships(rels_xml)?
        .into_iter()
        .map(|rel| (rel.id, rel.target))
        .collect();

    let mut reader = Reader::from_str(presentation_xml);
    let mut parts = Vec::new();
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sldId" => {
                for attr in e.attributes().flatten() {
                    // `r:id`, not the numeric `id` attribute
                    if attr.key.prefix().is_some() && attr.key.local_name().as_ref() == b"id" {
                        let rel_id = attr.unescape_value().map_err(|e| e.to_string())?;
                        if let Some(target) = rels.get(rel_id.as_ref()) {
                            parts.push(resolve_target("ppt", target));
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(parts)
}

fn parse_relationships(xml: &str) -> Result<Vec<Relationship>, String> {
    let mut reader = Reader::from_str(xml);
    let mut rels = Vec::new();
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut id = None;
                let mut rel_type = String::new();
                let mut target = None;
                let mut external = false;
                for attr in e.attributes().flatten() {
                    let value = attr.unescape_value().map_err(|e| e.to_string())?.into_owned();
                    match attr.key.local_name().as_ref() {
                        b"Id" => id = Some(value),
                        b"Type" => rel_type = value,
                        b"Target" => target = Some(value),
                        b"TargetMode" => external = value.eq_ignore_ascii_case("external"),
                        _ => {}
                    }
                }
                if let (Some(id), Some(target), false) = (id, target, external) {
                    rels.push(Relationship {
                        id,
                        rel_type,
                        target,
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rels)
}

/// Resolves a relationship target against the directory of the part that owns it.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn slide_rels_path(part: &str) -> (String, String) {
    match part.rsplit_once('/') {
        Some((dir, file)) => (dir.to_string(), format!("{dir}/_rels/{file}.rels")),
        None => (String::new(), format!("_rels/{part}.rels")),
    }
}

fn read_slide(
    archive: &mut Archive<'_>,
    part: &str,
    min_image_bytes: usize,
) -> Result<PptxSlide, ExtractionError> {
    let Some(xml) = read_xml_part(archive, part)? else {
        debug!(part, "slide part missing from archive");
        return Ok(PptxSlide::default());
    };

    let text = match slide_text(&xml) {
        Ok(text) => text,
        Err(reason) => {
            debug!(part, %reason, "slide XML not well-formed");
            String::new()
        }
    };

    let image = largest_image(archive, part, min_image_bytes)?;
    Ok(PptxSlide { text, image })
}

fn largest_image(
    archive: &mut Archive<'_>,
    part: &str,
    min_image_bytes: usize,
) -> Result<Option<Vec<u8>>, ExtractionError> {
    let (dir, rels_path) = slide_rels_path(part);
    let Some(rels_xml) = read_xml_part(archive, &rels_path)? else {
        return Ok(None);
    };
    let rels = match parse_relationships(&rels_xml) {
        Ok(rels) => rels,
        Err(reason) => {
            debug!(part, %reason, "slide relationships not well-formed");
            return Ok(None);
        }
    };

    let mut best: Option<Vec<u8>> = None;
    for rel in rels.iter().filter(|r| r.rel_type.ends_with(IMAGE_REL_SUFFIX)) {
        let path = resolve_target(&dir, &rel.target);
        let Some(bytes) = read_part(archive, &path)? else {
            continue;
        };
        if bytes.len() < min_image_bytes {
            continue;
        }
        if best.as_ref().is_none_or(|b| bytes.len() > b.len()) {
            best = Some(bytes);
        }
    }
    Ok(best)
}

/// Concatenates `a:t` runs; paragraph ends and `a:br` become line breaks.
fn slide_text(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_run = false;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_run = true,
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_run = false,
                b"p" if !out.is_empty() && !out.ends_with('\n') => out.push('\n'),
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"br" => out.push('\n'),
            Event::Text(t) if in_run => {
                out.push_str(&t.unescape().map_err(|e| e.to_string())?);
            }
            Event::CData(t) if in_run => out.push_str(&String::from_utf8_lossy(&t)),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out.trim().to_string())
}
