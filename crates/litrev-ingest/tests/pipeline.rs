//! End-to-end tests: real PDF and DOCX files through ingest, enrich, segment
//! and publish.

use litrev_config::{AppPaths, Config};
use litrev_core::{keys, DocumentClass};
use litrev_db::Database;
use litrev_ingest::{Embedder, IngestResult, Pipeline, TextCache};
use serde_json::json;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

/// Minimal multi-page PDF with one line of Helvetica text per page.
/// Offsets and stream lengths are computed so the xref table is exact.
fn pdf_with_pages(pages: &[&str], title: Option<&str>) -> Vec<u8> {
    let page_count = pages.len();
    let font_id = 3;
    let first_page_id = 4;
    let info_id = first_page_id + 2 * page_count;
    let object_count = if title.is_some() { info_id } else { info_id - 1 };

    let mut objects: Vec<Vec<u8>> = Vec::new();
    objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
    let kids: Vec<String> = (0..page_count)
        .map(|i| format!("{} 0 R", first_page_id + 2 * i))
        .collect();
    objects.push(
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            page_count
        )
        .into_bytes(),
    );
    objects.push(b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_vec());
    for (i, text) in pages.iter().enumerate() {
        let content_id = first_page_id + 2 * i + 1;
        objects.push(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R /Resources << /Font << /F1 {} 0 R >> >> >>",
                content_id, font_id
            )
            .into_bytes(),
        );
        let stream = format!("BT /F1 12 Tf 72 700 Td ({}) Tj ET", text);
        objects.push(
            format!(
                "<< /Length {} >>\nstream\n{}\nendstream",
                stream.len(),
                stream
            )
            .into_bytes(),
        );
    }
    if let Some(title) = title {
        objects.push(format!("<< /Title ({}) /Author (Test Author) >>", title).into_bytes());
    }
    assert_eq!(objects.len(), object_count);

    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", object_count + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    let info = if title.is_some() {
        format!(" /Info {} 0 R", info_id)
    } else {
        String::new()
    };
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R{} >>\nstartxref\n{}\n%%EOF\n",
            object_count + 1,
            info,
            xref_start
        )
        .as_bytes(),
    );
    out
}

/// Minimal DOCX: `(style_id, text)` paragraphs plus a heading style table.
fn docx_with_paragraphs(paragraphs: &[(Option<&str>, &str)]) -> Vec<u8> {
    let ns = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
    let body: String = paragraphs
        .iter()
        .map(|(style, text)| {
            let ppr = style
                .map(|s| format!(r#"<w:pPr><w:pStyle w:val="{}"/></w:pPr>"#, s))
                .unwrap_or_default();
            format!("<w:p>{}<w:r><w:t>{}</w:t></w:r></w:p>", ppr, text)
        })
        .collect();

    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("word/document.xml", options).unwrap();
        write!(
            zip,
            r#"<?xml version="1.0"?><w:document xmlns:w="{}"><w:body>{}</w:body></w:document>"#,
            ns, body
        )
        .unwrap();
        zip.start_file("word/styles.xml", options).unwrap();
        write!(
            zip,
            r#"<?xml version="1.0"?><w:styles xmlns:w="{}"><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/></w:style></w:styles>"#,
            ns
        )
        .unwrap();
        zip.finish().unwrap();
    }
    buf
}

/// Letter-frequency vectors: deterministic and good enough to rank by topic.
struct LetterEmbedder;

impl Embedder for LetterEmbedder {
    fn model(&self) -> &str {
        "letters"
    }

    async fn embed_texts(&self, texts: &[String]) -> IngestResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| letter_vector(t)).collect())
    }
}

fn letter_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; 26];
    for c in text.to_lowercase().chars() {
        if c.is_ascii_lowercase() {
            v[(c as u8 - b'a') as usize] += 1.0;
        }
    }
    v
}

struct Fixture {
    dir: TempDir,
    config: Config,
    paths: AppPaths,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_dirs(dir.path().join("config"), dir.path().join("data"));
        let mut config = Config::default();
        config.ingest.source_dir = dir.path().join("docs").to_string_lossy().into_owned();
        config.ingest.max_workers = 2;
        config.chunking.chunk_size = 200;
        config.chunking.chunk_overlap = 40;
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        Self { dir, config, paths }
    }

    fn docs(&self) -> std::path::PathBuf {
        self.dir.path().join("docs")
    }

    fn write(&self, relative: &str, bytes: &[u8]) {
        let path = self.docs().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, bytes).unwrap();
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline::from_config(&self.config, &self.paths).unwrap()
    }

    fn cache_entries(&self) -> usize {
        TextCache::open(self.config.cache_dir(&self.paths))
            .unwrap()
            .stats()
            .unwrap()
            .entries
    }

    fn index(&self) -> Database {
        Database::open(self.config.index_path(&self.paths)).unwrap()
    }
}

fn survey_pdf() -> Vec<u8> {
    pdf_with_pages(
        &[
            "Abstract soil carbon survey",
            "Results show carbon gains",
        ],
        Some("Soil Carbon Review"),
    )
}

#[tokio::test]
async fn test_identical_pdfs_share_one_cache_entry_and_corrupt_file_is_skipped() {
    let fx = Fixture::new();
    fx.write("survey.pdf", &survey_pdf());
    fx.write("copies/survey copy.pdf", &survey_pdf());
    fx.write("broken.pdf", b"%PDF-1.4 truncated garbage");

    let prepared = fx.pipeline().prepare(None).await.unwrap();

    assert_eq!(prepared.processed(), 2);
    assert_eq!(prepared.skipped.len(), 1);
    assert!(prepared.skipped[0].path.ends_with("broken.pdf"));
    assert_eq!(fx.cache_entries(), 1);

    assert!(!prepared.chunks.is_empty());
    assert!(prepared.chunks.iter().all(|c| !c.content.trim().is_empty()));
    assert!(prepared
        .chunks
        .iter()
        .all(|c| !c.content.contains("--- Page")));

    let texts: Vec<&str> = prepared.documents.iter().map(|d| d.text.as_str()).collect();
    assert_eq!(texts[0], texts[1]);
    assert!(texts[0].contains("--- Page 2 ---"));

    let doc = &prepared.documents[0];
    assert_eq!(doc.metadata[keys::PAGE_COUNT], json!(2));
    assert_eq!(doc.metadata["pdf_title"], json!("Soil Carbon Review"));
    assert_eq!(doc.metadata["pdf_author"], json!("Test Author"));
    assert_eq!(doc.metadata["pdf_producer"], json!(""));
    assert_eq!(doc.metadata[keys::EXTENSION], json!(".pdf"));
    assert_eq!(doc.document_class(), Some(DocumentClass::ResearchPaper));
}

#[tokio::test]
async fn test_rerun_is_served_from_cache_with_identical_chunks() {
    let fx = Fixture::new();
    fx.write("survey.pdf", &survey_pdf());
    fx.write(
        "notes.docx",
        &docx_with_paragraphs(&[
            (Some("Heading1"), "Field manual"),
            (None, "Step-by-step sampling instructions for each plot."),
        ]),
    );

    let first = fx.pipeline().prepare(None).await.unwrap();
    let second = fx.pipeline().prepare(None).await.unwrap();

    assert_eq!(first.cache_hits, 0);
    assert_eq!(second.cache_hits, 2);
    assert_eq!(first.chunks, second.chunks);
}

#[tokio::test]
async fn test_pdf_chunks_carry_page_numbers() {
    let fx = Fixture::new();
    fx.write("survey.pdf", &survey_pdf());

    let prepared = fx.pipeline().prepare(None).await.unwrap();
    let pages: Vec<Option<u32>> = prepared.chunks.iter().map(|c| c.page()).collect();

    assert!(pages.contains(&Some(1)));
    assert!(prepared
        .chunks
        .iter()
        .filter(|c| c.content.contains("gains"))
        .all(|c| c.page().is_some()));
}

#[tokio::test]
async fn test_docx_metadata_and_classification() {
    let fx = Fixture::new();
    fx.write(
        "guides/field.docx",
        &docx_with_paragraphs(&[
            (Some("Heading1"), "Field manual"),
            (None, "Step-by-step sampling instructions."),
            (Some("Heading1"), "Storage"),
            (None, "Keep samples cold."),
        ]),
    );

    let prepared = fx.pipeline().prepare(None).await.unwrap();
    assert_eq!(prepared.processed(), 1);

    let doc = &prepared.documents[0];
    assert!(doc.text.starts_with("\n# Field manual\n"));
    assert_eq!(doc.document_class(), Some(DocumentClass::Guide));
    assert_eq!(doc.metadata[keys::PARAGRAPH_COUNT], json!(4));
    assert_eq!(doc.metadata["heading1_count"], json!(2));
    assert_eq!(doc.metadata["docx_title"], json!(""));
    assert_eq!(
        doc.metadata[keys::RELATIVE_PATH],
        json!(Path::new("guides").join("field.docx").to_string_lossy())
    );
    assert_eq!(prepared.class_counts().get("guide"), Some(&1));
}

#[tokio::test]
async fn test_build_publishes_searchable_index() {
    let fx = Fixture::new();
    fx.write("survey.pdf", &survey_pdf());
    fx.write(
        "manual.docx",
        &docx_with_paragraphs(&[(None, "How to calibrate the moisture probe.")]),
    );
    fx.write("broken.docx", b"not a zip archive");

    let report = fx
        .pipeline()
        .with_embedder(LetterEmbedder)
        .run(None)
        .await
        .unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.published.embedded, report.chunks);
    assert_eq!(report.published.model.as_deref(), Some("letters"));

    let db = fx.index();
    assert_eq!(db.chunk_count().unwrap() as usize, report.chunks);
    assert!(db.integrity_check().unwrap());

    let stats = db.get_stats().unwrap();
    assert_eq!(stats.total_sources, 2);
    assert_eq!(stats.embedded_chunks as usize, report.chunks);
    assert_eq!(stats.embedding_model.as_deref(), Some("letters"));

    let hits = db.keyword_search("moisture probe", 5).unwrap();
    assert!(hits[0].chunk.content.contains("moisture"));

    let hits = db
        .vector_search(&letter_vector("calibrate the moisture probe"), 1, None)
        .unwrap();
    assert!(hits[0]
        .chunk
        .source()
        .unwrap()
        .ends_with("manual.docx"));
}

#[tokio::test]
async fn test_rebuild_is_idempotent() {
    let fx = Fixture::new();
    fx.write("survey.pdf", &survey_pdf());
    fx.write(
        "manual.docx",
        &docx_with_paragraphs(&[(None, "How to calibrate the moisture probe.")]),
    );

    let first = fx.pipeline().run(None).await.unwrap();
    let before = fx.index().all_chunks().unwrap();
    let second = fx.pipeline().run(None).await.unwrap();
    let after = fx.index().all_chunks().unwrap();

    assert_eq!(first.chunks, second.chunks);
    assert_eq!(second.cache_hits, 2);
    assert_eq!(before, after);
    assert_eq!(second.published.embedded, 0);
}
