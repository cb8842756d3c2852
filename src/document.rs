//! Modelo de documento del editor de texto enriquecido: un árbol de bloques
//! de variantes etiquetadas (heading | paragraph | list | image) con dos
//! proyecciones: texto plano (lo que se almacena y analiza) y marcado HTML
//! (lo que se muestra). El contenido de cada nodo pertenece en exclusiva al
//! árbol; no hay referencias compartidas mutables.

use serde::{Deserialize, Serialize};

/// Contenido en línea dentro de un bloque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inline {
    Text { text: String },
    Link { href: String, text: String },
}

/// Bloque de nivel superior del documento.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading { level: u8, children: Vec<Inline> },
    Paragraph { children: Vec<Inline> },
    List { ordered: bool, items: Vec<Vec<Inline>> },
    Image { src: String, alt: String },
}

fn inline_text(children: &[Inline], out: &mut String) {
    for (i, inline) in children.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        match inline {
            Inline::Text { text } => out.push_str(text),
            Inline::Link { text, .. } => out.push_str(text),
        }
    }
}

/// Proyección a texto plano, la que consume el agregador de insights. Las
/// imágenes aportan su texto alternativo; los enlaces, su texto visible.
pub fn to_plain_text(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        if !out.is_empty() {
            out.push('\n');
        }
        match block {
            Block::Heading { children, .. } | Block::Paragraph { children } => {
                inline_text(children, &mut out);
            }
            Block::List { items, .. } => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push('\n');
                    }
                    inline_text(item, &mut out);
                }
            }
            Block::Image { alt, .. } => out.push_str(alt),
        }
    }
    out
}

/// Proyección a marcado transportable (HTML sencillo) para la capa de
/// presentación.
pub fn to_markup(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        match block {
            Block::Heading { level, children } => {
                let level = (*level).clamp(1, 6);
                out.push_str(&format!("<h{level}>"));
                inline_markup(children, &mut out);
                out.push_str(&format!("</h{level}>"));
            }
            Block::Paragraph { children } => {
                out.push_str("<p>");
                inline_markup(children, &mut out);
                out.push_str("</p>");
            }
            Block::List { ordered, items } => {
                let tag = if *ordered { "ol" } else { "ul" };
                out.push_str(&format!("<{tag}>"));
                for item in items {
                    out.push_str("<li>");
                    inline_markup(item, &mut out);
                    out.push_str("</li>");
                }
                out.push_str(&format!("</{tag}>"));
            }
            Block::Image { src, alt } => {
                out.push_str(&format!(
                    "<img src=\"{}\" alt=\"{}\">",
                    escape(src),
                    escape(alt)
                ));
            }
        }
    }
    out
}

fn inline_markup(children: &[Inline], out: &mut String) {
    for inline in children {
        match inline {
            Inline::Text { text } => out.push_str(&escape(text)),
            Inline::Link { href, text } => {
                out.push_str(&format!("<a href=\"{}\">{}</a>", escape(href), escape(text)));
            }
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
