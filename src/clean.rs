//! Article cleaning pipeline.
//!
//! Turns pasted article text (journal layout, markdown, citations, metadata)
//! into the plain prose that gets segmented and read aloud.  Every rule is a
//! compiled regex applied in a fixed order; each rule group can be switched off
//! through [`CleanerConfig`].

use fancy_regex::Regex;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Compiled regexes (lazily initialised once)
// ─────────────────────────────────────────────────────────────────────────────

// Markdown
static RE_MD_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static RE_MD_ITALIC_UNDERSCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_(.*?)_").unwrap());
static RE_MD_ITALIC_STAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").unwrap());
static RE_MD_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"#{1,6}\s").unwrap());
static RE_MD_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(.*?)\]\(.*?\)").unwrap());
static RE_MD_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").unwrap());

// Sections
static RE_CONCLUSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(Conclusion|Conclusions|Discussion|Discusión|Discusiones|Final Remarks|Closing|Conclusión|Conclusiones)\s*(\n|:)").unwrap()
});
static RE_NEXT_SECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*(\n[A-Z0-9]|\nReferences|\nReferencias)").unwrap());
static RE_TRAILING_SECTIONS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        "Conflicts? of Interest",
        "Competing Interests?",
        "Disclosure",
        "Funding",
        "Author Contributions",
        "Declaración de.*",
        "Conflictos de interés",
        "Fondos",
        "Contribuciones de los autores",
        "Agradecimientos",
        "Acknowledgments",
    ]
    .iter()
    .map(|section| {
        Regex::new(&format!(
            r"(?i)(?:\n|\A){}[\s\S]*?(?=(?:\n\n[A-Z0-9])|(?:\n\nReferences?)|(?:\n\nReferencias?)|\z)",
            section
        ))
        .unwrap()
    })
    .collect()
});
static RE_REFERENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(References?|Referencias|Bibliography|Works Cited|Literature Cited)\s*\n[\s\S]*$").unwrap()
});

// Metadata
static RE_FRONT_MATTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^[\s\S]*?(Abstract|Resumen)").unwrap());
static RE_METADATA_LINES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        "Academic Editor:",
        "Received:",
        "Revised:",
        "Accepted:",
        "Published:",
        "Corrected:",
        "Citation:",
        "Copyright:",
        "Department of",
        r"\* Correspondence:",
    ]
    .iter()
    .map(|label| Regex::new(&format!(r"{}.*?\n", label)).unwrap())
    .collect()
});

// Inline noise
static RE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://[^\s]+|www\.[^\s]+").unwrap());
static RE_DOI: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)doi:\s*[\d./]+").unwrap());
static RE_DOI_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https://doi\.org/[^\s]+").unwrap());
static RE_EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\w.-]+@[\w.-]+\.\w+").unwrap());
static RE_CITE_SQUARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\s*\d+\s*(?:[-,;]\s*\d+\s*)*\s*\]").unwrap());
static RE_CITE_CURLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\s*\d+\s*(?:[-,;]\s*\d+\s*)*\s*\}").unwrap());
static RE_CITE_ROUND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s*\d+\s*(?:[-,;]\s*\d+\s*)*\s*\)").unwrap());
static RE_LATIN_ABBREV: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(et al\.|e\.g\.|i\.e\.)").unwrap());
static RE_FIGURE_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(Figure|Fig\.|Tabla) \d+[.:].*?\n").unwrap());
static RE_SCALE_BAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Scale bar:.*?\n").unwrap());
static RE_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Table \d+\.[\s\S]*?(?=(?:\n\n[A-Z])|(?:\n\n\d+\.)|(?:\n\nConclusion))").unwrap()
});

// Final pass
static RE_ODD_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s.,;:!?¿¡()áéíóúñÁÉÍÓÚÑüÜ\-–—%]").unwrap());
static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

// ─────────────────────────────────────────────────────────────────────────────
// Markdown
// ─────────────────────────────────────────────────────────────────────────────

/// Remove markdown emphasis, headings, links and inline code, keeping text.
pub fn strip_markdown(text: &str) -> String {
    let text = RE_MD_BOLD.replace_all(text, "$1");
    let text = RE_MD_ITALIC_UNDERSCORE.replace_all(&text, "$1");
    let text = RE_MD_ITALIC_STAR.replace_all(&text, "$1");
    let text = RE_MD_HEADING.replace_all(&text, "");
    let text = RE_MD_LINK.replace_all(&text, "$1");
    RE_MD_CODE.replace_all(&text, "$1").into_owned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Rule groups
// ─────────────────────────────────────────────────────────────────────────────

/// Cut everything after the section that follows the conclusion heading.
pub fn stop_at_conclusion(text: &str) -> String {
    let Ok(Some(heading)) = RE_CONCLUSION.find(text) else {
        return text.to_string();
    };
    let end = heading.end();
    match RE_NEXT_SECTION.find(&text[end..]) {
        Ok(Some(next)) => text[..end + next.start()].to_string(),
        _ => text.to_string(),
    }
}

pub fn remove_trailing_sections(text: &str) -> String {
    RE_TRAILING_SECTIONS
        .iter()
        .fold(text.to_string(), |acc, re| re.replace_all(&acc, "").into_owned())
}

pub fn remove_references(text: &str) -> String {
    RE_REFERENCES.replace(text, "").into_owned()
}

pub fn remove_front_matter(text: &str) -> String {
    let text = RE_FRONT_MATTER.replace(text, "$1").into_owned();
    RE_METADATA_LINES
        .iter()
        .fold(text, |acc, re| re.replace_all(&acc, "").into_owned())
}

pub fn remove_urls(text: &str) -> String {
    RE_URL.replace_all(text, "").into_owned()
}

pub fn remove_dois(text: &str) -> String {
    let text = RE_DOI.replace_all(text, "");
    RE_DOI_URL.replace_all(&text, "").into_owned()
}

pub fn remove_emails(text: &str) -> String {
    RE_EMAIL.replace_all(text, "").into_owned()
}

/// Numeric citations `[1]`, `{2, 3}`, `(4-6)` and latin abbreviations.
pub fn remove_citations(text: &str) -> String {
    let text = RE_CITE_SQUARE.replace_all(text, "");
    let text = RE_CITE_CURLY.replace_all(&text, "");
    let text = RE_CITE_ROUND.replace_all(&text, "");
    RE_LATIN_ABBREV.replace_all(&text, "").into_owned()
}

pub fn remove_figure_labels(text: &str) -> String {
    let text = RE_FIGURE_LABEL.replace_all(text, "");
    RE_SCALE_BAR.replace_all(&text, "").into_owned()
}

pub fn remove_tables(text: &str) -> String {
    RE_TABLE.replace_all(text, "").into_owned()
}

/// Drop unusual characters, collapse runs of spaces and blank lines, trim.
pub fn final_pass(text: &str) -> String {
    let text = RE_ODD_CHARS.replace_all(text, "");
    let text = RE_SPACES.replace_all(&text, " ");
    let text = RE_BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Configurable cleaner
// ─────────────────────────────────────────────────────────────────────────────

/// Which rule groups the cleaner applies.  All on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    pub stop_at_conclusion: bool,
    pub remove_conflicts: bool,
    pub remove_authors: bool,
    pub remove_references: bool,
    pub remove_urls: bool,
    pub remove_dois: bool,
    pub remove_emails: bool,
    pub remove_citations: bool,
    pub remove_figure_labels: bool,
    pub remove_tables: bool,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            stop_at_conclusion: true,
            remove_conflicts: true,
            remove_authors: true,
            remove_references: true,
            remove_urls: true,
            remove_dois: true,
            remove_emails: true,
            remove_citations: true,
            remove_figure_labels: true,
            remove_tables: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextCleaner {
    config: CleanerConfig,
}

impl TextCleaner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CleanerConfig) -> Self {
        Self { config }
    }

    pub fn process(&self, text: &str) -> String {
        let cfg = &self.config;
        let mut text = text.to_string();

        if cfg.stop_at_conclusion {
            text = stop_at_conclusion(&text);
        }
        if cfg.remove_conflicts || cfg.remove_authors {
            text = remove_trailing_sections(&text);
        }
        if cfg.remove_references {
            text = remove_references(&text);
        }
        if cfg.remove_authors {
            text = remove_front_matter(&text);
        }
        if cfg.remove_urls {
            text = remove_urls(&text);
        }
        if cfg.remove_dois {
            text = remove_dois(&text);
        }
        if cfg.remove_emails {
            text = remove_emails(&text);
        }
        if cfg.remove_citations {
            text = remove_citations(&text);
        }
        if cfg.remove_figure_labels {
            text = remove_figure_labels(&text);
        }
        if cfg.remove_tables {
            text = remove_tables(&text);
        }

        final_pass(&text)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_markdown() {
        let out = strip_markdown("# Título\n**Negrita** y _cursiva_ con [enlace](http://x.y) y `código`");
        assert_eq!(out, "Título\nNegrita y cursiva con enlace y código");
    }

    #[test]
    fn test_citations() {
        let out = remove_citations("La dosis [1, 2-5] fue alta {20} (3) según Pérez et al. ayer");
        assert!(!out.contains('['), "got: {}", out);
        assert!(!out.contains('{'), "got: {}", out);
        assert!(!out.contains("(3)"), "got: {}", out);
        assert!(!out.contains("et al."), "got: {}", out);
    }

    #[test]
    fn test_references_section_removed() {
        let out = remove_references("Cuerpo del texto.\n\nReferences\n1. Smith J. 2020.\n2. Otro.");
        assert_eq!(out.trim(), "Cuerpo del texto.");
    }

    #[test]
    fn test_front_matter() {
        let out = remove_front_matter("Revista X\nAutores Y\nAbstract\nTexto.\nReceived: 1 May\nMás.");
        assert!(out.starts_with("Abstract"), "got: {}", out);
        assert!(!out.contains("Received"), "got: {}", out);
    }

    #[test]
    fn test_urls_dois_emails() {
        let out = remove_emails(&remove_dois(&remove_urls(
            "ver https://a.b/c www.x.org doi: 10.1000/182 y autor@hospital.es fin",
        )));
        assert_eq!(final_pass(&out), "ver y fin");
    }

    #[test]
    fn test_trailing_section_until_next_heading() {
        let text = "Intro.\n\nFunding\nThis work was funded by X.\n\nMethods are below.";
        let out = remove_trailing_sections(text);
        assert!(!out.contains("funded"), "got: {}", out);
        assert!(out.contains("Methods are below."), "got: {}", out);
    }

    #[test]
    fn test_stop_at_conclusion() {
        let text = "Intro.\n\nConclusion\nTodo bien.\n\nAnexo A\nExtra.";
        let out = stop_at_conclusion(text);
        assert!(out.contains("Todo bien."), "got: {}", out);
        assert!(!out.contains("Anexo"), "got: {}", out);
    }

    #[test]
    fn test_final_pass() {
        let out = final_pass("  Hola   mundo★ 50%\n\n\n\nniño  ");
        assert_eq!(out, "Hola mundo 50%\n\nniño");
    }

    #[test]
    fn test_disabled_rules_leave_text() {
        let cfg = CleanerConfig { remove_citations: false, ..CleanerConfig::default() };
        let out = TextCleaner::with_config(cfg).process("Dato [1] clave.");
        assert_eq!(out, "Dato 1 clave.");
    }

    #[test]
    fn test_full_pipeline() {
        let raw = "Journal of Things\nAbstract\nEl estudio [1] mostró mejoría.\n\nReferences\n1. A.";
        let out = TextCleaner::new().process(raw);
        assert_eq!(out, "Abstract\nEl estudio mostró mejoría.");
    }
}
