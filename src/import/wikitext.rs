//! WikiText to plaintext cleaner
//!
//! Cleaning is an ordered pipeline of independent passes. Each pass takes the
//! previous pass's output, so the order below is load-bearing: structural
//! constructs go first, emphasis and headings next, and whitespace is
//! normalized last. The cleaner never fails; malformed markup degrades into
//! residue that the residue gate catches afterwards.

use super::balanced::{remove_balanced, remove_prefixed_links, Unclosed};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Section headings whose whole section is dropped (compared lowercased)
pub const DEFAULT_REMOVED_SECTIONS: &[&str] = &[
    "bibliographie",
    "liens externes",
    "notes et références",
    "références",
    "voir aussi",
    "bibliography",
    "external links",
    "notes and references",
    "references",
    "see also",
];

/// Link namespaces removed together with their captions
pub const DEFAULT_DROPPED_LINK_PREFIXES: &[&str] =
    &["File", "Fichier", "Image", "Category", "Catégorie"];

const BLOCK_TAGS: &[&str] = &["gallery", "div", "timeline", "mapframe"];

static RE_COMMENT: OnceLock<Regex> = OnceLock::new();
static RE_MATH: OnceLock<Regex> = OnceLock::new();
static RE_INLINE_MATH: OnceLock<Regex> = OnceLock::new();
static RE_DISPLAYSTYLE: OnceLock<Regex> = OnceLock::new();
static RE_BLOCKS: OnceLock<Vec<Regex>> = OnceLock::new();
static RE_ESCAPED_EMPHASIS: OnceLock<Regex> = OnceLock::new();
static RE_TABLE_CLASS: OnceLock<Regex> = OnceLock::new();
static RE_TABLE_RESIDUAL: OnceLock<Regex> = OnceLock::new();
static RE_TEMPLATE_RESIDUAL: OnceLock<Regex> = OnceLock::new();
static RE_WIKILINK: OnceLock<Regex> = OnceLock::new();
static RE_REF_SELF_CLOSING: OnceLock<Regex> = OnceLock::new();
static RE_REF: OnceLock<Regex> = OnceLock::new();
static RE_HTML_TAG: OnceLock<Regex> = OnceLock::new();
static RE_APOSTROPHES: OnceLock<Regex> = OnceLock::new();
static RE_HTML_TABLE: OnceLock<Regex> = OnceLock::new();
static RE_EXTERNAL_LINK: OnceLock<Regex> = OnceLock::new();
static RE_HEADING5: OnceLock<Regex> = OnceLock::new();
static RE_HEADING4: OnceLock<Regex> = OnceLock::new();
static RE_HEADING3: OnceLock<Regex> = OnceLock::new();
static RE_HEADING2: OnceLock<Regex> = OnceLock::new();
static RE_LIST3: OnceLock<Regex> = OnceLock::new();
static RE_LIST2: OnceLock<Regex> = OnceLock::new();
static RE_LIST1: OnceLock<Regex> = OnceLock::new();
static RE_INDENTED: OnceLock<Regex> = OnceLock::new();
static RE_WHITESPACE: OnceLock<Regex> = OnceLock::new();
static RE_SPACES: OnceLock<Regex> = OnceLock::new();
static RE_NEWLINES: OnceLock<Regex> = OnceLock::new();

static DEFAULT_CLEANER: OnceLock<WikiTextCleaner> = OnceLock::new();

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("hard-coded pattern compiles"))
}

fn strip(text: &str, re: &Regex) -> String {
    re.replace_all(text, "").into_owned()
}

/// Clean one page body with the default section and link lists
pub fn clean(raw_body: &str) -> String {
    DEFAULT_CLEANER
        .get_or_init(WikiTextCleaner::default)
        .clean(raw_body)
}

/// Converts MediaWiki markup into a single line of prose
#[derive(Debug, Clone)]
pub struct WikiTextCleaner {
    /// Lowercased section titles to drop
    removed_sections: HashSet<String>,
    /// Link namespaces to drop, captions included
    dropped_link_prefixes: Vec<String>,
}

impl Default for WikiTextCleaner {
    fn default() -> Self {
        Self {
            removed_sections: DEFAULT_REMOVED_SECTIONS.iter().map(|s| s.to_string()).collect(),
            dropped_link_prefixes: DEFAULT_DROPPED_LINK_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl WikiTextCleaner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list of removed section titles
    pub fn with_removed_sections(mut self, titles: impl IntoIterator<Item = String>) -> Self {
        self.removed_sections = titles.into_iter().map(|t| t.trim().to_lowercase()).collect();
        self
    }

    /// Replace the list of link namespaces removed with their captions
    pub fn with_dropped_link_prefixes(mut self, prefixes: impl IntoIterator<Item = String>) -> Self {
        self.dropped_link_prefixes = prefixes.into_iter().collect();
        self
    }

    /// Run the whole pipeline over one page body
    pub fn clean(&self, wikitext: &str) -> String {
        let mut text = remove_comments(wikitext);
        text = self.remove_sections(&text);
        text = remove_templates(&text);
        text = remove_blocks(&text);
        text = unwrap_escaped_emphasis(&text);
        text = remove_tables(&text);
        text = remove_residual_templates(&text);
        text = self.remove_namespace_links(&text);
        text = unwrap_links(&text);
        text = remove_references(&text);
        text = strip_html_tags(&text);
        text = remove_emphasis(&text);
        text = remove_html_tables(&text);
        text = remove_external_links(&text);
        text = remove_headings(&text);
        text = remove_list_lines(&text);
        text = remove_indented_blocks(&text);
        text = collapse_whitespace(&text);
        final_cleanup(&text)
    }

    /// Drop named sections from their heading to the next heading of the same
    /// or a higher level
    fn remove_sections(&self, text: &str) -> String {
        let mut result = String::with_capacity(text.len());
        let mut skipping: Option<usize> = None;

        for line in text.split_inclusive('\n') {
            match parse_heading(line) {
                Some((level, title)) => {
                    if matches!(skipping, Some(removed) if level > removed) {
                        continue;
                    }
                    skipping = None;
                    if self.removed_sections.contains(&title.to_lowercase()) {
                        skipping = Some(level);
                        continue;
                    }
                }
                None if skipping.is_some() => continue,
                None => {}
            }
            result.push_str(line);
        }

        result
    }

    /// `[[File:...]]`, `[[Image:...]]` and similar, with nested caption links
    fn remove_namespace_links(&self, text: &str) -> String {
        remove_prefixed_links(text, &self.dropped_link_prefixes)
    }
}

/// Parse `== Title ==` into its level and title
fn parse_heading(line: &str) -> Option<(usize, &str)> {
    let line = line.trim();
    let leading = line.bytes().take_while(|&b| b == b'=').count();
    let trailing = line.bytes().rev().take_while(|&b| b == b'=').count();

    if leading < 2 || trailing < 2 || leading + trailing >= line.len() {
        return None;
    }

    let title = line[leading..line.len() - trailing].trim();
    Some((leading.min(trailing), title))
}

/// `<!-- ... -->`; an unterminated comment runs to the end of the text
fn remove_comments(text: &str) -> String {
    strip(text, compiled(&RE_COMMENT, r"(?s)<!--.*?(?:-->|\z)"))
}

fn remove_templates(text: &str) -> String {
    remove_balanced(text, "{{", "}}", Unclosed::DropRest)
}

/// Math, gallery, div, timeline and mapframe blocks; first opener to first closer
fn remove_blocks(text: &str) -> String {
    let mut result = strip(text, compiled(&RE_MATH, r"(?is)<math\b[^>]*>.*?</math\s*>"));

    // Inline math: `$x$` with no space just inside the delimiters, so
    // currency amounts like `5 $ et 3 $` survive
    result = strip(
        &result,
        compiled(&RE_INLINE_MATH, r"\$[^\s$](?:[^$]*[^\s$])?\$"),
    );
    result = strip(
        &result,
        compiled(&RE_DISPLAYSTYLE, r"(?s)\\displaystyle\{.*?\}"),
    );

    let blocks = RE_BLOCKS.get_or_init(|| {
        BLOCK_TAGS
            .iter()
            .map(|tag| {
                Regex::new(&format!(r"(?is)<{tag}\b.*?</{tag}\s*>"))
                    .expect("hard-coded pattern compiles")
            })
            .collect()
    });
    for re in blocks {
        result = strip(&result, re);
    }

    result
}

/// `\'\'word\'\'` -> `word`
fn unwrap_escaped_emphasis(text: &str) -> String {
    compiled(&RE_ESCAPED_EMPHASIS, r"\\'\\'([^\\]*)\\'\\'")
        .replace_all(text, "$1")
        .into_owned()
}

/// `{| ... |}` wikitables at any nesting depth, then simpler leftovers
fn remove_tables(text: &str) -> String {
    let result = remove_balanced(text, "{|", "|}", Unclosed::Keep);
    let result = strip(&result, compiled(&RE_TABLE_CLASS, r"(?s)\{\| class=.*?\|\}"));
    strip(&result, compiled(&RE_TABLE_RESIDUAL, r"(?s)\{\|.*?\|\}"))
}

fn remove_residual_templates(text: &str) -> String {
    strip(text, compiled(&RE_TEMPLATE_RESIDUAL, r"\{\{[^}]*\}\}"))
}

/// `[[target|display]]` -> `display`, `[[target]]` -> `target`; innermost first
fn unwrap_links(text: &str) -> String {
    let re = compiled(&RE_WIKILINK, r"\[\[(?:[^|\[\]]*\|)?([^\[\]]+)\]\]");
    let mut result = text.to_string();
    // Each round removes at least one `[[`, so this terminates
    while re.is_match(&result) {
        result = re.replace_all(&result, "$1").into_owned();
    }
    result
}

/// `<ref name="x"/>` and `<ref ...>...</ref>`
fn remove_references(text: &str) -> String {
    let result = strip(text, compiled(&RE_REF_SELF_CLOSING, r"(?i)<ref\b[^>]*/>"));
    strip(&result, compiled(&RE_REF, r"(?is)<ref\b[^>]*>.*?</ref\s*>"))
}

fn strip_html_tags(text: &str) -> String {
    strip(text, compiled(&RE_HTML_TAG, r"<[^>]+>"))
}

/// Bold and italic markers; single apostrophes inside words are kept
fn remove_emphasis(text: &str) -> String {
    strip(text, compiled(&RE_APOSTROPHES, r"'{2,}"))
}

fn remove_html_tables(text: &str) -> String {
    strip(text, compiled(&RE_HTML_TABLE, r"(?is)<table[^>]*>.*?</table>"))
}

/// `[https://example.org description]`
fn remove_external_links(text: &str) -> String {
    strip(text, compiled(&RE_EXTERNAL_LINK, r"\[https?://[^\]]+\]"))
}

/// Whole headings, title included; longest markers first
fn remove_headings(text: &str) -> String {
    let mut result = strip(text, compiled(&RE_HEADING5, r"=====[^=]+====="));
    result = strip(&result, compiled(&RE_HEADING4, r"====[^=]+===="));
    result = strip(&result, compiled(&RE_HEADING3, r"===[^=]+==="));
    strip(&result, compiled(&RE_HEADING2, r"==[^=]+=="))
}

/// Bullet lines, indented or not; `***` before `**` before `*`
fn remove_list_lines(text: &str) -> String {
    let mut result = strip(
        text,
        compiled(&RE_LIST3, r"(?m)^[ \t]*\*\*\*[^\n]*(?:\n|\z)"),
    );
    result = strip(
        &result,
        compiled(&RE_LIST2, r"(?m)^[ \t]*\*\*[^\n]*(?:\n|\z)"),
    );
    strip(&result, compiled(&RE_LIST1, r"(?m)^[ \t]*\*[^\n]*(?:\n|\z)"))
}

/// Lines indented by four or more spaces (preformatted or pseudo-code)
fn remove_indented_blocks(text: &str) -> String {
    strip(text, compiled(&RE_INDENTED, r"\n {4,}[^\n]*"))
}

fn collapse_whitespace(text: &str) -> String {
    compiled(&RE_WHITESPACE, r"\s+")
        .replace_all(text, " ")
        .into_owned()
}

/// Leftover escaped quotes, emphasis and templates, then tidy the gaps they
/// leave. Tag stripping can splice `{<br/>{x}}` back into a template, and
/// removing one construct can rebuild the other, so repeat until stable.
fn final_cleanup(text: &str) -> String {
    let mut result = text.replace("\\'\\'", "");
    loop {
        let next = remove_residual_templates(&remove_emphasis(&result));
        if next == result {
            break;
        }
        result = next;
    }
    let result = compiled(&RE_SPACES, r" {2,}").replace_all(&result, " ");
    let result = compiled(&RE_NEWLINES, r"\n+").replace_all(&result, "\n");
    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_templates() {
        assert_eq!(clean("A{{t1{{t2}}x}}B"), "AB");
    }

    #[test]
    fn test_section_removal_keeps_following_section() {
        let result = clean("Intro.\n== Voir aussi ==\nSome links\n== Next ==\nKept");
        assert!(result.contains("Kept"));
        assert!(result.contains("Intro."));
        assert!(!result.contains("Some links"));
        assert!(!result.contains("Voir aussi"));
    }

    #[test]
    fn test_section_removal_is_case_insensitive_and_covers_subsections() {
        let cleaner = WikiTextCleaner::new();
        let text = "Corps.\n== NOTES ET RÉFÉRENCES ==\n=== Notes ===\nn1\n=== Références ===\nr1\n== Histoire ==\nh1\n";
        let result = cleaner.remove_sections(text);
        assert_eq!(result, "Corps.\n== Histoire ==\nh1\n");
    }

    #[test]
    fn test_section_removal_at_end_of_text() {
        let result = clean("Corps du texte.\n\n== Liens externes ==\n* [http://example.org Site]");
        assert_eq!(result, "Corps du texte.");
    }

    #[test]
    fn test_heading_parsing() {
        assert_eq!(parse_heading("== Histoire ==\n"), Some((2, "Histoire")));
        assert_eq!(parse_heading("===Géographie==="), Some((3, "Géographie")));
        assert_eq!(parse_heading("== Voir aussi ==="), Some((2, "Voir aussi")));
        assert_eq!(parse_heading("a == b"), None);
        assert_eq!(parse_heading("===="), None);
    }

    #[test]
    fn test_math_and_blocks() {
        let text = "Soit <math>x^2 + y^2</math> une forme. <gallery>\nA.jpg\n</gallery>Fin <div class=\"x\">boîte</div>. <timeline>t</timeline><mapframe zoom=3>m</mapframe>ok";
        let result = clean(text);
        assert_eq!(result, "Soit une forme. Fin . ok");
    }

    #[test]
    fn test_inline_math_and_currency() {
        assert_eq!(clean("On pose $x+1$ ici."), "On pose ici.");
        assert_eq!(clean("Il coûte 5 $ et 3 $ seulement."), "Il coûte 5 $ et 3 $ seulement.");
        assert_eq!(clean(r"Forme \displaystyle{a+b} fin"), "Forme fin");
    }

    #[test]
    fn test_escaped_emphasis_unwrapped() {
        assert_eq!(clean(r"Le \'\'Monde\'\' titre"), "Le Monde titre");
    }

    #[test]
    fn test_tables_removed_including_nested() {
        let text = "Avant\n{| class=\"wikitable\"\n|-\n| cellule {| \n| imbriquée\n|}\n|}\nAprès";
        assert_eq!(clean(text), "Avant Après");
    }

    #[test]
    fn test_file_links_and_categories_removed() {
        let text = "[[Fichier:Tour.jpg|vignette|upright=1|La [[tour Eiffel]]]] La [[tour Eiffel]] est à [[Paris|la capitale]].\n[[Catégorie:Monument]]";
        assert_eq!(clean(text), "La tour Eiffel est à la capitale.");
    }

    #[test]
    fn test_nested_plain_links_unwrap_innermost_first() {
        assert_eq!(unwrap_links("[[a [[b]] c]]"), "a b c");
        assert_eq!(unwrap_links("[[x|y|z]]"), "y|z");
    }

    #[test]
    fn test_references() {
        let text = "Fait<ref name=\"a\"/> établi<ref>{{cite|x}} Source</ref> ici<ref group=n>note</ref>.";
        assert_eq!(clean(text), "Fait établi ici.");
    }

    #[test]
    fn test_self_closing_ref_does_not_swallow_text() {
        let text = "Un<ref name=a/> deux trois<ref>src</ref> quatre";
        assert_eq!(remove_references(text), "Un deux trois quatre");
    }

    #[test]
    fn test_emphasis_keeps_single_apostrophes() {
        assert_eq!(
            clean("L'''''histoire''''' de l'art et ''la'' '''ville'''"),
            "Lhistoire de l'art et la ville"
        );
    }

    #[test]
    fn test_external_links() {
        assert_eq!(
            clean("Voir [https://example.org le site officiel] pour plus."),
            "Voir pour plus."
        );
    }

    #[test]
    fn test_headings_removed_with_title() {
        let text = "Intro\n== Histoire ==\nA\n=== Origines ===\nB\n===== Détail =====\nC";
        assert_eq!(clean(text), "Intro A B C");
    }

    #[test]
    fn test_list_lines_most_specific_first() {
        let text = "Texte\n*** trois\n** deux\n* un\nSuite";
        assert_eq!(remove_list_lines(text), "Texte\nSuite");
    }

    #[test]
    fn test_indented_bullets_removed() {
        assert_eq!(clean(" * puce en tête"), "");
        assert_eq!(clean("{{Ébauche}} * puce"), "");
        assert_eq!(clean("<!-- c --> ** x\nTexte."), "Texte.");
        assert_eq!(remove_list_lines("A\n \t* b\nC"), "A\nC");
    }

    #[test]
    fn test_template_rebuilt_by_tag_stripping() {
        assert_eq!(clean("Texte {<br/>{modèle}} fin"), "Texte fin");
        assert_eq!(clean("x '{<b></b>{y}}' z"), "x z");
    }

    #[test]
    fn test_indented_blocks() {
        let text = "Algorithme :\n    pour i de 1 à n\n      faire x\nRésultat.";
        assert_eq!(clean(text), "Algorithme : Résultat.");
    }

    #[test]
    fn test_bullets_before_indentation() {
        let text = "Début\n* item\n    code\nFin";
        assert_eq!(clean(text), "Début Fin");
    }

    #[test]
    fn test_whitespace_flattened() {
        assert_eq!(clean("  Ligne un\n\n\nLigne   deux\t\n"), "Ligne un Ligne deux");
    }

    #[test]
    fn test_comments_removed() {
        assert_eq!(clean("Visible<!-- caché\n== x == --> texte"), "Visible texte");
        assert_eq!(clean("Visible <!-- jamais fermé"), "Visible");
    }

    #[test]
    fn test_empty_and_markup_only_inputs() {
        assert_eq!(clean(""), "");
        assert_eq!(clean("{{Infobox|a=b}}\n[[Catégorie:X]]"), "");
    }

    #[test]
    fn test_custom_section_list() {
        let cleaner =
            WikiTextCleaner::new().with_removed_sections(vec!["Palmarès".to_string()]);
        let result = cleaner.clean("Club.\n== Palmarès ==\nTitres\n== Voir aussi ==\nLiens");
        assert_eq!(result, "Club. Liens");
    }

    #[test]
    fn test_idempotent_on_own_output() {
        let samples = [
            "'''Paris''' est la [[capitale]] de la [[France]].{{Infobox|x={{y}}}}\n\n== Histoire ==\nFondée<ref>src</ref> par les ''Parisii''.\n* liste\n    code\n== Voir aussi ==\n[[Lyon]]",
            "{| class=\"wikitable\"\n| a || b\n|}\nTexte avec <math>x</math> et $y$.\n[[Fichier:a.png|vignette|[[b]]]]",
            "Un   texte\n\n\nsimple, sans balisage.",
            " * puce en tête",
            "{{Ébauche}} * puce",
            "<!-- c --> ** x",
            "Intro.\n  *** liste indentée\nSuite.",
            "Texte {<br/>{modèle}} fin",
        ];
        for sample in samples {
            let once = clean(sample);
            assert_eq!(clean(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_no_residual_markup_tokens() {
        let text = "<div>x</div>'''Gras''' {{a|{{b}}}} {| t |} [[Image:x.png|[[y]]]] <span>z</span> ''i''";
        let result = clean(text);
        assert!(!result.contains('<'));
        assert!(!result.contains("{{"));
        assert!(!result.contains("{|"));
        assert!(!result.contains("''"));
    }
}
