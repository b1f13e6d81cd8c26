//! Page filters and the post-cleaning residue gate

use super::source::{NamespaceClass, RawPage, RejectionReason};

const REDIRECT_MARKER: &str = "#redirect";

/// Title prefixes of non-article namespaces, matched case-sensitively
const NAMESPACE_PREFIXES: &[(&str, NamespaceClass)] = &[
    ("Portail:", NamespaceClass::Portal),
    ("Portal:", NamespaceClass::Portal),
    ("Projet:", NamespaceClass::Project),
    ("Catégorie:", NamespaceClass::Category),
    ("Category:", NamespaceClass::Category),
    ("Wikipédia:", NamespaceClass::Meta),
    ("Wikipedia:", NamespaceClass::Meta),
    ("MediaWiki:", NamespaceClass::Meta),
    ("Aide:", NamespaceClass::Meta),
    ("Help:", NamespaceClass::Meta),
    ("Modèle:", NamespaceClass::Other),
    ("Template:", NamespaceClass::Other),
    ("Fichier:", NamespaceClass::Other),
    ("File:", NamespaceClass::Other),
    ("Module:", NamespaceClass::Other),
    ("Utilisateur:", NamespaceClass::Other),
    ("User:", NamespaceClass::Other),
    ("Référence:", NamespaceClass::Other),
    ("Spécial:", NamespaceClass::Other),
    ("Special:", NamespaceClass::Other),
];

/// Default residue markers; these only survive when table or HTML markup
/// escaped the cleaner
pub const DEFAULT_RESIDUE_BLACKLIST: &[&str] = &["width", "colspan", "valign", "align=", "upright="];

/// Whether a page body is a redirect (`#REDIRECT`, `#redirect`, `#REDIRECTION`, ...)
pub fn is_redirect_body(body: &str) -> bool {
    body.trim_start()
        .get(..REDIRECT_MARKER.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(REDIRECT_MARKER))
}

/// Redirect and namespace checks applied to every extracted page
#[derive(Debug, Clone, Default)]
pub struct PageFilter {
    /// Additional prefixes from configuration, classified as `Other`
    extra_prefixes: Vec<String>,
}

impl PageFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclude more title prefixes on top of the built-in list
    pub fn with_extra_prefixes(mut self, prefixes: impl IntoIterator<Item = String>) -> Self {
        self.extra_prefixes.extend(prefixes);
        self
    }

    /// Classify a title by prefix, falling back on the numeric `<ns>` value
    pub fn classify(&self, title: &str, ns: Option<i32>) -> NamespaceClass {
        if let Some((_, class)) = NAMESPACE_PREFIXES
            .iter()
            .find(|(prefix, _)| title.starts_with(prefix))
        {
            return *class;
        }

        if self.extra_prefixes.iter().any(|p| title.starts_with(p.as_str())) {
            return NamespaceClass::Other;
        }

        match ns {
            Some(n) if n != 0 => NamespaceClass::Other,
            _ => NamespaceClass::Article,
        }
    }

    /// Redirect check, then namespace check
    pub fn check(&self, page: &RawPage) -> Result<(), RejectionReason> {
        if page.is_redirect || is_redirect_body(&page.body) {
            return Err(RejectionReason::Redirect);
        }
        if !page.namespace_class.is_article() {
            return Err(RejectionReason::ExcludedNamespace);
        }
        Ok(())
    }
}

/// Rejects cleaned text that still carries markup residue
#[derive(Debug, Clone)]
pub struct ResidueGate {
    blacklist: Vec<String>,
}

impl Default for ResidueGate {
    fn default() -> Self {
        Self::new(DEFAULT_RESIDUE_BLACKLIST.iter().map(|s| s.to_string()))
    }
}

impl ResidueGate {
    pub fn new(blacklist: impl IntoIterator<Item = String>) -> Self {
        Self {
            blacklist: blacklist.into_iter().filter(|s| !s.is_empty()).collect(),
        }
    }

    /// First blacklisted token present in `text`
    pub fn find<'a>(&'a self, text: &str) -> Option<&'a str> {
        self.blacklist
            .iter()
            .find(|token| text.contains(token.as_str()))
            .map(String::as_str)
    }

    /// Must run on the final cleaned text
    pub fn check(&self, text: &str) -> Result<(), RejectionReason> {
        match self.find(text) {
            Some(_) => Err(RejectionReason::BlacklistedResidue),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(title: &str, body: &str) -> RawPage {
        let filter = PageFilter::new();
        RawPage {
            title: title.to_string(),
            namespace_class: filter.classify(title, None),
            body: body.to_string(),
            is_redirect: false,
        }
    }

    #[test]
    fn test_redirect_marker_is_case_insensitive() {
        assert!(is_redirect_body("#REDIRECT [[Other Page]]"));
        assert!(is_redirect_body("#redirect [[Other Page]]"));
        assert!(is_redirect_body("#REDIRECTION [[Autre page]]"));
        assert!(is_redirect_body("  #Redirect [[x]]"));
        assert!(!is_redirect_body("Le #redirect est un mot-dièse."));
        assert!(!is_redirect_body("#"));
    }

    #[test]
    fn test_classification() {
        let filter = PageFilter::new();
        assert_eq!(filter.classify("Catégorie:Physique", None), NamespaceClass::Category);
        assert_eq!(filter.classify("Portail:Sciences", None), NamespaceClass::Portal);
        assert_eq!(filter.classify("Projet:Chimie", None), NamespaceClass::Project);
        assert_eq!(filter.classify("Wikipédia:Accueil", None), NamespaceClass::Meta);
        assert_eq!(filter.classify("Modèle:Infobox", None), NamespaceClass::Other);
        assert_eq!(filter.classify("Star Wars: Episode IV", None), NamespaceClass::Article);
        assert_eq!(filter.classify("Paris", Some(0)), NamespaceClass::Article);
        assert_eq!(filter.classify("Untitled", Some(4)), NamespaceClass::Other);
    }

    #[test]
    fn test_prefix_match_is_case_sensitive() {
        let filter = PageFilter::new();
        assert_eq!(filter.classify("catégorie:x", None), NamespaceClass::Article);
    }

    #[test]
    fn test_extra_prefixes() {
        let filter = PageFilter::new().with_extra_prefixes(vec!["Sujet:".to_string()]);
        assert_eq!(filter.classify("Sujet:abc", None), NamespaceClass::Other);
    }

    #[test]
    fn test_check_order_redirect_before_namespace() {
        let filter = PageFilter::new();
        let p = page("Catégorie:Foo", "#REDIRECT [[Bar]]");
        assert_eq!(filter.check(&p), Err(RejectionReason::Redirect));

        let p = page("Catégorie:Foo", "Du texte.");
        assert_eq!(filter.check(&p), Err(RejectionReason::ExcludedNamespace));

        let p = page("Foo", "Du texte.");
        assert_eq!(filter.check(&p), Ok(()));
    }

    #[test]
    fn test_redirect_flag_from_element() {
        let filter = PageFilter::new();
        let mut p = page("Foo", "Some body");
        p.is_redirect = true;
        assert_eq!(filter.check(&p), Err(RejectionReason::Redirect));
    }

    #[test]
    fn test_residue_gate() {
        let gate = ResidueGate::default();
        assert_eq!(
            gate.check("Tableau colspan 2 restant"),
            Err(RejectionReason::BlacklistedResidue)
        );
        assert_eq!(gate.find("image upright=1.2 ici"), Some("upright="));
        assert_eq!(gate.check("Un texte propre."), Ok(()));
    }

    #[test]
    fn test_residue_gate_ignores_empty_tokens() {
        let gate = ResidueGate::new(vec![String::new(), "valign".to_string()]);
        assert_eq!(gate.check("anything"), Ok(()));
    }
}
