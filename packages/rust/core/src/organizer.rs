//! Set organizer: classifies documents into labeled sets for the manifest.
//!
//! All patterns are compiled and cross-checked when the organizer is built,
//! so configuration mistakes surface at startup instead of per request.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, instrument};

use docsets_shared::{
    DocsetsError, Document, ExternalLink, LlmsConfig, Result, SetDeclaration, SiteConfig,
};

use crate::glob::PatternSet;

// ---------------------------------------------------------------------------
// Manifest model
// ---------------------------------------------------------------------------

/// Project-level metadata shown in the manifest header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectMeta {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Base URL for document links (no trailing `/`); empty for root-relative links.
    pub base_url: String,
}

impl ProjectMeta {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            name: config.project_name().to_string(),
            description: config.project_description().map(str::to_string),
            details: config.llms.details.clone(),
            base_url: config
                .site
                .site_url
                .as_deref()
                .unwrap_or("")
                .trim_end_matches('/')
                .to_string(),
        }
    }
}

/// A document reference inside a set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestEntry {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ManifestEntry {
    fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            title: doc.display_title(),
            description: doc.description().map(str::to_string),
        }
    }
}

/// One organized set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestSet {
    pub label: String,
    /// File-name-safe form of the label (`_llms-txt/<slug>.txt`).
    pub slug: String,
    pub description: String,
    pub patterns: Vec<String>,
    pub members: Vec<ManifestEntry>,
}

/// The organized view of a collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub project: ProjectMeta,
    pub sets: Vec<ManifestSet>,
    pub links: Vec<ExternalLink>,
}

impl Manifest {
    /// Look up a set by label.
    pub fn set(&self, label: &str) -> Result<&ManifestSet> {
        self.sets
            .iter()
            .find(|s| s.label == label)
            .ok_or_else(|| DocsetsError::UnknownSetReference {
                label: label.to_string(),
            })
    }

    pub fn set_by_slug(&self, slug: &str) -> Option<&ManifestSet> {
        self.sets.iter().find(|s| s.slug == slug)
    }
}

// ---------------------------------------------------------------------------
// Organizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct CompiledSet {
    declaration: SetDeclaration,
    slug: String,
    paths: PatternSet,
    /// Set-scoped promotion patterns followed by the global ones.
    promote: PatternSet,
}

/// Validated set declarations plus ordering rules.
#[derive(Debug, Clone)]
pub struct SetOrganizer {
    project: ProjectMeta,
    sets: Vec<CompiledSet>,
    promote: PatternSet,
    demote: PatternSet,
    exclude: PatternSet,
    links: Vec<ExternalLink>,
}

impl SetOrganizer {
    pub fn from_config(config: &SiteConfig) -> Result<Self> {
        Self::new(ProjectMeta::from_config(config), &config.llms)
    }

    /// Compile and validate the `[llms]` declarations.
    ///
    /// Fails on duplicate set labels (or labels that collide once slugified)
    /// and with [`DocsetsError::UnknownSetReference`] when `set_promote`
    /// names a set that is not declared.
    pub fn new(project: ProjectMeta, config: &LlmsConfig) -> Result<Self> {
        let promote = PatternSet::new(&config.promote)?;
        let demote = PatternSet::new(&config.demote)?;
        let exclude = PatternSet::new(&config.exclude)?;

        let mut labels = HashSet::new();
        let mut slugs = HashSet::new();
        let mut sets = Vec::with_capacity(config.sets.len());

        for declaration in &config.sets {
            if !labels.insert(declaration.label.as_str()) {
                return Err(DocsetsError::validation(format!(
                    "set label '{}' is declared more than once",
                    declaration.label
                )));
            }

            let slug = slugify_label(&declaration.label);
            if !slugs.insert(slug.clone()) {
                return Err(DocsetsError::validation(format!(
                    "set label '{}' collides with another set as '{slug}'",
                    declaration.label
                )));
            }

            let scoped = match config.set_promote.get(&declaration.label) {
                Some(patterns) => PatternSet::new(patterns)?,
                None => PatternSet::default(),
            };

            sets.push(CompiledSet {
                declaration: declaration.clone(),
                slug,
                paths: PatternSet::new(&declaration.paths)?,
                promote: scoped.chain(&promote),
            });
        }

        if let Some(label) = config
            .set_promote
            .keys()
            .find(|label| !labels.contains(label.as_str()))
        {
            return Err(DocsetsError::UnknownSetReference {
                label: label.clone(),
            });
        }

        debug!(sets = sets.len(), "set organizer ready");

        Ok(Self {
            project,
            sets,
            promote,
            demote,
            exclude,
            links: config.optional_links.clone(),
        })
    }

    pub fn project(&self) -> &ProjectMeta {
        &self.project
    }

    /// Classify `documents` into the declared sets.
    ///
    /// Members keep document-store order, then promotion and demotion are
    /// applied per set. Documents matching no set are simply absent.
    #[instrument(skip_all, fields(documents = documents.len(), sets = self.sets.len()))]
    pub fn organize(&self, documents: &[Document]) -> Manifest {
        let sets = self
            .sets
            .iter()
            .map(|set| {
                let matched: Vec<&Document> = documents
                    .iter()
                    .filter(|doc| set.paths.matches(&doc.id))
                    .collect();
                let ordered = order_by_rules(matched, |d| d.id.as_str(), &set.promote, &self.demote);

                debug!(label = %set.declaration.label, members = ordered.len(), "organized set");

                ManifestSet {
                    label: set.declaration.label.clone(),
                    slug: set.slug.clone(),
                    description: set.declaration.description.clone(),
                    patterns: set.declaration.paths.clone(),
                    members: ordered.into_iter().map(ManifestEntry::from_document).collect(),
                }
            })
            .collect();

        Manifest {
            project: self.project.clone(),
            sets,
            links: self.links.clone(),
        }
    }

    /// The whole collection minus `exclude` matches, in promoted order.
    ///
    /// This is the document order of `llms-full.txt` and `llms-small.txt`.
    pub fn order_documents<'a>(&self, documents: &'a [Document]) -> Vec<&'a Document> {
        let kept: Vec<&Document> = documents
            .iter()
            .filter(|doc| !self.exclude.matches(&doc.id))
            .collect();
        order_by_rules(kept, |d| d.id.as_str(), &self.promote, &self.demote)
    }
}

/// Stable promote/demote ordering.
///
/// Promoted items (first matching promotion pattern wins, earlier patterns
/// first) lead, untouched items keep their relative order, and demoted items
/// (matching a demotion pattern but no promotion pattern) trail in demotion
/// pattern order. Ties always fall back to the original position.
pub fn order_by_rules<T>(
    items: Vec<T>,
    id: impl Fn(&T) -> &str,
    promote: &PatternSet,
    demote: &PatternSet,
) -> Vec<T> {
    let mut keyed: Vec<((u8, usize, usize), T)> = items
        .into_iter()
        .enumerate()
        .map(|(position, item)| {
            let key = match promote.first_match(id(&item)) {
                Some(rank) => (0, rank, position),
                None => match demote.first_match(id(&item)) {
                    Some(rank) => (2, rank, position),
                    None => (1, 0, position),
                },
            };
            (key, item)
        })
        .collect();

    keyed.sort_by_key(|(key, _)| *key);
    keyed.into_iter().map(|(_, item)| item).collect()
}

/// Lowercase, alphanumerics kept, everything else collapsed to single `-`.
pub fn slugify_label(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    for c in label.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use docsets_shared::Metadata;

    fn doc(id: &str, title: &str) -> Document {
        Document::new(id, Metadata::new().with("title", title).unwrap(), "...")
    }

    fn project() -> ProjectMeta {
        ProjectMeta {
            name: "Railpack Docs".into(),
            description: None,
            details: None,
            base_url: String::new(),
        }
    }

    fn set(label: &str, paths: &[&str]) -> SetDeclaration {
        SetDeclaration {
            label: label.into(),
            description: format!("{label} pages"),
            paths: paths.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn llms(sets: Vec<SetDeclaration>, promote: &[&str]) -> LlmsConfig {
        LlmsConfig {
            promote: promote.iter().map(|p| p.to_string()).collect(),
            sets,
            ..LlmsConfig::default()
        }
    }

    fn member_ids(set: &ManifestSet) -> Vec<&str> {
        set.members.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn promotion_is_stable() {
        let promote = PatternSet::new(["a*"]).unwrap();
        let ordered = order_by_rules(
            vec!["b1", "a1", "c1", "a2"],
            |s| *s,
            &promote,
            &PatternSet::default(),
        );
        assert_eq!(ordered, vec!["a1", "a2", "b1", "c1"]);
    }

    #[test]
    fn promotion_follows_pattern_order_then_position() {
        let promote = PatternSet::new(["c*", "a*"]).unwrap();
        let ordered = order_by_rules(
            vec!["a1", "b1", "c1", "a2", "c2"],
            |s| *s,
            &promote,
            &PatternSet::default(),
        );
        assert_eq!(ordered, vec!["c1", "c2", "a1", "a2", "b1"]);
    }

    #[test]
    fn demotion_moves_items_last_and_promotion_wins() {
        let promote = PatternSet::new(["x*"]).unwrap();
        let demote = PatternSet::new(["d*", "x*"]).unwrap();
        let ordered = order_by_rules(vec!["d1", "b1", "x1", "c1"], |s| *s, &promote, &demote);
        assert_eq!(ordered, vec!["x1", "b1", "c1", "d1"]);
    }

    #[test]
    fn scenario_guides_only() {
        let docs = vec![doc("guides/x", "X"), doc("config/y", "Y")];
        let organizer =
            SetOrganizer::new(project(), &llms(vec![set("Guides", &["guides/**"])], &[])).unwrap();

        let manifest = organizer.organize(&docs);
        assert_eq!(manifest.sets.len(), 1);
        assert_eq!(manifest.sets[0].label, "Guides");
        assert_eq!(member_ids(&manifest.sets[0]), vec!["guides/x"]);
        assert_eq!(manifest.sets[0].members[0].title, "X");
    }

    #[test]
    fn empty_pattern_list_yields_empty_set() {
        let docs: Vec<Document> = (0..50).map(|i| doc(&format!("page-{i}"), "P")).collect();
        let organizer =
            SetOrganizer::new(project(), &llms(vec![set("Nothing", &[])], &["page-*"])).unwrap();

        let manifest = organizer.organize(&docs);
        assert!(manifest.sets[0].members.is_empty());
    }

    #[test]
    fn documents_may_belong_to_several_sets() {
        let docs = vec![doc("reference/cli", "CLI"), doc("reference/frontend", "Frontend")];
        let organizer = SetOrganizer::new(
            project(),
            &llms(
                vec![
                    set("Reference", &["reference/**"]),
                    set("CLI", &["reference/cli"]),
                ],
                &[],
            ),
        )
        .unwrap();

        let manifest = organizer.organize(&docs);
        assert_eq!(member_ids(&manifest.sets[0]), vec!["reference/cli", "reference/frontend"]);
        assert_eq!(member_ids(&manifest.sets[1]), vec!["reference/cli"]);
    }

    #[test]
    fn sets_keep_declaration_order_and_links_are_verbatim() {
        let mut config = llms(
            vec![set("Zeta", &["z/**"]), set("Alpha", &["a/**"])],
            &[],
        );
        config.optional_links = vec![
            ExternalLink {
                label: "GitHub".into(),
                url: "https://github.com/railwayapp/railpack".into(),
                description: "Source".into(),
            },
            ExternalLink {
                label: "Discord".into(),
                url: "https://discord.gg/railway".into(),
                description: String::new(),
            },
        ];

        let manifest = SetOrganizer::new(project(), &config).unwrap().organize(&[]);
        let labels: Vec<&str> = manifest.sets.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Zeta", "Alpha"]);
        assert_eq!(manifest.links, config.optional_links);
    }

    #[test]
    fn set_scoped_promotion_precedes_global() {
        let docs = vec![
            doc("languages", "Languages"),
            doc("languages/golang", "Go"),
            doc("languages/node", "Node"),
            doc("languages/python", "Python"),
        ];
        let mut config = llms(vec![set("Languages", &["languages/**"])], &["languages"]);
        config
            .set_promote
            .insert("Languages".into(), vec!["languages/python".into()]);

        let manifest = SetOrganizer::new(project(), &config).unwrap().organize(&docs);
        assert_eq!(
            member_ids(&manifest.sets[0]),
            vec!["languages/python", "languages", "languages/golang", "languages/node"]
        );
    }

    #[test]
    fn set_promote_for_unknown_set_is_rejected() {
        let mut config = llms(vec![set("Guides", &["guides/**"])], &[]);
        config
            .set_promote
            .insert("Languages".into(), vec!["languages/node".into()]);

        match SetOrganizer::new(project(), &config).unwrap_err() {
            DocsetsError::UnknownSetReference { label } => assert_eq!(label, "Languages"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let config = llms(vec![set("Guides", &["a"]), set("Guides", &["b"])], &[]);
        assert!(SetOrganizer::new(project(), &config).is_err());

        let config = llms(vec![set("Build Guides", &["a"]), set("build-guides", &["b"])], &[]);
        assert!(SetOrganizer::new(project(), &config).is_err());
    }

    #[test]
    fn manifest_lookup_of_unknown_set_fails() {
        let organizer =
            SetOrganizer::new(project(), &llms(vec![set("Guides", &["guides/**"])], &[])).unwrap();
        let manifest = organizer.organize(&[]);

        assert!(manifest.set("Guides").is_ok());
        assert!(matches!(
            manifest.set("Nope"),
            Err(DocsetsError::UnknownSetReference { .. })
        ));
        assert_eq!(manifest.set_by_slug("guides").map(|s| s.label.as_str()), Some("Guides"));
    }

    #[test]
    fn order_documents_applies_exclude_and_rules() {
        let docs = vec![
            doc("architecture/overview", "Overview"),
            doc("contributing", "Contributing"),
            doc("guides/x", "X"),
            doc("index", "Home"),
        ];
        let mut config = llms(vec![], &["index*"]);
        config.demote = vec!["contributing".into()];
        config.exclude = vec!["architecture/**".into()];

        let organizer = SetOrganizer::new(project(), &config).unwrap();
        let ids: Vec<&str> = organizer
            .order_documents(&docs)
            .iter()
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(ids, vec!["index", "guides/x", "contributing"]);
    }

    #[test]
    fn slugify_label_handles_punctuation() {
        assert_eq!(slugify_label("Guides"), "guides");
        assert_eq!(slugify_label("Build & Deploy Guides"), "build-deploy-guides");
        assert_eq!(slugify_label("  API (v2) "), "api-v2");
    }

    fn unique_ids() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-c]{1,2}(/[a-c0-9]{1,3}){0,2}", 0..24).prop_map(|ids| {
            let mut seen = std::collections::HashSet::new();
            ids.into_iter()
                .filter(|id| seen.insert(id.clone()))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn set_without_patterns_stays_empty(
            ids in unique_ids(),
            promote in prop::collection::vec("[a-c]{1,2}(/\\*\\*)?", 0..3),
        ) {
            let docs: Vec<Document> = ids.iter().map(|id| doc(id, "P")).collect();
            let promote: Vec<&str> = promote.iter().map(String::as_str).collect();
            let organizer =
                SetOrganizer::new(project(), &llms(vec![set("Nothing", &[])], &promote)).unwrap();

            let manifest = organizer.organize(&docs);
            prop_assert!(manifest.sets[0].members.is_empty());
        }

        #[test]
        fn promotion_groups_by_pattern_and_keeps_relative_order(
            ids in unique_ids(),
            prefixes in prop::collection::vec("[a-c]", 0..3),
        ) {
            let patterns: Vec<String> = prefixes.iter().map(|p| format!("{p}*/**")).collect();
            let promote = PatternSet::new(&patterns).unwrap();

            let items: Vec<&str> = ids.iter().map(String::as_str).collect();
            let ordered = order_by_rules(
                items,
                |s| *s,
                &promote,
                &PatternSet::default(),
            );

            let mut expected = Vec::new();
            for rank in 0..patterns.len() {
                expected.extend(
                    ids.iter()
                        .map(String::as_str)
                        .filter(|id| promote.first_match(id) == Some(rank)),
                );
            }
            expected.extend(
                ids.iter()
                    .map(String::as_str)
                    .filter(|id| promote.first_match(id).is_none()),
            );
            prop_assert_eq!(ordered, expected);
        }
    }
}
