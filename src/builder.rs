//! The merge pass: classification text + dialects text + stored tree → new tree.
//!
//! A pass runs in three phases so that a rejected input never leaves anything half applied:
//!
//! 1. **Read**: both texts are parsed completely ([`crate::codec`]).
//! 2. **Resolve**: every mention is resolved to an identifier through the [`NodeRegistry`] and
//!    validated (names, levels, isolates, lineages, dialect heads). The result is an ordered list
//!    of writes, classification text first, each text in file order.
//! 3. **Apply**: the writes are replayed onto a private copy of the stored tree (last write wins
//!    for parents and external codes), unmentioned leaves without a code are pruned, and the
//!    finished tree is checked as a whole. The difference to the stored tree is returned as
//!    [`TreeOp`]s; nothing is written to storage here.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    codec::{
        read_classification, read_dialects, ChainElement, ClassificationBlock, DialectEntry,
        OutlineNode, SourceLocation, CLASSIFICATION_SOURCE, DIALECTS_SOURCE,
    },
    error::LanguoidError,
    materialize::{plan, OpSummary, TreeOp},
    properties::{ExternalCode, Glottocode, Languoid, Level},
    registry::{check_duplicate_siblings, check_isolate, check_lineage, NodeRegistry, TextSource},
    tree::LanguoidTree,
};

/// Result of a successful merge pass.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The reconciled tree.
    pub tree: LanguoidTree,
    /// Storage operations turning the stored tree into [`MergeOutcome::tree`], in a safe order.
    pub ops: Vec<TreeOp>,
    /// Identifiers handed out to blank (`[]`) mentions.
    pub minted: BTreeSet<Glottocode>,
}

impl MergeOutcome {
    pub fn summary(&self) -> OpSummary {
        OpSummary::from_ops(&self.ops)
    }
}

#[derive(Debug, Clone)]
enum ParentWrite {
    Set(Option<Glottocode>),
    /// Dialects entries leave the position of their language to the classification text.
    Keep,
}

#[derive(Debug, Clone)]
struct Write {
    id: Glottocode,
    name: String,
    level: Level,
    code: Option<ExternalCode>,
    parent: ParentWrite,
}

impl Write {
    fn new(id: &Glottocode, element: &ChainElement, level: Level, parent: ParentWrite) -> Self {
        Write {
            id: id.clone(),
            name: element.name.clone(),
            level,
            code: element.code.clone(),
            parent,
        }
    }
}

/// Parse both texts and merge them into `stored`.
pub fn merge(
    stored: &LanguoidTree,
    classification_text: &str,
    dialects_text: &str,
) -> Result<MergeOutcome, LanguoidError> {
    tracing::debug!("Phase 1: read classification and dialects texts");
    let classification = read_classification(classification_text, CLASSIFICATION_SOURCE)?;
    let dialects = read_dialects(dialects_text, DIALECTS_SOURCE)?;
    TreeBuilder::new(stored).build(&classification, &dialects)
}

/// Builds the reconciled tree out of already parsed texts. See the module documentation.
#[derive(Debug)]
pub struct TreeBuilder<'a> {
    stored: &'a LanguoidTree,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(stored: &'a LanguoidTree) -> Self {
        TreeBuilder { stored }
    }

    pub fn build(
        &self,
        classification: &[ClassificationBlock],
        dialects: &[DialectEntry],
    ) -> Result<MergeOutcome, LanguoidError> {
        tracing::debug!(
            "Phase 2: resolve {} classification blocks and {} dialect entries",
            classification.len(),
            dialects.len()
        );
        let reserved = explicit_ids(classification, dialects);
        let dialect_heads = dialects
            .iter()
            .filter_map(|entry| entry.chain.first().and_then(|e| e.known_id()).cloned())
            .collect::<BTreeSet<Glottocode>>();
        let mut pass = Pass {
            registry: NodeRegistry::new(self.stored, reserved),
            writes: Vec::new(),
        };
        for block in classification {
            pass.classification_block(block, &dialect_heads)?;
        }
        for entry in dialects {
            pass.dialect_entry(entry)?;
        }

        tracing::debug!("Phase 3: apply {} writes", pass.writes.len());
        let mut tree = self.stored.clone();
        apply_writes(&mut tree, &pass.writes)?;
        prune(&mut tree, &pass.registry)?;
        check_sibling_names(&tree, &pass.registry)?;
        tree.check_structure()?;

        let ops = plan(self.stored, &tree);
        let outcome = MergeOutcome {
            tree,
            ops,
            minted: pass.registry.minted().clone(),
        };
        tracing::info!(
            "Merge pass resolved {} languoids: {}",
            outcome.tree.len(),
            outcome.summary()
        );
        Ok(outcome)
    }
}

fn explicit_ids(
    classification: &[ClassificationBlock],
    dialects: &[DialectEntry],
) -> BTreeSet<Glottocode> {
    fn outline_ids(nodes: &[OutlineNode], out: &mut BTreeSet<Glottocode>) {
        for node in nodes {
            out.extend(node.element.known_id().cloned());
            outline_ids(&node.children, out);
        }
    }
    let mut ids = BTreeSet::new();
    for block in classification {
        ids.extend(block.path.iter().filter_map(|e| e.known_id().cloned()));
        for language in &block.languages {
            ids.extend(language.element.known_id().cloned());
            ids.extend(language.dialects.iter().filter_map(|(e, _)| e.known_id().cloned()));
        }
    }
    for entry in dialects {
        ids.extend(entry.chain.iter().filter_map(|e| e.known_id().cloned()));
        outline_ids(&entry.children, &mut ids);
    }
    ids
}

struct Pass<'a> {
    registry: NodeRegistry<'a>,
    writes: Vec<Write>,
}

impl Pass<'_> {
    fn classification_block(
        &mut self,
        block: &ClassificationBlock,
        dialect_heads: &BTreeSet<Glottocode>,
    ) -> Result<(), LanguoidError> {
        check_isolate(&block.path, &block.location)?;
        if let Some(code) = block.path.iter().find(|e| e.is_isolate()).and_then(|e| e.code.as_ref()) {
            return Err(LanguoidError::Format(format!(
                "the isolate marker cannot carry the code {code}"
            ))
            .located(&block.location));
        }
        let mut parent: Option<Glottocode> = None;
        let mut lineage: Vec<&str> = Vec::new();
        if !block.is_isolate() {
            for element in &block.path {
                lineage.push(&element.name);
                check_lineage(&lineage, &block.location)?;
                let id = self.registry.resolve(
                    element,
                    Level::Family,
                    parent.as_ref(),
                    TextSource::Classification,
                    &block.location,
                )?;
                self.writes.push(Write::new(
                    &id,
                    element,
                    Level::Family,
                    ParentWrite::Set(parent.clone()),
                ));
                parent = Some(id);
            }
        }
        let path_label = lineage.last().copied().unwrap_or("the isolates");
        check_duplicate_siblings(
            path_label,
            block.languages.iter().map(|l| l.element.name.as_str()),
            Some(&block.location),
        )?;

        for language in &block.languages {
            lineage.push(&language.element.name);
            check_lineage(&lineage, &language.location)?;
            let id = self.registry.resolve(
                &language.element,
                Level::Language,
                parent.as_ref(),
                TextSource::Classification,
                &language.location,
            )?;
            self.writes.push(Write::new(
                &id,
                &language.element,
                Level::Language,
                ParentWrite::Set(parent.clone()),
            ));
            if dialect_heads.contains(&id) {
                if !language.dialects.is_empty() {
                    tracing::debug!(
                        "{} shallow dialects of {id} superseded by the dialects text",
                        language.dialects.len()
                    );
                }
                lineage.pop();
                continue;
            }
            check_duplicate_siblings(
                &language.element.name,
                language.dialects.iter().map(|(d, _)| d.name.as_str()),
                Some(&language.location),
            )?;
            for (dialect, location) in &language.dialects {
                lineage.push(&dialect.name);
                check_lineage(&lineage, location)?;
                lineage.pop();
                let dialect_id = self.registry.resolve(
                    dialect,
                    Level::Dialect,
                    Some(&id),
                    TextSource::Classification,
                    location,
                )?;
                self.writes.push(Write::new(
                    &dialect_id,
                    dialect,
                    Level::Dialect,
                    ParentWrite::Set(Some(id.clone())),
                ));
            }
            lineage.pop();
        }
        Ok(())
    }

    fn dialect_entry(&mut self, entry: &DialectEntry) -> Result<(), LanguoidError> {
        check_isolate(&entry.chain, &entry.location)?;
        let head = &entry.chain[0];
        if head.is_isolate() {
            return Err(LanguoidError::Format(format!(
                "dialects entries start at a language, got '{head}'"
            ))
            .located(&entry.location));
        }
        let language = self.registry.check_known_language(head, &entry.location)?;
        self.registry.resolve(
            head,
            Level::Language,
            None,
            TextSource::Dialects,
            &entry.location,
        )?;
        self.writes
            .push(Write::new(&language, head, Level::Language, ParentWrite::Keep));

        let mut parent = language;
        let mut lineage: Vec<&str> = vec![&head.name];
        for element in &entry.chain[1..] {
            lineage.push(&element.name);
            check_lineage(&lineage, &entry.location)?;
            let id = self.registry.resolve(
                element,
                Level::Dialect,
                Some(&parent),
                TextSource::Dialects,
                &entry.location,
            )?;
            self.writes.push(Write::new(
                &id,
                element,
                Level::Dialect,
                ParentWrite::Set(Some(parent.clone())),
            ));
            parent = id;
        }
        let parent_name = lineage.last().copied().unwrap_or_default().to_string();
        self.dialect_nodes(
            &parent,
            &parent_name,
            &entry.location,
            &mut lineage,
            &entry.children,
        )
    }

    fn dialect_nodes<'t>(
        &mut self,
        parent: &Glottocode,
        parent_name: &str,
        parent_location: &SourceLocation,
        lineage: &mut Vec<&'t str>,
        nodes: &'t [OutlineNode],
    ) -> Result<(), LanguoidError> {
        check_duplicate_siblings(
            parent_name,
            nodes.iter().map(|n| n.element.name.as_str()),
            Some(parent_location),
        )?;
        for node in nodes {
            lineage.push(&node.element.name);
            check_lineage(lineage, &node.location)?;
            let id = self.registry.resolve(
                &node.element,
                Level::Dialect,
                Some(parent),
                TextSource::Dialects,
                &node.location,
            )?;
            self.writes.push(Write::new(
                &id,
                &node.element,
                Level::Dialect,
                ParentWrite::Set(Some(parent.clone())),
            ));
            self.dialect_nodes(
                &id,
                &node.element.name,
                &node.location,
                lineage,
                &node.children,
            )?;
            lineage.pop();
        }
        Ok(())
    }
}

fn apply_writes(tree: &mut LanguoidTree, writes: &[Write]) -> Result<(), LanguoidError> {
    let mut claims: BTreeMap<ExternalCode, Glottocode> = BTreeMap::new();
    for write in writes {
        let parent = match &write.parent {
            ParentWrite::Set(parent) => parent.clone(),
            ParentWrite::Keep => tree.get(&write.id).and_then(|l| l.parent.clone()),
        };
        match tree.get(&write.id).map(|l| (l.name.clone(), l.level)) {
            Some((name, level)) => {
                if name != write.name {
                    tracing::info!("Renaming {name} [{}] to '{}'", write.id, write.name);
                    tree.set_name(&write.id, &write.name)?;
                }
                if level != write.level {
                    tracing::info!(
                        "{} [{}] changes level from {level} to {}",
                        write.name,
                        write.id,
                        write.level
                    );
                    tree.set_level(&write.id, write.level)?;
                }
                tree.set_parent(&write.id, parent)?;
            }
            None => {
                tracing::debug!("New {} {} [{}]", write.level, write.name, write.id);
                tree.insert(Languoid::new(
                    write.id.clone(),
                    &write.name,
                    write.level,
                    parent,
                ))?;
            }
        }
        if let Some(code) = &write.code {
            if let Some(previous) = claims.insert(code.clone(), write.id.clone()) {
                if previous != write.id {
                    tracing::warn!(
                        "External code {code} is claimed by both {previous} and {}, the later mention wins",
                        write.id
                    );
                }
            }
        }
        if let Some(revoked) = tree.set_code(&write.id, write.code.clone())? {
            if let Some(code) = &write.code {
                tracing::info!("External code {code} moves from {revoked} to {}", write.id);
            }
        }
    }
    Ok(())
}

/// Remove languoids no text mentions any more, as long as they hold no external code and have no
/// children left. Runs until a fixpoint, so emptied parents go too.
fn prune(tree: &mut LanguoidTree, registry: &NodeRegistry<'_>) -> Result<(), LanguoidError> {
    let mut candidates = tree
        .ids()
        .filter(|id| !registry.is_mentioned(id))
        .cloned()
        .collect::<Vec<Glottocode>>();
    loop {
        let removable = candidates
            .iter()
            .filter(|id| {
                tree.get(id).is_some_and(|l| l.code.is_none()) && !tree.has_children(id)
            })
            .cloned()
            .collect::<Vec<Glottocode>>();
        if removable.is_empty() {
            break;
        }
        for id in removable.iter() {
            let removed = tree.remove(id)?;
            tracing::debug!("Pruning unmentioned {} {removed}", removed.level);
        }
        candidates.retain(|id| tree.contains(id));
    }
    for id in candidates {
        if let Some(kept) = tree.get(&id) {
            tracing::debug!("Keeping unmentioned {} {kept}", kept.level);
        }
    }
    Ok(())
}

fn check_sibling_names(
    tree: &LanguoidTree,
    registry: &NodeRegistry<'_>,
) -> Result<(), LanguoidError> {
    let parents = std::iter::once(None)
        .chain(tree.ids().map(Some))
        .collect::<Vec<Option<&Glottocode>>>();
    for parent in parents {
        let mut by_name: BTreeMap<&str, Vec<&Languoid>> = BTreeMap::new();
        for child in tree.children(parent) {
            by_name.entry(child.name.as_str()).or_default().push(child);
        }
        if let Some((name, group)) = by_name.into_iter().find(|(_, group)| group.len() > 1) {
            let label = parent
                .and_then(|p| tree.get(p))
                .map(|l| l.to_string())
                .unwrap_or_else(|| "the root".to_string());
            let holders = group
                .iter()
                .map(|l| match registry.get(&l.id) {
                    Some(r) => format!("{} at {}", l.id, r.location),
                    None => format!("{} (stored)", l.id),
                })
                .collect::<Vec<_>>()
                .join(", ");
            return Err(LanguoidError::DuplicateName(format!(
                "'{name}' names several children of {label}: {holders}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LFF: &str = "# -*- coding: utf-8 -*-
Abkhaz-Adyge [abkh1242] aaa
    Ubykh [ubyk1235]uby
Abkhaz-Adyge [abkh1242] aaa; Abkhaz-Abaza [abkh1243]
    Abaza [abaz1241]abq
    Abkhazian [abkh1244]abk
Abkhaz-Adyge [abkh1242] aaa; Circassian [circ1239]
    Adyghe [adyg1241]ady
    Kabardian [kaba1278]kbd
";

    const DFF: &str = "# -*- coding: utf-8 -*-
Abaza [abaz1241] abq
    Ashkaraua [ashk1247]
    Bezshagh [bezs1238]
    Tapanta [tapa1256]
Abkhazian [abkh1244] abk
    Abzhui [abzh1238]
    Bzyb [bzyb1238]
    Samurzakan [samu1242]
";

    fn gc(s: &str) -> Glottocode {
        Glottocode::try_from(s).unwrap()
    }

    fn initial() -> LanguoidTree {
        merge(&LanguoidTree::empty(), LFF, DFF).unwrap().tree
    }

    #[test]
    fn test_initial_merge() {
        let outcome = merge(&LanguoidTree::empty(), LFF, DFF).unwrap();
        let tree = &outcome.tree;
        assert_eq!(tree.len(), 14);
        assert_eq!(outcome.summary().created, 14);
        assert_eq!(tree.languoid("aaa").unwrap().id, gc("abkh1242"));
        assert_eq!(tree.get(&gc("ashk1247")).unwrap().level, Level::Dialect);
        assert_eq!(tree.get(&gc("ashk1247")).unwrap().parent, Some(gc("abaz1241")));
        assert_eq!(tree.get(&gc("abaz1241")).unwrap().level, Level::Language);
        assert_eq!(tree.get(&gc("circ1239")).unwrap().level, Level::Family);
        assert_eq!(tree.languoid("abq").unwrap().id, gc("abaz1241"));
    }

    #[test]
    fn test_remerge_is_a_no_op() {
        let tree = initial();
        let outcome = merge(&tree, LFF, DFF).unwrap();
        assert!(outcome.ops.is_empty());
        assert_eq!(outcome.tree, tree);
    }

    #[test]
    fn test_rename_keeps_identity() {
        let tree = initial();
        let outcome = merge(&tree, &LFF.replace("Abkhaz-Abaza", "Abkhaz-Abazzza"), DFF).unwrap();
        assert_eq!(outcome.tree.len(), tree.len());
        assert_eq!(
            outcome.tree.get(&gc("abkh1243")).unwrap().name,
            "Abkhaz-Abazzza"
        );
        assert_eq!(outcome.ops.len(), 1);
    }

    #[test]
    fn test_code_migrates_to_new_dialect() {
        let tree = initial();
        let lff = LFF.replace(" aaa", "");
        let dff = format!("{DFF}Kabardian [kaba1278]kbd\n    Dia []aaa\n");
        let outcome = merge(&tree, &lff, &dff).unwrap();
        let dia = outcome.tree.languoid("aaa").unwrap();
        assert_eq!(dia.name, "Dia");
        assert_eq!(dia.id, gc("diaa1234"));
        assert_eq!(outcome.tree.get(&gc("abkh1242")).unwrap().code, None);
        assert!(outcome.minted.contains(&gc("diaa1234")));

        // the code is taken away from its holder even when the holder keeps being mentioned
        let stolen = merge(&tree, LFF, &format!("{DFF}Kabardian [kaba1278]kbd\n    Dia []aaa\n"))
            .unwrap();
        assert_eq!(stolen.tree.languoid("aaa").unwrap().name, "Dia");
        assert_eq!(stolen.tree.get(&gc("abkh1242")).unwrap().code, None);
    }

    #[test]
    fn test_omitted_code_is_cleared() {
        let tree = initial();
        let outcome = merge(&tree, &LFF.replace("Ubykh [ubyk1235]uby", "Ubykh [ubyk1235]"), DFF)
            .unwrap();
        assert!(outcome.tree.languoid("uby").is_none());
        assert_eq!(outcome.summary().updated, 1);
    }

    #[test]
    fn test_unmentioned_leaves_are_pruned() {
        let tree = initial();
        let dff = "Abaza [abaz1241]abq\n    Ashkaraua [ashk1247]\n";
        let outcome = merge(&tree, LFF, dff).unwrap();
        assert!(!outcome.tree.contains(&gc("bezs1238")));
        assert!(!outcome.tree.contains(&gc("bzyb1238")));
        assert!(outcome.tree.contains(&gc("ashk1247")));
        assert_eq!(outcome.summary().deleted, 5);
    }

    #[test]
    fn test_unmentioned_code_holder_survives() {
        let tree = initial();
        let lff = LFF.replace("    Ubykh [ubyk1235]uby\n", "");
        let outcome = merge(&tree, &lff, DFF).unwrap();
        let ubykh = outcome.tree.get(&gc("ubyk1235")).unwrap();
        assert_eq!(ubykh.parent, Some(gc("abkh1242")));
        assert!(outcome.ops.is_empty());
    }

    #[test]
    fn test_shallow_dialects() {
        let lff = "Circassian [circ1239]\n    Kabardian [kaba1278]kbd\n        Besleney []\n        Terek [tere1234]\n";
        let outcome = merge(&LanguoidTree::empty(), lff, "").unwrap();
        let besleney = outcome.tree.languoid("besl1234").unwrap();
        assert_eq!(besleney.level, Level::Dialect);
        assert_eq!(besleney.parent, Some(gc("kaba1278")));

        // a dialects entry for the language takes over its subtree
        let dff = "Kabardian [kaba1278]kbd\n    Baksan []\n";
        let outcome = merge(&outcome.tree, lff, dff).unwrap();
        assert!(outcome.tree.languoid("besl1234").is_none());
        assert!(outcome.tree.languoid("tere1234").is_none());
        assert_eq!(outcome.tree.children(Some(&gc("kaba1278"))).len(), 1);
    }

    #[test]
    fn test_isolates_are_roots() {
        let lff = "Isolate [-isolate-]\n    Basque [basq1248]eus\n";
        let outcome = merge(&LanguoidTree::empty(), lff, "").unwrap();
        let basque = outcome.tree.languoid("eus").unwrap();
        assert_eq!(basque.parent, None);
        assert_eq!(basque.level, Level::Language);
        assert_eq!(outcome.tree.len(), 1);

        let err = merge(
            &LanguoidTree::empty(),
            "Isolate [-isolate-]xyz\n    Basque [basq1248]eus\n",
            "",
        )
        .unwrap_err();
        assert!(matches!(err, LanguoidError::Format(_)));
        assert!(format!("{err}").contains("lff.txt:1"));
    }

    #[test]
    fn test_dialect_below_family_path_is_rejected() {
        let err = merge(&LanguoidTree::empty(), "Fam [fami1234]\n        Dia [diaa1234]\n", "")
            .unwrap_err();
        assert!(matches!(err, LanguoidError::ClassificationContext(_)));
        assert!(format!("{err}").contains("classification"));
    }

    #[test]
    fn test_rejections() {
        let tree = initial();
        let cases: [(&str, &str, &str); 7] = [
            (LFF, "Abaza [abaz1241]abq\n    Abaza [bezs1238]\n", "duplicate"),
            (LFF, "Abaza [abaz1241]abq\n    Tapanta [tapa1256]\n    Tapanta []\n", "duplicate"),
            (LFF, "Abazzza [abaz1241]abq\n    Bezshagh [bezs1238]\n", "inconsistent"),
            (LFF, "Circassian [circ1239]\n    Bezshagh [bezs1238]\n", "inconsistent"),
            (LFF, "None [xyzz1234]\n    Dia []\n", "invalid"),
            (LFF, "None [xyzz1234]; Other [-isolate-]\n    Dia []\n", "isolate"),
            (LFF, "    Dia []\n", "classification"),
        ];
        for (lff, dff, keyword) in cases {
            let err = merge(&tree, lff, dff).unwrap_err();
            assert!(
                format!("{err}").contains(keyword),
                "expected '{keyword}' for {dff:?}, got {err}"
            );
            assert!(err.is_validation());
        }
    }

    #[test]
    fn test_level_contradiction_within_classification() {
        let lff = "Fam [fami1234]\n    Lang [lang1234]\nFam [fami1234]; Lang [lang1234]\n    Other [othe1234]\n";
        let err = merge(&LanguoidTree::empty(), lff, "").unwrap_err();
        assert!(matches!(err, LanguoidError::InconsistentName(_)));
    }

    #[test]
    fn test_duplicate_siblings_across_lines() {
        let lff = "Fam [fami1234]\n    Lang [lang1234]\nFam [fami1234]\n    Lang [lang1235]\n";
        let err = merge(&LanguoidTree::empty(), lff, "").unwrap_err();
        assert!(matches!(err, LanguoidError::DuplicateName(_)));
    }

    #[test]
    fn test_stranded_dialect_is_rejected() {
        let tree = initial();
        let dff = "Abaza [abaz1241] abq\n    Ashkaraua [ashk1247]\n    Bezshagh [bezs1238]NOCODE_bez\n";
        let tree = merge(&tree, LFF, dff).unwrap().tree;
        // Abaza turns into a family while its coded dialect is no longer mentioned
        let mut lff = LFF.replace("    Abaza [abaz1241]abq\n", "");
        lff.push_str("Abkhaz-Adyge [abkh1242] aaa; Abkhaz-Abaza [abkh1243]; Abaza [abaz1241]\n");
        lff.push_str("    Ashkaraua [ashk1247]\n");
        let err = merge(&tree, &lff, "").unwrap_err();
        assert!(matches!(err, LanguoidError::InconsistentName(_)));
    }
}
