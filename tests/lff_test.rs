use std::collections::BTreeSet;
use tempfile::tempdir;
use test_log::test;

use languoid_core::{
    builder::merge,
    codec::{write_classification, write_dialects},
    config::get_content,
    error::LanguoidError,
    properties::Level,
    store::{remove_tree, NodeStore, ATTRS_FILE},
};

mod common;
use common::{create_test_repo, directory_names, set_dff, set_lff};

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

const REGROUPED_LFF: &str = "# -*- coding: utf-8 -*-
Abkhaz-Adyge [abkh1242]
    Ubykh [ubyk1235]
Abkhaz-Adyge [abkh1242]; Abkhaz-Abaza [abkh1243]; Abaza [abaz1241]
    Ashkaraua [ashk1247]xyz
    Abkhazian [abkh1244]
Abkhaz-Adyge [abkh1242]; Circassian [circ1239]
    Adyghe [adyg1241]ady
    Kabardian [kaba1278]
Abkhaz-Adyge [abkh1242]; Circassian [circ1239]; New Group []
    New name []NOCODE_New-name
    Another one []
";

const REGROUPED_DFF: &str = "# -*- coding: utf-8 -*-
Ashkaraua [ashk1247]xyz
    Bezshagh [bezs1238]
    Tapanta [tapa1256]
Abkhazian [abkh1244]
    Abzhui [abzh1238]
    Bzyb [bzyb1238]
    Samurzakan [samu1242]
Kabardian [kaba1278]
    Dia []aaa
";

/// Isolates, a family without members, a family with only subgroups and dialects three deep.
const ASSORTED_LFF: &str = "# -*- coding: utf-8 -*-
Abkhaz-Adyge [abkh1242]
    Ubykh [ubyk1235]uby
Abkhaz-Adyge [abkh1242]; Abkhaz-Abaza [abkh1243]
    Abaza [abaz1241]abq
Indo-European [indo1319]; Germanic [germ1287]; North Germanic [nort3160]
    Icelandic [icel1247]isl
Empty Family [empt1234]
Isolate [-isolate-]
    Basque [basq1248]eus
    Ainu [ainu1252]NOCODE_Ainu
";

const ASSORTED_DFF: &str = "# -*- coding: utf-8 -*-
Abaza [abaz1241]abq
    Ashkaraua [ashk1247]
        Lower Ashkaraua []
            Kubina []NOCODE_Kubina
    Tapanta [tapa1256]
Basque [basq1248]eus
    Souletin [soul1238]
";

fn code_of(repo: &languoid_core::repo::Repository, key: &str) -> Option<String> {
    repo.languoid(key)
        .unwrap()
        .and_then(|l| l.code)
        .map(|c| c.to_string())
}

#[test]
fn test_lff2tree() {
    let tmp = tempdir().unwrap();
    let mut repo = create_test_repo(&tmp);

    let lfftext = set_lff(&repo, LFF);
    set_dff(&repo, DFF);
    repo.lff2tree().unwrap();
    assert_eq!(code_of(&repo, "abkh1242").as_deref(), Some("aaa"));
    assert_eq!(repo.languoid("ashk1247").unwrap().unwrap().level, Level::Dialect);
    assert_eq!(repo.languoid("abaz1241").unwrap().unwrap().level, Level::Language);
    assert_eq!(code_of(&repo, "abaz1241").as_deref(), Some("abq"));

    // renaming keeps the identifier and does not duplicate directories
    set_lff(&repo, &lfftext.replace("Abkhaz-Abaza", "Abkhaz-Abazzza"));
    repo.lff2tree().unwrap();
    let glottocodes = directory_names(repo.store().root());
    let unique = glottocodes.iter().collect::<BTreeSet<_>>();
    assert_eq!(glottocodes.len(), unique.len());
    assert_eq!(
        repo.languoid("abkh1243").unwrap().unwrap().name,
        "Abkhaz-Abazzza"
    );

    // regrouping: Abaza turns into a family, a code moves to a new dialect
    set_lff(&repo, REGROUPED_LFF);
    set_dff(&repo, REGROUPED_DFF);
    repo.lff2tree().unwrap();
    assert_eq!(repo.languoid("abaz1241").unwrap().unwrap().level, Level::Family);
    assert_eq!(repo.languoid("aaa").unwrap().unwrap().name, "Dia");
    assert_eq!(code_of(&repo, "abkh1242"), None);
    let tree = repo.tree().unwrap();
    assert!(repo.store().all_identifiers().unwrap().contains(
        &languoid_core::properties::Glottocode::try_from("newg1234").unwrap()
    ));
    assert_eq!(tree.iter().filter(|l| l.name == "New Group").count(), 1);
    assert_eq!(
        tree.iter()
            .filter(|l| l.code.as_ref().map(|c| c.as_str()) == Some("NOCODE_New-name"))
            .count(),
        1
    );
    assert_eq!(
        repo.languoid("bezs1238").unwrap().unwrap().parent.unwrap().as_str(),
        "ashk1247"
    );

    // a bare mention removes the code
    set_dff(&repo, "# -*- coding: utf-8 -*-\nKabardian [kaba1278]\n    Dia []\n");
    repo.lff2tree().unwrap();
    assert!(repo.languoid("aaa").unwrap().is_none());
    assert!(repo.languoid("diaa1234").unwrap().is_some());

    repo.tree2lff().unwrap();
    let written = get_content(repo.classification_path()).unwrap();
    assert!(written.contains("        Dia [diaa1234]\n"));

    // re-introducing a pruned languoid with a NOCODE code
    set_dff(
        &repo,
        "# -*- coding: utf-8 -*-\nAshkaraua [ashk1247]xyz\n    Ashkarauax [bezs1238]NOCODE_abc\n",
    );
    repo.lff2tree().unwrap();
    assert_eq!(code_of(&repo, "bezs1238").as_deref(), Some("NOCODE_abc"));

    let before = repo.tree().unwrap();
    let rejected: [(&str, &str); 6] = [
        ("Ashkaraua [ashk1247]xyz\n    Ashkaraua [bezs1238]\n", "duplicate"),
        ("Ashkxxxaraua [ashk1247]xyz\n    Bezshagh [bezs1238]\n", "inconsistent"),
        ("Abaza [abaz1241]\n    Bezshagh [bezs1238]\n", "inconsistent"),
        ("None [xyzz1234]\n    Dia []\n", "invalid"),
        ("None [xyzz1234]; Other [-isolate-]\n    Dia []\n", "isolate"),
        ("    Dia []\n", "classification"),
    ];
    for (dff, keyword) in rejected {
        set_dff(&repo, &format!("# -*- coding: utf-8 -*-\n{dff}"));
        let err = repo.lff2tree().unwrap_err();
        assert!(
            err.to_string().contains(keyword),
            "expected '{keyword}' for {dff:?}, got: {err}"
        );
        // a rejected pass leaves the tree alone
        assert_eq!(repo.tree().unwrap(), before);
    }
}

#[test]
fn test_tree2lff_round_trip() {
    let tmp = tempdir().unwrap();
    let mut repo = create_test_repo(&tmp);
    set_lff(&repo, REGROUPED_LFF);
    set_dff(&repo, REGROUPED_DFF);
    repo.lff2tree().unwrap();
    let tree = repo.tree().unwrap();

    repo.tree2lff().unwrap();
    let lff = get_content(repo.classification_path()).unwrap();
    let dff = get_content(repo.dialects_path()).unwrap();
    assert_eq!(lff, write_classification(&tree).unwrap());
    assert_eq!(dff, write_dialects(&tree).unwrap());

    let outcome = merge(&tree, &lff, &dff).unwrap();
    assert!(outcome.ops.is_empty());
    assert!(outcome.minted.is_empty());
    assert!(repo.lff2tree().unwrap().is_empty());
}

#[test]
fn test_tree2lff_round_trip_isolates_and_deep_dialects() {
    let tmp = tempdir().unwrap();
    let mut repo = create_test_repo(&tmp);
    set_lff(&repo, ASSORTED_LFF);
    set_dff(&repo, ASSORTED_DFF);
    repo.lff2tree().unwrap();
    let tree = repo.tree().unwrap();
    assert_eq!(tree.len(), 16);

    repo.tree2lff().unwrap();
    let lff = get_content(repo.classification_path()).unwrap();
    let dff = get_content(repo.dialects_path()).unwrap();
    assert!(lff.contains("Empty Family [empt1234]\n"));
    assert!(lff.contains("Isolate [-isolate-]\n"));
    assert!(lff.contains("    Ainu [ainu1252]NOCODE_Ainu\n"));
    assert!(!lff.contains("Indo-European [indo1319]\n"));
    assert!(dff.contains("            Kubina [kubi1234]NOCODE_Kubina\n"));

    let outcome = merge(&tree, &lff, &dff).unwrap();
    assert!(outcome.ops.is_empty());
    assert!(outcome.minted.is_empty());
    assert!(repo.lff2tree().unwrap().is_empty());
    assert_eq!(repo.tree().unwrap(), tree);
}

#[test]
fn test_languoid_lookup() {
    let tmp = tempdir().unwrap();
    let mut repo = create_test_repo(&tmp);
    set_lff(&repo, ASSORTED_LFF);
    set_dff(&repo, ASSORTED_DFF);
    repo.lff2tree().unwrap();

    let kubina = repo.languoid("NOCODE_Kubina").unwrap().unwrap();
    assert_eq!(kubina.id.as_str(), "kubi1234");
    assert_eq!(kubina.level, Level::Dialect);
    let ancestors = repo
        .ancestors(&kubina.id)
        .unwrap()
        .into_iter()
        .map(|l| l.id.to_string())
        .collect::<Vec<_>>();
    assert_eq!(
        ancestors,
        vec!["lowe1234", "ashk1247", "abaz1241", "abkh1243", "abkh1242"]
    );

    let basque = repo.languoid("eus").unwrap().unwrap();
    assert_eq!(basque.parent, None);
    assert!(repo.ancestors(&basque.id).unwrap().is_empty());
    assert_eq!(repo.languoid("icel1247").unwrap().unwrap().parent.unwrap().as_str(), "nort3160");
    assert!(repo.languoid("zzzz1234").unwrap().is_none());
    assert!(repo.languoid("xyz").unwrap().is_none());
    assert!(repo.languoid("not a key").unwrap().is_none());
}

#[test]
fn test_missing_dialects_text_is_empty() {
    let tmp = tempdir().unwrap();
    let mut repo = create_test_repo(&tmp);
    set_lff(&repo, LFF);
    let summary = repo.lff2tree().unwrap();
    assert_eq!(summary.created, 8);
    let attrs = repo.store().path(
        &languoid_core::properties::Glottocode::try_from("kaba1278").unwrap(),
    );
    let content = get_content(attrs.unwrap().join(ATTRS_FILE)).unwrap();
    assert!(content.contains("Kabardian"));
}

#[test]
fn test_read_lff_error() {
    let tmp = tempdir().unwrap();
    let mut repo = create_test_repo(&tmp);
    set_lff(
        &repo,
        "\nName [ac1234]; Name2 [abcd1235]\n    Lang [abcd1236]abc\n",
    );
    let err = repo.lff2tree().unwrap_err();
    assert!(matches!(err, LanguoidError::Format(_)));
    assert!(err.to_string().contains("lff.txt:2"));
}

#[test]
fn test_rmtree() {
    let tmp = tempdir().unwrap();
    let mut d = tmp.path().to_path_buf();
    for _ in 0..80 {
        d.push("a");
        std::fs::create_dir(&d).unwrap();
        std::fs::write(d.join("a.ini"), "a").unwrap();
    }
    let root = tmp.path().join("a");
    assert!(root.exists());
    remove_tree(&root).unwrap();
    assert!(!root.exists());
}
