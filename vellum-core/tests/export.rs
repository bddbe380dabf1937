use std::fs;
use std::path::Path;

use vellum_core::config::ExportConfig;
use vellum_core::Exporter;

fn write(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn sample_vault(root: &Path) {
    write(
        root,
        "index.md",
        b"# Welcome\n\nSee [[First Note]] and [[Secret]] and [[Missing Note]].\n",
    );
    write(
        root,
        "notes/First Note.md",
        b"# First Note\n\nBack [[index#Welcome|home]].\n\n\
          ![[Pic 1.png|A caption|300]]\n\n![[clip.mp4]]\n\n![[nope.png]]\n\n\
          And `[[index]]` stays put.\n",
    );
    write(root, "Secret.md", b"---\npublish: false\n---\n# Secret\n");
    write(root, "drafts/wip.md", b"# WIP\n");
    write(root, "img/Pic 1.png", b"\x89PNG fake bytes");
    write(root, "media/clip.mp4", b"mp4 fake bytes");
}

fn exporter_for(vault: &Path, out: &Path) -> Exporter {
    Exporter::builder()
        .vault_dir(vault)
        .output_dir(out)
        .export_config(ExportConfig {
            exclude: vec!["drafts/**".to_string()],
            ..ExportConfig::default()
        })
        .build()
        .unwrap()
}

#[test]
fn full_export_rewrites_links_and_copies_assets() {
    let tmp = tempfile::tempdir().unwrap();
    let vault = tmp.path().join("vault");
    let out = tmp.path().join("out");
    sample_vault(&vault);

    let report = exporter_for(&vault, &out).run().unwrap();

    assert_eq!(report.pages, 2);
    assert_eq!(report.assets, 2);
    assert_eq!(report.broken_links, 2);

    let index = fs::read_to_string(out.join("index.html")).unwrap();
    assert!(index.contains(r#"href="notes/first-note.html""#));
    assert!(index.contains(r##"<h1 id="welcome">Welcome</h1>"##));
    assert!(index.contains(
        r#"<span class="broken-link" title="Unresolved reference: Secret">Secret</span>"#
    ));
    assert!(index.contains(
        r#"<span class="broken-link" title="Unresolved reference: Missing Note">Missing Note</span>"#
    ));

    let note = fs::read_to_string(out.join("notes/first-note.html")).unwrap();
    assert!(note.contains(r##"href="../index.html#welcome""##));
    assert!(note.contains(">home</a>"));
    assert!(note.contains(r#"src="../assets/Pic%201.png""#));
    assert!(note.contains(r#"alt="A caption""#));
    assert!(note.contains(r#"style="width: 300px;""#));
    assert!(note.contains(r#"<source src="../assets/clip.mp4" type="video/mp4">"#));
    assert!(note.contains("Media not found: nope.png"));
    // Inline code must come through untouched.
    assert!(note.contains("[[index]]"));

    // The copied assets keep their original basenames.
    assert_eq!(
        fs::read(out.join("assets/Pic 1.png")).unwrap(),
        b"\x89PNG fake bytes"
    );
    assert_eq!(fs::read(out.join("assets/clip.mp4")).unwrap(), b"mp4 fake bytes");

    // The excluded and unpublished documents were not written.
    assert!(!out.join("secret.html").exists());
    assert!(!out.join("drafts").exists());

    // Every broken-reference marker was consumed by the styling pass.
    for page in [&index, &note] {
        assert!(!page.contains("vellum-broken:"));
    }
}

#[test]
fn check_reports_the_references_an_export_would_degrade() {
    let tmp = tempfile::tempdir().unwrap();
    let vault = tmp.path().join("vault");
    let out = tmp.path().join("out");
    sample_vault(&vault);

    let broken = exporter_for(&vault, &out).check().unwrap();

    let mut found: Vec<(&str, &str)> = broken
        .iter()
        .map(|b| (b.source.as_str(), b.reference.as_str()))
        .collect();
    found.sort();
    assert_eq!(
        found,
        vec![
            ("index.md", "Missing Note"),
            ("index.md", "Secret"),
            ("notes/First Note.md", "nope.png"),
        ]
    );
}

#[test]
fn custom_theme_and_context_reach_the_output() {
    let tmp = tempfile::tempdir().unwrap();
    let vault = tmp.path().join("vault");
    let theme = tmp.path().join("theme");
    let out = tmp.path().join("out");
    write(&vault, "index.md", b"# Home\n");
    write(
        &theme,
        "page.html",
        b"<html><body data-badge=\"{{ badge }}\"><h1>{{ title }}</h1>{{ content | safe }}</body></html>",
    );

    let mut exporter = Exporter::builder()
        .vault_dir(&vault)
        .output_dir(&out)
        .theme_dir(&theme)
        .add_custom("badge", "v1")
        .unwrap()
        .build()
        .unwrap();
    exporter.run().unwrap();

    let index = fs::read_to_string(out.join("index.html")).unwrap();
    assert!(index.contains(r#"data-badge="v1""#));
    assert!(index.contains("<h1>Home</h1>"));
}
