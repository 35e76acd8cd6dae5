use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn synmine(cwd: &Path, args: &[&str]) -> Output {
    let config = cwd.join("synmine.toml");
    if !config.exists() {
        fs::write(&config, "").unwrap();
    }
    Command::new(env!("CARGO_BIN_EXE_synmine"))
        .current_dir(cwd)
        .arg("--config")
        .arg(&config)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn mine_directory_to_json() {
    let work = TempDir::new().unwrap();
    let docs = work.path().join("docs");
    fs::create_dir(&docs).unwrap();
    fs::write(docs.join("a.txt"), "Data are at syn1234567 and syn7654321.").unwrap();
    fs::write(docs.join("b.txt"), "Nothing to see here.").unwrap();

    let out = synmine(
        work.path(),
        &["mine", "docs", "--format", "json", "--output", "out.json", "--sequential"],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(work.path().join("out.json")).unwrap()).unwrap();
    let a = json["a.txt"].as_array().unwrap();
    assert_eq!(a.len(), 2);
    assert_eq!(a[0]["synapse_id"], "syn1234567");
    assert!(json.get("b.txt").is_none());
}

#[test]
fn mine_single_file_reports_counts() {
    let work = TempDir::new().unwrap();
    fs::write(
        work.path().join("paper.txt"),
        "Raw data syn1234567, processed syn7654321, figures syn1234567.",
    )
    .unwrap();

    let out = synmine(
        work.path(),
        &["mine", "paper.txt", "--no-dedup", "--output", "paper.csv"],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let stderr = String::from_utf8_lossy(&out.stderr);
    let row = |label: &str, value: &str| {
        stderr
            .lines()
            .any(|l| l.contains(label) && l.contains(&format!(" {value} ")))
    };
    assert!(row("Mentions", "3"), "{stderr}");
    assert!(row("Unique IDs", "2"), "{stderr}");

    let csv = fs::read_to_string(work.path().join("paper.csv")).unwrap();
    assert_eq!(csv.lines().count(), 4);
}

#[test]
fn mine_missing_input_fails() {
    let work = TempDir::new().unwrap();
    let out = synmine(work.path(), &["mine", "no-such-path"]);
    assert!(!out.status.success());
}

#[test]
fn process_bulk_file_writes_corpus_csv() {
    let work = TempDir::new().unwrap();
    let xml = r#"<articles>
<article article-type="research-article"><front><article-meta>
<article-id pub-id-type="pmcid">PMC4242</article-id>
<title-group><article-title>Deposited data</article-title></title-group>
</article-meta></front>
<body><p>All counts are in syn1234567 on Synapse.</p></body></article>
</articles>
"#;
    fs::write(work.path().join("bulk.xml"), xml).unwrap();

    let out = synmine(work.path(), &["process", "bulk.xml", "-o", "found.csv", "-w", "1"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let csv = fs::read_to_string(work.path().join("found.csv")).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("pmcid,synid,context"));
    let row = lines.next().unwrap();
    assert!(row.starts_with("pmc:PMC4242,syn1234567,"));
}

#[test]
fn combine_merges_batches() {
    let work = TempDir::new().unwrap();
    let header = "pmcid,synid,context\n";
    fs::write(
        work.path().join("results.csv.A.xml.gz.csv"),
        format!("{header}pmc:PMC1,syn1234567,ctx syn1234567\n"),
    )
    .unwrap();
    fs::write(
        work.path().join("results.csv.B.xml.gz.csv"),
        format!("{header}pmc:PMC1,syn1234567,ctx syn1234567\npmc:PMC2,syn2222222,x syn2222222\n"),
    )
    .unwrap();

    let out = synmine(work.path(), &["combine", "--output", "all.csv"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let combined = fs::read_to_string(work.path().join("all.csv")).unwrap();
    assert_eq!(combined.lines().count(), 3);
    assert!(combined.starts_with("pmcid,synid,context,source_file\n"));
}
