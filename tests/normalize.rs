mod common;

use common::TestWorkspace;
use survey_ingest::kind::NativeValueKind;
use survey_ingest::normalize;

#[test]
fn headers_are_lowercased_and_rows_preserved() {
    let workspace = TestWorkspace::new();
    let canonical = workspace.write(
        "survey.csv",
        "HHID,State_Code,WEIGHT\n1,KA,101.5\n2,MH,99\n",
    );
    let normalized = workspace.path().join("survey_normalized.csv");

    let table = normalize::normalize(&canonical, &normalized).expect("normalize");
    assert_eq!(table.column_names(), vec!["hhid", "state_code", "weight"]);
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.rows[0], vec!["1", "KA", "101.5"]);

    let text = std::fs::read_to_string(&normalized).expect("normalized artifact");
    assert_eq!(text, "hhid,state_code,weight\n1,KA,101.5\n2,MH,99\n");
}

#[test]
fn normalization_is_idempotent() {
    let workspace = TestWorkspace::new();
    let canonical = workspace.write("t.csv", "Mixed,CASE\na,b\n");
    let once = workspace.path().join("t1.csv");
    let twice = workspace.path().join("t2.csv");

    normalize::normalize(&canonical, &once).expect("first pass");
    normalize::normalize(&once, &twice).expect("second pass");

    let first = std::fs::read_to_string(&once).expect("first artifact");
    let second = std::fs::read_to_string(&twice).expect("second artifact");
    assert_eq!(first, second);
}

#[test]
fn ragged_rows_are_rejected() {
    let workspace = TestWorkspace::new();
    let canonical = workspace.write("bad.csv", "a,b,c\n1,2,3\n4,5\n");
    let normalized = workspace.path().join("bad_normalized.csv");

    let err = normalize::normalize(&canonical, &normalized).expect_err("must fail");
    assert!(format!("{err:#}").contains("row 3"), "{err:#}");
}

#[test]
fn case_colliding_headers_are_rejected() {
    let workspace = TestWorkspace::new();
    let canonical = workspace.write("dup.csv", "ID,id,value\n1,2,3\n");
    let normalized = workspace.path().join("dup_normalized.csv");

    let err = normalize::normalize(&canonical, &normalized).expect_err("must fail");
    assert!(format!("{err:#}").contains("'id'"), "{err:#}");
    assert!(!normalized.exists(), "no artifact may be left behind");
}

#[test]
fn kinds_are_inferred_per_column() {
    let workspace = TestWorkspace::new();
    let canonical = workspace.write(
        "mix.csv",
        concat!(
            "id,score,flag,label,seen\n",
            "1,2.5,yes,alpha,2024-05-06 14:30:00\n",
            "2,3,no,beta,2024-05-07 09:00:00\n",
            "3,,y,alpha,\n",
        ),
    );
    let normalized = workspace.path().join("mix_normalized.csv");

    let table = normalize::normalize(&canonical, &normalized).expect("normalize");
    assert_eq!(
        table.kinds(),
        vec![
            NativeValueKind::Int64,
            NativeValueKind::Float64,
            NativeValueKind::Boolean,
            NativeValueKind::Text,
            NativeValueKind::Timestamp,
        ]
    );
}
