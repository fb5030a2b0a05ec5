use assert_cmd::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

const LEDGER: &str = "\
transaction_id,transaction_date,user_id,country,region,product_id,product_name,category,price,quantity,total_price,stock_quantity,added_date
T1,2024-01-01,U1,A,North,PID1,X,Toys,10,2,20,7,2023-06-01
T2,2024-01-15,U2,A,North,PID1,X,Toys,10,3,30,6,2023-06-01
T3,2024-02-01,U3,B,South,PID2,Y,Books,5,1,5,9,2023-06-01
T4,broken
";

fn ledger_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ledger-insights"));
    cmd.env_remove("LEDGER_DATA")
        .env_remove("LEDGER_WORKERS")
        .env_remove("LEDGER_ADDR");
    cmd
}

fn run_report(args: &[&str]) -> Value {
    let temp = tempdir().unwrap();
    let path = temp.path().join("ledger.csv");
    fs::write(&path, LEDGER).unwrap();

    let output = ledger_cmd()
        .arg("report")
        .arg("--data")
        .arg(&path)
        .args(args)
        .output()
        .expect("command run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid json")
}

#[test]
fn report_prints_all_four_rollups() {
    let body = run_report(&["--workers", "2"]);

    assert_eq!(body["stats"]["rows_read"], 3);
    assert_eq!(body["stats"]["rows_skipped"], 1);
    assert_eq!(body["stats"]["read_errors"], 0);
    assert_eq!(body["stats"]["workers"], 2);

    let insights = &body["insights"];
    assert_eq!(
        insights["country_revenue"],
        serde_json::json!([
            {"country": "A", "product_name": "X", "total_revenue": 50.0, "transaction_count": 2},
            {"country": "B", "product_name": "Y", "total_revenue": 5.0, "transaction_count": 1}
        ])
    );
    assert_eq!(insights["top_products"][0]["product_name"], "X");
    assert_eq!(insights["top_products"][0]["purchase_count"], 5);
    assert_eq!(
        insights["monthly_sales"],
        serde_json::json!([
            {"month": "2024-01", "sales_volume": 5},
            {"month": "2024-02", "sales_volume": 1}
        ])
    );
    assert_eq!(insights["top_regions"][0]["region"], "North");
    assert_eq!(insights["top_regions"][0]["items_sold"], 5);
}

#[test]
fn report_honours_output_caps() {
    let body = run_report(&["--workers", "1", "--top-products", "1", "--top-regions", "1"]);
    assert_eq!(body["insights"]["top_products"].as_array().unwrap().len(), 1);
    assert_eq!(body["insights"]["top_regions"].as_array().unwrap().len(), 1);
    assert_eq!(
        body["insights"]["country_revenue"].as_array().unwrap().len(),
        2
    );
}

#[test]
fn report_reads_path_from_env() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("ledger.csv");
    fs::write(&path, LEDGER).unwrap();

    let output = ledger_cmd()
        .env("LEDGER_DATA", &path)
        .env("LEDGER_WORKERS", "3")
        .args(["report", "--pretty"])
        .output()
        .expect("command run");
    assert!(output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(body["stats"]["workers"], 3);
}

#[test]
fn report_fails_without_snapshot_for_missing_file() {
    let temp = tempdir().unwrap();
    ledger_cmd()
        .arg("report")
        .arg("--data")
        .arg(temp.path().join("missing.csv"))
        .assert()
        .failure()
        .stdout(predicates::str::is_empty())
        .stderr(predicates::str::contains("ledger source unavailable"));
}

#[test]
fn report_fails_on_empty_ledger() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("empty.csv");
    fs::write(&path, "").unwrap();

    ledger_cmd()
        .arg("report")
        .arg("--data")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicates::str::contains("ledger header missing"));
}
