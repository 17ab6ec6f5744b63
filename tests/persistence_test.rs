#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn test_sequences_survive_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    let run = || {
        let output = Command::new(cargo_bin!("tcg_checkout"))
            .arg("next-id")
            .arg("ORD")
            .arg("--count")
            .arg("2")
            .arg("--db-path")
            .arg(&db_path)
            .output()
            .expect("Failed to execute command");
        assert!(output.status.success());
        String::from_utf8_lossy(&output.stdout).into_owned()
    };

    assert_eq!(run(), "ORD001\nORD002\n");
    // Second process picks up where the first stopped
    assert_eq!(run(), "ORD003\nORD004\n");
}

#[test]
fn test_stock_and_orders_survive_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: seed the catalog and sell two units
    let mut script1 = tempfile::NamedTempFile::new().unwrap();
    writeln!(script1, "op,user,item,quantity,price").unwrap();
    writeln!(script1, "product,,Charizard,,").unwrap();
    writeln!(script1, "rarity,,Holo Rare,,").unwrap();
    writeln!(script1, "variant,,PROD001:RAR001,5,10.00").unwrap();
    writeln!(script1, "add,alice,VAR001,2,").unwrap();
    writeln!(script1, "order,alice,COD,,").unwrap();

    let output1 = Command::new(cargo_bin!("tcg_checkout"))
        .arg("replay")
        .arg(script1.path())
        .arg("--address")
        .arg("tests/fixtures/address.json")
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains("ORD001,alice,20.00,Pending,COD,1"));
    assert!(stdout1.contains("VAR001,10.00,3"));

    // 2. Second run: the variant and its remaining stock are still there
    let mut script2 = tempfile::NamedTempFile::new().unwrap();
    writeln!(script2, "op,user,item,quantity,price").unwrap();
    writeln!(script2, "add,bob,VAR001,3,").unwrap();
    writeln!(script2, "order,bob,COD,,").unwrap();

    let output2 = Command::new(cargo_bin!("tcg_checkout"))
        .arg("replay")
        .arg(script2.path())
        .arg("--address")
        .arg("tests/fixtures/address.json")
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);

    assert!(stdout2.contains("ORD002,bob,30.00,Pending,COD,1"));
    assert!(stdout2.contains("VAR001,10.00,0"));
}
