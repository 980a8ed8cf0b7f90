// 命令行集成测试：lessons / merge 子命令与错误退出

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const N5: &str = "Lesson,HanZi,Chinese,Hiragana\n\
                  10,空,天空,そら\n\
                  2,海,海,うみ\n\
                  1,山,山,やま\n\
                  1,川,河,かわ\n\
                  1,,,\n";

fn drill(cwd: &Path) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("vocab-drill").unwrap();
    cmd.current_dir(cwd).env_remove("VOCAB_DRILL_DIR");
    cmd
}

fn data_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("N5.csv"), N5).unwrap();
    dir
}

#[test]
fn lessons_are_listed_in_numeric_order() {
    let dir = data_dir();
    let out = drill(dir.path())
        .arg("--dir")
        .arg(dir.path())
        .arg("lessons")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 个 Lesson"))
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(out).unwrap();
    let a = text.find("Lesson 1\t2 张").unwrap();
    let b = text.find("Lesson 2\t1 张").unwrap();
    let c = text.find("Lesson 10\t1 张").unwrap();
    assert!(a < b && b < c);
}

#[test]
fn lessons_json_output() {
    let dir = data_dir();
    let out = drill(dir.path())
        .args(["lessons", "--json"])
        .arg("--dir")
        .arg(dir.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    let arr = v.as_array().unwrap();
    assert_eq!(arr.len(), 3);
    assert_eq!(arr[0]["lesson"], "1");
    assert_eq!(arr[0]["cards"], 2);
    assert_eq!(arr[2]["lesson"], "10");
}

#[test]
fn lessons_for_missing_level_file_fails() {
    let dir = data_dir();
    drill(dir.path())
        .arg("--dir")
        .arg(dir.path())
        .args(["--level", "N4", "lessons"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("N4.csv"));
}

#[test]
fn config_file_maps_levels() {
    let dir = data_dir();
    fs::write(
        dir.path().join("drill.toml"),
        "default_level = \"basic\"\n[levels]\nbasic = \"N5.csv\"\n",
    )
    .unwrap();
    drill(dir.path())
        .arg("lessons")
        .assert()
        .success()
        .stdout(predicate::str::contains("Level basic"));
}

#[test]
fn merge_then_load() {
    let src = TempDir::new().unwrap();
    let header = "漢字,平假名,中文意思\n";
    fs::write(
        src.path().join("第一課_漢字詞語表.csv"),
        format!("{header}山,やま,山\n山,やま,山\n"),
    )
    .unwrap();
    fs::write(
        src.path().join("第十二課_漢字詞語表.csv"),
        format!("{header}雪,ゆき,雪\n"),
    )
    .unwrap();
    fs::write(
        src.path().join("N4_第一課_漢字詞語表.csv"),
        format!("{header}雨,あめ,雨\n"),
    )
    .unwrap();

    let out_dir = TempDir::new().unwrap();
    let out = out_dir.path().join("N5.csv");
    drill(out_dir.path())
        .arg("merge")
        .arg(src.path())
        .arg("-o")
        .arg(&out)
        .args(["--level", "N5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("读取成功：第一課_漢字詞語表.csv"))
        .stdout(predicate::str::contains("2 行"));

    let text = fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("Lesson,HanZi,Chinese,Hiragana,Level"));
    assert!(!text.contains("雨"));

    drill(out_dir.path())
        .arg("--dir")
        .arg(out_dir.path())
        .arg("lessons")
        .assert()
        .success()
        .stdout(predicate::str::contains("Lesson 1\t1 张"))
        .stdout(predicate::str::contains("Lesson 12\t1 张"));
}

#[test]
fn merge_without_lesson_files_fails() {
    let src = TempDir::new().unwrap();
    fs::write(src.path().join("vocab.csv"), "漢字\n山\n").unwrap();
    drill(src.path())
        .arg("merge")
        .arg(src.path())
        .args(["-o", "out.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("第…課"));
}

#[test]
fn invalid_lesson_order_is_rejected() {
    let dir = data_dir();
    drill(dir.path())
        .args(["--lesson-order", "random", "lessons"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("random"));
}

#[test]
fn merge_ignores_broken_config_in_parent_dir() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("drill.toml"), "bogus = [\n").unwrap();
    let sub = root.path().join("sub");
    fs::create_dir(&sub).unwrap();
    fs::write(
        sub.join("第一課_漢字詞語表.csv"),
        "漢字,平假名,中文意思\n山,やま,山\n",
    )
    .unwrap();

    drill(&sub)
        .args(["merge", ".", "-o", "o.csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 行"));
    let text = fs::read_to_string(sub.join("o.csv")).unwrap();
    assert!(text.contains("山"));

    // lessons 仍然需要配置，坏配置会报错
    drill(&sub)
        .arg("lessons")
        .assert()
        .failure()
        .stderr(predicate::str::contains("drill.toml"));
}
