use std::fs;
use std::process::{Command, Output};

fn scene_batch(args: &[&str]) -> std::io::Result<Output> {
    Command::new(env!("CARGO_BIN_EXE_scene-batch")).args(args).output()
}

#[test]
fn missing_scene_list_exits_with_one() -> Result<(), Box<dyn std::error::Error>> {
    let output = scene_batch(&[])?;

    assert_eq!(output.status.code(), Some(1));
    Ok(())
}

#[test]
fn unknown_flag_exits_with_one() -> Result<(), Box<dyn std::error::Error>> {
    let output = scene_batch(&["scenes.txt", "--bogus"])?;

    assert_eq!(output.status.code(), Some(1));
    Ok(())
}

#[test]
fn scene_list_and_scene_flag_conflict() -> Result<(), Box<dyn std::error::Error>> {
    let output = scene_batch(&["scenes.txt", "--scene", "a.zip"])?;

    assert_eq!(output.status.code(), Some(1));
    Ok(())
}

#[test]
fn help_exits_with_zero() -> Result<(), Box<dyn std::error::Error>> {
    let output = scene_batch(&["--help"])?;

    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8(output.stdout)?.contains("SCENE_LIST"));
    Ok(())
}

#[test]
fn unreadable_config_exits_with_one() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempfile::tempdir()?;
    let list = temp_dir.path().join("scenes.txt");
    fs::write(&list, "a.zip\n")?;
    let config = temp_dir.path().join("missing.json");

    let output = scene_batch(&[
        list.to_str().ok_or("non-utf8 temp path")?,
        "--config",
        config.to_str().ok_or("non-utf8 temp path")?,
    ])?;

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8(output.stderr)?.contains("missing.json"));
    Ok(())
}
