use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn seed_content(workspace: &Path) {
    let back = workspace.join("Concepts/BackControl");
    std::fs::create_dir_all(back.join("Games")).expect("mkdirs");
    std::fs::write(
        back.join("BackControl.md"),
        "# Back Control\n\nChest to back, hooks in, seatbelt grip.",
    )
    .expect("concept");
    std::fs::write(
        back.join("Games/GripFight.md"),
        "---\ntitle: Grip Fight\ncategory: Back Control\nduration: 4\ntype: Continuous\ngoals: Keep the seatbelt\n---\n\nFight for the seatbelt grip.",
    )
    .expect("game");
    std::fs::write(
        back.join("Games/SeatbeltEscapes.md"),
        "---\ntitle: Seatbelt Escapes\ncategory: Back Control\nduration: 5\nplayers: 3\ntype: Round-Switching\n---\n\nEscape the seatbelt, rotate per round.",
    )
    .expect("game");

    let guard = workspace.join("Concepts/Guard");
    std::fs::create_dir_all(guard.join("Games")).expect("mkdirs");
    std::fs::write(guard.join("Guard.md"), "# Guard\n\nClosed and open guard.").expect("concept");
    std::fs::write(
        guard.join("Games/SweepOrStand.md"),
        "---\ntitle: Sweep or Stand\n---\n\n**Purpose**\nSweep or get back to the feet.",
    )
    .expect("game");
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_ecoclassd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn ecoclassd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({ "id": id, "method": method, "params": params });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    serde_json::from_str(line.trim()).expect("parse response json")
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().expect("result")
}

#[test]
fn game_entries_drive_section_totals() {
    let workspace = temp_dir("ecoclass-games-totals");
    seed_content(&workspace);
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let index = request_ok(&mut stdin, &mut reader, "2", "content.index", json!({}));
    let game_ids: Vec<&str> = index["games"]
        .as_array()
        .expect("games")
        .iter()
        .map(|g| g["id"].as_str().expect("id"))
        .collect();
    assert!(game_ids.contains(&"backcontrol-grip-fight"));
    assert!(game_ids.contains(&"backcontrol-seatbelt-escapes"));
    assert!(game_ids.contains(&"guard-sweep-or-stand"));

    let view = request_ok(&mut stdin, &mut reader, "3", "plan.get", json!({}));
    let section_id = view["sections"][0]["sectionId"]
        .as_str()
        .expect("section id")
        .to_string();

    // 4 (continuous) + 5*3 (round-switching) + 5 (no duration fallback).
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "plan.games.add",
        json!({ "sectionId": section_id, "gameId": "backcontrol-grip-fight" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "plan.games.add",
        json!({ "sectionId": section_id, "gameId": "backcontrol-seatbelt-escapes" }),
    );
    let loaded = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "plan.games.add",
        json!({ "sectionId": section_id, "gameId": "guard-sweep-or-stand" }),
    );

    let section = &loaded["sections"][0];
    assert_eq!(section["computedTotal"], json!(24.0));
    assert_eq!(section["displayDuration"], json!(24.0));
    assert_eq!(section["displayBadge"], json!("24:00"));
    assert_eq!(section["pacing"], json!("over"));

    let entries = section["entries"].as_array().expect("entries");
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["title"], json!("Grip Fight"));
    assert_eq!(entries[1]["contributionMinutes"], json!(15.0));
    // Purpose backfilled from the legacy bold marker in the body.
    assert_eq!(
        entries[2]["purpose"],
        json!("Sweep or get back to the feet.")
    );

    // Manual override beats the computed total.
    let pinned = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "plan.sections.setOverride",
        json!({ "sectionId": section_id, "minutes": 10 }),
    );
    assert_eq!(pinned["sections"][0]["displayDuration"], json!(10.0));
    assert_eq!(pinned["sections"][0]["computedTotal"], json!(24.0));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn move_and_remove_entries() {
    let workspace = temp_dir("ecoclass-games-reorder");
    seed_content(&workspace);
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let view = request_ok(&mut stdin, &mut reader, "2", "plan.get", json!({}));
    let section_id = view["sections"][1]["sectionId"]
        .as_str()
        .expect("section id")
        .to_string();

    for (id, game) in [
        ("3", "backcontrol-grip-fight"),
        ("4", "backcontrol-seatbelt-escapes"),
        ("5", "guard-sweep-or-stand"),
    ] {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            id,
            "plan.games.add",
            json!({ "sectionId": section_id, "gameId": game }),
        );
    }

    let moved = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "plan.games.move",
        json!({ "sectionId": section_id, "index": 2, "direction": -1 }),
    );
    let titles: Vec<&str> = moved["sections"][1]["entries"]
        .as_array()
        .expect("entries")
        .iter()
        .map(|e| e["title"].as_str().expect("title"))
        .collect();
    assert_eq!(titles, vec!["Grip Fight", "Sweep or Stand", "Seatbelt Escapes"]);

    // Moving the first entry up changes nothing.
    let unmoved = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "plan.games.move",
        json!({ "sectionId": section_id, "index": 0, "direction": -1 }),
    );
    assert_eq!(
        unmoved["sections"][1]["entries"][0]["title"],
        json!("Grip Fight")
    );

    let removed = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "plan.games.remove",
        json!({ "sectionId": section_id, "index": 1 }),
    );
    let remaining = removed["sections"][1]["entries"].as_array().expect("entries");
    assert_eq!(remaining.len(), 2);
    assert_eq!(remaining[1]["title"], json!("Seatbelt Escapes"));

    let bad = request(
        &mut stdin,
        &mut reader,
        "9",
        "plan.games.add",
        json!({ "sectionId": "no-such-section", "gameId": "backcontrol-grip-fight" }),
    );
    assert_eq!(
        bad.get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str()),
        Some("not_found")
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn select_concept_only_takes_known_ids() {
    let workspace = temp_dir("ecoclass-games-concept");
    seed_content(&workspace);
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let picked = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "plan.selectConcept",
        json!({ "conceptId": "back-control" }),
    );
    assert_eq!(picked["concept"]["title"], json!("Back Control"));

    // Unknown ids are silently ignored, keeping the current selection.
    let kept = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "plan.selectConcept",
        json!({ "conceptId": "no-such-concept" }),
    );
    assert_eq!(kept["concept"]["conceptId"], json!("back-control"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
