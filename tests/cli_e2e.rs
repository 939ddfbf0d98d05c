//! End-to-end CLI tests for the cratedigger binaries.
//!
//! Every invocation points `XDG_CONFIG_HOME` at an empty directory so a
//! developer's own config file cannot change the outcome.

mod support;

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use support::socket_guard::start_mock_server_or_skip;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ALBUM: &str = "https://open.spotify.com/album/4aawyAB9vmqN3uQ7FjRGTy";

fn command(bin: &str, config_home: &Path) -> Command {
    let mut cmd = Command::cargo_bin(bin).unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home).env_remove("RUST_LOG");
    cmd
}

async fn mount_page(server: &MockServer, html: String) {
    Mock::given(method("GET"))
        .and(path("/page.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(server)
        .await;
}

// ==================== cratedigger Tests ====================

#[test]
fn test_binary_help_displays_usage() {
    let config = TempDir::new().unwrap();
    command("cratedigger", config.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Wayback Machine"))
        .stdout(predicate::str::contains("--download"));
}

#[test]
fn test_binary_version_displays_version() {
    let config = TempDir::new().unwrap();
    command("cratedigger", config.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cratedigger"));
}

#[test]
fn test_binary_missing_url_is_usage_error() {
    let config = TempDir::new().unwrap();
    command("cratedigger", config.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[tokio::test]
async fn test_binary_discovery_lists_urls_with_note() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let config = TempDir::new().unwrap();
    mount_page(
        &server,
        format!(r#"<a href="{}/a.mp3">A</a><a href="/b.txt">B</a>"#, server.uri()),
    )
    .await;

    command("cratedigger", config.path())
        .arg(format!("{}/page.html", server.uri()))
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Found 1 potential MP3 URLs (adjusted for Wayback Machine):",
        ))
        .stdout(predicate::str::contains(format!("{}/a.mp3", server.uri())))
        .stdout(predicate::str::contains("Use --download to save the MP3 files."));
}

#[tokio::test]
async fn test_binary_discovery_json_output() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let config = TempDir::new().unwrap();
    mount_page(&server, format!(r#"<a href="{}/a.mp3">A</a>"#, server.uri())).await;
    let page = format!("{}/page.html", server.uri());

    let output = command("cratedigger", config.path())
        .args([page.as_str(), "--json", "-q"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["page"], page.as_str());
    assert_eq!(json["urls"][0], format!("{}/a.mp3", server.uri()).as_str());
}

#[tokio::test]
async fn test_binary_no_urls_found_message() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let config = TempDir::new().unwrap();
    mount_page(&server, "<p>empty</p>".to_string()).await;

    command("cratedigger", config.path())
        .arg(format!("{}/page.html", server.uri()))
        .assert()
        .success()
        .stdout(predicate::str::contains("No MP3 URLs found on the page."));
}

#[tokio::test]
async fn test_binary_fetch_failure_exits_one() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let config = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    command("cratedigger", config.path())
        .arg(format!("{}/page.html", server.uri()))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to fetch archived page"));
}

#[tokio::test]
async fn test_binary_download_saves_files_and_prints_tally() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let config = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    mount_page(&server, format!(r#"<a href="{}/a.mp3">A</a>"#, server.uri())).await;
    Mock::given(method("GET"))
        .and(path("/a.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp3 data".to_vec()))
        .mount(&server)
        .await;

    command("cratedigger", config.path())
        .arg(format!("{}/page.html", server.uri()))
        .args(["--download", "-w", "0", "-r", "1", "-q", "-o"])
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Saved to"))
        .stdout(predicate::str::contains(
            "Download complete: 1 successful, 0 failed",
        ));

    assert_eq!(std::fs::read(out.path().join("a.mp3")).unwrap(), b"mp3 data");
}

#[tokio::test]
async fn test_binary_download_failures_exit_two() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let config = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    mount_page(
        &server,
        format!(
            r#"<a href="{0}/good.mp3">A</a><a href="{0}/gone.mp3">B</a>"#,
            server.uri()
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/good.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone.mp3"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    command("cratedigger", config.path())
        .arg(format!("{}/page.html", server.uri()))
        .args(["--download", "-w", "0", "-r", "1", "-q", "-o"])
        .arg(out.path())
        .assert()
        .code(2)
        .stdout(predicate::str::contains("✗ Failed:"))
        .stdout(predicate::str::contains(
            "Download complete: 1 successful, 1 failed",
        ));

    assert!(out.path().join("good.mp3").exists());
    assert!(!out.path().join("gone.mp3").exists());
}

#[test]
fn test_binary_invalid_config_file_is_reported() {
    let config = TempDir::new().unwrap();
    std::fs::create_dir_all(config.path().join("cratedigger")).unwrap();
    std::fs::write(
        config.path().join("cratedigger/config.toml"),
        "max_retries = many\n",
    )
    .unwrap();

    command("cratedigger", config.path())
        .arg("https://web.archive.org/web/20210101000000/https://site.com/")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to parse config file"));
}

// ==================== cratedigger-spotify Tests ====================

#[test]
fn test_spotify_conflicting_format_flags_rejected() {
    let config = TempDir::new().unwrap();
    command("cratedigger-spotify", config.path())
        .args([ALBUM, "--keep-ogg", "--use-ogg"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_spotify_url_required_when_downloading() {
    let config = TempDir::new().unwrap();
    command("cratedigger-spotify", config.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("<URL>"));
}

#[test]
fn test_spotify_invalid_url_exits_one() {
    let config = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    command("cratedigger-spotify", config.path())
        .arg("https://open.spotify.com/artist/4aawyAB9vmqN3uQ7FjRGTy")
        .arg("-t")
        .arg(target.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid Spotify URL"));
}

#[test]
fn test_spotify_skip_download_with_keep_ogg_does_nothing() {
    let config = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    command("cratedigger-spotify", config.path())
        .args(["--skip-download", "--keep-ogg", "--quiet", "-t"])
        .arg(target.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Converting").not());
}

#[cfg(unix)]
#[test]
fn test_spotify_fetch_moves_new_files_into_target() {
    use std::os::unix::fs::PermissionsExt;

    let config = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let bin_dir = TempDir::new().unwrap();

    // Pre-existing library content must not be touched.
    std::fs::create_dir_all(library.path().join("Old/Album")).unwrap();
    std::fs::write(library.path().join("Old/Album/old.mp3"), b"old").unwrap();

    let script = bin_dir.path().join("fake-zotify");
    std::fs::write(
        &script,
        r#"#!/bin/sh
if [ "$1" = "--info" ]; then
  echo "Found 1 items"
  exit 0
fi
mkdir -p "$FAKE_LIBRARY/Artist/Album"
printf 'audio' > "$FAKE_LIBRARY/Artist/Album/01 Song.mp3"
printf 'jpeg' > "$FAKE_LIBRARY/Artist/Album/cover.jpg"
echo "Downloading Song"
"#,
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    command("cratedigger-spotify", config.path())
        .env("FAKE_LIBRARY", library.path())
        .arg(ALBUM)
        .arg("--zotify")
        .arg(&script)
        .arg("--library")
        .arg(library.path())
        .arg("-t")
        .arg(target.path())
        .args(["--quiet", "-w", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Content type: album"))
        .stdout(predicate::str::contains(
            "Placed 1 audio files and 1 cover images",
        ));

    assert!(target.path().join("Artist/Album/01 Song.mp3").exists());
    assert!(target.path().join("Artist/Album/cover.jpg").exists());
    assert!(!library.path().join("Artist/Album/01 Song.mp3").exists());
    assert!(library.path().join("Old/Album/old.mp3").exists());
    assert!(!target.path().join("Old").exists());
}

#[cfg(unix)]
#[test]
fn test_spotify_zotify_failure_exits_one() {
    use std::os::unix::fs::PermissionsExt;

    let config = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let bin_dir = TempDir::new().unwrap();

    let script = bin_dir.path().join("broken-zotify");
    std::fs::write(&script, "#!/bin/sh\necho 'login failed' >&2\nexit 3\n").unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    command("cratedigger-spotify", config.path())
        .arg(ALBUM)
        .arg("--zotify")
        .arg(&script)
        .arg("--library")
        .arg(library.path())
        .arg("-t")
        .arg(target.path())
        .arg("--quiet")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("zotify exited with"));
}

#[cfg(unix)]
#[test]
fn test_spotify_url_file_downloads_each_url_with_quality() {
    use std::os::unix::fs::PermissionsExt;

    let config = TempDir::new().unwrap();
    let library = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();

    // One file per call, named after the Spotify ID; every call is logged.
    let script = work.path().join("fake-zotify");
    std::fs::write(
        &script,
        r#"#!/bin/sh
echo "$@" >> "$FAKE_LOG"
if [ "$1" = "--info" ]; then
  exit 0
fi
id=$(basename "$1")
mkdir -p "$FAKE_LIBRARY/Artist"
printf 'audio' > "$FAKE_LIBRARY/Artist/$id.mp3"
"#,
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let list = work.path().join("urls.txt");
    std::fs::write(
        &list,
        "# queue
https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC

         https://open.spotify.com/track/1DFixLWuPkv3KT3TnV35m3
",
    )
    .unwrap();
    let log = work.path().join("calls.log");

    command("cratedigger-spotify", config.path())
        .env("FAKE_LIBRARY", library.path())
        .env("FAKE_LOG", &log)
        .arg("--file")
        .arg(&list)
        .arg("--zotify")
        .arg(&script)
        .arg("--library")
        .arg(library.path())
        .arg("-t")
        .arg(target.path())
        .args(["-q", "320", "-w", "0", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded 2 URLs"))
        .stdout(predicate::str::contains("Downloaded 2 of 2 URLs"));

    assert!(target.path().join("Artist/4uLU6hMCjMI75M1A2tKUQC.mp3").exists());
    assert!(target.path().join("Artist/1DFixLWuPkv3KT3TnV35m3.mp3").exists());

    let calls = std::fs::read_to_string(&log).unwrap();
    let downloads: Vec<&str> = calls.lines().filter(|l| !l.starts_with("--info")).collect();
    assert_eq!(downloads.len(), 2);
    assert!(downloads[0].starts_with("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC"));
    assert!(downloads.iter().all(|l| l.ends_with("--download-quality very_high")));
}

#[test]
fn test_spotify_url_file_with_bad_line_exits_one() {
    let config = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let list = work.path().join("urls.txt");
    std::fs::write(&list, "https://open.spotify.com/artist/4uLU6hMCjMI75M1A2tKUQC
").unwrap();

    command("cratedigger-spotify", config.path())
        .arg("-f")
        .arg(&list)
        .arg("-t")
        .arg(target.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid Spotify URL"));
}

// ==================== cratedigger-convert Tests ====================

#[test]
fn test_convert_empty_directory_reports_nothing_to_do() {
    let config = TempDir::new().unwrap();
    let music = TempDir::new().unwrap();
    command("cratedigger-convert", config.path())
        .arg(music.path())
        .arg("-q")
        .assert()
        .success()
        .stdout(predicate::str::contains("No unconverted OGG files found!"));
}

#[test]
fn test_convert_missing_directory_fails() {
    let config = TempDir::new().unwrap();
    let music = TempDir::new().unwrap();
    command("cratedigger-convert", config.path())
        .arg(music.path().join("nope"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("IO error"));
}

#[cfg(unix)]
#[test]
fn test_convert_with_fake_ffmpeg_and_copy_to() {
    use std::os::unix::fs::PermissionsExt;

    let config = TempDir::new().unwrap();
    let music = TempDir::new().unwrap();
    let flat = TempDir::new().unwrap();
    let bin_dir = TempDir::new().unwrap();

    std::fs::create_dir_all(music.path().join("a")).unwrap();
    std::fs::create_dir_all(music.path().join("b")).unwrap();
    std::fs::write(music.path().join("a/song.ogg"), b"OggS").unwrap();
    std::fs::write(music.path().join("b/song.ogg"), b"OggS").unwrap();

    // Output path is the seventh argument: -i IN -codec:a libmp3lame -q:a Q OUT
    let script = bin_dir.path().join("fake-ffmpeg");
    std::fs::write(
        &script,
        "#!/bin/sh\nhead -c 2048 /dev/zero > \"$7\"\n",
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    command("cratedigger-convert", config.path())
        .arg(music.path())
        .arg("--ffmpeg")
        .arg(&script)
        .arg("--remove-originals")
        .arg("--copy-to")
        .arg(flat.path())
        .arg("-q")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Successfully converted 2 of 2 files.",
        ))
        .stdout(predicate::str::contains("Files successfully copied: 2"));

    assert!(music.path().join("a/song.mp3").exists());
    assert!(!music.path().join("a/song.ogg").exists());
    assert!(flat.path().join("song.mp3").exists());
    assert!(flat.path().join("song_1.mp3").exists());
}
