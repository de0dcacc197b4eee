use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Check if ffmpeg is available
pub async fn check_ffmpeg() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .await
        .is_ok()
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in path: {:?}", path))
}

/// Convert a WAV file to MP3
pub async fn wav_to_mp3(input: &Path, output: &Path) -> Result<()> {
    let status = Command::new("ffmpeg")
        .args([
            "-i",
            path_str(input)?,
            "-codec:a",
            "libmp3lame",
            "-qscale:a",
            "2",
            "-y", // Overwrite
            path_str(output)?,
        ])
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .await
        .context("Failed to run ffmpeg")?;

    if !status.success() {
        anyhow::bail!("ffmpeg failed to convert {:?} to MP3", input);
    }

    Ok(())
}

/// Generate a silent MP3 of the given duration
pub async fn write_silence(duration_ms: u64, output: &Path) -> Result<()> {
    let status = Command::new("ffmpeg")
        .args([
            "-f",
            "lavfi",
            "-i",
            &format!("anullsrc=r=24000:cl=mono:d={}", duration_ms as f64 / 1000.0),
            "-c:a",
            "libmp3lame",
            "-b:a",
            "48k",
            "-y",
            path_str(output)?,
        ])
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .await
        .context("Failed to run ffmpeg")?;

    if !status.success() {
        anyhow::bail!("ffmpeg failed to generate {}ms of silence", duration_ms);
    }

    Ok(())
}

/// Join audio files into one output using the concat demuxer
pub async fn concat_audio(files: &[PathBuf], output: &Path) -> Result<()> {
    if files.is_empty() {
        anyhow::bail!("No audio files to combine");
    }

    // The concat demuxer reads its input list from a file
    let list_path = std::env::temp_dir().join(format!(
        "benkyo-concat-{}-{}.txt",
        std::process::id(),
        chrono::Utc::now().timestamp_micros()
    ));

    let mut list = String::new();
    for file in files {
        list.push_str(&format!("file '{}'\n", path_str(file)?));
    }
    std::fs::write(&list_path, list).context("Failed to write concat list")?;

    let status = Command::new("ffmpeg")
        .args([
            "-f",
            "concat",
            "-safe",
            "0",
            "-i",
            path_str(&list_path)?,
            "-c",
            "copy",
            "-y",
            path_str(output)?,
        ])
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .await
        .context("Failed to run ffmpeg")?;

    let _ = std::fs::remove_file(&list_path);

    if !status.success() {
        if output.exists() {
            let _ = std::fs::remove_file(output);
        }
        anyhow::bail!("ffmpeg failed to combine audio files");
    }

    Ok(())
}
