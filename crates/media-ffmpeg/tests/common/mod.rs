use std::path::PathBuf;
use std::process::Command;

/// Unique path under the system temp dir.
pub fn temp_output(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "overlay-{label}-{}-{}.mp4",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system clock must be after unix epoch")
            .as_nanos()
    ))
}

/// Generates a `testsrc` clip of `seconds`, with a sine track when `with_audio`.
pub fn make_sample_video(label: &str, size: &str, seconds: &str, with_audio: bool) -> PathBuf {
    let output = temp_output(label);

    let mut command = Command::new("ffmpeg");
    command
        .args(["-y", "-v", "error", "-f", "lavfi", "-i"])
        .arg(format!("testsrc=size={size}:rate=30"));
    if with_audio {
        command.args([
            "-f",
            "lavfi",
            "-i",
            "sine=frequency=440:sample_rate=48000",
        ]);
    }
    let status = command
        .args(["-t", seconds, "-pix_fmt", "yuv420p"])
        .arg(&output)
        .output()
        .expect("ffmpeg must be installed to run tests");

    assert!(
        status.status.success(),
        "ffmpeg command must succeed: {}",
        String::from_utf8_lossy(&status.stderr)
    );
    output
}
