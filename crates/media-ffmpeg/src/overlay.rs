use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, Command};
use tracing::{debug, info, warn};

use crate::error::{MediaFfmpegError, Result};
use crate::time::Rational;

/// Request payload for burning overlay graphics into an MP4.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayExportRequest {
    pub input: PathBuf,
    pub output_path: PathBuf,
    pub duration_seconds: f64,
    pub render_width: u32,
    pub render_height: u32,
    pub frame_rate: Rational,
    pub include_audio: bool,
    pub overlays: Vec<OverlayGraphic>,
    pub encoding: EncodingSettings,
}

/// Codec settings for the re-encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingSettings {
    pub video_codec: String,
    pub preset: String,
    pub crf: u8,
    pub audio_codec: String,
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            preset: "medium".to_string(),
            crf: 18,
            audio_codec: "aac".to_string(),
        }
    }
}

/// One rectangular plate with text, shown between two fades.
///
/// Coordinates are in output pixels with the origin at the top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayGraphic {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
    pub fill: String,
    pub style: TextStyle,
    pub lines: Vec<OverlayTextLine>,
    pub fade_in_at: f64,
    pub fade_out_at: f64,
    pub fade_seconds: f64,
}

/// Font settings shared by every line of one graphic.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_size: u32,
    pub color: String,
    pub font_file: Option<PathBuf>,
}

/// Horizontal placement of a text line inside its plate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// A single pre-wrapped line, positioned relative to the plate.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayTextLine {
    pub text: String,
    pub y: i64,
    pub inset: i64,
    pub align: TextAlign,
}

/// Re-encodes `input` with every overlay composited over the base video.
///
/// The output is written to `request.output_path`; an existing file at that
/// path makes the export fail instead of being overwritten. Dropping the
/// returned future kills the encoder and removes whatever it wrote.
pub async fn export_overlay_mp4(request: &OverlayExportRequest) -> Result<()> {
    validate_request(request)?;
    if request.output_path.exists() {
        return Err(MediaFfmpegError::InvalidExportRequest {
            reason: "output path already exists",
        });
    }

    let filter_complex = build_filter_complex(request);
    debug!(
        output = %request.output_path.display(),
        overlays = request.overlays.len(),
        filter_complex = %filter_complex,
        "overlay filter graph built"
    );

    let command = overlay_command(request, filter_complex);
    let mut encode = RunningEncode::spawn(command, &request.output_path)?;
    let (status, stderr) = encode.wait().await?;
    if !status.success() {
        return Err(MediaFfmpegError::CommandFailed {
            command: format!("ffmpeg overlay export {}", request.output_path.display()),
            status,
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        });
    }

    encode.disarm();
    info!(output = %request.output_path.display(), "overlay export finished");
    Ok(())
}

fn overlay_command(request: &OverlayExportRequest, filter_complex: String) -> Command {
    let mut command = Command::new("ffmpeg");
    command
        .args(["-hide_banner", "-v", "error", "-nostdin", "-n", "-i"])
        .arg(&request.input)
        .arg("-filter_complex")
        .arg(filter_complex)
        .args(["-map", "[vout]", "-c:v"])
        .arg(&request.encoding.video_codec)
        .arg("-preset")
        .arg(&request.encoding.preset)
        .arg("-crf")
        .arg(request.encoding.crf.to_string())
        .args(["-pix_fmt", "yuv420p"]);

    if request.include_audio {
        command
            .args(["-map", "0:a:0", "-c:a"])
            .arg(&request.encoding.audio_codec);
    } else {
        command.arg("-an");
    }

    command
        .arg("-t")
        .arg(format_seconds(request.duration_seconds))
        .args(["-movflags", "+faststart", "-f", "mp4"])
        .arg(&request.output_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    command
}

/// An ffmpeg child that owns its output file until it finishes successfully.
///
/// Dropping an armed encode kills the child, then removes the output once the
/// child has exited so a late write cannot resurrect it.
struct RunningEncode {
    child: Option<Child>,
    output_path: PathBuf,
    armed: bool,
}

impl RunningEncode {
    fn spawn(mut command: Command, output_path: &Path) -> Result<Self> {
        let child = command.spawn().map_err(|source| MediaFfmpegError::Io {
            context: "run ffmpeg overlay export",
            source,
        })?;
        Ok(Self {
            child: Some(child),
            output_path: output_path.to_path_buf(),
            armed: true,
        })
    }

    async fn wait(&mut self) -> Result<(ExitStatus, Vec<u8>)> {
        let Some(child) = self.child.as_mut() else {
            return Err(MediaFfmpegError::InvalidExportRequest {
                reason: "encoder already finished",
            });
        };

        let stderr = child.stderr.take();
        let (status, stderr) = tokio::join!(child.wait(), read_stderr(stderr));
        let status = status.map_err(|source| MediaFfmpegError::Io {
            context: "wait for ffmpeg overlay export",
            source,
        })?;
        self.child = None;
        Ok((status, stderr))
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for RunningEncode {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let output_path = self.output_path.clone();
        let Some(mut child) = self.child.take() else {
            remove_partial_output(&output_path);
            return;
        };

        if let Err(err) = child.start_kill() {
            debug!(error = %err, "ffmpeg already exited");
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = child.wait().await {
                        warn!(error = %err, "failed to reap abandoned ffmpeg");
                    }
                    remove_partial_output(&output_path);
                });
            }
            Err(_) => remove_partial_output(&output_path),
        }
    }
}

async fn read_stderr(pipe: Option<ChildStderr>) -> Vec<u8> {
    let mut buffer = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(err) = pipe.read_to_end(&mut buffer).await {
            debug!(error = %err, "ffmpeg stderr unreadable");
        }
    }
    buffer
}

fn remove_partial_output(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "partial overlay output removed"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!(
            path = %path.display(),
            error = %err,
            "failed to remove partial overlay output"
        ),
    }
}

fn build_filter_complex(request: &OverlayExportRequest) -> String {
    // yuv420p needs even dimensions.
    let width = (request.render_width & !1).max(2);
    let height = (request.render_height & !1).max(2);
    let base_label = if request.overlays.is_empty() {
        "vout"
    } else {
        "base"
    };

    let mut chains = Vec::<String>::with_capacity(request.overlays.len() * 2 + 1);
    chains.push(format!(
        "[0:v:0]scale={width}:{height},setsar=1,fps={}[{base_label}]",
        request.frame_rate
    ));

    let mut current = base_label.to_string();
    for (index, graphic) in request.overlays.iter().enumerate() {
        chains.push(graphic_source_chain(graphic, index, request));

        let output = if index + 1 == request.overlays.len() {
            "vout".to_string()
        } else {
            format!("ov{index}")
        };
        chains.push(format!(
            "[{current}][cap{index}]overlay=x={}:y={}:eof_action=pass:enable='between(t,{},{})'[{output}]",
            graphic.x,
            graphic.y,
            format_seconds(graphic.fade_in_at),
            format_seconds(graphic.fade_out_at + graphic.fade_seconds),
        ));
        current = output;
    }

    chains.join(";")
}

fn graphic_source_chain(
    graphic: &OverlayGraphic,
    index: usize,
    request: &OverlayExportRequest,
) -> String {
    let mut chain = format!(
        "color=c={}:s={}x{}:r={}:d={},format=rgba",
        escape_filter_value(&graphic.fill),
        graphic.width,
        graphic.height,
        request.frame_rate,
        format_seconds(request.duration_seconds),
    );

    for line in &graphic.lines {
        chain.push_str(",drawtext=expansion=none:text=");
        chain.push_str(&escape_filter_value(&line.text));
        chain.push_str(&format!(
            ":fontsize={}:fontcolor={}:x={}:y={}",
            graphic.style.font_size,
            escape_filter_value(&graphic.style.color),
            line_x_expression(line),
            line.y
        ));
        if let Some(font_file) = &graphic.style.font_file {
            chain.push_str(":fontfile=");
            chain.push_str(&escape_filter_value(&font_file.to_string_lossy()));
        }
    }

    chain.push_str(&format!(
        ",fade=t=in:st={fade_in}:d={fade}:alpha=1,fade=t=out:st={fade_out}:d={fade}:alpha=1[cap{index}]",
        fade_in = format_seconds(graphic.fade_in_at),
        fade_out = format_seconds(graphic.fade_out_at),
        fade = format_seconds(graphic.fade_seconds),
    ));
    chain
}

fn line_x_expression(line: &OverlayTextLine) -> String {
    match line.align {
        TextAlign::Left => line.inset.to_string(),
        TextAlign::Center => "(w-text_w)/2".to_string(),
        TextAlign::Right => format!("w-text_w-{}", line.inset),
    }
}

/// Escapes a value for both the filter option parser and the filtergraph
/// parser, in that order.
fn escape_filter_value(raw: &str) -> String {
    let mut option_level = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        if matches!(ch, '\\' | '\'' | ':') {
            option_level.push('\\');
        }
        option_level.push(ch);
    }

    let mut graph_level = String::with_capacity(option_level.len() + 8);
    for ch in option_level.chars() {
        if matches!(ch, '\\' | '\'' | '[' | ']' | ',' | ';') {
            graph_level.push('\\');
        }
        graph_level.push(ch);
    }
    graph_level
}

fn format_seconds(seconds: f64) -> String {
    format!("{seconds:.3}")
}

fn validate_request(request: &OverlayExportRequest) -> Result<()> {
    if !request.duration_seconds.is_finite() || request.duration_seconds <= 0.0 {
        return Err(MediaFfmpegError::InvalidExportRequest {
            reason: "duration must be positive",
        });
    }
    if request.render_width == 0 || request.render_height == 0 {
        return Err(MediaFfmpegError::InvalidExportRequest {
            reason: "render size must be positive",
        });
    }

    for graphic in &request.overlays {
        if graphic.width == 0 || graphic.height == 0 {
            return Err(MediaFfmpegError::InvalidExportRequest {
                reason: "overlay plate size must be positive",
            });
        }
        if graphic.style.font_size == 0 {
            return Err(MediaFfmpegError::InvalidExportRequest {
                reason: "overlay font size must be positive",
            });
        }
        if !graphic.fade_seconds.is_finite() || graphic.fade_seconds < 0.0 {
            return Err(MediaFfmpegError::InvalidExportRequest {
                reason: "overlay fade duration must not be negative",
            });
        }
        if graphic.fade_out_at <= graphic.fade_in_at {
            return Err(MediaFfmpegError::InvalidExportRequest {
                reason: "overlay must fade out after it fades in",
            });
        }
    }

    Ok(())
}
