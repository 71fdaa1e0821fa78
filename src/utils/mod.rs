use std::path::Path;

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log10() / THRESHOLD.log10()).floor() as usize;
    let unit_index = unit_index.min(UNITS.len() - 1);

    let size = bytes_f / THRESHOLD.powi(unit_index as i32);

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Sanitize filename for safe filesystem usage
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' => c,
            _ => '_',
        })
        .collect::<String>()
}

/// Generate a unique staging filename with timestamp
pub fn generate_unique_filename(base_name: &str, extension: &str) -> String {
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let random_suffix = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();

    format!(
        "{}_{}_{}_{}.{}",
        "vidscribe",
        sanitize_filename(base_name),
        timestamp,
        random_suffix,
        extension
    )
}

/// Lowercased extension of a path, if any
pub fn extension_lowercase(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Check if the current environment has the external tools the pipeline uses
pub async fn check_dependencies(ffmpeg_path: &str) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(ffmpeg_path).await {
        missing.push(format!(
            "{} - audio extraction will be skipped and files submitted as-is",
            ffmpeg_path
        ));
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg("-version")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}
