/// Filler character used in project directory names for both `/` and `.`
pub const FILLER: char = '-';

const PROJECTS_MARKER: &str = "-Projects-";

/// Convert a file system path like "/Users/ozan/Projects/my.project" to a directory name
/// in the log store's alphabet: "-Users-ozan-Projects-my-project".
/// Every path separator and every literal dot becomes a dash.
pub fn encode_project_path(path: &str) -> String {
    path.chars()
        .map(|c| match c {
            '/' | '.' => FILLER,
            _ => c,
        })
        .collect()
}

/// Convert a directory name like "-Users-ozan-Projects-acme-web-app" into a readable
/// "org/project" label ("acme/web-app").
///
/// The encoding is lossy: separators, dots and dashes inside names all map to the same
/// character. The first dash after the project root is taken as the org boundary, so an
/// org name that itself contains a dash ("my-org/app") decodes as "my/org-app". There
/// is no way to tell these apart from the directory name alone.
pub fn decode_project_name(dir_name: &str) -> String {
    // Remove leading dash if present
    let name = dir_name.strip_prefix(FILLER).unwrap_or(dir_name);

    // Everything after the first "-Projects-" is the project path
    if let Some(idx) = name.find(PROJECTS_MARKER) {
        return format_project_path(&name[idx + PROJECTS_MARKER.len()..]);
    }

    // Otherwise skip "Users-<name>-"
    let parts: Vec<&str> = name.splitn(3, FILLER).collect();
    if parts.len() == 3 && parts[0] == "Users" {
        return format_project_path(parts[2]);
    }

    // Fallback: every dash is a separator
    name.replace(FILLER, "/")
}

/// Split on the first dash only: "acme-web-app" -> "acme/web-app"
fn format_project_path(path: &str) -> String {
    match path.split_once(FILLER) {
        Some((org, rest)) => format!("{}/{}", org, rest),
        None => path.to_string(),
    }
}
