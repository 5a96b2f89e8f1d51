//! Scrubbing of crash data before it leaves the device
//!
//! Replaces personally identifiable information (home directory, user name,
//! file names) in stack frames and error text with placeholders. Applied by
//! the uploader only; stored logs keep the original text.

use exponea_core::config::AnonymizeConfig;
use exponea_core::domain::ErrorMetadata;

/// Anonymizes text based on the provided configuration.
#[derive(Debug, Clone)]
pub struct Anonymizer {
    strip_paths: bool,
    strip_usernames: bool,
    strip_filenames: bool,
    home_dir: String,
    username: String,
}

impl Anonymizer {
    /// Creates a new `Anonymizer` for the current user.
    pub fn new(config: &AnonymizeConfig) -> Self {
        let home_dir = dirs::home_dir()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();
        let username = std::env::var("USER")
            .or_else(|_| std::env::var("LOGNAME"))
            .unwrap_or_default();

        Self::with_identity(config, home_dir, username)
    }

    /// Creates an `Anonymizer` for an explicit home directory and user name.
    pub fn with_identity(
        config: &AnonymizeConfig,
        home_dir: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            strip_paths: config.strip_paths,
            strip_usernames: config.strip_usernames,
            strip_filenames: config.strip_filenames,
            home_dir: home_dir.into(),
            username: username.into(),
        }
    }

    /// Anonymize the given text by applying configured replacements.
    pub fn anonymize(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.strip_paths && !self.home_dir.is_empty() {
            result = result.replace(&self.home_dir, "<HOME>");
        }

        if self.strip_usernames && !self.username.is_empty() {
            result = replace_path_segment(&result, &self.username, "<USER>");
        }

        if self.strip_filenames {
            result = anonymize_filenames(&result);
        }

        result
    }

    pub fn anonymize_frames(&self, frames: &[String]) -> Vec<String> {
        frames.iter().map(|frame| self.anonymize(frame)).collect()
    }

    /// Anonymizes the message and causes; the kind is a type name and kept.
    pub fn anonymize_error(&self, error: &ErrorMetadata) -> ErrorMetadata {
        ErrorMetadata::new(error.kind.clone(), self.anonymize(&error.message))
            .with_causes(self.anonymize_frames(&error.causes))
    }
}

/// Replace `segment` where it forms a whole path component
/// (`/home/<segment>/`, `C:\Users\<segment>`), leaving other matches alone.
fn replace_path_segment(text: &str, segment: &str, replacement: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find(segment) {
        let before = rest[..pos]
            .chars()
            .next_back()
            .or_else(|| result.chars().next_back());
        let after = rest[pos + segment.len()..].chars().next();
        let whole = matches!(before, Some('/' | '\\'))
            && after.map_or(true, |c| c == '\\' || is_path_boundary(c));

        result.push_str(&rest[..pos]);
        result.push_str(if whole { replacement } else { segment });
        rest = &rest[pos + segment.len()..];
    }

    result.push_str(rest);
    result
}

/// Replace the file name of path-like segments (`/dir/name.ext`) with
/// `<FILE>.ext`, keeping the directories.
fn anonymize_filenames(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(slash) = rest.find('/') {
        result.push_str(&rest[..=slash]);
        rest = &rest[slash + 1..];

        let end = rest.find(is_path_boundary).unwrap_or(rest.len());
        let segment = &rest[..end];
        match segment.rfind('.') {
            Some(dot) if dot > 0 && dot < segment.len() - 1 => {
                result.push_str("<FILE>");
                result.push_str(&segment[dot..]);
            }
            _ => result.push_str(segment),
        }
        rest = &rest[end..];
    }

    result.push_str(rest);
    result
}

fn is_path_boundary(c: char) -> bool {
    matches!(c, '/' | ' ' | '\n' | ':' | '"' | '(' | ')')
}
