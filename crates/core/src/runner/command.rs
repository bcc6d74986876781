//! Assembly of the ffmpeg command line.

use std::path::Path;

/// User-supplied ffmpeg options, kept in insertion order.
///
/// Setting a key that is already present replaces its value in place. Keys
/// are stored without the leading `-`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FfmpegArgs {
    entries: Vec<(String, Option<String>)>,
}

impl FfmpegArgs {
    /// Creates an empty argument set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`; `None` emits a bare flag.
    pub fn set(&mut self, key: impl Into<String>, value: Option<String>) {
        let key = normalize_key(key.into());
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Adds a `-key value` option.
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, Some(value.into()));
        self
    }

    /// Adds a bare `-key` flag.
    pub fn flag(mut self, key: impl Into<String>) -> Self {
        self.set(key, None);
        self
    }

    /// Removes `key`, returning its value if it was present.
    pub fn remove(&mut self, key: &str) -> Option<Option<String>> {
        let key = normalize_key(key.to_string());
        let index = self.entries.iter().position(|(k, _)| *k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        let key = normalize_key(key.to_string());
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_deref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// Renders the options as command-line tokens.
    pub fn to_tokens(&self) -> Vec<String> {
        let mut tokens = Vec::with_capacity(self.entries.len() * 2);
        for (key, value) in &self.entries {
            tokens.push(format!("-{}", key));
            if let Some(value) = value {
                tokens.push(value.clone());
            }
        }
        tokens
    }
}

impl<K, V> FromIterator<(K, Option<V>)> for FfmpegArgs
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        let mut args = Self::new();
        for (key, value) in iter {
            args.set(key, value.map(Into::into));
        }
        args
    }
}

impl IntoIterator for FfmpegArgs {
    type Item = (String, Option<String>);
    type IntoIter = std::vec::IntoIter<(String, Option<String>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

fn normalize_key(key: String) -> String {
    match key.strip_prefix('-') {
        Some(stripped) => stripped.to_string(),
        None => key,
    }
}

/// Builds `-y -i <source> [options] <output>`.
pub fn build_command(source: &Path, output: &Path, args: &FfmpegArgs) -> Vec<String> {
    let mut command = vec![
        "-y".to_string(), // Overwrite output
        "-i".to_string(),
        source.to_string_lossy().to_string(),
    ];
    command.extend(args.to_tokens());
    command.push(output.to_string_lossy().to_string());
    command
}

/// Appends the `-progress <target>` redirection to a built command.
pub fn with_progress_target(mut command: Vec<String>, target: &Path) -> Vec<String> {
    command.extend([
        "-progress".to_string(),
        target.to_string_lossy().to_string(),
    ]);
    command
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_args() -> FfmpegArgs {
        FfmpegArgs::new()
            .arg("vf", "scale=1920:1080")
            .arg("codec:a", "aac")
            .flag("an")
    }

    #[test]
    fn test_build_command_order() {
        let command = build_command(Path::new("/in.mp4"), Path::new("/out.mp4"), &sample_args());
        assert_eq!(
            command,
            vec![
                "-y",
                "-i",
                "/in.mp4",
                "-vf",
                "scale=1920:1080",
                "-codec:a",
                "aac",
                "-an",
                "/out.mp4",
            ]
        );
    }

    #[test]
    fn test_build_command_without_args() {
        let command = build_command(Path::new("a.mkv"), Path::new("b.mkv"), &FfmpegArgs::new());
        assert_eq!(command, vec!["-y", "-i", "a.mkv", "b.mkv"]);
    }

    #[test]
    fn test_build_command_is_idempotent() {
        let args = sample_args();
        let first = build_command(Path::new("/in.mp4"), Path::new("/out.mp4"), &args);
        let second = build_command(Path::new("/in.mp4"), Path::new("/out.mp4"), &args);
        assert_eq!(first, second);
    }

    #[test]
    fn test_progress_target_is_last() {
        let command = build_command(Path::new("in"), Path::new("out"), &FfmpegArgs::new());
        let command = with_progress_target(command, Path::new("/tmp/p"));
        assert_eq!(command[command.len() - 3..], ["out", "-progress", "/tmp/p"]);
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut args = sample_args();
        args.set("vf", Some("scale=1280:720".to_string()));
        args.set("-an", None);
        assert_eq!(args.len(), 3);
        assert_eq!(
            args.to_tokens(),
            vec!["-vf", "scale=1280:720", "-codec:a", "aac", "-an"]
        );
        assert_eq!(args.get("vf"), Some(Some("scale=1280:720")));
        assert_eq!(args.get("an"), Some(None));
        assert_eq!(args.get("crf"), None);
    }

    #[test]
    fn test_remove_and_collect() {
        let mut args: FfmpegArgs = vec![("crf", Some("23")), ("preset", Some("fast")), ("sn", None)]
            .into_iter()
            .collect();
        assert_eq!(args.remove("preset"), Some(Some("fast".to_string())));
        assert_eq!(args.remove("preset"), None);
        assert_eq!(args.to_tokens(), vec!["-crf", "23", "-sn"]);
        assert!(!args.is_empty());
    }
}
