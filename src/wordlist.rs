use crate::error::ScanError;
use crate::types::Target;
use std::path::Path;

/// Parse wordlist content into candidate words.
///
/// Each line is trimmed; blank lines are skipped. Order and duplicates are preserved.
pub fn parse_wordlist_str(s: &str) -> Vec<String> {
    s.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load a wordlist from a file path. Invalid UTF-8 is replaced rather than rejected.
pub async fn load_wordlist_from_path(path: impl AsRef<Path>) -> Result<Vec<String>, ScanError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|source| ScanError::Wordlist {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_wordlist_str(&String::from_utf8_lossy(&bytes)))
}

/// Strip any trailing slashes and append exactly one.
pub fn normalize_base_url(base: &str) -> String {
    format!("{}/", base.trim_end_matches('/'))
}

/// Produces every `word × extension` candidate URL, word-major, extension-minor.
#[derive(Clone, Debug)]
pub struct TargetGenerator {
    base_url: String,
    words: Vec<String>,
    extensions: Vec<String>,
}

impl TargetGenerator {
    /// `base_url` is normalized here as well, so callers may pass it raw.
    pub fn new(base_url: &str, words: Vec<String>, extensions: Vec<String>) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            words,
            extensions,
        }
    }

    /// Number of targets `targets()` will yield.
    pub fn len(&self) -> usize {
        self.words.len() * self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn targets(&self) -> impl Iterator<Item = Target> + '_ {
        self.words.iter().flat_map(move |word| {
            self.extensions
                .iter()
                .map(move |ext| build_target(&self.base_url, word, ext))
        })
    }
}

fn build_target(base_url: &str, word: &str, ext: &str) -> Target {
    if ext.is_empty() {
        Target::new(format!("{base_url}{word}"))
    } else {
        Target::new(format!("{base_url}{word}.{ext}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(g: &TargetGenerator) -> Vec<String> {
        g.targets().map(Target::into_string).collect()
    }

    #[test]
    fn parse_trims_and_skips_blank_lines() {
        let words = parse_wordlist_str("admin\n  login  \n\n\t\nbackup\r\n");
        assert_eq!(words, vec!["admin", "login", "backup"]);
    }

    #[test]
    fn parse_keeps_duplicates() {
        assert_eq!(parse_wordlist_str("a\na\n"), vec!["a", "a"]);
    }

    #[test]
    fn normalize_appends_one_slash() {
        assert_eq!(normalize_base_url("http://h"), "http://h/");
        assert_eq!(normalize_base_url("http://h//"), "http://h/");
        assert_eq!(normalize_base_url("http://h/x/"), "http://h/x/");
    }

    #[test]
    fn word_major_extension_minor_order() {
        let g = TargetGenerator::new(
            "http://example.com",
            vec!["admin".into(), "login".into()],
            vec!["".into(), "php".into()],
        );
        assert_eq!(g.len(), 4);
        assert_eq!(
            urls(&g),
            vec![
                "http://example.com/admin",
                "http://example.com/admin.php",
                "http://example.com/login",
                "http://example.com/login.php",
            ]
        );
    }

    #[test]
    fn repeated_empty_extension_repeats_bare_word() {
        let g = TargetGenerator::new("http://h/", vec!["x".into()], vec!["".into(), "".into()]);
        assert_eq!(urls(&g), vec!["http://h/x", "http://h/x"]);
    }

    #[test]
    fn count_is_words_times_extensions() {
        for w in 0..5 {
            for e in 1..4 {
                let words = (0..w).map(|i| format!("w{i}")).collect();
                let exts = (0..e).map(|i| format!("e{i}")).collect();
                let g = TargetGenerator::new("http://h", words, exts);
                assert_eq!(g.targets().count(), w * e);
                assert_eq!(g.len(), w * e);
            }
        }
    }

    #[tokio::test]
    async fn missing_file_is_wordlist_error() {
        let err = load_wordlist_from_path("/definitely/not/here.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Wordlist { .. }));
    }
}
