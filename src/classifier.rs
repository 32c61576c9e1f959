//! Maps a domain to a [Category] by list membership.
//!
//! Membership is substring containment on the lower cased domain, so `gist.github.com` is
//! productive because it contains `github.com`. The flip side is that any host embedding a
//! listed name is classified with it as well.

use std::sync::Arc;

use crate::daemon::storage::entities::Category;

pub const DEFAULT_PRODUCTIVE_SITES: &[&str] = &[
    "github.com",
    "stackoverflow.com",
    "leetcode.com",
    "docs.google.com",
    "codecademy.com",
    "udemy.com",
    "coursera.org",
    "developer.mozilla.org",
    "w3schools.com",
    "freecodecamp.org",
    "gitlab.com",
    "bitbucket.org",
    "notion.so",
    "trello.com",
    "atlassian.com",
    "medium.com",
    "chat.openai.com",
    "codepen.io",
    "jsfiddle.net",
    "repl.it",
    "glitch.com",
];

pub const DEFAULT_UNPRODUCTIVE_SITES: &[&str] = &[
    "youtube.com",
    "netflix.com",
    "facebook.com",
    "twitter.com",
    "instagram.com",
    "reddit.com",
    "tiktok.com",
    "pinterest.com",
    "9gag.com",
    "twitch.tv",
    "dailymotion.com",
    "vimeo.com",
    "ebay.com",
    "amazon.com",
    "shopping.com",
];

#[derive(Debug, Clone)]
pub struct Classifier {
    productive: Arc<[String]>,
    unproductive: Arc<[String]>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(
            DEFAULT_PRODUCTIVE_SITES.iter().copied(),
            DEFAULT_UNPRODUCTIVE_SITES.iter().copied(),
        )
    }
}

impl Classifier {
    pub fn new(
        productive: impl IntoIterator<Item = impl AsRef<str>>,
        unproductive: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Self {
        fn normalize(sites: impl IntoIterator<Item = impl AsRef<str>>) -> Arc<[String]> {
            sites
                .into_iter()
                .map(|site| site.as_ref().trim().to_lowercase())
                .filter(|site| !site.is_empty())
                .collect()
        }

        Self {
            productive: normalize(productive),
            unproductive: normalize(unproductive),
        }
    }

    /// Productive lists win over unproductive ones when a domain matches both.
    pub fn classify(&self, domain: &str) -> Category {
        let domain = domain.to_lowercase();
        if self.productive.iter().any(|site| domain.contains(site.as_str())) {
            Category::Productive
        } else if self
            .unproductive
            .iter()
            .any(|site| domain.contains(site.as_str()))
        {
            Category::Unproductive
        } else {
            Category::Neutral
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::daemon::storage::entities::Category;

    use super::Classifier;

    #[test]
    fn test_default_lists() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify("docs.google.com"), Category::Productive);
        assert_eq!(classifier.classify("youtube.com"), Category::Unproductive);
        assert_eq!(classifier.classify("example.org"), Category::Neutral);
    }

    #[test]
    fn test_case_and_subdomains() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify("Gist.GitHub.com"), Category::Productive);
        assert_eq!(classifier.classify("m.youtube.com"), Category::Unproductive);
    }

    #[test]
    fn test_substring_match_covers_embedding_hosts() {
        let classifier = Classifier::default();
        assert_eq!(
            classifier.classify("docs.google.com.example.net"),
            Category::Productive
        );
    }

    #[test]
    fn test_productive_checked_first() {
        let classifier = Classifier::new(["tube.dev"], ["tube.dev", "video"]);
        assert_eq!(classifier.classify("my.tube.dev"), Category::Productive);
        assert_eq!(classifier.classify("video.site"), Category::Unproductive);
    }

    #[test]
    fn test_custom_lists_are_normalized() {
        let classifier = Classifier::new(["  Rust-Lang.org "], Vec::<String>::new());
        assert_eq!(classifier.classify("doc.rust-lang.org"), Category::Productive);
        assert_eq!(classifier.classify("youtube.com"), Category::Neutral);
    }
}
