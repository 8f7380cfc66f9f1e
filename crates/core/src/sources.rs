//! Fixed source sets and source name classification

/// Source set used in SCAD mode outside the Google tab, and as the
/// default for customer-experience and campaign sub-topics.
pub const SOCIAL_SOURCES: &[&str] = &[
    "Twitter",
    "Facebook",
    "Instagram",
    "Youtube",
    "Pinterest",
    "Reddit",
    "LinkedIn",
    "Tumblr",
    "Vimeo",
    "Web",
];

/// Default source set for media-monitoring sub-topics.
pub const PRESS_SOURCES: &[&str] = &["News", "Blogs", "Web"];

/// Source set used in SCAD mode on the Google tab.
pub const GOOGLE_SOURCES: &[&str] = &["GoogleMyBusiness"];

/// Review platforms fanned out by the review metrics.
pub const REVIEW_SOURCES: &[&str] = &["GoogleMyBusiness", "GoogleMaps", "Tripadvisor", "Booking"];

/// Channel order of the channel-source series. Blog and news counts are
/// folded into `Web` rather than listed.
pub const CHANNEL_SOURCES: &[&str] = &[
    "Twitter",
    "Facebook",
    "Instagram",
    "Youtube",
    "Pinterest",
    "Reddit",
    "LinkedIn",
    "Tumblr",
    "Vimeo",
    "Web",
    "GoogleMyBusiness",
    "Tripadvisor",
];

pub const BLOG_ALIASES: &[&str] = &["Blog", "Blogs", "FakeBlogs"];
pub const NEWS_ALIASES: &[&str] = &["News", "FakeNews", "Online News", "Print"];
pub const WEB_ALIASES: &[&str] = &["Web", "Forums", "Forum", "Website"];

pub const SOURCE_DIRECT_MESSAGE: &str = "DM";
pub const MANUAL_ENTRY_REVIEW: &str = "review";

/// Sources whose message text carries the review delimiter
pub const DELIMITED_REVIEW_SOURCES: &[&str] = &["GoogleMaps", "Tripadvisor"];

pub const GOOGLE_MY_BUSINESS: &str = "GoogleMyBusiness";

/// Map a raw source name to the icon shown on a card.
pub fn source_icon(source: &str) -> String {
    if BLOG_ALIASES.contains(&source) {
        "Blog".to_string()
    } else if source == "Reddit" {
        "Reddit".to_string()
    } else if NEWS_ALIASES.contains(&source) {
        "News".to_string()
    } else if source == "Tumblr" {
        "Tumblr".to_string()
    } else if source == "Vimeo" {
        "Vimeo".to_string()
    } else if WEB_ALIASES.contains(&source) {
        "Web".to_string()
    } else {
        source.to_string()
    }
}

pub fn is_youtube(source: &str) -> bool {
    source.eq_ignore_ascii_case("youtube")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_icon_aliases() {
        assert_eq!(source_icon("Blogs"), "Blog");
        assert_eq!(source_icon("Online News"), "News");
        assert_eq!(source_icon("Forums"), "Web");
        assert_eq!(source_icon("Reddit"), "Reddit");
        assert_eq!(source_icon("Twitter"), "Twitter");
    }

    #[test]
    fn test_channel_order_has_no_folded_aliases() {
        for alias in BLOG_ALIASES.iter().chain(NEWS_ALIASES) {
            assert!(!CHANNEL_SOURCES.contains(alias));
        }
    }
}
