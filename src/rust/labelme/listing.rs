use scraper::{Html, Selector};

use super::ScraperError;

const VALID_IMAGE_EXT: [&str; 3] = [".jpg", ".jpeg", ".png"];

// Movie and sequential-frame directories are near-duplicate frames.
const EXCLUDED_DIR_PATTERNS: [&str; 2] = ["mvi", "seq"];

/// True if the href names a JPEG or PNG file.
pub fn is_valid_image(href: &str) -> bool {
    let href = href.to_ascii_lowercase();
    VALID_IMAGE_EXT.iter().any(|ext| href.ends_with(ext))
}

/// False for movie or sequential-frame directories.
pub fn is_valid_dir(href: &str) -> bool {
    let href = href.to_ascii_lowercase();
    EXCLUDED_DIR_PATTERNS.iter().all(|pattern| !href.contains(pattern))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Image,
    Directory,
    Other,
}

/// Classifies a listing href. Parent links, absolute paths and sort links are `Other`.
pub fn classify(href: &str) -> EntryKind {
    if is_valid_image(href) {
        EntryKind::Image
    } else if href.ends_with('/')
        && !href.starts_with('/')
        && !href.starts_with("..")
        && !href.contains("://")
        && is_valid_dir(href)
    {
        EntryKind::Directory
    } else {
        EntryKind::Other
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub href: String,
    pub text: String,
}

impl ListingEntry {
    pub fn kind(&self) -> EntryKind {
        classify(&self.href)
    }
}

/// The anchors of one directory listing page, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    entries: Vec<ListingEntry>,
}

impl Listing {
    pub fn parse(html: &str) -> Result<Self, ScraperError> {
        let document = Html::parse_document(html);
        let selector = Selector::parse("a[href]").map_err(|e| ScraperError::Parse(e.to_string()))?;

        let entries = document
            .select(&selector)
            .filter_map(|element| {
                let href = element.value().attr("href")?;
                Some(ListingEntry {
                    href: href.to_string(),
                    text: element.text().collect::<String>(),
                })
            })
            .collect();
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ListingEntry] {
        &self.entries
    }

    /// Hrefs of every valid image in the listing
    pub fn image_files(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|e| e.href.as_str())
            .filter(|href| is_valid_image(href))
            .collect()
    }

    /// Hrefs of directory anchors whose text contains `term`, minus excluded directories
    pub fn matching_links(&self, term: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.text.contains(term) && e.kind() == EntryKind::Directory)
            .map(|e| e.href.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"<html><body><h1>Index of /Images</h1><pre>
<a href="?C=N;O=D">Name</a>
<a href="/brussell/research/LabelMe/">Parent Directory</a>
<a href="05june05_static_street_boston/">05june05_static_street_boston/</a>
<a href="static_street_sf/">static_street_sf/</a>
<a href="mvi_street_movie/">mvi_street_movie/</a>
<a href="street_seq_01/">street_seq_01/</a>
<a href="p1010843.jpg">p1010843.jpg</a>
<a href="notes.txt">notes.txt</a>
</pre></body></html>"#;

    #[test]
    fn test_image_extensions() {
        assert!(is_valid_image("p1010843.jpg"));
        assert!(is_valid_image("scan.JPEG"));
        assert!(is_valid_image("mask.png"));
        assert!(!is_valid_image("notes.txt"));
        assert!(!is_valid_image("archive.jpg.zip"));
    }

    #[test]
    fn test_excluded_dirs() {
        assert!(is_valid_dir("static_street_sf/"));
        assert!(!is_valid_dir("mvi_street_movie/"));
        assert!(!is_valid_dir("street_seq_01/"));
        assert!(!is_valid_dir("MVI_0042.jpg"));
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("p1010843.jpg"), EntryKind::Image);
        assert_eq!(classify("static_street_sf/"), EntryKind::Directory);
        assert_eq!(classify("street_seq_01/"), EntryKind::Other);
        assert_eq!(classify("/brussell/research/LabelMe/"), EntryKind::Other);
        assert_eq!(classify("?C=N;O=D"), EntryKind::Other);
    }

    #[test]
    fn test_parse_listing() {
        let listing = Listing::parse(LISTING).unwrap();
        assert_eq!(listing.entries().len(), 8);
        assert_eq!(listing.image_files(), vec!["p1010843.jpg"]);
    }

    #[test]
    fn test_matching_links_excludes_movies() {
        let listing = Listing::parse(LISTING).unwrap();
        assert_eq!(
            listing.matching_links("street"),
            vec!["05june05_static_street_boston/", "static_street_sf/"]
        );
        assert!(listing.matching_links("kitchen").is_empty());
    }

    #[test]
    fn test_matching_links_skips_navigation_anchors() {
        let listing = Listing::parse(LISTING).unwrap();
        assert!(listing.matching_links("Parent").is_empty());
        assert!(listing.matching_links("Name").is_empty());
        assert!(listing.matching_links("p1010843").is_empty());
    }
}
