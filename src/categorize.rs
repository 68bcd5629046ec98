//! Extension-based file categorization.

use std::path::Path;

/// Category used when no extension matches
pub const DEFAULT_CATEGORY: &str = "other";

/// Description of [`DEFAULT_CATEGORY`]
pub const DEFAULT_CATEGORY_DESCRIPTION: &str = "Other files";

/// One row of the extension table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    /// Directory name under the download dir
    pub name: &'static str,
    /// Human-readable label
    pub description: &'static str,
    /// Lowercase extensions without the dot
    pub extensions: &'static [&'static str],
}

/// Every category except the fallback, in match order
pub const CATEGORIES: &[Category] = &[
    Category {
        name: "video",
        description: "Video files",
        extensions: &["mp4", "avi", "mkv", "mov", "wmv"],
    },
    Category {
        name: "audio",
        description: "Audio files",
        extensions: &["mp3", "wav", "flac", "aac", "ogg"],
    },
    Category {
        name: "image",
        description: "Image files",
        extensions: &["jpg", "jpeg", "png", "gif", "bmp"],
    },
    Category {
        name: "document",
        description: "Documents",
        extensions: &["pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt"],
    },
    Category {
        name: "archive",
        description: "Archives",
        extensions: &["zip", "rar", "7z", "tar", "gz"],
    },
    Category {
        name: "executable",
        description: "Executables and installers",
        extensions: &["exe", "msi", "dmg", "pkg", "deb"],
    },
];

/// Category for a file name, matched case-insensitively on its extension
pub fn category_for(filename: &str) -> &'static str {
    let Some(ext) = Path::new(filename).extension().and_then(|e| e.to_str()) else {
        return DEFAULT_CATEGORY;
    };
    let ext = ext.to_ascii_lowercase();
    CATEGORIES
        .iter()
        .find(|c| c.extensions.contains(&ext.as_str()))
        .map(|c| c.name)
        .unwrap_or(DEFAULT_CATEGORY)
}
