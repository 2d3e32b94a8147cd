//! Object filtering/reordering for the sampling stage.

use dspm_connectors::ObjectSummary;

pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 100 * 1024 * 1024;
pub const DEFAULT_SAMPLE_SIZE_BYTES: u64 = 1024 * 1024;
pub const DEFAULT_FILES_PER_BUCKET: usize = 1000;

const NON_TEXT_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "webp", "ico", "svg", "tiff",
    "zip", "tar", "gz", "bz2", "7z", "rar",
    "exe", "dll", "so", "bin", "iso",
    "doc", "docx", "ppt", "pptx", "pdf",
    "mp3", "mp4", "avi", "mov", "wav", "flac",
    "ttf", "otf", "woff", "woff2",
];

const HIGH_PRIORITY_EXTENSIONS: &[&str] = &[
    "csv", "json", "xlsx", "xls", "parquet", "sql", "log", "txt", "tsv", "xml", "yaml", "yml",
];

fn extension_of(key: &str) -> Option<String> {
    key.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
}

fn is_non_text(key: &str) -> bool {
    extension_of(key)
        .map(|ext| NON_TEXT_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn is_high_priority(key: &str) -> bool {
    extension_of(key)
        .map(|ext| HIGH_PRIORITY_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Filters out oversized/empty/binary-looking objects, then reorders so
/// high-priority (structured/text) extensions are sampled first, truncating
/// to `files_per_bucket` after reordering.
pub fn select_scannable_objects(
    objects: Vec<ObjectSummary>,
    max_file_size_bytes: u64,
    files_per_bucket: usize,
) -> Vec<ObjectSummary> {
    let scannable: Vec<ObjectSummary> = objects
        .into_iter()
        .filter(|o| o.size > 0 && o.size <= max_file_size_bytes)
        .filter(|o| !is_non_text(&o.key))
        .collect();

    let (mut high_priority, rest): (Vec<_>, Vec<_>) =
        scannable.into_iter().partition(|o| is_high_priority(&o.key));
    high_priority.extend(rest);

    high_priority.truncate(files_per_bucket);
    high_priority
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(key: &str, size: u64) -> ObjectSummary {
        ObjectSummary {
            key: key.to_string(),
            size,
        }
    }

    #[test]
    fn drops_zero_size_and_oversized_objects() {
        let objects = vec![obj("a.txt", 0), obj("b.txt", 100), obj("c.txt", 1_000_000_000)];
        let selected = select_scannable_objects(objects, DEFAULT_MAX_FILE_SIZE_BYTES, DEFAULT_FILES_PER_BUCKET);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].key, "b.txt");
    }

    #[test]
    fn drops_known_binary_extensions() {
        let objects = vec![obj("photo.png", 100), obj("archive.zip", 100), obj("notes.txt", 100)];
        let selected = select_scannable_objects(objects, DEFAULT_MAX_FILE_SIZE_BYTES, DEFAULT_FILES_PER_BUCKET);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].key, "notes.txt");
    }

    #[test]
    fn reorders_high_priority_extensions_first() {
        let objects = vec![obj("readme.md", 100), obj("data.csv", 100), obj("notes.txt", 100)];
        let selected = select_scannable_objects(objects, DEFAULT_MAX_FILE_SIZE_BYTES, DEFAULT_FILES_PER_BUCKET);
        assert_eq!(selected[0].key, "data.csv");
        assert_eq!(selected[1].key, "notes.txt");
        assert_eq!(selected[2].key, "readme.md");
    }

    #[test]
    fn truncates_after_reordering() {
        let objects: Vec<_> = (0..5).map(|i| obj(&format!("f{i}.txt"), 100)).collect();
        let selected = select_scannable_objects(objects, DEFAULT_MAX_FILE_SIZE_BYTES, 3);
        assert_eq!(selected.len(), 3);
    }
}
