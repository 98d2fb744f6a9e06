use super::*;

#[test]
fn default_thumbnail_sizes_use_standard_dimensions() {
    let sizes = ThumbnailSizes::default();
    assert_eq!((sizes.small.width, sizes.small.height), (200, 200));
    assert_eq!((sizes.medium.width, sizes.medium.height), (740, 740));
    assert_eq!((sizes.large.width, sizes.large.height), (1024, 1024));
}

#[test]
fn dotfiles_ignored_by_default() {
    let cfg = GalleryConfig::default();
    assert!(cfg.is_ignored_name(".ds_store"));
    assert!(!cfg.is_ignored_name("photo.jpg"));
}

#[test]
fn explicit_ignore_list_is_case_normalized_by_caller() {
    let mut cfg = GalleryConfig::default();
    cfg.files_to_ignore.insert("thumbs.db".into());
    assert!(cfg.is_ignored_name("thumbs.db"));
    assert!(!cfg.is_ignored_name("thumbs.DB"));
}
