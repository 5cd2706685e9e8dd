//! Unit tests for the error enums: Display text and error conversions.

use rstest::rstest;
use urlnav::types::errors::{BackupError, CodecError, PickError, SettingsError, TreeError};

#[rstest]
#[case(TreeError::NotFound("Work/Mail".into()), "Item not found: Work/Mail")]
#[case(
    TreeError::NameConflict("Work".into()),
    "An item with this name already exists: Work"
)]
#[case(TreeError::CycleError("A".into()), "Cannot move a folder into itself: A")]
#[case(
    TreeError::DepthLimit("a/b".into()),
    "Folders cannot be nested more than 48 levels deep: a/b"
)]
#[case(TreeError::InvalidUrl("the URL is empty".into()), "Invalid URL: the URL is empty")]
fn test_tree_error_display(#[case] err: TreeError, #[case] expected: &str) {
    assert_eq!(err.to_string(), expected);
}

#[rstest]
#[case(CodecError::DecodeError("bad".into()), "Invalid bookmark data: bad")]
#[case(CodecError::UnsupportedFile("empty".into()), "Unsupported bookmark file: empty")]
#[case(CodecError::IoError("denied".into()), "File error: denied")]
#[case(CodecError::Cancelled, "Operation cancelled")]
fn test_codec_error_display(#[case] err: CodecError, #[case] expected: &str) {
    assert_eq!(err.to_string(), expected);
}

#[test]
fn test_settings_and_backup_error_display() {
    assert_eq!(
        SettingsError::InvalidKey("x.y".into()).to_string(),
        "Invalid settings key: x.y"
    );
    assert_eq!(
        BackupError::IoError("full".into()).to_string(),
        "Backup I/O error: full"
    );
}

#[rstest]
#[case(PickError::NoSuchEntry(4), "No history entry at index 4")]
#[case(PickError::IoError("denied".into()), "Pick history I/O error: denied")]
#[case(PickError::from(TreeError::NotFound("Gone".into())), "Item not found: Gone")]
fn test_pick_error_display(#[case] err: PickError, #[case] expected: &str) {
    assert_eq!(err.to_string(), expected);
}

#[test]
fn test_tree_error_converts_to_codec_error() {
    assert_eq!(
        CodecError::from(TreeError::NotFound("Toolbox/Gone".into())),
        CodecError::IoError("Folder not found: Toolbox/Gone".into())
    );
    let err: CodecError = TreeError::NameConflict("X".into()).into();
    assert!(matches!(err, CodecError::IoError(msg) if msg.contains("X")));
}

#[test]
fn test_errors_are_std_errors() {
    fn as_std(err: &dyn std::error::Error) -> String {
        err.to_string()
    }
    assert_eq!(as_std(&CodecError::Cancelled), "Operation cancelled");
    assert!(as_std(&TreeError::NotFound("/".into())).contains("/"));
}
