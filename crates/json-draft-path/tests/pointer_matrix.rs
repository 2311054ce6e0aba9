use json_draft_path::{format_json_pointer, join, parse_json_pointer, validate_json_pointer, Path};
use serde_json::json;

#[test]
fn pointer_parse_format_roundtrip_matrix() {
    let cases = ["", "/", "/foo", "/foo/bar", "/a~0b/c~1d", "/arr/0", "/~0/~1"];

    for pointer in cases {
        let path = parse_json_pointer(pointer);
        assert_eq!(format_json_pointer(&path), pointer);
    }
}

#[test]
fn native_paths_format_indices_bare() {
    let path: Path = serde_json::from_value(json!(["todos", 3, "tags", 0])).unwrap();
    assert_eq!(format_json_pointer(&path), "/todos/3/tags/0");
}

#[test]
fn parsed_steps_address_arrays_by_digits() {
    let path = parse_json_pointer("/arr/10/-");
    assert_eq!(path[1].as_index(), Some(10));
    assert!(path[2].is_array_end());
    assert_eq!(path[0].as_index(), None);
}

#[test]
fn pointer_validation_ignores_length() {
    assert!(validate_json_pointer("/foo/bar").is_ok());
    assert!(validate_json_pointer("foo/bar").is_err());

    let deep = (0..400).fold(Path::new(), |path, _| join(&path, "node"));
    let pointer = format_json_pointer(&deep);
    assert!(pointer.len() > 1024);
    assert!(validate_json_pointer(&pointer).is_ok());
    assert_eq!(parse_json_pointer(&pointer), deep);
}
