// tests/config_loading.rs

use std::error::Error;
use std::io::Write;
use std::path::Path;

use serde_json::json;
use tempfile::NamedTempFile;

use cachify::config::{load_and_validate, ConfigFile};
use cachify::errors::CachifyError;
use cachify_test_utils::builders::ConfigFileBuilder;
use cachify_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn full_config_loads_every_section() -> TestResult {
    init_tracing();

    let file = write_config(
        r#"
[transform]
file_pattern = "\\.es6$"
exclude = ["vendor/**"]
basedir = "src"
jobs = 3

[compiler]
cmd = "es6c --stdin"
runtime = "support/runtime.js"
source_root = "src"

[compiler.overrides]
source_maps = false
blockBinding = true
"#,
    );

    let cfg = load_and_validate(file.path())?;

    assert_eq!(cfg.compiler_cmd.as_deref(), Some("es6c --stdin"));
    assert_eq!(cfg.transform.jobs, 3);
    assert!(cfg.transform.include_runtime);
    assert_eq!(cfg.transform.compiler_overrides.get("blockBinding"), Some(&json!(true)));
    assert!(!cfg.transform.compiler_options().source_maps());

    let bound = cfg.transform.bind(Path::new("/proj"));
    assert_eq!(bound.basedir.as_deref(), Some(Path::new("/proj/src")));
    assert_eq!(bound.runtime.as_deref(), Some(Path::new("/proj/src/support/runtime.js")));
    assert!(bound.filter().matches(Path::new("/proj/src/a.es6")));
    assert!(!bound.filter().matches(Path::new("/proj/src/a.js")));
    assert!(!bound.filter().matches(Path::new("/proj/src/vendor/x.es6")));
    Ok(())
}

#[test]
fn invalid_regex_is_a_config_error() {
    let file = write_config(
        r#"
[transform]
file_pattern = "(unclosed"
include_runtime = false
"#,
    );

    match load_and_validate(file.path()) {
        Err(CachifyError::ConfigError(msg)) => assert!(msg.contains("file_pattern")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn zero_jobs_is_rejected() {
    let file = write_config(
        r#"
[transform]
include_runtime = false
jobs = 0
"#,
    );

    match load_and_validate(file.path()) {
        Err(CachifyError::ConfigError(msg)) => assert!(msg.contains("jobs")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let file = write_config("[transform\nfile_pattern = ");

    assert!(matches!(
        load_and_validate(file.path()),
        Err(CachifyError::TomlError(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let res = load_and_validate("/definitely/not/here/Cachify.toml");
    assert!(res.is_err());
}

#[test]
fn builder_config_matches_loaded_defaults() {
    let built: ConfigFile = ConfigFileBuilder::new()
        .without_runtime()
        .compiler_cmd("cat")
        .build();

    assert_eq!(built.compiler_cmd.as_deref(), Some("cat"));
    assert!(!built.transform.include_runtime);
    assert!(built.transform.jobs >= 1);
    assert!(built.transform.filter().matches(Path::new("a.js")));
    assert!(!built.transform.filter().matches(Path::new("a.ts")));
}
