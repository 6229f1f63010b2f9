//! Resolution corpus tests
//!
//! Resolves the iPXE override fixtures (a global `common.h` and a
//! device-specific `general.hua.h`) against the fixture catalog, plus
//! conflict scenarios layered on top of them.

use flagstack::resolver::{
    resolve, validate, ConstraintKind, FlagError, FlagState, DEFAULT_SOURCE,
};
use flagstack::{LayerEntry, OutputFormat, Stack, StackError};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture(path: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/ipxe")
        .join(path)
}

fn ipxe_stack() -> Stack {
    Stack::load(&fixture("stack.toml")).unwrap()
}

fn entry(id: &str, priority: i64, path: PathBuf) -> LayerEntry {
    LayerEntry {
        id: id.to_string(),
        priority,
        path,
    }
}

/// Fixture layers plus one extra layer written to a temp dir.
fn stack_with_extra(dir: &TempDir, priority: i64, contents: &str) -> Result<Stack, StackError> {
    let extra = dir.path().join("extra.h");
    fs::write(&extra, contents).unwrap();
    Stack::from_parts(
        &fixture("catalog.toml"),
        &[
            entry("common", 0, fixture("layers/common.h")),
            entry("hua", 10, fixture("layers/general.hua.h")),
            entry("extra", priority, extra),
        ],
    )
}

// =============================================================================
// Category 1: Resolution of the fixture stack
// =============================================================================

#[test]
fn test_layers_loaded_in_priority_order() {
    let stack = ipxe_stack();
    let ids: Vec<&str> = stack.layers().layers().iter().map(|l| l.identifier()).collect();
    assert_eq!(ids, vec!["common", "hua"]);

    let sources: Vec<&str> = stack.sources().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(sources, vec!["common", "hua"]);
    assert_eq!(stack.sources()[0].assertions, 33);
    assert_eq!(stack.sources()[1].assertions, 12);
}

#[test]
fn test_resolution_is_total() {
    let stack = ipxe_stack();
    let resolution = stack.resolve().unwrap();

    assert_eq!(resolution.configuration.len(), stack.registry().len());
    for name in stack.registry().names() {
        assert!(resolution.configuration.get(name).is_some(), "missing {}", name);
    }
}

#[test]
fn test_device_layer_overrides_common() {
    let resolution = ipxe_stack().resolve().unwrap();
    let config = &resolution.configuration;

    let stp = config.get("NET_PROTO_STP").unwrap();
    assert_eq!(stp.final_state, FlagState::Disabled);
    assert_eq!(stp.source, "hua");
    assert_eq!(stp.overridden, vec!["common".to_string()]);

    let digest = config.get("DIGEST_CMD").unwrap();
    assert_eq!(digest.final_state, FlagState::Enabled);
    assert_eq!(digest.source, "hua");
}

#[test]
fn test_common_only_flags_keep_common_provenance() {
    let resolution = ipxe_stack().resolve().unwrap();
    let config = &resolution.configuration;

    let ping = config.get("PING_CMD").unwrap();
    assert_eq!(ping.final_state, FlagState::Enabled);
    assert_eq!(ping.source, "common");
    assert!(ping.overridden.is_empty());

    assert_eq!(config.get("USB_HCD_XHCI").unwrap().final_state, FlagState::Disabled);
    assert_eq!(config.get("IMAGE_COMBOOT").unwrap().source, "hua");
}

#[test]
fn test_unasserted_flags_fall_back_to_default() {
    let resolution = ipxe_stack().resolve().unwrap();
    let config = &resolution.configuration;

    let defaulted: Vec<&str> = config
        .entries()
        .iter()
        .filter(|e| e.source == DEFAULT_SOURCE)
        .map(|e| e.flag_name.as_str())
        .collect();
    assert_eq!(defaulted, vec!["DOWNLOAD_PROTO_HTTP", "DOWNLOAD_PROTO_TFTP"]);
    assert_eq!(config.state_of("DOWNLOAD_PROTO_TFTP"), Some(FlagState::Enabled));
}

#[test]
fn test_valued_setting_resolved() {
    let resolution = ipxe_stack().resolve().unwrap();
    let settings = resolution.configuration.settings();
    assert_eq!(settings.len(), 1);
    assert_eq!(settings[0].name, "MAX_MODULES");
    assert_eq!(settings[0].value, "16");
    assert_eq!(settings[0].source, "hua");
}

#[test]
fn test_fixture_stack_is_valid() {
    let resolution = ipxe_stack().resolve().unwrap();
    assert!(resolution.is_valid(), "violations: {:?}", resolution.violations);
}

#[test]
fn test_resolution_is_deterministic() {
    let first = ipxe_stack().resolve().unwrap();
    let second = ipxe_stack().resolve().unwrap();
    assert_eq!(first.configuration, second.configuration);

    let stack = ipxe_stack();
    let a = stack.report(&first).unwrap();
    let b = stack.report(&second).unwrap();
    assert_eq!(a.fingerprint, b.fingerprint);
}

#[test]
fn test_priority_not_manifest_order_decides() {
    // Same files with priorities swapped: `common` now wins.
    let stack = Stack::from_parts(
        &fixture("catalog.toml"),
        &[
            entry("hua", 0, fixture("layers/general.hua.h")),
            entry("common", 10, fixture("layers/common.h")),
        ],
    )
    .unwrap();
    let resolution = stack.resolve().unwrap();
    let stp = resolution.configuration.get("NET_PROTO_STP").unwrap();
    assert_eq!(stp.source, "common");
    assert_eq!(stp.overridden, vec!["hua".to_string()]);
}

// =============================================================================
// Category 2: Emission
// =============================================================================

#[test]
fn test_header_emission_covers_every_flag_in_order() {
    let stack = ipxe_stack();
    let header = stack.emit(OutputFormat::Header, false).unwrap();
    let lines: Vec<&str> = header.lines().filter(|l| !l.is_empty()).collect();

    // 36 flags plus MAX_MODULES
    assert_eq!(lines.len(), stack.registry().len() + 1);
    assert_eq!(lines[0], "#define DOWNLOAD_PROTO_HTTP");
    assert_eq!(lines[1], "#define DOWNLOAD_PROTO_HTTPS");
    assert!(lines.contains(&"#undef  SANBOOT_PROTO_ISCSI"));
    assert_eq!(*lines.last().unwrap(), "#define MAX_MODULES 16");
}

#[test]
fn test_json_emission() {
    let json = ipxe_stack().emit(OutputFormat::Json, false).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["flags"].as_array().unwrap().len(), 36);
    assert_eq!(value["flags"][0]["source"], DEFAULT_SOURCE);
}

// =============================================================================
// Category 3: Constraint violations
// =============================================================================

#[test]
fn test_single_exclusion_violation() {
    let dir = TempDir::new().unwrap();
    let stack = stack_with_extra(
        &dir,
        20,
        "#define SANBOOT_PROTO_ISCSI\n#define SANBOOT_PROTO_AOE\n",
    )
    .unwrap();

    let resolution = stack.resolve().unwrap();
    assert_eq!(resolution.violations.len(), 1);
    let violation = &resolution.violations[0];
    assert_eq!(violation.kind, ConstraintKind::Excludes);
    assert_eq!(violation.flag, "SANBOOT_PROTO_ISCSI");
    assert_eq!(violation.other_flag, "SANBOOT_PROTO_AOE");
    assert_eq!(violation.flag_source, "extra");
}

#[test]
fn test_all_violations_reported_together() {
    let dir = TempDir::new().unwrap();
    let stack = stack_with_extra(
        &dir,
        20,
        "ENABLE SANBOOT_PROTO_ISCSI\nENABLE SANBOOT_PROTO_AOE\nDISABLE DOWNLOAD_PROTO_HTTP\n",
    )
    .unwrap();

    let resolution = stack.resolve().unwrap();
    let codes: Vec<String> = resolution.violations.iter().map(|v| v.to_code()).collect();
    assert_eq!(
        codes,
        vec![
            "REQUIRES:DOWNLOAD_PROTO_HTTPS,DOWNLOAD_PROTO_HTTP",
            "REQUIRES:SANBOOT_PROTO_HTTP,DOWNLOAD_PROTO_HTTP",
            "EXCLUDES:SANBOOT_PROTO_ISCSI,SANBOOT_PROTO_AOE",
        ]
    );

    // DOWNLOAD_PROTO_HTTPS came from the device layer, SANBOOT_PROTO_HTTP from common.
    assert_eq!(resolution.violations[0].flag_source, "hua");
    assert_eq!(resolution.violations[1].flag_source, "common");
    assert_eq!(resolution.violations[1].other_source, "extra");

    let err = stack.emit(OutputFormat::Header, false).unwrap_err();
    assert!(matches!(
        err,
        StackError::Flag(FlagError::ConstraintViolation(ref v)) if v.len() == 3
    ));
}

#[test]
fn test_revalidation_is_idempotent() {
    let stack = ipxe_stack();
    let resolution = stack.resolve().unwrap();
    assert!(validate(&resolution.configuration, stack.registry()).is_empty());
    assert!(validate(&resolution.configuration, stack.registry()).is_empty());

    let again = resolve(stack.registry(), stack.layers()).unwrap();
    assert_eq!(again, resolution.configuration);
}

// =============================================================================
// Category 4: Structural errors
// =============================================================================

#[test]
fn test_unknown_flag_in_layer() {
    let dir = TempDir::new().unwrap();
    let stack = stack_with_extra(&dir, 20, "#define NET_PROTO_FCOE\n").unwrap();

    let err = stack.resolve().unwrap_err();
    match err {
        StackError::Flag(FlagError::UnknownFlag { name, layer }) => {
            assert_eq!(name, "NET_PROTO_FCOE");
            assert_eq!(layer.as_deref(), Some("extra"));
        }
        other => panic!("expected unknown flag, got {}", other),
    }
}

#[test]
fn test_duplicate_priority() {
    let dir = TempDir::new().unwrap();
    let err = stack_with_extra(&dir, 10, "ENABLE PING_CMD\n").unwrap_err();
    assert!(matches!(
        err,
        StackError::Flag(FlagError::DuplicatePriority { priority: 10, .. })
    ));
}

#[test]
fn test_conflicting_assertion_within_layer() {
    let dir = TempDir::new().unwrap();
    let err = stack_with_extra(&dir, 20, "ENABLE PING_CMD\n#undef PING_CMD\n").unwrap_err();
    assert!(matches!(
        err,
        StackError::Flag(FlagError::DuplicateAssertionInLayer { ref layer, ref flag })
            if layer == "extra" && flag == "PING_CMD"
    ));
}

#[test]
fn test_repeated_identical_assertion_is_accepted() {
    let dir = TempDir::new().unwrap();
    let stack = stack_with_extra(&dir, 20, "ENABLE PING_CMD\n#define PING_CMD\n").unwrap();
    assert_eq!(stack.layers().get("extra").unwrap().assertions().len(), 1);
}
