use addon_manifest::core::privilege::{PrivilegeScanner, LOADER_FILENAME};
use std::path::Path;

#[test]
fn privilege_scanner_reports_aliases_and_lines() {
    let source = r#"var a = 1;
var svc = Components.classes["@mozilla.org/foo;1"].getService(Components.interfaces.nsIFoo);
// Components.utils.import("commented");
Components.utils.import("resource://gre/modules/Services.jsm");
"#;
    let report = PrivilegeScanner::new()
        .scan(Path::new("/pkg/lib/main.js"), source)
        .expect("violation expected");

    let aliases: Vec<&str> = report.aliases.iter().map(String::as_str).collect();
    assert_eq!(aliases, vec!["Cc", "Ci", "Cu"]);
    let lines: Vec<usize> = report.lines.iter().map(|(line, _)| *line).collect();
    assert_eq!(lines, vec![2, 4]);

    let message = report.to_string();
    assert!(message.contains("/pkg/lib/main.js"));
    assert!(message.contains(r#"const {Cc,Ci,Cu} = require("chrome");"#));
    assert!(message.contains("  4: Components.utils.import"));
}

#[test]
fn privilege_scanner_catches_other_namespace_access() {
    let source = "var id = Components.ID('{abc}');\n";
    let report = PrivilegeScanner::new()
        .scan(Path::new("/pkg/lib/ids.js"), source)
        .expect("violation expected");

    let aliases: Vec<&str> = report.aliases.iter().map(String::as_str).collect();
    assert_eq!(aliases, vec!["components"]);
}

#[test]
fn privilege_scanner_accepts_clean_and_loader_modules() {
    let scanner = PrivilegeScanner::new();
    let clean = r#"const { Cc, Ci } = require("chrome");
var x = Cc["@mozilla.org/foo;1"];
"#;
    assert!(scanner.scan(Path::new("/pkg/lib/clean.js"), clean).is_none());

    let loader = Path::new("/sdk/lib").join(LOADER_FILENAME);
    let privileged = "Components.utils.import('resource://x');\n";
    assert!(scanner.is_exempt(&loader));
    assert!(scanner.scan(&loader, privileged).is_none());
}
