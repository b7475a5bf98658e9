//! End-to-end migrations against in-memory file trees.

use unhammer::coordinator::GlobalUsageState;
use unhammer::engine::{discover_targets, migrate_target, Severity, TargetReport};
use unhammer_core::tree::FileTree;

const MAIN_TS: &str = "import 'hammerjs';\n\
import {platformBrowserDynamic} from '@angular/platform-browser-dynamic';\n\
import {AppModule} from './app/app.module';\n\
\n\
platformBrowserDynamic().bootstrapModule(AppModule);\n";

const APP_MODULE_WITH_LIBRARY_SETUP: &str = "import {NgModule} from '@angular/core';\n\
import {BrowserModule} from '@angular/platform-browser';\n\
import {GestureConfig} from '@angular/material/core';\n\
import {HAMMER_GESTURE_CONFIG} from '@angular/platform-browser';\n\
\n\
@NgModule({\n\
  declarations: [],\n\
  imports: [BrowserModule],\n\
  providers: [{provide: HAMMER_GESTURE_CONFIG, useClass: GestureConfig}],\n\
})\n\
export class AppModule {}\n";

const APP_MODULE_PLAIN: &str = "import {NgModule} from '@angular/core';\n\
import {BrowserModule} from '@angular/platform-browser';\n\
\n\
@NgModule({\n\
  declarations: [],\n\
  imports: [BrowserModule],\n\
})\n\
export class AppModule {}\n";

const INDEX_HTML: &str = "<html>\n\
<head>\n\
  <script src=\"node_modules/hammerjs/hammer.min.js\"></script>\n\
</head>\n\
<body></body>\n\
</html>\n";

const PACKAGE_JSON: &str = "{\n\
  \"name\": \"demo\",\n\
  \"dependencies\": {\n\
    \"@angular/core\": \"^9.0.0\",\n\
    \"hammerjs\": \"^2.0.8\"\n\
  }\n\
}\n";

fn tree_of(files: &[(&str, &str)]) -> FileTree {
    let mut tree = FileTree::new();
    for (path, content) in files {
        tree.insert(path, *content);
    }
    tree
}

fn run_single_target(tree: &mut FileTree, global: &mut GlobalUsageState) -> TargetReport {
    let targets = discover_targets(tree);
    assert_eq!(targets.len(), 1, "expected exactly one target");
    migrate_target(tree, global, &targets[0]).unwrap()
}

#[test]
fn discovery_finds_entry_file_and_index() {
    let tree = tree_of(&[
        ("src/main.ts", MAIN_TS),
        ("src/index.html", INDEX_HTML),
        ("src/app/app.module.ts", APP_MODULE_PLAIN),
    ]);
    let targets = discover_targets(&tree);
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].name, "src");
    assert_eq!(targets[0].entry_file, "src/main.ts");
    assert_eq!(targets[0].source_root, "src");
    assert_eq!(targets[0].index_files, vec!["src/index.html".to_string()]);
}

#[test]
fn unused_library_is_fully_removed() {
    let mut tree = tree_of(&[
        ("src/main.ts", MAIN_TS),
        ("src/index.html", INDEX_HTML),
        ("src/app/app.module.ts", APP_MODULE_WITH_LIBRARY_SETUP),
        ("package.json", PACKAGE_JSON),
    ]);
    let mut global = GlobalUsageState::new();
    let report = run_single_target(&mut tree, &mut global);
    assert_eq!(report.strategy, "remove-unused");

    let main = tree.read("src/main.ts").unwrap();
    assert!(!main.contains("hammerjs"));
    assert!(main.contains("platformBrowserDynamic"));

    let module = tree.read("src/app/app.module.ts").unwrap();
    assert!(!module.contains("GestureConfig"));
    assert!(!module.contains("HAMMER_GESTURE_CONFIG"));
    assert!(module.contains("providers: [],"));
    assert!(module.contains("imports: [BrowserModule],"));

    let index = tree.read("src/index.html").unwrap();
    assert!(!index.contains("hammer"));
    assert!(index.contains("<head>"));

    assert!(global.finalize(&mut tree).unwrap());
    assert!(!tree.read("package.json").unwrap().contains("hammerjs"));
}

#[test]
fn standard_events_register_the_hammer_module() {
    let mut tree = tree_of(&[
        ("src/main.ts", MAIN_TS),
        ("src/app/app.module.ts", APP_MODULE_WITH_LIBRARY_SETUP),
        ("src/app/app.component.html", "<div (tap)=\"onTap()\"></div>\n"),
        ("package.json", PACKAGE_JSON),
    ]);
    let mut global = GlobalUsageState::new();
    let report = run_single_target(&mut tree, &mut global);
    assert_eq!(report.strategy, "register-hammer-module");

    let module = tree.read("src/app/app.module.ts").unwrap();
    assert!(!module.contains("GestureConfig"));
    assert!(!module.contains("HAMMER_GESTURE_CONFIG"));
    assert!(module.contains("imports: [BrowserModule, HammerModule],"));
    assert!(module.contains("import {BrowserModule, HammerModule} from '@angular/platform-browser';"));

    // The runtime library stays installed and listed.
    assert!(tree.read("src/main.ts").unwrap().contains("import 'hammerjs';"));
    assert!(!global.finalize(&mut tree).unwrap());
    assert!(tree.read("package.json").unwrap().contains("hammerjs"));
}

#[test]
fn custom_events_copy_the_gesture_config() {
    let mut tree = tree_of(&[
        ("src/main.ts", MAIN_TS),
        ("src/app/app.module.ts", APP_MODULE_WITH_LIBRARY_SETUP),
        ("src/app/app.component.html", "<div (slide)=\"onSlide()\"></div>\n"),
        ("package.json", PACKAGE_JSON),
    ]);
    let mut global = GlobalUsageState::new();
    let report = run_single_target(&mut tree, &mut global);
    assert_eq!(report.strategy, "copy-gesture-config");

    assert!(tree.exists("src/gesture-config.ts"));
    let config = tree.read("src/gesture-config.ts").unwrap();
    assert!(config.contains("export class GestureConfig extends HammerGestureConfig"));
    assert!(config.contains("'longpress'"));

    let module = tree.read("src/app/app.module.ts").unwrap();
    assert!(!module.contains("@angular/material"));
    assert!(module.contains("import {GestureConfig} from '../gesture-config';"));
    assert!(module.contains("useClass: GestureConfig"));
    assert!(module.contains("HammerModule"));
    // The existing provider is kept, not duplicated.
    assert_eq!(module.matches("provide: HAMMER_GESTURE_CONFIG").count(), 1);
}

#[test]
fn copy_wires_provider_when_none_exists() {
    let mut tree = tree_of(&[
        ("src/main.ts", MAIN_TS),
        ("src/app/app.module.ts", APP_MODULE_PLAIN),
        ("src/app/app.component.html", "<div (longpress)=\"lp()\"></div>\n"),
    ]);
    let mut global = GlobalUsageState::new();
    let report = run_single_target(&mut tree, &mut global);
    assert_eq!(report.strategy, "copy-gesture-config");

    let module = tree.read("src/app/app.module.ts").unwrap();
    assert!(module.contains("imports: [BrowserModule, HammerModule],"));
    assert!(module
        .contains("providers: [{provide: HAMMER_GESTURE_CONFIG, useClass: GestureConfig}]"));
    assert!(module.contains("import {GestureConfig} from '../gesture-config';"));
}

#[test]
fn copied_config_avoids_existing_file_names() {
    let mut tree = tree_of(&[
        ("src/main.ts", MAIN_TS),
        ("src/app/app.module.ts", APP_MODULE_PLAIN),
        ("src/app/app.component.html", "<div (slide)=\"s()\"></div>\n"),
        ("src/gesture-config.ts", "export const unrelated = 1;\n"),
    ]);
    let mut global = GlobalUsageState::new();
    run_single_target(&mut tree, &mut global);

    assert!(tree.exists("src/gesture-config-1.ts"));
    assert_eq!(
        tree.read("src/gesture-config.ts").unwrap(),
        "export const unrelated = 1;\n"
    );
    let module = tree.read("src/app/app.module.ts").unwrap();
    assert!(module.contains("from '../gesture-config-1';"));
}

#[test]
fn custom_config_with_events_only_reports() {
    let custom_module = "import {NgModule} from '@angular/core';\n\
import {HAMMER_GESTURE_CONFIG} from '@angular/platform-browser';\n\
import {MyGestureConfig} from './my-gesture-config';\n\
\n\
@NgModule({\n\
  providers: [{provide: HAMMER_GESTURE_CONFIG, useClass: MyGestureConfig}],\n\
})\n\
export class AppModule {}\n";
    let mut tree = tree_of(&[
        ("src/main.ts", MAIN_TS),
        ("src/app/app.module.ts", custom_module),
        ("src/app/my-gesture-config.ts", "export class MyGestureConfig {}\n"),
        ("src/app/app.component.html", "<div (slide)=\"s()\"></div>\n"),
    ]);
    let before = custom_module.to_string();
    let mut global = GlobalUsageState::new();
    let report = run_single_target(&mut tree, &mut global);
    assert_eq!(report.strategy, "keep-custom-config");
    assert_eq!(tree.read("src/app/app.module.ts").unwrap(), before);
    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Info && d.message.contains("custom")));
}

#[test]
fn custom_config_without_events_drops_stale_markers() {
    let custom_module = "import {NgModule} from '@angular/core';\n\
import {GestureConfig} from '@angular/material/core';\n\
import {HAMMER_GESTURE_CONFIG} from '@angular/platform-browser';\n\
import {MyGestureConfig} from './my-gesture-config';\n\
\n\
@NgModule({\n\
  providers: [{provide: HAMMER_GESTURE_CONFIG, useClass: MyGestureConfig}],\n\
})\n\
export class AppModule {}\n";
    let mut tree = tree_of(&[
        ("src/main.ts", MAIN_TS),
        ("src/app/app.module.ts", custom_module),
        ("src/app/my-gesture-config.ts", "export class MyGestureConfig {}\n"),
    ]);
    let mut global = GlobalUsageState::new();
    let report = run_single_target(&mut tree, &mut global);
    assert_eq!(report.strategy, "keep-custom-config");

    let module = tree.read("src/app/app.module.ts").unwrap();
    // The stale library config import is gone; the custom provider and its
    // token import stay.
    assert!(!module.contains("@angular/material"));
    assert!(module.contains("HAMMER_GESTURE_CONFIG"));
    assert!(module.contains("useClass: MyGestureConfig"));
}

#[test]
fn runtime_access_keeps_library_but_drops_gesture_wiring() {
    let gestures = "import {GestureConfig} from '@angular/material/core';\n\
const ACTIVE = GestureConfig;\n\
export function create(el) { return window.Hammer; }\n";
    let mut tree = tree_of(&[
        ("src/main.ts", MAIN_TS),
        ("src/app/app.module.ts", APP_MODULE_PLAIN),
        ("src/app/gestures.ts", gestures),
        ("package.json", PACKAGE_JSON),
    ]);
    let mut global = GlobalUsageState::new();
    let report = run_single_target(&mut tree, &mut global);
    assert_eq!(report.strategy, "runtime-only");

    let file = tree.read("src/app/gestures.ts").unwrap();
    assert!(!file.contains("@angular/material"));
    assert!(file.contains("undefined /* TODO: remove */"));
    assert!(file.contains("window.Hammer"));

    // The failure position is remapped past the deleted import line.
    let diag = report
        .diagnostics
        .iter()
        .find(|d| d.file_path == "src/app/gestures.ts")
        .unwrap();
    assert_eq!(diag.severity, Severity::Warning);
    assert_eq!(diag.position.line, 1);

    assert!(!global.finalize(&mut tree).unwrap());
    assert!(tree.read("package.json").unwrap().contains("hammerjs"));
}

#[test]
fn missing_root_module_is_reported_but_migration_continues() {
    let main = "import 'hammerjs';\nconsole.log('bootstrapped elsewhere');\n";
    let mut tree = tree_of(&[
        ("src/main.ts", main),
        ("src/app/app.component.html", "<div (slide)=\"s()\"></div>\n"),
    ]);
    let mut global = GlobalUsageState::new();
    let report = run_single_target(&mut tree, &mut global);
    assert_eq!(report.strategy, "copy-gesture-config");
    assert!(tree.exists("src/gesture-config.ts"));
    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.severity == Severity::Warning && d.message.contains("root module")));
}

#[test]
fn second_run_changes_nothing() {
    let mut tree = tree_of(&[
        ("src/main.ts", MAIN_TS),
        ("src/app/app.module.ts", APP_MODULE_WITH_LIBRARY_SETUP),
        ("src/app/app.component.html", "<div (slide)=\"onSlide()\"></div>\n"),
        ("package.json", PACKAGE_JSON),
    ]);
    let mut global = GlobalUsageState::new();
    run_single_target(&mut tree, &mut global);
    global.finalize(&mut tree).unwrap();
    tree.clear_edit_state();

    let snapshot: Vec<(String, String)> = tree
        .paths()
        .map(|p| (p.to_string(), tree.read(p).unwrap().to_string()))
        .collect();

    let report = run_single_target(&mut tree, &mut global);
    // The wired-up provider now counts as a hand-written config.
    assert_eq!(report.strategy, "keep-custom-config");
    assert!(report.changed_files.is_empty());
    assert!(!tree.exists("src/gesture-config-1.ts"));
    for (path, content) in snapshot {
        assert_eq!(tree.read(&path).unwrap(), content, "file changed: {}", path);
    }
}
