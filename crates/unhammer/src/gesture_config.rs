//! The gesture config copied into migrated projects.

use unhammer_core::tree::FileTree;

/// TypeScript source of the standalone gesture config. Defines the custom
/// gesture events on top of the default HammerJS recognizers.
pub const GESTURE_CONFIG_TEMPLATE: &str = r#"import {Injectable} from '@angular/core';
import {HammerGestureConfig} from '@angular/platform-browser';

/**
 * Noop hammer instance that is used when an instance is requested, but
 * Hammer has not been loaded on the page yet.
 */
const noopHammerInstance = {
  on: () => {},
  off: () => {},
};

/**
 * Gesture config that provides custom gesture events on top of the default
 * gestures provided by HammerJS.
 */
@Injectable()
export class GestureConfig extends HammerGestureConfig {
  /** List of event names to add to the default hammer gestures. */
  events = ['longpress', 'slide', 'slidestart', 'slideend', 'slideleft', 'slideright'];

  buildHammer(element: HTMLElement) {
    const hammer = (window as any).Hammer;

    if (!hammer) {
      return noopHammerInstance;
    }

    const mc = new hammer(element);

    // Default Hammer Recognizers.
    const pan = new hammer.Pan();
    const swipe = new hammer.Swipe();
    const press = new hammer.Press();

    // Notice that a HammerJS recognizer can only depend on one other
    // recognizer once. Otherwise the previous `recognizeWith` is dropped.
    const slide = this._createRecognizer(pan, {event: 'slide', threshold: 0}, swipe);
    const longpress = this._createRecognizer(press, {event: 'longpress', time: 500});

    // Overwrite the default `pan` event to use the swipe event.
    pan.recognizeWith(swipe);

    // Since the slide event threshold is set to zero, the slide recognizer
    // can fire and essentially disable all other recognizers except for the
    // ones it recognizes with.
    slide.recognizeWith(swipe);
    slide.recognizeWith(press);

    // Add customized gestures to the Hammer manager.
    mc.add([swipe, press, pan, slide, longpress]);

    return mc;
  }

  /** Creates a new recognizer, without affecting the default recognizers of HammerJS. */
  private _createRecognizer(base: object, options: any, ...inheritances: object[]) {
    const recognizer = new (base.constructor as any)(options);
    inheritances.push(base);
    inheritances.forEach(item => recognizer.recognizeWith(item));
    return recognizer;
  }
}
"#;

/// Pick a collision-free path for the copied gesture config under
/// `source_root`.
pub fn gesture_config_path(tree: &FileTree, source_root: &str) -> String {
    let base = if source_root.is_empty() {
        "gesture-config".to_string()
    } else {
        format!("{}/gesture-config", source_root)
    };
    let plain = format!("{}.ts", base);
    if !tree.exists(&plain) {
        return plain;
    }
    let mut counter = 1;
    loop {
        let candidate = format!("{}-{}.ts", base, counter);
        if !tree.exists(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}
